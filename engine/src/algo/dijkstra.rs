//! Dijkstra and A* on the road graph, unidirectional and bidirectional.

use super::*;
use crate::datastr::index_heap::*;
use crate::encoding::FlagEncoder;
use crate::report::*;
use crate::weighting::Weighting;

pub mod query;

pub use query::{bidirectional_dijkstra, dijkstra};

const NO_PREDECESSOR: (NodeId, EdgeId) = (NodeId::MAX, EdgeId::MAX);

/// Which way a search runs over the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Along outgoing edges, starting from the source
    Forward,
    /// Against incoming edges, starting from the target
    Backward,
}

impl Direction {
    #[inline]
    fn edges<'g>(self, graph: &'g GraphStorage, node: NodeId) -> EdgeIter<'g> {
        match self {
            Direction::Forward => graph.out_edges(node),
            Direction::Backward => graph.in_edges(node),
        }
    }

    #[inline]
    fn head(self, edge: &EdgeRef) -> NodeId {
        match self {
            Direction::Forward => edge.adj,
            Direction::Backward => edge.base,
        }
    }
}

/// State of one search direction, one entry per node.
#[derive(Debug)]
pub struct DijkstraData {
    pub distances: Vec<Weight>,
    /// The previous node and edge on the best known path. For backward searches the next one towards the target.
    pub predecessors: Vec<(NodeId, EdgeId)>,
    pub settled: Vec<bool>,
    pub queue: IndexdMinHeap<NodeId, Weight>,
    direction: Direction,
    num_settled_nodes: usize,
    num_relaxed_arcs: usize,
    num_queue_pushs: usize,
}

impl DijkstraData {
    pub fn new(n: usize, direction: Direction) -> Self {
        let mut queue = IndexdMinHeap::new(0);
        queue.ensure_capacity(n);
        DijkstraData {
            distances: vec![INFINITY; n],
            predecessors: vec![NO_PREDECESSOR; n],
            settled: vec![false; n],
            queue,
            direction,
            num_settled_nodes: 0,
            num_relaxed_arcs: 0,
            num_queue_pushs: 0,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn initialize_query(&mut self, source: NodeId, key: Weight) {
        self.distances[source as usize] = 0.0;
        self.queue.insert(source, key);
        self.num_queue_pushs += 1;
    }

    /// Smallest queued key, infinity for an exhausted search.
    pub fn min_key(&self) -> Weight {
        self.queue.peek_key().unwrap_or(INFINITY)
    }

    pub fn tentative_distance(&self, node: NodeId) -> Weight {
        self.distances[node as usize]
    }

    /// Pop the next node and mark it settled.
    pub fn settle_next_node(&mut self) -> Option<NodeId> {
        let node = self.queue.poll_element()?;
        self.settled[node as usize] = true;
        self.num_settled_nodes += 1;
        Some(node)
    }

    /// Relax all edges of `node` the vehicle may travel along in search direction.
    /// `potential` maps a node to the value added to its distance for the queue key.
    /// `improved` is called for every node whose tentative distance decreased.
    pub fn relax_edges<W: Weighting>(
        &mut self,
        graph: &GraphStorage,
        weighting: &W,
        node: NodeId,
        mut potential: impl FnMut(NodeId) -> Weight,
        mut improved: impl FnMut(NodeId, Weight),
    ) {
        let encoder: &FlagEncoder = weighting.encoder();
        let node_distance = self.distances[node as usize];

        for edge in self.direction.edges(graph, node) {
            if edge.is_loop() || !encoder.is_forward(edge.flags) {
                continue;
            }
            self.num_relaxed_arcs += 1;

            let head = self.direction.head(&edge);
            let distance = node_distance + weighting.calc_weight(&edge);
            if distance < self.distances[head as usize] {
                self.distances[head as usize] = distance;
                self.predecessors[head as usize] = (node, edge.edge);

                let key = distance + potential(head);
                if self.queue.contains(head) {
                    self.queue.update(head, key);
                } else {
                    // a settled node only comes back if the potential was not consistent
                    self.settled[head as usize] = false;
                    self.queue.insert(head, key);
                    self.num_queue_pushs += 1;
                }
                improved(head, distance);
            }
        }
    }

    /// Walk the predecessors from `node` until `end` and return the oriented edges passed.
    /// Forward searches yield them from `end` to `node`, backward searches from `node` to `end`.
    pub fn edges_to(&self, graph: &GraphStorage, node: NodeId, end: NodeId) -> Result<Vec<EdgeRef>> {
        let mut edges = Vec::new();
        let mut current = node;
        while current != end {
            let (next, edge) = self.predecessors[current as usize];
            if next == NO_PREDECESSOR.0 {
                return Err(RoutingError::MalformedGraph(format!("broken predecessor chain at node {}", current)));
            }
            match self.direction {
                Direction::Forward => edges.push(graph.edge_from(edge, next)?),
                Direction::Backward => edges.push(graph.edge_from(edge, current)?),
            }
            current = next;
        }
        if self.direction == Direction::Forward {
            edges.reverse();
        }
        Ok(edges)
    }

    pub fn num_settled_nodes(&self) -> usize {
        self.num_settled_nodes
    }

    pub fn num_relaxed_arcs(&self) -> usize {
        self.num_relaxed_arcs
    }

    pub fn num_queue_pushs(&self) -> usize {
        self.num_queue_pushs
    }
}

/// Report the combined counters of all search directions.
pub(crate) fn report_search_stats(data: &[&DijkstraData]) {
    report_search_stats_with(
        data.iter().map(|d| d.num_settled_nodes()).sum(),
        data.iter().map(|d| d.num_relaxed_arcs()).sum(),
        data.iter().map(|d| d.num_queue_pushs()).sum(),
    );
}

pub(crate) fn report_search_stats_with(num_settled_nodes: usize, num_relaxed_arcs: usize, num_queue_pushs: usize) {
    report!("num_settled_nodes", num_settled_nodes);
    report!("num_relaxed_arcs", num_relaxed_arcs);
    report!("num_queue_pushs", num_queue_pushs);
}
