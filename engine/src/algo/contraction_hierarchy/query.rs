//! Contraction Hierarchy query server.
//!
//! Actually not much more than a bidirectional dijkstra with a different stopping criterion.
//! And more complicated path unpacking.
//! This works because the augmented graph was split into an upward and an downward part.
//! This implicitly makes sure, that both searches only go to higher ranked nodes.

use super::*;
use crate::algo::dijkstra::report_search_stats_with;
use crate::datastr::index_heap::IndexdMinHeap;

/// Search state of one direction, predecessors are hierarchy arcs.
#[derive(Debug)]
struct ChSearch {
    distances: Vec<Weight>,
    predecessors: Vec<ArcId>,
    queue: IndexdMinHeap<NodeId, Weight>,
    num_settled_nodes: usize,
    num_relaxed_arcs: usize,
    num_queue_pushs: usize,
}

impl ChSearch {
    fn new(n: usize, source: NodeId) -> Self {
        let mut search = ChSearch {
            distances: vec![INFINITY; n],
            predecessors: vec![NO_ARC; n],
            queue: IndexdMinHeap::new(n),
            num_settled_nodes: 0,
            num_relaxed_arcs: 0,
            num_queue_pushs: 1,
        };
        search.distances[source as usize] = 0.0;
        search.queue.insert(source, 0.0);
        search
    }

    fn min_key(&self) -> Weight {
        self.queue.peek_key().unwrap_or(INFINITY)
    }

    /// Settle the next node and relax `arcs` of it, `head_of` picks the other end of an arc.
    /// Nodes with decreased distance are pushed to `improved`.
    fn step<'c>(&mut self, ch: &'c ContractionHierarchy, arcs: impl Fn(NodeId) -> &'c [ArcId], head_of: impl Fn(&ChArc) -> NodeId, improved: &mut Vec<NodeId>) {
        let node = match self.queue.poll_element() {
            Some(node) => node,
            None => return,
        };
        self.num_settled_nodes += 1;
        let distance = self.distances[node as usize];

        for &arc_id in arcs(node) {
            self.num_relaxed_arcs += 1;
            let arc = ch.arc(arc_id);
            let head = head_of(arc);
            let new_distance = distance + arc.weight;
            if new_distance < self.distances[head as usize] {
                self.distances[head as usize] = new_distance;
                self.predecessors[head as usize] = arc_id;
                if self.queue.contains(head) {
                    self.queue.update(head, new_distance);
                } else {
                    self.queue.insert(head, new_distance);
                    self.num_queue_pushs += 1;
                }
                improved.push(head);
            }
        }
    }
}

pub struct Server<'a, W> {
    graph: &'a GraphStorage,
    ch: &'a ContractionHierarchy,
    weighting: &'a W,
    meeting_node: Option<NodeId>,
}

impl<'a, W: Weighting> Server<'a, W> {
    /// Fails with `MalformedGraph` if the hierarchy was built for another graph or weighting.
    pub fn new(graph: &'a GraphStorage, ch: &'a ContractionHierarchy, weighting: &'a W) -> Result<Self> {
        if !ch.is_compatible(graph, weighting) {
            return Err(RoutingError::MalformedGraph(format!(
                "hierarchy for {}|{} with {} nodes does not match {} on {} nodes",
                ch.weighting(),
                ch.vehicle(),
                ch.num_nodes(),
                weighting,
                graph.node_count()
            )));
        }
        Ok(Server {
            graph,
            ch,
            weighting,
            meeting_node: None,
        })
    }

    pub fn meeting_node(&self) -> Option<NodeId> {
        self.meeting_node
    }

    pub fn query(&mut self, query: Query, cancel: CancelFlag) -> Result<Path> {
        let n = self.graph.node_count();
        if query.from as usize >= n {
            return Err(RoutingError::node_index(query.from as usize, n));
        }
        if query.to as usize >= n {
            return Err(RoutingError::node_index(query.to as usize, n));
        }
        self.meeting_node = None;
        if query.from == query.to {
            self.meeting_node = Some(query.from);
            return Ok(Path::from_edges(query.from, &[], self.weighting));
        }

        let ch = self.ch;
        let mut forward = ChSearch::new(n, query.from);
        let mut backward = ChSearch::new(n, query.to);
        let mut improved = Vec::new();

        let mut tentative_distance = INFINITY;
        let mut meeting_node = None;

        loop {
            check_cancelled(cancel)?;
            // each direction only stops once it can no longer improve the best connection
            let forward_active = forward.min_key() < tentative_distance;
            let backward_active = backward.min_key() < tentative_distance;
            if !forward_active && !backward_active {
                break;
            }

            improved.clear();
            let (search, other) = if forward_active && (!backward_active || forward.min_key() <= backward.min_key()) {
                forward.step(ch, |node| ch.upward_arcs(node), |arc| arc.to, &mut improved);
                (&forward, &backward)
            } else {
                backward.step(ch, |node| ch.downward_arcs(node), |arc| arc.from, &mut improved);
                (&backward, &forward)
            };

            for &node in &improved {
                let total = search.distances[node as usize] + other.distances[node as usize];
                if total < tentative_distance {
                    tentative_distance = total;
                    meeting_node = Some(node);
                }
            }
        }

        report_search_stats_with(
            forward.num_settled_nodes + backward.num_settled_nodes,
            forward.num_relaxed_arcs + backward.num_relaxed_arcs,
            forward.num_queue_pushs + backward.num_queue_pushs,
        );

        let meeting_node = match meeting_node {
            Some(node) => node,
            None => return Ok(Path::not_found()),
        };
        self.meeting_node = Some(meeting_node);

        let mut arcs = Vec::new();
        let mut node = meeting_node;
        while node != query.from {
            let arc = forward.predecessors[node as usize];
            arcs.push(arc);
            node = ch.arc(arc).from;
        }
        arcs.reverse();
        let mut node = meeting_node;
        while node != query.to {
            let arc = backward.predecessors[node as usize];
            arcs.push(arc);
            node = ch.arc(arc).to;
        }

        let mut edges = Vec::new();
        for arc in arcs {
            ch.unpack(self.graph, arc, &mut edges)?;
        }
        Ok(Path::from_edges(query.from, &edges, self.weighting))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::dijkstra;
    use crate::encoding::EncodingManager;
    use crate::weighting::{FastestWeighting, ShortestWeighting};

    // 0 <-> 1 <-> 2 <-> 3, a oneway 3 -> 0 and an isolated node 4
    fn graph() -> GraphStorage {
        let encoding = EncodingManager::from_names("car").unwrap();
        let car = encoding.get_encoder("car").unwrap().clone();
        let both = car.set_properties(50.0, true, true);
        let oneway = car.set_properties(100.0, true, false);
        let mut builder = GraphBuilder::new(encoding);
        for i in 0..5 {
            builder.add_node(50.0, 8.0 + i as f64 * 0.01).unwrap();
        }
        builder.add_edge(0, 1, 800.0, both).unwrap();
        builder.add_edge(1, 2, 700.0, both).unwrap();
        builder.add_edge(2, 3, 900.0, both).unwrap();
        builder.add_edge(3, 0, 1000.0, oneway).unwrap();
        builder.freeze()
    }

    #[test]
    fn same_results_as_dijkstra() {
        let graph = graph();
        let car = graph.encoding().get_encoder("car").unwrap();
        let weighting = FastestWeighting::new(car);
        let ch = contract(&graph, &weighting, &ChConfig::default()).unwrap();
        let mut server = Server::new(&graph, &ch, &weighting).unwrap();

        for from in 0..5 {
            for to in 0..5 {
                let query = Query { from, to };
                let expected = dijkstra::dijkstra::Server::new(&graph, &weighting).query(query, None).unwrap();
                let path = server.query(query, None).unwrap();
                assert_eq!(path.found, expected.found, "{:?}", query);
                if expected.found {
                    assert!((path.weight - expected.weight).abs() < 1e-9, "{:?}", query);
                    assert_eq!(path.nodes.first(), Some(&from));
                    assert_eq!(path.nodes.last(), Some(&to));
                }
            }
        }
    }

    #[test]
    fn unpacked_path_uses_original_edges() {
        let graph = graph();
        let car = graph.encoding().get_encoder("car").unwrap();
        let weighting = FastestWeighting::new(car);
        let ch = contract_with_order(&graph, &weighting, &NodeOrder::identity(5)).unwrap();
        let path = Server::new(&graph, &ch, &weighting).unwrap().query(Query { from: 3, to: 1 }, None).unwrap();
        assert!(path.found);
        assert_eq!(path.nodes, vec![3, 0, 1]);
        assert_eq!(path.edges, vec![3, 0]);
        assert_eq!(path.distance, 1800.0);
    }

    #[test]
    fn rejects_other_weighting() {
        let graph = graph();
        let car = graph.encoding().get_encoder("car").unwrap();
        let ch = contract(&graph, &FastestWeighting::new(car), &ChConfig::default()).unwrap();
        let shortest = ShortestWeighting::new(car);
        assert!(matches!(Server::new(&graph, &ch, &shortest), Err(RoutingError::MalformedGraph(_))));
    }

    #[test]
    fn invalid_nodes() {
        let graph = graph();
        let car = graph.encoding().get_encoder("car").unwrap();
        let weighting = FastestWeighting::new(car);
        let ch = contract(&graph, &weighting, &ChConfig::default()).unwrap();
        let mut server = Server::new(&graph, &ch, &weighting).unwrap();
        assert!(matches!(server.query(Query { from: 7, to: 0 }, None), Err(RoutingError::IndexError { .. })));
    }
}
