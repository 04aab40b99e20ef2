use super::*;
use crate::datastr::index_heap::IndexdMinHeap;
use crate::datastr::timestamped_vector::TimestampedVector;
use rayon::prelude::*;

#[derive(Debug, PartialEq)]
enum ShortcutResult {
    NewShortcut,
    ShortenedExisting,
    ShorterExisting,
}

/// Arc to or from a neighbor in the remaining graph.
#[derive(Debug, Clone, Copy)]
struct Link {
    node: NodeId,
    weight: Weight,
    arc: ArcId,
}

#[derive(Debug, Default)]
struct Node {
    outgoing: Vec<Link>,
    incoming: Vec<Link>,
}

impl Node {
    fn insert_or_decrease_outgoing(&mut self, to: NodeId, weight: Weight, arc: ArcId) -> ShortcutResult {
        Node::insert_or_decrease(&mut self.outgoing, to, weight, arc)
    }

    fn insert_or_decrease_incoming(&mut self, from: NodeId, weight: Weight, arc: ArcId) -> ShortcutResult {
        Node::insert_or_decrease(&mut self.incoming, from, weight, arc)
    }

    fn insert_or_decrease(links: &mut Vec<Link>, node: NodeId, weight: Weight, arc: ArcId) -> ShortcutResult {
        for link in links.iter_mut() {
            if link.node == node {
                if weight < link.weight {
                    link.weight = weight;
                    link.arc = arc;
                    return ShortcutResult::ShortenedExisting;
                } else {
                    return ShortcutResult::ShorterExisting;
                }
            }
        }

        links.push(Link { node, weight, arc });
        ShortcutResult::NewShortcut
    }

    fn remove_outgoing(&mut self, to: NodeId) {
        self.outgoing.retain(|link| link.node != to);
    }

    fn remove_incoming(&mut self, from: NodeId) {
        self.incoming.retain(|link| link.node != from);
    }
}

/// Shortcut candidate `in_arc` followed by `out_arc`.
#[derive(Debug, Clone, Copy)]
struct Shortcut {
    from: NodeId,
    to: NodeId,
    weight: Weight,
    first: ArcId,
    second: ArcId,
}

/// Local Dijkstra which looks for paths avoiding the node being contracted.
/// It may give up early, the distances found so far are upper bounds and still valid witnesses.
#[derive(Debug)]
struct WitnessSearch {
    distances: TimestampedVector<Weight>,
    queue: IndexdMinHeap<NodeId, Weight>,
}

impl WitnessSearch {
    fn new(n: usize) -> Self {
        WitnessSearch {
            distances: TimestampedVector::new(n, INFINITY),
            queue: IndexdMinHeap::new(n),
        }
    }

    fn run(&mut self, nodes: &[Node], source: NodeId, avoid: NodeId, bound: Weight, settle_limit: usize) {
        self.distances.reset();
        self.queue.clear();
        self.distances.set(source as usize, 0.0);
        self.queue.insert(source, 0.0);

        let mut settled = 0;
        while let Some((node, distance)) = self.queue.pop() {
            if distance > bound || settled >= settle_limit {
                break;
            }
            settled += 1;

            for link in &nodes[node as usize].outgoing {
                if link.node == avoid {
                    continue;
                }
                let new_distance = distance + link.weight;
                if new_distance < self.distances.get(link.node as usize) {
                    self.distances.set(link.node as usize, new_distance);
                    self.queue.insert_or_update(link.node, new_distance);
                }
            }
        }
    }

    fn distance(&self, node: NodeId) -> Weight {
        self.distances.get(node as usize)
    }
}

/// The graph during preprocessing: the remaining uncontracted nodes and the arcs between them.
#[derive(Debug)]
pub(super) struct ContractionGraph {
    nodes: Vec<Node>,
    arcs: Vec<ChArc>,
    contracted: Vec<bool>,
    contracted_neighbors: Vec<u32>,
    up: Vec<Vec<ArcId>>,
    down: Vec<Vec<ArcId>>,
    settle_limit: usize,
    edge_difference_factor: i64,
    contracted_neighbors_factor: i64,
}

impl ContractionGraph {
    pub(super) fn new<W: Weighting>(graph: &GraphStorage, weighting: &W, config: &ChConfig) -> Result<ContractionGraph> {
        let n = graph.node_count();
        let encoder = weighting.encoder();
        let mut contraction_graph = ContractionGraph {
            nodes: (0..n).map(|_| Node::default()).collect(),
            arcs: Vec::with_capacity(graph.edge_count() * 2),
            contracted: vec![false; n],
            contracted_neighbors: vec![0; n],
            up: vec![Vec::new(); n],
            down: vec![Vec::new(); n],
            settle_limit: config.witness_settle_limit.max(1),
            edge_difference_factor: config.edge_difference_factor,
            contracted_neighbors_factor: config.contracted_neighbors_factor,
        };

        for edge in 0..graph.edge_count() as EdgeId {
            let stored = graph.edge(edge)?;
            if stored.is_loop() {
                continue;
            }
            for oriented in [stored, stored.reversed(graph.encoding())] {
                if !encoder.is_forward(oriented.flags) {
                    continue;
                }
                let weight = weighting.calc_weight(&oriented);
                if !(weight.is_finite() && weight >= 0.0) {
                    return Err(RoutingError::MalformedGraph(format!("edge {} has weight {} for {}", edge, weight, weighting)));
                }
                contraction_graph.insert_arc(ChArc {
                    from: oriented.base,
                    to: oriented.adj,
                    weight,
                    kind: ArcKind::Original(edge),
                });
            }
        }

        Ok(contraction_graph)
    }

    fn insert_arc(&mut self, arc: ChArc) {
        let id = self.arcs.len() as ArcId;
        match self.nodes[arc.from as usize].insert_or_decrease_outgoing(arc.to, arc.weight, id) {
            ShortcutResult::ShorterExisting => (),
            ShortcutResult::NewShortcut | ShortcutResult::ShortenedExisting => {
                self.nodes[arc.to as usize].insert_or_decrease_incoming(arc.from, arc.weight, id);
                self.arcs.push(arc);
            }
        }
    }

    /// Shortcuts needed to keep all distances when `node` is removed.
    fn shortcuts_for(&self, node: NodeId, search: &mut WitnessSearch) -> Vec<Shortcut> {
        let mut shortcuts = Vec::new();
        let Node { outgoing, incoming } = &self.nodes[node as usize];

        for in_link in incoming {
            let max_out = outgoing
                .iter()
                .filter(|out_link| out_link.node != in_link.node)
                .map(|out_link| out_link.weight)
                .fold(None, |max: Option<Weight>, weight| Some(max.map_or(weight, |max| max.max(weight))));
            let max_out = match max_out {
                Some(max_out) => max_out,
                None => continue,
            };

            search.run(&self.nodes, in_link.node, node, in_link.weight + max_out, self.settle_limit);

            for out_link in outgoing {
                if out_link.node == in_link.node {
                    continue;
                }
                let via = in_link.weight + out_link.weight;
                if search.distance(out_link.node) > via {
                    shortcuts.push(Shortcut {
                        from: in_link.node,
                        to: out_link.node,
                        weight: via,
                        first: in_link.arc,
                        second: out_link.arc,
                    });
                }
            }
        }

        shortcuts
    }

    /// Smaller is contracted earlier.
    fn priority(&self, node: NodeId, search: &mut WitnessSearch) -> i64 {
        let Node { outgoing, incoming } = &self.nodes[node as usize];
        let removed = (outgoing.len() + incoming.len()) as i64;
        let added = self.shortcuts_for(node, search).len() as i64;
        self.edge_difference_factor * (added - removed) + self.contracted_neighbors_factor * self.contracted_neighbors[node as usize] as i64
    }

    fn contract_node(&mut self, node: NodeId, search: &mut WitnessSearch) {
        let shortcuts = self.shortcuts_for(node, search);

        self.contracted[node as usize] = true;
        let Node { outgoing, incoming } = std::mem::take(&mut self.nodes[node as usize]);
        for link in outgoing {
            self.up[node as usize].push(link.arc);
            self.nodes[link.node as usize].remove_incoming(node);
        }
        for link in incoming {
            self.down[node as usize].push(link.arc);
            self.nodes[link.node as usize].remove_outgoing(node);
        }

        for shortcut in shortcuts {
            self.insert_arc(ChArc {
                from: shortcut.from,
                to: shortcut.to,
                weight: shortcut.weight,
                kind: ArcKind::Shortcut {
                    first: shortcut.first,
                    second: shortcut.second,
                },
            });
        }
    }

    fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        let Node { outgoing, incoming } = &self.nodes[node as usize];
        let mut neighbors: Vec<NodeId> = outgoing.iter().chain(incoming.iter()).map(|link| link.node).collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    pub(super) fn contract_in_order(&mut self, order: &[NodeId]) {
        let mut search = WitnessSearch::new(self.nodes.len());
        for &node in order {
            self.contract_node(node, &mut search);
        }
    }

    /// Contract all nodes, always picking the one with the lowest priority.
    /// Priorities are updated lazily and for the neighbors of each contracted node.
    /// Returns the nodes in contraction order.
    pub(super) fn contract_by_priority(&mut self, config: &ChConfig) -> Vec<NodeId> {
        let n = self.nodes.len();
        let mut search = WitnessSearch::new(n);

        let priorities: Vec<i64> = if config.parallel_priorities {
            let graph = &*self;
            (0..n as NodeId)
                .into_par_iter()
                .map_init(|| WitnessSearch::new(n), |search, node| graph.priority(node, search))
                .collect()
        } else {
            (0..n as NodeId).map(|node| self.priority(node, &mut search)).collect()
        };

        let mut queue: IndexdMinHeap<NodeId, i64> = IndexdMinHeap::new(n);
        for (node, &priority) in priorities.iter().enumerate() {
            queue.insert(node as NodeId, priority);
        }

        let mut order = Vec::with_capacity(n);
        while let Some((node, _)) = queue.pop() {
            let priority = self.priority(node, &mut search);
            if matches!(queue.peek_key(), Some(next) if priority > next) {
                queue.insert(node, priority);
                continue;
            }

            let neighbors = self.neighbors(node);
            self.contract_node(node, &mut search);
            order.push(node);

            for neighbor in neighbors {
                self.contracted_neighbors[neighbor as usize] += 1;
                let priority = self.priority(neighbor, &mut search);
                queue.update(neighbor, priority);
            }

            if order.len() % 10_000 == 0 {
                log::debug!("contracted {}/{} nodes, {} arcs", order.len(), n, self.arcs.len());
            }
        }

        order
    }

    pub(super) fn into_hierarchy<W: Weighting>(self, graph: &GraphStorage, weighting: &W, order: Vec<NodeId>) -> Result<ContractionHierarchy> {
        debug_assert!(self.contracted.iter().all(|&contracted| contracted));
        let order = NodeOrder::from_node_order(order)?;
        let profile = ChProfileInfo {
            vehicle: weighting.encoder().name().to_string(),
            weighting: weighting.kind(),
            num_nodes: graph.node_count(),
            num_edges: graph.edge_count(),
        };
        let ch = ContractionHierarchy::new(profile, order, self.arcs, self.up, self.down);
        report!("num_shortcuts", ch.num_shortcuts());
        log::info!("{} contracted: {} arcs, {} shortcuts", weighting, ch.num_arcs(), ch.num_shortcuts());
        Ok(ch)
    }
}
