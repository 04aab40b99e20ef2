//! Contraction hierarchies.
//!
//! Preprocessing contracts the nodes one after another in order of importance.
//! Contracting a node removes it from the remaining graph and adds shortcuts between its remaining neighbors
//! wherever the path through the node is the only shortest connection.
//! Each contracted node keeps the arcs to its remaining neighbors: outgoing arcs make up the upward graph,
//! incoming ones the downward graph. Queries search upward from the source and, backwards, upward from the target.
//!
//! A hierarchy only depends on the graph and on one (vehicle, weighting) combination.
//! It lives next to the `GraphStorage` and never modifies it, a failed preprocessing leaves nothing behind.

use super::*;
use crate::config::ChConfig;
use crate::datastr::node_order::*;
use crate::io::*;
use crate::report::*;
use crate::weighting::{Weighting, WeightingKind};
use crate::{Result, RoutingError};
use serde::{Deserialize, Serialize};

mod contraction;
pub mod query;

use self::contraction::ContractionGraph;

/// Ids of hierarchy arcs
pub type ArcId = u32;

const NO_ARC: ArcId = ArcId::MAX;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArcKind {
    /// The edge of the graph, traversed from `from` to `to`
    Original(EdgeId),
    /// The two arcs `from -> middle -> to` this arc replaces
    Shortcut { first: ArcId, second: ArcId },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChArc {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: Weight,
    pub kind: ArcKind,
}

/// Metadata stored alongside the arrays, used to check a loaded hierarchy fits graph and request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChProfileInfo {
    pub vehicle: String,
    pub weighting: WeightingKind,
    pub num_nodes: usize,
    pub num_edges: usize,
}

#[derive(Debug)]
pub struct ContractionHierarchy {
    profile: ChProfileInfo,
    order: NodeOrder,
    arcs: Vec<ChArc>,
    // node -> arcs to higher ranked nodes, starting at node
    up_first_out: Vec<u32>,
    up_arcs: Vec<ArcId>,
    // node -> arcs from higher ranked nodes, ending at node
    down_first_out: Vec<u32>,
    down_arcs: Vec<ArcId>,
}

/// Build a hierarchy with node order determined on the fly by the priority heuristic of `config`.
pub fn contract<W: Weighting>(graph: &GraphStorage, weighting: &W, config: &ChConfig) -> Result<ContractionHierarchy> {
    report!("algo", "CH Contraction");
    let mut contraction_graph = report_time_with_key("CH init", "init_running_time_ms", || ContractionGraph::new(graph, weighting, config))?;
    let order = report_time_with_key("CH contraction", "contraction_running_time_ms", || contraction_graph.contract_by_priority(config));
    contraction_graph.into_hierarchy(graph, weighting, order)
}

/// Build a hierarchy contracting the nodes in the given order, lowest rank first.
pub fn contract_with_order<W: Weighting>(graph: &GraphStorage, weighting: &W, order: &NodeOrder) -> Result<ContractionHierarchy> {
    if order.len() != graph.node_count() {
        return Err(RoutingError::MalformedGraph(format!("order has {} nodes, graph {}", order.len(), graph.node_count())));
    }
    let config = ChConfig::default();
    let mut contraction_graph = ContractionGraph::new(graph, weighting, &config)?;
    contraction_graph.contract_in_order(order.order());
    contraction_graph.into_hierarchy(graph, weighting, order.order().to_vec())
}

fn csr(lists: Vec<Vec<ArcId>>) -> (Vec<u32>, Vec<ArcId>) {
    let first_out = degrees_to_first_out(lists.iter().map(|arcs| arcs.len() as u32)).collect();
    let arcs = lists.into_iter().flatten().collect();
    (first_out, arcs)
}

impl ContractionHierarchy {
    fn new(profile: ChProfileInfo, order: NodeOrder, arcs: Vec<ChArc>, up: Vec<Vec<ArcId>>, down: Vec<Vec<ArcId>>) -> Self {
        let (up_first_out, up_arcs) = csr(up);
        let (down_first_out, down_arcs) = csr(down);
        ContractionHierarchy {
            profile,
            order,
            arcs,
            up_first_out,
            up_arcs,
            down_first_out,
            down_arcs,
        }
    }

    pub fn profile(&self) -> &ChProfileInfo {
        &self.profile
    }

    pub fn vehicle(&self) -> &str {
        &self.profile.vehicle
    }

    pub fn weighting(&self) -> WeightingKind {
        self.profile.weighting
    }

    pub fn order(&self) -> &NodeOrder {
        &self.order
    }

    pub fn num_nodes(&self) -> usize {
        self.order.len()
    }

    /// Number of arcs queries can use, original ones and shortcuts.
    pub fn num_arcs(&self) -> usize {
        self.up_arcs.len() + self.down_arcs.len()
    }

    pub fn num_shortcuts(&self) -> usize {
        self.live_arcs().filter(|arc| matches!(arc.kind, ArcKind::Shortcut { .. })).count()
    }

    pub fn arc(&self, arc: ArcId) -> &ChArc {
        &self.arcs[arc as usize]
    }

    fn live_arcs(&self) -> impl Iterator<Item = &ChArc> {
        self.up_arcs.iter().chain(self.down_arcs.iter()).map(move |&arc| self.arc(arc))
    }

    /// Arcs from `node` to higher ranked nodes.
    pub fn upward_arcs(&self, node: NodeId) -> &[ArcId] {
        &self.up_arcs[self.up_first_out[node as usize] as usize..self.up_first_out[node as usize + 1] as usize]
    }

    /// Arcs from higher ranked nodes to `node`.
    pub fn downward_arcs(&self, node: NodeId) -> &[ArcId] {
        &self.down_arcs[self.down_first_out[node as usize] as usize..self.down_first_out[node as usize + 1] as usize]
    }

    /// All shortcuts as `(from, middle, to, weight)`.
    pub fn shortcuts(&self) -> Vec<(NodeId, NodeId, NodeId, Weight)> {
        self.live_arcs()
            .filter_map(|arc| match arc.kind {
                ArcKind::Shortcut { first, .. } => Some((arc.from, self.arc(first).to, arc.to, arc.weight)),
                ArcKind::Original(_) => None,
            })
            .collect()
    }

    /// Can this hierarchy answer queries on `graph` for the given weighting?
    pub fn is_compatible<W: Weighting>(&self, graph: &GraphStorage, weighting: &W) -> bool {
        self.profile.num_nodes == graph.node_count()
            && self.profile.num_edges == graph.edge_count()
            && self.profile.vehicle == weighting.encoder().name()
            && self.profile.weighting == weighting.kind()
    }

    /// Append the original edges `arc` stands for, in travel order.
    pub fn unpack(&self, graph: &GraphStorage, arc: ArcId, edges: &mut Vec<EdgeRef>) -> Result<()> {
        let mut stack = vec![arc];
        while let Some(arc) = stack.pop() {
            let arc = self.arc(arc);
            match arc.kind {
                ArcKind::Original(edge) => edges.push(graph.edge_from(edge, arc.from)?),
                ArcKind::Shortcut { first, second } => {
                    stack.push(second);
                    stack.push(first);
                }
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let n = self.order.len();
        let malformed = |msg: &str| Err(RoutingError::MalformedGraph(format!("hierarchy: {}", msg)));

        if self.profile.num_nodes != n || self.up_first_out.len() != n + 1 || self.down_first_out.len() != n + 1 {
            return malformed("node array lengths differ");
        }
        for (first_out, arcs) in [(&self.up_first_out, &self.up_arcs), (&self.down_first_out, &self.down_arcs)] {
            if first_out[0] != 0 || first_out.windows(2).any(|w| w[0] > w[1]) || first_out[n] as usize != arcs.len() {
                return malformed("first_out is not a valid offset array");
            }
            if arcs.iter().any(|&arc| arc as usize >= self.arcs.len()) {
                return malformed("arc id out of range");
            }
        }
        for (id, arc) in self.arcs.iter().enumerate() {
            if arc.from as usize >= n || arc.to as usize >= n || !(arc.weight >= 0.0) {
                return malformed("invalid arc");
            }
            match arc.kind {
                ArcKind::Original(edge) if edge as usize >= self.profile.num_edges => return malformed("arc references missing edge"),
                // unpacking only ever descends to older arcs
                ArcKind::Shortcut { first, second } if first as usize >= id || second as usize >= id => return malformed("shortcut references newer arc"),
                _ => (),
            }
        }
        for node in 0..n as NodeId {
            let rank = self.order.rank(node);
            if self.upward_arcs(node).iter().any(|&arc| self.arc(arc).from != node || self.order.rank(self.arc(arc).to) <= rank)
                || self.downward_arcs(node).iter().any(|&arc| self.arc(arc).to != node || self.order.rank(self.arc(arc).from) <= rank)
            {
                return malformed("arc does not lead upward");
            }
        }
        Ok(())
    }
}

impl Deconstruct for ContractionHierarchy {
    fn store_each(&self, store: &dyn Fn(&str, &dyn Store) -> std::io::Result<()>) -> std::io::Result<()> {
        let mut arc_first = Vec::with_capacity(self.arcs.len());
        let mut arc_second = Vec::with_capacity(self.arcs.len());
        for arc in &self.arcs {
            match arc.kind {
                ArcKind::Original(edge) => {
                    arc_first.push(edge);
                    arc_second.push(NO_ARC);
                }
                ArcKind::Shortcut { first, second } => {
                    arc_first.push(first);
                    arc_second.push(second);
                }
            }
        }

        store("profile.json", &json_bytes(&self.profile)?)?;
        store("ranks", &self.order.ranks().to_vec())?;
        store("arc_from", &self.arcs.iter().map(|arc| arc.from).collect::<Vec<_>>())?;
        store("arc_to", &self.arcs.iter().map(|arc| arc.to).collect::<Vec<_>>())?;
        store("arc_weight", &self.arcs.iter().map(|arc| arc.weight).collect::<Vec<_>>())?;
        store("arc_first", &arc_first)?;
        store("arc_second", &arc_second)?;
        store("up_first_out", &self.up_first_out)?;
        store("up_arcs", &self.up_arcs)?;
        store("down_first_out", &self.down_first_out)?;
        store("down_arcs", &self.down_arcs)?;
        Ok(())
    }
}

impl Reconstruct for ContractionHierarchy {
    fn reconstruct_with(loader: Loader) -> std::io::Result<Self> {
        let invalid = |e: RoutingError| std::io::Error::new(std::io::ErrorKind::InvalidData, e);

        let profile: ChProfileInfo = loader.load_json("profile.json")?;
        let order = NodeOrder::from_ranks(loader.load("ranks")?).map_err(invalid)?;
        let from: Vec<NodeId> = loader.load("arc_from")?;
        let to: Vec<NodeId> = loader.load("arc_to")?;
        let weight: Vec<Weight> = loader.load("arc_weight")?;
        let first: Vec<u32> = loader.load("arc_first")?;
        let second: Vec<ArcId> = loader.load("arc_second")?;

        let m = from.len();
        if to.len() != m || weight.len() != m || first.len() != m || second.len() != m {
            return Err(invalid(RoutingError::MalformedGraph("hierarchy arc array lengths differ".to_string())));
        }
        let arcs = (0..m)
            .map(|i| ChArc {
                from: from[i],
                to: to[i],
                weight: weight[i],
                kind: if second[i] == NO_ARC {
                    ArcKind::Original(first[i])
                } else {
                    ArcKind::Shortcut {
                        first: first[i],
                        second: second[i],
                    }
                },
            })
            .collect();

        let ch = ContractionHierarchy {
            profile,
            order,
            arcs,
            up_first_out: loader.load("up_first_out")?,
            up_arcs: loader.load("up_arcs")?,
            down_first_out: loader.load("down_first_out")?,
            down_arcs: loader.load("down_arcs")?,
        };
        ch.validate().map_err(invalid)?;
        Ok(ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::EncodingManager;
    use crate::weighting::ShortestWeighting;

    // node 0 is the hub, every other node hangs off it with distance 1.
    // 1 - 2 has a cheaper connection around the hub, 3 - 4 only a more expensive one.
    //
    //   1 --1.5-- 2
    //    \       /
    //     \     /
    //  5 -- 0 --
    //     /     \
    //    /       \
    //   3 ---3--- 4
    fn hub_graph() -> GraphStorage {
        let encoding = EncodingManager::from_names("foot").unwrap();
        let foot = encoding.get_encoder("foot").unwrap().clone();
        let both = foot.set_properties(5.0, true, true);
        let mut builder = GraphBuilder::new(encoding);
        for i in 0..6 {
            builder.add_node(0.0, i as f64 * 0.001).unwrap();
        }
        for spoke in 1..6 {
            builder.add_edge(0, spoke, 1.0, both).unwrap();
        }
        builder.add_edge(1, 2, 1.5, both).unwrap();
        builder.add_edge(3, 4, 3.0, both).unwrap();
        builder.freeze()
    }

    #[test]
    fn contracting_the_hub_adds_exactly_the_needed_shortcuts() {
        let graph = hub_graph();
        let weighting = ShortestWeighting::new(graph.encoding().get_encoder("foot").unwrap());
        let order = NodeOrder::from_node_order(vec![0, 1, 2, 3, 4, 5]).unwrap();
        let ch = contract_with_order(&graph, &weighting, &order).unwrap();

        let mut via_hub: Vec<(NodeId, NodeId)> = ch
            .shortcuts()
            .into_iter()
            .filter(|&(_, middle, _, _)| middle == 0)
            .map(|(from, _, to, weight)| {
                assert_eq!(weight, 2.0);
                (from, to)
            })
            .collect();
        via_hub.sort_unstable();

        let mut expected = Vec::new();
        for from in 1..6 {
            for to in 1..6 {
                if from != to && !matches!((from, to), (1, 2) | (2, 1)) {
                    expected.push((from, to));
                }
            }
        }
        assert_eq!(via_hub, expected);
        assert_eq!(ch.num_shortcuts(), ch.shortcuts().len());
    }

    #[test]
    fn arcs_lead_upward() {
        let graph = hub_graph();
        let weighting = ShortestWeighting::new(graph.encoding().get_encoder("foot").unwrap());
        let ch = contract(&graph, &weighting, &ChConfig::default()).unwrap();
        ch.validate().unwrap();
        assert_eq!(ch.num_nodes(), 6);
        assert!(ch.is_compatible(&graph, &weighting));
    }

    #[test]
    fn shortcuts_unpack_to_original_edges() {
        let graph = hub_graph();
        let weighting = ShortestWeighting::new(graph.encoding().get_encoder("foot").unwrap());
        let order = NodeOrder::from_node_order(vec![0, 1, 2, 3, 4, 5]).unwrap();
        let ch = contract_with_order(&graph, &weighting, &order).unwrap();

        for &arc in ch.upward_arcs(3).iter().chain(ch.downward_arcs(3)) {
            let mut edges = Vec::new();
            ch.unpack(&graph, arc, &mut edges).unwrap();
            let arc = ch.arc(arc);
            assert_eq!(edges.first().unwrap().base, arc.from);
            assert_eq!(edges.last().unwrap().adj, arc.to);
            assert!(edges.windows(2).all(|w| w[0].adj == w[1].base));
            assert_eq!(edges.iter().map(|e| e.distance).sum::<f64>(), arc.weight);
        }
    }

    #[test]
    fn survives_disk() {
        let graph = hub_graph();
        let weighting = ShortestWeighting::new(graph.encoding().get_encoder("foot").unwrap());
        let ch = contract(&graph, &weighting, &ChConfig::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        ch.deconstruct_to(&dir.path()).unwrap();
        let reloaded = ContractionHierarchy::reconstruct_from(&dir.path()).unwrap();
        assert_eq!(reloaded.profile(), ch.profile());
        assert_eq!(reloaded.order(), ch.order());
        assert_eq!(reloaded.shortcuts(), ch.shortcuts());
        for node in 0..6 {
            assert_eq!(reloaded.upward_arcs(node), ch.upward_arcs(node));
            assert_eq!(reloaded.downward_arcs(node), ch.downward_arcs(node));
        }
    }

    #[test]
    fn wrong_order_length() {
        let graph = hub_graph();
        let weighting = ShortestWeighting::new(graph.encoding().get_encoder("foot").unwrap());
        let order = NodeOrder::identity(3);
        assert!(matches!(contract_with_order(&graph, &weighting, &order), Err(RoutingError::MalformedGraph(_))));
    }
}
