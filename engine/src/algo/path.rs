use crate::datastr::graph::*;
use crate::geo::LatLon;
use crate::weighting::Weighting;
use crate::Result;

/// Result of a route query.
///
/// A search which could not connect source and target is not an error,
/// it yields a path with `found == false` and infinite weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Edge ids from source to target
    pub edges: Vec<EdgeId>,
    /// Node ids from source to target, one more than `edges` for found paths
    pub nodes: Vec<NodeId>,
    /// meters
    pub distance: f64,
    pub weight: Weight,
    pub time_ms: u64,
    pub found: bool,
}

impl Path {
    pub fn not_found() -> Path {
        Path {
            edges: Vec::new(),
            nodes: Vec::new(),
            distance: 0.0,
            weight: INFINITY,
            time_ms: 0,
            found: false,
        }
    }

    /// Accumulate distance, weight and time along oriented edges starting at `source`.
    pub(crate) fn from_edges<W: Weighting>(source: NodeId, edges: &[EdgeRef], weighting: &W) -> Path {
        let mut nodes = Vec::with_capacity(edges.len() + 1);
        nodes.push(source);
        let mut distance = 0.0;
        let mut weight = 0.0;
        let mut time_ms = 0.0;

        for edge in edges {
            debug_assert_eq!(Some(&edge.base), nodes.last());
            nodes.push(edge.adj);
            distance += edge.distance;
            weight += weighting.calc_weight(edge);
            time_ms += weighting.calc_millis(edge);
        }

        Path {
            edges: edges.iter().map(|edge| edge.edge).collect(),
            nodes,
            distance,
            weight,
            time_ms: time_ms.round() as u64,
            found: true,
        }
    }

    pub fn is_found(&self) -> bool {
        self.found
    }

    /// Coordinates of the nodes along the path.
    pub fn points(&self, graph: &GraphStorage) -> Result<Vec<LatLon>> {
        self.nodes.iter().map(|&node| graph.lat_lon(node)).collect()
    }
}
