//! Snapping coordinates to graph nodes.

use crate::datastr::graph::{GraphStorage, NodeId};
use crate::encoding::FlagEncoder;
use crate::geo::LatLon;
use crate::{Result, RoutingError};
use rstar::{primitives::GeomWithData, RTree};

type IndexedNode = GeomWithData<[f64; 2], NodeId>;

/// R-tree over all node coordinates.
///
/// Nodes are indexed in an equirectangular projection around the mean latitude of the graph,
/// which keeps the nearest neighbor order close to the true one for city and country sized graphs.
#[derive(Debug)]
pub struct LocationIndex {
    tree: RTree<IndexedNode>,
    lon_scale: f64,
}

impl LocationIndex {
    pub fn new(graph: &GraphStorage) -> LocationIndex {
        let n = graph.node_count();
        let mean_lat = if n == 0 {
            0.0
        } else {
            (0..n as NodeId).map(|node| graph.coords(node).lat).sum::<f64>() / n as f64
        };
        let lon_scale = mean_lat.to_radians().cos();

        let nodes = (0..n as NodeId)
            .map(|node| IndexedNode::new(Self::project(graph.coords(node), lon_scale), node))
            .collect();

        LocationIndex {
            tree: RTree::bulk_load(nodes),
            lon_scale,
        }
    }

    fn project(coords: LatLon, lon_scale: f64) -> [f64; 2] {
        [coords.lon * lon_scale, coords.lat]
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The node closest to `coords` which has at least one edge `encoder` may use.
    pub fn closest(&self, graph: &GraphStorage, coords: LatLon, encoder: &FlagEncoder) -> Result<NodeId> {
        let coords = coords.validated()?;
        self.tree
            .nearest_neighbor_iter(&Self::project(coords, self.lon_scale))
            .map(|candidate| candidate.data)
            .find(|&node| graph.is_accessible(node, encoder))
            .ok_or(RoutingError::PointNotFound {
                lat: coords.lat,
                lon: coords.lon,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastr::graph::GraphBuilder;
    use crate::encoding::EncodingManager;

    #[test]
    fn snaps_to_nearest_accessible_node() {
        let encoding = EncodingManager::from_names("car,foot").unwrap();
        let car = encoding.get_encoder("car").unwrap().clone();
        let foot = encoding.get_encoder("foot").unwrap().clone();
        let mut builder = GraphBuilder::new(encoding);
        // 0 and 1 are a footway, 2 and 3 a road further north
        builder.add_node(49.000, 8.400).unwrap();
        builder.add_node(49.001, 8.400).unwrap();
        builder.add_node(49.010, 8.400).unwrap();
        builder.add_node(49.011, 8.400).unwrap();
        builder.add_edge(0, 1, 111.0, foot.set_properties(5.0, true, true)).unwrap();
        builder.add_edge(2, 3, 111.0, car.set_properties(50.0, true, true) | foot.set_properties(5.0, true, true)).unwrap();
        let graph = builder.freeze();
        let index = LocationIndex::new(&graph);
        assert_eq!(index.len(), 4);

        let near_zero = LatLon::new(48.9999, 8.4001);
        assert_eq!(index.closest(&graph, near_zero, graph.encoding().get_encoder("foot").unwrap()).unwrap(), 0);
        assert_eq!(index.closest(&graph, near_zero, graph.encoding().get_encoder("car").unwrap()).unwrap(), 2);
    }

    #[test]
    fn no_accessible_node() {
        let encoding = EncodingManager::from_names("car").unwrap();
        let mut builder = GraphBuilder::new(encoding);
        builder.add_node(0.0, 0.0).unwrap();
        let graph = builder.freeze();
        let index = LocationIndex::new(&graph);
        let car = graph.encoding().get_encoder("car").unwrap();
        assert!(matches!(index.closest(&graph, LatLon::new(0.0, 0.0), car), Err(RoutingError::PointNotFound { .. })));
        assert!(matches!(index.closest(&graph, LatLon::new(0.0, 200.0), car), Err(RoutingError::InvalidCoordinates { .. })));
    }
}
