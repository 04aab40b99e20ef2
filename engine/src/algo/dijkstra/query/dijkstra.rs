use super::*;

/// Unidirectional Dijkstra, or A* when used with a potential other than `ZeroPotential`.
pub struct Server<'a, W, P> {
    graph: &'a GraphStorage,
    weighting: &'a W,
    potential: P,
}

impl<'a, W: Weighting> Server<'a, W, ZeroPotential> {
    pub fn new(graph: &'a GraphStorage, weighting: &'a W) -> Self {
        Self::new_with_potential(graph, weighting, ZeroPotential())
    }
}

impl<'a, W: Weighting, P: Potential> Server<'a, W, P> {
    pub fn new_with_potential(graph: &'a GraphStorage, weighting: &'a W, potential: P) -> Self {
        Server { graph, weighting, potential }
    }

    pub fn query(&mut self, query: Query, cancel: CancelFlag) -> Result<Path> {
        check_query(self.graph, query)?;
        if query.from == query.to {
            return Ok(Path::from_edges(query.from, &[], self.weighting));
        }

        let graph = self.graph;
        let weighting = self.weighting;
        let potential = &mut self.potential;

        let mut data = DijkstraData::new(graph.node_count(), Direction::Forward);
        potential.init(query.to);
        data.initialize_query(query.from, potential.potential(query.from));

        let mut found = false;
        loop {
            check_cancelled(cancel)?;
            let node = match data.settle_next_node() {
                Some(node) => node,
                None => break,
            };
            if node == query.to {
                found = true;
                break;
            }
            data.relax_edges(graph, weighting, node, |head| potential.potential(head), |_, _| ());
        }

        report_search_stats(&[&data]);

        if !found {
            return Ok(Path::not_found());
        }
        let edges = data.edges_to(graph, query.to, query.from)?;
        Ok(Path::from_edges(query.from, &edges, weighting))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::EncodingManager;
    use crate::weighting::{FastestWeighting, ShortestWeighting};
    use std::sync::atomic::AtomicBool;

    //      2
    //   0 --> 1
    //   |     |
    // 3 |     | 1
    //   v     v
    //   2 <-- 3     4
    //      1
    fn graph() -> GraphStorage {
        let encoding = EncodingManager::from_names("car").unwrap();
        let car = encoding.get_encoder("car").unwrap().clone();
        let oneway = car.set_properties(10.0, true, false);
        let mut builder = GraphBuilder::new(encoding);
        for i in 0..5 {
            builder.add_node(49.0, 8.0 + i as f64 * 0.1).unwrap();
        }
        builder.add_edge(0, 1, 2.0, oneway).unwrap();
        builder.add_edge(0, 2, 3.0, oneway).unwrap();
        builder.add_edge(1, 3, 1.0, oneway).unwrap();
        builder.add_edge(3, 2, 1.0, oneway).unwrap();
        builder.freeze()
    }

    #[test]
    fn finds_shortest_path() {
        let graph = graph();
        let weighting = ShortestWeighting::new(graph.encoding().get_encoder("car").unwrap());
        let path = Server::new(&graph, &weighting).query(Query { from: 0, to: 2 }, None).unwrap();
        assert!(path.found);
        assert_eq!(path.weight, 3.0);
        assert_eq!(path.edges.len(), 1);
        assert_eq!(path.nodes, vec![0, 2]);

        let path = Server::new(&graph, &weighting).query(Query { from: 0, to: 3 }, None).unwrap();
        assert_eq!(path.edges, vec![0, 2]);
        assert_eq!(path.nodes, vec![0, 1, 3]);
        assert_eq!(path.distance, 3.0);
    }

    #[test]
    fn respects_oneways() {
        let graph = graph();
        let weighting = FastestWeighting::new(graph.encoding().get_encoder("car").unwrap());
        let path = Server::new(&graph, &weighting).query(Query { from: 2, to: 0 }, None).unwrap();
        assert!(!path.found);
        assert_eq!(path, Path::not_found());
    }

    #[test]
    fn unreachable_node() {
        let graph = graph();
        let weighting = FastestWeighting::new(graph.encoding().get_encoder("car").unwrap());
        assert!(!Server::new(&graph, &weighting).query(Query { from: 0, to: 4 }, None).unwrap().found);
    }

    #[test]
    fn source_equals_target() {
        let graph = graph();
        let weighting = FastestWeighting::new(graph.encoding().get_encoder("car").unwrap());
        let path = Server::new(&graph, &weighting).query(Query { from: 4, to: 4 }, None).unwrap();
        assert!(path.found);
        assert_eq!(path.weight, 0.0);
        assert_eq!(path.nodes, vec![4]);
        assert!(path.edges.is_empty());
    }

    #[test]
    fn invalid_nodes() {
        let graph = graph();
        let weighting = FastestWeighting::new(graph.encoding().get_encoder("car").unwrap());
        assert!(matches!(
            Server::new(&graph, &weighting).query(Query { from: 0, to: 5 }, None),
            Err(RoutingError::IndexError { .. })
        ));
    }

    #[test]
    fn cancelled() {
        let graph = graph();
        let weighting = FastestWeighting::new(graph.encoding().get_encoder("car").unwrap());
        let cancel = AtomicBool::new(true);
        assert!(matches!(
            Server::new(&graph, &weighting).query(Query { from: 0, to: 3 }, Some(&cancel)),
            Err(RoutingError::Cancelled)
        ));
    }
}
