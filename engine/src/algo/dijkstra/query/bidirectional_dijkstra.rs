use super::*;

/// Bidirectional Dijkstra, or bidirectional A* with beeline potentials.
///
/// Both directions share the reduced costs of an `AveragePotential`:
/// the forward queue is keyed by `distance + p(v)`, the backward queue by `distance - p(v)`.
/// With this the search may stop once the two minimum keys add up to the best path found so far.
pub struct Server<'a, W, PF, PB> {
    graph: &'a GraphStorage,
    weighting: &'a W,
    potential: AveragePotential<PF, PB>,
    meeting_node: Option<NodeId>,
}

impl<'a, W: Weighting> Server<'a, W, ZeroPotential, ZeroPotential> {
    pub fn new(graph: &'a GraphStorage, weighting: &'a W) -> Self {
        Self::new_with_potentials(graph, weighting, ZeroPotential(), ZeroPotential())
    }
}

impl<'a, W: Weighting, PF: Potential, PB: Potential> Server<'a, W, PF, PB> {
    /// `forward_pot` has to estimate the distance to the target, `backward_pot` the distance from the source.
    pub fn new_with_potentials(graph: &'a GraphStorage, weighting: &'a W, forward_pot: PF, backward_pot: PB) -> Self {
        Server {
            graph,
            weighting,
            potential: AveragePotential::new(forward_pot, backward_pot),
            meeting_node: None,
        }
    }

    /// Where the two searches met for the last found path.
    pub fn meeting_node(&self) -> Option<NodeId> {
        self.meeting_node
    }

    pub fn query(&mut self, query: Query, cancel: CancelFlag) -> Result<Path> {
        check_query(self.graph, query)?;
        self.meeting_node = None;
        if query.from == query.to {
            self.meeting_node = Some(query.from);
            return Ok(Path::from_edges(query.from, &[], self.weighting));
        }

        let graph = self.graph;
        let weighting = self.weighting;
        let potential = &mut self.potential;

        let mut forward = DijkstraData::new(graph.node_count(), Direction::Forward);
        let mut backward = DijkstraData::new(graph.node_count(), Direction::Backward);
        potential.init(query.from, query.to);
        forward.initialize_query(query.from, potential.potential(query.from));
        backward.initialize_query(query.to, -potential.potential(query.to));

        let mut tentative_distance = INFINITY;
        let mut meeting_node = None;

        loop {
            check_cancelled(cancel)?;
            let (forward_min, backward_min) = (forward.min_key(), backward.min_key());
            // an exhausted direction has seen every path there is
            if forward_min == INFINITY || backward_min == INFINITY || forward_min + backward_min >= tentative_distance {
                break;
            }

            if forward_min <= backward_min {
                let node = match forward.settle_next_node() {
                    Some(node) => node,
                    None => break,
                };
                let other = &backward;
                forward.relax_edges(
                    graph,
                    weighting,
                    node,
                    |head| potential.potential(head),
                    |head, dist| {
                        let total = dist + other.tentative_distance(head);
                        if total < tentative_distance {
                            tentative_distance = total;
                            meeting_node = Some(head);
                        }
                    },
                );
            } else {
                let node = match backward.settle_next_node() {
                    Some(node) => node,
                    None => break,
                };
                let other = &forward;
                backward.relax_edges(
                    graph,
                    weighting,
                    node,
                    |head| -potential.potential(head),
                    |head, dist| {
                        let total = dist + other.tentative_distance(head);
                        if total < tentative_distance {
                            tentative_distance = total;
                            meeting_node = Some(head);
                        }
                    },
                );
            }
        }

        report_search_stats(&[&forward, &backward]);

        let meeting_node = match meeting_node {
            Some(node) => node,
            None => return Ok(Path::not_found()),
        };
        self.meeting_node = Some(meeting_node);

        let mut edges = forward.edges_to(graph, meeting_node, query.from)?;
        edges.extend(backward.edges_to(graph, meeting_node, query.to)?);
        Ok(Path::from_edges(query.from, &edges, weighting))
    }
}
