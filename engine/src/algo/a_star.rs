//! Potentials for goal directed search.
//!
//! A potential estimates the remaining cost from a node to the target.
//! Searches order their queue by `distance + potential`, which is exact as long as
//! the potential never overestimates and is consistent along edges.

use super::*;
use crate::geo::LatLon;
use crate::weighting::Weighting;

pub trait Potential {
    fn init(&mut self, target: NodeId);
    fn potential(&mut self, node: NodeId) -> Weight;
}

/// Plain Dijkstra.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroPotential();

impl Potential for ZeroPotential {
    fn init(&mut self, _target: NodeId) {}

    fn potential(&mut self, _node: NodeId) -> Weight {
        0.0
    }
}

/// Lower bound from the straight line distance to the target.
///
/// Consistent whenever every edge is at least as long as the straight line between its end nodes,
/// which holds for any geometry derived graph.
#[derive(Debug)]
pub struct BeelinePotential<'a, W> {
    graph: &'a GraphStorage,
    weighting: &'a W,
    target: LatLon,
    // evaluating the distance is not free and nodes get asked for repeatedly
    cache: Vec<Weight>,
}

impl<'a, W: Weighting> BeelinePotential<'a, W> {
    pub fn new(graph: &'a GraphStorage, weighting: &'a W) -> Self {
        BeelinePotential {
            graph,
            weighting,
            target: LatLon::new(0.0, 0.0),
            cache: Vec::new(),
        }
    }
}

impl<'a, W: Weighting> Potential for BeelinePotential<'a, W> {
    fn init(&mut self, target: NodeId) {
        self.target = self.graph.coords(target);
        self.cache.clear();
        self.cache.resize(self.graph.node_count(), -1.0);
    }

    fn potential(&mut self, node: NodeId) -> Weight {
        let cached = self.cache[node as usize];
        if cached >= 0.0 {
            return cached;
        }
        let estimate = self.weighting.min_weight(self.graph.coords(node).distance(&self.target));
        self.cache[node as usize] = estimate;
        estimate
    }
}

/// Combines a potential towards the target with one towards the source
/// so that both directions of a bidirectional search work on the same reduced costs.
/// The forward search uses `potential`, the backward search its negation.
#[derive(Debug)]
pub struct AveragePotential<PF, PB> {
    forward_potential: PF,
    backward_potential: PB,
}

impl<PF: Potential, PB: Potential> AveragePotential<PF, PB> {
    pub fn new(forward_potential: PF, backward_potential: PB) -> Self {
        Self {
            forward_potential,
            backward_potential,
        }
    }

    pub fn init(&mut self, source: NodeId, target: NodeId) {
        self.forward_potential.init(target);
        self.backward_potential.init(source);
    }

    pub fn potential(&mut self, node: NodeId) -> Weight {
        (self.forward_potential.potential(node) - self.backward_potential.potential(node)) / 2.0
    }
}
