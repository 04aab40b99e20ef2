//! The road graph shared by all vehicles.
//!
//! Edges are stored once as plain records (base node, adjacent node, distance, flags)
//! and every node references its incident edges through an adjacency array in CSR layout.
//! Which directions a vehicle may use, and how fast, is decided by the flags only.

use crate::encoding::{EncodingManager, Flags};

mod storage;

pub use self::storage::{EdgeIter, GraphBuilder, GraphStorage};

/// Node ids are 32bit unsigned ints
pub type NodeId = u32;
/// Edge ids are 32bit unsigned ints
pub type EdgeId = u32;
/// Weights are non negative reals, their unit depends on the weighting.
pub type Weight = f64;
pub const INFINITY: Weight = f64::INFINITY;

/// A view of one edge, oriented in travel direction `base -> adj`.
///
/// `flags` are oriented the same way, so `FlagEncoder::is_forward(flags)` tells
/// whether a vehicle may travel from `base` to `adj` and `get_speed(flags)` at which speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeRef {
    pub edge: EdgeId,
    pub base: NodeId,
    pub adj: NodeId,
    pub distance: f64,
    pub flags: Flags,
}

impl EdgeRef {
    /// The same edge traversed from `adj` to `base`.
    pub fn reversed(&self, encoding: &EncodingManager) -> EdgeRef {
        EdgeRef {
            edge: self.edge,
            base: self.adj,
            adj: self.base,
            distance: self.distance,
            flags: encoding.reverse_flags(self.flags),
        }
    }

    pub fn is_loop(&self) -> bool {
        self.base == self.adj
    }
}

/// Turn a degree sequence into the first out array of a CSR graph.
pub fn degrees_to_first_out<I: Iterator<Item = u32>>(degrees: I) -> impl Iterator<Item = u32> {
    std::iter::once(0).chain(degrees.scan(0, |state, degree| {
        *state += degree;
        Some(*state)
    }))
}
