//! Shortest path algorithms.
//!
//! All searches here allocate their state per query and only read the graph,
//! so any number of them may run in parallel on one `GraphStorage`.

use crate::datastr::graph::*;
use crate::{Result, RoutingError};
use std::sync::atomic::{AtomicBool, Ordering};

pub mod a_star;
pub mod contraction_hierarchy;
pub mod dijkstra;
pub mod path;

pub use self::path::Path;

/// Simply a source-target pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query {
    pub from: NodeId,
    pub to: NodeId,
}

/// Polled once per settled node, a set flag aborts the search with `Cancelled`.
pub type CancelFlag<'a> = Option<&'a AtomicBool>;

#[inline]
pub(crate) fn check_cancelled(cancel: CancelFlag) -> Result<()> {
    match cancel {
        Some(flag) if flag.load(Ordering::Relaxed) => Err(RoutingError::Cancelled),
        _ => Ok(()),
    }
}
