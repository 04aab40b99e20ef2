//! Data structures used by algorithms.

pub mod graph;
pub mod index_heap;
pub mod location_index;
pub mod node_order;
pub mod timestamped_vector;
