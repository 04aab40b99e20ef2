//! Shortest path engine for road networks shared by several vehicles.
//!
//! The graph is stored once, every edge carries a packed `Flags` word with
//! per-vehicle speed and access bits (see `encoding`).
//! A `Weighting` turns those bits into traversal costs and an admissible lower bound.
//! On top of that we have plain and bidirectional Dijkstra and A* as well as
//! contraction hierarchies (see `algo`).
//! `router::Router` ties everything together behind a single `route` call.

#[macro_use]
pub mod report;

pub mod algo;
pub mod cli;
pub mod config;
pub mod datastr;
pub mod encoding;
pub mod error;
pub mod geo;
pub mod io;
pub mod router;
pub mod weighting;

pub use crate::error::{Result, RoutingError};
pub use crate::router::{RouteOptions, RouteRequest, Router};

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
