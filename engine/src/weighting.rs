//! Edge cost functions.
//!
//! A weighting turns the flags of an oriented edge into a traversal cost for one vehicle
//! and provides a lower bound for the cost of covering a straight line distance, which A* uses as heuristic.
//! Weightings never see edges their vehicle may not use in travel direction,
//! searches check `FlagEncoder::is_forward` first, so the speed is always positive.

use crate::datastr::graph::{EdgeRef, Weight};
use crate::encoding::FlagEncoder;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cost function over edges, bound to one vehicle.
pub trait Weighting: fmt::Display {
    fn encoder(&self) -> &FlagEncoder;

    fn kind(&self) -> WeightingKind;

    /// Cost of traversing `edge` from `edge.base` to `edge.adj`.
    fn calc_weight(&self, edge: &EdgeRef) -> Weight;

    /// Lower bound for the cost of any edge at least `distance` meters long.
    fn min_weight(&self, distance: f64) -> Weight;

    /// Inverse of `calc_weight`: the distance which would cost `weight` on this edge.
    fn revert_weight(&self, edge: &EdgeRef, weight: Weight) -> f64;

    /// Travel time in milliseconds.
    fn calc_millis(&self, edge: &EdgeRef) -> f64 {
        edge.distance * 3600.0 / self.encoder().get_speed(edge.flags)
    }
}

/// The available weightings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightingKind {
    Fastest,
    Shortest,
}

impl WeightingKind {
    pub fn name(self) -> &'static str {
        match self {
            WeightingKind::Fastest => "fastest",
            WeightingKind::Shortest => "shortest",
        }
    }

    /// Exact lookup, case insensitive.
    pub fn from_name(name: &str) -> Option<WeightingKind> {
        match name.trim().to_ascii_lowercase().as_str() {
            "fastest" => Some(WeightingKind::Fastest),
            "shortest" => Some(WeightingKind::Shortest),
            _ => None,
        }
    }

    /// Relaxed lookup as used for requests.
    /// An empty name selects `default`, anything unknown falls back to `Shortest`.
    pub fn resolve(name: &str, default: &str) -> WeightingKind {
        let name = if name.trim().is_empty() { default } else { name };
        Self::from_name(name).unwrap_or_else(|| {
            log::warn!("unknown weighting '{}', falling back to shortest", name);
            WeightingKind::Shortest
        })
    }
}

impl fmt::Display for WeightingKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cost is travel time, `distance / speed`.
#[derive(Debug, Clone, Copy)]
pub struct FastestWeighting<'a> {
    encoder: &'a FlagEncoder,
    max_speed: f64,
}

impl<'a> FastestWeighting<'a> {
    pub fn new(encoder: &'a FlagEncoder) -> Self {
        FastestWeighting {
            encoder,
            max_speed: encoder.max_speed(),
        }
    }
}

impl<'a> Weighting for FastestWeighting<'a> {
    fn encoder(&self) -> &FlagEncoder {
        self.encoder
    }

    fn kind(&self) -> WeightingKind {
        WeightingKind::Fastest
    }

    #[inline]
    fn calc_weight(&self, edge: &EdgeRef) -> Weight {
        edge.distance / self.encoder.get_speed(edge.flags)
    }

    #[inline]
    fn min_weight(&self, distance: f64) -> Weight {
        distance / self.max_speed
    }

    fn revert_weight(&self, edge: &EdgeRef, weight: Weight) -> f64 {
        weight * self.encoder.get_speed(edge.flags)
    }
}

impl<'a> fmt::Display for FastestWeighting<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FASTEST|{}", self.encoder)
    }
}

/// Cost is the distance, the speed only matters for access.
#[derive(Debug, Clone, Copy)]
pub struct ShortestWeighting<'a> {
    encoder: &'a FlagEncoder,
}

impl<'a> ShortestWeighting<'a> {
    pub fn new(encoder: &'a FlagEncoder) -> Self {
        ShortestWeighting { encoder }
    }
}

impl<'a> Weighting for ShortestWeighting<'a> {
    fn encoder(&self) -> &FlagEncoder {
        self.encoder
    }

    fn kind(&self) -> WeightingKind {
        WeightingKind::Shortest
    }

    #[inline]
    fn calc_weight(&self, edge: &EdgeRef) -> Weight {
        edge.distance
    }

    #[inline]
    fn min_weight(&self, distance: f64) -> Weight {
        distance
    }

    fn revert_weight(&self, _edge: &EdgeRef, weight: Weight) -> f64 {
        weight
    }
}

impl<'a> fmt::Display for ShortestWeighting<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SHORTEST|{}", self.encoder)
    }
}

/// Closed set of weightings, so searches can be monomorphized once for all of them.
#[derive(Debug, Clone, Copy)]
pub enum AnyWeighting<'a> {
    Fastest(FastestWeighting<'a>),
    Shortest(ShortestWeighting<'a>),
}

impl<'a> AnyWeighting<'a> {
    pub fn new(kind: WeightingKind, encoder: &'a FlagEncoder) -> Self {
        match kind {
            WeightingKind::Fastest => AnyWeighting::Fastest(FastestWeighting::new(encoder)),
            WeightingKind::Shortest => AnyWeighting::Shortest(ShortestWeighting::new(encoder)),
        }
    }
}

/// Build a weighting by name, see `WeightingKind::resolve` for the fallback rules.
pub fn create_weighting<'a>(name: &str, default: &str, encoder: &'a FlagEncoder) -> AnyWeighting<'a> {
    AnyWeighting::new(WeightingKind::resolve(name, default), encoder)
}

impl<'a> Weighting for AnyWeighting<'a> {
    fn encoder(&self) -> &FlagEncoder {
        match self {
            AnyWeighting::Fastest(w) => w.encoder(),
            AnyWeighting::Shortest(w) => w.encoder(),
        }
    }

    fn kind(&self) -> WeightingKind {
        match self {
            AnyWeighting::Fastest(_) => WeightingKind::Fastest,
            AnyWeighting::Shortest(_) => WeightingKind::Shortest,
        }
    }

    #[inline]
    fn calc_weight(&self, edge: &EdgeRef) -> Weight {
        match self {
            AnyWeighting::Fastest(w) => w.calc_weight(edge),
            AnyWeighting::Shortest(w) => w.calc_weight(edge),
        }
    }

    #[inline]
    fn min_weight(&self, distance: f64) -> Weight {
        match self {
            AnyWeighting::Fastest(w) => w.min_weight(distance),
            AnyWeighting::Shortest(w) => w.min_weight(distance),
        }
    }

    fn revert_weight(&self, edge: &EdgeRef, weight: Weight) -> f64 {
        match self {
            AnyWeighting::Fastest(w) => w.revert_weight(edge, weight),
            AnyWeighting::Shortest(w) => w.revert_weight(edge, weight),
        }
    }
}

impl<'a> fmt::Display for AnyWeighting<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnyWeighting::Fastest(w) => fmt::Display::fmt(w, f),
            AnyWeighting::Shortest(w) => fmt::Display::fmt(w, f),
        }
    }
}
