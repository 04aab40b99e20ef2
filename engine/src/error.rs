//! Error types of the routing engine.
//!
//! Finding no route is not an error, it is reported through `Path::found`.
//! Everything here either is a configuration problem surfaced before a search starts
//! or a programming error like an out of range id.

use thiserror::Error;

/// Which kind of id was out of range in an `IndexError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Node,
    Edge,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            IndexKind::Node => f.write_str("node"),
            IndexKind::Edge => f.write_str("edge"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("vehicle '{0}' is not registered in the encoding manager")]
    UnsupportedVehicle(String),

    #[error("algorithm '{0}' is not supported")]
    UnsupportedAlgorithm(String),

    #[error("{kind} id {index} out of range (count {len})")]
    IndexError { kind: IndexKind, index: usize, len: usize },

    #[error("invalid coordinates {lat}, {lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("no accessible node found near {lat}, {lon}")]
    PointNotFound { lat: f64, lon: f64 },

    #[error("invalid edge: {0}")]
    InvalidEdge(String),

    #[error("encoders need {bits} bits but flags only have {available}")]
    EncodingOverflow { bits: u32, available: u32 },

    #[error("invalid encoder config: {0}")]
    InvalidEncoderConfig(String),

    #[error("malformed graph: {0}")]
    MalformedGraph(String),

    #[error("search was cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RoutingError>;

impl RoutingError {
    pub(crate) fn node_index(index: usize, len: usize) -> Self {
        RoutingError::IndexError {
            kind: IndexKind::Node,
            index,
            len,
        }
    }

    pub(crate) fn edge_index(index: usize, len: usize) -> Self {
        RoutingError::IndexError {
            kind: IndexKind::Edge,
            index,
            len,
        }
    }
}
