//! Router configuration, loaded from JSON.
//!
//! Every field has a default, so `{}` is a valid config and a file only needs to
//! mention what it wants to change.
//!
//! ```
//! # use road_router::config::RouterConfig;
//! let config = RouterConfig::from_json_str(r#"{ "default_algorithm": "astarbi", "ch": { "profiles": [{ "vehicle": "car", "weighting": "fastest" }] } }"#)?;
//! assert_eq!(config.default_weighting, "fastest");
//! assert_eq!(config.ch.profiles.len(), 1);
//! # Ok::<(), road_router::RoutingError>(())
//! ```

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use crate::encoding::EncoderConfig;
use crate::weighting::WeightingKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Vehicles the router answers requests for. Each one has to be part of the graph with exactly
    /// this encoding. Empty serves every vehicle of the graph.
    pub vehicles: Vec<EncoderConfig>,
    /// Used when a request does not name a weighting.
    pub default_weighting: String,
    /// Used when a request does not name an algorithm and no hierarchy is prepared.
    pub default_algorithm: String,
    pub ch: ChConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            vehicles: Vec::new(),
            default_weighting: "fastest".to_string(),
            default_algorithm: "dijkstrabi".to_string(),
            ch: ChConfig::default(),
        }
    }
}

impl RouterConfig {
    pub fn from_json_str(json: &str) -> Result<RouterConfig> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<RouterConfig> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

/// Contraction hierarchy preprocessing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChConfig {
    /// Hierarchies `Router::prepare_configured_ch` builds.
    pub profiles: Vec<ChProfile>,
    /// Each witness search gives up after settling this many nodes.
    pub witness_settle_limit: usize,
    pub edge_difference_factor: i64,
    pub contracted_neighbors_factor: i64,
    /// Compute the initial node priorities on the rayon pool.
    pub parallel_priorities: bool,
}

impl Default for ChConfig {
    fn default() -> Self {
        ChConfig {
            profiles: Vec::new(),
            witness_settle_limit: 500,
            edge_difference_factor: 10,
            contracted_neighbors_factor: 1,
            parallel_priorities: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChProfile {
    pub vehicle: String,
    pub weighting: WeightingKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        assert_eq!(RouterConfig::from_json_str("{}").unwrap(), RouterConfig::default());
    }

    #[test]
    fn partial_vehicle_config() {
        let config = RouterConfig::from_json_str(
            r#"{ "vehicles": [{ "name": "car", "speed_bits": 5, "speed_factor": 5.0, "max_speed": 50.0 }], "ch": { "witness_settle_limit": 10 } }"#,
        )
        .unwrap();
        assert_eq!(config.vehicles.len(), 1);
        assert!(!config.vehicles[0].two_directions);
        assert_eq!(config.ch.witness_settle_limit, 10);
        assert_eq!(config.ch.edge_difference_factor, 10);
    }

    #[test]
    fn ch_profiles_name_their_weighting() {
        let config = RouterConfig::from_json_str(r#"{ "ch": { "profiles": [{ "vehicle": "bike", "weighting": "shortest" }] } }"#).unwrap();
        assert_eq!(
            config.ch.profiles,
            vec![ChProfile {
                vehicle: "bike".to_string(),
                weighting: WeightingKind::Shortest,
            }]
        );
        assert!(RouterConfig::from_json_str(r#"{ "ch": { "profiles": [{ "vehicle": "bike", "weighting": "scenic" }] } }"#).is_err());
    }

    #[test]
    fn broken_json_is_a_config_error() {
        assert!(matches!(RouterConfig::from_json_str("{ vehicles"), Err(crate::RoutingError::Config(_))));
    }
}
