//! The `route` entry point.
//!
//! A `Router` owns the graph, a location index for snapping coordinates and the prepared hierarchies.
//! After preparation it is only ever read, so one instance can be shared between threads
//! and answer any number of concurrent `route` calls.

use crate::algo::{
    a_star::BeelinePotential,
    contraction_hierarchy::{self, ContractionHierarchy},
    dijkstra::{bidirectional_dijkstra, dijkstra},
    Path, Query,
};
use crate::config::{EncoderConfig, RouterConfig};
use crate::datastr::{graph::*, location_index::LocationIndex};
use crate::encoding::{EncodingManager, FlagEncoder};
use crate::geo::LatLon;
use crate::report::push_context;
use crate::weighting::{create_weighting, AnyWeighting, Weighting, WeightingKind};
use crate::{Result, RoutingError};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::{atomic::AtomicBool, Arc};

/// The search algorithms a request can pick by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Dijkstra,
    DijkstraBi,
    AStar,
    AStarBi,
    Ch,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Dijkstra => "dijkstra",
            Algorithm::DijkstraBi => "dijkstrabi",
            Algorithm::AStar => "astar",
            Algorithm::AStarBi => "astarbi",
            Algorithm::Ch => "ch",
        }
    }

    pub fn from_name(name: &str) -> Result<Algorithm> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dijkstra" => Ok(Algorithm::Dijkstra),
            "dijkstrabi" => Ok(Algorithm::DijkstraBi),
            "astar" => Ok(Algorithm::AStar),
            "astarbi" => Ok(Algorithm::AStarBi),
            "ch" => Ok(Algorithm::Ch),
            _ => Err(RoutingError::UnsupportedAlgorithm(name.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything about a request except the end points.
/// Empty names select the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    pub vehicle: String,
    pub weighting: String,
    pub algorithm: String,
    /// Setting the flag aborts the search with `Cancelled`.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl RouteOptions {
    pub fn new(vehicle: &str) -> Self {
        RouteOptions {
            vehicle: vehicle.to_string(),
            ..Default::default()
        }
    }

    pub fn weighting(mut self, weighting: &str) -> Self {
        self.weighting = weighting.to_string();
        self
    }

    pub fn algorithm(mut self, algorithm: &str) -> Self {
        self.algorithm = algorithm.to_string();
        self
    }
}

#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub from: LatLon,
    pub to: LatLon,
    pub options: RouteOptions,
}

impl RouteRequest {
    pub fn new(from: LatLon, to: LatLon, options: RouteOptions) -> Self {
        RouteRequest { from, to, options }
    }
}

type ChKey = (String, WeightingKind);

#[derive(Debug)]
pub struct Router {
    graph: Arc<GraphStorage>,
    index: LocationIndex,
    hierarchies: FxHashMap<ChKey, ContractionHierarchy>,
    config: RouterConfig,
}

impl Router {
    /// Fails with `InvalidEncoderConfig` if a vehicle of `config.vehicles` is missing in the graph
    /// or was encoded differently.
    pub fn new(graph: Arc<GraphStorage>, config: RouterConfig) -> Result<Router> {
        for vehicle in &config.vehicles {
            let encoder = graph
                .encoding()
                .get_encoder(&vehicle.name)
                .map_err(|_| RoutingError::InvalidEncoderConfig(format!("vehicle {} is not part of the graph ({})", vehicle.name, graph.encoding())))?;
            let expected = EncoderConfig {
                name: encoder.name().to_string(),
                ..vehicle.clone()
            };
            if encoder.config() != expected {
                return Err(RoutingError::InvalidEncoderConfig(format!(
                    "vehicle {} is configured as {:?} but the graph was encoded with {:?}",
                    vehicle.name,
                    vehicle,
                    encoder.config()
                )));
            }
        }

        let index = LocationIndex::new(&graph);
        Ok(Router {
            graph,
            index,
            hierarchies: FxHashMap::default(),
            config,
        })
    }

    pub fn graph(&self) -> &GraphStorage {
        &self.graph
    }

    pub fn encoding(&self) -> &EncodingManager {
        self.graph.encoding()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Encoder of a vehicle this router serves.
    pub fn encoder(&self, vehicle: &str) -> Result<&FlagEncoder> {
        served_encoder(&self.graph, &self.config, vehicle)
    }

    pub fn has_ch(&self, vehicle: &str, weighting: &str) -> bool {
        match self.encoder(vehicle) {
            Ok(encoder) => {
                let kind = WeightingKind::resolve(weighting, &self.config.default_weighting);
                self.hierarchies.contains_key(&(encoder.name().to_string(), kind))
            }
            Err(_) => false,
        }
    }

    pub fn hierarchy(&self, vehicle: &str, weighting: WeightingKind) -> Option<&ContractionHierarchy> {
        let encoder = self.encoder(vehicle).ok()?;
        self.hierarchies.get(&(encoder.name().to_string(), weighting))
    }

    /// Run CH preprocessing for one vehicle and weighting.
    ///
    /// Returns `Ok(false)` if preprocessing failed, queries then keep using the plain searches.
    /// An unknown vehicle is an error.
    pub fn prepare_ch(&mut self, vehicle: &str, weighting: &str) -> Result<bool> {
        let encoder = served_encoder(&self.graph, &self.config, vehicle)?;
        let weighting = create_weighting(weighting, &self.config.default_weighting, encoder);
        let key = (encoder.name().to_string(), weighting.kind());
        let _ctxt = push_context(format!("ch_{}_{}", key.0, key.1));

        match contraction_hierarchy::contract(&self.graph, &weighting, &self.config.ch) {
            Ok(ch) => {
                self.hierarchies.insert(key, ch);
                Ok(true)
            }
            Err(e) => {
                log::warn!("CH preparation for {} failed, falling back to plain search: {}", weighting, e);
                self.hierarchies.remove(&key);
                Ok(false)
            }
        }
    }

    /// Prepare every profile listed in the config.
    /// Returns how many hierarchies are available afterwards.
    pub fn prepare_configured_ch(&mut self) -> Result<usize> {
        for profile in self.config.ch.profiles.clone() {
            self.prepare_ch(&profile.vehicle, profile.weighting.name())?;
        }
        Ok(self.hierarchies.len())
    }

    /// Register a hierarchy built elsewhere, usually one loaded from disk.
    pub fn add_ch(&mut self, ch: ContractionHierarchy) -> Result<()> {
        let encoder = served_encoder(&self.graph, &self.config, ch.vehicle())?;
        let weighting = AnyWeighting::new(ch.weighting(), encoder);
        if !ch.is_compatible(&self.graph, &weighting) {
            return Err(RoutingError::MalformedGraph(format!(
                "hierarchy for {} with {} nodes does not fit graph with {} nodes",
                weighting,
                ch.num_nodes(),
                self.graph.node_count()
            )));
        }
        self.hierarchies.insert((encoder.name().to_string(), ch.weighting()), ch);
        Ok(())
    }

    /// Route between two coordinates, each snapped to the closest node accessible to the vehicle.
    ///
    /// The vehicle is checked before anything else.
    /// Finding no connection is not an error, the returned path has `found == false`.
    pub fn route(&self, request: &RouteRequest) -> Result<Path> {
        let encoder = self.encoder(&request.options.vehicle)?;
        let from = self.index.closest(&self.graph, request.from, encoder)?;
        let to = self.index.closest(&self.graph, request.to, encoder)?;
        log::debug!("snapped {} to node {} and {} to node {}", request.from, from, request.to, to);
        self.route_nodes(from, to, &request.options)
    }

    /// Route between two node ids.
    pub fn route_nodes(&self, from: NodeId, to: NodeId, options: &RouteOptions) -> Result<Path> {
        let graph = &*self.graph;
        let encoder = self.encoder(&options.vehicle)?;
        let weighting = create_weighting(&options.weighting, &self.config.default_weighting, encoder);
        let ch = self.hierarchies.get(&(encoder.name().to_string(), weighting.kind()));
        let algorithm = self.select_algorithm(&options.algorithm, ch.is_some())?;

        report!("algo", algorithm.name());
        log::debug!("routing {} -> {} with {} on {}", from, to, algorithm, weighting);

        let query = Query { from, to };
        let cancel = options.cancel.as_deref();
        match (algorithm, ch) {
            (Algorithm::Dijkstra, _) => dijkstra::Server::new(graph, &weighting).query(query, cancel),
            (Algorithm::AStar, _) => dijkstra::Server::new_with_potential(graph, &weighting, BeelinePotential::new(graph, &weighting)).query(query, cancel),
            (Algorithm::AStarBi, _) => bidirectional_dijkstra::Server::new_with_potentials(
                graph,
                &weighting,
                BeelinePotential::new(graph, &weighting),
                BeelinePotential::new(graph, &weighting),
            )
            .query(query, cancel),
            (Algorithm::Ch, Some(ch)) => contraction_hierarchy::query::Server::new(graph, ch, &weighting)?.query(query, cancel),
            (Algorithm::DijkstraBi, _) | (Algorithm::Ch, None) => bidirectional_dijkstra::Server::new(graph, &weighting).query(query, cancel),
        }
    }

    fn select_algorithm(&self, name: &str, ch_available: bool) -> Result<Algorithm> {
        let algorithm = if !name.trim().is_empty() {
            Algorithm::from_name(name)?
        } else if ch_available {
            Algorithm::Ch
        } else {
            Algorithm::from_name(&self.config.default_algorithm)?
        };

        if algorithm == Algorithm::Ch && !ch_available {
            log::warn!("no contraction hierarchy prepared, using dijkstrabi");
            return Ok(Algorithm::DijkstraBi);
        }
        Ok(algorithm)
    }
}

fn served_encoder<'g>(graph: &'g GraphStorage, config: &RouterConfig, vehicle: &str) -> Result<&'g FlagEncoder> {
    let encoder = graph.encoding().get_encoder(vehicle)?;
    if !config.vehicles.is_empty() && !config.vehicles.iter().any(|served| served.name.trim().eq_ignore_ascii_case(encoder.name())) {
        return Err(RoutingError::UnsupportedVehicle(vehicle.to_string()));
    }
    Ok(encoder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChProfile;
    use std::sync::atomic::Ordering;

    // A square of footways with one diagonal road only cars may use.
    //
    // 0 ---- 1
    // |    / |
    // |  /   |
    // 3 ---- 2
    fn router() -> Router {
        Router::new(Arc::new(square()), RouterConfig::default()).unwrap()
    }

    fn square() -> GraphStorage {
        let encoding = EncodingManager::from_names("car,foot").unwrap();
        let car = encoding.get_encoder("car").unwrap().clone();
        let foot = encoding.get_encoder("foot").unwrap().clone();
        let footway = foot.set_properties(5.0, true, true);
        let road = car.set_properties(50.0, true, true);
        let mut builder = GraphBuilder::new(encoding);
        builder.add_node(49.010, 8.400).unwrap();
        builder.add_node(49.010, 8.410).unwrap();
        builder.add_node(49.000, 8.410).unwrap();
        builder.add_node(49.000, 8.400).unwrap();
        builder.add_edge(0, 1, 800.0, footway).unwrap();
        builder.add_edge(1, 2, 1200.0, footway).unwrap();
        builder.add_edge(2, 3, 800.0, footway).unwrap();
        builder.add_edge(3, 0, 1200.0, footway).unwrap();
        builder.add_edge(3, 1, 1500.0, road).unwrap();
        builder.freeze()
    }

    #[test]
    fn every_algorithm_finds_the_same_route() {
        let mut router = router();
        router.prepare_ch("foot", "shortest").unwrap();
        for algorithm in ["dijkstra", "dijkstrabi", "astar", "astarbi", "ch", ""] {
            let options = RouteOptions::new("foot").weighting("shortest").algorithm(algorithm);
            let path = router.route_nodes(0, 2, &options).unwrap();
            assert!(path.found, "{}", algorithm);
            assert_eq!(path.distance, 2000.0, "{}", algorithm);
        }
    }

    #[test]
    fn vehicles_use_their_own_edges() {
        let router = router();
        let path = router.route_nodes(3, 1, &RouteOptions::new("car")).unwrap();
        assert_eq!(path.edges, vec![4]);
        let path = router.route_nodes(3, 1, &RouteOptions::new("foot").weighting("shortest")).unwrap();
        assert_eq!(path.distance, 2000.0);
        assert!(!router.route_nodes(0, 2, &RouteOptions::new("car")).unwrap().found);
    }

    #[test]
    fn snaps_coordinates() {
        let router = router();
        let request = RouteRequest::new(LatLon::new(49.0101, 8.4001), LatLon::new(49.0001, 8.4099), RouteOptions::new("foot"));
        let path = router.route(&request).unwrap();
        assert_eq!(path.nodes.first(), Some(&0));
        assert_eq!(path.nodes.last(), Some(&2));
    }

    #[test]
    fn unknown_vehicle_fails_first() {
        let router = router();
        let request = RouteRequest::new(LatLon::new(123.0, 0.0), LatLon::new(49.0, 8.4), RouteOptions::new("bike"));
        assert!(matches!(router.route(&request), Err(RoutingError::UnsupportedVehicle(_))));
    }

    #[test]
    fn invalid_coordinates() {
        let router = router();
        let request = RouteRequest::new(LatLon::new(123.0, 0.0), LatLon::new(49.0, 8.4), RouteOptions::new("foot"));
        assert!(matches!(router.route(&request), Err(RoutingError::InvalidCoordinates { .. })));
    }

    #[test]
    fn algorithm_selection() {
        let mut router = router();
        assert_eq!(router.select_algorithm("", false).unwrap(), Algorithm::DijkstraBi);
        assert_eq!(router.select_algorithm("ch", false).unwrap(), Algorithm::DijkstraBi);
        assert_eq!(router.select_algorithm("", true).unwrap(), Algorithm::Ch);
        assert_eq!(router.select_algorithm("AStar", true).unwrap(), Algorithm::AStar);
        assert!(matches!(router.select_algorithm("bellmanford", false), Err(RoutingError::UnsupportedAlgorithm(_))));

        let options = RouteOptions::new("foot").algorithm("ch");
        assert!(router.route_nodes(0, 2, &options).unwrap().found);

        router.config.ch.profiles = vec![ChProfile {
            vehicle: "car".to_string(),
            weighting: WeightingKind::Fastest,
        }];
        assert_eq!(router.prepare_configured_ch().unwrap(), 1);
        assert!(router.has_ch("car", ""));
        assert!(!router.has_ch("car", "shortest"));
        assert!(router.prepare_ch("bike", "fastest").is_err());
    }

    #[test]
    fn configured_vehicles_restrict_requests() {
        let config = RouterConfig {
            vehicles: vec![EncoderConfig::foot()],
            ..Default::default()
        };
        let mut router = Router::new(Arc::new(square()), config).unwrap();
        assert!(router.route_nodes(0, 2, &RouteOptions::new("FOOT")).unwrap().found);
        assert!(matches!(router.route_nodes(0, 2, &RouteOptions::new("car")), Err(RoutingError::UnsupportedVehicle(_))));
        assert!(matches!(router.prepare_ch("car", "fastest"), Err(RoutingError::UnsupportedVehicle(_))));
        assert!(!router.has_ch("car", "fastest"));
    }

    #[test]
    fn configured_vehicles_must_match_the_graph() {
        let missing = RouterConfig {
            vehicles: vec![EncoderConfig::bike()],
            ..Default::default()
        };
        assert!(matches!(Router::new(Arc::new(square()), missing), Err(RoutingError::InvalidEncoderConfig(_))));

        let mut faster_feet = EncoderConfig::foot();
        faster_feet.max_speed *= 2.0;
        let mismatch = RouterConfig {
            vehicles: vec![faster_feet],
            ..Default::default()
        };
        assert!(matches!(Router::new(Arc::new(square()), mismatch), Err(RoutingError::InvalidEncoderConfig(_))));
    }

    #[test]
    fn cancellation() {
        let router = router();
        let mut options = RouteOptions::new("foot");
        let flag = Arc::new(AtomicBool::new(false));
        options.cancel = Some(flag.clone());
        assert!(router.route_nodes(0, 2, &options).unwrap().found);
        flag.store(true, Ordering::Relaxed);
        assert!(matches!(router.route_nodes(0, 2, &options), Err(RoutingError::Cancelled)));
    }

    #[test]
    fn loaded_hierarchy_must_fit() {
        let mut router = router();
        let other = {
            let encoding = EncodingManager::from_names("car,foot").unwrap();
            let mut builder = GraphBuilder::new(encoding);
            builder.add_node(49.0, 8.4).unwrap();
            builder.freeze()
        };
        let foot = other.encoding().get_encoder("foot").unwrap();
        let ch = contraction_hierarchy::contract(&other, &AnyWeighting::new(WeightingKind::Fastest, foot), &Default::default()).unwrap();
        assert!(matches!(router.add_ch(ch), Err(RoutingError::MalformedGraph(_))));
    }
}
