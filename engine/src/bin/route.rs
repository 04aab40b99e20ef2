// Answers a route request on a stored graph.
// Args: <graph_dir> <lat1> <lon1> <lat2> <lon2> [vehicle] [weighting] [algorithm|all]
// Uses `<graph_dir>/config.json` and a stored hierarchy for vehicle and weighting if present.

#[macro_use]
extern crate road_router;

use std::{env, error::Error, path::Path, sync::Arc};

use road_router::{
    algo::contraction_hierarchy::ContractionHierarchy,
    cli::{parse_arg, CliErr},
    config::RouterConfig,
    datastr::graph::*,
    geo::LatLon,
    io::*,
    report::*,
    weighting::WeightingKind,
    RouteOptions, RouteRequest, Router,
};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let _reporter = enable_reporting("route");

    let mut args = env::args().skip(1);
    let arg = &args.next().ok_or(CliErr("No graph directory arg given"))?;
    let path = Path::new(arg);
    let from = LatLon::new(parse_arg(&mut args, "invalid source latitude")?, parse_arg(&mut args, "invalid source longitude")?);
    let to = LatLon::new(parse_arg(&mut args, "invalid target latitude")?, parse_arg(&mut args, "invalid target longitude")?);
    let vehicle = args.next().unwrap_or_else(|| "car".to_string());
    let weighting = args.next().unwrap_or_default();
    let algorithm = args.next().unwrap_or_default();

    let config = if path.join("config.json").exists() {
        RouterConfig::from_json_file(path.join("config.json"))?
    } else {
        RouterConfig::default()
    };
    let kind = WeightingKind::resolve(&weighting, &config.default_weighting);

    let graph = Arc::new(report_time_with_key("loading graph", "graph_loading_time_ms", || GraphStorage::reconstruct_from(&path))?);
    report!("graph", { "num_nodes": graph.node_count(), "num_edges": graph.edge_count() });

    let mut router = Router::new(graph, config)?;
    let ch_dir = path.join(format!("ch_{}_{}", vehicle.to_ascii_lowercase(), kind));
    if ch_dir.exists() {
        router.add_ch(ContractionHierarchy::reconstruct_from(&ch_dir)?)?;
    }

    // "all" runs the request once with every algorithm
    let algorithms: Vec<&str> = if algorithm == "all" {
        vec!["dijkstra", "dijkstrabi", "astar", "astarbi", "ch"]
    } else {
        vec![algorithm.as_str()]
    };

    let mut algo_runs_ctxt = push_collection_context("algo_runs".to_string());
    for algorithm in algorithms {
        let _run_ctxt = algo_runs_ctxt.push_collection_item();
        let request = RouteRequest::new(from, to, RouteOptions::new(&vehicle).weighting(&weighting).algorithm(algorithm));
        let route = report_time("route", || router.route(&request))?;

        report!("found", route.found);
        if route.found {
            report!("distance_m", route.distance);
            report!("weight", route.weight);
            report!("time_ms", route.time_ms);
            report!("num_edges", route.edges.len());
            report_silent!("points", route.points(router.graph())?.iter().map(|p| [p.lat, p.lon]).collect::<Vec<_>>());
        }
        log::info!("{}: found: {}, distance: {}m, time: {}ms", request.options.algorithm, route.found, route.distance, route.time_ms);
    }

    Ok(())
}
