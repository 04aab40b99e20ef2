// Builds a contraction hierarchy for one vehicle and weighting.
// Takes the graph directory, the vehicle and optionally the weighting as arguments.
// The hierarchy is stored next to the graph in `ch_<vehicle>_<weighting>`.

#[macro_use]
extern crate road_router;

use std::{env, error::Error, path::Path, sync::Arc};

use road_router::{
    algo::contraction_hierarchy,
    cli::CliErr,
    config::RouterConfig,
    datastr::graph::*,
    io::*,
    report::*,
    weighting::{create_weighting, Weighting},
    Router,
};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let _reporter = enable_reporting("contract");

    let mut args = env::args().skip(1);
    let arg = &args.next().ok_or(CliErr("No graph directory arg given"))?;
    let path = Path::new(arg);
    let vehicle = args.next().ok_or(CliErr("No vehicle arg given"))?;
    let weighting = args.next().unwrap_or_default();

    let config = if path.join("config.json").exists() {
        RouterConfig::from_json_file(path.join("config.json"))?
    } else {
        RouterConfig::default()
    };

    let graph = GraphStorage::reconstruct_from(&path)?;
    report!("graph", { "num_nodes": graph.node_count(), "num_edges": graph.edge_count() });
    let router = Router::new(Arc::new(graph), config)?;

    let encoder = router.encoder(&vehicle)?;
    let weighting = create_weighting(&weighting, &router.config().default_weighting, encoder);
    report!("weighting", weighting.to_string());

    let ch = contraction_hierarchy::contract(router.graph(), &weighting, &router.config().ch)?;
    report!("num_arcs", ch.num_arcs());

    ch.deconstruct_to(&path.join(format!("ch_{}_{}", encoder.name(), weighting.kind())))?;

    Ok(())
}
