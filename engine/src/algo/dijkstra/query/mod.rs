//! Query servers for the different dijkstra variants

use super::*;
use crate::algo::a_star::*;

pub mod bidirectional_dijkstra;
pub mod dijkstra;

// Queries are only ever answered on the graph they came from, but the servers are public.
fn check_query(graph: &GraphStorage, query: Query) -> Result<()> {
    graph.lat_lon(query.from)?;
    graph.lat_lon(query.to)?;
    Ok(())
}
