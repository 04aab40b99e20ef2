use super::*;
use crate::encoding::EncoderConfig;
use crate::geo::LatLon;
use crate::io::*;
use crate::{Result, RoutingError};
use std::sync::Arc;

// arcs store the edge id shifted by one, the lowest bit marks arcs at the adj node of their edge
const REVERSED_ARC: u32 = 1;
const MAX_EDGES: usize = (u32::MAX >> 1) as usize;

/// Collects nodes and edges during import. `freeze` turns it into an immutable `GraphStorage`.
#[derive(Debug)]
pub struct GraphBuilder {
    encoding: Arc<EncodingManager>,
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    edge_base: Vec<NodeId>,
    edge_adj: Vec<NodeId>,
    distance: Vec<f64>,
    flags: Vec<Flags>,
}

impl GraphBuilder {
    pub fn new(encoding: EncodingManager) -> GraphBuilder {
        Self::with_shared_encoding(Arc::new(encoding))
    }

    pub fn with_shared_encoding(encoding: Arc<EncodingManager>) -> GraphBuilder {
        GraphBuilder {
            encoding,
            latitude: Vec::new(),
            longitude: Vec::new(),
            edge_base: Vec::new(),
            edge_adj: Vec::new(),
            distance: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn encoding(&self) -> &EncodingManager {
        &self.encoding
    }

    pub fn node_count(&self) -> usize {
        self.latitude.len()
    }

    pub fn edge_count(&self) -> usize {
        self.distance.len()
    }

    pub fn add_node(&mut self, lat: f64, lon: f64) -> Result<NodeId> {
        let coords = LatLon::new(lat, lon).validated()?;
        if self.latitude.len() >= NodeId::MAX as usize {
            return Err(RoutingError::MalformedGraph("too many nodes".to_string()));
        }
        self.latitude.push(coords.lat);
        self.longitude.push(coords.lon);
        Ok((self.latitude.len() - 1) as NodeId)
    }

    /// Add an edge from `from` to `to`. `flags` are oriented in that direction,
    /// use the backward access bits of the encoders for two way roads.
    /// Access bits of a direction without speed are dropped.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, distance: f64, flags: Flags) -> Result<EdgeId> {
        let n = self.node_count();
        if from as usize >= n {
            return Err(RoutingError::node_index(from as usize, n));
        }
        if to as usize >= n {
            return Err(RoutingError::node_index(to as usize, n));
        }
        if !(distance.is_finite() && distance >= 0.0) {
            return Err(RoutingError::InvalidEdge(format!("distance {} of edge {} -> {} is not a non negative number", distance, from, to)));
        }
        if self.edge_count() >= MAX_EDGES {
            return Err(RoutingError::MalformedGraph("too many edges".to_string()));
        }

        self.edge_base.push(from);
        self.edge_adj.push(to);
        self.distance.push(distance);
        self.flags.push(self.encoding.sanitize(flags));
        Ok((self.edge_count() - 1) as EdgeId)
    }

    /// Build the adjacency arrays. Every edge shows up at both of its end nodes, self loops only once.
    pub fn freeze(self) -> GraphStorage {
        let n = self.node_count();
        let mut degrees = vec![0u32; n];
        for (&base, &adj) in self.edge_base.iter().zip(self.edge_adj.iter()) {
            degrees[base as usize] += 1;
            if base != adj {
                degrees[adj as usize] += 1;
            }
        }

        let first_out: Vec<u32> = degrees_to_first_out(degrees.into_iter()).collect();
        let mut next: Vec<u32> = first_out[..n].to_vec();
        let mut arcs = vec![0u32; first_out[n] as usize];

        for (edge, (&base, &adj)) in self.edge_base.iter().zip(self.edge_adj.iter()).enumerate() {
            let arc = (edge as u32) << 1;
            arcs[next[base as usize] as usize] = arc;
            next[base as usize] += 1;
            if base != adj {
                arcs[next[adj as usize] as usize] = arc | REVERSED_ARC;
                next[adj as usize] += 1;
            }
        }

        GraphStorage {
            encoding: self.encoding,
            latitude: self.latitude,
            longitude: self.longitude,
            first_out,
            arcs,
            edge_base: self.edge_base,
            edge_adj: self.edge_adj,
            distance: self.distance,
            flags: self.flags,
        }
    }
}

/// Immutable node and edge store, shared read only between all queries.
#[derive(Debug)]
pub struct GraphStorage {
    encoding: Arc<EncodingManager>,
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    // node -> range of arcs
    first_out: Vec<u32>,
    arcs: Vec<u32>,
    edge_base: Vec<NodeId>,
    edge_adj: Vec<NodeId>,
    distance: Vec<f64>,
    flags: Vec<Flags>,
}

impl GraphStorage {
    pub fn node_count(&self) -> usize {
        self.latitude.len()
    }

    pub fn edge_count(&self) -> usize {
        self.distance.len()
    }

    pub fn encoding(&self) -> &EncodingManager {
        &self.encoding
    }

    pub fn shared_encoding(&self) -> Arc<EncodingManager> {
        self.encoding.clone()
    }

    fn check_node(&self, node: NodeId) -> Result<usize> {
        let n = self.node_count();
        if (node as usize) < n {
            Ok(node as usize)
        } else {
            Err(RoutingError::node_index(node as usize, n))
        }
    }

    pub fn lat_lon(&self, node: NodeId) -> Result<LatLon> {
        let node = self.check_node(node)?;
        Ok(LatLon::new(self.latitude[node], self.longitude[node]))
    }

    /// Coordinates without bounds check, for ids taken from the graph itself.
    pub(crate) fn coords(&self, node: NodeId) -> LatLon {
        LatLon::new(self.latitude[node as usize], self.longitude[node as usize])
    }

    /// The edge in the orientation it was added with.
    pub fn edge(&self, edge: EdgeId) -> Result<EdgeRef> {
        let m = self.edge_count();
        if (edge as usize) < m {
            Ok(self.stored_edge(edge))
        } else {
            Err(RoutingError::edge_index(edge as usize, m))
        }
    }

    fn stored_edge(&self, edge: EdgeId) -> EdgeRef {
        let idx = edge as usize;
        EdgeRef {
            edge,
            base: self.edge_base[idx],
            adj: self.edge_adj[idx],
            distance: self.distance[idx],
            flags: self.flags[idx],
        }
    }

    /// The edge oriented to start at `base`, which has to be one of its end nodes.
    pub fn edge_from(&self, edge: EdgeId, base: NodeId) -> Result<EdgeRef> {
        let stored = self.edge(edge)?;
        if stored.base == base {
            Ok(stored)
        } else if stored.adj == base {
            Ok(stored.reversed(&self.encoding))
        } else {
            Err(RoutingError::InvalidEdge(format!("edge {} is not incident to node {}", edge, base)))
        }
    }

    pub fn degree(&self, node: NodeId) -> Result<usize> {
        let node = self.check_node(node)?;
        Ok((self.first_out[node + 1] - self.first_out[node]) as usize)
    }

    /// All edges at `node`, oriented away from it.
    /// Which of them a vehicle may actually travel along is up to its encoder.
    pub fn edges_of(&self, node: NodeId) -> Result<EdgeIter> {
        self.check_node(node)?;
        Ok(self.out_edges(node))
    }

    /// All edges at `node`, oriented towards it.
    pub fn incoming_edges_of(&self, node: NodeId) -> Result<EdgeIter> {
        self.check_node(node)?;
        Ok(self.in_edges(node))
    }

    pub(crate) fn out_edges(&self, node: NodeId) -> EdgeIter {
        self.edge_iter(node, false)
    }

    pub(crate) fn in_edges(&self, node: NodeId) -> EdgeIter {
        self.edge_iter(node, true)
    }

    fn edge_iter(&self, node: NodeId, incoming: bool) -> EdgeIter {
        let range = self.first_out[node as usize] as usize..self.first_out[node as usize + 1] as usize;
        EdgeIter {
            graph: self,
            arcs: self.arcs[range].iter(),
            incoming,
        }
    }

    fn arc_state(&self, arc: u32, incoming: bool) -> EdgeRef {
        let stored = self.stored_edge(arc >> 1);
        let at_adj = arc & REVERSED_ARC != 0;
        // outgoing at the base node and incoming at the adj node see the stored orientation
        if at_adj != incoming {
            stored.reversed(&self.encoding)
        } else {
            stored
        }
    }

    /// Is there an edge at `node` which `encoder` may use in some direction?
    pub fn is_accessible(&self, node: NodeId, encoder: &crate::encoding::FlagEncoder) -> bool {
        self.out_edges(node).any(|edge| encoder.is_accessible(edge.flags))
    }

    // Reloaded arrays are checked before any search relies on them.
    fn validate(&self) -> Result<()> {
        let n = self.node_count();
        let m = self.edge_count();
        let malformed = |msg: String| Err(RoutingError::MalformedGraph(msg));

        if self.longitude.len() != n || self.first_out.len() != n + 1 {
            return malformed("node array lengths differ".to_string());
        }
        if self.edge_base.len() != m || self.edge_adj.len() != m || self.flags.len() != m {
            return malformed("edge array lengths differ".to_string());
        }
        if self.first_out[0] != 0 || self.first_out.windows(2).any(|w| w[0] > w[1]) || self.first_out[n] as usize != self.arcs.len() {
            return malformed("first_out is not a valid offset array".to_string());
        }
        if let Some(node) = self.edge_base.iter().chain(self.edge_adj.iter()).find(|&&node| node as usize >= n) {
            return malformed(format!("edge references node {} of {}", node, n));
        }
        if self.arcs.iter().any(|&arc| (arc >> 1) as usize >= m) {
            return malformed("arc references missing edge".to_string());
        }
        if let Some(d) = self.distance.iter().find(|d| !(d.is_finite() && **d >= 0.0)) {
            return malformed(format!("invalid distance {}", d));
        }
        Ok(())
    }
}

/// Iterator over the edges at one node.
#[derive(Debug, Clone)]
pub struct EdgeIter<'a> {
    graph: &'a GraphStorage,
    arcs: std::slice::Iter<'a, u32>,
    incoming: bool,
}

impl<'a> Iterator for EdgeIter<'a> {
    type Item = EdgeRef;

    #[inline]
    fn next(&mut self) -> Option<EdgeRef> {
        let &arc = self.arcs.next()?;
        Some(self.graph.arc_state(arc, self.incoming))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.arcs.size_hint()
    }
}

impl<'a> ExactSizeIterator for EdgeIter<'a> {}

impl Deconstruct for GraphStorage {
    fn store_each(&self, store: &dyn Fn(&str, &dyn Store) -> std::io::Result<()>) -> std::io::Result<()> {
        store("encoding.json", &json_bytes(&self.encoding.configs())?)?;
        store("latitude", &self.latitude)?;
        store("longitude", &self.longitude)?;
        store("first_out", &self.first_out)?;
        store("arcs", &self.arcs)?;
        store("edge_base", &self.edge_base)?;
        store("edge_adj", &self.edge_adj)?;
        store("distance", &self.distance)?;
        store("flags", &self.flags)?;
        Ok(())
    }
}

impl Reconstruct for GraphStorage {
    fn reconstruct_with(loader: Loader) -> std::io::Result<Self> {
        let invalid = |e: RoutingError| std::io::Error::new(std::io::ErrorKind::InvalidData, e);

        let configs: Vec<EncoderConfig> = loader.load_json("encoding.json")?;
        let encoding = EncodingManager::new(configs).map_err(invalid)?;

        let flags: Vec<Flags> = loader.load("flags")?;
        let graph = GraphStorage {
            latitude: loader.load("latitude")?,
            longitude: loader.load("longitude")?,
            first_out: loader.load("first_out")?,
            arcs: loader.load("arcs")?,
            edge_base: loader.load("edge_base")?,
            edge_adj: loader.load("edge_adj")?,
            distance: loader.load("distance")?,
            flags: flags.into_iter().map(|flags| encoding.sanitize(flags)).collect(),
            encoding: Arc::new(encoding),
        };
        graph.validate().map_err(invalid)?;
        Ok(graph)
    }
}
