use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Integer identity of a source or a sink. Sources and sinks are separate
/// namespaces: source `3` and sink `3` are different vertices.
pub type VertexId = u32;

/// Identity of an edge: the ordered (source, sink) pair.
///
/// Displays as `"{source}:{sink}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub source: VertexId,
    pub sink: VertexId,
}

impl EdgeKey {
    pub fn new(source: VertexId, sink: VertexId) -> Self {
        Self { source, sink }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.sink)
    }
}

impl FromStr for EdgeKey {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NetworkError::InvalidKey(s.to_string());
        let (source, sink) = s.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            source: source.trim().parse().map_err(|_| invalid())?,
            sink: sink.trim().parse().map_err(|_| invalid())?,
        })
    }
}

/// Errors raised by network mutation and lookup.
#[derive(Debug, Error, PartialEq)]
pub enum NetworkError {
    #[error("no edge {0} in network")]
    UnknownEdge(EdgeKey),
    #[error("invalid edge key '{0}', expected <source>:<sink>")]
    InvalidKey(String),
}

/// A source or sink with its capacity (supply for a source, demand for a sink).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub capacity: f64,
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {:.2}]", self.id, self.capacity)
    }
}

/// A transportation lane from a source to a sink.
///
/// `fixed_cost` plays no part in the transportation LP; it is carried
/// along for profit scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: VertexId,
    pub sink: VertexId,
    pub variable_cost: f64,
    pub fixed_cost: f64,
}

impl Edge {
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source, self.sink)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})-[{:.2},{:.2}]->({})",
            self.source, self.variable_cost, self.fixed_cost, self.sink
        )
    }
}

/// A bipartite transportation network: sources, sinks and the edges
/// between them.
///
/// Edges keep their insertion order, which is the enumeration order the
/// bidding policies rely on. Cloning produces a fully independent copy.
///
/// # Examples
///
/// ```
/// use fctp_player::graph::network::FlowNetwork;
///
/// let mut network = FlowNetwork::new();
/// network.new_edge(1, 1, 10.0, 0.0);
/// network.new_edge(1, 2, 12.0, 0.0);
/// network.set_source_capacity(1, 5.0);
/// network.set_sink_capacity(1, 3.0);
/// network.set_sink_capacity(2, 2.0);
///
/// assert_eq!(network.edge_count(), 2);
/// assert!(network.is_balanced(1e-9));
/// assert_eq!(network.edge(1, 2).map(|e| e.variable_cost), Some(12.0));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowNetwork {
    sources: BTreeMap<VertexId, Vertex>,
    sinks: BTreeMap<VertexId, Vertex>,
    edges: IndexMap<EdgeKey, Edge>,
}

impl FlowNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge, creating missing endpoints with zero capacity.
    ///
    /// Re-adding an existing key overwrites its costs in place; the edge
    /// keeps its original enumeration position.
    pub fn new_edge(
        &mut self,
        source: VertexId,
        sink: VertexId,
        variable_cost: f64,
        fixed_cost: f64,
    ) -> &Edge {
        self.sources.entry(source).or_insert(Vertex {
            id: source,
            capacity: 0.0,
        });
        self.sinks.entry(sink).or_insert(Vertex {
            id: sink,
            capacity: 0.0,
        });

        let edge = Edge {
            source,
            sink,
            variable_cost,
            fixed_cost,
        };
        let (index, _) = self.edges.insert_full(edge.key(), edge);
        &self.edges[index]
    }

    /// Set a source's supply, creating the source if needed.
    pub fn set_source_capacity(&mut self, id: VertexId, capacity: f64) -> &Vertex {
        let vertex = self.sources.entry(id).or_insert(Vertex { id, capacity });
        vertex.capacity = capacity;
        vertex
    }

    /// Set a sink's demand, creating the sink if needed.
    pub fn set_sink_capacity(&mut self, id: VertexId, capacity: f64) -> &Vertex {
        let vertex = self.sinks.entry(id).or_insert(Vertex { id, capacity });
        vertex.capacity = capacity;
        vertex
    }

    pub fn edge(&self, source: VertexId, sink: VertexId) -> Option<&Edge> {
        self.edges.get(&EdgeKey::new(source, sink))
    }

    pub fn edge_by_key(&self, key: &EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    /// The edge at a position in enumeration order.
    pub fn edge_at(&self, index: usize) -> Option<&Edge> {
        self.edges.get_index(index).map(|(_, e)| e)
    }

    /// Overwrite the variable cost of an existing edge.
    pub fn set_edge_cost(
        &mut self,
        source: VertexId,
        sink: VertexId,
        price: f64,
    ) -> Result<(), NetworkError> {
        let key = EdgeKey::new(source, sink);
        let edge = self
            .edges
            .get_mut(&key)
            .ok_or(NetworkError::UnknownEdge(key))?;
        edge.variable_cost = price;
        Ok(())
    }

    /// All edges in enumeration order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn sources(&self) -> impl Iterator<Item = &Vertex> {
        self.sources.values()
    }

    pub fn sinks(&self) -> impl Iterator<Item = &Vertex> {
        self.sinks.values()
    }

    pub fn source(&self, id: VertexId) -> Option<&Vertex> {
        self.sources.get(&id)
    }

    pub fn sink(&self, id: VertexId) -> Option<&Vertex> {
        self.sinks.get(&id)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn total_supply(&self) -> f64 {
        self.sources.values().map(|v| v.capacity).sum()
    }

    pub fn total_demand(&self) -> f64 {
        self.sinks.values().map(|v| v.capacity).sum()
    }

    /// True when total supply and total demand agree within `tolerance`.
    pub fn is_balanced(&self, tolerance: f64) -> bool {
        (self.total_supply() - self.total_demand()).abs() <= tolerance
    }

    /// Largest flow an edge may carry: `min(supply(source), demand(sink))`.
    pub fn edge_upper_bound(&self, key: &EdgeKey) -> f64 {
        let supply = self.sources.get(&key.source).map_or(0.0, |v| v.capacity);
        let demand = self.sinks.get(&key.sink).map_or(0.0, |v| v.capacity);
        supply.min(demand)
    }
}

impl fmt::Display for FlowNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sources {}, Sinks {}, Edges {}",
            self.source_count(),
            self.sink_count(),
            self.edge_count()
        )
    }
}
