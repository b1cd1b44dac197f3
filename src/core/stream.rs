use crate::core::owner::OwnerId;
use crate::graph::network::{EdgeKey, VertexId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One owner's settled allocation on one edge.
///
/// `price` is the edge's clearing price and `bid_count` the total number
/// of bids the edge received, winning or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub source: VertexId,
    pub sink: VertexId,
    pub amount: f64,
    pub owner: OwnerId,
    pub price: f64,
    pub bid_count: usize,
}

impl Stream {
    pub fn new(
        source: VertexId,
        sink: VertexId,
        amount: f64,
        owner: OwnerId,
        price: f64,
        bid_count: usize,
    ) -> Self {
        Self {
            source,
            sink,
            amount,
            owner,
            price,
            bid_count,
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source, self.sink)
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})-[{:.2}]->({}) [{}, {:.2}, {}]",
            self.source, self.amount, self.sink, self.owner, self.price, self.bid_count
        )
    }
}

/// The outcome of one settlement: every stream in emission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    streams: Vec<Stream>,
}

impl Flow {
    pub fn new(streams: Vec<Stream>) -> Self {
        Self { streams }
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Streams allocated to a single owner.
    pub fn streams_for<'a>(&'a self, owner: &'a OwnerId) -> impl Iterator<Item = &'a Stream> + 'a {
        self.streams.iter().filter(move |s| &s.owner == owner)
    }

    /// Sum of the amounts settled on one edge across all owners.
    pub fn edge_amount(&self, key: EdgeKey) -> f64 {
        self.streams
            .iter()
            .filter(|s| s.key() == key)
            .map(|s| s.amount)
            .sum()
    }
}

impl FromIterator<Stream> for Flow {
    fn from_iter<T: IntoIterator<Item = Stream>>(iter: T) -> Self {
        Self {
            streams: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Number of Edges {}", self.streams.len())
    }
}
