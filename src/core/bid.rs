use crate::graph::network::{EdgeKey, VertexId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An offer to carry flow on one edge at a given unit price.
///
/// Bids are owner-less: the owner is attached when packs from several
/// bidders are aggregated for settlement. Prices are conventionally
/// non-negative but negative prices are accepted.
///
/// # Examples
///
/// ```
/// use fctp_player::core::bid::Bid;
///
/// let bid = Bid::new(1, 2, 12.5);
/// assert_eq!(bid.to_string(), "1 2 12.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    source: VertexId,
    sink: VertexId,
    price: f64,
}

impl Bid {
    pub fn new(source: VertexId, sink: VertexId, price: f64) -> Self {
        Self {
            source,
            sink,
            price,
        }
    }

    pub fn source(&self) -> VertexId {
        self.source
    }

    pub fn sink(&self) -> VertexId {
        self.sink
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    /// Key of the edge this bid targets.
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source, self.sink)
    }
}

/// Wire form of a single bid line: `<source> <sink> <price>`.
impl fmt::Display for Bid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:.2}", self.source, self.sink, self.price)
    }
}

/// The bids one owner submits for one match, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidPack {
    bids: Vec<Bid>,
}

impl BidPack {
    pub fn new() -> Self {
        Self { bids: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bids: Vec::with_capacity(capacity),
        }
    }

    /// An empty pack, the reply for unknown instances and failed solves.
    pub fn empty() -> Self {
        Self::new()
    }

    /// Append a bid and return a reference to it.
    pub fn bid(&mut self, source: VertexId, sink: VertexId, price: f64) -> &Bid {
        self.bids.push(Bid::new(source, sink, price));
        &self.bids[self.bids.len() - 1]
    }

    pub fn add(&mut self, bid: Bid) {
        self.bids.push(bid);
    }

    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    pub fn len(&self) -> usize {
        self.bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bid> {
        self.bids.iter()
    }
}

impl FromIterator<Bid> for BidPack {
    fn from_iter<T: IntoIterator<Item = Bid>>(iter: T) -> Self {
        Self {
            bids: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a BidPack {
    type Item = &'a Bid;
    type IntoIter = std::slice::Iter<'a, Bid>;

    fn into_iter(self) -> Self::IntoIter {
        self.bids.iter()
    }
}

/// Wire form of a bid reply: a `bid` header followed by one line per bid.
/// Every line, the header included, is newline-terminated.
impl fmt::Display for BidPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "bid")?;
        for bid in &self.bids {
            writeln!(f, "{}", bid)?;
        }
        Ok(())
    }
}
