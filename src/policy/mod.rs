//! Bidding policies: given a match request, decide which edges to bid on
//! and at what price, and learn from each round's settlement.

pub mod first_edges;
pub mod random_edges;
pub mod solver_edges;
pub mod working;

use crate::core::bid::BidPack;
use crate::core::round::Match;
use crate::core::stream::Flow;
use crate::graph::cache::InstanceCache;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub use first_edges::FirstEdges;
pub use random_edges::RandomEdges;
pub use solver_edges::SolverEdges;

/// A bidding strategy.
///
/// Policies own their mutable state; a session drives exactly one policy
/// from a single thread.
pub trait BiddingPolicy: Send {
    /// Produce this round's bids. Unknown instances yield an empty pack.
    fn compute_bid(&mut self, request: &Match) -> BidPack;

    /// Absorb a settlement report.
    fn update(&mut self, flow: &Flow);

    fn name(&self) -> &'static str;
}

impl<P: BiddingPolicy + ?Sized> BiddingPolicy for Box<P> {
    fn compute_bid(&mut self, request: &Match) -> BidPack {
        (**self).compute_bid(request)
    }

    fn update(&mut self, flow: &Flow) {
        (**self).update(flow)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown policy '{0}' (expected RandomEdges, FirstEdges or SolverEdges)")]
pub struct UnknownPolicy(pub String);

/// The built-in policies, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PolicyKind {
    RandomEdges,
    FirstEdges,
    #[default]
    #[serde(alias = "GurobiEdges")]
    SolverEdges,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 3] = [
        PolicyKind::RandomEdges,
        PolicyKind::FirstEdges,
        PolicyKind::SolverEdges,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::RandomEdges => "RandomEdges",
            PolicyKind::FirstEdges => "FirstEdges",
            PolicyKind::SolverEdges => "SolverEdges",
        }
    }

    /// Construct the policy over a shared instance cache.
    ///
    /// `RandomEdges` uses `factor` truncated to an integer as its maximum
    /// multiplier and `seed`, when given, to fix its draws.
    pub fn build(
        &self,
        cache: Arc<InstanceCache>,
        factor: f64,
        seed: Option<u64>,
    ) -> Box<dyn BiddingPolicy> {
        match self {
            PolicyKind::RandomEdges => {
                let max_factor = factor.trunc().max(1.0) as u32;
                match seed {
                    Some(seed) => Box::new(RandomEdges::seeded(cache, max_factor, seed)),
                    None => Box::new(RandomEdges::new(cache, max_factor)),
                }
            }
            PolicyKind::FirstEdges => Box::new(FirstEdges::new(cache, factor)),
            PolicyKind::SolverEdges => Box::new(SolverEdges::new(cache, factor)),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RandomEdges" => Ok(PolicyKind::RandomEdges),
            "FirstEdges" => Ok(PolicyKind::FirstEdges),
            "SolverEdges" | "GurobiEdges" => Ok(PolicyKind::SolverEdges),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}
