//! # fctp-player
//!
//! A competitive bidding player for the Fixed-Charge Transportation Problem.
//!
//! Each round a referee names an instance and an edge quota; the player
//! answers with priced bids. Bids from all players are resolved per edge
//! (lowest price wins, near-ties share), a transportation solver routes the
//! flow on the repriced network, and the settled flow is reported back so
//! every player can adapt its prices.
//!
//! ## Architecture
//!
//! - **core**: Bids, bid packs, streams, flows, owners and round messages
//! - **graph**: Flow network, instance files and the shared instance cache
//! - **optimization**: Flow solver contract, transportation solver, settlement
//! - **policy**: Bidding policies and their per-instance working copies
//! - **session**: Wire codec and the referee protocol loop
//! - **simulation**: Random instances and a local referee
//! - **config**: Player configuration

pub mod config;
pub mod core;
pub mod graph;
pub mod optimization;
pub mod policy;
pub mod session;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::PlayerConfig;
    pub use crate::core::bid::{Bid, BidPack};
    pub use crate::core::owner::OwnerId;
    pub use crate::core::round::{Match, ProfitRecord};
    pub use crate::core::stream::{Flow, Stream};
    pub use crate::graph::cache::InstanceCache;
    pub use crate::graph::instance::{DirectoryLoader, InstanceLoader, StaticLoader};
    pub use crate::graph::network::{EdgeKey, FlowNetwork};
    pub use crate::optimization::settlement::{BidBook, SettlementEngine};
    pub use crate::optimization::solver::{EdgeFlow, FlowSolver, SolverError};
    pub use crate::optimization::transport::TransportSolver;
    pub use crate::policy::{BiddingPolicy, PolicyKind};
    pub use crate::session::{Session, SessionSummary};
}
