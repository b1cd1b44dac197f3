//! The transportation network model, instance files and the shared
//! instance cache.

pub mod cache;
pub mod instance;
pub mod network;
