//! The referee-facing side of the player: wire codec and protocol loop.

pub mod handler;
pub mod wire;

pub use handler::{Session, SessionSummary};
pub use wire::WireError;
