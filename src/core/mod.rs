//! Round-level records exchanged between bidders, the settlement engine
//! and the referee.

pub mod bid;
pub mod owner;
pub mod round;
pub mod stream;
