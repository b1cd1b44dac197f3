//! Bid resolution, flow settlement and the transportation solvers behind
//! them.

pub mod settlement;
pub mod solver;
pub mod transport;
