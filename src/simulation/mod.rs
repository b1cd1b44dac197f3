//! Offline play: random instances and a local referee.

pub mod generator;
pub mod referee;
