use crate::core::owner::OwnerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A referee's per-round request: bid on up to `edge_count` edges of the
/// named instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub instance_name: String,
    pub edge_count: usize,
}

impl Match {
    pub fn new(instance_name: impl Into<String>, edge_count: usize) -> Self {
        Self {
            instance_name: instance_name.into(),
            edge_count,
        }
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.instance_name, self.edge_count)
    }
}

/// End-of-session score reported for one owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitRecord {
    pub owner: OwnerId,
    pub value: f64,
}

impl ProfitRecord {
    pub fn new(owner: OwnerId, value: f64) -> Self {
        Self { owner, value }
    }
}

impl fmt::Display for ProfitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.owner, self.value)
    }
}
