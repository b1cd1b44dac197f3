use crate::graph::network::{EdgeKey, FlowNetwork, VertexId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Flow carried by one edge in a solved transportation problem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeFlow {
    pub source: VertexId,
    pub sink: VertexId,
    pub amount: f64,
}

impl EdgeFlow {
    pub fn new(source: VertexId, sink: VertexId, amount: f64) -> Self {
        Self {
            source,
            sink,
            amount,
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source, self.sink)
    }
}

impl fmt::Display for EdgeFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})-[{:.2}]->({})", self.source, self.amount, self.sink)
    }
}

/// Reasons a solve produced no flow.
///
/// A failed solve is never equivalent to a zero flow: callers treat it as a
/// failed round.
#[derive(Debug, Error, PartialEq)]
pub enum SolverError {
    #[error("supply {supply:.2} does not match demand {demand:.2}")]
    Unbalanced { supply: f64, demand: f64 },
    #[error("infeasible: shipped {shipped:.2} of {required:.2}")]
    Infeasible { shipped: f64, required: f64 },
    #[error("network has no edges")]
    Empty,
    #[error("solver unavailable: {0}")]
    Unavailable(String),
}

/// Computes a minimum-cost transportation flow.
///
/// Implementations must return, for a feasible instance, flows that meet
/// every source's supply and every sink's demand exactly, with
/// `0 <= flow(i,j) <= min(supply(i), demand(j))`, minimizing
/// `Σ flow(i,j) · variable_cost(i,j)`.
pub trait FlowSolver: Send + Sync {
    fn compute_flow(&self, network: &FlowNetwork) -> Result<Vec<EdgeFlow>, SolverError>;
}

impl<S: FlowSolver + ?Sized> FlowSolver for std::sync::Arc<S> {
    fn compute_flow(&self, network: &FlowNetwork) -> Result<Vec<EdgeFlow>, SolverError> {
        (**self).compute_flow(network)
    }
}

impl<S: FlowSolver + ?Sized> FlowSolver for Box<S> {
    fn compute_flow(&self, network: &FlowNetwork) -> Result<Vec<EdgeFlow>, SolverError> {
        (**self).compute_flow(network)
    }
}

/// Total variable cost of a set of edge flows priced on `network`.
///
/// Flows on edges the network does not contain contribute nothing.
pub fn objective(network: &FlowNetwork, flows: &[EdgeFlow]) -> f64 {
    flows
        .iter()
        .filter_map(|f| {
            network
                .edge(f.source, f.sink)
                .map(|e| e.variable_cost * f.amount)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objective_ignores_unknown_edges() {
        let mut network = FlowNetwork::new();
        network.new_edge(1, 1, 10.0, 0.0);
        network.new_edge(1, 2, 12.0, 0.0);
        let flows = vec![
            EdgeFlow::new(1, 1, 3.0),
            EdgeFlow::new(1, 2, 2.0),
            EdgeFlow::new(9, 9, 100.0),
        ];
        assert_eq!(objective(&network, &flows), 54.0);
    }

    #[test]
    fn test_edge_flow_display() {
        assert_eq!(EdgeFlow::new(2, 5, 1.5).to_string(), "(2)-[1.50]->(5)");
    }
}
