use crate::core::bid::{Bid, BidPack};
use crate::core::round::Match;
use crate::core::stream::Flow;
use crate::graph::cache::InstanceCache;
use crate::graph::network::FlowNetwork;
use crate::optimization::solver::{EdgeFlow, FlowSolver};
use crate::optimization::transport::TransportSolver;
use crate::policy::working::WorkingCopy;
use crate::policy::BiddingPolicy;
use log::{debug, error, info};
use std::cmp::Ordering;
use std::sync::Arc;

/// Solver-assisted top-K policy.
///
/// Solves its working copy rather than the cached instance, so prices
/// settled in earlier rounds shape the solution. Solved edges are ranked by
/// the profit proxy `flow · variable_cost − fixed_cost` and the `K` best
/// get bids at `variable_cost × factor`.
pub struct SolverEdges {
    working: WorkingCopy,
    factor: f64,
    solver: Arc<dyn FlowSolver>,
}

impl SolverEdges {
    pub fn new(cache: Arc<InstanceCache>, factor: f64) -> Self {
        Self::with_solver(cache, factor, Arc::new(TransportSolver::new()))
    }

    pub fn with_solver(cache: Arc<InstanceCache>, factor: f64, solver: Arc<dyn FlowSolver>) -> Self {
        Self {
            working: WorkingCopy::new(cache),
            factor,
            solver,
        }
    }
}

impl std::fmt::Debug for SolverEdges {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverEdges")
            .field("working", &self.working)
            .field("factor", &self.factor)
            .finish_non_exhaustive()
    }
}

/// Solved edges paired with their profit proxy, most profitable last.
pub fn rank_by_profit(network: &FlowNetwork, flows: Vec<EdgeFlow>) -> Vec<(EdgeFlow, f64)> {
    let mut ranked: Vec<(EdgeFlow, f64)> = flows
        .into_iter()
        .filter_map(|flow| {
            let edge = network.edge(flow.source, flow.sink)?;
            Some((flow, flow.amount * edge.variable_cost - edge.fixed_cost))
        })
        .collect();
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    ranked
}

impl BiddingPolicy for SolverEdges {
    fn name(&self) -> &'static str {
        "SolverEdges"
    }

    fn compute_bid(&mut self, request: &Match) -> BidPack {
        let Some(network) = self.working.setup(&request.instance_name) else {
            return BidPack::empty();
        };

        let flows = match self.solver.compute_flow(network) {
            Ok(flows) => flows,
            Err(e) => {
                error!("Error computing flow for {}: {}", request.instance_name, e);
                return BidPack::empty();
            }
        };

        let ranked = rank_by_profit(network, flows);
        if ranked.is_empty() {
            info!("No profitable edges on {}", request.instance_name);
            return BidPack::empty();
        }

        let pack: BidPack = ranked
            .iter()
            .rev()
            .take(request.edge_count)
            .filter_map(|(flow, profit)| {
                let edge = network.edge(flow.source, flow.sink)?;
                debug!("bidding on {} (profit {:.2})", flow, profit);
                Some(Bid::new(edge.source, edge.sink, edge.variable_cost * self.factor))
            })
            .collect();
        pack
    }

    fn update(&mut self, flow: &Flow) {
        self.working.apply_flow(flow);
    }
}
