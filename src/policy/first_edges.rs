use crate::core::bid::{Bid, BidPack};
use crate::core::round::Match;
use crate::core::stream::Flow;
use crate::graph::cache::InstanceCache;
use crate::policy::working::WorkingCopy;
use crate::policy::BiddingPolicy;
use std::sync::Arc;

/// Bids on the first `N` edges in enumeration order at
/// `variable_cost × factor`. Fully deterministic.
#[derive(Debug)]
pub struct FirstEdges {
    working: WorkingCopy,
    factor: f64,
}

impl FirstEdges {
    pub fn new(cache: Arc<InstanceCache>, factor: f64) -> Self {
        Self {
            working: WorkingCopy::new(cache),
            factor,
        }
    }
}

impl BiddingPolicy for FirstEdges {
    fn name(&self) -> &'static str {
        "FirstEdges"
    }

    fn compute_bid(&mut self, request: &Match) -> BidPack {
        let Some(network) = self.working.setup(&request.instance_name) else {
            return BidPack::empty();
        };
        network
            .edges()
            .take(request.edge_count)
            .map(|e| Bid::new(e.source, e.sink, e.variable_cost * self.factor))
            .collect()
    }

    fn update(&mut self, flow: &Flow) {
        self.working.apply_flow(flow);
    }
}
