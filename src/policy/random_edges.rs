use crate::core::bid::{Bid, BidPack};
use crate::core::round::Match;
use crate::core::stream::Flow;
use crate::graph::cache::InstanceCache;
use crate::policy::working::WorkingCopy;
use crate::policy::BiddingPolicy;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Bids on `N` distinct edges drawn uniformly without replacement.
///
/// Each bid is priced at `variable_cost × (1 + k)` where `k` is drawn
/// uniformly from `0..max_factor`. The generator can be seeded for
/// reproducible packs.
#[derive(Debug)]
pub struct RandomEdges {
    working: WorkingCopy,
    max_factor: u32,
    rng: StdRng,
}

impl RandomEdges {
    /// Create a policy seeded from system entropy.
    pub fn new(cache: Arc<InstanceCache>, max_factor: u32) -> Self {
        Self::with_rng(cache, max_factor, StdRng::from_entropy())
    }

    pub fn seeded(cache: Arc<InstanceCache>, max_factor: u32, seed: u64) -> Self {
        Self::with_rng(cache, max_factor, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(cache: Arc<InstanceCache>, max_factor: u32, rng: StdRng) -> Self {
        Self {
            working: WorkingCopy::new(cache),
            max_factor: max_factor.max(1),
            rng,
        }
    }

    pub fn max_factor(&self) -> u32 {
        self.max_factor
    }
}

impl BiddingPolicy for RandomEdges {
    fn name(&self) -> &'static str {
        "RandomEdges"
    }

    fn compute_bid(&mut self, request: &Match) -> BidPack {
        let Some(network) = self.working.setup(&request.instance_name) else {
            return BidPack::empty();
        };

        let edge_count = network.edge_count();
        let amount = request.edge_count.min(edge_count);
        if amount < request.edge_count {
            debug!(
                "{} requested {} edges, only {} available",
                request.instance_name, request.edge_count, edge_count
            );
        }

        let indices = rand::seq::index::sample(&mut self.rng, edge_count, amount);
        let mut pack = BidPack::with_capacity(amount);
        for index in indices.iter() {
            if let Some(edge) = network.edge_at(index) {
                let factor = 1.0 + f64::from(self.rng.gen_range(0..self.max_factor));
                pack.add(Bid::new(edge.source, edge.sink, edge.variable_cost * factor));
            }
        }
        pack
    }

    fn update(&mut self, flow: &Flow) {
        self.working.apply_flow(flow);
    }
}
