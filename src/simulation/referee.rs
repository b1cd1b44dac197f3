//! A local stand-in for the remote referee.
//!
//! Plays several policies against one instance: each round every player
//! bids, the packs are settled together, and every player sees the
//! resulting flow.

use crate::core::owner::OwnerId;
use crate::core::round::{Match, ProfitRecord};
use crate::core::stream::Flow;
use crate::graph::network::FlowNetwork;
use crate::optimization::settlement::{BidBook, SettlementEngine};
use crate::optimization::solver::FlowSolver;
use crate::policy::BiddingPolicy;
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::fmt;

/// Profit earned on a settled flow, per owner.
///
/// Each stream earns `amount · (price − base variable cost)`; an owner
/// pays an edge's fixed cost once for every edge it carries flow on.
/// Streams on edges missing from `base` earn nothing.
pub fn flow_profits(base: &FlowNetwork, flow: &Flow) -> IndexMap<OwnerId, f64> {
    let mut profits: IndexMap<OwnerId, f64> = IndexMap::new();
    for stream in flow.streams() {
        let Some(edge) = base.edge(stream.source, stream.sink) else {
            continue;
        };
        let mut profit = stream.amount * (stream.price - edge.variable_cost);
        if stream.amount > 0.0 {
            profit -= edge.fixed_cost;
        }
        *profits.entry(stream.owner.clone()).or_insert(0.0) += profit;
    }
    profits
}

/// Outcome of a simulated game.
#[derive(Debug, Clone)]
pub struct RefereeReport {
    pub instance: String,
    pub rounds: usize,
    pub failed_rounds: usize,
    /// Sorted by owner.
    pub profits: Vec<ProfitRecord>,
}

impl RefereeReport {
    pub fn profit(&self, owner: &OwnerId) -> Option<f64> {
        self.profits
            .iter()
            .find(|p| &p.owner == owner)
            .map(|p| p.value)
    }
}

impl fmt::Display for RefereeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Referee Report ===")?;
        writeln!(f, "Instance:      {}", self.instance)?;
        writeln!(f, "Rounds:        {}", self.rounds)?;
        writeln!(f, "Failed rounds: {}", self.failed_rounds)?;
        writeln!(f, "\n--- Profits ---")?;
        for profit in &self.profits {
            writeln!(f, "  {}", profit)?;
        }
        Ok(())
    }
}

/// Drives a multi-player game on a single instance.
pub struct Referee<S> {
    instance: String,
    engine: SettlementEngine<S>,
    players: Vec<(OwnerId, Box<dyn BiddingPolicy>)>,
}

impl<S: FlowSolver> Referee<S> {
    pub fn new(instance: impl Into<String>, network: FlowNetwork, solver: S) -> Self {
        Self {
            instance: instance.into(),
            engine: SettlementEngine::new(network, solver),
            players: Vec::new(),
        }
    }

    /// Register a player. A later player with the same name replaces the
    /// earlier one.
    pub fn add_player(&mut self, owner: impl Into<OwnerId>, policy: Box<dyn BiddingPolicy>) {
        let owner = owner.into();
        self.players.retain(|(existing, _)| existing != &owner);
        self.players.push((owner, policy));
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn network(&self) -> &FlowNetwork {
        self.engine.network()
    }

    /// Collect one bid pack from every player.
    pub fn collect_bids(&mut self, request: &Match) -> BidBook {
        self.players
            .iter_mut()
            .map(|(owner, policy)| {
                let pack = policy.compute_bid(request);
                debug!("{} ({}) bid on {} edges", owner, policy.name(), pack.len());
                (owner.clone(), pack)
            })
            .collect()
    }

    /// Play `rounds` rounds, each asking every player for `edges` bids.
    ///
    /// A round whose settlement fails earns nothing and sends no update.
    pub fn play(&mut self, rounds: usize, edges: usize) -> RefereeReport {
        let request = Match::new(self.instance.clone(), edges);
        let mut totals: IndexMap<OwnerId, f64> = self
            .players
            .iter()
            .map(|(owner, _)| (owner.clone(), 0.0))
            .collect();
        let mut failed_rounds = 0;

        for round in 1..=rounds {
            let book = self.collect_bids(&request);
            let settlement = match self.engine.settle(&book) {
                Ok(settlement) => settlement,
                Err(e) => {
                    warn!("Round {} failed: {}", round, e);
                    failed_rounds += 1;
                    continue;
                }
            };
            info!("Round {}: {}", round, settlement.flow);

            for (owner, profit) in flow_profits(self.engine.network(), &settlement.flow) {
                *totals.entry(owner).or_insert(0.0) += profit;
            }
            for (_, policy) in self.players.iter_mut() {
                policy.update(&settlement.flow);
            }
        }

        let mut profits: Vec<ProfitRecord> = totals
            .into_iter()
            .map(|(owner, value)| ProfitRecord::new(owner, value))
            .collect();
        profits.sort_by(|a, b| a.owner.cmp(&b.owner));

        RefereeReport {
            instance: self.instance.clone(),
            rounds,
            failed_rounds,
            profits,
        }
    }
}
