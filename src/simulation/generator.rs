//! Random FCTP instances for tests, benches and local play.
//!
//! Every generated instance is a complete bipartite network whose integer
//! supplies and demands balance exactly, so the transportation problem on
//! it is always feasible.

use crate::graph::network::{FlowNetwork, VertexId};
use rand::Rng;

/// Shape and value ranges of a generated instance.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    pub sources: u32,
    pub sinks: u32,
    /// Inclusive range of each source's supply.
    pub min_supply: u32,
    pub max_supply: u32,
    /// Half-open range of variable costs.
    pub min_variable_cost: f64,
    pub max_variable_cost: f64,
    /// Half-open range of fixed costs.
    pub min_fixed_cost: f64,
    pub max_fixed_cost: f64,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            sources: 10,
            sinks: 10,
            min_supply: 10,
            max_supply: 100,
            min_variable_cost: 1.0,
            max_variable_cost: 20.0,
            min_fixed_cost: 0.0,
            max_fixed_cost: 100.0,
        }
    }
}

fn cost<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    let value = if max > min { rng.gen_range(min..max) } else { min };
    (value * 100.0).round() / 100.0
}

/// Generate a balanced random instance.
///
/// Vertex ids start at 1 in both namespaces. Demands are an even split of
/// the total supply, then perturbed by moving random amounts between
/// sinks; a sink's demand is zero only when total supply is smaller than
/// the sink count.
pub fn generate_instance<R: Rng + ?Sized>(config: &InstanceConfig, rng: &mut R) -> FlowNetwork {
    let mut network = FlowNetwork::new();
    if config.sources == 0 || config.sinks == 0 {
        return network;
    }

    for source in 1..=config.sources {
        for sink in 1..=config.sinks {
            let variable = cost(rng, config.min_variable_cost, config.max_variable_cost);
            let fixed = cost(rng, config.min_fixed_cost, config.max_fixed_cost);
            network.new_edge(source, sink, variable, fixed);
        }
    }

    let low = config.min_supply.min(config.max_supply);
    let high = config.min_supply.max(config.max_supply);
    let mut total: u64 = 0;
    for source in 1..=config.sources {
        let supply = rng.gen_range(low..=high);
        total += u64::from(supply);
        network.set_source_capacity(source, f64::from(supply));
    }

    let sinks = config.sinks as usize;
    let mut demand = vec![total / sinks as u64; sinks];
    for slot in demand.iter_mut().take((total % sinks as u64) as usize) {
        *slot += 1;
    }
    for _ in 0..sinks {
        let from = rng.gen_range(0..sinks);
        let to = rng.gen_range(0..sinks);
        if from == to || demand[from] <= 1 {
            continue;
        }
        let moved = rng.gen_range(0..demand[from] / 2 + 1).min(demand[from] - 1);
        demand[from] -= moved;
        demand[to] += moved;
    }
    for (index, amount) in demand.into_iter().enumerate() {
        network.set_sink_capacity(index as VertexId + 1, amount as f64);
    }

    network
}
