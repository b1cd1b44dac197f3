//! A self-contained transportation solver.
//!
//! The transportation problem is solved as a min-cost flow on the network
//!
//! ```text
//! super source --(supply, 0)--> source --(min(s,d), vcost)--> sink --(demand, 0)--> super sink
//! ```
//!
//! using successive shortest paths. Paths are found with Bellman-Ford on the
//! residual graph, so negative prices are handled.

use crate::graph::network::{EdgeKey, FlowNetwork, VertexId};
use crate::optimization::solver::{EdgeFlow, FlowSolver, SolverError};
use log::{debug, trace};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Supply and demand totals may differ by at most this much.
pub const BALANCE_TOLERANCE: f64 = 1e-6;

/// Flows below this amount are not reported.
pub const MIN_REPORTED_FLOW: f64 = 0.01;

const CAPACITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
struct ResidualArc {
    /// Remaining capacity in this direction.
    residual: f64,
    cost: f64,
    /// Network edge this arc (or its twin) represents, if any.
    edge: Option<EdgeKey>,
    forward: bool,
}

struct ResidualGraph {
    graph: DiGraph<(), ResidualArc>,
    source: NodeIndex,
    sink: NodeIndex,
}

impl ResidualGraph {
    fn build(network: &FlowNetwork) -> Self {
        let mut graph = DiGraph::with_capacity(
            network.source_count() + network.sink_count() + 2,
            2 * (network.edge_count() + network.source_count() + network.sink_count()),
        );
        let source = graph.add_node(());
        let sink = graph.add_node(());

        let mut sources: HashMap<VertexId, NodeIndex> = HashMap::new();
        for vertex in network.sources() {
            let node = graph.add_node(());
            sources.insert(vertex.id, node);
            add_arc(&mut graph, source, node, vertex.capacity, 0.0, None);
        }

        let mut sinks: HashMap<VertexId, NodeIndex> = HashMap::new();
        for vertex in network.sinks() {
            let node = graph.add_node(());
            sinks.insert(vertex.id, node);
            add_arc(&mut graph, node, sink, vertex.capacity, 0.0, None);
        }

        for edge in network.edges() {
            let key = edge.key();
            // Endpoints always exist: FlowNetwork creates them with the edge.
            if let (Some(&from), Some(&to)) = (sources.get(&key.source), sinks.get(&key.sink)) {
                let upper = network.edge_upper_bound(&key);
                add_arc(&mut graph, from, to, upper, edge.variable_cost, Some(key));
            }
        }

        Self {
            graph,
            source,
            sink,
        }
    }

    /// Cheapest augmenting path from the super source to the super sink,
    /// as the list of residual arcs along it.
    fn shortest_path(&self) -> Option<Vec<EdgeIndex>> {
        let n = self.graph.node_count();
        let mut dist = vec![f64::INFINITY; n];
        let mut pred: Vec<Option<EdgeIndex>> = vec![None; n];
        dist[self.source.index()] = 0.0;

        for _ in 0..n {
            let mut changed = false;
            for arc in self.graph.edge_references() {
                if arc.weight().residual <= CAPACITY_EPSILON {
                    continue;
                }
                let u = arc.source().index();
                let v = arc.target().index();
                if dist[u].is_infinite() {
                    continue;
                }
                let candidate = dist[u] + arc.weight().cost;
                if candidate < dist[v] - 1e-12 {
                    dist[v] = candidate;
                    pred[v] = Some(arc.id());
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        if dist[self.sink.index()].is_infinite() {
            return None;
        }

        let mut path = Vec::new();
        let mut node = self.sink;
        while node != self.source {
            let arc = pred[node.index()]?;
            path.push(arc);
            let (from, _) = self.graph.edge_endpoints(arc)?;
            node = from;
            if path.len() > n {
                return None;
            }
        }
        path.reverse();
        Some(path)
    }

    fn augment(&mut self, path: &[EdgeIndex]) -> f64 {
        let bottleneck = path
            .iter()
            .map(|&e| self.graph[e].residual)
            .fold(f64::INFINITY, f64::min);
        for &e in path {
            self.graph[e].residual -= bottleneck;
            self.graph[twin(e)].residual += bottleneck;
        }
        bottleneck
    }

    /// Flow on each network edge, read back from the reverse arcs.
    fn edge_flows(&self) -> HashMap<EdgeKey, f64> {
        self.graph
            .edge_references()
            .filter(|arc| !arc.weight().forward)
            .filter_map(|arc| arc.weight().edge.map(|key| (key, arc.weight().residual)))
            .collect()
    }
}

fn add_arc(
    graph: &mut DiGraph<(), ResidualArc>,
    from: NodeIndex,
    to: NodeIndex,
    capacity: f64,
    cost: f64,
    edge: Option<EdgeKey>,
) {
    graph.add_edge(
        from,
        to,
        ResidualArc {
            residual: capacity.max(0.0),
            cost,
            edge,
            forward: true,
        },
    );
    graph.add_edge(
        to,
        from,
        ResidualArc {
            residual: 0.0,
            cost: -cost,
            edge,
            forward: false,
        },
    );
}

/// Arcs are always added in forward/reverse pairs, so twins differ only in
/// the lowest index bit.
fn twin(e: EdgeIndex) -> EdgeIndex {
    EdgeIndex::new(e.index() ^ 1)
}

/// Successive-shortest-path transportation solver.
///
/// # Examples
///
/// ```
/// use fctp_player::graph::network::FlowNetwork;
/// use fctp_player::optimization::solver::FlowSolver;
/// use fctp_player::optimization::transport::TransportSolver;
///
/// let mut network = FlowNetwork::new();
/// network.new_edge(1, 1, 10.0, 0.0);
/// network.new_edge(1, 2, 12.0, 0.0);
/// network.set_source_capacity(1, 5.0);
/// network.set_sink_capacity(1, 3.0);
/// network.set_sink_capacity(2, 2.0);
///
/// let flows = TransportSolver::new().compute_flow(&network).unwrap();
/// assert_eq!(flows.len(), 2);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportSolver;

impl TransportSolver {
    pub fn new() -> Self {
        Self
    }
}

impl FlowSolver for TransportSolver {
    fn compute_flow(&self, network: &FlowNetwork) -> Result<Vec<EdgeFlow>, SolverError> {
        if network.is_empty() {
            return Err(SolverError::Empty);
        }
        let supply = network.total_supply();
        let demand = network.total_demand();
        if !network.is_balanced(BALANCE_TOLERANCE) {
            return Err(SolverError::Unbalanced { supply, demand });
        }

        let mut residual = ResidualGraph::build(network);
        let mut shipped = 0.0;
        let mut augmentations = 0usize;
        while let Some(path) = residual.shortest_path() {
            let amount = residual.augment(&path);
            if amount <= CAPACITY_EPSILON {
                break;
            }
            shipped += amount;
            augmentations += 1;
            trace!("augmented {:.4} along {} arcs", amount, path.len());
        }
        debug!(
            "transport solve: shipped {:.4} of {:.4} in {} augmentations",
            shipped, supply, augmentations
        );

        if shipped < supply - BALANCE_TOLERANCE.max(supply * 1e-9) {
            return Err(SolverError::Infeasible {
                shipped,
                required: supply,
            });
        }

        let flows = residual.edge_flows();
        Ok(network
            .edges()
            .filter_map(|edge| {
                let amount = flows.get(&edge.key()).copied().unwrap_or(0.0);
                (amount >= MIN_REPORTED_FLOW).then(|| EdgeFlow::new(edge.source, edge.sink, amount))
            })
            .collect())
    }
}
