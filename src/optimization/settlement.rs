use crate::core::bid::BidPack;
use crate::core::owner::OwnerId;
use crate::core::stream::{Flow, Stream};
use crate::graph::network::{EdgeKey, FlowNetwork};
use crate::optimization::solver::{EdgeFlow, FlowSolver, SolverError};
use indexmap::map::Entry;
use indexmap::IndexMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bids within this distance of the clearing price tie with it.
pub const PRICE_EPSILON: f64 = 0.001;

/// Bid packs keyed by owner, in arrival order.
pub type BidBook = IndexMap<OwnerId, BidPack>;

/// How one contested edge cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSettlement {
    pub key: EdgeKey,
    /// Owners tied at the clearing price, in the order their bids arrived.
    pub owners: Vec<OwnerId>,
    /// Clearing price: the lowest bid, drifting to the latest near-tie.
    pub price: f64,
    /// Every bid received for the edge, winning or losing.
    pub bid_count: usize,
    /// Lowest price bid so far; ties are measured from here.
    #[serde(skip)]
    floor: f64,
    /// Each tied owner's lowest offer, parallel to `owners`.
    #[serde(skip)]
    offers: Vec<f64>,
}

impl EdgeSettlement {
    fn lead(key: EdgeKey, owner: &OwnerId, price: f64) -> Self {
        Self {
            key,
            owners: vec![owner.clone()],
            price,
            bid_count: 1,
            floor: price,
            offers: vec![price],
        }
    }

    /// Record `owner` as tied at `price`, keeping its lowest offer.
    fn join(&mut self, owner: &OwnerId, price: f64) {
        match self.owners.iter().position(|o| o == owner) {
            Some(i) => self.offers[i] = self.offers[i].min(price),
            None => {
                self.owners.push(owner.clone());
                self.offers.push(price);
            }
        }
        self.price = price;
    }

    /// Lower the floor and drop owners no longer within epsilon of it.
    fn lower_floor(&mut self, floor: f64) {
        self.floor = floor;
        let mut i = 0;
        while i < self.owners.len() {
            if self.offers[i] - floor > PRICE_EPSILON {
                self.owners.remove(i);
                self.offers.remove(i);
            } else {
                i += 1;
            }
        }
    }
}

/// Outcome of merging bid packs into a priced copy of a network.
#[derive(Debug, Clone)]
pub struct BidResolution {
    network: FlowNetwork,
    settlements: IndexMap<EdgeKey, EdgeSettlement>,
}

impl BidResolution {
    /// The working network, with each contested edge priced at its
    /// lowest bid.
    pub fn network(&self) -> &FlowNetwork {
        &self.network
    }

    pub fn settlement(&self, key: &EdgeKey) -> Option<&EdgeSettlement> {
        self.settlements.get(key)
    }

    /// Settlements in the order their edges were first bid on.
    pub fn settlements(&self) -> impl Iterator<Item = &EdgeSettlement> {
        self.settlements.values()
    }

    pub fn contested_count(&self) -> usize {
        self.settlements.len()
    }
}

/// Merge competing bid packs into a priced working copy of `base`.
///
/// Bids are processed owner by owner, each pack in submission order:
///
/// 1. A bid on an edge the network does not have is ignored.
/// 2. The first bid on an edge opens it: its owner leads and the working
///    edge is repriced.
/// 3. A bid more than [`PRICE_EPSILON`] above the lowest price seen on the
///    edge loses.
/// 4. Any other bid ties and becomes the recorded clearing price. If it is
///    a new lowest price, the working edge is repriced to it and tied
///    owners more than [`PRICE_EPSILON`] above it drop out. An undercut by
///    more than [`PRICE_EPSILON`] therefore leaves its owner alone.
///
/// The tied owners end up exactly those with a bid within
/// [`PRICE_EPSILON`] of the edge's lowest bid, whatever the arrival order.
/// Every bid counts towards its edge's `bid_count`. `base` is never
/// modified.
pub fn resolve_bids<'a, I>(base: &FlowNetwork, bids: I) -> BidResolution
where
    I: IntoIterator<Item = (&'a OwnerId, &'a BidPack)>,
{
    let mut network = base.clone();
    let mut settlements: IndexMap<EdgeKey, EdgeSettlement> = IndexMap::new();

    for (owner, pack) in bids {
        for bid in pack {
            let key = bid.key();
            if network.edge_by_key(&key).is_none() {
                debug!("{}: ignoring bid on unknown edge {}", owner, key);
                continue;
            }

            let price = bid.price();
            let current = match settlements.entry(key) {
                Entry::Vacant(slot) => {
                    trace!("{}: opens {} at {:.2}", owner, key, price);
                    slot.insert(EdgeSettlement::lead(key, owner, price));
                    // The edge exists: checked above.
                    let _ = network.set_edge_cost(key.source, key.sink, price);
                    continue;
                }
                Entry::Occupied(slot) => slot.into_mut(),
            };

            current.bid_count += 1;
            if price - current.floor > PRICE_EPSILON {
                trace!("{}: loses {} at {:.2}", owner, key, price);
                continue;
            }
            if current.floor - price > PRICE_EPSILON {
                trace!("{}: leads {} at {:.2}", owner, key, price);
            } else {
                trace!("{}: ties {} at {:.2}", owner, key, price);
            }
            current.join(owner, price);
            if price < current.floor {
                current.lower_floor(price);
                let _ = network.set_edge_cost(key.source, key.sink, price);
            }
        }
    }

    BidResolution {
        network,
        settlements,
    }
}

/// Turn solved edge flows into per-owner streams.
///
/// Edges nobody bid on are dropped. A contested edge's flow is split evenly
/// across its tied owners; zero amounts are kept.
pub fn split_flow(flows: &[EdgeFlow], resolution: &BidResolution) -> Flow {
    let mut streams = Vec::new();
    for edge_flow in flows {
        let Some(settlement) = resolution.settlement(&edge_flow.key()) else {
            continue;
        };
        if settlement.owners.is_empty() {
            continue;
        }
        let share = edge_flow.amount / settlement.owners.len() as f64;
        for owner in &settlement.owners {
            streams.push(Stream::new(
                edge_flow.source,
                edge_flow.sink,
                share,
                owner.clone(),
                settlement.price,
                settlement.bid_count,
            ));
        }
    }
    Flow::new(streams)
}

/// Settles rounds of bidding on one network with one solver.
///
/// # Examples
///
/// ```
/// use fctp_player::core::bid::BidPack;
/// use fctp_player::core::owner::OwnerId;
/// use fctp_player::graph::network::FlowNetwork;
/// use fctp_player::optimization::settlement::{BidBook, SettlementEngine};
/// use fctp_player::optimization::transport::TransportSolver;
///
/// let mut network = FlowNetwork::new();
/// network.new_edge(1, 1, 10.0, 0.0);
/// network.set_source_capacity(1, 4.0);
/// network.set_sink_capacity(1, 4.0);
///
/// let mut pack = BidPack::new();
/// pack.bid(1, 1, 9.0);
/// let mut bids = BidBook::new();
/// bids.insert(OwnerId::new("A"), pack);
///
/// let engine = SettlementEngine::new(network, TransportSolver::new());
/// let flow = engine.compute_flow(&bids).unwrap();
/// assert_eq!(flow.len(), 1);
/// assert_eq!(flow.streams()[0].amount, 4.0);
/// ```
pub struct SettlementEngine<S> {
    network: FlowNetwork,
    solver: S,
}

impl<S: FlowSolver> SettlementEngine<S> {
    pub fn new(network: FlowNetwork, solver: S) -> Self {
        Self { network, solver }
    }

    pub fn network(&self) -> &FlowNetwork {
        &self.network
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Resolve bids without solving.
    pub fn resolve(&self, bids: &BidBook) -> BidResolution {
        resolve_bids(&self.network, bids)
    }

    /// Resolve bids, solve the priced network and split the flow.
    pub fn compute_flow(&self, bids: &BidBook) -> Result<Flow, SolverError> {
        Ok(self.settle(bids)?.flow)
    }

    /// Like [`compute_flow`](Self::compute_flow), keeping the resolution
    /// and raw solver output alongside the streams.
    pub fn settle(&self, bids: &BidBook) -> Result<Settlement, SolverError> {
        let resolution = self.resolve(bids);
        let edge_flows = self.solver.compute_flow(resolution.network())?;
        let flow = split_flow(&edge_flows, &resolution);
        debug!(
            "settled {} contested edges into {} streams ({} solved edges)",
            resolution.contested_count(),
            flow.len(),
            edge_flows.len()
        );
        Ok(Settlement {
            resolution,
            edge_flows,
            flow,
        })
    }
}

/// Full record of one settled round.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub resolution: BidResolution,
    pub edge_flows: Vec<EdgeFlow>,
    pub flow: Flow,
}

impl fmt::Display for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Settlement ===")?;
        writeln!(f, "Contested edges: {}", self.resolution.contested_count())?;
        writeln!(f, "Solved edges:    {}", self.edge_flows.len())?;
        writeln!(f, "Streams:         {}", self.flow.len())?;
        for stream in self.flow.streams() {
            writeln!(f, "  {}", stream)?;
        }
        Ok(())
    }
}
