use fctp_player::core::bid::BidPack;
use fctp_player::core::owner::OwnerId;
use fctp_player::graph::network::{EdgeKey, FlowNetwork};
use fctp_player::optimization::settlement::{
    resolve_bids, split_flow, BidBook, SettlementEngine, PRICE_EPSILON,
};
use fctp_player::optimization::solver::{EdgeFlow, FlowSolver};
use fctp_player::optimization::transport::TransportSolver;
use fctp_player::session::wire::parse_bid_pack;
use fctp_player::simulation::generator::{generate_instance, InstanceConfig};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

/// Owner names from a small pool, so owners repeat across bids.
fn arb_owner() -> impl Strategy<Value = OwnerId> {
    prop::sample::select(vec![
        OwnerId::new("A"),
        OwnerId::new("B"),
        OwnerId::new("C"),
        OwnerId::new("D"),
    ])
}

/// Prices on a half-unit grid: distinct prices are never near-ties.
fn arb_grid_price() -> impl Strategy<Value = f64> {
    (0u32..40).prop_map(|p| f64::from(p) * 0.5)
}

/// Prices a few epsilons apart, so near-ties are common.
fn arb_close_price() -> impl Strategy<Value = f64> {
    8.0f64..8.0 + 4.0 * PRICE_EPSILON
}

/// Resolve bids on a single edge, in the given arrival order.
fn tied_on_single_edge(bids: &[(OwnerId, f64)]) -> (Vec<OwnerId>, f64, f64) {
    let mut network = FlowNetwork::new();
    network.new_edge(1, 1, 100.0, 0.0);

    let mut book = BidBook::new();
    for (owner, price) in bids {
        book.entry(owner.clone()).or_insert_with(BidPack::new).bid(1, 1, *price);
    }
    let resolution = resolve_bids(&network, &book);
    let settlement = resolution.settlement(&EdgeKey::new(1, 1)).unwrap();
    let mut owners = settlement.owners.clone();
    owners.sort();
    let cost = resolution.network().edge(1, 1).unwrap().variable_cost;
    (owners, settlement.price, cost)
}

/// A random edge list on up to 4 sources and 4 sinks.
fn arb_network() -> impl Strategy<Value = FlowNetwork> {
    prop::collection::vec((1u32..5, 1u32..5, 0.0f64..100.0, 0.0f64..50.0), 1..16).prop_map(
        |edges| {
            let mut network = FlowNetwork::new();
            for (source, sink, vcost, fcost) in edges {
                network.new_edge(source, sink, vcost, fcost);
            }
            network
        },
    )
}

/// A balanced complete instance, small enough to solve quickly.
fn arb_instance() -> impl Strategy<Value = FlowNetwork> {
    (1u32..5, 1u32..5, any::<u64>()).prop_map(|(sources, sinks, seed)| {
        let config = InstanceConfig {
            sources,
            sinks,
            ..Default::default()
        };
        generate_instance(&config, &mut StdRng::seed_from_u64(seed))
    })
}

/// Every owner bids at most once per edge; picks edges by index.
fn arb_book(max_edges: usize) -> impl Strategy<Value = Vec<(OwnerId, Vec<(usize, f64)>)>> {
    prop::collection::vec(
        (
            arb_owner(),
            prop::collection::vec((0..max_edges, 1.0f64..60.0), 0..6),
        ),
        0..5,
    )
}

fn build_book(network: &FlowNetwork, raw: Vec<(OwnerId, Vec<(usize, f64)>)>) -> BidBook {
    let mut book = BidBook::new();
    for (owner, bids) in raw {
        let pack = book.entry(owner).or_insert_with(BidPack::new);
        for (index, price) in bids {
            if let Some(edge) = network.edge_at(index % network.edge_count()) {
                pack.bid(edge.source, edge.sink, price);
            }
        }
    }
    book
}

proptest! {
    // ===================================================================
    // A cloned network is independent of its original.
    // ===================================================================
    #[test]
    fn clone_is_independent(network in arb_network(), price in -10.0f64..10.0) {
        let mut copy = network.clone();
        prop_assert_eq!(&copy, &network);

        let key = network.edges().next().map(|e| e.key()).unwrap();
        let before = network.edge_by_key(&key).unwrap().variable_cost;
        copy.set_edge_cost(key.source, key.sink, before + 1000.0 + price).unwrap();
        prop_assert_eq!(network.edge_by_key(&key).unwrap().variable_cost, before);
    }

    // ===================================================================
    // On a single edge the clearing price is the lowest bid and the tied
    // owners are exactly those who bid it.
    // ===================================================================
    #[test]
    fn clearing_price_is_minimum(
        bids in prop::collection::vec((arb_owner(), arb_grid_price()), 1..12)
    ) {
        let mut network = FlowNetwork::new();
        network.new_edge(1, 1, 100.0, 0.0);

        let mut book = BidBook::new();
        for (owner, price) in &bids {
            book.entry(owner.clone()).or_insert_with(BidPack::new).bid(1, 1, *price);
        }
        let resolution = resolve_bids(&network, &book);
        let settlement = resolution.settlement(&EdgeKey::new(1, 1)).unwrap();

        let min = bids.iter().map(|(_, p)| *p).fold(f64::INFINITY, f64::min);
        prop_assert!((settlement.price - min).abs() <= PRICE_EPSILON);
        prop_assert_eq!(settlement.bid_count, bids.len());

        let mut expected: Vec<&OwnerId> = bids
            .iter()
            .filter(|(_, p)| (p - min).abs() <= PRICE_EPSILON)
            .map(|(o, _)| o)
            .collect();
        expected.sort();
        expected.dedup();
        let mut tied: Vec<&OwnerId> = settlement.owners.iter().collect();
        tied.sort();
        prop_assert_eq!(tied, expected);
        prop_assert_eq!(resolution.network().edge(1, 1).unwrap().variable_cost, min);
    }

    // ===================================================================
    // Within the epsilon band the tied owners are exactly those within
    // epsilon of the lowest bid, whatever order the bids arrive in.
    // ===================================================================
    #[test]
    fn near_ties_are_measured_from_minimum(
        bids in prop::collection::vec((arb_owner(), arb_close_price()), 1..10)
    ) {
        let min = bids.iter().map(|(_, p)| *p).fold(f64::INFINITY, f64::min);
        let mut expected: Vec<OwnerId> = bids
            .iter()
            .filter(|(_, p)| p - min <= PRICE_EPSILON)
            .map(|(o, _)| o.clone())
            .collect();
        expected.sort();
        expected.dedup();

        let mut orders: Vec<Vec<(OwnerId, f64)>> = (0..bids.len())
            .map(|k| {
                let mut rotated = bids.clone();
                rotated.rotate_left(k);
                rotated
            })
            .collect();
        orders.push(bids.iter().rev().cloned().collect());

        for order in &orders {
            let (owners, price, cost) = tied_on_single_edge(order);
            prop_assert_eq!(&owners, &expected);
            prop_assert_eq!(cost, min);
            prop_assert!(price >= min && price - min <= PRICE_EPSILON);
        }
    }

    // ===================================================================
    // Streams on an edge add up to the solver's flow on that edge.
    // ===================================================================
    #[test]
    fn streams_sum_to_edge_flow(network in arb_instance(), raw in arb_book(32)) {
        let book = build_book(&network, raw);
        let engine = SettlementEngine::new(network, TransportSolver::new());
        let settlement = engine.settle(&book).unwrap();

        let mut sums: HashMap<EdgeKey, f64> = HashMap::new();
        for stream in settlement.flow.streams() {
            *sums.entry(stream.key()).or_insert(0.0) += stream.amount;
        }
        for edge_flow in &settlement.edge_flows {
            let key = edge_flow.key();
            match settlement.resolution.settlement(&key) {
                Some(s) => {
                    prop_assert!((sums[&key] - edge_flow.amount).abs() < 1e-9);
                    for stream in settlement.flow.streams().iter().filter(|st| st.key() == key) {
                        prop_assert!(
                            (stream.amount - edge_flow.amount / s.owners.len() as f64).abs() < 1e-9
                        );
                    }
                }
                None => prop_assert!(!sums.contains_key(&key)),
            }
        }
    }

    // ===================================================================
    // Without bids nothing settles, whatever the solver routes.
    // ===================================================================
    #[test]
    fn empty_book_settles_nothing(network in arb_network()) {
        let flows: Vec<EdgeFlow> = network
            .edges()
            .map(|e| EdgeFlow::new(e.source, e.sink, 1.0))
            .collect();
        let resolution = resolve_bids(&network, &BidBook::new());
        prop_assert_eq!(resolution.contested_count(), 0);
        prop_assert!(split_flow(&flows, &resolution).is_empty());
    }

    // ===================================================================
    // The transportation solver meets every supply and demand.
    // ===================================================================
    #[test]
    fn solver_meets_capacities(network in arb_instance()) {
        let flows = TransportSolver::new().compute_flow(&network).unwrap();
        for source in network.sources() {
            let out: f64 = flows.iter().filter(|f| f.source == source.id).map(|f| f.amount).sum();
            prop_assert!((out - source.capacity).abs() < 0.05);
        }
        for sink in network.sinks() {
            let inflow: f64 = flows.iter().filter(|f| f.sink == sink.id).map(|f| f.amount).sum();
            prop_assert!((inflow - sink.capacity).abs() < 0.05);
        }
    }

    // ===================================================================
    // A bid pack survives the wire up to two decimals.
    // ===================================================================
    #[test]
    fn bid_pack_wire_round_trip(
        bids in prop::collection::vec((0u32..1000, 0u32..1000, 0.0f64..10_000.0), 0..20)
    ) {
        let pack: BidPack = bids
            .iter()
            .map(|&(s, t, p)| fctp_player::core::bid::Bid::new(s, t, p))
            .collect();
        let parsed = parse_bid_pack(&pack.to_string()).unwrap();
        prop_assert_eq!(parsed.len(), pack.len());
        for (a, b) in parsed.iter().zip(pack.iter()) {
            prop_assert_eq!((a.source(), a.sink()), (b.source(), b.sink()));
            prop_assert!((a.price() - b.price()).abs() <= 0.005 + 1e-9);
        }
    }
}
