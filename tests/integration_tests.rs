use approx::assert_relative_eq;
use fctp_player::config::PlayerConfig;
use fctp_player::core::bid::{Bid, BidPack};
use fctp_player::core::owner::OwnerId;
use fctp_player::core::round::Match;
use fctp_player::core::stream::Stream;
use fctp_player::graph::cache::InstanceCache;
use fctp_player::graph::instance::{write_instance, StaticLoader};
use fctp_player::graph::network::{EdgeKey, FlowNetwork};
use fctp_player::optimization::settlement::{BidBook, SettlementEngine};
use fctp_player::optimization::solver::{EdgeFlow, FlowSolver, SolverError};
use fctp_player::optimization::transport::TransportSolver;
use fctp_player::policy::{BiddingPolicy, FirstEdges, PolicyKind};
use fctp_player::session::wire::{format_flow, format_profits, parse_bid_pack};
use fctp_player::session::Session;
use fctp_player::simulation::generator::{generate_instance, InstanceConfig};
use fctp_player::simulation::referee::Referee;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::sync::Arc;

fn scenario_network() -> FlowNetwork {
    let mut network = FlowNetwork::new();
    network.new_edge(1, 1, 10.0, 0.0);
    network.new_edge(1, 2, 12.0, 0.0);
    network.set_source_capacity(1, 5.0);
    network.set_sink_capacity(1, 3.0);
    network.set_sink_capacity(2, 2.0);
    network
}

fn scenario_cache() -> Arc<InstanceCache> {
    Arc::new(InstanceCache::new(
        StaticLoader::default().with("N1", scenario_network()),
    ))
}

fn scenario_book() -> BidBook {
    let mut book = BidBook::new();
    for (owner, source, sink, price) in [("A", 1, 1, 8.0), ("B", 1, 1, 8.0), ("C", 1, 2, 15.0)] {
        let mut pack = BidPack::new();
        pack.bid(source, sink, price);
        book.insert(OwnerId::new(owner), pack);
    }
    book
}

/// Three bidders on the two-edge network: a tie on (1,1) and an
/// uncontested overbid on (1,2).
#[test]
fn tied_and_sole_bidders_settle() {
    let engine = SettlementEngine::new(scenario_network(), TransportSolver::new());
    let settlement = engine.settle(&scenario_book()).unwrap();

    let tie = settlement.resolution.settlement(&EdgeKey::new(1, 1)).unwrap();
    assert_eq!(tie.owners, vec![OwnerId::new("A"), OwnerId::new("B")]);
    assert_eq!(tie.price, 8.0);
    let sole = settlement.resolution.settlement(&EdgeKey::new(1, 2)).unwrap();
    assert_eq!(sole.owners, vec![OwnerId::new("C")]);
    assert_eq!(
        settlement.resolution.network().edge(1, 2).unwrap().variable_cost,
        15.0
    );

    let expected = vec![
        Stream::new(1, 1, 1.5, OwnerId::new("A"), 8.0, 2),
        Stream::new(1, 1, 1.5, OwnerId::new("B"), 8.0, 2),
        Stream::new(1, 2, 2.0, OwnerId::new("C"), 15.0, 1),
    ];
    assert_eq!(settlement.flow.streams().len(), 3);
    for (got, want) in settlement.flow.streams().iter().zip(&expected) {
        assert_eq!((got.source, got.sink), (want.source, want.sink));
        assert_eq!(got.owner, want.owner);
        assert_eq!(got.price, want.price);
        assert_eq!(got.bid_count, want.bid_count);
        assert_relative_eq!(got.amount, want.amount, epsilon = 1e-9);
    }
}

struct BrokenSolver;

impl FlowSolver for BrokenSolver {
    fn compute_flow(&self, _: &FlowNetwork) -> Result<Vec<EdgeFlow>, SolverError> {
        Err(SolverError::Unavailable("license expired".to_string()))
    }
}

#[test]
fn solver_failure_is_not_an_empty_flow() {
    let engine = SettlementEngine::new(scenario_network(), BrokenSolver);
    assert!(matches!(
        engine.compute_flow(&scenario_book()),
        Err(SolverError::Unavailable(_))
    ));
}

/// A whole session: bid, receive a settlement, bid again on repriced edges.
#[test]
fn session_adapts_to_settlement() {
    let cache = scenario_cache();

    // The referee settles what a FirstEdges player would bid.
    let mut twin = FirstEdges::new(Arc::clone(&cache), 2.0);
    let first_pack = twin.compute_bid(&Match::new("N1", 2));
    let mut book = BidBook::new();
    book.insert(OwnerId::new("Parallax"), first_pack.clone());
    let engine = SettlementEngine::new(scenario_network(), TransportSolver::new());
    let flow = engine.compute_flow(&book).unwrap();
    assert_eq!(flow.len(), 2);

    let mut script = String::from("name\ninstance N1 2\n");
    script.push_str(&format_flow(&flow));
    script.push_str("instance N1 2\n");
    script.push_str(&format_profits(&[]));

    let mut session = Session::new("Parallax", FirstEdges::new(cache, 2.0));
    let mut out = Vec::new();
    let summary = session.run(script.as_bytes(), &mut out);
    let out = String::from_utf8(out).unwrap();

    assert!(summary.completed);
    assert_eq!(summary.rounds_bid, 2);
    assert_eq!(summary.settlements_applied, 1);

    let mut replies = out.split("bid\n");
    assert_eq!(replies.next(), Some("name Parallax\n"));
    let first = parse_bid_pack(&format!("bid\n{}", replies.next().unwrap())).unwrap();
    let second = parse_bid_pack(&format!("bid\n{}", replies.next().unwrap())).unwrap();
    assert_eq!(first, first_pack);
    // Settled at 20 and 24, so the next bids double again.
    assert_eq!(second.bids(), &[Bid::new(1, 1, 40.0), Bid::new(1, 2, 48.0)]);
}

#[test]
fn unknown_instance_gets_empty_bid() {
    let mut session = Session::new("Parallax", FirstEdges::new(scenario_cache(), 2.0));
    let mut out = Vec::new();
    let summary = session.run("instance FOO 5\n".as_bytes(), &mut out);
    assert_eq!(String::from_utf8(out).unwrap(), "bid\n");
    assert_eq!(summary.rounds_bid, 1);
    assert_eq!(summary.lines_skipped, 0);
}

#[test]
fn short_result_block_ends_session_without_update() {
    let script = "instance N1 1\nresult 3\n1 1 Parallax 1 3.0 3.0\n";
    let mut session = Session::new("Parallax", FirstEdges::new(scenario_cache(), 2.0));
    let summary = session.run(script.as_bytes(), &mut Vec::new());
    assert_eq!(summary.settlements_applied, 0);
    assert!(!summary.completed);

    // The policy never saw the partial report: prices are untouched.
    let mut policy = session.into_policy();
    let pack = policy.compute_bid(&Match::new("N1", 1));
    assert_eq!(pack.bids(), &[Bid::new(1, 1, 20.0)]);
}

/// Instance files on disk, loaded through the configured cache.
#[test]
fn generated_instances_load_from_directory() {
    let dir = std::env::temp_dir().join(format!("fctp-it-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();

    let mut rng = StdRng::seed_from_u64(21);
    let config = InstanceConfig {
        sources: 4,
        sinks: 6,
        ..Default::default()
    };
    let mut expected = Vec::new();
    for name in ["G1", "G2"] {
        let network = generate_instance(&config, &mut rng);
        let file = fs::File::create(dir.join(format!("{}.DAT", name))).unwrap();
        write_instance(&network, name, file).unwrap();
        expected.push(network);
    }
    fs::write(dir.join("notes.txt"), "not an instance").unwrap();

    let player = PlayerConfig {
        data: dir.clone(),
        policy: PolicyKind::SolverEdges,
        ..Default::default()
    };
    let cache = player.build_cache();
    assert_eq!(cache.len(), 2);
    assert_eq!(*cache.get("G2").unwrap(), expected[1]);

    let mut policy = player.build_policy(Arc::clone(&cache));
    let pack = policy.compute_bid(&Match::new("G1", 5));
    assert!(!pack.is_empty() && pack.len() <= 5);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn all_policies_play_a_generated_game() {
    let mut rng = StdRng::seed_from_u64(99);
    let network = generate_instance(&InstanceConfig::default(), &mut rng);
    let cache = Arc::new(InstanceCache::new(
        StaticLoader::default().with("R10", network.clone()),
    ));

    let mut referee = Referee::new("R10", network, TransportSolver::new());
    for kind in PolicyKind::ALL {
        referee.add_player(kind.as_str(), kind.build(Arc::clone(&cache), 2.0, Some(3)));
    }
    let report = referee.play(5, 8);

    assert_eq!(report.failed_rounds, 0);
    let owners: Vec<&str> = report.profits.iter().map(|p| p.owner.as_str()).collect();
    assert_eq!(owners, vec!["FirstEdges", "RandomEdges", "SolverEdges"]);
    assert!(report.to_string().contains("=== Referee Report ==="));
}
