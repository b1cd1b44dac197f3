use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fctp_player::core::bid::BidPack;
use fctp_player::core::owner::OwnerId;
use fctp_player::graph::network::FlowNetwork;
use fctp_player::optimization::settlement::{BidBook, SettlementEngine};
use fctp_player::optimization::solver::FlowSolver;
use fctp_player::optimization::transport::TransportSolver;
use fctp_player::simulation::generator::{generate_instance, InstanceConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn instance(size: u32) -> FlowNetwork {
    let config = InstanceConfig {
        sources: size,
        sinks: size,
        ..Default::default()
    };
    generate_instance(&config, &mut StdRng::seed_from_u64(u64::from(size)))
}

/// Four bidders, each on a random quarter of the edges.
fn book(network: &FlowNetwork) -> BidBook {
    let mut rng = StdRng::seed_from_u64(7);
    let mut book = BidBook::new();
    for owner in ["A", "B", "C", "D"] {
        let mut pack = BidPack::new();
        for edge in network.edges() {
            if rng.gen_range(0..4) == 0 {
                pack.bid(edge.source, edge.sink, edge.variable_cost * rng.gen_range(1.0..3.0));
            }
        }
        book.insert(OwnerId::new(owner), pack);
    }
    book
}

fn bench_solve_10x10(c: &mut Criterion) {
    let network = instance(10);
    c.bench_function("solve_10x10", |b| {
        b.iter(|| TransportSolver::new().compute_flow(black_box(&network)))
    });
}

fn bench_solve_30x30(c: &mut Criterion) {
    let network = instance(30);
    c.bench_function("solve_30x30", |b| {
        b.iter(|| TransportSolver::new().compute_flow(black_box(&network)))
    });
}

fn bench_settle_10x10(c: &mut Criterion) {
    let network = instance(10);
    let bids = book(&network);
    let engine = SettlementEngine::new(network, TransportSolver::new());
    c.bench_function("settle_10x10_4_bidders", |b| {
        b.iter(|| engine.compute_flow(black_box(&bids)))
    });
}

fn bench_resolve_50x50(c: &mut Criterion) {
    let network = instance(50);
    let bids = book(&network);
    let engine = SettlementEngine::new(network, TransportSolver::new());
    c.bench_function("resolve_50x50_4_bidders", |b| {
        b.iter(|| engine.resolve(black_box(&bids)))
    });
}

criterion_group!(
    benches,
    bench_solve_10x10,
    bench_solve_30x30,
    bench_settle_10x10,
    bench_resolve_50x50
);
criterion_main!(benches);
