//! fctp-player CLI
//!
//! Play FCTP bidding rounds against a referee, or exercise the bidding
//! machinery locally.
//!
//! # Usage
//!
//! ```bash
//! # Connect to a referee with the solver-assisted policy
//! fctp-player play --server localhost:8080 --data ./data
//!
//! # Compute one bid pack on an instance file and settle it locally
//! fctp-player bid --instance data/N104.DAT --policy FirstEdges --edges 5
//!
//! # Solve the plain transportation problem
//! fctp-player solve --instance data/N104.DAT --format json
//!
//! # Let all three policies play each other
//! fctp-player simulate --instance data/N104.DAT --rounds 20
//!
//! # Generate a random instance
//! fctp-player generate --sources 10 --sinks 10 --output data/R10.DAT
//! ```

use fctp_player::config::PlayerConfig;
use fctp_player::core::owner::OwnerId;
use fctp_player::core::round::Match;
use fctp_player::graph::cache::InstanceCache;
use fctp_player::graph::instance::{load_instance, write_instance, StaticLoader};
use fctp_player::graph::network::FlowNetwork;
use fctp_player::optimization::settlement::{BidBook, SettlementEngine};
use fctp_player::optimization::solver::{objective, EdgeFlow, FlowSolver};
use fctp_player::optimization::transport::TransportSolver;
use fctp_player::policy::PolicyKind;
use fctp_player::session::Session;
use fctp_player::simulation::generator::{generate_instance, InstanceConfig};
use fctp_player::simulation::referee::Referee;
use log::LevelFilter;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::Path;
use std::process;
use std::str::FromStr;
use std::sync::Arc;

fn print_usage() {
    eprintln!(
        r#"fctp-player — competitive bidding player for the fixed-charge transportation problem

USAGE:
    fctp-player <COMMAND> [OPTIONS]

COMMANDS:
    play        Connect to a referee and play until the session ends
    bid         Compute one bid pack on an instance file and settle it locally
    solve       Solve the transportation problem on an instance file
    simulate    Play the built-in policies against each other locally
    generate    Generate a random balanced instance
    help        Show this message

OPTIONS (play):
    --config <FILE>     JSON config file (flags below override it)
    --name <NAME>       Player name (default: Parallax)
    --server <ADDR>     Referee address (default: localhost:8080)
    --data <DIR>        Instance directory (default: ./data)
    --preload <BOOL>    Load all instances before connecting (default: true)
    --policy <NAME>     RandomEdges, FirstEdges or SolverEdges (default: SolverEdges)
    --factor <F>        Price factor (default: 2)
    --seed <N>          Seed for RandomEdges
    --verbose <N>       0 warn, 1 info, 2 debug, 3 trace (default: 1)

OPTIONS (bid):
    --instance <FILE>   Instance file
    --policy <NAME>     Policy (default: SolverEdges)
    --edges <N>         Edge quota (default: 10)
    --factor <F>        Price factor (default: 2)
    --seed <N>          Seed for RandomEdges

OPTIONS (solve):
    --instance <FILE>   Instance file
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (simulate):
    --instance <FILE>   Instance file
    --rounds <N>        Number of rounds (default: 10)
    --edges <N>         Edge quota per round (default: 10)
    --factor <F>        Price factor (default: 2)
    --seed <N>          Seed for RandomEdges

OPTIONS (generate):
    --sources <N>       Number of sources (default: 10)
    --sinks <N>         Number of sinks (default: 10)
    --seed <N>          Random seed
    --output <FILE>     Write to file instead of stdout

bid, solve and simulate also accept --verbose <N>; RUST_LOG overrides it.

EXAMPLES:
    fctp-player play --policy RandomEdges --factor 3 --seed 7
    fctp-player solve --instance data/N104.DAT
    fctp-player generate --sources 5 --sinks 8 --seed 1 --output data/R5.DAT"#
    );
}

fn init_logging(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn verbosity_level(verbose: u8) -> LevelFilter {
    PlayerConfig {
        verbose,
        ..Default::default()
    }
    .log_level()
}

fn value<'a>(args: &'a [String], i: usize, flag: &str, what: &str) -> &'a str {
    args.get(i).map(String::as_str).unwrap_or_else(|| {
        eprintln!("{} requires {}", flag, what);
        process::exit(1);
    })
}

fn parsed<T: FromStr>(args: &[String], i: usize, flag: &str, what: &str) -> T {
    value(args, i, flag, what).parse().unwrap_or_else(|_| {
        eprintln!("{} requires {}", flag, what);
        process::exit(1);
    })
}

fn policy_arg(args: &[String], i: usize) -> PolicyKind {
    value(args, i, "--policy", "a policy name")
        .parse()
        .unwrap_or_else(|e| {
            eprintln!("{}", e);
            process::exit(1);
        })
}

fn load_network(path: &str) -> FlowNetwork {
    load_instance(path).unwrap_or_else(|e| {
        eprintln!("Error loading instance: {}", e);
        process::exit(1);
    })
}

fn instance_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

fn require_instance(path: Option<String>) -> String {
    path.unwrap_or_else(|| {
        eprintln!("Error: --instance <FILE> is required");
        process::exit(1);
    })
}

fn cmd_play(args: &[String]) {
    // The config file is the base layer; find it before applying flags.
    let mut config = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            let path = value(args, i + 1, "--config", "a file path");
            PlayerConfig::from_file(path).unwrap_or_else(|e| {
                eprintln!("{}", e);
                process::exit(1);
            })
        }
        None => PlayerConfig::default(),
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => i += 1,
            "--name" => {
                i += 1;
                config.name = value(args, i, "--name", "a player name").to_string();
            }
            "--server" => {
                i += 1;
                config.server = value(args, i, "--server", "an address").to_string();
            }
            "--data" => {
                i += 1;
                config.data = value(args, i, "--data", "a directory").into();
            }
            "--preload" => {
                i += 1;
                config.preload = parsed(args, i, "--preload", "true or false");
            }
            "--policy" => {
                i += 1;
                config.policy = policy_arg(args, i);
            }
            "--factor" => {
                i += 1;
                config.factor = parsed(args, i, "--factor", "a number");
            }
            "--seed" => {
                i += 1;
                config.seed = Some(parsed(args, i, "--seed", "a number"));
            }
            "--verbose" => {
                i += 1;
                config.verbose = parsed(args, i, "--verbose", "a number");
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        process::exit(1);
    }
    init_logging(config.log_level());

    let cache = config.build_cache();
    let policy = config.build_policy(cache);
    let mut session = Session::new(config.name.clone(), policy).with_verbosity(config.verbose);
    match session.connect(&config.server) {
        Ok(summary) => println!("{}", summary),
        Err(e) => {
            eprintln!("Error connecting {}: {}", config.server, e);
            process::exit(1);
        }
    }
}

fn cmd_bid(args: &[String]) {
    let mut instance = None;
    let mut policy = PolicyKind::default();
    let mut edges = 10usize;
    let mut factor = 2.0f64;
    let mut seed = None;
    let mut verbose = 1u8;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--instance" => {
                i += 1;
                instance = Some(value(args, i, "--instance", "a file path").to_string());
            }
            "--policy" => {
                i += 1;
                policy = policy_arg(args, i);
            }
            "--edges" => {
                i += 1;
                edges = parsed(args, i, "--edges", "a number");
            }
            "--factor" => {
                i += 1;
                factor = parsed(args, i, "--factor", "a number");
            }
            "--seed" => {
                i += 1;
                seed = Some(parsed(args, i, "--seed", "a number"));
            }
            "--verbose" => {
                i += 1;
                verbose = parsed(args, i, "--verbose", "a number");
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }
    init_logging(verbosity_level(verbose));

    let path = require_instance(instance);
    let name = instance_name(&path);
    let network = load_network(&path);
    println!("{}: {}", name, network);

    let cache = Arc::new(InstanceCache::new(
        StaticLoader::default().with(name.clone(), network.clone()),
    ));
    let mut bidder = policy.build(cache, factor, seed);
    let pack = bidder.compute_bid(&Match::new(name, edges));
    print!("{}", pack);

    let mut book = BidBook::new();
    book.insert(OwnerId::new(policy.as_str()), pack);
    let engine = SettlementEngine::new(network, TransportSolver::new());
    match engine.settle(&book) {
        Ok(settlement) => print!("{}", settlement),
        Err(e) => {
            eprintln!("Error computing flow: {}", e);
            process::exit(1);
        }
    }
}

#[derive(serde::Serialize)]
struct SolveOutput {
    instance: String,
    objective: f64,
    flows: Vec<EdgeFlow>,
}

fn cmd_solve(args: &[String]) {
    let mut instance = None;
    let mut format = "text".to_string();
    let mut verbose = 1u8;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--instance" => {
                i += 1;
                instance = Some(value(args, i, "--instance", "a file path").to_string());
            }
            "--format" => {
                i += 1;
                format = value(args, i, "--format", "'text' or 'json'").to_string();
            }
            "--verbose" => {
                i += 1;
                verbose = parsed(args, i, "--verbose", "a number");
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }
    init_logging(verbosity_level(verbose));

    let path = require_instance(instance);
    let network = load_network(&path);
    let flows = TransportSolver::new()
        .compute_flow(&network)
        .unwrap_or_else(|e| {
            eprintln!("Error computing flow: {}", e);
            process::exit(1);
        });
    let total = objective(&network, &flows);

    if format == "json" {
        let output = SolveOutput {
            instance: instance_name(&path),
            objective: total,
            flows,
        };
        let json = serde_json::to_string_pretty(&output).unwrap_or_else(|e| {
            eprintln!("Error encoding JSON: {}", e);
            process::exit(1);
        });
        println!("{}", json);
    } else {
        println!("{}", network);
        for flow in &flows {
            println!("  {}", flow);
        }
        println!("Objective: {:.2}", total);
    }
}

fn cmd_simulate(args: &[String]) {
    let mut instance = None;
    let mut rounds = 10usize;
    let mut edges = 10usize;
    let mut factor = 2.0f64;
    let mut seed = None;
    let mut verbose = 1u8;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--instance" => {
                i += 1;
                instance = Some(value(args, i, "--instance", "a file path").to_string());
            }
            "--rounds" => {
                i += 1;
                rounds = parsed(args, i, "--rounds", "a number");
            }
            "--edges" => {
                i += 1;
                edges = parsed(args, i, "--edges", "a number");
            }
            "--factor" => {
                i += 1;
                factor = parsed(args, i, "--factor", "a number");
            }
            "--seed" => {
                i += 1;
                seed = Some(parsed(args, i, "--seed", "a number"));
            }
            "--verbose" => {
                i += 1;
                verbose = parsed(args, i, "--verbose", "a number");
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }
    init_logging(verbosity_level(verbose));

    let path = require_instance(instance);
    let name = instance_name(&path);
    let network = load_network(&path);
    let cache = Arc::new(InstanceCache::new(
        StaticLoader::default().with(name.clone(), network.clone()),
    ));

    let mut referee = Referee::new(name, network, TransportSolver::new());
    for kind in PolicyKind::ALL {
        referee.add_player(kind.as_str(), kind.build(Arc::clone(&cache), factor, seed));
    }
    print!("{}", referee.play(rounds, edges));
}

fn cmd_generate(args: &[String]) {
    let mut config = InstanceConfig::default();
    let mut seed = None;
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--sources" => {
                i += 1;
                config.sources = parsed(args, i, "--sources", "a number");
            }
            "--sinks" => {
                i += 1;
                config.sinks = parsed(args, i, "--sinks", "a number");
            }
            "--seed" => {
                i += 1;
                seed = Some(parsed::<u64>(args, i, "--seed", "a number"));
            }
            "--output" => {
                i += 1;
                output_path = Some(value(args, i, "--output", "a file path").to_string());
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let network = generate_instance(&config, &mut rng);
    let title = format!("GENERATED {}x{}", config.sources, config.sinks);

    let mut text = Vec::new();
    if let Err(e) = write_instance(&network, &title, &mut text) {
        eprintln!("Error rendering instance: {}", e);
        process::exit(1);
    }

    if let Some(path) = output_path {
        fs::write(&path, &text).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!(
            "Generated {} edges, total supply {} → {}",
            network.edge_count(),
            network.total_supply(),
            path
        );
    } else {
        print!("{}", String::from_utf8_lossy(&text));
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "play" => cmd_play(rest),
        "bid" => cmd_bid(rest),
        "solve" => cmd_solve(rest),
        "simulate" => cmd_simulate(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
