// Tree of Life musical system generator, CLI entry point.
//
// Solves a note assignment for one world, appends it to the JSON store keyed
// by its generated name, and prints the Tree-Triad summary.
//
// Usage:
//   cargo run -p tree_of_life_music --bin generate -- generate [WORLD]
//     [--store PATH] [--seed N] [--max-attempts N] [--dry-run]
//   cargo run -p tree_of_life_music --bin generate -- list [--store PATH]
//
// Worlds: Assiah (default), Yetzirah, Atziluth, Briah

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::process::ExitCode;
use std::time::SystemTime;
use tracing::warn;
use tree_of_life_music::solver::{SolverConfig, solve};
use tree_of_life_music::system::{DEFAULT_STORE_PATH, SystemStore, iso_date};
use tree_of_life_music::world::WorldName;

#[derive(Parser)]
#[command(name = "generate", about = "Generate Tree of Life musical systems")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve a new system for a world and store it
    Generate {
        /// Assiah, Yetzirah, Atziluth or Briah
        world: Option<String>,

        /// JSON store to append to
        #[arg(short, long, default_value = DEFAULT_STORE_PATH)]
        store: String,

        /// Fix the search for a reproducible system
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, default_value_t = SolverConfig::default().max_attempts)]
        max_attempts: usize,

        /// Print the system without writing the store
        #[arg(long)]
        dry_run: bool,
    },
    /// List the systems in the store
    List {
        #[arg(short, long, default_value = DEFAULT_STORE_PATH)]
        store: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Generate {
            world,
            store,
            seed,
            max_attempts,
            dry_run,
        } => generate(world.as_deref(), &store, seed, max_attempts, dry_run),
        Command::List { store } => list(&store),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error generating system: {e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_world(arg: Option<&str>) -> WorldName {
    match arg {
        None => WorldName::Assiah,
        Some(name) => name.parse().unwrap_or_else(|_| {
            warn!(world = name, "unrecognized world, using Assiah");
            WorldName::Assiah
        }),
    }
}

fn generate(
    world_arg: Option<&str>,
    store_path: &str,
    seed: Option<u64>,
    max_attempts: usize,
    dry_run: bool,
) -> tree_of_life_music::Result<()> {
    let world = parse_world(world_arg);
    println!("Generating hybrid system for world: {world}...");

    let config = SolverConfig {
        max_attempts,
        ..SolverConfig::default()
    };
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };
    let solution = solve(world, &config, &mut rng)?;
    let system = solution.to_system(&iso_date(SystemTime::now()));
    system.verify(&world.world(), config.min_distinct_triads)?;

    if dry_run {
        println!("{}", serde_json::to_string_pretty(&system)?);
    } else {
        let store = SystemStore::new(store_path);
        store.append(&system)?;
        println!("Success! Generated {}", system.system);
        println!("Added to {}", store.path().display());
    }

    println!();
    println!("Triads Generated:");
    for chord in system.chords.iter().filter(|c| c.chord.contains("Triad")) {
        let tones: Vec<String> = chord.chord_tones.iter().map(|n| n.to_string()).collect();
        println!(
            "- {} {:?}: {} ({})",
            chord.chord,
            chord.path_numbers,
            chord.chord_name,
            tones.join(", ")
        );
    }
    println!(
        "Score {} after {} attempt(s), seed {}",
        solution.score, solution.attempts, solution.seed
    );
    Ok(())
}

fn list(store_path: &str) -> tree_of_life_music::Result<()> {
    let store = SystemStore::new(store_path);
    let names = store.names()?;
    if names.is_empty() {
        println!("No systems in {}", store.path().display());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}
