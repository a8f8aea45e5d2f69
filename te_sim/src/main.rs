//! Tournament simulator.
//!
//! Creates a tournament, registers generated teams, and plays every match
//! with random scores until a champion is known.

mod config;
mod sim;

use std::sync::Arc;

use anyhow::Error;
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tourney_engine::db::{Database, MemoryTournamentStore, TournamentStore};
use tourney_engine::tournament::TournamentLifecycle;

use config::{Overrides, SimConfig};
use sim::{Simulation, SimulationOutcome};

const HELP: &str = "\
Simulate an eSports tournament from registration to champion

USAGE:
  te_sim [OPTIONS]

OPTIONS:
  --format     NAME        single-elimination, double-elimination, round-robin,
                           swiss or groups  [default: env SIM_FORMAT or single-elimination]
  --teams      N           Number of teams  [default: env SIM_TEAMS or 8]
  --max-score  N           Highest score a team can reach  [default: env SIM_MAX_SCORE or 16]
  --seed       N           Seed for shuffles and scores  [default: env BRACKET_SEED or random]
  --groups     N           Groups in a group stage  [default: env BRACKET_GROUP_COUNT or 4]
  --qualifiers N           Teams advancing per group  [default: env BRACKET_QUALIFIERS_PER_GROUP or 2]
  --db-url     URL         Store the tournament in PostgreSQL  [default: env DATABASE_URL or in memory]

FLAGS:
  --json                   Print the outcome as JSON
  -h, --help               Print help information

ENVIRONMENT:
  RUST_LOG                 Log filter (e.g., info, debug)
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = Overrides {
        json: pargs.contains("--json"),
        format: pargs.opt_value_from_str("--format")?,
        teams: pargs.opt_value_from_str("--teams")?,
        max_score: pargs.opt_value_from_str("--max-score")?,
        seed: pargs.opt_value_from_str("--seed")?,
        groups: pargs.opt_value_from_str("--groups")?,
        qualifiers: pargs.opt_value_from_str("--qualifiers")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
    };

    let leftover = pargs.finish();
    if !leftover.is_empty() {
        return Err(anyhow::anyhow!("Unexpected arguments: {leftover:?}"));
    }

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::builder().format_target(false).init();

    let config = SimConfig::from_env(overrides)
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    info!(
        "Simulating {} with {} teams",
        config.format, config.teams
    );

    let outcome = match &config.database {
        Some(db_config) => {
            info!("Connecting to database: {}", db_config.database_url);
            let db = Database::new(db_config)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            db.health_check()
                .await
                .map_err(|e| anyhow::anyhow!("Database health check failed: {}", e))?;
            db.migrate()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
            info!("Database connected successfully");

            let outcome = simulate(Arc::new(db.store()), &config).await;
            db.close().await;
            outcome?
        }
        None => simulate(Arc::new(MemoryTournamentStore::new()), &config).await?,
    };

    if config.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    Ok(())
}

async fn simulate<S: TournamentStore>(
    store: Arc<S>,
    config: &SimConfig,
) -> Result<SimulationOutcome, Error> {
    // scores use their own stream so the bracket shuffle stays reproducible
    let score_rng = match config.engine.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_os_rng(),
    };

    let lifecycle = TournamentLifecycle::new(store, config.engine.clone());
    let mut simulation = Simulation::new(lifecycle, score_rng, config.max_score);
    simulation
        .run(config.format, config.teams)
        .await
        .map_err(|e| anyhow::anyhow!("Simulation failed: {}", e))
}

fn print_outcome(outcome: &SimulationOutcome) {
    println!(
        "{} (#{}) - {}",
        outcome.tournament.name, outcome.tournament.id, outcome.tournament.status
    );
    println!();

    for played in &outcome.matches {
        let group = played
            .group_name
            .as_deref()
            .map(|name| format!(" {name}"))
            .unwrap_or_default();
        println!(
            "{:<20} R{:<2}{:<9} {:>8} {:>3} - {:<3} {:<8}  winner: {}",
            played.stage.as_str(),
            played.round,
            group,
            played.team_a,
            played.score_a,
            played.score_b,
            played.team_b,
            played.winner
        );
    }

    println!();
    println!(
        "{:<4} {:<10} {:>3} {:>3} {:>3} {:>4} {:>6}",
        "#", "Team", "W", "L", "D", "Pts", "Diff"
    );
    for (position, score) in outcome.standings.iter().enumerate() {
        println!(
            "{:<4} {:<10} {:>3} {:>3} {:>3} {:>4} {:>+6}",
            position + 1,
            score.name,
            score.victories,
            score.defeats,
            score.draws,
            score.points,
            score.score_difference
        );
    }

    println!();
    match &outcome.champion {
        Some(champion) if outcome.finalized_by_ranking => {
            println!("Champion: {champion} (finalized from standings)")
        }
        Some(champion) => println!("Champion: {champion}"),
        None => println!("No champion"),
    }
}
