//! Strictly Ultimate - Unified CLI
//!
//! Match server, terminal game and self-play runner.

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use strictly_ultimate::{Strategy, Symbol};
use strictly_ultimate_server::cli::{Cli, Command};
use strictly_ultimate_server::{MatchManager, ServerConfig, create_router, play_terminal, self_play};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve {
            config,
            port,
            host,
            seed,
        } => run_server(config, host, port, seed).await,
        Command::Play {
            strategy,
            side,
            seed,
        } => run_play(strategy, side.into(), seed),
        Command::Selfplay {
            x,
            o,
            rounds,
            seed,
        } => run_selfplay(x, o, rounds, seed),
    }
}

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

/// Run the HTTP match server
#[instrument]
async fn run_server(
    config: Option<std::path::PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    seed: Option<u64>,
) -> Result<()> {
    let config = match config {
        Some(path) => ServerConfig::from_file(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    }
    .with_address(host, port)
    .with_ai_seed(seed);

    let manager = MatchManager::new(&config);
    let app = create_router(manager);

    let listener = tokio::net::TcpListener::bind((config.host().as_str(), *config.port())).await?;
    info!(address = %listener.local_addr()?, "Server ready");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Run a terminal game against the computer
fn run_play(strategy: Strategy, side: Symbol, seed: Option<u64>) -> Result<()> {
    let mut rng = seeded(seed);
    let stdin = std::io::stdin();
    let records = play_terminal(strategy, side, stdin.lock(), std::io::stdout(), &mut rng)?;
    for record in &records {
        println!(
            "Round {}: {} ({})",
            record.round(),
            record.result_for(side),
            record.reason()
        );
    }
    Ok(())
}

/// Run computer-vs-computer rounds and print the tally
fn run_selfplay(x: Strategy, o: Strategy, rounds: u32, seed: Option<u64>) -> Result<()> {
    let mut rng = seeded(seed);
    let (tally, _) = self_play(x, o, rounds, &mut rng)?;
    println!("X ({}) wins: {}", x, tally.x_wins);
    println!("O ({}) wins: {}", o, tally.o_wins);
    println!("Draws: {}", tally.draws);
    Ok(())
}
