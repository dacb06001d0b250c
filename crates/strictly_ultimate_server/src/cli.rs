//! Command-line interface for strictly_ultimate.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use strictly_ultimate::{Strategy, Symbol};

/// Strictly Ultimate - ultimate tic-tac-toe server and terminal game
#[derive(Parser, Debug)]
#[command(name = "strictly_ultimate")]
#[command(about = "Ultimate tic-tac-toe with computer players", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Side chosen on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Play X (moves first)
    X,
    /// Play O
    O,
}

impl From<Side> for Symbol {
    fn from(side: Side) -> Self {
        match side {
            Side::X => Symbol::X,
            Side::O => Symbol::O,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP match server
    Serve {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Port to bind to (overrides the config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides the config)
        #[arg(long)]
        host: Option<String>,

        /// Seed for computer players (overrides the config)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Play against the computer in the terminal
    Play {
        /// Computer strategy: random, heuristic, minimax[:depth]
        #[arg(short, long, default_value = "heuristic")]
        strategy: Strategy,

        /// Your side
        #[arg(long, value_enum, default_value = "x")]
        side: Side,

        /// Seed for the computer
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Let two computer strategies play each other
    Selfplay {
        /// Strategy for X
        #[arg(short = 'x', long, default_value = "heuristic")]
        x: Strategy,

        /// Strategy for O
        #[arg(short = 'o', long, default_value = "random")]
        o: Strategy,

        /// Number of rounds
        #[arg(short, long, default_value = "10")]
        rounds: u32,

        /// Seed for both computers
        #[arg(long)]
        seed: Option<u64>,
    },
}
