//! Command-line argument definitions.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "kabo",
    version,
    about = "Kabo card game: play against the computer or simulate AI games"
)]
pub struct KaboCli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a game at the terminal against computer opponents
    Play {
        /// Number of computer opponents
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
        opponents: u8,
        /// Computer player kind (defaults to the configured one)
        #[arg(long)]
        ai: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
        /// Your name at the table
        #[arg(long, default_value = "YOU")]
        name: String,
        /// Stop after this many rounds even if the game is not over
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        rounds: Option<u32>,
    },
    /// Run AI-only games and optionally record every round as JSONL
    Sim {
        #[arg(long, default_value_t = 1)]
        games: u32,
        /// Seats at the table, all computer players
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(2..=4))]
        players: u8,
        #[arg(long)]
        ai: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        output: Option<String>,
    },
    /// Display the effective configuration and where each value came from
    Cfg,
}
