//! # Kabo CLI Library
//!
//! This library provides the command-line interface for the Kabo card game.
//! It exposes subcommands for playing against computer opponents, simulating
//! AI-only games and inspecting the configuration.
//!
//! ## Main Entry Point
//!
//! The primary entry point is the [`run`] function, which parses command-line arguments
//! and executes the appropriate subcommand.
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::io;
//! let args = vec!["kabo", "sim", "--games", "10", "--seed", "42"];
//! let code = kabo_cli::run(args, &mut io::stdout(), &mut io::stderr());
//! assert_eq!(code, 0);
//! ```
//!
//! ## Available Subcommands
//!
//! - `play`: Play at the terminal against computer opponents
//! - `sim`: Run AI-only games and record rounds as JSONL
//! - `cfg`: Display current configuration settings

#[macro_use]
mod macros;

use clap::Parser;
use std::io::Write;
pub mod cli;
pub mod commands;
mod config;
mod error;
pub mod exit_code;
pub mod formatters;
pub mod terminal;
pub mod ui;
pub mod validation;

use cli::{Commands, KaboCli};
use commands::{
    PlayOptions, SimOptions, handle_cfg_command, handle_play_command, handle_sim_command,
};

pub use error::CliError;

/// Main entry point for the CLI application.
///
/// Parses command-line arguments and dispatches to the appropriate subcommand handler.
///
/// # Arguments
///
/// * `args` - Iterator over command-line arguments (typically `std::env::args()`)
/// * `out` - Output stream for normal output (typically `stdout`)
/// * `err` - Output stream for error messages (typically `stderr`)
///
/// # Returns
///
/// Exit code: `0` for success, `2` for errors, `130` for interruptions
///
/// # Example
///
/// ```
/// use std::io;
/// let args = vec!["kabo", "sim", "--games", "1", "--seed", "42"];
/// let code = kabo_cli::run(args, &mut io::stdout(), &mut io::stderr());
/// assert_eq!(code, 0);
/// ```
pub fn run<I, S>(args: I, out: &mut dyn Write, err: &mut dyn Write) -> i32
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    const COMMANDS: &[&str] = &["play", "sim", "cfg"];
    let argv: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

    let cli = match KaboCli::try_parse_from(&argv) {
        Ok(cli) => cli,
        Err(e) => {
            use clap::error::ErrorKind;

            // Help and version should print to stdout and exit 0
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    if write!(out, "{}", e).is_err() {
                        return exit_code::ERROR;
                    }
                    exit_code::SUCCESS
                }
                _ => {
                    write_or_exit!(err, "{}", e);
                    write_or_exit!(err, "Kabo CLI");
                    write_or_exit!(err, "Usage: kabo <command> [options]\n");
                    write_or_exit!(err, "Commands:");
                    for c in COMMANDS {
                        write_or_exit!(err, "  {}", c);
                    }
                    write_or_exit!(err, "\nFor full help, run: kabo --help");
                    exit_code::ERROR
                }
            };
        }
    };

    let result = match cli.cmd {
        Commands::Cfg => handle_cfg_command(out, err),
        Commands::Play {
            opponents,
            ai,
            seed,
            name,
            rounds,
        } => {
            // Use stdin for real input (supports both TTY and piped stdin)
            let stdin = std::io::stdin();
            let mut stdin_lock = stdin.lock();
            let options = PlayOptions {
                opponents,
                ai,
                seed,
                name,
                rounds,
            };
            handle_play_command(options, out, err, &mut stdin_lock)
        }
        Commands::Sim {
            games,
            players,
            ai,
            seed,
            output,
        } => {
            let options = SimOptions {
                games,
                players,
                ai,
                seed,
                output,
            };
            handle_sim_command(options, out, err)
        }
    };

    match result {
        Ok(()) => exit_code::SUCCESS,
        Err(CliError::Interrupted(_)) => exit_code::INTERRUPTED,
        Err(e) => {
            write_or_exit!(err, "Error: {}", e);
            exit_code::ERROR
        }
    }
}
