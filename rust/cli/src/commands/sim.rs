//! Simulation command handler for AI-only games.
//!
//! Plays complete games between computer players and optionally records every
//! round as one JSONL line (`RoundRecord`). Per-seat results are summarised at
//! the end.
//!
//! # Environment Variables
//!
//! - `KABO_SIM_BREAK_AFTER`: Stop after N games as if interrupted (for testing)
//!
//! # Examples
//!
//! ```no_run
//! use kabo_cli::commands::sim::{handle_sim_command, SimOptions};
//! use std::io;
//!
//! let options = SimOptions {
//!     games: 100,
//!     output: Some("data/rounds.jsonl".to_string()),
//!     seed: Some(42),
//!     ..SimOptions::default()
//! };
//! handle_sim_command(options, &mut io::stdout(), &mut io::stderr()).unwrap();
//! ```

use crate::commands::resolve_ai_kind;
use crate::config;
use crate::error::CliError;
use crate::ui;
use kabo_ai::create_ai;
use kabo_engine::game::Game;
use kabo_engine::logger::{RoundLogger, RoundRecord};
use kabo_engine::protocol::Agent;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SimOptions {
    pub games: u32,
    pub players: u8,
    pub ai: Option<String>,
    pub seed: Option<u64>,
    pub output: Option<String>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            games: 1,
            players: 2,
            ai: None,
            seed: None,
            output: None,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct SeatStats {
    losses: u32,
    wins: u32,
    round_points: u64,
}

/// Handle the sim command: play `games` AI-only games.
///
/// Game `g` (0-based) is dealt with seed `base_seed + g`, so a single game can
/// be replayed by passing its seed with `--games 1`.
///
/// # Returns
///
/// `Ok(())` on success, `CliError::Interrupted` when stopped early, or another
/// `CliError` on failure
pub fn handle_sim_command(
    options: SimOptions,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), CliError> {
    if options.games == 0 {
        ui::write_error(err, "games must be >= 1")?;
        return Err(CliError::InvalidInput("games must be >= 1".to_string()));
    }
    let config = match config::load() {
        Ok(c) => c,
        Err(e) => {
            ui::write_error(err, &format!("Invalid configuration: {}", e))?;
            return Err(e.into());
        }
    };
    let kind = match resolve_ai_kind(options.ai, &config.ai) {
        Ok(kind) => kind,
        Err(e) => {
            ui::write_error(err, &e.to_string())?;
            return Err(e);
        }
    };
    let base_seed = options.seed.or(config.seed).unwrap_or_else(rand::random);

    let mut logger = match options.output.as_ref().map(PathBuf::from) {
        Some(path) => {
            if path.exists() {
                ui::display_warning(err, &format!("overwriting {}", path.display()))?;
            }
            match RoundLogger::create(&path) {
                Ok(logger) => Some(logger),
                Err(e) => {
                    ui::write_error(err, &format!("Failed to open output file: {}", e))?;
                    return Err(CliError::Io(e));
                }
            }
        }
        None => None,
    };

    let break_after = std::env::var("KABO_SIM_BREAK_AFTER")
        .ok()
        .and_then(|v| v.parse::<u32>().ok());

    writeln!(
        out,
        "sim: games={} players={} ai={} seed={}",
        options.games, options.players, kind, base_seed
    )?;

    let names: Vec<String> = (0..options.players).map(|i| format!("CPU{}", i)).collect();
    let mut stats = vec![SeatStats::default(); names.len()];
    let mut total_rounds = 0u64;

    for g in 0..options.games {
        if break_after == Some(g) {
            writeln!(err, "Interrupted: {} of {} games completed", g, options.games)?;
            return Err(CliError::Interrupted(format!("stopped after {} games", g)));
        }
        let seed = base_seed.wrapping_add(u64::from(g));
        let mut agents: Vec<Box<dyn Agent>> = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let agent_seed = seed.wrapping_mul(31).wrapping_add(i as u64);
            let ai = create_ai(&kind, name, Some(agent_seed))
                .ok_or_else(|| CliError::InvalidInput(format!("unknown ai '{}'", kind)))?;
            agents.push(ai);
        }
        let mut game = Game::new(config.game_config(Some(seed)), agents)?;

        while !game.is_finished() {
            let report = game.play_round()?;
            for (seat, score) in stats.iter_mut().zip(&report.outcome.scores) {
                seat.round_points += u64::from(*score);
            }
            if let Some(logger) = logger.as_mut() {
                let mut record = RoundRecord::from_report(logger.next_id(), names.clone(), &report);
                record.meta = Some(serde_json::json!({ "game": g + 1, "game_seed": seed }));
                logger.write(&record)?;
            }
        }

        let Some(summary) = game.summary() else {
            continue;
        };
        total_rounds += u64::from(summary.rounds_played);
        for &id in &summary.losers {
            stats[id].losses += 1;
        }
        for &id in &summary.winners {
            stats[id].wins += 1;
        }
        let losers: Vec<&str> = summary.losers.iter().map(|&id| names[id].as_str()).collect();
        writeln!(
            out,
            "Game {}: {} rounds, loser(s): {}",
            g + 1,
            summary.rounds_played,
            losers.join(", ")
        )?;
    }

    writeln!(
        out,
        "Simulated {} game(s), {} round(s)",
        options.games, total_rounds
    )?;
    for (name, seat) in names.iter().zip(&stats) {
        let average = if total_rounds == 0 {
            0.0
        } else {
            seat.round_points as f64 / total_rounds as f64
        };
        writeln!(
            out,
            "  {}: wins {} losses {} avg round score {:.2}",
            name, seat.wins, seat.losses, average
        )?;
    }
    Ok(())
}
