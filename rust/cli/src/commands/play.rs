//! # Play Command
//!
//! Interactive Kabo against computer opponents.
//!
//! The human sits in seat 0 as a [`TerminalPlayer`] reading from the given
//! input stream; computer players fill the remaining seats. The game runs until
//! a player hits the target a second time, until `--rounds` rounds were played,
//! or until the human quits (`q` or end of input).

use crate::commands::resolve_ai_kind;
use crate::config;
use crate::error::CliError;
use crate::terminal::TerminalPlayer;
use crate::ui;
use kabo_ai::create_ai;
use kabo_engine::game::Game;
use kabo_engine::protocol::Agent;
use std::io::{BufRead, Write};

/// Options of the play command.
#[derive(Debug, Clone)]
pub struct PlayOptions {
    pub opponents: u8,
    pub ai: Option<String>,
    pub seed: Option<u64>,
    pub name: String,
    pub rounds: Option<u32>,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            opponents: 1,
            ai: None,
            seed: None,
            name: "YOU".to_string(),
            rounds: None,
        }
    }
}

/// How a terminal game stopped.
enum Ending {
    Finished,
    RoundLimit,
    Quit,
}

/// Handle the play command: interactive gameplay
///
/// # Arguments
///
/// * `options` - Opponents, AI kind, seed, player name and optional round limit
/// * `out` - Output stream for the table display and prompts
/// * `err` - Error stream for warnings and errors
/// * `stdin` - Input stream for the human's answers
///
/// # Returns
///
/// * `Ok(())` when the game ended or the player quit
/// * `Err(CliError)` on invalid options, configuration or engine errors
pub fn handle_play_command(
    options: PlayOptions,
    out: &mut dyn Write,
    err: &mut dyn Write,
    stdin: &mut dyn BufRead,
) -> Result<(), CliError> {
    let config = match config::load() {
        Ok(c) => c,
        Err(e) => {
            ui::write_error(err, &format!("Invalid configuration: {}", e))?;
            return Err(e.into());
        }
    };
    let name = options.name.trim().to_string();
    if name.is_empty() {
        ui::write_error(err, "name must not be empty")?;
        return Err(CliError::InvalidInput("name must not be empty".to_string()));
    }
    let kind = match resolve_ai_kind(options.ai, &config.ai) {
        Ok(kind) => kind,
        Err(e) => {
            ui::write_error(err, &e.to_string())?;
            return Err(e);
        }
    };
    let seed = options.seed.or(config.seed).unwrap_or_else(rand::random);

    writeln!(
        out,
        "play: opponents={} ai={} seed={}",
        options.opponents, kind, seed
    )?;

    let (ending, rounds_played) = {
        let mut agents: Vec<Box<dyn Agent + '_>> = Vec::new();
        agents.push(Box::new(TerminalPlayer::new(name, &mut *stdin, &mut *out)));
        for i in 1..=u64::from(options.opponents) {
            let ai = create_ai(&kind, &format!("CPU{}", i), Some(seed.wrapping_add(i)))
                .ok_or_else(|| CliError::InvalidInput(format!("unknown ai '{}'", kind)))?;
            agents.push(ai);
        }
        let mut game = Game::new(config.game_config(Some(seed)), agents)?;
        let ending = loop {
            if game.is_finished() {
                break Ending::Finished;
            }
            if options.rounds.is_some_and(|limit| game.rounds_played() >= limit) {
                break Ending::RoundLimit;
            }
            match game.play_round() {
                Ok(_) => {}
                Err(e) if e.is_round_fatal() => break Ending::Quit,
                Err(e) => return Err(e.into()),
            }
        };
        (ending, game.rounds_played())
    };

    match ending {
        Ending::Finished => writeln!(out, "Thanks for playing ({} rounds).", rounds_played)?,
        Ending::RoundLimit => writeln!(out, "Stopped after {} round(s).", rounds_played)?,
        Ending::Quit => {
            ui::display_warning(err, "game abandoned, the unfinished round was not scored")?;
            writeln!(out, "Quit after {} completed round(s).", rounds_played)?;
        }
    }
    Ok(())
}
