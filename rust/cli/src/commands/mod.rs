//! Command handler modules for the Kabo CLI.
//!
//! Each command is implemented in its own module file with a consistent pattern:
//!
//! - Public handler function: `pub fn handle_COMMAND_command(...) -> Result<(), CliError>`
//! - Module-private helpers: Helper functions specific to that command
//! - Dependency injection: Output streams (`&mut dyn Write`) passed as parameters
//! - Error propagation: All errors propagated via `CliError` enum

pub mod cfg;
pub mod play;
pub mod sim;

pub use cfg::handle_cfg_command;
pub use play::{PlayOptions, handle_play_command};
pub use sim::{SimOptions, handle_sim_command};

use crate::error::CliError;
use kabo_ai::AI_KINDS;

/// Resolves the AI kind from the flag or the configured default.
pub(crate) fn resolve_ai_kind(flag: Option<String>, configured: &str) -> Result<String, CliError> {
    let kind = flag.unwrap_or_else(|| configured.to_string());
    if AI_KINDS.contains(&kind.as_str()) {
        Ok(kind)
    } else {
        Err(CliError::InvalidInput(format!(
            "unknown ai '{}' (expected one of {})",
            kind,
            AI_KINDS.join(", ")
        )))
    }
}
