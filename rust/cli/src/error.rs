//! The one error type every CLI command returns.

use crate::config::ConfigError;
use kabo_engine::errors::GameError;
use std::fmt;

#[derive(Debug)]
pub enum CliError {
    /// Writing to stdout/stderr or the round log failed
    Io(std::io::Error),

    /// Bad flag value or unknown AI kind
    InvalidInput(String),

    Config(ConfigError),

    /// The engine refused to start or abandoned a round
    Engine(GameError),

    /// Stopped before the requested number of games
    Interrupted(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "I/O error: {}", e),
            CliError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Engine(e) => write!(f, "Engine error: {}", e),
            CliError::Interrupted(msg) => write!(f, "Interrupted: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io(e) => Some(e),
            CliError::Engine(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(error: std::io::Error) -> Self {
        CliError::Io(error)
    }
}

impl From<GameError> for CliError {
    fn from(error: GameError) -> Self {
        CliError::Engine(error)
    }
}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        CliError::Config(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kabo_engine::errors::Unresponsive;

    #[test]
    fn game_errors_keep_their_message() {
        let err: CliError = GameError::InvalidPlayerCount(5).into();
        assert_eq!(
            err.to_string(),
            "Engine error: Unsupported player count 5, expected 2 to 4"
        );
    }

    #[test]
    fn engine_errors_stay_inspectable() {
        use std::error::Error;
        let err: CliError = GameError::AgentUnresponsive {
            player: 0,
            reason: Unresponsive::InputClosed,
        }
        .into();
        assert!(matches!(
            err,
            CliError::Engine(GameError::AgentUnresponsive { .. })
        ));
        assert!(err.source().is_some());
        assert!(CliError::Interrupted("x".into()).source().is_none());
    }
}
