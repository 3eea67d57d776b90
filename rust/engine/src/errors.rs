use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::player::PlayerId;
use crate::protocol::DecisionKind;

/// Why an agent stopped answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unresponsive {
    /// No answer arrived within the decision timeout.
    TimedOut,
    /// The front end dropped its connection.
    Disconnected,
    /// A local input stream reached end of file.
    InputClosed,
}

impl std::fmt::Display for Unresponsive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Unresponsive::TimedOut => "timed out",
            Unresponsive::Disconnected => "disconnected",
            Unresponsive::InputClosed => "input closed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Illegal {kind} decision: {reason}")]
    IllegalDecision { kind: DecisionKind, reason: String },
    #[error("Deck is empty")]
    EmptyDeck,
    #[error("Discard pile is empty")]
    EmptyPile,
    #[error("Player {player} is unresponsive ({reason})")]
    AgentUnresponsive {
        player: PlayerId,
        reason: Unresponsive,
    },
    #[error("Invalid card value {0}, expected 0 to 13")]
    InvalidCardValue(u8),
    #[error("Unsupported player count {0}, expected 2 to 4")]
    InvalidPlayerCount(usize),
    #[error("Invalid rules: {0}")]
    InvalidRules(String),
    #[error("No player with id {0}")]
    UnknownPlayer(PlayerId),
    #[error("Game already finished")]
    GameFinished,
}

impl GameError {
    pub fn illegal(kind: DecisionKind, reason: impl Into<String>) -> Self {
        GameError::IllegalDecision {
            kind,
            reason: reason.into(),
        }
    }

    /// True for errors that abort the current round but leave the game usable.
    pub fn is_round_fatal(&self) -> bool {
        matches!(self, GameError::AgentUnresponsive { .. })
    }
}
