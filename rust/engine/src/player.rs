use serde::{Deserialize, Serialize};

use crate::hand::Hand;

/// Seat index of a player, stable for the whole game.
pub type PlayerId = usize;

/// How an agent reaches its decisions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Human,
    Ai,
    Network,
    Ui,
}

/// Identity and cumulative score of a player across rounds.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
    /// Set once the player's total was reset after hitting the target.
    pub reprieve_used: bool,
}

impl PlayerRecord {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            score: 0,
            reprieve_used: false,
        }
    }
}

/// A player as seen by one round: identity, score at round start, and hand.
#[derive(Debug, Clone)]
pub struct Seat {
    id: PlayerId,
    name: String,
    score: u32,
    pub(crate) hand: Hand,
}

impl Seat {
    pub fn new(id: PlayerId, name: impl Into<String>, score: u32) -> Self {
        Self {
            id,
            name: name.into(),
            score,
            hand: Hand::new(),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn hand(&self) -> &Hand {
        &self.hand
    }
}

impl From<&PlayerRecord> for Seat {
    fn from(record: &PlayerRecord) -> Self {
        Seat::new(record.id, record.name.clone(), record.score)
    }
}
