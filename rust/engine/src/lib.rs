//! # kabo-engine: Kabo Card Game Core
//!
//! A deterministic engine for the Kabo (Cabo) card game for 2 to 4 players.
//! The engine runs rounds synchronously and asks pluggable agents for every
//! decision, so the same game logic drives terminal, AI, web and networked
//! players without knowing which is which.
//!
//! ## Core Modules
//!
//! - [`cards`] - Card values, effects and per-card visibility facts
//! - [`deck`] - Seeded draw pile and the face-up discard pile
//! - [`hand`] - Ordered card slots of one player
//! - [`rules`] - Configurable constants, decision validation and scoring
//! - [`protocol`] - The [`protocol::Agent`] trait and decision wire messages
//! - [`view`] - Per-viewer redacted table snapshots
//! - [`round`] - The round state machine
//! - [`game`] - Round sequencing, cumulative scores and the target rule
//! - [`logger`] - RoundRecord serialization to JSONL
//! - [`errors`] - Error types for game operations
//!
//! ## Quick Start
//!
//! ```rust
//! use kabo_engine::cards::{effect_of, Effect};
//! use kabo_engine::rules::{score_round, Rules};
//!
//! assert_eq!(effect_of(9), Some(Effect::Spy));
//!
//! // Player 0 called KABO with 3 points but player 2 holds only 2
//! let scores = score_round(&[3, 5, 2], Some(0), &Rules::default());
//! assert_eq!(scores, vec![13, 5, 2]);
//! ```
//!
//! ## Deterministic Gameplay
//!
//! All deals are reproducible using seeded RNG:
//!
//! ```rust
//! use kabo_engine::deck::Deck;
//!
//! let mut deck1 = Deck::new_with_seed(42);
//! let mut deck2 = Deck::new_with_seed(42);
//! deck1.shuffle();
//! deck2.shuffle();
//! assert_eq!(deck1.draw().map(|c| c.value()), deck2.draw().map(|c| c.value()));
//! ```

pub mod cards;
pub mod deck;
pub mod errors;
pub mod game;
pub mod hand;
pub mod logger;
pub mod player;
pub mod protocol;
pub mod round;
pub mod rules;
pub mod view;
