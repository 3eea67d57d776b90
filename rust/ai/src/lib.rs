//! # kabo-ai: Computer Players for Kabo
//!
//! Agents that answer every decision of the Kabo player protocol without a
//! human behind them. They implement [`kabo_engine::protocol::Agent`] directly,
//! so a round cannot tell them apart from terminal or network players.
//!
//! ## Core Components
//!
//! - [`baseline`] - Greedy strategy that tracks the values it has seen
//! - [`random`] - Uniformly random legal moves, useful for fuzzing the engine
//! - [`create_ai`] - Factory function for creating computer players by kind
//!
//! ## Quick Start
//!
//! ```rust
//! use kabo_ai::create_ai;
//! use kabo_engine::game::{Game, GameConfig};
//! use kabo_engine::protocol::Agent;
//!
//! let agents: Vec<Box<dyn Agent>> = vec![
//!     create_ai("baseline", "Ada", Some(1)).expect("known kind"),
//!     create_ai("random", "Bob", Some(2)).expect("known kind"),
//! ]
//! .into_iter()
//! .map(|ai| ai as Box<dyn Agent>)
//! .collect();
//! let config = GameConfig { seed: Some(42), ..GameConfig::default() };
//! let mut game = Game::new(config, agents).expect("valid game");
//! let summary = game.play().expect("game finishes");
//! assert!(!summary.losers.is_empty());
//! ```
//!
//! ## AI Kinds
//!
//! - `"baseline"` - [`baseline::BaselineAI`]
//! - `"random"` - [`random::RandomAI`]

use kabo_engine::protocol::Agent;
use rand::SeedableRng;
use rand::rngs::StdRng;

pub mod baseline;
pub mod random;

/// Kinds accepted by [`create_ai`].
pub const AI_KINDS: &[&str] = &["baseline", "random"];

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Factory function to create a computer player by kind.
///
/// # Arguments
///
/// * `kind` - AI kind, one of [`AI_KINDS`]
/// * `name` - Seat name the agent reports
/// * `seed` - Seed for the agent's own random choices; `None` uses OS entropy
///
/// # Returns
///
/// `None` for an unknown kind.
///
/// # Example
///
/// ```rust
/// use kabo_ai::create_ai;
///
/// let ai = create_ai("baseline", "CPU", Some(7)).expect("known kind");
/// assert_eq!(ai.name(), "CPU");
/// assert!(create_ai("minimax", "CPU", None).is_none());
/// ```
pub fn create_ai(kind: &str, name: &str, seed: Option<u64>) -> Option<Box<dyn Agent + Send>> {
    match kind {
        "baseline" => Some(Box::new(baseline::BaselineAI::with_rng(name, rng_from(seed)))),
        "random" => Some(Box::new(random::RandomAI::with_rng(name, rng_from(seed)))),
        _ => None,
    }
}
