//! Computer players for rooms.
//!
//! Wraps [`kabo_ai::create_ai`] and falls back to the baseline player for
//! unknown kinds, so a misconfigured room degrades instead of failing.

use kabo_engine::protocol::Agent;

pub use kabo_ai::AI_KINDS;

/// Creates a computer player named `name`.
///
/// # Example
/// ```
/// use kabo_web::ai::create_ai;
///
/// let ai = create_ai("no-such-kind", "AI1", Some(7));
/// assert_eq!(ai.name(), "AI1");
/// ```
pub fn create_ai(kind: &str, name: &str, seed: Option<u64>) -> Box<dyn Agent + Send> {
    match kabo_ai::create_ai(kind, name, seed) {
        Some(ai) => ai,
        None => {
            tracing::warn!(kind, "unknown ai kind, using baseline");
            baseline(name, seed)
        }
    }
}

fn baseline(name: &str, seed: Option<u64>) -> Box<dyn Agent + Send> {
    match seed {
        Some(seed) => Box::new(kabo_ai::baseline::BaselineAI::with_seed(name, seed)),
        None => Box::new(kabo_ai::baseline::BaselineAI::new(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kabo_engine::player::AgentKind;

    #[test]
    fn known_kinds_are_created() {
        for kind in AI_KINDS {
            let ai = create_ai(kind, "AI1", Some(1));
            assert_eq!(ai.name(), "AI1");
            assert_eq!(ai.kind(), AgentKind::Ai);
        }
    }

    #[test]
    fn unknown_kind_falls_back_to_baseline() {
        let ai = create_ai("custom_strategy", "AI2", None);
        assert_eq!(ai.name(), "AI2");
    }

    #[test]
    fn computer_players_can_move_to_a_game_thread() {
        fn assert_send<T: Send>(_: &T) {}
        assert_send(&create_ai("baseline", "AI1", None));
    }
}
