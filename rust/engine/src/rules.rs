use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::GameError;
use crate::player::PlayerId;
use crate::protocol::{CardUse, DecisionKind, DrawnCard, SpyTarget, SwapTarget, TurnAction};

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;

/// Tunable constants of a game. Overridden as a whole, never per field at runtime.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    pub cards_per_player: usize,
    pub number_of_cards_to_see: usize,
    pub kabo_malus: u32,
    pub kamikadze_penalty: u32,
    pub target_point_value: u32,
    pub point_value_after_hitting_target: u32,
    /// Cards a Peek effect lets the player look at.
    pub effect_peek_count: usize,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            cards_per_player: 4,
            number_of_cards_to_see: 2,
            kabo_malus: 10,
            kamikadze_penalty: 50,
            target_point_value: 100,
            point_value_after_hitting_target: 50,
            effect_peek_count: 1,
        }
    }
}

impl Rules {
    pub fn validate(&self) -> Result<(), GameError> {
        if self.cards_per_player == 0 {
            return Err(GameError::InvalidRules(
                "cards_per_player must be at least 1".to_string(),
            ));
        }
        // Every seat plus the discard seed must come out of 52 cards.
        if self.cards_per_player * MAX_PLAYERS + 1 > 52 {
            return Err(GameError::InvalidRules(format!(
                "cards_per_player {} does not fit {} players in one deck",
                self.cards_per_player, MAX_PLAYERS
            )));
        }
        if self.number_of_cards_to_see > self.cards_per_player {
            return Err(GameError::InvalidRules(format!(
                "number_of_cards_to_see {} exceeds cards_per_player {}",
                self.number_of_cards_to_see, self.cards_per_player
            )));
        }
        if self.effect_peek_count == 0 || self.effect_peek_count > self.cards_per_player {
            return Err(GameError::InvalidRules(format!(
                "effect_peek_count must be between 1 and {}",
                self.cards_per_player
            )));
        }
        if self.point_value_after_hitting_target >= self.target_point_value {
            return Err(GameError::InvalidRules(format!(
                "point_value_after_hitting_target {} must be below target_point_value {}",
                self.point_value_after_hitting_target, self.target_point_value
            )));
        }
        Ok(())
    }
}

pub fn validate_player_count(count: usize) -> Result<(), GameError> {
    if (MIN_PLAYERS..=MAX_PLAYERS).contains(&count) {
        Ok(())
    } else {
        Err(GameError::InvalidPlayerCount(count))
    }
}

/// What the engine does after an illegal answer.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum IllegalDecisionPolicy {
    /// Ask again, up to `max_attempts` answers in total, then forfeit.
    Retry { max_attempts: u32 },
    /// Forfeit on the first illegal answer.
    Forfeit,
}

impl Default for IllegalDecisionPolicy {
    fn default() -> Self {
        IllegalDecisionPolicy::Retry { max_attempts: 3 }
    }
}

impl IllegalDecisionPolicy {
    pub fn attempts(&self) -> u32 {
        match self {
            IllegalDecisionPolicy::Retry { max_attempts } => (*max_attempts).max(1),
            IllegalDecisionPolicy::Forfeit => 1,
        }
    }
}

pub fn validate_turn_action(
    action: TurnAction,
    kabo_called: bool,
    discard_empty: bool,
) -> Result<(), GameError> {
    match action {
        TurnAction::CallKabo if kabo_called => Err(GameError::illegal(
            DecisionKind::ChooseTurnAction,
            "KABO was already called this round",
        )),
        TurnAction::TakeFromDiscard if discard_empty => Err(GameError::illegal(
            DecisionKind::ChooseTurnAction,
            "the discard pile is empty",
        )),
        _ => Ok(()),
    }
}

pub fn validate_card_use(card_use: CardUse, drawn: DrawnCard) -> Result<(), GameError> {
    if card_use == CardUse::UseEffect && drawn.effect.is_none() {
        return Err(GameError::illegal(
            DecisionKind::DecideCardUse,
            format!("a {} has no effect", drawn.value),
        ));
    }
    Ok(())
}

fn check_positions(
    kind: DecisionKind,
    positions: &[usize],
    hand_size: usize,
) -> Result<(), GameError> {
    let mut seen = BTreeSet::new();
    for &p in positions {
        if p >= hand_size {
            return Err(GameError::illegal(
                kind,
                format!("position {p} is outside a hand of {hand_size}"),
            ));
        }
        if !seen.insert(p) {
            return Err(GameError::illegal(kind, format!("position {p} chosen twice")));
        }
    }
    Ok(())
}

/// Checks shape only. Whether the values match is decided by the exchange itself.
pub fn validate_exchange(positions: &[usize], hand_size: usize) -> Result<(), GameError> {
    if positions.is_empty() {
        return Err(GameError::illegal(
            DecisionKind::ChooseExchangeCards,
            "select at least one card",
        ));
    }
    check_positions(DecisionKind::ChooseExchangeCards, positions, hand_size)
}

pub fn validate_new_card_slot(slot: usize, open: &[usize]) -> Result<(), GameError> {
    if open.contains(&slot) {
        Ok(())
    } else {
        Err(GameError::illegal(
            DecisionKind::ChooseNewCardSlot,
            format!("position {slot} is not one of {open:?}"),
        ))
    }
}

pub fn validate_peek(positions: &[usize], count: usize, hand_size: usize) -> Result<(), GameError> {
    if positions.len() != count {
        return Err(GameError::illegal(
            DecisionKind::ChoosePeekTargets,
            format!("expected {count} positions, got {}", positions.len()),
        ));
    }
    check_positions(DecisionKind::ChoosePeekTargets, positions, hand_size)
}

/// `hand_sizes` is indexed by player id.
pub fn validate_spy(
    target: SpyTarget,
    actor: PlayerId,
    hand_sizes: &[usize],
) -> Result<(), GameError> {
    let kind = DecisionKind::ChooseSpyTarget;
    if target.player == actor {
        return Err(GameError::illegal(kind, "cannot spy on yourself"));
    }
    let Some(&size) = hand_sizes.get(target.player) else {
        return Err(GameError::illegal(
            kind,
            format!("no player {}", target.player),
        ));
    };
    if target.position >= size {
        return Err(GameError::illegal(
            kind,
            format!("position {} is outside a hand of {size}", target.position),
        ));
    }
    Ok(())
}

pub fn validate_swap(
    target: SwapTarget,
    actor: PlayerId,
    hand_sizes: &[usize],
) -> Result<(), GameError> {
    let kind = DecisionKind::ChooseSwapTargets;
    if target.opponent == actor {
        return Err(GameError::illegal(kind, "cannot swap with yourself"));
    }
    let own_size = hand_sizes.get(actor).copied().unwrap_or(0);
    if target.own_position >= own_size {
        return Err(GameError::illegal(
            kind,
            format!("own position {} is outside a hand of {own_size}", target.own_position),
        ));
    }
    let Some(&size) = hand_sizes.get(target.opponent) else {
        return Err(GameError::illegal(
            kind,
            format!("no player {}", target.opponent),
        ));
    };
    if target.opponent_position >= size {
        return Err(GameError::illegal(
            kind,
            format!(
                "opponent position {} is outside a hand of {size}",
                target.opponent_position
            ),
        ));
    }
    Ok(())
}

/// Round scores from final hand sums.
///
/// The caller scores 0 only with a strictly lowest sum, otherwise sum plus the
/// malus. Everyone else scores their sum.
pub fn score_round(hand_sums: &[u32], caller: Option<PlayerId>, rules: &Rules) -> Vec<u32> {
    let mut scores = hand_sums.to_vec();
    if let Some(caller) = caller {
        if let Some(&caller_sum) = hand_sums.get(caller) {
            let strictly_lowest = hand_sums
                .iter()
                .enumerate()
                .filter(|(id, _)| *id != caller)
                .all(|(_, &sum)| caller_sum < sum);
            scores[caller] = if strictly_lowest {
                0
            } else {
                caller_sum + rules.kabo_malus
            };
        }
    }
    scores
}

pub fn kamikadze_scores(players: usize, winner: PlayerId, rules: &Rules) -> Vec<u32> {
    (0..players)
        .map(|id| if id == winner { 0 } else { rules.kamikadze_penalty })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Effect;

    #[test]
    fn default_rules_are_valid() {
        assert!(Rules::default().validate().is_ok());
    }

    #[test]
    fn reset_value_must_stay_below_target() {
        let rules = Rules {
            point_value_after_hitting_target: 100,
            ..Rules::default()
        };
        assert!(matches!(rules.validate(), Err(GameError::InvalidRules(_))));
    }

    #[test]
    fn failed_kabo_adds_malus() {
        let scores = score_round(&[3, 5, 2], Some(0), &Rules::default());
        assert_eq!(scores, vec![13, 5, 2]);
    }

    #[test]
    fn successful_kabo_scores_zero() {
        let scores = score_round(&[1, 5, 2], Some(0), &Rules::default());
        assert_eq!(scores, vec![0, 5, 2]);
    }

    #[test]
    fn kabo_tie_is_not_strictly_lowest() {
        let scores = score_round(&[2, 5, 2], Some(0), &Rules::default());
        assert_eq!(scores, vec![12, 5, 2]);
    }

    #[test]
    fn no_caller_scores_raw_sums() {
        assert_eq!(score_round(&[9, 4], None, &Rules::default()), vec![9, 4]);
    }

    #[test]
    fn scoring_is_repeatable() {
        let rules = Rules::default();
        let first = score_round(&[7, 3, 11, 3], Some(1), &rules);
        let second = score_round(&[7, 3, 11, 3], Some(1), &rules);
        assert_eq!(first, second);
    }

    #[test]
    fn kamikadze_penalises_everyone_else() {
        assert_eq!(kamikadze_scores(3, 1, &Rules::default()), vec![50, 0, 50]);
    }

    #[test]
    fn use_effect_needs_an_effect() {
        let plain = DrawnCard {
            value: 4,
            effect: None,
        };
        assert!(validate_card_use(CardUse::UseEffect, plain).is_err());
        assert!(validate_card_use(CardUse::Keep, plain).is_ok());
        let spy = DrawnCard {
            value: 9,
            effect: Some(Effect::Spy),
        };
        assert!(validate_card_use(CardUse::UseEffect, spy).is_ok());
    }

    #[test]
    fn second_kabo_is_illegal() {
        assert!(validate_turn_action(TurnAction::CallKabo, true, false).is_err());
        assert!(validate_turn_action(TurnAction::CallKabo, false, false).is_ok());
        assert!(validate_turn_action(TurnAction::TakeFromDiscard, false, true).is_err());
    }

    #[test]
    fn exchange_rejects_duplicates_and_empty_sets() {
        assert!(validate_exchange(&[], 4).is_err());
        assert!(validate_exchange(&[1, 1], 4).is_err());
        assert!(validate_exchange(&[4], 4).is_err());
        assert!(validate_exchange(&[0, 3], 4).is_ok());
    }

    #[test]
    fn peek_needs_exact_count() {
        assert!(validate_peek(&[0], 2, 4).is_err());
        assert!(validate_peek(&[0, 1], 2, 4).is_ok());
    }

    #[test]
    fn spy_and_swap_reject_self_targets() {
        let sizes = [4, 4, 5];
        assert!(validate_spy(SpyTarget { player: 0, position: 0 }, 0, &sizes).is_err());
        assert!(validate_spy(SpyTarget { player: 2, position: 4 }, 0, &sizes).is_ok());
        assert!(validate_spy(SpyTarget { player: 3, position: 0 }, 0, &sizes).is_err());
        let swap = SwapTarget {
            own_position: 0,
            opponent: 1,
            opponent_position: 3,
        };
        assert!(validate_swap(swap, 0, &sizes).is_ok());
        assert!(validate_swap(swap, 1, &sizes).is_err());
    }

    #[test]
    fn forfeit_policy_allows_one_attempt() {
        assert_eq!(IllegalDecisionPolicy::Forfeit.attempts(), 1);
        assert_eq!(IllegalDecisionPolicy::default().attempts(), 3);
        assert_eq!(
            IllegalDecisionPolicy::Retry { max_attempts: 0 }.attempts(),
            1
        );
    }
}
