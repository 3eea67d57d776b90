//! Baseline computer player.
//!
//! Provides a simple greedy opponent that can be used for testing and for
//! filling empty seats. It only uses what its table view shows it, so it plays
//! by the same information rules as a human.

use kabo_engine::errors::GameError;
use kabo_engine::protocol::{
    Agent, CardUse, DecisionKind, DrawnCard, SpyTarget, SwapTarget, TurnAction,
};
use kabo_engine::view::{CardView, PlayerView, TableView};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Calls KABO when the estimated hand sum is at most this.
pub const KABO_THRESHOLD: u32 = 5;
/// Value assumed for a card the player has not seen.
pub const UNKNOWN_CARD_ESTIMATE: u32 = 6;
/// Highest discard value worth taking.
pub const DISCARD_TAKE_LIMIT: u8 = 4;
/// Drawn cards at or below this are always kept.
pub const ALWAYS_KEEP_LIMIT: u8 = 3;

/// Greedy computer player.
///
/// # Strategy
///
/// - Calls KABO once the estimated hand sum drops to [`KABO_THRESHOLD`]
/// - Takes a low discard (at most [`DISCARD_TAKE_LIMIT`]) that beats its highest known card
/// - Always uses a drawn card's effect
/// - Keeps drawn cards below the average of its known cards, or at most [`ALWAYS_KEEP_LIMIT`]
/// - Replaces its highest known card, or a random one when it knows nothing
///
/// # Example
///
/// ```rust
/// use kabo_ai::baseline::BaselineAI;
/// use kabo_engine::protocol::Agent;
///
/// let ai = BaselineAI::new("CPU");
/// assert_eq!(ai.name(), "CPU");
/// ```
#[derive(Debug, Clone)]
pub struct BaselineAI {
    name: String,
    rng: StdRng,
}

impl BaselineAI {
    /// Create a baseline player seeded from OS entropy.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_rng(name, StdRng::from_os_rng())
    }

    /// Create a baseline player with a fixed seed for reproducible games.
    pub fn with_seed(name: impl Into<String>, seed: u64) -> Self {
        Self::with_rng(name, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(name: impl Into<String>, rng: StdRng) -> Self {
        Self {
            name: name.into(),
            rng,
        }
    }

    fn own_cards(view: &TableView) -> &[CardView] {
        view.me().map(|p| p.cards.as_slice()).unwrap_or(&[])
    }

    /// Position of the highest card the player can see in its own hand.
    fn highest_known(cards: &[CardView]) -> Option<(usize, u8)> {
        cards
            .iter()
            .filter_map(|c| c.value.map(|v| (c.position, v)))
            .fold(None, |best, (position, value)| match best {
                Some((_, top)) if top >= value => best,
                _ => Some((position, value)),
            })
    }

    fn average_known(cards: &[CardView]) -> Option<f32> {
        let known: Vec<u8> = cards.iter().filter_map(|c| c.value).collect();
        if known.is_empty() {
            return None;
        }
        let total: u32 = known.iter().map(|&v| u32::from(v)).sum();
        Some(total as f32 / known.len() as f32)
    }

    fn random_opponent<'v>(&mut self, view: &'v TableView) -> Option<&'v PlayerView> {
        let opponents: Vec<&PlayerView> = view.opponents().collect();
        opponents.choose(&mut self.rng).copied()
    }

    fn random_position(&mut self, size: usize) -> usize {
        if size == 0 { 0 } else { self.rng.random_range(0..size) }
    }
}

impl Default for BaselineAI {
    fn default() -> Self {
        Self::new("BaselineAI")
    }
}

impl Agent for BaselineAI {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_turn_action(&mut self, view: &TableView) -> Result<TurnAction, GameError> {
        let cards = Self::own_cards(view);
        let estimated = view
            .me()
            .map(|me| me.estimated_sum(UNKNOWN_CARD_ESTIMATE))
            .unwrap_or(u32::MAX);
        if !view.kabo_called && estimated <= KABO_THRESHOLD {
            debug!(player = %self.name, estimated, "calling KABO");
            return Ok(TurnAction::CallKabo);
        }
        if let (Some(top), Some((_, highest))) = (view.discard_top, Self::highest_known(cards)) {
            if top < highest && top <= DISCARD_TAKE_LIMIT {
                return Ok(TurnAction::TakeFromDiscard);
            }
        }
        Ok(TurnAction::DrawFromDeck)
    }

    fn decide_card_use(&mut self, view: &TableView, drawn: DrawnCard) -> Result<CardUse, GameError> {
        if drawn.effect.is_some() {
            return Ok(CardUse::UseEffect);
        }
        let average = Self::average_known(Self::own_cards(view));
        if average.is_some_and(|avg| f32::from(drawn.value) < avg) || drawn.value <= ALWAYS_KEEP_LIMIT {
            return Ok(CardUse::Keep);
        }
        Ok(CardUse::Discard)
    }

    fn choose_exchange_cards(
        &mut self,
        view: &TableView,
        _drawn: DrawnCard,
    ) -> Result<Vec<usize>, GameError> {
        let cards = Self::own_cards(view);
        let position = match Self::highest_known(cards) {
            Some((position, _)) => position,
            None => self.random_position(cards.len()),
        };
        Ok(vec![position])
    }

    fn choose_new_card_slot(&mut self, view: &TableView, open: &[usize]) -> Result<usize, GameError> {
        let cards = Self::own_cards(view);
        let candidates: Vec<CardView> = open
            .iter()
            .filter_map(|&p| cards.get(p).cloned())
            .collect();
        let slot = Self::highest_known(&candidates)
            .map(|(position, _)| position)
            .or_else(|| open.first().copied())
            .unwrap_or(0);
        Ok(slot)
    }

    fn choose_peek_targets(&mut self, view: &TableView, count: usize) -> Result<Vec<usize>, GameError> {
        let cards = Self::own_cards(view);
        let mut picks: Vec<usize> = cards
            .iter()
            .filter(|c| c.value.is_none())
            .map(|c| c.position)
            .take(count)
            .collect();
        for card in cards {
            if picks.len() >= count {
                break;
            }
            if !picks.contains(&card.position) {
                picks.push(card.position);
            }
        }
        Ok(picks)
    }

    fn choose_spy_target(&mut self, view: &TableView) -> Result<SpyTarget, GameError> {
        let Some(opponent) = self.random_opponent(view) else {
            return Err(GameError::illegal(
                DecisionKind::ChooseSpyTarget,
                "no opponent to spy on",
            ));
        };
        let unseen: Vec<usize> = opponent
            .cards
            .iter()
            .filter(|c| c.value.is_none())
            .map(|c| c.position)
            .collect();
        let position = match unseen.choose(&mut self.rng) {
            Some(&position) => position,
            None => self.random_position(opponent.cards.len()),
        };
        Ok(SpyTarget {
            player: opponent.id,
            position,
        })
    }

    fn choose_swap_targets(&mut self, view: &TableView) -> Result<SwapTarget, GameError> {
        let cards = Self::own_cards(view);
        let own_position = match Self::highest_known(cards) {
            Some((position, _)) => position,
            None => self.random_position(cards.len()),
        };
        let Some(opponent) = self.random_opponent(view) else {
            return Err(GameError::illegal(
                DecisionKind::ChooseSwapTargets,
                "no opponent to swap with",
            ));
        };
        let opponent_position = self.random_position(opponent.cards.len());
        Ok(SwapTarget {
            own_position,
            opponent: opponent.id,
            opponent_position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kabo_engine::cards::Effect;
    use kabo_engine::round::RoundPhase;

    fn cards(values: &[Option<u8>]) -> Vec<CardView> {
        values
            .iter()
            .enumerate()
            .map(|(position, &value)| CardView {
                position,
                value,
                publicly_visible: false,
                known: value.is_some(),
            })
            .collect()
    }

    fn view(own: &[Option<u8>], discard_top: Option<u8>) -> TableView {
        let player = |id: usize, cards: Vec<CardView>| PlayerView {
            id,
            name: format!("P{id}"),
            score: 0,
            called_kabo: false,
            cards,
        };
        TableView {
            viewer: Some(0),
            round: 1,
            phase: RoundPhase::AwaitingTurn,
            players: vec![
                player(0, cards(own)),
                player(1, cards(&[None, Some(5), None, None])),
            ],
            discard_top,
            discard_size: 1,
            deck_remaining: 40,
            drawn: None,
            current_player: Some(0),
            kabo_called: false,
            kabo_caller: None,
            countdown: None,
            log: String::new(),
        }
    }

    fn drawn(value: u8, effect: Option<Effect>) -> DrawnCard {
        DrawnCard { value, effect }
    }

    #[test]
    fn test_calls_kabo_with_low_estimate() {
        let mut ai = BaselineAI::with_seed("CPU", 1);
        let v = view(&[Some(0), Some(1), Some(2), Some(2)], Some(9));
        assert_eq!(ai.choose_turn_action(&v).unwrap(), TurnAction::CallKabo);
    }

    #[test]
    fn test_unknown_cards_count_as_average() {
        let mut ai = BaselineAI::with_seed("CPU", 1);
        let v = view(&[Some(0), Some(0), None, Some(0)], Some(9));
        assert_eq!(ai.choose_turn_action(&v).unwrap(), TurnAction::DrawFromDeck);
    }

    #[test]
    fn test_never_calls_kabo_twice() {
        let mut ai = BaselineAI::with_seed("CPU", 1);
        let mut v = view(&[Some(0), Some(1), Some(2), Some(2)], Some(9));
        v.kabo_called = true;
        v.kabo_caller = Some(1);
        assert_eq!(ai.choose_turn_action(&v).unwrap(), TurnAction::DrawFromDeck);
    }

    #[test]
    fn test_takes_low_discard_over_high_known_card() {
        let mut ai = BaselineAI::with_seed("CPU", 1);
        let v = view(&[Some(11), Some(2), None, None], Some(3));
        assert_eq!(ai.choose_turn_action(&v).unwrap(), TurnAction::TakeFromDiscard);
        let slot = ai.choose_new_card_slot(&v, &[0, 1, 2, 3]).unwrap();
        assert_eq!(slot, 0);

        let high_discard = view(&[Some(11), Some(2), None, None], Some(6));
        assert_eq!(ai.choose_turn_action(&high_discard).unwrap(), TurnAction::DrawFromDeck);
    }

    #[test]
    fn test_card_use() {
        let mut ai = BaselineAI::with_seed("CPU", 1);
        let v = view(&[Some(10), Some(8), None, None], None);
        assert_eq!(ai.decide_card_use(&v, drawn(11, Some(Effect::Swap))).unwrap(), CardUse::UseEffect);
        assert_eq!(ai.decide_card_use(&v, drawn(6, None)).unwrap(), CardUse::Keep);
        assert_eq!(ai.decide_card_use(&v, drawn(13, None)).unwrap(), CardUse::Discard);

        let unknown = view(&[None, None, None, None], None);
        assert_eq!(ai.decide_card_use(&unknown, drawn(3, None)).unwrap(), CardUse::Keep);
        assert_eq!(ai.decide_card_use(&unknown, drawn(5, None)).unwrap(), CardUse::Discard);
    }

    #[test]
    fn test_exchanges_highest_known_card() {
        let mut ai = BaselineAI::with_seed("CPU", 1);
        let v = view(&[Some(4), Some(9), None, Some(9)], None);
        assert_eq!(ai.choose_exchange_cards(&v, drawn(1, None)).unwrap(), vec![1]);

        let unknown = view(&[None, None, None, None], None);
        let picked = ai.choose_exchange_cards(&unknown, drawn(1, None)).unwrap();
        assert_eq!(picked.len(), 1);
        assert!(picked[0] < 4);
    }

    #[test]
    fn test_peeks_unknown_cards_first() {
        let mut ai = BaselineAI::with_seed("CPU", 1);
        let v = view(&[Some(4), None, Some(2), None], None);
        assert_eq!(ai.choose_peek_targets(&v, 2).unwrap(), vec![1, 3]);
        assert_eq!(ai.choose_peek_targets(&v, 3).unwrap(), vec![1, 3, 0]);
    }

    #[test]
    fn test_spies_a_card_it_cannot_see() {
        let mut ai = BaselineAI::with_seed("CPU", 3);
        let v = view(&[None, None, None, None], None);
        for _ in 0..20 {
            let target = ai.choose_spy_target(&v).unwrap();
            assert_eq!(target.player, 1);
            assert_ne!(target.position, 1, "position 1 is already visible");
        }
    }

    #[test]
    fn test_swaps_highest_known_card_away() {
        let mut ai = BaselineAI::with_seed("CPU", 3);
        let v = view(&[Some(1), Some(12), None, None], None);
        let target = ai.choose_swap_targets(&v).unwrap();
        assert_eq!(target.own_position, 1);
        assert_eq!(target.opponent, 1);
        assert!(target.opponent_position < 4);
    }
}
