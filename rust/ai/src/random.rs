//! Computer player that picks uniformly among legal moves.

use kabo_engine::errors::GameError;
use kabo_engine::protocol::{
    Agent, CardUse, DecisionKind, DrawnCard, SpyTarget, SwapTarget, TurnAction,
};
use kabo_engine::view::{PlayerView, TableView};
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, index};
use rand::{Rng, SeedableRng};

/// Answers every decision with a random legal choice. Exchanges always use a
/// single card, so it never triggers the mismatch penalty.
#[derive(Debug, Clone)]
pub struct RandomAI {
    name: String,
    rng: StdRng,
}

impl RandomAI {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_rng(name, StdRng::from_os_rng())
    }

    pub fn with_seed(name: impl Into<String>, seed: u64) -> Self {
        Self::with_rng(name, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(name: impl Into<String>, rng: StdRng) -> Self {
        Self {
            name: name.into(),
            rng,
        }
    }

    fn hand_size(view: &TableView) -> usize {
        view.me().map(|p| p.cards.len()).unwrap_or(0)
    }

    fn position_in(&mut self, size: usize) -> usize {
        if size == 0 { 0 } else { self.rng.random_range(0..size) }
    }

    fn opponent<'v>(&mut self, view: &'v TableView, kind: DecisionKind) -> Result<&'v PlayerView, GameError> {
        let opponents: Vec<&PlayerView> = view.opponents().collect();
        opponents
            .choose(&mut self.rng)
            .copied()
            .ok_or_else(|| GameError::illegal(kind, "no opponents at the table"))
    }
}

impl Agent for RandomAI {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_turn_action(&mut self, view: &TableView) -> Result<TurnAction, GameError> {
        let mut options = vec![TurnAction::DrawFromDeck];
        if !view.kabo_called {
            options.push(TurnAction::CallKabo);
        }
        if view.discard_top.is_some() {
            options.push(TurnAction::TakeFromDiscard);
        }
        Ok(options
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(TurnAction::DrawFromDeck))
    }

    fn decide_card_use(&mut self, _view: &TableView, drawn: DrawnCard) -> Result<CardUse, GameError> {
        let mut options = vec![CardUse::Keep, CardUse::Discard];
        if drawn.effect.is_some() {
            options.push(CardUse::UseEffect);
        }
        Ok(options.choose(&mut self.rng).copied().unwrap_or(CardUse::Discard))
    }

    fn choose_exchange_cards(
        &mut self,
        view: &TableView,
        _drawn: DrawnCard,
    ) -> Result<Vec<usize>, GameError> {
        let size = Self::hand_size(view);
        Ok(vec![self.position_in(size)])
    }

    fn choose_new_card_slot(&mut self, _view: &TableView, open: &[usize]) -> Result<usize, GameError> {
        open.choose(&mut self.rng)
            .copied()
            .ok_or_else(|| GameError::illegal(DecisionKind::ChooseNewCardSlot, "no open slot"))
    }

    fn choose_peek_targets(&mut self, view: &TableView, count: usize) -> Result<Vec<usize>, GameError> {
        let size = Self::hand_size(view);
        if count > size {
            return Err(GameError::illegal(
                DecisionKind::ChoosePeekTargets,
                format!("cannot pick {count} cards from a hand of {size}"),
            ));
        }
        Ok(index::sample(&mut self.rng, size, count).into_vec())
    }

    fn choose_spy_target(&mut self, view: &TableView) -> Result<SpyTarget, GameError> {
        let opponent = self.opponent(view, DecisionKind::ChooseSpyTarget)?;
        Ok(SpyTarget {
            player: opponent.id,
            position: self.position_in(opponent.cards.len()),
        })
    }

    fn choose_swap_targets(&mut self, view: &TableView) -> Result<SwapTarget, GameError> {
        let own_position = self.position_in(Self::hand_size(view));
        let opponent = self.opponent(view, DecisionKind::ChooseSwapTargets)?;
        Ok(SwapTarget {
            own_position,
            opponent: opponent.id,
            opponent_position: self.position_in(opponent.cards.len()),
        })
    }
}
