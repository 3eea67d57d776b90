use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::cards::{full_deck, Card};
use crate::errors::GameError;

/// Draw pile. The top of the deck is the end of the vector.
#[derive(Debug)]
pub struct Deck {
    cards: Vec<Card>,
    rng: ChaCha20Rng,
}

impl Deck {
    pub fn new_with_seed(seed: u64) -> Self {
        let rng = ChaCha20Rng::seed_from_u64(seed);
        // Keep initial order until shuffle is called explicitly
        Self {
            cards: full_deck(),
            rng,
        }
    }

    pub fn new() -> Self {
        Self {
            cards: full_deck(),
            rng: ChaCha20Rng::from_os_rng(),
        }
    }

    /// Deck in a fixed order; the first card of `cards` is drawn first.
    pub fn stacked(mut cards: Vec<Card>) -> Self {
        cards.reverse();
        Self {
            cards,
            rng: ChaCha20Rng::seed_from_u64(0),
        }
    }

    /// Full 52-card deck whose first draws have the given values, in order.
    /// The rest follows in value order.
    pub fn stacked_from_values(top: &[u8]) -> Result<Self, GameError> {
        let mut rest = full_deck();
        let mut ordered = Vec::with_capacity(rest.len());
        for &value in top {
            let index = rest
                .iter()
                .position(|c| c.value() == value)
                .ok_or(GameError::InvalidCardValue(value))?;
            ordered.push(rest.remove(index));
        }
        ordered.append(&mut rest);
        Ok(Self::stacked(ordered))
    }

    pub fn shuffle(&mut self) {
        self.cards.shuffle(&mut self.rng);
    }

    pub fn draw(&mut self) -> Result<Card, GameError> {
        self.cards.pop().ok_or(GameError::EmptyDeck)
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

/// Face-up pile. Only the top card matters for play, every card in it is public.
#[derive(Debug, Default)]
pub struct DiscardPile {
    cards: Vec<Card>,
}

impl DiscardPile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a card and makes it publicly visible. Private knowledge is dropped.
    pub fn add(&mut self, mut card: Card) {
        card.facts_mut().reset_for_discard();
        self.cards.push(card);
    }

    pub fn peek_top(&self) -> Result<&Card, GameError> {
        self.cards.last().ok_or(GameError::EmptyPile)
    }

    pub fn take_top(&mut self) -> Result<Card, GameError> {
        self.cards.pop().ok_or(GameError::EmptyPile)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn values(&self) -> Vec<u8> {
        self.cards.iter().map(Card::value).collect()
    }
}
