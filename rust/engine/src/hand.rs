use serde::{Deserialize, Serialize};

use crate::cards::Card;

/// Ordered card slots held by one player. Cards are addressed by position only.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Card> {
        self.cards.get(position)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn values(&self) -> Vec<u8> {
        self.cards.iter().map(Card::value).collect()
    }

    pub fn sum(&self) -> u32 {
        self.cards.iter().map(|c| c.value() as u32).sum()
    }

    /// Exactly two 12s and two 13s.
    pub fn is_kamikadze(&self) -> bool {
        let mut values = self.values();
        values.sort_unstable();
        values == [12, 12, 13, 13]
    }

    pub(crate) fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub(crate) fn get_mut(&mut self, position: usize) -> Option<&mut Card> {
        self.cards.get_mut(position)
    }

    pub(crate) fn reveal_all(&mut self) {
        for card in &mut self.cards {
            card.facts_mut().publicly_visible = true;
        }
    }

    /// Puts `card` at `position` and hands back the card that was there.
    /// Callers validate the position first.
    pub(crate) fn replace(&mut self, position: usize, card: Card) -> Card {
        std::mem::replace(&mut self.cards[position], card)
    }

    /// Removes the cards at `positions` (distinct, in range) and returns them
    /// in ascending position order.
    pub(crate) fn take_many(&mut self, positions: &[usize]) -> Vec<Card> {
        let mut sorted = positions.to_vec();
        sorted.sort_unstable();
        let mut taken: Vec<Card> = sorted
            .iter()
            .rev()
            .map(|&p| self.cards.remove(p))
            .collect();
        taken.reverse();
        taken
    }

    pub(crate) fn insert(&mut self, position: usize, card: Card) {
        let at = position.min(self.cards.len());
        self.cards.insert(at, card);
    }
}
