use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::GameError;
use crate::player::PlayerId;

/// Highest card value in the deck.
pub const MAX_CARD_VALUE: u8 = 13;

/// Number of copies of each value, indexed by value.
pub const CARD_AMOUNTS: [usize; 14] = [2, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 2];

/// Stable identity of one physical card. Assigned once when the 52 cards are built.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CardId(pub u8);

/// Action a card grants when it is discarded for its effect.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Look at one of your own cards.
    Peek,
    /// Look at one opponent card.
    Spy,
    /// Blindly exchange one own card with one opponent card.
    Swap,
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Peek => f.write_str("PEEK"),
            Effect::Spy => f.write_str("SPY"),
            Effect::Swap => f.write_str("SWAP"),
        }
    }
}

pub fn effect_of(value: u8) -> Option<Effect> {
    match value {
        7 | 8 => Some(Effect::Peek),
        9 | 10 => Some(Effect::Spy),
        11 | 12 => Some(Effect::Swap),
        _ => None,
    }
}

/// Who may see a card's value.
///
/// The three facts are independent: a publicly visible card may also be
/// remembered by its owner, and several opponents may have spied on it.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Visibility {
    pub publicly_visible: bool,
    pub known_to_owner: bool,
    pub known_to_others: BTreeSet<PlayerId>,
}

impl Visibility {
    /// Can `viewer` see a card held by `owner`? `None` as viewer is a spectator,
    /// `None` as owner is a card lying in the deck or the discard pile.
    pub fn visible_to(&self, viewer: Option<PlayerId>, owner: Option<PlayerId>) -> bool {
        if self.publicly_visible {
            return true;
        }
        match viewer {
            Some(v) if owner == Some(v) => self.known_to_owner,
            Some(v) => self.known_to_others.contains(&v),
            None => false,
        }
    }

    pub(crate) fn reset_for_discard(&mut self) {
        self.publicly_visible = true;
        self.known_to_owner = false;
        self.known_to_others.clear();
    }

    /// Moves knowledge between the two swap participants. Third-party entries are dropped.
    pub(crate) fn transfer(&mut self, from: PlayerId, to: PlayerId) {
        let old_owner_knew = self.known_to_owner;
        let new_owner_knew = self.known_to_others.contains(&to);
        self.known_to_others.clear();
        self.known_to_owner = new_owner_knew;
        if old_owner_knew {
            self.known_to_others.insert(from);
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Card {
    id: CardId,
    value: u8,
    facts: Visibility,
}

impl Card {
    pub fn new(id: CardId, value: u8) -> Result<Self, GameError> {
        if value > MAX_CARD_VALUE {
            return Err(GameError::InvalidCardValue(value));
        }
        Ok(Self {
            id,
            value,
            facts: Visibility::default(),
        })
    }

    pub fn id(&self) -> CardId {
        self.id
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn effect(&self) -> Option<Effect> {
        effect_of(self.value)
    }

    pub fn facts(&self) -> &Visibility {
        &self.facts
    }

    pub(crate) fn facts_mut(&mut self) -> &mut Visibility {
        &mut self.facts
    }
}

/// All 52 cards in value order with ids 0..52 and no visibility facts.
pub fn full_deck() -> Vec<Card> {
    let mut cards = Vec::with_capacity(52);
    let mut next_id = 0u8;
    for (value, &amount) in CARD_AMOUNTS.iter().enumerate() {
        for _ in 0..amount {
            cards.push(Card {
                id: CardId(next_id),
                value: value as u8,
                facts: Visibility::default(),
            });
            next_id += 1;
        }
    }
    cards
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_table_matches_values() {
        assert_eq!(effect_of(6), None);
        assert_eq!(effect_of(7), Some(Effect::Peek));
        assert_eq!(effect_of(8), Some(Effect::Peek));
        assert_eq!(effect_of(9), Some(Effect::Spy));
        assert_eq!(effect_of(10), Some(Effect::Spy));
        assert_eq!(effect_of(11), Some(Effect::Swap));
        assert_eq!(effect_of(12), Some(Effect::Swap));
        assert_eq!(effect_of(13), None);
        assert_eq!(effect_of(0), None);
    }

    #[test]
    fn full_deck_has_expected_distribution() {
        let deck = full_deck();
        assert_eq!(deck.len(), 52);
        for value in 0..=MAX_CARD_VALUE {
            let count = deck.iter().filter(|c| c.value() == value).count();
            assert_eq!(count, CARD_AMOUNTS[value as usize], "value {value}");
        }
        let ids: BTreeSet<CardId> = deck.iter().map(Card::id).collect();
        assert_eq!(ids.len(), 52);
    }

    #[test]
    fn rejects_out_of_range_value() {
        assert_eq!(
            Card::new(CardId(0), 14),
            Err(GameError::InvalidCardValue(14))
        );
    }

    #[test]
    fn visibility_facts_are_independent() {
        let mut facts = Visibility::default();
        assert!(!facts.visible_to(Some(0), Some(0)));

        facts.known_to_owner = true;
        assert!(facts.visible_to(Some(0), Some(0)));
        assert!(!facts.visible_to(Some(1), Some(0)));

        facts.known_to_others.insert(2);
        assert!(facts.visible_to(Some(2), Some(0)));
        assert!(!facts.visible_to(None, Some(0)));

        facts.publicly_visible = true;
        assert!(facts.visible_to(None, Some(0)));
        assert!(facts.visible_to(Some(1), Some(0)));
    }

    #[test]
    fn transfer_keeps_participant_knowledge_only() {
        let mut facts = Visibility {
            publicly_visible: false,
            known_to_owner: true,
            known_to_others: [1, 2].into_iter().collect(),
        };
        facts.transfer(0, 1);
        assert!(facts.known_to_owner, "new owner had spied the card");
        assert_eq!(facts.known_to_others, [0].into_iter().collect());
    }
}
