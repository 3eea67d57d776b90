use serde::{Deserialize, Serialize};

use crate::player::PlayerId;
use crate::round::RoundPhase;

/// One hand slot as a viewer sees it. `value` is `None` when the viewer may not see it.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CardView {
    pub position: usize,
    pub value: Option<u8>,
    pub publicly_visible: bool,
    /// The viewer can see this card's value.
    pub known: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
    pub called_kabo: bool,
    pub cards: Vec<CardView>,
}

impl PlayerView {
    /// Sum of visible values with unknown cards counted as `unknown_estimate`.
    pub fn estimated_sum(&self, unknown_estimate: u32) -> u32 {
        self.cards
            .iter()
            .map(|c| c.value.map(u32::from).unwrap_or(unknown_estimate))
            .sum()
    }
}

/// A card drawn from the deck and not yet placed or discarded.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DrawnView {
    pub holder: PlayerId,
    /// Only the holder sees the value.
    pub value: Option<u8>,
}

/// Snapshot of the table redacted for one viewer. `viewer: None` is a spectator view.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TableView {
    pub viewer: Option<PlayerId>,
    pub round: u32,
    pub phase: RoundPhase,
    pub players: Vec<PlayerView>,
    pub discard_top: Option<u8>,
    pub discard_size: usize,
    pub deck_remaining: usize,
    pub drawn: Option<DrawnView>,
    pub current_player: Option<PlayerId>,
    pub kabo_called: bool,
    pub kabo_caller: Option<PlayerId>,
    pub countdown: Option<usize>,
    pub log: String,
}

impl TableView {
    pub fn player(&self, id: PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == id)
    }

    /// The viewer's own seat, if the view belongs to a player.
    pub fn me(&self) -> Option<&PlayerView> {
        self.viewer.and_then(|id| self.player(id))
    }

    pub fn opponents(&self) -> impl Iterator<Item = &PlayerView> {
        let viewer = self.viewer;
        self.players.iter().filter(move |p| Some(p.id) != viewer)
    }

    /// Cards on the table: hands, deck, discard pile and a card in flight.
    pub fn card_count(&self) -> usize {
        let in_hands: usize = self.players.iter().map(|p| p.cards.len()).sum();
        in_hands + self.deck_remaining + self.discard_size + usize::from(self.drawn.is_some())
    }

    pub fn scores(&self) -> Vec<u32> {
        self.players.iter().map(|p| p.score).collect()
    }
}
