//! Decision points every agent answers, and the message shapes used to carry
//! them across a thread or network boundary.
//!
//! The round engine calls the [`Agent`] methods synchronously. A local AI answers
//! immediately, a terminal player blocks on stdin, and a remote player blocks on
//! a bridge that turns the call into a [`DecisionRequest`] and waits for the
//! matching [`DecisionResponse`].

use serde::{Deserialize, Serialize};

use crate::cards::Effect;
use crate::errors::GameError;
use crate::game::GameSummary;
use crate::player::{AgentKind, PlayerId};
use crate::round::RoundOutcome;
use crate::view::TableView;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnAction {
    CallKabo,
    DrawFromDeck,
    TakeFromDiscard,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardUse {
    Keep,
    Discard,
    UseEffect,
}

/// What the drawing player learns about the card they just drew.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DrawnCard {
    pub value: u8,
    pub effect: Option<Effect>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SpyTarget {
    pub player: PlayerId,
    pub position: usize,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SwapTarget {
    pub own_position: usize,
    pub opponent: PlayerId,
    pub opponent_position: usize,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealCause {
    InitialPeek,
    Peek,
    Spy,
}

/// A card value privately shown to one player.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CardReveal {
    pub owner: PlayerId,
    pub position: usize,
    pub value: u8,
    pub cause: RevealCause,
}

/// The decision interface. Implementations hold no game rules; the round engine
/// validates every answer and re-asks or forfeits on an illegal one.
pub trait Agent {
    fn name(&self) -> &str;

    fn kind(&self) -> AgentKind {
        AgentKind::Ai
    }

    fn choose_turn_action(&mut self, view: &TableView) -> Result<TurnAction, GameError>;

    fn decide_card_use(
        &mut self,
        view: &TableView,
        drawn: DrawnCard,
    ) -> Result<CardUse, GameError>;

    /// One or more own positions holding cards of equal value.
    fn choose_exchange_cards(
        &mut self,
        view: &TableView,
        drawn: DrawnCard,
    ) -> Result<Vec<usize>, GameError>;

    fn choose_new_card_slot(
        &mut self,
        view: &TableView,
        open: &[usize],
    ) -> Result<usize, GameError>;

    /// Exactly `count` distinct own positions.
    fn choose_peek_targets(
        &mut self,
        view: &TableView,
        count: usize,
    ) -> Result<Vec<usize>, GameError>;

    fn choose_spy_target(&mut self, view: &TableView) -> Result<SpyTarget, GameError>;

    fn choose_swap_targets(&mut self, view: &TableView) -> Result<SwapTarget, GameError>;

    /// Redacted table state after every mutation, as seen by this agent.
    fn observe(&mut self, _view: &TableView) {}

    fn card_revealed(&mut self, _reveal: &CardReveal) {}

    fn round_ended(&mut self, _outcome: &RoundOutcome) {}

    fn game_ended(&mut self, _summary: &GameSummary) {}
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    ChooseTurnAction,
    DecideCardUse,
    ChooseExchangeCards,
    ChooseNewCardSlot,
    ChoosePeekTargets,
    ChooseSpyTarget,
    ChooseSwapTargets,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::ChooseTurnAction => "choose_turn_action",
            DecisionKind::DecideCardUse => "decide_card_use",
            DecisionKind::ChooseExchangeCards => "choose_exchange_cards",
            DecisionKind::ChooseNewCardSlot => "choose_new_card_slot",
            DecisionKind::ChoosePeekTargets => "choose_peek_targets",
            DecisionKind::ChooseSpyTarget => "choose_spy_target",
            DecisionKind::ChooseSwapTargets => "choose_swap_targets",
        }
    }
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An answer to one decision, tagged with the kind it answers.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Decision {
    ChooseTurnAction(TurnAction),
    DecideCardUse(CardUse),
    ChooseExchangeCards(Vec<usize>),
    ChooseNewCardSlot(usize),
    ChoosePeekTargets(Vec<usize>),
    ChooseSpyTarget(SpyTarget),
    ChooseSwapTargets(SwapTarget),
}

impl Decision {
    pub fn kind(&self) -> DecisionKind {
        match self {
            Decision::ChooseTurnAction(_) => DecisionKind::ChooseTurnAction,
            Decision::DecideCardUse(_) => DecisionKind::DecideCardUse,
            Decision::ChooseExchangeCards(_) => DecisionKind::ChooseExchangeCards,
            Decision::ChooseNewCardSlot(_) => DecisionKind::ChooseNewCardSlot,
            Decision::ChoosePeekTargets(_) => DecisionKind::ChoosePeekTargets,
            Decision::ChooseSpyTarget(_) => DecisionKind::ChooseSpyTarget,
            Decision::ChooseSwapTargets(_) => DecisionKind::ChooseSwapTargets,
        }
    }

    fn mismatch(self, expected: DecisionKind) -> GameError {
        GameError::illegal(
            expected,
            format!("expected a {expected} answer, got {}", self.kind()),
        )
    }

    pub fn into_turn_action(self) -> Result<TurnAction, GameError> {
        match self {
            Decision::ChooseTurnAction(action) => Ok(action),
            other => Err(other.mismatch(DecisionKind::ChooseTurnAction)),
        }
    }

    pub fn into_card_use(self) -> Result<CardUse, GameError> {
        match self {
            Decision::DecideCardUse(card_use) => Ok(card_use),
            other => Err(other.mismatch(DecisionKind::DecideCardUse)),
        }
    }

    pub fn into_exchange_cards(self) -> Result<Vec<usize>, GameError> {
        match self {
            Decision::ChooseExchangeCards(positions) => Ok(positions),
            other => Err(other.mismatch(DecisionKind::ChooseExchangeCards)),
        }
    }

    pub fn into_new_card_slot(self) -> Result<usize, GameError> {
        match self {
            Decision::ChooseNewCardSlot(slot) => Ok(slot),
            other => Err(other.mismatch(DecisionKind::ChooseNewCardSlot)),
        }
    }

    pub fn into_peek_targets(self) -> Result<Vec<usize>, GameError> {
        match self {
            Decision::ChoosePeekTargets(positions) => Ok(positions),
            other => Err(other.mismatch(DecisionKind::ChoosePeekTargets)),
        }
    }

    pub fn into_spy_target(self) -> Result<SpyTarget, GameError> {
        match self {
            Decision::ChooseSpyTarget(target) => Ok(target),
            other => Err(other.mismatch(DecisionKind::ChooseSpyTarget)),
        }
    }

    pub fn into_swap_targets(self) -> Result<SwapTarget, GameError> {
        match self {
            Decision::ChooseSwapTargets(target) => Ok(target),
            other => Err(other.mismatch(DecisionKind::ChooseSwapTargets)),
        }
    }
}

/// Input of one decision method, used to describe a pending request.
#[derive(Debug, Clone, Copy)]
pub enum Prompt<'a> {
    TurnAction,
    CardUse(DrawnCard),
    ExchangeCards(DrawnCard),
    NewCardSlot(&'a [usize]),
    PeekTargets(usize),
    SpyTarget,
    SwapTargets,
}

impl Prompt<'_> {
    pub fn kind(&self) -> DecisionKind {
        match self {
            Prompt::TurnAction => DecisionKind::ChooseTurnAction,
            Prompt::CardUse(_) => DecisionKind::DecideCardUse,
            Prompt::ExchangeCards(_) => DecisionKind::ChooseExchangeCards,
            Prompt::NewCardSlot(_) => DecisionKind::ChooseNewCardSlot,
            Prompt::PeekTargets(_) => DecisionKind::ChoosePeekTargets,
            Prompt::SpyTarget => DecisionKind::ChooseSpyTarget,
            Prompt::SwapTargets => DecisionKind::ChooseSwapTargets,
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PromptData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawn: Option<DrawnCard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct OpponentSlots {
    pub player: PlayerId,
    pub positions: Vec<usize>,
}

/// The set of answers the engine will accept for a request.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LegalOptions {
    TurnActions {
        actions: Vec<TurnAction>,
    },
    CardUses {
        uses: Vec<CardUse>,
    },
    OwnPositions {
        positions: Vec<usize>,
        min: usize,
        max: usize,
    },
    Slots {
        slots: Vec<usize>,
    },
    OpponentCards {
        opponents: Vec<OpponentSlots>,
    },
    SwapPairs {
        own_positions: Vec<usize>,
        opponents: Vec<OpponentSlots>,
    },
}

/// A pending question for one player.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub request_id: u64,
    pub player: PlayerId,
    pub kind: DecisionKind,
    pub prompt: String,
    pub prompt_data: PromptData,
    pub legal_options: LegalOptions,
}

impl DecisionRequest {
    /// Describes `prompt` for `player`, deriving the legal options from the
    /// player's own view of the table.
    pub fn new(request_id: u64, player: PlayerId, view: &TableView, prompt: Prompt<'_>) -> Self {
        let own_positions: Vec<usize> = view
            .player(player)
            .map(|p| (0..p.cards.len()).collect())
            .unwrap_or_default();
        let opponents: Vec<OpponentSlots> = view
            .players
            .iter()
            .filter(|p| p.id != player)
            .map(|p| OpponentSlots {
                player: p.id,
                positions: (0..p.cards.len()).collect(),
            })
            .collect();
        let hand_size = own_positions.len();

        let (text, prompt_data, legal_options) = match prompt {
            Prompt::TurnAction => {
                let mut actions = Vec::with_capacity(3);
                if !view.kabo_called {
                    actions.push(TurnAction::CallKabo);
                }
                actions.push(TurnAction::DrawFromDeck);
                if view.discard_top.is_some() {
                    actions.push(TurnAction::TakeFromDiscard);
                }
                (
                    "Your turn: call KABO, draw from the deck or take the discard".to_string(),
                    PromptData::default(),
                    LegalOptions::TurnActions { actions },
                )
            }
            Prompt::CardUse(drawn) => {
                let mut uses = vec![CardUse::Keep, CardUse::Discard];
                if drawn.effect.is_some() {
                    uses.push(CardUse::UseEffect);
                }
                (
                    format!("You drew a {}: keep, discard or use its effect", drawn.value),
                    PromptData {
                        drawn: Some(drawn),
                        count: None,
                    },
                    LegalOptions::CardUses { uses },
                )
            }
            Prompt::ExchangeCards(drawn) => (
                format!("Pick cards of equal value to exchange for the {}", drawn.value),
                PromptData {
                    drawn: Some(drawn),
                    count: None,
                },
                LegalOptions::OwnPositions {
                    positions: own_positions,
                    min: 1,
                    max: hand_size,
                },
            ),
            Prompt::NewCardSlot(open) => (
                "Pick the position for the new card".to_string(),
                PromptData::default(),
                LegalOptions::Slots {
                    slots: open.to_vec(),
                },
            ),
            Prompt::PeekTargets(count) => (
                format!("Pick {count} of your cards to look at"),
                PromptData {
                    drawn: None,
                    count: Some(count),
                },
                LegalOptions::OwnPositions {
                    positions: own_positions,
                    min: count,
                    max: count,
                },
            ),
            Prompt::SpyTarget => (
                "Pick an opponent card to spy on".to_string(),
                PromptData::default(),
                LegalOptions::OpponentCards { opponents },
            ),
            Prompt::SwapTargets => (
                "Pick one of your cards and an opponent card to swap".to_string(),
                PromptData::default(),
                LegalOptions::SwapPairs {
                    own_positions,
                    opponents,
                },
            ),
        };

        Self {
            request_id,
            player,
            kind: prompt.kind(),
            prompt: text,
            prompt_data,
            legal_options,
        }
    }
}

/// A front end's answer to the request with the same id.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub request_id: u64,
    pub decision: Decision,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_wire_shape_echoes_kind() {
        let response = DecisionResponse {
            request_id: 7,
            decision: Decision::ChooseSpyTarget(SpyTarget {
                player: 1,
                position: 2,
            }),
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["request_id"], 7);
        assert_eq!(json["decision"]["kind"], "choose_spy_target");
        assert_eq!(json["decision"]["value"]["player"], 1);

        let back: DecisionResponse = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, response);
    }

    #[test]
    fn mismatched_decision_is_illegal() {
        let err = Decision::ChooseNewCardSlot(2)
            .into_turn_action()
            .expect_err("slot is not a turn action");
        assert!(matches!(
            err,
            GameError::IllegalDecision {
                kind: DecisionKind::ChooseTurnAction,
                ..
            }
        ));
    }

    #[test]
    fn unknown_kind_fails_to_parse() {
        let raw = r#"{"request_id":1,"decision":{"kind":"fold","value":null}}"#;
        assert!(serde_json::from_str::<DecisionResponse>(raw).is_err());
    }
}
