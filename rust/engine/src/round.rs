//! One round of Kabo: dealing, the turn cycle, effects, exchanges, the KABO
//! countdown and round-end scoring.
//!
//! The round owns the deck, the discard pile and every hand. Agents only ever
//! receive redacted [`TableView`]s and answer through the [`Agent`] methods.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cards::{Card, Effect};
use crate::deck::{Deck, DiscardPile};
use crate::errors::GameError;
use crate::player::{PlayerId, Seat};
use crate::protocol::{
    Agent, CardReveal, CardUse, DecisionKind, DrawnCard, RevealCause, SpyTarget, SwapTarget,
    TurnAction,
};
use crate::rules::{self, IllegalDecisionPolicy, Rules};
use crate::view::{CardView, DrawnView, PlayerView, TableView};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Dealing,
    AwaitingTurn,
    ResolvingDraw,
    ResolvingEffect,
    ResolvingExchange,
    CheckKaboCountdown,
    RoundEnding,
    Finished,
}

/// Why a round ended.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RoundEnd {
    KaboCountdown { caller: PlayerId },
    DeckExhausted,
    Kamikadze { player: PlayerId },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RevealedCard {
    pub position: usize,
    pub value: u8,
}

/// Publicly observable actions. Never carries a value only one player may know.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableAction {
    Dealt {
        cards_per_player: usize,
    },
    DiscardSeeded {
        value: u8,
    },
    InitialPeek {
        positions: Vec<usize>,
    },
    CalledKabo,
    DrewFromDeck,
    TookFromDiscard {
        value: u8,
        position: usize,
        replaced: u8,
    },
    Discarded {
        value: u8,
        for_effect: bool,
    },
    Exchanged {
        position: usize,
        discarded: Vec<u8>,
    },
    ExchangeFailed {
        revealed: Vec<RevealedCard>,
        penalty_drawn: bool,
    },
    Peeked {
        positions: Vec<usize>,
    },
    Spied {
        target: PlayerId,
        position: usize,
    },
    Swapped {
        own_position: usize,
        opponent: PlayerId,
        opponent_position: usize,
    },
    Forfeited {
        decision: DecisionKind,
    },
    RoundEnded {
        end: RoundEnd,
    },
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub turn: u32,
    pub player: Option<PlayerId>,
    pub action: TableAction,
}

impl ActionRecord {
    /// Human-readable log line. `names` is indexed by player id.
    pub fn describe(&self, names: &[String]) -> String {
        let name_of = |id: PlayerId| names.get(id).map(String::as_str).unwrap_or("?");
        let who = self.player.map(name_of).unwrap_or("Dealer");
        match &self.action {
            TableAction::Dealt { cards_per_player } => {
                format!("{cards_per_player} cards dealt to every player")
            }
            TableAction::DiscardSeeded { value } => {
                format!("The discard pile starts with a {value}")
            }
            TableAction::InitialPeek { positions } => {
                format!("{who} looked at {} of their cards", positions.len())
            }
            TableAction::CalledKabo => format!("{who} called KABO!"),
            TableAction::DrewFromDeck => format!("{who} drew a card from the deck"),
            TableAction::TookFromDiscard {
                value,
                position,
                replaced,
            } => format!(
                "{who} took the {value} from the discard pile into position {position} and discarded a {replaced}"
            ),
            TableAction::Discarded { value, for_effect } => {
                if *for_effect {
                    format!("{who} discarded a {value} to use its effect")
                } else {
                    format!("{who} discarded a {value}")
                }
            }
            TableAction::Exchanged {
                position,
                discarded,
            } => format!(
                "{who} exchanged {} for the drawn card, now at position {position}",
                join_values(discarded)
            ),
            TableAction::ExchangeFailed {
                revealed,
                penalty_drawn,
            } => {
                let values: Vec<u8> = revealed.iter().map(|r| r.value).collect();
                let penalty = if *penalty_drawn {
                    " and drew a penalty card"
                } else {
                    ""
                };
                format!(
                    "{who} tried to exchange unequal cards ({}){penalty}",
                    join_values(&values)
                )
            }
            TableAction::Peeked { positions } => {
                format!("{who} peeked at their card at position {positions:?}")
            }
            TableAction::Spied { target, position } => format!(
                "{who} spied on {}'s card at position {position}",
                name_of(*target)
            ),
            TableAction::Swapped {
                own_position,
                opponent,
                opponent_position,
            } => format!(
                "{who} swapped their card at position {own_position} with {}'s card at position {opponent_position}",
                name_of(*opponent)
            ),
            TableAction::Forfeited { decision } => {
                format!("{who} forfeited the turn after an illegal {decision} answer")
            }
            TableAction::RoundEnded { end } => match end {
                RoundEnd::KaboCountdown { caller } => {
                    format!("Round over: final turns after {}'s KABO are done", name_of(*caller))
                }
                RoundEnd::DeckExhausted => "Round over: the deck is empty".to_string(),
                RoundEnd::Kamikadze { player } => {
                    format!("Round over: KAMIKADZE by {}!", name_of(*player))
                }
            },
        }
    }
}

fn join_values(values: &[u8]) -> String {
    values
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Terminal result of a round, handed to the game orchestrator.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round: u32,
    pub end: RoundEnd,
    pub kabo_caller: Option<PlayerId>,
    pub hands: Vec<Vec<u8>>,
    pub hand_sums: Vec<u32>,
    pub scores: Vec<u32>,
    pub turns: u32,
    pub actions: Vec<ActionRecord>,
}

#[derive(Debug, Copy, Clone)]
struct KaboCall {
    caller: PlayerId,
    countdown: usize,
}

#[derive(Debug)]
struct PendingCard {
    holder: PlayerId,
    card: Card,
}

/// Asks until the answer passes `check`. `Ok(None)` means the attempts ran out.
fn resolve<T>(
    policy: IllegalDecisionPolicy,
    player: PlayerId,
    kind: DecisionKind,
    mut ask: impl FnMut() -> Result<T, GameError>,
    check: impl Fn(&T) -> Result<(), GameError>,
) -> Result<Option<T>, GameError> {
    for attempt in 1..=policy.attempts() {
        match ask().and_then(|value| check(&value).map(|()| value)) {
            Ok(value) => return Ok(Some(value)),
            Err(GameError::IllegalDecision { reason, .. }) => {
                warn!(player, %kind, attempt, %reason, "illegal decision");
            }
            Err(other) => return Err(other),
        }
    }
    Ok(None)
}

#[derive(Debug)]
pub struct Round {
    number: u32,
    rules: Rules,
    policy: IllegalDecisionPolicy,
    deck: Deck,
    discard: DiscardPile,
    seats: Vec<Seat>,
    current: PlayerId,
    kabo: Option<KaboCall>,
    pending: Option<PendingCard>,
    phase: RoundPhase,
    turns: u32,
    actions: Vec<ActionRecord>,
    last_log: String,
}

impl Round {
    /// `seats[i]` must carry id `i`; agents are matched to seats by index.
    /// The deck is used in its current order.
    pub fn new(
        number: u32,
        seats: Vec<Seat>,
        starting_player: PlayerId,
        deck: Deck,
        rules: Rules,
        policy: IllegalDecisionPolicy,
    ) -> Result<Self, GameError> {
        rules::validate_player_count(seats.len())?;
        rules.validate()?;
        if seats.iter().enumerate().any(|(i, seat)| seat.id() != i) {
            return Err(GameError::InvalidRules(
                "seat ids must match their position".to_string(),
            ));
        }
        // Every hand plus the card that seeds the discard pile.
        let needed = seats.len() * rules.cards_per_player + 1;
        if deck.remaining() < needed {
            return Err(GameError::InvalidRules(format!(
                "deck holds {} cards but dealing needs {needed}",
                deck.remaining()
            )));
        }
        Ok(Self {
            number,
            rules,
            policy,
            deck,
            discard: DiscardPile::new(),
            current: starting_player % seats.len(),
            seats,
            kabo: None,
            pending: None,
            phase: RoundPhase::Dealing,
            turns: 0,
            actions: Vec::new(),
            last_log: String::new(),
        })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn deck_remaining(&self) -> usize {
        self.deck.remaining()
    }

    pub fn discard_pile(&self) -> &DiscardPile {
        &self.discard
    }

    pub fn kabo_caller(&self) -> Option<PlayerId> {
        self.kabo.map(|k| k.caller)
    }

    pub fn actions(&self) -> &[ActionRecord] {
        &self.actions
    }

    /// Every card the round owns, wherever it lies.
    pub fn card_count(&self) -> usize {
        let in_hands: usize = self.seats.iter().map(|s| s.hand.len()).sum();
        in_hands + self.deck.remaining() + self.discard.len() + usize::from(self.pending.is_some())
    }

    /// Runs the round to its end. `agents[i]` decides for seat `i`.
    ///
    /// An `AgentUnresponsive` error aborts the round; no scores are produced.
    pub fn play<'a>(
        &mut self,
        agents: &mut [Box<dyn Agent + 'a>],
    ) -> Result<RoundOutcome, GameError> {
        if agents.len() != self.seats.len() {
            return Err(GameError::InvalidPlayerCount(agents.len()));
        }
        info!(
            round = self.number,
            players = self.seats.len(),
            starting_player = self.current,
            "round started"
        );
        let end = match self.deal(agents)? {
            Some(end) => end,
            None => self.run_turns(agents)?,
        };
        Ok(self.finish(end, agents))
    }

    /// Redacted snapshot for `viewer` (`None` for a spectator).
    pub fn view_for(&self, viewer: Option<PlayerId>) -> TableView {
        let caller = self.kabo_caller();
        let players = self
            .seats
            .iter()
            .map(|seat| PlayerView {
                id: seat.id(),
                name: seat.name().to_string(),
                score: seat.score(),
                called_kabo: caller == Some(seat.id()),
                cards: seat
                    .hand
                    .cards()
                    .iter()
                    .enumerate()
                    .map(|(position, card)| {
                        let known = card.facts().visible_to(viewer, Some(seat.id()));
                        CardView {
                            position,
                            value: known.then_some(card.value()),
                            publicly_visible: card.facts().publicly_visible,
                            known,
                        }
                    })
                    .collect(),
            })
            .collect();
        let in_play = !matches!(self.phase, RoundPhase::Dealing | RoundPhase::Finished);
        TableView {
            viewer,
            round: self.number,
            phase: self.phase,
            players,
            discard_top: self.discard.peek_top().ok().map(Card::value),
            discard_size: self.discard.len(),
            deck_remaining: self.deck.remaining(),
            drawn: self.pending.as_ref().map(|p| DrawnView {
                holder: p.holder,
                value: (viewer == Some(p.holder)).then_some(p.card.value()),
            }),
            current_player: in_play.then_some(self.current),
            kabo_called: self.kabo.is_some(),
            kabo_caller: caller,
            countdown: self.kabo.map(|k| k.countdown),
            log: self.last_log.clone(),
        }
    }

    fn names(&self) -> Vec<String> {
        self.seats.iter().map(|s| s.name().to_string()).collect()
    }

    fn hand_sizes(&self) -> Vec<usize> {
        self.seats.iter().map(|s| s.hand.len()).collect()
    }

    fn kamikadze_holder(&self) -> Option<PlayerId> {
        self.seats
            .iter()
            .find(|s| s.hand.is_kamikadze())
            .map(Seat::id)
    }

    fn broadcast<'a>(&self, agents: &mut [Box<dyn Agent + 'a>]) {
        for (id, agent) in agents.iter_mut().enumerate() {
            agent.observe(&self.view_for(Some(id)));
        }
    }

    /// Logs an action and pushes fresh views to every agent.
    fn record<'a>(
        &mut self,
        player: Option<PlayerId>,
        action: TableAction,
        agents: &mut [Box<dyn Agent + 'a>],
    ) {
        let record = ActionRecord {
            turn: self.turns,
            player,
            action,
        };
        self.last_log = record.describe(&self.names());
        debug!(round = self.number, turn = self.turns, player = ?player, line = %self.last_log, "table action");
        self.actions.push(record);
        self.broadcast(agents);
    }

    fn forfeit<'a>(
        &mut self,
        player: PlayerId,
        decision: DecisionKind,
        agents: &mut [Box<dyn Agent + 'a>],
    ) {
        self.record(Some(player), TableAction::Forfeited { decision }, agents);
    }

    fn discard_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.discard.add(pending.card);
        }
    }

    fn deal<'a>(
        &mut self,
        agents: &mut [Box<dyn Agent + 'a>],
    ) -> Result<Option<RoundEnd>, GameError> {
        self.phase = RoundPhase::Dealing;
        let cards_per_player = self.rules.cards_per_player;
        for seat in &mut self.seats {
            for _ in 0..cards_per_player {
                seat.hand.push(self.deck.draw()?);
            }
        }
        self.record(None, TableAction::Dealt { cards_per_player }, agents);

        let seed = self.deck.draw()?;
        let value = seed.value();
        self.discard.add(seed);
        self.record(None, TableAction::DiscardSeeded { value }, agents);

        if let Some(player) = self.kamikadze_holder() {
            return Ok(Some(RoundEnd::Kamikadze { player }));
        }

        for player in 0..self.seats.len() {
            let count = self
                .rules
                .number_of_cards_to_see
                .min(self.seats[player].hand.len());
            if count == 0 {
                continue;
            }
            match self.ask_peek(player, count, agents)? {
                Some(positions) => {
                    self.reveal_own(player, &positions, RevealCause::InitialPeek, agents);
                    self.record(Some(player), TableAction::InitialPeek { positions }, agents);
                }
                None => self.forfeit(player, DecisionKind::ChoosePeekTargets, agents),
            }
        }
        Ok(None)
    }

    fn run_turns<'a>(&mut self, agents: &mut [Box<dyn Agent + 'a>]) -> Result<RoundEnd, GameError> {
        loop {
            self.phase = RoundPhase::AwaitingTurn;
            if let Some(player) = self.kamikadze_holder() {
                return Ok(RoundEnd::Kamikadze { player });
            }
            if self.deck.is_empty() {
                return Ok(RoundEnd::DeckExhausted);
            }

            let player = self.current;
            self.turns += 1;
            if let Some(winner) = self.play_turn(player, agents)? {
                return Ok(RoundEnd::Kamikadze { player: winner });
            }

            self.phase = RoundPhase::CheckKaboCountdown;
            if let Some(kabo) = self.kabo.as_mut() {
                kabo.countdown = kabo.countdown.saturating_sub(1);
                if kabo.countdown == 0 {
                    return Ok(RoundEnd::KaboCountdown {
                        caller: kabo.caller,
                    });
                }
            }
            self.current = (self.current + 1) % self.seats.len();
        }
    }

    /// Plays one turn. Returns the Kamikadze holder if a hand reached it.
    fn play_turn<'a>(
        &mut self,
        player: PlayerId,
        agents: &mut [Box<dyn Agent + 'a>],
    ) -> Result<Option<PlayerId>, GameError> {
        let view = self.view_for(Some(player));
        let kabo_called = self.kabo.is_some();
        let discard_empty = self.discard.is_empty();
        let agent = &mut agents[player];
        let action = resolve(
            self.policy,
            player,
            DecisionKind::ChooseTurnAction,
            || agent.choose_turn_action(&view),
            |a| rules::validate_turn_action(*a, kabo_called, discard_empty),
        )?;
        let Some(action) = action else {
            self.forfeit(player, DecisionKind::ChooseTurnAction, agents);
            return Ok(None);
        };

        match action {
            TurnAction::CallKabo => {
                self.kabo = Some(KaboCall {
                    caller: player,
                    countdown: self.seats.len(),
                });
                self.record(Some(player), TableAction::CalledKabo, agents);
                Ok(None)
            }
            TurnAction::TakeFromDiscard => self.take_from_discard(player, agents),
            TurnAction::DrawFromDeck => self.draw_from_deck(player, agents),
        }
    }

    fn take_from_discard<'a>(
        &mut self,
        player: PlayerId,
        agents: &mut [Box<dyn Agent + 'a>],
    ) -> Result<Option<PlayerId>, GameError> {
        let value = self.discard.peek_top()?.value();
        self.phase = RoundPhase::ResolvingExchange;
        let occupied: Vec<usize> = (0..self.seats[player].hand.len()).collect();
        let Some(position) = self.ask_slot(player, &occupied, agents)? else {
            self.forfeit(player, DecisionKind::ChooseNewCardSlot, agents);
            return Ok(None);
        };

        let mut card = self.discard.take_top()?;
        card.facts_mut().known_to_owner = true;
        let replaced = self.seats[player].hand.replace(position, card);
        let replaced_value = replaced.value();
        self.discard.add(replaced);
        self.record(
            Some(player),
            TableAction::TookFromDiscard {
                value,
                position,
                replaced: replaced_value,
            },
            agents,
        );
        Ok(self.kamikadze_holder())
    }

    fn draw_from_deck<'a>(
        &mut self,
        player: PlayerId,
        agents: &mut [Box<dyn Agent + 'a>],
    ) -> Result<Option<PlayerId>, GameError> {
        let card = self.deck.draw()?;
        let drawn = DrawnCard {
            value: card.value(),
            effect: card.effect(),
        };
        self.pending = Some(PendingCard {
            holder: player,
            card,
        });
        self.phase = RoundPhase::ResolvingDraw;
        self.record(Some(player), TableAction::DrewFromDeck, agents);

        let view = self.view_for(Some(player));
        let agent = &mut agents[player];
        let card_use = resolve(
            self.policy,
            player,
            DecisionKind::DecideCardUse,
            || agent.decide_card_use(&view, drawn),
            |u| rules::validate_card_use(*u, drawn),
        )?;
        let Some(card_use) = card_use else {
            self.discard_pending();
            self.forfeit(player, DecisionKind::DecideCardUse, agents);
            return Ok(None);
        };

        match card_use {
            CardUse::Keep => self.keep_drawn(player, drawn, agents),
            CardUse::Discard | CardUse::UseEffect => {
                self.discard_pending();
                self.record(
                    Some(player),
                    TableAction::Discarded {
                        value: drawn.value,
                        for_effect: card_use == CardUse::UseEffect,
                    },
                    agents,
                );
                match drawn.effect {
                    Some(effect) => self.resolve_effect(player, effect, agents),
                    None => Ok(None),
                }
            }
        }
    }

    fn keep_drawn<'a>(
        &mut self,
        player: PlayerId,
        drawn: DrawnCard,
        agents: &mut [Box<dyn Agent + 'a>],
    ) -> Result<Option<PlayerId>, GameError> {
        self.phase = RoundPhase::ResolvingExchange;
        let view = self.view_for(Some(player));
        let hand_size = self.seats[player].hand.len();
        let agent = &mut agents[player];
        let positions = resolve(
            self.policy,
            player,
            DecisionKind::ChooseExchangeCards,
            || agent.choose_exchange_cards(&view, drawn),
            |p| rules::validate_exchange(p, hand_size),
        )?;
        let Some(mut positions) = positions else {
            self.discard_pending();
            self.forfeit(player, DecisionKind::ChooseExchangeCards, agents);
            return Ok(None);
        };
        positions.sort_unstable();

        let hand = &self.seats[player].hand;
        let first = hand.get(positions[0]).map(Card::value);
        let uniform = positions.iter().all(|&p| hand.get(p).map(Card::value) == first);

        if uniform {
            let Some(slot) = self.ask_slot(player, &positions, agents)? else {
                self.discard_pending();
                self.forfeit(player, DecisionKind::ChooseNewCardSlot, agents);
                return Ok(None);
            };
            let Some(PendingCard { mut card, .. }) = self.pending.take() else {
                return Ok(None);
            };
            card.facts_mut().known_to_owner = true;
            let removed = self.seats[player].hand.take_many(&positions);
            let discarded: Vec<u8> = removed.iter().map(Card::value).collect();
            for old in removed {
                self.discard.add(old);
            }
            // Freed slots before the chosen one disappear when the hand compacts.
            let position = slot - positions.iter().filter(|&&p| p < slot).count();
            self.seats[player].hand.insert(position, card);
            self.record(
                Some(player),
                TableAction::Exchanged {
                    position,
                    discarded,
                },
                agents,
            );
        } else {
            let Some(PendingCard { mut card, .. }) = self.pending.take() else {
                return Ok(None);
            };
            card.facts_mut().known_to_owner = true;
            let hand = &mut self.seats[player].hand;
            let mut revealed = Vec::with_capacity(positions.len());
            for &position in &positions {
                if let Some(held) = hand.get_mut(position) {
                    held.facts_mut().publicly_visible = true;
                    revealed.push(RevealedCard {
                        position,
                        value: held.value(),
                    });
                }
            }
            hand.push(card);
            let penalty_drawn = match self.deck.draw() {
                Ok(penalty) => {
                    self.seats[player].hand.push(penalty);
                    true
                }
                Err(_) => false,
            };
            self.record(
                Some(player),
                TableAction::ExchangeFailed {
                    revealed,
                    penalty_drawn,
                },
                agents,
            );
        }
        Ok(self.kamikadze_holder())
    }

    fn resolve_effect<'a>(
        &mut self,
        player: PlayerId,
        effect: Effect,
        agents: &mut [Box<dyn Agent + 'a>],
    ) -> Result<Option<PlayerId>, GameError> {
        self.phase = RoundPhase::ResolvingEffect;
        match effect {
            Effect::Peek => {
                let count = self
                    .rules
                    .effect_peek_count
                    .min(self.seats[player].hand.len());
                match self.ask_peek(player, count, agents)? {
                    Some(positions) => {
                        self.reveal_own(player, &positions, RevealCause::Peek, agents);
                        self.record(Some(player), TableAction::Peeked { positions }, agents);
                    }
                    None => self.forfeit(player, DecisionKind::ChoosePeekTargets, agents),
                }
                Ok(None)
            }
            Effect::Spy => {
                let Some(SpyTarget {
                    player: target,
                    position,
                }) = self.ask_spy(player, agents)?
                else {
                    self.forfeit(player, DecisionKind::ChooseSpyTarget, agents);
                    return Ok(None);
                };
                if let Some(card) = self.seats[target].hand.get_mut(position) {
                    card.facts_mut().known_to_others.insert(player);
                    agents[player].card_revealed(&CardReveal {
                        owner: target,
                        position,
                        value: card.value(),
                        cause: RevealCause::Spy,
                    });
                }
                self.record(Some(player), TableAction::Spied { target, position }, agents);
                Ok(None)
            }
            Effect::Swap => {
                let Some(target) = self.ask_swap(player, agents)? else {
                    self.forfeit(player, DecisionKind::ChooseSwapTargets, agents);
                    return Ok(None);
                };
                self.swap_cards(player, target);
                self.record(
                    Some(player),
                    TableAction::Swapped {
                        own_position: target.own_position,
                        opponent: target.opponent,
                        opponent_position: target.opponent_position,
                    },
                    agents,
                );
                Ok(self.kamikadze_holder())
            }
        }
    }

    /// Exchanges two cards across hands. Knowledge travels with each card and
    /// no value is disclosed.
    fn swap_cards(&mut self, player: PlayerId, target: SwapTarget) {
        let SwapTarget {
            own_position,
            opponent,
            opponent_position,
        } = target;
        let (own_seat, their_seat) = if player < opponent {
            let (left, right) = self.seats.split_at_mut(opponent);
            (&mut left[player], &mut right[0])
        } else {
            let (left, right) = self.seats.split_at_mut(player);
            (&mut right[0], &mut left[opponent])
        };
        if let (Some(own), Some(theirs)) = (
            own_seat.hand.get_mut(own_position),
            their_seat.hand.get_mut(opponent_position),
        ) {
            std::mem::swap(own, theirs);
            own.facts_mut().transfer(opponent, player);
            theirs.facts_mut().transfer(player, opponent);
        }
    }

    fn reveal_own<'a>(
        &mut self,
        player: PlayerId,
        positions: &[usize],
        cause: RevealCause,
        agents: &mut [Box<dyn Agent + 'a>],
    ) {
        for &position in positions {
            if let Some(card) = self.seats[player].hand.get_mut(position) {
                card.facts_mut().known_to_owner = true;
                agents[player].card_revealed(&CardReveal {
                    owner: player,
                    position,
                    value: card.value(),
                    cause,
                });
            }
        }
    }

    fn ask_peek<'a>(
        &self,
        player: PlayerId,
        count: usize,
        agents: &mut [Box<dyn Agent + 'a>],
    ) -> Result<Option<Vec<usize>>, GameError> {
        let view = self.view_for(Some(player));
        let hand_size = self.seats[player].hand.len();
        let agent = &mut agents[player];
        resolve(
            self.policy,
            player,
            DecisionKind::ChoosePeekTargets,
            || agent.choose_peek_targets(&view, count),
            |p| rules::validate_peek(p, count, hand_size),
        )
    }

    /// Asks for one of `open`. A single option is taken without asking.
    fn ask_slot<'a>(
        &self,
        player: PlayerId,
        open: &[usize],
        agents: &mut [Box<dyn Agent + 'a>],
    ) -> Result<Option<usize>, GameError> {
        if let [only] = open {
            return Ok(Some(*only));
        }
        let view = self.view_for(Some(player));
        let agent = &mut agents[player];
        resolve(
            self.policy,
            player,
            DecisionKind::ChooseNewCardSlot,
            || agent.choose_new_card_slot(&view, open),
            |s| rules::validate_new_card_slot(*s, open),
        )
    }

    fn ask_spy<'a>(
        &self,
        player: PlayerId,
        agents: &mut [Box<dyn Agent + 'a>],
    ) -> Result<Option<SpyTarget>, GameError> {
        let view = self.view_for(Some(player));
        let sizes = self.hand_sizes();
        let agent = &mut agents[player];
        resolve(
            self.policy,
            player,
            DecisionKind::ChooseSpyTarget,
            || agent.choose_spy_target(&view),
            |t| rules::validate_spy(*t, player, &sizes),
        )
    }

    fn ask_swap<'a>(
        &self,
        player: PlayerId,
        agents: &mut [Box<dyn Agent + 'a>],
    ) -> Result<Option<SwapTarget>, GameError> {
        let view = self.view_for(Some(player));
        let sizes = self.hand_sizes();
        let agent = &mut agents[player];
        resolve(
            self.policy,
            player,
            DecisionKind::ChooseSwapTargets,
            || agent.choose_swap_targets(&view),
            |t| rules::validate_swap(*t, player, &sizes),
        )
    }

    fn finish<'a>(&mut self, end: RoundEnd, agents: &mut [Box<dyn Agent + 'a>]) -> RoundOutcome {
        self.phase = RoundPhase::RoundEnding;
        self.discard_pending();
        let hands: Vec<Vec<u8>> = self.seats.iter().map(|s| s.hand.values()).collect();
        let hand_sums: Vec<u32> = self.seats.iter().map(|s| s.hand.sum()).collect();
        let caller = self.kabo_caller();
        let scores = match end {
            RoundEnd::Kamikadze { player } => {
                rules::kamikadze_scores(self.seats.len(), player, &self.rules)
            }
            _ => rules::score_round(&hand_sums, caller, &self.rules),
        };

        for seat in &mut self.seats {
            seat.hand.reveal_all();
        }
        self.phase = RoundPhase::Finished;
        self.record(None, TableAction::RoundEnded { end }, agents);
        info!(round = self.number, end = ?end, scores = ?scores, turns = self.turns, "round finished");

        let outcome = RoundOutcome {
            round: self.number,
            end,
            kabo_caller: caller,
            hands,
            hand_sums,
            scores,
            turns: self.turns,
            actions: self.actions.clone(),
        };
        for agent in agents.iter_mut() {
            agent.round_ended(&outcome);
        }
        outcome
    }
}
