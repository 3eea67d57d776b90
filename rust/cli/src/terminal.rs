//! Human player at a terminal.
//!
//! [`TerminalPlayer`] implements the engine's `Agent` trait over any
//! `BufRead`/`Write` pair. Every answer is checked against the same rule
//! validators the engine uses, so a typo re-prompts instead of costing a
//! retry. End of input (or `q`) makes the player unresponsive.

use crate::formatters::{format_drawn, format_outcome, format_summary, format_table};
use crate::ui;
use crate::validation::{
    ParseResult, parse_card_use, parse_position, parse_positions, parse_spy_target,
    parse_swap_target, parse_turn_action,
};
use kabo_engine::errors::{GameError, Unresponsive};
use kabo_engine::game::GameSummary;
use kabo_engine::player::{AgentKind, PlayerId};
use kabo_engine::protocol::{
    Agent, CardReveal, CardUse, DrawnCard, RevealCause, SpyTarget, SwapTarget, TurnAction,
};
use kabo_engine::round::RoundOutcome;
use kabo_engine::rules;
use kabo_engine::view::TableView;
use std::io::{BufRead, Write};

/// One trimmed line of input. `None` at end of input or on a read error.
fn read_answer(input: &mut impl BufRead) -> Option<String> {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

pub struct TerminalPlayer<R, W> {
    name: String,
    input: R,
    output: W,
    names: Vec<String>,
}

impl<R: BufRead, W: Write> TerminalPlayer<R, W> {
    pub fn new(name: impl Into<String>, input: R, output: W) -> Self {
        Self {
            name: name.into(),
            input,
            output,
            names: Vec::new(),
        }
    }

    fn name_of(&self, id: PlayerId) -> String {
        self.names
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("P{}", id))
    }

    /// Prompts until the line parses and passes `check`.
    fn ask<T>(
        &mut self,
        player: PlayerId,
        prompt: &str,
        parse: impl Fn(&str) -> ParseResult<T>,
        check: impl Fn(&T) -> Result<(), GameError>,
    ) -> Result<T, GameError> {
        let closed = GameError::AgentUnresponsive {
            player,
            reason: Unresponsive::InputClosed,
        };
        loop {
            if write!(self.output, "{}", prompt).is_err() || self.output.flush().is_err() {
                return Err(closed);
            }
            let Some(line) = read_answer(&mut self.input) else {
                return Err(closed);
            };
            let message = match parse(&line) {
                ParseResult::Value(value) => match check(&value) {
                    Ok(()) => return Ok(value),
                    Err(GameError::IllegalDecision { reason, .. }) => reason,
                    Err(other) => other.to_string(),
                },
                ParseResult::Quit => return Err(closed),
                ParseResult::Invalid(msg) => msg,
            };
            if ui::write_error(&mut self.output, &message).is_err() {
                return Err(closed);
            }
        }
    }
}

fn viewer(view: &TableView) -> PlayerId {
    view.viewer.unwrap_or_default()
}

fn hand_size(view: &TableView) -> usize {
    view.me().map(|p| p.cards.len()).unwrap_or(0)
}

fn hand_sizes(view: &TableView) -> Vec<usize> {
    view.players.iter().map(|p| p.cards.len()).collect()
}

impl<R: BufRead, W: Write> Agent for TerminalPlayer<R, W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Human
    }

    fn choose_turn_action(&mut self, view: &TableView) -> Result<TurnAction, GameError> {
        let _ = writeln!(self.output, "\n{}", format_table(view));
        let mut options = vec!["[d]raw"];
        if view.discard_top.is_some() {
            options.push("[t]ake discard");
        }
        if !view.kabo_called {
            options.push("[k]abo");
        }
        let prompt = format!("Your turn: {} or q: ", options.join(", "));
        let kabo_called = view.kabo_called;
        let discard_empty = view.discard_top.is_none();
        self.ask(viewer(view), &prompt, parse_turn_action, |action| {
            rules::validate_turn_action(*action, kabo_called, discard_empty)
        })
    }

    fn decide_card_use(&mut self, view: &TableView, drawn: DrawnCard) -> Result<CardUse, GameError> {
        let options = if drawn.effect.is_some() {
            "[k]eep, [d]iscard or [e]ffect"
        } else {
            "[k]eep or [d]iscard"
        };
        let prompt = format!("You drew a {}. {}: ", format_drawn(&drawn), options);
        self.ask(viewer(view), &prompt, parse_card_use, |card_use| {
            rules::validate_card_use(*card_use, drawn)
        })
    }

    fn choose_exchange_cards(
        &mut self,
        view: &TableView,
        drawn: DrawnCard,
    ) -> Result<Vec<usize>, GameError> {
        let size = hand_size(view);
        let prompt = format!(
            "Positions to exchange for the {} (equal values, e.g. 0 2): ",
            drawn.value
        );
        self.ask(viewer(view), &prompt, parse_positions, |positions| {
            rules::validate_exchange(positions, size)
        })
    }

    fn choose_new_card_slot(&mut self, view: &TableView, open: &[usize]) -> Result<usize, GameError> {
        let prompt = format!("Slot for the new card {:?}: ", open);
        self.ask(viewer(view), &prompt, parse_position, |slot| {
            rules::validate_new_card_slot(*slot, open)
        })
    }

    fn choose_peek_targets(&mut self, view: &TableView, count: usize) -> Result<Vec<usize>, GameError> {
        let size = hand_size(view);
        let prompt = format!("Pick {} of your cards to look at (0-{}): ", count, size.saturating_sub(1));
        self.ask(viewer(view), &prompt, parse_positions, |positions| {
            rules::validate_peek(positions, count, size)
        })
    }

    fn choose_spy_target(&mut self, view: &TableView) -> Result<SpyTarget, GameError> {
        let actor = viewer(view);
        let sizes = hand_sizes(view);
        self.ask(actor, "Spy on <player> <position>: ", parse_spy_target, |target| {
            rules::validate_spy(*target, actor, &sizes)
        })
    }

    fn choose_swap_targets(&mut self, view: &TableView) -> Result<SwapTarget, GameError> {
        let actor = viewer(view);
        let sizes = hand_sizes(view);
        self.ask(
            actor,
            "Swap <your position> <player> <their position>: ",
            parse_swap_target,
            |target| rules::validate_swap(*target, actor, &sizes),
        )
    }

    fn observe(&mut self, view: &TableView) {
        self.names = view.players.iter().map(|p| p.name.clone()).collect();
        if !view.log.is_empty() {
            let _ = writeln!(self.output, "  * {}", view.log);
        }
    }

    fn card_revealed(&mut self, reveal: &CardReveal) {
        let whose = match reveal.cause {
            RevealCause::Spy => format!("{}'s card", self.name_of(reveal.owner)),
            RevealCause::InitialPeek | RevealCause::Peek => "Your card".to_string(),
        };
        let _ = writeln!(
            self.output,
            "  {} at position {} is a {}",
            whose, reveal.position, reveal.value
        );
    }

    fn round_ended(&mut self, outcome: &RoundOutcome) {
        let _ = writeln!(self.output, "{}", format_outcome(outcome, &self.names));
    }

    fn game_ended(&mut self, summary: &GameSummary) {
        let _ = writeln!(self.output, "{}", format_summary(summary));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kabo_engine::cards::Effect;
    use kabo_engine::round::RoundPhase;
    use kabo_engine::view::{CardView, PlayerView};
    use std::io::Cursor;

    fn view() -> TableView {
        let cards = |n: usize| {
            (0..n)
                .map(|position| CardView {
                    position,
                    value: None,
                    publicly_visible: false,
                    known: false,
                })
                .collect()
        };
        TableView {
            viewer: Some(0),
            round: 1,
            phase: RoundPhase::AwaitingTurn,
            players: vec![
                PlayerView {
                    id: 0,
                    name: "YOU".into(),
                    score: 0,
                    called_kabo: false,
                    cards: cards(4),
                },
                PlayerView {
                    id: 1,
                    name: "CPU1".into(),
                    score: 0,
                    called_kabo: false,
                    cards: cards(4),
                },
            ],
            discard_top: Some(5),
            discard_size: 1,
            deck_remaining: 43,
            drawn: None,
            current_player: Some(0),
            kabo_called: false,
            kabo_caller: None,
            countdown: None,
            log: String::new(),
        }
    }

    fn player(input: &str) -> TerminalPlayer<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalPlayer::new("YOU", Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn printed(p: &TerminalPlayer<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(p.output.clone()).unwrap()
    }

    #[test]
    fn reprompts_until_input_is_valid() {
        let mut p = player("fold\nd\n");
        assert_eq!(p.choose_turn_action(&view()).unwrap(), TurnAction::DrawFromDeck);
        let out = printed(&p);
        assert!(out.contains("Error: Unrecognized action 'fold'"));
        assert_eq!(out.matches("Your turn:").count(), 2);
    }

    #[test]
    fn rejects_illegal_moves_locally() {
        let mut v = view();
        v.kabo_called = true;
        let mut p = player("k\nd\n");
        assert_eq!(p.choose_turn_action(&v).unwrap(), TurnAction::DrawFromDeck);
        assert!(printed(&p).contains("Error: "));

        let mut p = player("e\nd\n");
        let drawn = DrawnCard {
            value: 4,
            effect: None,
        };
        assert_eq!(p.decide_card_use(&view(), drawn).unwrap(), CardUse::Discard);
    }

    #[test]
    fn parses_targets() {
        let mut p = player("0 5\n1 2\n");
        let target = p.choose_spy_target(&view()).unwrap();
        assert_eq!(
            target,
            SpyTarget {
                player: 1,
                position: 2
            }
        );

        let mut p = player("3 1 0\n");
        let swap = p.choose_swap_targets(&view()).unwrap();
        assert_eq!(swap.own_position, 3);

        let mut p = player("1 1\n1 2\n");
        assert_eq!(p.choose_peek_targets(&view(), 2).unwrap(), vec![1, 2]);
    }

    #[test]
    fn end_of_input_is_unresponsive() {
        let mut p = player("");
        let drawn = DrawnCard {
            value: 9,
            effect: Some(Effect::Spy),
        };
        assert_eq!(
            p.decide_card_use(&view(), drawn).unwrap_err(),
            GameError::AgentUnresponsive {
                player: 0,
                reason: Unresponsive::InputClosed
            }
        );
        let mut p = player("quit\n");
        assert!(p.choose_turn_action(&view()).unwrap_err().is_round_fatal());
    }

    #[test]
    fn reveals_are_printed_with_owner_names() {
        let mut p = player("");
        p.observe(&view());
        p.card_revealed(&CardReveal {
            owner: 1,
            position: 2,
            value: 11,
            cause: RevealCause::Spy,
        });
        assert!(printed(&p).contains("CPU1's card at position 2 is a 11"));
    }
}
