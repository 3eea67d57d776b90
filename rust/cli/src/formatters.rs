//! Table, card and result formatters for terminal display.
//!
//! Pure functions over the engine's redacted views, so nothing printed here
//! can reveal a value the viewer is not allowed to see.
//!
//! ## Example
//!
//! ```rust
//! use kabo_cli::formatters::format_card;
//! use kabo_engine::view::CardView;
//!
//! let hidden = CardView { position: 0, value: None, publicly_visible: false, known: false };
//! assert_eq!(format_card(&hidden), "[??]");
//! ```

use kabo_engine::game::GameSummary;
use kabo_engine::protocol::DrawnCard;
use kabo_engine::round::{RoundEnd, RoundOutcome};
use kabo_engine::view::{CardView, PlayerView, TableView};

/// A single card slot: `[ 7]` when visible to the viewer, `[??]` otherwise.
/// Publicly visible cards are marked with `*`.
pub fn format_card(card: &CardView) -> String {
    match card.value {
        Some(value) if card.publicly_visible => format!("[{:>2}*]", value),
        Some(value) => format!("[{:>2}]", value),
        None => "[??]".to_string(),
    }
}

/// Cards of one player, separated by spaces.
pub fn format_hand(cards: &[CardView]) -> String {
    cards.iter().map(format_card).collect::<Vec<_>>().join(" ")
}

fn format_player_line(player: &PlayerView, viewer: Option<usize>, current: Option<usize>) -> String {
    let marker = if current == Some(player.id) { ">" } else { " " };
    let you = if viewer == Some(player.id) { " (you)" } else { "" };
    let kabo = if player.called_kabo { " KABO!" } else { "" };
    format!(
        "{} {}: {}{} [{} pts]{}  {}",
        marker,
        player.id,
        player.name,
        you,
        player.score,
        kabo,
        format_hand(&player.cards)
    )
}

/// Multi-line rendering of the whole table for one viewer.
pub fn format_table(view: &TableView) -> String {
    let mut lines = Vec::with_capacity(view.players.len() + 2);
    let discard = view
        .discard_top
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut header = format!(
        "Round {} | Deck {} | Discard {}",
        view.round, view.deck_remaining, discard
    );
    if let Some(countdown) = view.countdown {
        header.push_str(&format!(" | KABO called, {} turn(s) left", countdown));
    }
    lines.push(header);
    for player in &view.players {
        lines.push(format_player_line(player, view.viewer, view.current_player));
    }
    lines.join("\n")
}

/// A drawn card with its effect, e.g. `9 (SPY)`.
pub fn format_drawn(drawn: &DrawnCard) -> String {
    match drawn.effect {
        Some(effect) => format!("{} ({})", drawn.value, effect),
        None => drawn.value.to_string(),
    }
}

pub fn format_round_end(end: &RoundEnd, names: &[String]) -> String {
    let name = |id: usize| names.get(id).cloned().unwrap_or_else(|| format!("P{}", id));
    match end {
        RoundEnd::KaboCountdown { caller } => format!("KABO called by {}", name(*caller)),
        RoundEnd::DeckExhausted => "deck exhausted".to_string(),
        RoundEnd::Kamikadze { player } => format!("KAMIKADZE by {}", name(*player)),
    }
}

/// Final hands and scores of a round, one line per player.
pub fn format_outcome(outcome: &RoundOutcome, names: &[String]) -> String {
    let mut lines = vec![format!(
        "Round {} ended after {} turn(s): {}",
        outcome.round,
        outcome.turns,
        format_round_end(&outcome.end, names)
    )];
    for (id, hand) in outcome.hands.iter().enumerate() {
        let name = names.get(id).map(String::as_str).unwrap_or("?");
        let values = hand.iter().map(u8::to_string).collect::<Vec<_>>().join(" ");
        lines.push(format!(
            "  {}: [{}] sum {} -> +{}",
            name,
            values,
            outcome.hand_sums.get(id).copied().unwrap_or(0),
            outcome.scores.get(id).copied().unwrap_or(0)
        ));
    }
    lines.join("\n")
}

pub fn format_summary(summary: &GameSummary) -> String {
    let names = |ids: &[usize]| {
        ids.iter()
            .filter_map(|id| summary.final_scores.get(*id).map(|p| p.name.clone()))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut lines = vec![format!("Game over after {} round(s)", summary.rounds_played)];
    for player in &summary.final_scores {
        lines.push(format!("  {}: {}", player.name, player.score));
    }
    lines.push(format!("Winner(s): {}", names(&summary.winners)));
    lines.push(format!("Loser(s): {}", names(&summary.losers)));
    lines.join("\n")
}
