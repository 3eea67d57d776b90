//! Input parsing and validation for interactive commands.
//!
//! This module turns terminal lines into protocol decisions. Parsers only
//! check the shape of the input; whether a move is legal at the table is
//! decided by the round engine.
//!
//! ## Error Handling
//!
//! Every parser returns a [`ParseResult`] so the caller can re-prompt with the
//! message or stop the game on a quit command.

use kabo_engine::protocol::{CardUse, SpyTarget, SwapTarget, TurnAction};

/// Result of parsing one line of user input.
#[derive(Debug, PartialEq)]
pub enum ParseResult<T> {
    /// Well-formed answer
    Value(T),
    /// User entered quit command (q or quit)
    Quit,
    /// Invalid input with error message
    Invalid(String),
}

fn is_quit(input: &str) -> bool {
    matches!(input, "q" | "quit")
}

fn numbers(input: &str) -> Result<Vec<usize>, String> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>()
                .map_err(|_| format!("'{}' is not a card position", part))
        })
        .collect()
}

/// Parse a turn action.
///
/// Accepts (case-insensitive):
/// - "k" or "kabo" → call KABO
/// - "d" or "draw" → draw from the deck
/// - "t", "take" or "discard" → take the top of the discard pile
/// - "q" or "quit" → Quit command
///
/// # Example
///
/// ```rust
/// # use kabo_cli::validation::{parse_turn_action, ParseResult};
/// use kabo_engine::protocol::TurnAction;
///
/// assert_eq!(parse_turn_action("Draw"), ParseResult::Value(TurnAction::DrawFromDeck));
/// assert_eq!(parse_turn_action("q"), ParseResult::Quit);
/// ```
pub fn parse_turn_action(input: &str) -> ParseResult<TurnAction> {
    let input = input.trim().to_lowercase();
    if is_quit(&input) {
        return ParseResult::Quit;
    }
    match input.as_str() {
        "k" | "kabo" => ParseResult::Value(TurnAction::CallKabo),
        "d" | "draw" => ParseResult::Value(TurnAction::DrawFromDeck),
        "t" | "take" | "discard" => ParseResult::Value(TurnAction::TakeFromDiscard),
        "" => ParseResult::Invalid("Empty input".to_string()),
        other => ParseResult::Invalid(format!(
            "Unrecognized action '{}'. Valid actions: kabo, draw, take, q",
            other
        )),
    }
}

/// Parse what to do with a drawn card: "keep", "discard" or "effect".
pub fn parse_card_use(input: &str) -> ParseResult<CardUse> {
    let input = input.trim().to_lowercase();
    if is_quit(&input) {
        return ParseResult::Quit;
    }
    match input.as_str() {
        "k" | "keep" => ParseResult::Value(CardUse::Keep),
        "d" | "discard" => ParseResult::Value(CardUse::Discard),
        "e" | "effect" | "use" => ParseResult::Value(CardUse::UseEffect),
        "" => ParseResult::Invalid("Empty input".to_string()),
        other => ParseResult::Invalid(format!(
            "Unrecognized choice '{}'. Valid choices: keep, discard, effect, q",
            other
        )),
    }
}

/// Parse one or more card positions separated by spaces or commas.
///
/// # Example
///
/// ```rust
/// # use kabo_cli::validation::{parse_positions, ParseResult};
/// assert_eq!(parse_positions("0, 2"), ParseResult::Value(vec![0, 2]));
/// ```
pub fn parse_positions(input: &str) -> ParseResult<Vec<usize>> {
    let input = input.trim().to_lowercase();
    if is_quit(&input) {
        return ParseResult::Quit;
    }
    match numbers(&input) {
        Ok(positions) if positions.is_empty() => {
            ParseResult::Invalid("Enter at least one position".to_string())
        }
        Ok(positions) => ParseResult::Value(positions),
        Err(msg) => ParseResult::Invalid(msg),
    }
}

pub fn parse_position(input: &str) -> ParseResult<usize> {
    match parse_positions(input) {
        ParseResult::Value(positions) if positions.len() == 1 => ParseResult::Value(positions[0]),
        ParseResult::Value(_) => ParseResult::Invalid("Enter exactly one position".to_string()),
        ParseResult::Quit => ParseResult::Quit,
        ParseResult::Invalid(msg) => ParseResult::Invalid(msg),
    }
}

/// Parse "<player> <position>".
pub fn parse_spy_target(input: &str) -> ParseResult<SpyTarget> {
    match parse_positions(input) {
        ParseResult::Value(parts) => match parts.as_slice() {
            [player, position] => ParseResult::Value(SpyTarget {
                player: *player,
                position: *position,
            }),
            _ => ParseResult::Invalid("Enter a player number and a position".to_string()),
        },
        ParseResult::Quit => ParseResult::Quit,
        ParseResult::Invalid(msg) => ParseResult::Invalid(msg),
    }
}

/// Parse "<own position> <opponent> <opponent position>".
pub fn parse_swap_target(input: &str) -> ParseResult<SwapTarget> {
    match parse_positions(input) {
        ParseResult::Value(parts) => match parts.as_slice() {
            [own_position, opponent, opponent_position] => ParseResult::Value(SwapTarget {
                own_position: *own_position,
                opponent: *opponent,
                opponent_position: *opponent_position,
            }),
            _ => ParseResult::Invalid(
                "Enter your position, the opponent number and their position".to_string(),
            ),
        },
        ParseResult::Quit => ParseResult::Quit,
        ParseResult::Invalid(msg) => ParseResult::Invalid(msg),
    }
}
