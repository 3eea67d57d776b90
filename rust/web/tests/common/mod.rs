#![allow(dead_code)]

use kabo_engine::protocol::{
    CardUse, Decision, DecisionKind, DecisionRequest, LegalOptions, SpyTarget, SwapTarget,
    TurnAction,
};
use kabo_web::{EventSubscription, RoomEvent};
use std::time::{Duration, Instant};

/// A legal answer that ends rounds quickly: call KABO whenever possible,
/// otherwise discard what was drawn and pick the first target offered.
pub fn answer(request: &DecisionRequest) -> Decision {
    match &request.legal_options {
        LegalOptions::TurnActions { actions } => {
            if actions.contains(&TurnAction::CallKabo) {
                Decision::ChooseTurnAction(TurnAction::CallKabo)
            } else {
                Decision::ChooseTurnAction(TurnAction::DrawFromDeck)
            }
        }
        LegalOptions::CardUses { .. } => Decision::DecideCardUse(CardUse::Discard),
        LegalOptions::OwnPositions { positions, min, .. } => match request.kind {
            DecisionKind::ChoosePeekTargets => Decision::ChoosePeekTargets(positions[..*min].to_vec()),
            _ => Decision::ChooseExchangeCards(positions[..(*min).max(1)].to_vec()),
        },
        LegalOptions::Slots { slots } => Decision::ChooseNewCardSlot(slots[0]),
        LegalOptions::OpponentCards { opponents } => Decision::ChooseSpyTarget(SpyTarget {
            player: opponents[0].player,
            position: opponents[0].positions[0],
        }),
        LegalOptions::SwapPairs {
            own_positions,
            opponents,
        } => Decision::ChooseSwapTargets(SwapTarget {
            own_position: own_positions[0],
            opponent: opponents[0].player,
            opponent_position: opponents[0].positions[0],
        }),
    }
}

/// Polls `check` until it yields a value or `timeout` passes.
pub fn wait_for<T>(timeout: Duration, mut check: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(value) = check() {
            return Some(value);
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    None
}

/// Everything already delivered to `subscription`.
pub fn drain(subscription: &mut EventSubscription) -> Vec<RoomEvent> {
    let mut events = Vec::new();
    while let Ok(event) = subscription.receiver().try_recv() {
        events.push(event);
    }
    events
}
