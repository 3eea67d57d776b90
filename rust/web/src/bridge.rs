//! Hand-off between the synchronous game thread and asynchronous front ends.
//!
//! [`seat`] splits one human seat into two halves. The [`BridgedAgent`] is moved
//! onto the game thread and implements the engine's `Agent` trait: every
//! decision becomes a [`DecisionRequest`] that is stored as the seat's pending
//! request and published to that player, after which the game thread blocks on
//! a bounded inbound channel. The [`SeatHandle`] stays with the front ends, which
//! answer through [`SeatHandle::submit`] and read the latest redacted view.
//!
//! Only the game thread consumes the inbound channel and only the game thread
//! publishes requests. A response is accepted while holding the pending slot's
//! lock and the slot is cleared in the same step, so a second answer to the
//! same request is rejected instead of queued.

use crate::events::{Audience, EventBus, RoomEvent};
use crate::room::RoomCode;
use kabo_engine::errors::{GameError, Unresponsive};
use kabo_engine::player::{AgentKind, PlayerId};
use kabo_engine::protocol::{
    Agent, CardReveal, CardUse, Decision, DecisionKind, DecisionRequest, DecisionResponse,
    DrawnCard, Prompt, SpyTarget, SwapTarget, TurnAction,
};
use kabo_engine::view::TableView;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use warp::http::StatusCode;

use crate::errors::IntoErrorResponse;

/// How often a waiting game thread checks whether its seat was disconnected.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("No decision is pending for this seat")]
    NoPendingDecision,
    #[error("Response for request {got} does not match pending request {pending}")]
    StaleResponse { pending: u64, got: u64 },
    #[error("Expected a {expected} answer, got {got}")]
    KindMismatch {
        expected: DecisionKind,
        got: DecisionKind,
    },
    #[error("Seat is disconnected")]
    Disconnected,
    #[error("Seat was taken over by a computer player")]
    Replaced,
    #[error("Game is no longer running")]
    Closed,
}

impl IntoErrorResponse for BridgeError {
    fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::NoPendingDecision
            | BridgeError::StaleResponse { .. }
            | BridgeError::Replaced
            | BridgeError::Closed => StatusCode::CONFLICT,
            BridgeError::KindMismatch { .. } => StatusCode::BAD_REQUEST,
            BridgeError::Disconnected => StatusCode::PRECONDITION_FAILED,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            BridgeError::NoPendingDecision => "no_pending_decision",
            BridgeError::StaleResponse { .. } => "stale_response",
            BridgeError::KindMismatch { .. } => "illegal_decision",
            BridgeError::Disconnected => "seat_disconnected",
            BridgeError::Replaced => "seat_replaced",
            BridgeError::Closed => "game_closed",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            BridgeError::StaleResponse { pending, got } => Some(serde_json::json!({
                "pending_request_id": pending,
                "request_id": got,
            })),
            BridgeError::KindMismatch { expected, got } => Some(serde_json::json!({
                "expected": expected,
                "got": got,
            })),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct SeatShared {
    room: RoomCode,
    name: String,
    player: PlayerId,
    pending: Mutex<Option<DecisionRequest>>,
    latest_view: Mutex<Option<TableView>>,
    disconnected: AtomicBool,
    replaced: AtomicBool,
    inbound: SyncSender<DecisionResponse>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Front-end side of a bridged seat. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SeatHandle {
    shared: Arc<SeatShared>,
}

impl SeatHandle {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn player(&self) -> PlayerId {
        self.shared.player
    }

    pub fn pending(&self) -> Option<DecisionRequest> {
        lock(&self.shared.pending).clone()
    }

    /// The most recent table view published to this seat.
    pub fn latest_view(&self) -> Option<TableView> {
        lock(&self.shared.latest_view).clone()
    }

    pub fn is_disconnected(&self) -> bool {
        self.shared.disconnected.load(Ordering::Acquire)
    }

    pub fn is_replaced(&self) -> bool {
        self.shared.replaced.load(Ordering::Acquire)
    }

    /// Answers the pending request.
    pub fn submit(&self, response: DecisionResponse) -> Result<(), BridgeError> {
        if self.is_replaced() {
            return Err(BridgeError::Replaced);
        }
        if self.is_disconnected() {
            return Err(BridgeError::Disconnected);
        }
        let mut pending = lock(&self.shared.pending);
        let Some(request) = pending.as_ref() else {
            return Err(BridgeError::NoPendingDecision);
        };
        if request.request_id != response.request_id {
            return Err(BridgeError::StaleResponse {
                pending: request.request_id,
                got: response.request_id,
            });
        }
        let got = response.decision.kind();
        if request.kind != got {
            return Err(BridgeError::KindMismatch {
                expected: request.kind,
                got,
            });
        }
        // Queued under the lock: a game thread that gives up waiting either
        // still finds the request pending or finds this answer in the channel.
        self.shared
            .inbound
            .try_send(response)
            .map_err(|_| BridgeError::Closed)?;
        *pending = None;
        Ok(())
    }

    /// Marks the seat unresponsive. A waiting game thread gives up within one poll interval.
    pub fn disconnect(&self) {
        if !self.shared.disconnected.swap(true, Ordering::AcqRel) {
            tracing::info!(room = %self.shared.room, player = self.shared.player, "seat disconnected");
        }
    }

    pub fn reconnect(&self) -> Result<(), BridgeError> {
        if self.is_replaced() {
            return Err(BridgeError::Replaced);
        }
        if self.shared.disconnected.swap(false, Ordering::AcqRel) {
            tracing::info!(room = %self.shared.room, player = self.shared.player, "seat reconnected");
        }
        Ok(())
    }

    /// Records that a computer player now answers for this seat.
    pub fn mark_replaced(&self) {
        self.shared.replaced.store(true, Ordering::Release);
        lock(&self.shared.pending).take();
    }
}

/// Game-thread side of a bridged seat.
#[derive(Debug)]
pub struct BridgedAgent {
    shared: Arc<SeatShared>,
    inbound: Receiver<DecisionResponse>,
    bus: EventBus,
    timeout: Duration,
    next_request: u64,
}

/// Creates both halves of a seat for `name` at `player`.
pub fn seat(
    room: RoomCode,
    name: impl Into<String>,
    player: PlayerId,
    bus: EventBus,
    timeout: Duration,
) -> (BridgedAgent, SeatHandle) {
    let (sender, inbound) = mpsc::sync_channel(1);
    let shared = Arc::new(SeatShared {
        room,
        name: name.into(),
        player,
        pending: Mutex::new(None),
        latest_view: Mutex::new(None),
        disconnected: AtomicBool::new(false),
        replaced: AtomicBool::new(false),
        inbound: sender,
    });
    let agent = BridgedAgent {
        shared: Arc::clone(&shared),
        inbound,
        bus,
        timeout,
        next_request: 0,
    };
    (agent, SeatHandle { shared })
}

impl BridgedAgent {
    fn audience(&self) -> Audience {
        Audience::Player(self.shared.name.clone())
    }

    fn unresponsive(&self, reason: Unresponsive) -> GameError {
        GameError::AgentUnresponsive {
            player: self.shared.player,
            reason,
        }
    }

    /// Publishes a request and blocks until it is answered, the seat
    /// disconnects or the decision timeout passes.
    fn ask(&mut self, view: &TableView, prompt: Prompt<'_>) -> Result<Decision, GameError> {
        if self.shared.disconnected.load(Ordering::Acquire) {
            return Err(self.unresponsive(Unresponsive::Disconnected));
        }

        self.next_request += 1;
        let request = DecisionRequest::new(self.next_request, self.shared.player, view, prompt);
        tracing::debug!(
            room = %self.shared.room,
            player = self.shared.player,
            request_id = request.request_id,
            kind = %request.kind,
            "decision requested"
        );
        *lock(&self.shared.pending) = Some(request.clone());
        self.bus.publish(
            &self.shared.room,
            self.audience(),
            RoomEvent::DecisionRequested {
                room: self.shared.room.clone(),
                request,
            },
        );

        let deadline = Instant::now() + self.timeout;
        loop {
            let wait = deadline
                .saturating_duration_since(Instant::now())
                .min(POLL_INTERVAL);
            match self.inbound.recv_timeout(wait) {
                Ok(response) => return Ok(response.decision),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(self.unresponsive(Unresponsive::Disconnected))
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            let reason = if self.shared.disconnected.load(Ordering::Acquire) {
                Unresponsive::Disconnected
            } else if Instant::now() >= deadline {
                Unresponsive::TimedOut
            } else {
                continue;
            };

            let withdrawn = lock(&self.shared.pending).take().is_some();
            if !withdrawn {
                // Accepted just before we gave up; the answer is already queued.
                if let Ok(response) = self.inbound.try_recv() {
                    return Ok(response.decision);
                }
            }
            tracing::warn!(
                room = %self.shared.room,
                player = self.shared.player,
                %reason,
                "seat did not answer"
            );
            return Err(self.unresponsive(reason));
        }
    }
}

impl Drop for BridgedAgent {
    fn drop(&mut self) {
        lock(&self.shared.pending).take();
    }
}

impl Agent for BridgedAgent {
    fn name(&self) -> &str {
        &self.shared.name
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Network
    }

    fn choose_turn_action(&mut self, view: &TableView) -> Result<TurnAction, GameError> {
        self.ask(view, Prompt::TurnAction)?.into_turn_action()
    }

    fn decide_card_use(&mut self, view: &TableView, drawn: DrawnCard) -> Result<CardUse, GameError> {
        self.ask(view, Prompt::CardUse(drawn))?.into_card_use()
    }

    fn choose_exchange_cards(
        &mut self,
        view: &TableView,
        drawn: DrawnCard,
    ) -> Result<Vec<usize>, GameError> {
        self.ask(view, Prompt::ExchangeCards(drawn))?
            .into_exchange_cards()
    }

    fn choose_new_card_slot(&mut self, view: &TableView, open: &[usize]) -> Result<usize, GameError> {
        self.ask(view, Prompt::NewCardSlot(open))?.into_new_card_slot()
    }

    fn choose_peek_targets(
        &mut self,
        view: &TableView,
        count: usize,
    ) -> Result<Vec<usize>, GameError> {
        self.ask(view, Prompt::PeekTargets(count))?.into_peek_targets()
    }

    fn choose_spy_target(&mut self, view: &TableView) -> Result<SpyTarget, GameError> {
        self.ask(view, Prompt::SpyTarget)?.into_spy_target()
    }

    fn choose_swap_targets(&mut self, view: &TableView) -> Result<SwapTarget, GameError> {
        self.ask(view, Prompt::SwapTargets)?.into_swap_targets()
    }

    fn observe(&mut self, view: &TableView) {
        *lock(&self.shared.latest_view) = Some(view.clone());
        self.bus.publish(
            &self.shared.room,
            self.audience(),
            RoomEvent::StateUpdate {
                room: self.shared.room.clone(),
                view: view.clone(),
            },
        );
    }

    fn card_revealed(&mut self, reveal: &CardReveal) {
        self.bus.publish(
            &self.shared.room,
            self.audience(),
            RoomEvent::CardRevealed {
                room: self.shared.room.clone(),
                reveal: *reveal,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kabo_engine::round::RoundPhase;
    use kabo_engine::view::{CardView, PlayerView};
    use std::thread;

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
                    name: "ALICE".into(),
                    score: 0,
                    called_kabo: false,
                    cards: cards(4),
                },
                PlayerView {
                    id: 1,
                    name: "BOB".into(),
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

    fn bridged(timeout: Duration) -> (BridgedAgent, SeatHandle, EventBus) {
        let bus = EventBus::new();
        let (agent, handle) = seat("ROOM1".into(), "ALICE", 0, bus.clone(), timeout);
        (agent, handle, bus)
    }

    fn wait_for_request(handle: &SeatHandle) -> DecisionRequest {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(request) = handle.pending() {
                return request;
            }
            assert!(Instant::now() < deadline, "no request was published");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn answer_reaches_the_game_thread() {
        let (mut agent, handle, _bus) = bridged(Duration::from_secs(5));
        let game = thread::spawn(move || agent.choose_turn_action(&view()));

        let request = wait_for_request(&handle);
        assert_eq!(request.kind, DecisionKind::ChooseTurnAction);
        handle
            .submit(DecisionResponse {
                request_id: request.request_id,
                decision: Decision::ChooseTurnAction(TurnAction::DrawFromDeck),
            })
            .expect("accepted");

        assert_eq!(game.join().expect("join"), Ok(TurnAction::DrawFromDeck));
        assert!(handle.pending().is_none());
    }

    #[test]
    fn second_answer_is_rejected() {
        let (mut agent, handle, _bus) = bridged(Duration::from_secs(5));
        let game = thread::spawn(move || agent.choose_turn_action(&view()));

        let request = wait_for_request(&handle);
        let response = DecisionResponse {
            request_id: request.request_id,
            decision: Decision::ChooseTurnAction(TurnAction::CallKabo),
        };
        handle.submit(response.clone()).expect("first answer");
        assert_eq!(handle.submit(response), Err(BridgeError::NoPendingDecision));
        assert_eq!(game.join().expect("join"), Ok(TurnAction::CallKabo));
    }

    #[test]
    fn mismatched_answers_are_rejected_without_consuming_the_request() {
        let (mut agent, handle, _bus) = bridged(Duration::from_secs(5));
        let game = thread::spawn(move || agent.choose_peek_targets(&view(), 2));

        let request = wait_for_request(&handle);
        assert_eq!(
            handle.submit(DecisionResponse {
                request_id: request.request_id + 1,
                decision: Decision::ChoosePeekTargets(vec![0, 1]),
            }),
            Err(BridgeError::StaleResponse {
                pending: request.request_id,
                got: request.request_id + 1,
            })
        );
        assert!(matches!(
            handle.submit(DecisionResponse {
                request_id: request.request_id,
                decision: Decision::ChooseNewCardSlot(0),
            }),
            Err(BridgeError::KindMismatch { .. })
        ));
        assert!(handle.pending().is_some());

        handle
            .submit(DecisionResponse {
                request_id: request.request_id,
                decision: Decision::ChoosePeekTargets(vec![0, 1]),
            })
            .expect("accepted");
        assert_eq!(game.join().expect("join"), Ok(vec![0, 1]));
    }

    #[test]
    fn nothing_pending_is_rejected() {
        let (_agent, handle, _bus) = bridged(Duration::from_secs(5));
        let result = handle.submit(DecisionResponse {
            request_id: 1,
            decision: Decision::ChooseTurnAction(TurnAction::DrawFromDeck),
        });
        assert_eq!(result, Err(BridgeError::NoPendingDecision));
    }

    #[test]
    fn timeout_makes_the_seat_unresponsive() {
        let (mut agent, handle, _bus) = bridged(Duration::from_millis(120));
        let result = agent.choose_spy_target(&view());
        assert_eq!(
            result,
            Err(GameError::AgentUnresponsive {
                player: 0,
                reason: Unresponsive::TimedOut,
            })
        );
        assert!(handle.pending().is_none());
    }

    #[test]
    fn disconnect_wakes_a_waiting_game_thread() {
        let (mut agent, handle, _bus) = bridged(Duration::from_secs(30));
        let game = thread::spawn(move || agent.choose_turn_action(&view()));
        wait_for_request(&handle);

        let started = Instant::now();
        handle.disconnect();
        let result = game.join().expect("join");
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(
            result,
            Err(GameError::AgentUnresponsive {
                reason: Unresponsive::Disconnected,
                ..
            })
        ));
        assert_eq!(
            handle.submit(DecisionResponse {
                request_id: 1,
                decision: Decision::ChooseTurnAction(TurnAction::DrawFromDeck),
            }),
            Err(BridgeError::Disconnected)
        );
    }

    #[test]
    fn replaced_seat_cannot_reconnect() {
        let (_agent, handle, _bus) = bridged(Duration::from_secs(1));
        handle.disconnect();
        handle.mark_replaced();
        assert_eq!(handle.reconnect(), Err(BridgeError::Replaced));
    }

    #[test]
    fn requests_and_views_go_only_to_the_seat() {
        let (mut agent, handle, bus) = bridged(Duration::from_millis(60));
        let mut alice = bus.subscribe("ROOM1".into(), Some("ALICE".into()));
        let mut bob = bus.subscribe("ROOM1".into(), Some("BOB".into()));

        agent.observe(&view());
        let _ = agent.choose_turn_action(&view());

        assert!(matches!(alice.receiver.try_recv(), Ok(RoomEvent::StateUpdate { .. })));
        assert!(matches!(
            alice.receiver.try_recv(),
            Ok(RoomEvent::DecisionRequested { .. })
        ));
        assert!(bob.receiver.try_recv().is_err());
        assert_eq!(handle.latest_view().map(|v| v.round), Some(1));
    }
}
