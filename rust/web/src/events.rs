use crate::room::RoomCode;
use kabo_engine::errors::Unresponsive;
use kabo_engine::game::GameSummary;
use kabo_engine::player::{AgentKind, PlayerId};
use kabo_engine::protocol::{CardReveal, DecisionRequest};
use kabo_engine::round::RoundOutcome;
use kabo_engine::view::TableView;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use uuid::Uuid;

// A subscriber whose buffer fills up is dropped rather than slowing the game thread.
const EVENT_CHANNEL_BUFFER: usize = 1000;

pub type EventSender = mpsc::Sender<RoomEvent>;
pub type EventReceiver = mpsc::Receiver<RoomEvent>;

/// Who may receive an event. Player-addressed events carry private data
/// (redacted views, pending decisions, revealed cards) and never reach anyone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    Player(String),
}

impl Audience {
    fn admits(&self, viewer: Option<&str>) -> bool {
        match self {
            Audience::Everyone => true,
            Audience::Player(name) => viewer == Some(name.as_str()),
        }
    }
}

pub struct EventSubscription {
    bus: EventBus,
    room: RoomCode,
    subscriber_id: usize,
    pub receiver: EventReceiver,
}

impl EventSubscription {
    pub fn receiver(&mut self) -> &mut EventReceiver {
        &mut self.receiver
    }
}

impl std::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("room", &self.room)
            .field("subscriber_id", &self.subscriber_id)
            .finish()
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.room, self.subscriber_id);
    }
}

#[derive(Debug, Clone)]
struct Subscriber {
    id: usize,
    viewer: Option<String>,
    sender: EventSender,
}

#[derive(Debug, Clone, Default)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

#[derive(Debug, Default)]
struct EventBusInner {
    subscribers: RwLock<HashMap<RoomCode, Vec<Subscriber>>>,
    next_id: AtomicUsize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<RoomCode, Vec<Subscriber>>> {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<RoomCode, Vec<Subscriber>>> {
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribes to a room's events. `viewer: None` is a spectator and only
    /// receives events addressed to everyone.
    pub fn subscribe(&self, room: RoomCode, viewer: Option<String>) -> EventSubscription {
        let (subscriber_id, receiver) = self.subscribe_raw(room.clone(), viewer);
        EventSubscription {
            bus: self.clone(),
            room,
            subscriber_id,
            receiver,
        }
    }

    fn subscribe_raw(&self, room: RoomCode, viewer: Option<String>) -> (usize, EventReceiver) {
        let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_BUFFER);
        let id = self.inner.next_id.fetch_add(1, Ordering::AcqRel);
        tracing::info!(
            room = %room,
            subscriber_id = id,
            viewer = viewer.as_deref().unwrap_or("spectator"),
            "client subscribed to room events"
        );
        self.write()
            .entry(room)
            .or_default()
            .push(Subscriber { id, viewer, sender });
        (id, receiver)
    }

    /// Delivers `event` to every subscriber `audience` admits, in publish order.
    pub fn publish(&self, room: &RoomCode, audience: Audience, event: RoomEvent) {
        tracing::debug!(room = %room, event = event.name(), audience = ?audience, "publishing room event");

        let targets: Vec<Subscriber> = match self.read().get(room) {
            Some(list) => list
                .iter()
                .filter(|s| audience.admits(s.viewer.as_deref()))
                .cloned()
                .collect(),
            None => return,
        };

        let mut failed = Vec::new();
        for subscriber in targets {
            if let Err(e) = subscriber.sender.try_send(event.clone()) {
                tracing::warn!(
                    room = %room,
                    subscriber_id = subscriber.id,
                    error = %e,
                    "dropping subscriber"
                );
                failed.push(subscriber.id);
            }
        }
        if !failed.is_empty() {
            self.remove_subscribers(room, &failed);
        }
    }

    pub fn unsubscribe(&self, room: &RoomCode, subscriber_id: usize) {
        self.remove_subscribers(room, &[subscriber_id]);
    }

    pub fn drop_room(&self, room: &RoomCode) {
        self.write().remove(room);
    }

    pub fn subscriber_count(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    pub fn room_subscriber_count(&self, room: &RoomCode) -> usize {
        self.read().get(room).map(Vec::len).unwrap_or(0)
    }

    fn remove_subscribers(&self, room: &RoomCode, ids: &[usize]) {
        let mut guard = self.write();
        if let Some(list) = guard.get_mut(room) {
            list.retain(|s| !ids.contains(&s.id));
            if list.is_empty() {
                guard.remove(room);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInfo {
    pub id: PlayerId,
    pub name: String,
    pub kind: AgentKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    PlayerJoined {
        room: RoomCode,
        name: String,
        players: Vec<String>,
    },
    PlayerLeft {
        room: RoomCode,
        name: String,
        players: Vec<String>,
    },
    PlayerDisconnected {
        room: RoomCode,
        name: String,
    },
    PlayerReconnected {
        room: RoomCode,
        name: String,
    },
    GameStarted {
        room: RoomCode,
        game_id: Uuid,
        seats: Vec<SeatInfo>,
    },
    StateUpdate {
        room: RoomCode,
        view: TableView,
    },
    DecisionRequested {
        room: RoomCode,
        request: DecisionRequest,
    },
    CardRevealed {
        room: RoomCode,
        reveal: CardReveal,
    },
    RoundEnded {
        room: RoomCode,
        outcome: RoundOutcome,
        totals: Vec<u32>,
        reprieved: Vec<PlayerId>,
    },
    GameEnded {
        room: RoomCode,
        summary: GameSummary,
    },
    AgentReplaced {
        room: RoomCode,
        player: PlayerId,
        name: String,
        reason: Unresponsive,
    },
    RoomClosed {
        room: RoomCode,
        reason: String,
    },
}

impl RoomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::PlayerJoined { .. } => "player_joined",
            RoomEvent::PlayerLeft { .. } => "player_left",
            RoomEvent::PlayerDisconnected { .. } => "player_disconnected",
            RoomEvent::PlayerReconnected { .. } => "player_reconnected",
            RoomEvent::GameStarted { .. } => "game_started",
            RoomEvent::StateUpdate { .. } => "state_update",
            RoomEvent::DecisionRequested { .. } => "decision_requested",
            RoomEvent::CardRevealed { .. } => "card_revealed",
            RoomEvent::RoundEnded { .. } => "round_ended",
            RoomEvent::GameEnded { .. } => "game_ended",
            RoomEvent::AgentReplaced { .. } => "agent_replaced",
            RoomEvent::RoomClosed { .. } => "room_closed",
        }
    }
}
