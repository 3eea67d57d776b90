use crate::ai::{create_ai, AI_KINDS};
use crate::bridge::{self, BridgeError, SeatHandle};
use crate::errors::{ErrorSeverity, IntoErrorResponse};
use crate::events::{Audience, EventBus, EventSubscription, RoomEvent, SeatInfo};
use crate::session::{GameSession, SessionPlan, SessionStatus};
use crate::settings::{AppSettings, SettingsError, SettingsStore, UnresponsivePolicy};
use kabo_engine::game::GameConfig;
use kabo_engine::player::AgentKind;
use kabo_engine::protocol::{Agent, DecisionRequest, DecisionResponse};
use kabo_engine::rules::{IllegalDecisionPolicy, Rules};
use kabo_engine::view::TableView;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;
use warp::http::StatusCode;

/// Short shareable room identifier, upper-case letters and digits.
pub type RoomCode = String;

/// Secret handed to whoever takes a seat. Every seat operation must present it.
pub type SeatToken = Uuid;

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_NAME_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room {0} not found")]
    RoomNotFound(RoomCode),
    #[error("Room {code} is full ({max} seats)")]
    RoomFull { code: RoomCode, max: usize },
    #[error("Name {0} is already taken in this room")]
    DuplicateName(String),
    #[error("Invalid player name: {0}")]
    InvalidName(String),
    #[error("No player named {0} in this room")]
    UnknownPlayer(String),
    #[error("Seat token does not match player {0}")]
    InvalidToken(String),
    #[error("Seat of {0} is held by another connection")]
    SeatInUse(String),
    #[error("At least 2 players are needed, the room has {have}")]
    NotEnoughPlayers { have: usize },
    #[error("Room {0} has already started")]
    AlreadyStarted(RoomCode),
    #[error("Room {0} has not started")]
    NotStarted(RoomCode),
    #[error("Invalid room configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Failed to start the game thread: {0}")]
    Spawn(String),
    #[error("Room storage poisoned")]
    StoragePoisoned,
}

impl IntoErrorResponse for RoomError {
    fn status_code(&self) -> StatusCode {
        match self {
            RoomError::RoomNotFound(_) | RoomError::UnknownPlayer(_) => StatusCode::NOT_FOUND,
            RoomError::InvalidToken(_) => StatusCode::FORBIDDEN,
            RoomError::RoomFull { .. }
            | RoomError::DuplicateName(_)
            | RoomError::SeatInUse(_)
            | RoomError::NotEnoughPlayers { .. }
            | RoomError::AlreadyStarted(_)
            | RoomError::NotStarted(_) => StatusCode::CONFLICT,
            RoomError::InvalidName(_) | RoomError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            RoomError::Bridge(e) => e.status_code(),
            RoomError::Settings(e) => e.status_code(),
            RoomError::Spawn(_) | RoomError::StoragePoisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            RoomError::RoomNotFound(_) => "room_not_found",
            RoomError::RoomFull { .. } => "room_full",
            RoomError::DuplicateName(_) => "duplicate_name",
            RoomError::InvalidName(_) => "invalid_name",
            RoomError::UnknownPlayer(_) => "unknown_player",
            RoomError::InvalidToken(_) => "invalid_seat_token",
            RoomError::SeatInUse(_) => "seat_in_use",
            RoomError::NotEnoughPlayers { .. } => "not_enough_players",
            RoomError::AlreadyStarted(_) => "already_started",
            RoomError::NotStarted(_) => "not_started",
            RoomError::InvalidConfig(_) => "invalid_config",
            RoomError::Bridge(e) => e.error_code(),
            RoomError::Settings(e) => e.error_code(),
            RoomError::Spawn(_) => "spawn_failed",
            RoomError::StoragePoisoned => "room_storage_error",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            RoomError::RoomNotFound(code) => Some(serde_json::json!({ "room": code })),
            RoomError::RoomFull { code, max } => {
                Some(serde_json::json!({ "room": code, "max_players": max }))
            }
            RoomError::DuplicateName(name) => Some(serde_json::json!({ "name": name })),
            RoomError::Bridge(e) => e.error_details(),
            _ => None,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            RoomError::StoragePoisoned => ErrorSeverity::Critical,
            RoomError::Spawn(_) => ErrorSeverity::Server,
            RoomError::Settings(e) => e.severity(),
            _ => ErrorSeverity::Client,
        }
    }
}

/// Options fixed when a room is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomConfig {
    /// Seats including computer players (2-4)
    pub max_players: usize,
    /// Computer players seated after the humans
    pub ai_players: usize,
    pub ai_kind: String,
    pub seed: Option<u64>,
    pub rules: Rules,
    pub illegal_decision: IllegalDecisionPolicy,
}

impl RoomConfig {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            max_players: settings.max_players,
            ai_players: 0,
            ai_kind: settings.ai_kind.clone(),
            seed: None,
            rules: Rules::default(),
            illegal_decision: IllegalDecisionPolicy::default(),
        }
    }

    pub fn validate(&self) -> Result<(), RoomError> {
        if !(2..=4).contains(&self.max_players) {
            return Err(RoomError::InvalidConfig(
                "max_players must be between 2 and 4".into(),
            ));
        }
        if self.ai_players >= self.max_players {
            return Err(RoomError::InvalidConfig(
                "ai_players must leave a seat for the host".into(),
            ));
        }
        if !AI_KINDS.contains(&self.ai_kind.as_str()) {
            return Err(RoomError::InvalidConfig(format!(
                "unknown ai kind '{}'",
                self.ai_kind
            )));
        }
        self.rules
            .validate()
            .map_err(|e| RoomError::InvalidConfig(e.to_string()))
    }

    fn human_seats(&self) -> usize {
        self.max_players - self.ai_players
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Lobby,
    Running,
    Finished,
    Terminated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerSummary {
    pub name: String,
    pub connected: bool,
    /// A computer player took over this seat.
    pub replaced: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub status: RoomStatus,
    pub host: String,
    pub players: Vec<PlayerSummary>,
    pub config: RoomConfig,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionStatus>,
}

/// What a player gets back for taking a seat. The token is shown only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatTicket {
    pub name: String,
    pub token: SeatToken,
    pub room: RoomInfo,
}

/// A seat held by one live connection until [`RoomManager::detach`].
#[derive(Debug)]
pub struct SeatAttachment {
    pub name: String,
    pub claim: u64,
    pub room: RoomInfo,
    pub events: EventSubscription,
}

#[derive(Debug)]
struct Room {
    code: RoomCode,
    config: RoomConfig,
    policy: UnresponsivePolicy,
    decision_timeout: Duration,
    created_at: chrono::DateTime<chrono::Utc>,
    players: Vec<String>,
    tokens: HashMap<String, SeatToken>,
    /// Connection currently holding each seat.
    claims: HashMap<String, u64>,
    handles: HashMap<String, SeatHandle>,
    session: Option<GameSession>,
}

impl Room {
    fn status(&self) -> RoomStatus {
        match self.session.as_ref().map(GameSession::status) {
            None => RoomStatus::Lobby,
            Some(SessionStatus::Running { .. }) => RoomStatus::Running,
            Some(SessionStatus::Finished { .. }) => RoomStatus::Finished,
            Some(SessionStatus::Terminated { .. }) => RoomStatus::Terminated,
        }
    }

    fn info(&self) -> RoomInfo {
        let players = self
            .players
            .iter()
            .map(|name| match self.handles.get(name) {
                Some(handle) => PlayerSummary {
                    name: name.clone(),
                    connected: !handle.is_disconnected(),
                    replaced: handle.is_replaced(),
                },
                None => PlayerSummary {
                    name: name.clone(),
                    connected: true,
                    replaced: false,
                },
            })
            .collect();
        RoomInfo {
            code: self.code.clone(),
            status: self.status(),
            host: self.players.first().cloned().unwrap_or_default(),
            players,
            config: self.config.clone(),
            created_at: self.created_at.to_rfc3339(),
            game_id: self.session.as_ref().map(GameSession::id),
            session: self.session.as_ref().map(GameSession::status),
        }
    }

    fn authorize(&self, name: &str, token: &SeatToken) -> Result<(), RoomError> {
        if !self.players.iter().any(|p| p == name) {
            return Err(RoomError::UnknownPlayer(name.to_string()));
        }
        match self.tokens.get(name) {
            Some(expected) if expected == token => Ok(()),
            _ => Err(RoomError::InvalidToken(name.to_string())),
        }
    }

    fn seat(&mut self, name: String) -> SeatTicket {
        let token = Uuid::new_v4();
        self.tokens.insert(name.clone(), token);
        self.players.push(name.clone());
        SeatTicket {
            name,
            token,
            room: self.info(),
        }
    }

    fn handle(&self, name: &str) -> Result<&SeatHandle, RoomError> {
        if self.session.is_none() {
            return Err(RoomError::NotStarted(self.code.clone()));
        }
        self.handles
            .get(name)
            .ok_or_else(|| RoomError::UnknownPlayer(name.to_string()))
    }

    /// Names for computer seats that do not clash with the humans.
    fn ai_names(&self) -> Vec<String> {
        (1..)
            .map(|i| format!("AI{i}"))
            .filter(|name| !self.players.contains(name))
            .take(self.config.ai_players)
            .collect()
    }
}

/// Trims and upper-cases a player name.
pub fn normalize_name(raw: &str) -> Result<String, RoomError> {
    let name = raw.trim().to_uppercase();
    if name.is_empty() {
        return Err(RoomError::InvalidName("name must not be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(RoomError::InvalidName(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name)
}

fn normalize_code(raw: &str) -> RoomCode {
    raw.trim().to_uppercase()
}

fn generate_code(length: usize) -> RoomCode {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())]))
        .collect()
}

fn lock(room: &Mutex<Room>) -> MutexGuard<'_, Room> {
    room.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Registry of rooms. Only lifecycle operations take the registry lock; decisions
/// go straight to the seat handles.
#[derive(Debug)]
pub struct RoomManager {
    rooms: RwLock<HashMap<RoomCode, Arc<Mutex<Room>>>>,
    bus: EventBus,
    settings: Arc<SettingsStore>,
    next_claim: AtomicU64,
}

impl RoomManager {
    pub fn new(bus: EventBus, settings: Arc<SettingsStore>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            bus,
            settings,
            next_claim: AtomicU64::new(1),
        }
    }

    pub fn event_bus(&self) -> EventBus {
        self.bus.clone()
    }

    pub fn settings(&self) -> Result<AppSettings, RoomError> {
        Ok(self.settings.get()?)
    }

    fn room(&self, code: &str) -> Result<Arc<Mutex<Room>>, RoomError> {
        let code = normalize_code(code);
        let guard = self.rooms.read().map_err(|_| RoomError::StoragePoisoned)?;
        guard
            .get(&code)
            .cloned()
            .ok_or(RoomError::RoomNotFound(code))
    }

    /// Opens a lobby with the host in the first seat.
    pub fn create_room(&self, host: &str, config: RoomConfig) -> Result<SeatTicket, RoomError> {
        let host = normalize_name(host)?;
        config.validate()?;
        let settings = self.settings.get()?;

        let mut guard = self.rooms.write().map_err(|_| RoomError::StoragePoisoned)?;
        let code = loop {
            let candidate = generate_code(settings.room_code_length);
            if !guard.contains_key(&candidate) {
                break candidate;
            }
        };
        let mut room = Room {
            code: code.clone(),
            config,
            policy: settings.unresponsive_policy,
            decision_timeout: settings.decision_timeout(),
            created_at: chrono::Utc::now(),
            players: Vec::new(),
            tokens: HashMap::new(),
            claims: HashMap::new(),
            handles: HashMap::new(),
            session: None,
        };
        let ticket = room.seat(host.clone());
        guard.insert(code.clone(), Arc::new(Mutex::new(room)));
        drop(guard);

        tracing::info!(room = %code, host = %host, "room created");
        Ok(ticket)
    }

    pub fn join_room(&self, code: &str, name: &str) -> Result<SeatTicket, RoomError> {
        let name = normalize_name(name)?;
        let room = self.room(code)?;
        let mut room = lock(&room);
        if room.session.is_some() {
            return Err(RoomError::AlreadyStarted(room.code.clone()));
        }
        if room.players.contains(&name) {
            return Err(RoomError::DuplicateName(name));
        }
        if room.players.len() >= room.config.human_seats() {
            return Err(RoomError::RoomFull {
                code: room.code.clone(),
                max: room.config.max_players,
            });
        }
        let ticket = room.seat(name.clone());
        tracing::info!(room = %room.code, player = %name, "player joined");
        self.bus.publish(
            &room.code,
            Audience::Everyone,
            RoomEvent::PlayerJoined {
                room: room.code.clone(),
                name,
                players: room.players.clone(),
            },
        );
        Ok(ticket)
    }

    /// Leaves the lobby, or disconnects the seat of a running game.
    /// A lobby left empty is closed.
    pub fn leave_room(
        &self,
        code: &str,
        name: &str,
        token: &SeatToken,
    ) -> Result<RoomInfo, RoomError> {
        let name = normalize_name(name)?;
        let room = self.room(code)?;
        let mut room = lock(&room);
        room.authorize(&name, token)?;
        room.claims.remove(&name);
        self.release(room, name)
    }

    /// Marks a disconnected seat of a running game as back.
    pub fn reconnect(
        &self,
        code: &str,
        name: &str,
        token: &SeatToken,
    ) -> Result<RoomInfo, RoomError> {
        let name = normalize_name(name)?;
        let room = self.room(code)?;
        let room = lock(&room);
        room.authorize(&name, token)?;
        self.resume(&room, &name)?;
        Ok(room.info())
    }

    /// Binds a seat to one live connection and subscribes it to the seat's events.
    ///
    /// Fails with `SeatInUse` while another connection holds the seat, so a
    /// second connection can neither read the seat's private events nor answer
    /// for it.
    pub fn attach(
        &self,
        code: &str,
        name: &str,
        token: &SeatToken,
    ) -> Result<SeatAttachment, RoomError> {
        let name = normalize_name(name)?;
        let room = self.room(code)?;
        let mut room = lock(&room);
        room.authorize(&name, token)?;
        if room.claims.contains_key(&name) {
            return Err(RoomError::SeatInUse(name));
        }
        self.resume(&room, &name)?;

        let claim = self.next_claim.fetch_add(1, Ordering::Relaxed);
        room.claims.insert(name.clone(), claim);
        let events = self.bus.subscribe(room.code.clone(), Some(name.clone()));
        tracing::debug!(room = %room.code, player = %name, claim, "seat attached");
        Ok(SeatAttachment {
            name,
            claim,
            room: room.info(),
            events,
        })
    }

    /// Releases a seat held by `claim`, as [`leave_room`](Self::leave_room) does.
    /// Returns `None` when the seat has since been left or claimed again.
    pub fn detach(&self, code: &str, name: &str, claim: u64) -> Result<Option<RoomInfo>, RoomError> {
        let room = self.room(code)?;
        let mut room = lock(&room);
        if room.claims.get(name) != Some(&claim) {
            return Ok(None);
        }
        room.claims.remove(name);
        self.release(room, name.to_string()).map(Some)
    }

    fn resume(&self, room: &Room, name: &str) -> Result<(), RoomError> {
        if room.session.is_none() {
            return Ok(());
        }
        let handle = room.handle(name)?;
        if handle.is_replaced() {
            return Err(BridgeError::Replaced.into());
        }
        if handle.is_disconnected() {
            handle.reconnect()?;
            tracing::info!(room = %room.code, player = %name, "player reconnected");
            self.bus.publish(
                &room.code,
                Audience::Everyone,
                RoomEvent::PlayerReconnected {
                    room: room.code.clone(),
                    name: name.to_string(),
                },
            );
        }
        Ok(())
    }

    fn release(&self, mut room: MutexGuard<'_, Room>, name: String) -> Result<RoomInfo, RoomError> {
        if room.session.is_some() {
            let handle = room.handle(&name)?;
            if !handle.is_disconnected() {
                handle.disconnect();
                self.bus.publish(
                    &room.code,
                    Audience::Everyone,
                    RoomEvent::PlayerDisconnected {
                        room: room.code.clone(),
                        name,
                    },
                );
            }
            return Ok(room.info());
        }

        room.players.retain(|p| p != &name);
        room.tokens.remove(&name);
        tracing::info!(room = %room.code, player = %name, "player left");
        self.bus.publish(
            &room.code,
            Audience::Everyone,
            RoomEvent::PlayerLeft {
                room: room.code.clone(),
                name,
                players: room.players.clone(),
            },
        );
        let info = room.info();
        if room.players.is_empty() {
            let code = room.code.clone();
            drop(room);
            self.teardown_room(&code)?;
        }
        Ok(info)
    }

    /// Seats the humans in join order followed by the computer players and
    /// starts the game thread.
    pub fn start_room(&self, code: &str) -> Result<RoomInfo, RoomError> {
        let room = self.room(code)?;
        let mut room = lock(&room);
        if room.session.is_some() {
            return Err(RoomError::AlreadyStarted(room.code.clone()));
        }
        let total = room.players.len() + room.config.ai_players;
        if total < 2 {
            return Err(RoomError::NotEnoughPlayers { have: total });
        }

        let mut agents: Vec<Box<dyn Agent + Send>> = Vec::with_capacity(total);
        let mut seats = Vec::with_capacity(total);
        let mut handles = Vec::with_capacity(total);
        for (id, name) in room.players.iter().enumerate() {
            let (agent, handle) = bridge::seat(
                room.code.clone(),
                name.clone(),
                id,
                self.bus.clone(),
                room.decision_timeout,
            );
            agents.push(Box::new(agent));
            seats.push(SeatInfo {
                id,
                name: name.clone(),
                kind: AgentKind::Network,
            });
            handles.push(Some(handle));
        }
        for name in room.ai_names() {
            let id = seats.len();
            let seed = room.config.seed.map(|s| s.wrapping_add(id as u64));
            agents.push(create_ai(&room.config.ai_kind, &name, seed));
            seats.push(SeatInfo {
                id,
                name,
                kind: AgentKind::Ai,
            });
            handles.push(None);
        }

        room.handles = handles
            .iter()
            .flatten()
            .map(|h| (h.name().to_string(), h.clone()))
            .collect();
        let plan = SessionPlan {
            room: room.code.clone(),
            config: GameConfig {
                rules: room.config.rules,
                illegal_decision: room.config.illegal_decision,
                seed: room.config.seed,
            },
            agents,
            seats,
            handles,
            policy: room.policy,
            ai_kind: room.config.ai_kind.clone(),
        };
        let session = GameSession::spawn(plan, self.bus.clone())
            .map_err(|e| RoomError::Spawn(e.to_string()))?;
        tracing::info!(room = %room.code, game_id = %session.id(), players = total, "room started");
        room.session = Some(session);
        Ok(room.info())
    }

    pub fn submit_decision(
        &self,
        code: &str,
        name: &str,
        token: &SeatToken,
        response: DecisionResponse,
    ) -> Result<(), RoomError> {
        let handle = self.seat_handle(code, name, token)?;
        handle.submit(response)?;
        Ok(())
    }

    pub fn pending_decision(
        &self,
        code: &str,
        name: &str,
        token: &SeatToken,
    ) -> Result<Option<DecisionRequest>, RoomError> {
        Ok(self.seat_handle(code, name, token)?.pending())
    }

    pub fn latest_view(
        &self,
        code: &str,
        name: &str,
        token: &SeatToken,
    ) -> Result<Option<TableView>, RoomError> {
        Ok(self.seat_handle(code, name, token)?.latest_view())
    }

    fn seat_handle(
        &self,
        code: &str,
        name: &str,
        token: &SeatToken,
    ) -> Result<SeatHandle, RoomError> {
        let name = normalize_name(name)?;
        let room = self.room(code)?;
        let room = lock(&room);
        room.authorize(&name, token)?;
        room.handle(&name).cloned()
    }

    pub fn room_info(&self, code: &str) -> Result<RoomInfo, RoomError> {
        let room = self.room(code)?;
        let room = lock(&room);
        Ok(room.info())
    }

    /// Subscribes to a seat's events, private ones included.
    pub fn subscribe_seat(
        &self,
        code: &str,
        name: &str,
        token: &SeatToken,
    ) -> Result<EventSubscription, RoomError> {
        let name = normalize_name(name)?;
        let room = self.room(code)?;
        let room = lock(&room);
        room.authorize(&name, token)?;
        Ok(self.bus.subscribe(room.code.clone(), Some(name)))
    }

    /// Subscribes to the public events of a room.
    pub fn spectate(&self, code: &str) -> Result<EventSubscription, RoomError> {
        let room = self.room(code)?;
        let room = lock(&room);
        Ok(self.bus.subscribe(room.code.clone(), None))
    }

    /// Removes the room, stops its game and closes every subscription.
    pub fn teardown_room(&self, code: &str) -> Result<(), RoomError> {
        let code = normalize_code(code);
        let removed = {
            let mut guard = self.rooms.write().map_err(|_| RoomError::StoragePoisoned)?;
            guard.remove(&code)
        };
        let Some(room) = removed else {
            return Err(RoomError::RoomNotFound(code));
        };

        let session = lock(&room).session.take();
        // A running game announces its own closing when it notices the cancel.
        let announce = match session {
            Some(session) => {
                let was_running = session.is_running();
                session.cancel();
                session.join();
                !was_running
            }
            None => true,
        };
        if announce {
            self.bus.publish(
                &code,
                Audience::Everyone,
                RoomEvent::RoomClosed {
                    room: code.clone(),
                    reason: "room closed".into(),
                },
            );
        }
        self.bus.drop_room(&code);
        tracing::info!(room = %code, "room closed");
        Ok(())
    }

    /// Closes rooms whose game has finished or was terminated.
    pub fn cleanup_finished(&self) -> Vec<RoomCode> {
        let done: Vec<RoomCode> = match self.rooms.read() {
            Ok(guard) => guard
                .iter()
                .filter(|(_, room)| {
                    matches!(
                        lock(room).status(),
                        RoomStatus::Finished | RoomStatus::Terminated
                    )
                })
                .map(|(code, _)| code.clone())
                .collect(),
            Err(_) => return Vec::new(),
        };
        for code in &done {
            if let Err(e) = self.teardown_room(code) {
                tracing::warn!(room = %code, error = %e, "cleanup failed");
            }
        }
        done
    }

    pub fn active_rooms(&self) -> Vec<RoomCode> {
        match self.rooms.read() {
            Ok(guard) => guard.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}
