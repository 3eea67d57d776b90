use crate::errors::IntoErrorResponse;
use crate::room::{RoomConfig, RoomError, RoomManager, SeatToken};
use kabo_engine::protocol::DecisionResponse;
use kabo_engine::rules::{IllegalDecisionPolicy, Rules};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub host: String,
    pub max_players: Option<usize>,
    pub ai_players: Option<usize>,
    pub ai_kind: Option<String>,
    pub seed: Option<u64>,
    pub rules: Option<Rules>,
    pub illegal_decision: Option<IllegalDecisionPolicy>,
}

impl CreateRoomRequest {
    fn into_config(self, defaults: RoomConfig) -> (String, RoomConfig) {
        let config = RoomConfig {
            max_players: self.max_players.unwrap_or(defaults.max_players),
            ai_players: self.ai_players.unwrap_or(defaults.ai_players),
            ai_kind: self.ai_kind.unwrap_or(defaults.ai_kind),
            seed: self.seed.or(defaults.seed),
            rules: self.rules.unwrap_or(defaults.rules),
            illegal_decision: self.illegal_decision.unwrap_or(defaults.illegal_decision),
        };
        (self.host, config)
    }
}

/// Header carrying the seat token on the per-player routes.
pub const SEAT_TOKEN_HEADER: &str = "x-seat-token";

#[derive(Debug, Deserialize)]
pub struct PlayerRequest {
    pub name: String,
}

/// Body of the routes that act on an existing seat.
#[derive(Debug, Deserialize)]
pub struct SeatRequest {
    pub name: String,
    pub token: SeatToken,
}

#[derive(Debug, Serialize)]
pub struct RoomListResponse {
    pub rooms: Vec<String>,
}

/// Creates a room in the lobby state with the host seated first.
///
/// # HTTP Method and Path
/// - **Method**: POST
/// - **Path**: `/api/rooms`
///
/// # Request Format
/// ```json
/// {
///   "host": "alice",
///   "max_players": 3,     // Optional: seats including computer players
///   "ai_players": 1,      // Optional: computer seats filled at start
///   "ai_kind": "baseline",
///   "seed": 42
/// }
/// ```
///
/// Omitted fields take the server's current settings.
///
/// # Response Format
/// - **Success (201 Created)**: `SeatTicket` JSON with the host's seat token and
///   the room, including the generated room code
/// - **Error (400)**: `invalid_name` or `invalid_config`
pub async fn create_room(rooms: Arc<RoomManager>, request: CreateRoomRequest) -> Response {
    let defaults = match rooms.settings() {
        Ok(settings) => RoomConfig::from_settings(&settings),
        Err(err) => return room_error(err),
    };
    let (host, config) = request.into_config(defaults);
    match rooms.create_room(&host, config) {
        Ok(ticket) => success_response(StatusCode::CREATED, ticket),
        Err(err) => room_error(err),
    }
}

pub async fn list_rooms(rooms: Arc<RoomManager>) -> Response {
    let mut codes = rooms.active_rooms();
    codes.sort();
    success_response(StatusCode::OK, RoomListResponse { rooms: codes })
}

pub async fn get_room(rooms: Arc<RoomManager>, code: String) -> Response {
    match rooms.room_info(&code) {
        Ok(info) => success_response(StatusCode::OK, info),
        Err(err) => room_error(err),
    }
}

/// Stops the room's game, if any, and closes every event stream of the room.
/// Waiting for the game thread happens off the async workers.
pub async fn delete_room(rooms: Arc<RoomManager>, code: String) -> Response {
    match tokio::task::spawn_blocking(move || rooms.teardown_room(&code)).await {
        Ok(Ok(())) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(err)) => room_error(err),
        Err(err) => task_failed(err),
    }
}

/// Takes a lobby seat. The response carries the seat token the other seat
/// routes require.
pub async fn join_room(rooms: Arc<RoomManager>, code: String, request: PlayerRequest) -> Response {
    match rooms.join_room(&code, &request.name) {
        Ok(ticket) => success_response(StatusCode::OK, ticket),
        Err(err) => room_error(err),
    }
}

pub async fn leave_room(rooms: Arc<RoomManager>, code: String, request: SeatRequest) -> Response {
    let left = tokio::task::spawn_blocking(move || {
        rooms.leave_room(&code, &request.name, &request.token)
    })
    .await;
    match left {
        Ok(Ok(info)) => success_response(StatusCode::OK, info),
        Ok(Err(err)) => room_error(err),
        Err(err) => task_failed(err),
    }
}

pub async fn reconnect(rooms: Arc<RoomManager>, code: String, request: SeatRequest) -> Response {
    match rooms.reconnect(&code, &request.name, &request.token) {
        Ok(info) => success_response(StatusCode::OK, info),
        Err(err) => room_error(err),
    }
}

pub async fn start_room(rooms: Arc<RoomManager>, code: String) -> Response {
    match rooms.start_room(&code) {
        Ok(info) => success_response(StatusCode::OK, info),
        Err(err) => room_error(err),
    }
}

/// Returns the decision the seat owes, or 204 when the game is not waiting on it.
pub async fn get_decision(
    rooms: Arc<RoomManager>,
    code: String,
    name: String,
    token: Option<String>,
) -> Response {
    let token = match seat_token(&name, token) {
        Ok(token) => token,
        Err(err) => return room_error(err),
    };
    match rooms.pending_decision(&code, &name, &token) {
        Ok(Some(request)) => success_response(StatusCode::OK, request),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => room_error(err),
    }
}

/// Answers the seat's pending decision.
///
/// # HTTP Method and Path
/// - **Method**: POST
/// - **Path**: `/api/rooms/{code}/players/{name}/decision`
/// - **Header**: `x-seat-token` from the join response
///
/// # Request Format
/// ```json
/// { "request_id": 4, "decision": { "kind": "choose_turn_action", "value": "call_kabo" } }
/// ```
///
/// # Response Format
/// - **Success (202 Accepted)**: the game thread has the answer; legality is
///   checked by the engine, which asks again if the answer breaks a rule
/// - **Error (409)**: `no_pending_decision` or `stale_response`
/// - **Error (400)**: `illegal_decision` when the answer is for another kind of decision
/// - **Error (403)**: `invalid_seat_token`
/// - **Error (412)**: the seat is disconnected or was handed to a computer player
pub async fn submit_decision(
    rooms: Arc<RoomManager>,
    code: String,
    name: String,
    token: Option<String>,
    response: DecisionResponse,
) -> Response {
    let token = match seat_token(&name, token) {
        Ok(token) => token,
        Err(err) => return room_error(err),
    };
    match rooms.submit_decision(&code, &name, &token, response) {
        Ok(()) => success_response(
            StatusCode::ACCEPTED,
            serde_json::json!({ "status": "accepted" }),
        ),
        Err(err) => room_error(err),
    }
}

/// Latest redacted table view of the seat.
pub async fn get_state(
    rooms: Arc<RoomManager>,
    code: String,
    name: String,
    token: Option<String>,
) -> Response {
    let token = match seat_token(&name, token) {
        Ok(token) => token,
        Err(err) => return room_error(err),
    };
    match rooms.latest_view(&code, &name, &token) {
        Ok(Some(view)) => success_response(StatusCode::OK, view),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => room_error(err),
    }
}

fn success_response<T>(status: StatusCode, body: T) -> Response
where
    T: Serialize,
{
    reply::with_status(reply::json(&body), status).into_response()
}

pub(crate) fn room_error(err: RoomError) -> Response {
    err.into_http_response()
}

/// Parses the seat token header. A missing or garbled token is a wrong one.
pub(crate) fn seat_token(name: &str, raw: Option<String>) -> Result<SeatToken, RoomError> {
    raw.as_deref()
        .and_then(|raw| SeatToken::parse_str(raw.trim()).ok())
        .ok_or_else(|| RoomError::InvalidToken(name.trim().to_uppercase()))
}

fn task_failed(err: tokio::task::JoinError) -> Response {
    tracing::error!(error = %err, "room task failed");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
