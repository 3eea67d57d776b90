//! Multiplayer front ends for the Kabo engine.
//!
//! Rooms gather players, then hand a [`kabo_engine::game::Game`] to a
//! dedicated thread. Human seats are [`bridge::BridgedAgent`]s that block
//! that thread until an answer arrives over HTTP or TCP; every table change
//! goes out through the [`events::EventBus`] redacted for its viewer.

pub mod ai;
pub mod bridge;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod network;
pub mod room;
pub mod server;
pub mod session;
pub mod settings;
pub mod transport;

pub use ai::{create_ai, AI_KINDS};
pub use bridge::{seat, BridgeError, BridgedAgent, SeatHandle};
pub use errors::{ErrorResponse, ErrorSeverity, IntoErrorResponse};
pub use events::{Audience, EventBus, EventSubscription, RoomEvent, SeatInfo};
pub use logging::{init_logging, init_test_logging, LogEntry, TestLogSubscriber};
pub use network::{NetworkHandle, NetworkServer};
pub use room::{
    normalize_name, PlayerSummary, RoomCode, RoomConfig, RoomError, RoomInfo, RoomManager,
    RoomStatus, SeatAttachment, SeatTicket, SeatToken,
};
pub use server::{AppContext, ServerConfig, ServerError, ServerHandle, WebServer};
pub use session::{GameSession, SessionPlan, SessionStatus};
pub use settings::{AppSettings, SettingsError, SettingsStore, UnresponsivePolicy};
pub use transport::{read_frame, write_frame, ClientMessage, ServerMessage, TransportError};
