pub mod health;
pub mod rooms;
pub mod settings;
pub mod sse;

pub use health::health;
pub use rooms::{
    create_room, delete_room, get_decision, get_room, get_state, join_room, leave_room,
    list_rooms, reconnect, start_room, submit_decision, CreateRoomRequest, PlayerRequest,
    SeatRequest, SEAT_TOKEN_HEADER,
};
pub use settings::{
    get_settings, reset_settings, update_field, update_settings, UpdateFieldRequest,
    UpdateSettingsRequest,
};
pub use sse::{stream_player_events, stream_room_events};
