use crate::room::RoomManager;
use serde::Serialize;
use warp::reply::Json;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    rooms: usize,
    subscribers: usize,
}

pub fn health(rooms: &RoomManager) -> Json {
    warp::reply::json(&HealthBody {
        status: "ok",
        rooms: rooms.active_rooms().len(),
        subscribers: rooms.event_bus().subscriber_count(),
    })
}
