use crate::events::{EventSubscription, RoomEvent};
use crate::handlers::rooms::{room_error, seat_token};
use crate::room::RoomManager;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use warp::http;
use warp::reply::{self, Response};
use warp::sse;
use warp::Reply;

/// Streams a seat's events, private ones included. Needs the seat token.
pub async fn stream_player_events(
    rooms: Arc<RoomManager>,
    code: String,
    name: String,
    token: Option<String>,
) -> Response {
    let token = match seat_token(&name, token) {
        Ok(token) => token,
        Err(err) => return room_error(err),
    };
    match rooms.subscribe_seat(&code, &name, &token) {
        Ok(subscription) => sse_response(subscription),
        Err(err) => room_error(err),
    }
}

/// Streams only the public events of a room.
pub async fn stream_room_events(rooms: Arc<RoomManager>, code: String) -> Response {
    match rooms.spectate(&code) {
        Ok(subscription) => sse_response(subscription),
        Err(err) => room_error(err),
    }
}

fn sse_response(subscription: EventSubscription) -> Response {
    let stream = subscription_stream(subscription);
    let keep_alive = sse::keep_alive()
        .interval(Duration::from_secs(15))
        .text(":keep-alive\n");

    let reply = sse::reply(keep_alive.stream(stream));
    reply::with_header(reply, http::header::CACHE_CONTROL, "no-cache").into_response()
}

fn subscription_stream(
    subscription: EventSubscription,
) -> impl tokio_stream::Stream<Item = Result<sse::Event, Infallible>> {
    let mut subscription = subscription;
    let (_, placeholder_rx) = mpsc::channel(1);
    let receiver = std::mem::replace(&mut subscription.receiver, placeholder_rx);
    // The stream owns the subscription so the bus forgets the client when it goes away.
    let subscription = Arc::new(subscription);

    ReceiverStream::new(receiver).map(move |event| {
        let _keep_alive = Arc::clone(&subscription);
        Ok(render_event(event))
    })
}

fn render_event(event: RoomEvent) -> sse::Event {
    match serde_json::to_string(&event) {
        Ok(json) => sse::Event::default().event(event.name()).data(json),
        Err(err) => {
            let fallback = serde_json::json!({
                "type": "error",
                "message": format!("failed to serialize room event: {err}")
            })
            .to_string();
            sse::Event::default().event("error").data(fallback)
        }
    }
}
