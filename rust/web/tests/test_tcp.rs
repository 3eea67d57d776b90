mod common;

use common::answer;
use kabo_engine::protocol::{DecisionKind, DecisionResponse};
use kabo_web::{
    read_frame, write_frame, AppContext, AppSettings, ClientMessage, RoomConfig, RoomEvent,
    SeatToken, ServerConfig, ServerHandle, ServerMessage, WebServer,
};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

const STEP: Duration = Duration::from_secs(10);

async fn start_server() -> ServerHandle {
    let config = ServerConfig::for_tests().with_tcp_port(0);
    let context = AppContext::new(config, AppSettings::default()).expect("context");
    WebServer::from_context(context)
        .start()
        .await
        .expect("server starts")
}

async fn connect(handle: &ServerHandle) -> TcpStream {
    let addr = handle.tcp_address().expect("tcp front end");
    TcpStream::connect(addr).await.expect("connect")
}

async fn send(stream: &mut TcpStream, message: ClientMessage) {
    write_frame(stream, &message).await.expect("send");
}

async fn recv(stream: &mut TcpStream) -> ServerMessage {
    tokio::time::timeout(STEP, read_frame::<_, ServerMessage>(stream))
        .await
        .expect("server answered in time")
        .expect("valid frame")
        .expect("connection open")
}

/// Reads until a decision request for this seat arrives.
async fn next_request(stream: &mut TcpStream) -> kabo_engine::protocol::DecisionRequest {
    loop {
        if let ServerMessage::Event {
            event: RoomEvent::DecisionRequested { request, .. },
        } = recv(stream).await
        {
            return request;
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn commands_before_joining_are_refused() {
    let handle = start_server().await;
    let mut stream = connect(&handle).await;

    send(&mut stream, ClientMessage::Start).await;
    assert!(matches!(
        recv(&mut stream).await,
        ServerMessage::Error { code, .. } if code == "not_joined"
    ));

    send(
        &mut stream,
        ClientMessage::Join {
            room: "NOPE1".into(),
            name: "bob".into(),
        },
    )
    .await;
    assert!(matches!(
        recv(&mut stream).await,
        ServerMessage::Error { code, .. } if code == "room_not_found"
    ));

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_frames_get_an_error_and_keep_the_connection() {
    let handle = start_server().await;
    let mut stream = connect(&handle).await;

    stream.write_u32(7).await.expect("header");
    stream.write_all(b"{\"a\":1}").await.expect("body");
    assert!(matches!(
        recv(&mut stream).await,
        ServerMessage::Error { code, .. } if code == "malformed_message"
    ));

    send(&mut stream, ClientMessage::Start).await;
    assert!(matches!(recv(&mut stream).await, ServerMessage::Error { .. }));

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tcp_players_join_start_and_answer() {
    let handle = start_server().await;
    let rooms = handle.context().rooms();
    let config = RoomConfig {
        max_players: 3,
        ai_players: 1,
        seed: Some(17),
        ..RoomConfig::from_settings(&AppSettings::default())
    };
    let host = rooms.create_room("alice", config).expect("create");
    let code = host.room.code.clone();

    let mut alice = connect(&handle).await;
    send(
        &mut alice,
        ClientMessage::Reconnect {
            room: code.clone(),
            name: "alice".into(),
            token: host.token,
        },
    )
    .await;
    assert_eq!(
        recv(&mut alice).await,
        ServerMessage::JoinAck {
            room: code.clone(),
            name: "ALICE".into(),
            token: host.token,
        }
    );

    let mut bob = connect(&handle).await;
    send(
        &mut bob,
        ClientMessage::Join {
            room: code.to_lowercase(),
            name: " bob ".into(),
        },
    )
    .await;
    assert!(matches!(recv(&mut bob).await, ServerMessage::JoinAck { name, .. } if name == "BOB"));
    assert!(matches!(
        recv(&mut alice).await,
        ServerMessage::Event { event: RoomEvent::PlayerJoined { name, .. } } if name == "BOB"
    ));

    send(&mut alice, ClientMessage::Start).await;
    let request = next_request(&mut alice).await;
    assert_eq!(request.kind, DecisionKind::ChoosePeekTargets);
    send(
        &mut alice,
        ClientMessage::Decision {
            response: DecisionResponse {
                request_id: request.request_id,
                decision: answer(&request),
            },
        },
    )
    .await;

    // Bob is asked only after alice answered.
    let request = next_request(&mut bob).await;
    assert_eq!(request.player, 1);

    // Dropping bob's connection disconnects that seat.
    drop(bob);
    let replaced = tokio::time::timeout(STEP, async {
        loop {
            if let ServerMessage::Event {
                event: RoomEvent::AgentReplaced { name, .. },
            } = recv(&mut alice).await
            {
                return name;
            }
        }
    })
    .await
    .expect("bob's seat is handed over");
    assert_eq!(replaced, "BOB");

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_joined_seat_cannot_be_taken_by_another_connection() {
    let handle = start_server().await;
    let rooms = handle.context().rooms();
    let config = RoomConfig {
        max_players: 3,
        ai_players: 1,
        seed: Some(5),
        ..RoomConfig::from_settings(&AppSettings::default())
    };
    let host = rooms.create_room("alice", config).expect("create");
    let code = host.room.code.clone();

    let mut bob = connect(&handle).await;
    send(
        &mut bob,
        ClientMessage::Join {
            room: code.clone(),
            name: "bob".into(),
        },
    )
    .await;
    let ServerMessage::JoinAck { token, .. } = recv(&mut bob).await else {
        panic!("bob should be seated");
    };

    let mut intruder = connect(&handle).await;
    send(
        &mut intruder,
        ClientMessage::Reconnect {
            room: code.clone(),
            name: "bob".into(),
            token: SeatToken::new_v4(),
        },
    )
    .await;
    assert!(matches!(
        recv(&mut intruder).await,
        ServerMessage::Error { code, .. } if code == "invalid_seat_token"
    ));

    // A leaked token still cannot bind while bob holds the seat.
    send(
        &mut intruder,
        ClientMessage::Reconnect {
            room: code.clone(),
            name: "bob".into(),
            token,
        },
    )
    .await;
    assert!(matches!(
        recv(&mut intruder).await,
        ServerMessage::Error { code, .. } if code == "seat_in_use"
    ));
    drop(intruder);

    rooms.start_room(&code).expect("start");
    let info = rooms.room_info(&code).expect("room");
    let seat = info.players.iter().find(|p| p.name == "BOB").expect("bob seated");
    assert!(seat.connected);

    let request = tokio::time::timeout(STEP, async {
        loop {
            if let Ok(Some(request)) = rooms.pending_decision(&code, "alice", &host.token) {
                return request;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("alice is asked first");
    rooms
        .submit_decision(
            &code,
            "alice",
            &host.token,
            DecisionResponse {
                request_id: request.request_id,
                decision: answer(&request),
            },
        )
        .expect("alice answers");

    // Bob's request still reaches bob, who can answer it.
    let request = next_request(&mut bob).await;
    assert_eq!(request.player, 1);
    send(
        &mut bob,
        ClientMessage::Decision {
            response: DecisionResponse {
                request_id: request.request_id,
                decision: answer(&request),
            },
        },
    )
    .await;
    let answered = tokio::time::timeout(STEP, async {
        loop {
            if rooms.pending_decision(&code, "bob", &token).ok().flatten().map(|r| r.request_id)
                != Some(request.request_id)
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(answered.is_ok(), "bob's answer was accepted");

    handle.shutdown().await.expect("shutdown");
}
