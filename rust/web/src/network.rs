//! TCP front end. Each connection binds to one seat with a `join` or
//! `reconnect` message, then receives that seat's events and may answer its
//! decisions. `join_ack` carries the seat token that a later `reconnect` must
//! present, and a seat is held by at most one connection. Dropping the
//! connection that holds a seat leaves the lobby or disconnects the seat of a
//! running game.

use crate::errors::IntoErrorResponse;
use crate::room::{RoomCode, RoomManager, SeatToken};
use crate::transport::{read_frame, write_frame, ClientMessage, ServerMessage, TransportError};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const OUTBOUND_BUFFER: usize = 256;

#[derive(Debug)]
pub struct NetworkServer {
    rooms: Arc<RoomManager>,
}

impl NetworkServer {
    pub fn new(rooms: Arc<RoomManager>) -> Self {
        Self { rooms }
    }

    pub async fn start(self, addr: SocketAddr) -> std::io::Result<NetworkHandle> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let rooms = self.rooms;

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            tokio::spawn(handle_connection(stream, peer, Arc::clone(&rooms)));
                        }
                        Err(err) => tracing::warn!(error = %err, "accept failed"),
                    },
                }
            }
        });

        tracing::info!(%addr, "tcp server listening");
        Ok(NetworkHandle {
            addr,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

#[derive(Debug)]
pub struct NetworkHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl NetworkHandle {
    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    /// Stops accepting connections. Open connections run until their peer leaves.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for NetworkHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Binding {
    room: RoomCode,
    name: String,
    token: SeatToken,
    claim: u64,
    forwarder: JoinHandle<()>,
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, rooms: Arc<RoomManager>) {
    tracing::debug!(%peer, "connection opened");
    let (mut reader, writer) = stream.into_split();
    let (out_tx, out_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);
    let writer_task = tokio::spawn(write_loop(writer, out_rx));

    let mut binding: Option<Binding> = None;
    loop {
        let message = match read_frame::<_, ClientMessage>(&mut reader).await {
            Ok(Some(message)) => message,
            Ok(None) => break,
            Err(TransportError::Malformed(err)) => {
                let _ = out_tx
                    .send(ServerMessage::Error {
                        code: "malformed_message".into(),
                        message: err.to_string(),
                    })
                    .await;
                continue;
            }
            Err(err) => {
                tracing::debug!(%peer, error = %err, "connection failed");
                break;
            }
        };

        let bound = binding
            .as_ref()
            .map(|b| (b.room.clone(), b.name.clone(), b.token));
        let reply = match (message, bound) {
            (ClientMessage::Join { room, name }, None) => match rooms.join_room(&room, &name) {
                Ok(ticket) => bind(
                    &rooms,
                    &out_tx,
                    &ticket.room.code,
                    &ticket.name,
                    ticket.token,
                    &mut binding,
                ),
                Err(e) => Some(error_message(&e)),
            },
            (ClientMessage::Reconnect { room, name, token }, None) => {
                bind(&rooms, &out_tx, &room, &name, token, &mut binding)
            }
            (ClientMessage::Join { .. } | ClientMessage::Reconnect { .. }, Some(_)) => {
                Some(ServerMessage::Error {
                    code: "already_joined".into(),
                    message: "this connection already holds a seat".into(),
                })
            }
            (ClientMessage::Start, Some((room, _, _))) => rooms
                .start_room(&room)
                .err()
                .map(|e| error_message(&e)),
            (ClientMessage::Decision { response }, Some((room, name, token))) => rooms
                .submit_decision(&room, &name, &token, response)
                .err()
                .map(|e| error_message(&e)),
            (ClientMessage::Start | ClientMessage::Decision { .. }, None) => {
                Some(ServerMessage::Error {
                    code: "not_joined".into(),
                    message: "join a room first".into(),
                })
            }
        };
        if let Some(reply) = reply {
            if out_tx.send(reply).await.is_err() {
                break;
            }
        }
    }

    if let Some(bound) = binding {
        bound.forwarder.abort();
        let released = tokio::task::spawn_blocking(move || {
            rooms.detach(&bound.room, &bound.name, bound.claim)
        })
        .await;
        match released {
            Ok(Ok(Some(_))) => tracing::info!(%peer, "seat released"),
            Ok(Ok(None)) => {}
            Ok(Err(e)) => tracing::debug!(%peer, error = %e, "release after disconnect failed"),
            Err(e) => tracing::warn!(%peer, error = %e, "release task failed"),
        }
    }
    drop(out_tx);
    let _ = writer_task.await;
    tracing::debug!(%peer, "connection closed");
}

fn bind(
    rooms: &RoomManager,
    out_tx: &mpsc::Sender<ServerMessage>,
    room: &str,
    name: &str,
    token: SeatToken,
    binding: &mut Option<Binding>,
) -> Option<ServerMessage> {
    let attachment = match rooms.attach(room, name, &token) {
        Ok(attachment) => attachment,
        Err(e) => return Some(error_message(&e)),
    };
    let mut events = attachment.events;
    let events_tx = out_tx.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(event) = events.receiver().recv().await {
            if events_tx.send(ServerMessage::Event { event }).await.is_err() {
                break;
            }
        }
    });
    let room = attachment.room.code;
    *binding = Some(Binding {
        room: room.clone(),
        name: attachment.name.clone(),
        token,
        claim: attachment.claim,
        forwarder,
    });
    Some(ServerMessage::JoinAck {
        room,
        name: attachment.name,
        token,
    })
}
async fn write_loop(mut writer: OwnedWriteHalf, mut outbound: mpsc::Receiver<ServerMessage>) {
    while let Some(message) = outbound.recv().await {
        if let Err(err) = write_frame(&mut writer, &message).await {
            tracing::debug!(error = %err, "write failed");
            break;
        }
    }
}

fn error_message<E: IntoErrorResponse>(error: &E) -> ServerMessage {
    ServerMessage::Error {
        code: error.error_code().to_string(),
        message: error.error_message(),
    }
}
