//! Wire format for the TCP front end: each message is a 4-byte big-endian
//! length followed by that many bytes of JSON.

use crate::events::RoomEvent;
use crate::room::{RoomCode, SeatToken};
use kabo_engine::protocol::DecisionResponse;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAX_FRAME_LEN: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Frame of {0} bytes exceeds the 1 MiB limit")]
    FrameTooLarge(usize),
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Connection closed in the middle of a frame")]
    Truncated,
}

/// Sent by a TCP client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        room: RoomCode,
        name: String,
    },
    /// Takes a seat back with the token from its `join_ack`.
    Reconnect {
        room: RoomCode,
        name: String,
        token: SeatToken,
    },
    Start,
    Decision { response: DecisionResponse },
}

/// Sent to a TCP client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    JoinAck {
        room: RoomCode,
        name: String,
        token: SeatToken,
    },
    Event { event: RoomEvent },
    Error { code: String, message: String },
}

pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(message)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(body.len()));
    }
    writer.write_u32(body.len() as u32).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame. `Ok(None)` means the peer closed the connection between frames.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, TransportError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(TransportError::Truncated)
            };
        }
        filled += n;
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(len));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            TransportError::Truncated
        } else {
            TransportError::Io(e)
        }
    })?;
    Ok(Some(serde_json::from_slice(&body)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kabo_engine::protocol::{Decision, TurnAction};

    #[tokio::test]
    async fn frames_carry_a_length_prefix() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        write_frame(&mut client, &ClientMessage::Start)
            .await
            .expect("write");

        let mut header = [0u8; 4];
        server.read_exact(&mut header).await.expect("header");
        let len = u32::from_be_bytes(header) as usize;
        let mut body = vec![0u8; len];
        server.read_exact(&mut body).await.expect("body");
        assert_eq!(body, br#"{"type":"start"}"#);
    }

    #[tokio::test]
    async fn decision_messages_survive_the_wire() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let sent = ClientMessage::Decision {
            response: DecisionResponse {
                request_id: 3,
                decision: Decision::ChooseTurnAction(TurnAction::CallKabo),
            },
        };
        write_frame(&mut client, &sent).await.expect("write");
        let got: Option<ClientMessage> = read_frame(&mut server).await.expect("read");
        assert_eq!(got, Some(sent));
    }

    #[tokio::test]
    async fn clean_close_reads_as_none() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);
        let got: Option<ClientMessage> = read_frame(&mut server).await.expect("read");
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn partial_header_is_truncated() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[0, 0]).await.expect("write");
        drop(client);
        let result: Result<Option<ClientMessage>, _> = read_frame(&mut server).await;
        assert!(matches!(result, Err(TransportError::Truncated)));
    }

    #[tokio::test]
    async fn oversized_frames_are_rejected_before_reading() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client
            .write_u32((MAX_FRAME_LEN + 1) as u32)
            .await
            .expect("write");
        let result: Result<Option<ClientMessage>, _> = read_frame(&mut server).await;
        assert!(matches!(result, Err(TransportError::FrameTooLarge(_))));
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_u32(3).await.expect("write");
        client.write_all(b"{x}").await.expect("write");
        let result: Result<Option<ClientMessage>, _> = read_frame(&mut server).await;
        assert!(matches!(result, Err(TransportError::Malformed(_))));
    }
}
