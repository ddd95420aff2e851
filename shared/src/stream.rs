//! Framed-stream encoding used by desktop clients.
//!
//! The connection starts with a line-based exchange: the server writes
//! `ENTER_SECRET\n` and the client answers with the shared secret on one line.
//! From then on both sides exchange frames made of a 4-byte big-endian length
//! followed by a `bincode` encoded [`StreamPacket`].

use crate::{Command, ControlCommand, MatchState, PlayerCommand, Slot};
use bincode::{deserialize, serialize};
use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frames larger than this are treated as a protocol violation.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum StreamPacket {
    // Client to server
    Move(PlayerCommand),
    Control(ControlCommand),

    // Server to client
    Assigned { slot: Slot },
    State(MatchState),
    Rejected { reason: String },
}

impl StreamPacket {
    /// Returns the player command carried by an inbound packet.
    pub fn into_command(self) -> Option<Command> {
        match self {
            StreamPacket::Move(cmd) => Some(Command::Move(cmd)),
            StreamPacket::Control(cmd) => Some(Command::Control(cmd)),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("frame of {0} bytes exceeds the frame size limit")]
    TooLarge(usize),
    #[error("malformed frame: {0}")]
    Malformed(#[from] bincode::Error),
}

impl FrameError {
    /// True when the stream itself is still usable and only this frame was bad.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::Malformed(_))
    }
}

/// Serializes a packet into a complete frame, length prefix included.
pub fn encode_frame(packet: &StreamPacket) -> Result<Vec<u8>, FrameError> {
    let payload = serialize(packet)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

pub fn decode_payload(payload: &[u8]) -> Result<StreamPacket, FrameError> {
    Ok(deserialize(payload)?)
}

/// Reads one frame payload. Returns `Ok(None)` when the peer closed the
/// stream cleanly between frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Reads and decodes one packet. A payload that fails to decode surfaces as
/// [`FrameError::Malformed`] with the stream positioned at the next frame.
pub async fn read_packet<R>(reader: &mut R) -> Result<Option<StreamPacket>, FrameError>
where
    R: AsyncRead + Unpin,
{
    match read_frame(reader).await? {
        Some(payload) => decode_payload(&payload).map(Some),
        None => Ok(None),
    }
}

pub async fn write_packet<W>(writer: &mut W, packet: &StreamPacket) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(packet)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ControlKind, Direction};
    use tokio_test::assert_ok;

    #[test]
    fn test_frame_has_length_prefix() {
        let packet = StreamPacket::Assigned { slot: Slot::Two };
        let frame = encode_frame(&packet).unwrap();

        let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(len, frame.len() - 4);
        assert_eq!(decode_payload(&frame[4..]).unwrap(), packet);
    }

    #[test]
    fn test_inbound_packets_become_commands() {
        let moved = StreamPacket::Move(PlayerCommand::new(Direction::Down));
        assert_eq!(
            moved.into_command(),
            Some(Command::Move(PlayerCommand::new(Direction::Down)))
        );

        let control = StreamPacket::Control(ControlCommand::new(ControlKind::Pause));
        assert_eq!(
            control.into_command(),
            Some(Command::Control(ControlCommand::new(ControlKind::Pause)))
        );

        let outbound = StreamPacket::Rejected {
            reason: "Server full".to_string(),
        };
        assert_eq!(outbound.into_command(), None);
    }

    #[tokio::test]
    async fn test_packets_survive_a_byte_stream() {
        let state = MatchState {
            ball_x: 393,
            ball_y: 120,
            ball_dx: 5,
            ball_dy: -3,
            paddle_y: [260, 100],
            score: [1, 4],
            ready: [true, true],
            paused: false,
            winner: 0,
        };

        let mut buffer = Vec::new();
        assert_ok!(write_packet(&mut buffer, &StreamPacket::State(state)).await);
        assert_ok!(write_packet(&mut buffer, &StreamPacket::Assigned { slot: Slot::One }).await);

        let mut reader = buffer.as_slice();
        let first = read_packet(&mut reader).await.unwrap();
        let second = read_packet(&mut reader).await.unwrap();
        let end = read_packet(&mut reader).await.unwrap();

        assert_eq!(first, Some(StreamPacket::State(state)));
        assert_eq!(second, Some(StreamPacket::Assigned { slot: Slot::One }));
        assert_eq!(end, None);
    }

    #[tokio::test]
    async fn test_malformed_frame_leaves_stream_aligned() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&3u32.to_be_bytes());
        buffer.extend_from_slice(&[0xff, 0xff, 0xff]);
        write_packet(&mut buffer, &StreamPacket::Control(ControlCommand::new(ControlKind::Ready)))
            .await
            .unwrap();

        let mut reader = buffer.as_slice();
        let err = read_packet(&mut reader).await.unwrap_err();
        assert!(err.is_recoverable());

        let next = read_packet(&mut reader).await.unwrap();
        assert_eq!(
            next,
            Some(StreamPacket::Control(ControlCommand::new(ControlKind::Ready)))
        );
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&((MAX_FRAME_LEN as u32) + 1).to_be_bytes());

        let mut reader = buffer.as_slice();
        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, FrameError::TooLarge(_)));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_truncated_payload_is_an_io_error() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&10u32.to_be_bytes());
        buffer.extend_from_slice(&[1, 2, 3]);

        let mut reader = buffer.as_slice();
        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, FrameError::Io(_)));
    }
}
