//! Framed-stream transport for desktop clients.
//!
//! Admission: prompt with `ENTER_SECRET\n`, expect the secret on one line
//! within the auth timeout, then hand the player the lowest free slot and
//! announce it with [`StreamPacket::Assigned`].

use crate::context::ServerContext;
use crate::error::AdmissionError;
use crate::session::{Outbox, Session, SessionError, SessionId, Transport, OUTBOX_CAPACITY};
use log::{debug, error, info, warn};
use shared::stream::{encode_frame, read_packet, write_packet, StreamPacket};
use shared::{MatchState, Slot, AUTH_PROMPT};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Longest secret line accepted before the prompt is considered abused.
const MAX_SECRET_LINE: u64 = 1024;

#[derive(Debug)]
pub struct StreamSession {
    id: SessionId,
    peer: SocketAddr,
    outbox: Outbox<Vec<u8>>,
}

impl StreamSession {
    pub fn new(id: SessionId, peer: SocketAddr, sender: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            id,
            peer,
            outbox: Outbox::new(sender),
        }
    }
}

impl Session for StreamSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn transport(&self) -> Transport {
        Transport::Stream
    }

    fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn is_alive(&self) -> bool {
        self.outbox.is_alive()
    }

    fn close(&self) {
        self.outbox.close();
    }

    fn send(&self, snapshot: &MatchState) -> Result<(), SessionError> {
        let frame = encode_frame(&StreamPacket::State(*snapshot))
            .map_err(|e| SessionError::Encode(e.to_string()))?;
        self.outbox.push(self.id, frame)
    }
}

/// An authenticated, slotted stream connection ready to read commands.
struct Admitted {
    slot: Slot,
    session_id: SessionId,
    reader: BufReader<OwnedReadHalf>,
}

/// Accepts stream connections forever. Each handshake runs in its own task so
/// a silent client cannot hold up the next one.
pub async fn run_acceptor(listener: TcpListener, ctx: Arc<ServerContext>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("Incoming stream connection from {}", peer);
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    handle_connection(stream, peer, ctx).await;
                });
            }
            Err(e) => {
                error!("Error accepting stream connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, ctx: Arc<ServerContext>) {
    match admit(stream, peer, &ctx).await {
        Ok(admitted) => read_commands(admitted, &ctx).await,
        Err(e) => warn!("Rejected stream connection from {}: {}", peer, e),
    }
}

async fn admit(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: &ServerContext,
) -> Result<Admitted, AdmissionError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    write_half
        .write_all(format!("{}\n", AUTH_PROMPT).as_bytes())
        .await?;
    write_half.flush().await?;

    let mut line = String::new();
    let auth_timeout = ctx.config.auth_timeout;
    let read = timeout(
        auth_timeout,
        (&mut reader).take(MAX_SECRET_LINE).read_line(&mut line),
    )
    .await
    .map_err(|_| AdmissionError::AuthTimeout(auth_timeout))??;

    if read == 0 {
        return Err(AdmissionError::Disconnected);
    }
    if line.trim_end_matches(['\r', '\n']) != ctx.config.secret {
        return Err(AdmissionError::AuthFailure);
    }
    info!("Stream client {} authenticated", peer);

    let (sender, receiver) = mpsc::channel(OUTBOX_CAPACITY);
    let claimed = {
        let mut slots = ctx.slots.write().await;
        let session_id = slots.allocate_id();
        let session = Arc::new(StreamSession::new(session_id, peer, sender));
        slots.claim_next(session).map(|slot| (slot, session_id))
    };

    let (slot, session_id) = match claimed {
        Ok(claimed) => claimed,
        Err(e) => {
            let rejection = StreamPacket::Rejected {
                reason: "Server full".to_string(),
            };
            if let Err(send_err) = write_packet(&mut write_half, &rejection).await {
                debug!("Could not tell {} the server is full: {}", peer, send_err);
            }
            return Err(e);
        }
    };

    // Written before the writer task starts so it precedes every snapshot.
    if let Err(e) = write_packet(&mut write_half, &StreamPacket::Assigned { slot }).await {
        ctx.release(slot, session_id).await;
        return Err(e.into());
    }

    tokio::spawn(write_frames(write_half, receiver));

    Ok(Admitted {
        slot,
        session_id,
        reader,
    })
}

/// Drains the session's outbox onto the socket until either side gives up.
async fn write_frames(mut writer: OwnedWriteHalf, mut receiver: mpsc::Receiver<Vec<u8>>) {
    while let Some(frame) = receiver.recv().await {
        if let Err(e) = writer.write_all(&frame).await {
            debug!("Stream write failed: {}", e);
            break;
        }
    }
    let _ = writer.shutdown().await;
}

async fn read_commands(admitted: Admitted, ctx: &ServerContext) {
    let Admitted {
        slot,
        session_id,
        mut reader,
    } = admitted;

    loop {
        match read_packet(&mut reader).await {
            Ok(Some(packet)) => match packet.into_command() {
                Some(command) => {
                    if !ctx.apply(slot, session_id, command).await {
                        info!("{} stream session {} was replaced", slot, session_id);
                        break;
                    }
                }
                None => debug!("Ignoring server-bound packet from {}", slot),
            },
            Ok(None) => {
                info!("{} closed the stream connection", slot);
                break;
            }
            Err(e) if e.is_recoverable() => {
                debug!("Ignoring malformed frame from {}: {}", slot, e);
            }
            Err(e) => {
                warn!("{} stream session lost: {}", slot, e);
                break;
            }
        }
    }

    ctx.release(slot, session_id).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::stream::decode_payload;

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    #[test]
    fn test_send_queues_state_frame() {
        let (tx, mut rx) = mpsc::channel(4);
        let session = StreamSession::new(1, peer(), tx);
        let snapshot = MatchState {
            ball_x: 100,
            score: [1, 2],
            ..MatchState::default()
        };

        session.send(&snapshot).unwrap();

        let frame = rx.try_recv().unwrap();
        assert_eq!(
            decode_payload(&frame[4..]).unwrap(),
            StreamPacket::State(snapshot)
        );
        assert_eq!(session.transport(), Transport::Stream);
    }

    #[test]
    fn test_send_after_writer_exit_kills_session() {
        let (tx, rx) = mpsc::channel(4);
        let session = StreamSession::new(2, peer(), tx);
        drop(rx);

        assert!(session.send(&MatchState::default()).is_err());
        assert!(!session.is_alive());
    }
}
