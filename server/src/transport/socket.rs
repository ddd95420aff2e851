//! WebSocket transport for browser clients.
//!
//! Admission: send `ENTER_SECRET`, wait for the secret as the first
//! meaningful text frame and answer `OK` or `FAIL`, then wait for a
//! `CHOOSE_PLAYER` request naming the slot the browser wants.

use crate::context::ServerContext;
use crate::error::AdmissionError;
use crate::session::{Outbox, Session, SessionError, SessionId, Transport, OUTBOX_CAPACITY};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::socket::{encode_state, parse_command, parse_slot_request, AUTH_FAIL, AUTH_OK};
use shared::{MatchState, Slot, AUTH_PROMPT};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

#[derive(Debug)]
pub struct SocketSession {
    id: SessionId,
    peer: SocketAddr,
    outbox: Outbox<Message>,
}

impl SocketSession {
    pub fn new(id: SessionId, peer: SocketAddr, sender: mpsc::Sender<Message>) -> Self {
        Self {
            id,
            peer,
            outbox: Outbox::new(sender),
        }
    }
}

impl Session for SocketSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn transport(&self) -> Transport {
        Transport::Socket
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
        let text = encode_state(snapshot).map_err(|e| SessionError::Encode(e.to_string()))?;
        self.outbox.push(self.id, Message::Text(text))
    }
}

struct Admitted {
    slot: Slot,
    session_id: SessionId,
    source: WsSource,
}

pub async fn run_acceptor(listener: TcpListener, ctx: Arc<ServerContext>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("Incoming websocket connection from {}", peer);
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    handle_connection(stream, peer, ctx).await;
                });
            }
            Err(e) => {
                error!("Error accepting websocket connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, ctx: Arc<ServerContext>) {
    match admit(stream, peer, &ctx).await {
        Ok(admitted) => read_commands(admitted, &ctx).await,
        Err(e) => warn!("Rejected websocket connection from {}: {}", peer, e),
    }
}

/// Next text frame from the browser, skipping control and binary frames.
async fn next_text(source: &mut WsSource) -> Result<String, AdmissionError> {
    loop {
        match source.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text),
            Some(Ok(Message::Close(_))) | None => return Err(AdmissionError::Disconnected),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

async fn admit(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: &ServerContext,
) -> Result<Admitted, AdmissionError> {
    let ws_stream = accept_async(stream).await?;
    let (mut sink, mut source) = ws_stream.split();

    sink.send(Message::Text(AUTH_PROMPT.to_string())).await?;

    let secret = loop {
        let text = next_text(&mut source).await?;
        // Browsers occasionally echo the prompt or send keep-alive blanks.
        if text.is_empty() || text == AUTH_PROMPT {
            continue;
        }
        break text;
    };

    if secret != ctx.config.secret {
        sink.send(Message::Text(AUTH_FAIL.to_string())).await?;
        let _ = sink.close().await;
        return Err(AdmissionError::AuthFailure);
    }
    sink.send(Message::Text(AUTH_OK.to_string())).await?;
    info!("Websocket client {} authenticated", peer);

    let slot = loop {
        let text = next_text(&mut source).await?;
        match parse_slot_request(&text) {
            Some(slot) => break slot,
            None => debug!("Ignoring {} before slot choice: {}", peer, text),
        }
    };

    let (sender, receiver) = mpsc::channel(OUTBOX_CAPACITY);
    let claimed = {
        let mut slots = ctx.slots.write().await;
        let session_id = slots.allocate_id();
        let session = Arc::new(SocketSession::new(session_id, peer, sender));
        slots.claim(slot, session).map(|()| session_id)
    };

    let session_id = match claimed {
        Ok(session_id) => session_id,
        Err(e) => {
            let frame = CloseFrame {
                code: CloseCode::Policy,
                reason: format!("player {} is already taken", slot.number()).into(),
            };
            if let Err(close_err) = sink.send(Message::Close(Some(frame))).await {
                debug!("Could not close {} cleanly: {}", peer, close_err);
            }
            return Err(e);
        }
    };

    tokio::spawn(write_messages(sink, receiver));

    Ok(Admitted {
        slot,
        session_id,
        source,
    })
}

async fn write_messages(mut sink: WsSink, mut receiver: mpsc::Receiver<Message>) {
    while let Some(message) = receiver.recv().await {
        if let Err(e) = sink.send(message).await {
            debug!("Websocket write failed: {}", e);
            break;
        }
    }
    let _ = sink.close().await;
}

async fn read_commands(admitted: Admitted, ctx: &ServerContext) {
    let Admitted {
        slot,
        session_id,
        mut source,
    } = admitted;

    loop {
        match source.next().await {
            Some(Ok(Message::Text(text))) => match parse_command(&text) {
                Some(command) => {
                    if !ctx.apply(slot, session_id, command).await {
                        info!("{} websocket session {} was replaced", slot, session_id);
                        break;
                    }
                }
                None => debug!("Ignoring malformed message from {}: {}", slot, text),
            },
            Some(Ok(Message::Close(_))) | None => {
                info!("{} closed the websocket", slot);
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("{} websocket session lost: {}", slot, e);
                break;
            }
        }
    }

    ctx.release(slot, session_id).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_send_queues_json_state() {
        let (tx, mut rx) = mpsc::channel(4);
        let session = SocketSession::new(5, "127.0.0.1:50001".parse().unwrap(), tx);
        let snapshot = MatchState {
            paddle_y: [12, 34],
            winner: 1,
            ..MatchState::default()
        };

        session.send(&snapshot).unwrap();

        let Message::Text(text) = rx.try_recv().unwrap() else {
            panic!("expected a text frame");
        };
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "STATE");
        assert_eq!(value["p1Y"], 12);
        assert_eq!(value["p2Y"], 34);
        assert_eq!(value["winner"], 1);
        assert_eq!(session.transport(), Transport::Socket);
    }
}
