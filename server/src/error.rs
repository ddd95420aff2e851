use shared::stream::FrameError;
use shared::Slot;
use std::io;
use std::time::Duration;
use tokio_tungstenite::tungstenite;

/// Startup problems that stop the process before any socket is opened.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set in the environment")]
    MissingSecret(&'static str),
}

/// Reasons a connection did not become a slotted session.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("wrong shared secret")]
    AuthFailure,
    #[error("no secret received within {0:?}")]
    AuthTimeout(Duration),
    #[error("slot {0} is already held by a live session")]
    SlotConflict(Slot),
    #[error("both slots are taken")]
    SlotsFull,
    #[error("connection closed during handshake")]
    Disconnected,
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
