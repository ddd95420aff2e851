//! Transport-agnostic view of a connected player.
//!
//! The lifecycle controller and the slot manager only ever see
//! `Arc<dyn Session>`. Each transport provides its own implementation that
//! renders a [`MatchState`] into its native encoding and hands the bytes to a
//! per-session writer task through a bounded queue, so a broadcast never waits
//! on a socket.

use log::debug;
use shared::MatchState;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

pub type SessionId = u32;

/// Snapshots queued per session before new ones are dropped.
pub const OUTBOX_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stream,
    Socket,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Stream => write!(f, "stream"),
            Transport::Socket => write!(f, "websocket"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} is closed")]
    Closed(SessionId),
    #[error("failed to encode snapshot: {0}")]
    Encode(String),
}

/// A player's pipe, whatever transport carries it.
pub trait Session: Send + Sync + fmt::Debug {
    fn id(&self) -> SessionId;
    fn transport(&self) -> Transport;
    fn peer(&self) -> SocketAddr;
    fn is_alive(&self) -> bool;
    /// Marks the session dead; later sends fail without touching the socket.
    fn close(&self);
    /// Queues a snapshot for delivery in the transport's own encoding.
    fn send(&self, snapshot: &MatchState) -> Result<(), SessionError>;
}

/// Bounded, non-blocking handoff from the tick task to a writer task.
#[derive(Debug)]
pub struct Outbox<T> {
    sender: mpsc::Sender<T>,
    alive: AtomicBool,
}

impl<T> Outbox<T> {
    pub fn new(sender: mpsc::Sender<T>) -> Self {
        Self {
            sender,
            alive: AtomicBool::new(true),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        self.alive.store(false, Ordering::Release);
    }

    /// Queues `item`. A full queue drops the item since a newer snapshot
    /// follows shortly; a closed queue means the writer is gone.
    pub fn push(&self, id: SessionId, item: T) -> Result<(), SessionError> {
        if !self.is_alive() {
            return Err(SessionError::Closed(id));
        }

        match self.sender.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                debug!("Session {} is falling behind, dropping snapshot", id);
                Ok(())
            }
            Err(TrySendError::Closed(_)) => {
                self.close();
                Err(SessionError::Closed(id))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_delivers_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let outbox = Outbox::new(tx);

        outbox.push(1, "a").unwrap();
        outbox.push(1, "b").unwrap();

        assert_eq!(rx.try_recv().unwrap(), "a");
        assert_eq!(rx.try_recv().unwrap(), "b");
        assert!(outbox.is_alive());
    }

    #[test]
    fn test_full_outbox_drops_without_error() {
        let (tx, mut rx) = mpsc::channel(1);
        let outbox = Outbox::new(tx);

        outbox.push(1, 10).unwrap();
        outbox.push(1, 11).unwrap();

        assert_eq!(rx.try_recv().unwrap(), 10);
        assert!(rx.try_recv().is_err());
        assert!(outbox.is_alive());
    }

    #[test]
    fn test_gone_writer_marks_session_dead() {
        let (tx, rx) = mpsc::channel::<u8>(1);
        let outbox = Outbox::new(tx);
        drop(rx);

        assert!(matches!(outbox.push(3, 1), Err(SessionError::Closed(3))));
        assert!(!outbox.is_alive());
    }

    #[test]
    fn test_closed_outbox_refuses_items() {
        let (tx, mut rx) = mpsc::channel(4);
        let outbox = Outbox::new(tx);
        outbox.close();

        assert!(outbox.push(9, 1).is_err());
        assert!(rx.try_recv().is_err());
    }
}
