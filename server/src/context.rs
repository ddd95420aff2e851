use crate::config::ServerConfig;
use crate::game::GameState;
use crate::session::SessionId;
use crate::slot_manager::SlotManager;
use log::debug;
use shared::{Command, Slot};
use tokio::sync::{Mutex, RwLock};

/// State shared by the acceptors, the session readers and the match
/// controller.
///
/// Lock order is `slots` before `game`; the controller never holds both.
pub struct ServerContext {
    pub config: ServerConfig,
    pub game: Mutex<GameState>,
    pub slots: RwLock<SlotManager>,
}

impl ServerContext {
    pub fn new(config: ServerConfig) -> Self {
        let game = GameState::new(config.rules);
        Self {
            config,
            game: Mutex::new(game),
            slots: RwLock::new(SlotManager::new()),
        }
    }

    /// Records a command from session `session_id`. Ignored unless that
    /// session still holds `slot`. Returns whether the command was applied.
    pub async fn apply(&self, slot: Slot, session_id: SessionId, command: Command) -> bool {
        let slots = self.slots.read().await;
        let owns_slot = slots
            .occupant(slot)
            .map_or(false, |session| session.id() == session_id);
        if !owns_slot {
            debug!("Ignoring command from session {}, it no longer holds {}", session_id, slot);
            return false;
        }

        self.game.lock().await.apply(slot, command);
        true
    }

    /// Frees `slot` after its session ended, unless someone else owns it by now.
    pub async fn release(&self, slot: Slot, session_id: SessionId) {
        let mut slots = self.slots.write().await;
        if slots.release(slot, session_id) {
            self.game.lock().await.release_slot(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::RecordingSession;
    use crate::session::Session;
    use shared::{ControlCommand, ControlKind};
    use std::sync::Arc;

    fn ready() -> Command {
        Command::Control(ControlCommand::new(ControlKind::Ready))
    }

    #[tokio::test]
    async fn test_replaced_session_cannot_steer_new_owner() {
        let ctx = ServerContext::new(ServerConfig::new("secret", "127.0.0.1"));
        let old = Arc::new(RecordingSession::new(1));
        ctx.slots.write().await.claim(Slot::One, old.clone()).unwrap();

        // The old session dies and a new one takes over the slot.
        old.close();
        ctx.slots
            .write()
            .await
            .claim(Slot::One, Arc::new(RecordingSession::new(2)))
            .unwrap();

        assert!(!ctx.apply(Slot::One, 1, ready()).await);
        assert!(!ctx.game.lock().await.snapshot().is_ready(Slot::One));

        assert!(ctx.apply(Slot::One, 2, ready()).await);
        assert!(ctx.game.lock().await.snapshot().is_ready(Slot::One));
    }

    #[tokio::test]
    async fn test_commands_for_empty_slot_are_ignored() {
        let ctx = ServerContext::new(ServerConfig::new("secret", "127.0.0.1"));

        assert!(!ctx.apply(Slot::Two, 7, ready()).await);
        assert!(!ctx.game.lock().await.snapshot().is_ready(Slot::Two));
    }
}
