//! Ownership of the two player slots and fan-out of snapshots to them.
//!
//! A slot is held by at most one live session at a time, regardless of which
//! transport that session arrived on. Two claiming strategies exist:
//! - stream clients get the lowest free slot in arrival order,
//! - WebSocket clients ask for a specific slot and are refused when it is held.
//!
//! A slot whose session died counts as free, so either transport can take it
//! over while the match keeps running.

use crate::error::AdmissionError;
use crate::session::{Session, SessionId};
use log::{info, warn};
use shared::{MatchState, Slot};
use std::sync::Arc;

pub struct SlotManager {
    slots: [Option<Arc<dyn Session>>; 2],
    next_session_id: SessionId,
}

impl SlotManager {
    pub fn new() -> Self {
        Self {
            slots: [None, None],
            next_session_id: 1,
        }
    }

    /// Hands out a fresh identifier for a session about to be created.
    pub fn allocate_id(&mut self) -> SessionId {
        let id = self.next_session_id;
        self.next_session_id = self.next_session_id.wrapping_add(1);
        id
    }

    /// True when nobody, or only a dead session, holds `slot`.
    pub fn is_free(&self, slot: Slot) -> bool {
        match &self.slots[slot.index()] {
            Some(session) => !session.is_alive(),
            None => true,
        }
    }

    /// Arrival-order claim: the lowest free slot goes to `session`.
    pub fn claim_next(&mut self, session: Arc<dyn Session>) -> Result<Slot, AdmissionError> {
        let slot = Slot::ALL
            .into_iter()
            .find(|slot| self.is_free(*slot))
            .ok_or(AdmissionError::SlotsFull)?;

        self.install(slot, session);
        Ok(slot)
    }

    /// Explicit claim of `slot`, refused while a live session holds it.
    pub fn claim(&mut self, slot: Slot, session: Arc<dyn Session>) -> Result<(), AdmissionError> {
        if !self.is_free(slot) {
            return Err(AdmissionError::SlotConflict(slot));
        }

        self.install(slot, session);
        Ok(())
    }

    fn install(&mut self, slot: Slot, session: Arc<dyn Session>) {
        info!(
            "{} claimed by {} session {} from {}",
            slot,
            session.transport(),
            session.id(),
            session.peer()
        );

        if let Some(previous) = self.slots[slot.index()].replace(session) {
            previous.close();
        }
    }

    /// Frees `slot` if `session_id` still owns it. Returns whether it did.
    pub fn release(&mut self, slot: Slot, session_id: SessionId) -> bool {
        let owned = matches!(&self.slots[slot.index()], Some(session) if session.id() == session_id);
        if !owned {
            return false;
        }

        if let Some(session) = self.slots[slot.index()].take() {
            session.close();
            info!("{} released by session {}", slot, session_id);
        }
        true
    }

    pub fn occupant(&self, slot: Slot) -> Option<&Arc<dyn Session>> {
        self.slots[slot.index()].as_ref()
    }

    pub fn live_count(&self) -> usize {
        Slot::ALL.into_iter().filter(|slot| !self.is_free(*slot)).count()
    }

    pub fn both_filled(&self) -> bool {
        self.live_count() == Slot::ALL.len()
    }

    /// Sends `snapshot` to every live session. Failures only affect the
    /// failing session. Returns how many sessions accepted the snapshot.
    pub fn broadcast(&self, snapshot: &MatchState) -> usize {
        let mut delivered = 0;

        for (slot, session) in Slot::ALL.into_iter().zip(self.slots.iter()) {
            let Some(session) = session else { continue };
            if !session.is_alive() {
                continue;
            }

            match session.send(snapshot) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!("Dropping {} from broadcasts: {}", slot, e);
                    session.close();
                }
            }
        }

        delivered
    }
}

impl Default for SlotManager {
    fn default() -> Self {
        Self::new()
    }
}
