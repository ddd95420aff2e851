//! The two ways a player can reach the server.
//!
//! Both transports authenticate against the same shared secret, claim slots
//! from the same [`SlotManager`](crate::slot_manager::SlotManager) and feed
//! commands into the same game state. They differ only in framing and in how
//! a slot is chosen.

pub mod socket;
pub mod stream;

pub use socket::SocketSession;
pub use stream::StreamSession;
