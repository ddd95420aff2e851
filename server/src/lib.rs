//! # Pong Server Library
//!
//! Authoritative server for a two-player Pong match. The server owns the one
//! and only copy of the match, runs the simulation at a fixed tick rate and
//! pushes a snapshot of it to both players after every tick. Clients only
//! send intents: a paddle direction or a match control.
//!
//! ## Transports
//!
//! Players reach the same match through either of two listeners:
//!
//! - **Framed stream** (`transport::stream`): a TCP connection carrying
//!   length-prefixed bincode packets. Slots are handed out in arrival order.
//! - **WebSocket** (`transport::socket`): JSON text frames for browsers. The
//!   browser picks its slot explicitly after authenticating.
//!
//! Both transports authenticate against the same shared secret and both end
//! up as an `Arc<dyn Session>` in the [`slot_manager::SlotManager`], so the
//! simulation never knows which transport a player uses.
//!
//! ## Match Lifecycle
//!
//! The [`lifecycle::MatchController`] task drives the match through
//! filling slots, waiting for READY, playing (with pauses), game over and
//! waiting for RESTART, then loops back to a fresh match.
//!
//! ## Module Organization
//!
//! - `config`: command line and environment derived settings
//! - `context`: state shared between every task
//! - `error`: error types for startup and admission
//! - `game`: match state and the per-tick simulation
//! - `lifecycle`: the phase machine that runs matches back to back
//! - `network`: binds listeners and spawns the long-running tasks
//! - `session`: transport-agnostic player handle
//! - `slot_manager`: the two player slots
//! - `transport`: per-transport handshakes, readers and writers
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("letmein", "0.0.0.0");
//!     let server = Server::bind(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod game;
pub mod lifecycle;
pub mod network;
pub mod session;
pub mod slot_manager;
pub mod transport;
