//! # Tundra Networking
//!
//! The Classic protocol side of the server.
//!
//! ## Architecture
//!
//! - **Protocol**: fixed-size big-endian packets, 64-byte strings, chat wrapping
//! - **Sessions**: one thread per client; login, level transfer, movement
//!   checks, block edits, visible-entity tracking
//! - **Worlds**: named map buffers with their player rosters
//! - **Heartbeat**: periodic registration with a public server list
//! - **IRC**: line parser and registration state for a chat bridge
//!
//! ## Threading
//!
//! ```text
//! listener ──accept──▶ session thread ──┐
//!                      session thread ──┼──▶ ServerContext (RwLock/Mutex)
//!                      session thread ──┘        │
//!                                                ▼
//!                                         World ─▶ Arc<RwLock<Map>>
//! heartbeat thread ──▶ data file ──▶ HTTP GET ──▶ external URL file
//! ```
//!
//! Sessions never share per-client state. Everything they do share sits
//! behind `parking_lot` locks, and outbound traffic to a player goes through
//! that player's two `crossbeam-channel` queues.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tundra_core::Map;
//! use tundra_networking::{Collaborators, Server, ServerContext, ServerSettings, World};
//!
//! let world = World::new("main", Map::new(64, 64, 64)?);
//! let context = Arc::new(ServerContext::new(ServerSettings::default(), Collaborators::default(), world));
//! let server = Server::bind("0.0.0.0:25565", context)?;
//! server.run()?; // Blocks until shutdown
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod heartbeat;
pub mod irc;
pub mod player;
pub mod protocol;
pub mod server;
pub mod session;
pub mod world;

pub use error::{HeartbeatError, ProtocolError, ProtocolResult, SessionError, SessionResult};
pub use heartbeat::{HeartbeatClient, HeartbeatConfig, HeartbeatData};
pub use irc::{IrcConnection, IrcEvent, IrcMessage, IrcState};
pub use player::{Player, PlayerInfo};
pub use protocol::{chat_packets, OpCode, Packet, PROTOCOL_VERSION};
pub use server::{Server, ServerContext, ServerSettings};
pub use session::{
    AccessPolicy, BlockChange, BlockHooks, ChatError, ChatHandler, Collaborators, LeaveReason, MovementHook,
    PlayerDirectory, PlayerRecord, Session, SessionState,
};
pub use world::{SharedMap, World};

/// Default Classic port.
pub const DEFAULT_PORT: u16 = 25565;
