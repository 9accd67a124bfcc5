//! # Tundra
//!
//! The server binary's library half: configuration loading and the startup
//! steps that turn a [`ServerConfig`] into a listening server.
//!
//! ## Crates
//!
//! - [`tundra_core`]: blocks, maps and positions
//! - [`tundra_procedural`]: map generators
//! - [`tundra_security`]: name and chat validation, movement checks
//! - [`tundra_networking`]: protocol, sessions, heartbeat
//!
//! ## Startup
//!
//! ```text
//! tundra.toml ──▶ ServerConfig ──▶ build_main_map ──▶ World
//!                      │                                 │
//!                      ▼                                 ▼
//!               ServerSettings ───────────────▶ ServerContext ──▶ Server::run
//!                                                        │
//!                                                        ├──▶ heartbeat thread
//!                                                        └──▶ console thread (`stop`)
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod setup;

pub use config::{ConfigError, HeartbeatSection, ServerConfig, WorldSection, DEFAULT_CONFIG_FILE};
pub use error::{TundraError, TundraResult};
pub use setup::{
    build_main_map, generate_map, parse_size, save_map, start_console, start_heartbeat, world_params, STOP_COMMAND,
};

pub use tundra_core as core;
pub use tundra_networking as networking;
pub use tundra_procedural as procedural;
pub use tundra_security as security;
