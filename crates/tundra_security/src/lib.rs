//! # TUNDRA Security
//!
//! Validation of everything a Classic client sends before it touches
//! shared state.
//!
//! ## Features
//!
//! - **Anti-Speedhack**: packet spam window, two-strike jump detection,
//!   frozen player clamping
//! - **Name Verification**: `md5(salt + name)` against the handshake key,
//!   with a configurable leniency policy
//! - **Input Validation**: player name and chat character sets
//!
//! ## Architecture
//!
//! ```text
//! HANDSHAKE                         MOVEMENT
//!     │                                │
//!     │── is_valid_name ──►            │── frozen? ── frozen_move
//!     │── verify_name ──►              │
//!     │── NameVerification::decide     │── SpeedhackDetector::check
//!     ▼                                ▼
//!  Accept / Reject               Accept / Deny + revert
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod anti_cheat;
pub mod validation;

pub use anti_cheat::{frozen_move, DenyReason, FrozenMove, MovementVerdict, SpeedhackDetector};
pub use validation::{
    is_lan_address, is_valid_chat, is_valid_name, name_hash, verify_name, NameCheck, NameDecision,
    NameVerification,
};
