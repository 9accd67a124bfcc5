//! # Network Protocol
//!
//! Binary packet definitions for the Classic protocol, version 7.
//!
//! ## Packet Structure
//!
//! ```text
//! ┌────────┬─────────────────────────────────────────────────────┐
//! │ OpCode │ Fixed-size body (size implied by the opcode)        │
//! │ 1 byte │ big-endian i16, bytes, 64-byte space-padded strings │
//! └────────┴─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Philosophy
//!
//! - Fixed sizes: a reader knows the full length after one byte
//! - Strings are lossy by contract: non-ASCII becomes `?`, overflow is cut
//! - Chat layout lives next to the codec since it is bound to the 64-byte field

mod packets;
mod serialization;
mod wrap;

pub use packets::{
    legacy_kick, OpCode, Packet, LEVEL_CHUNK_SIZE, PROTOCOL_VERSION, SELF_ID, USER_TYPE_NORMAL, USER_TYPE_OP,
};
pub use serialization::{decode_string, encode_string, PacketReader, PacketWriter, STRING_LENGTH};
pub use wrap::{chat_packets, wrap_lines};
