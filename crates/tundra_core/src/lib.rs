//! # Tundra Core
//!
//! The shared data model of a Classic server:
//! - [`Block`]: one-byte block codes, the Classic block table
//! - [`Map`]: bounds-checked `width × length × height` voxel buffer with
//!   spawn point, string metadata and the gzip level snapshot
//! - [`Position`]: fixed-point player position (32 units per block)
//! - [`IdPool`]: small pool of reusable entity IDs
//!
//! ## Indexing
//!
//! Every read and write goes through one canonical index,
//! `(z * length + y) * width + x`, where `z` is the vertical axis.
//! This is the order the Classic level transfer expects, so the
//! snapshot is a straight copy of the buffer.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tundra_core::{Block, Map};
//!
//! let mut map = Map::new(64, 64, 64)?;
//! map.set(1, 2, 3, Block::STONE)?;
//! assert_eq!(map.get(1, 2, 3), Some(Block::STONE));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod block;
pub mod error;
pub mod map;
pub mod memory;
pub mod position;

pub use block::Block;
pub use error::{MapError, MapResult};
pub use map::{Dimensions, Map, MAX_DIMENSION};
pub use memory::IdPool;
pub use position::Position;
