//! Map error types.

use thiserror::Error;

/// Errors raised by the map buffer.
#[derive(Debug, Error)]
pub enum MapError {
    /// A dimension is outside `[1, 65536)` or the volume does not fit in memory.
    #[error("invalid map dimensions {width}x{length}x{height}")]
    InvalidDimensions {
        /// Requested width (X).
        width: usize,
        /// Requested length (Y).
        length: usize,
        /// Requested height (Z).
        height: usize,
    },

    /// A coordinate lies outside the map.
    #[error("coordinate ({x}, {y}, {z}) is out of bounds")]
    OutOfBounds {
        /// X coordinate.
        x: i32,
        /// Y coordinate.
        y: i32,
        /// Z coordinate.
        z: i32,
    },

    /// A block name could not be resolved.
    #[error("unknown block: {0}")]
    UnknownBlock(String),

    /// Block data length does not match the map volume.
    #[error("block data has {actual} bytes, expected {expected}")]
    VolumeMismatch {
        /// Volume of the map.
        expected: usize,
        /// Length of the data supplied.
        actual: usize,
    },

    /// Compression failed.
    #[error("snapshot compression failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for map operations.
pub type MapResult<T> = Result<T, MapError>;
