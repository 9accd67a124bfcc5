//! Top-level error type for the server binary.

use std::io;

use thiserror::Error;
use tundra_core::MapError;
use tundra_procedural::GenError;

use crate::config::ConfigError;

/// Startup and runtime failures.
#[derive(Debug, Error)]
pub enum TundraError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// World generation failed.
    #[error("world generation failed: {0}")]
    Generation(#[from] GenError),

    /// Map data was invalid.
    #[error("map error: {0}")]
    Map(#[from] MapError),

    /// Generation was canceled before producing a map.
    #[error("world generation was canceled")]
    Canceled,

    /// A size argument was not `WxLxH`.
    #[error("invalid map size '{0}', expected WIDTHxLENGTHxHEIGHT")]
    BadSize(String),

    /// Socket or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for the binary.
pub type TundraResult<T> = Result<T, TundraError>;
