//! Generation error types.

use thiserror::Error;
use tundra_core::MapError;

/// Errors raised while preparing or running a generator.
///
/// Cancellation is not an error; see [`crate::GenOutcome::Canceled`].
#[derive(Debug, Error)]
pub enum GenError {
    /// Parameters failed validation. Raised before any voxel work.
    #[error("invalid generator parameters: {0}")]
    InvalidParams(String),

    /// A generator name is already registered.
    #[error("generator \"{0}\" is already registered")]
    DuplicateGenerator(String),

    /// No generator with that name.
    #[error("unknown generator \"{0}\"")]
    UnknownGenerator(String),

    /// No template with that name.
    #[error("unknown template \"{0}\"")]
    UnknownTemplate(String),

    /// No theme with that name.
    #[error("unknown theme \"{0}\"")]
    UnknownTheme(String),

    /// Parameter document version is not understood.
    #[error("unsupported parameter document version {0}")]
    UnsupportedVersion(i64),

    /// Parameter document could not be parsed.
    #[error("failed to parse parameter document: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parameter document could not be written.
    #[error("failed to write parameter document: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Map buffer error.
    #[error(transparent)]
    Map(#[from] MapError),
}

/// Result type for generation.
pub type GenResult<T> = Result<T, GenError>;
