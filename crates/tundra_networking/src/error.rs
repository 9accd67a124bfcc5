//! Error types for the wire codec, sessions and the heartbeat client.

use std::io;

use thiserror::Error;
use tundra_core::MapError;

use crate::session::LeaveReason;

/// Errors decoding or encoding Classic packets.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The opcode is not part of the Classic protocol.
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),

    /// The buffer ended before the packet did.
    #[error("truncated packet {opcode:#04x}: need {needed} bytes, have {available}")]
    Truncated {
        /// Opcode being decoded.
        opcode: u8,
        /// Full packet length including the opcode.
        needed: usize,
        /// Bytes that were available.
        available: usize,
    },

    /// A level chunk carried more than 1024 bytes.
    #[error("level chunk of {0} bytes exceeds 1024")]
    ChunkTooLarge(usize),

    /// Socket failure while reading or writing a packet.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for codec operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Reasons a session ended early.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session was closed with a leave reason after the client was told why.
    #[error("disconnected ({reason}): {message}")]
    Kicked {
        /// Why the session ended.
        reason: LeaveReason,
        /// Text sent to the client.
        message: String,
    },

    /// Codec or socket failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The world map could not be snapshotted for transfer.
    #[error("level transfer failed: {0}")]
    Map(#[from] MapError),
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        Self::Protocol(ProtocolError::Io(err))
    }
}

impl SessionError {
    /// Leave reason to record for this error.
    #[must_use]
    pub fn leave_reason(&self) -> LeaveReason {
        match self {
            Self::Kicked { reason, .. } => *reason,
            Self::Protocol(ProtocolError::UnknownOpcode(_)) => LeaveReason::InvalidOpcode,
            Self::Protocol(ProtocolError::Io(err)) if is_timeout(err) => LeaveReason::Timeout,
            Self::Protocol(ProtocolError::Io(_)) => LeaveReason::ClientQuit,
            Self::Protocol(_) => LeaveReason::ProtocolViolation,
            Self::Map(_) => LeaveReason::Unknown,
        }
    }
}

/// Result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors from one heartbeat attempt.
#[derive(Debug, Error)]
pub enum HeartbeatError {
    /// The data file is missing a field or has a malformed one.
    #[error("heartbeat data line {line}: {message}")]
    MalformedData {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// The heartbeat URL is not a plain `http://` URL.
    #[error("unsupported heartbeat url: {0}")]
    BadUrl(String),

    /// The listing server answered with a non-success status.
    #[error("heartbeat rejected with status {0}")]
    Status(u16),

    /// The response could not be parsed as HTTP.
    #[error("malformed http response")]
    BadResponse,

    /// Network or file failure.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// True for the error kinds a read timeout produces.
pub(crate) fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}
