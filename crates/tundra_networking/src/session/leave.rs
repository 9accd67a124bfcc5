//! Why a session ended.

use std::fmt;

/// Recorded reason for a session ending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LeaveReason {
    /// The client closed the connection.
    ClientQuit,
    /// Kicked by a player, the console, or a hook.
    Kicked,
    /// Malformed handshake, bad protocol version or name.
    ProtocolViolation,
    /// Chat with characters the client cannot have typed.
    InvalidMessage,
    /// Block edit outside the map or with an unknown block.
    InvalidSetTile,
    /// Opcode a client never sends.
    InvalidOpcode,
    /// Name verification failed.
    UnverifiedName,
    /// The name is banned.
    Banned,
    /// The address is banned.
    IpBanned,
    /// No free player slots.
    ServerFull,
    /// Too many sessions from one address.
    TooManyConnections,
    /// A client speaking a different protocol.
    UnsupportedClient,
    /// The server is stopping.
    ServerShutdown,
    /// No traffic for too long.
    Timeout,
    /// Anything else.
    Unknown,
}

impl LeaveReason {
    /// Message shown to a client kicked for this reason.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ClientQuit => "Quit",
            Self::Kicked => "You were kicked",
            Self::ProtocolViolation => "Protocol violation",
            Self::InvalidMessage => "Illegal characters in chat message",
            Self::InvalidSetTile => "Invalid block change",
            Self::InvalidOpcode => "Unknown packet",
            Self::UnverifiedName => "Could not verify player name",
            Self::Banned => "You are banned",
            Self::IpBanned => "Your IP address is banned",
            Self::ServerFull => "Server is full",
            Self::TooManyConnections => "Too many connections from your IP",
            Self::UnsupportedClient => "Unsupported client",
            Self::ServerShutdown => "Server shutting down",
            Self::Timeout => "Timed out",
            Self::Unknown => "Disconnected",
        }
    }
}

impl fmt::Display for LeaveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
