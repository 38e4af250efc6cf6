//! Domain error types.

use thiserror::Error;

use super::ConnectionId;

/// Errors raised while building domain values from external input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Color literal is not of the form `#RRGGBB`
    #[error("Invalid color '{0}': expected #RRGGBB")]
    InvalidColor(String),

    /// A palette needs at least one color
    #[error("Palette must contain at least one color")]
    EmptyPalette,
}

/// Errors reported by a room channel implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The connection is no longer a member of the room
    #[error("Connection {0} is not a member of the room")]
    Closed(ConnectionId),

    /// The payload could not be encoded for the wire
    #[error("Failed to encode payload: {0}")]
    Encode(String),

    /// The transport refused the payload
    #[error("Failed to push payload: {0}")]
    PushFailed(String),
}
