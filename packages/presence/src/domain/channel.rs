//! Room broadcast channel seam.
//!
//! The transport itself lives outside this crate's domain. A session only needs to
//! push its full presence outward, announce that it leaves, and receive what other
//! connections publish.

use async_trait::async_trait;

use super::{ChannelError, ConnectionId, Presence};

/// Inbound notification about another connection in the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// A connection published its latest presence
    Update {
        connection_id: ConnectionId,
        presence: Presence,
    },
    /// A connection left the room; delivered once per leaving connection
    Leave { connection_id: ConnectionId },
}

/// Outbound half of a room membership.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomChannel: Send + Sync {
    /// Identifier the transport assigned to this connection.
    fn connection_id(&self) -> ConnectionId;

    /// Fire-and-forget delivery of the full presence to every other connection.
    async fn broadcast(&self, presence: &Presence) -> Result<(), ChannelError>;

    /// Leave the room. The transport announces the departure to the remaining
    /// connections.
    async fn leave(&self) -> Result<(), ChannelError>;
}

/// Inbound half of a room membership.
#[async_trait]
pub trait RoomSubscription: Send {
    /// Wait for the next event. `None` once the transport has closed.
    async fn next_event(&mut self) -> Option<RoomEvent>;

    /// Next already-delivered event, without waiting.
    fn try_next_event(&mut self) -> Option<RoomEvent>;
}
