//! Domain layer: presence types, color assignment, input mode and the room channel seam.
//!
//! Nothing in here performs I/O. The transport is reached only through the
//! [`RoomChannel`] and [`RoomSubscription`] traits which the infrastructure layer implements.

mod channel;
mod color;
mod connection;
mod error;
mod input_mode;
mod presence;
mod registry;
mod room;

pub use channel::{RoomChannel, RoomEvent, RoomSubscription};
#[cfg(test)]
pub use channel::MockRoomChannel;
pub use color::{Color, DEFAULT_PALETTE, Palette};
pub use connection::ConnectionId;
pub use error::{ChannelError, DomainError};
pub use input_mode::{InputMode, InputModeController, Key, KeyBindings, ModeTransition};
pub use presence::{Cursor, Presence, PresencePatch};
pub use registry::{RemoteCursor, RemotePresenceRegistry, Snapshot};
pub use room::RoomId;
