//! Room channel implementations.
//!
//! - `inmemory`: in-process fan-out over `tokio::sync::mpsc`

pub mod inmemory;

pub use inmemory::{InMemoryRoomChannel, InMemoryRoomHub, InMemorySubscription, RoomMembership};
