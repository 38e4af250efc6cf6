//! Data Transfer Objects (DTOs) for the room wire format.
//!
//! - `presence`: presence payload DTOs
//! - `room_message`: typed envelopes exchanged through the room channel
//! - `conversion`: conversions between DTOs and domain models

pub mod conversion;
pub mod presence;
pub mod room_message;

pub use room_message::{
    DecodeError, decode_room_message, encode_participant_left, encode_presence_updated,
};
