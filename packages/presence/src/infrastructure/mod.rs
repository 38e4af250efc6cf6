//! Infrastructure layer: wire format and room channel implementations.

pub mod channel;
pub mod dto;
