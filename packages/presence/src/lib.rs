//! Room presence synchronization library.
//!
//! Lets participants of a shared room see each other's live cursor and an optional
//! short message attached to it. Each participant owns one [`usecase::PresenceSession`]
//! which keeps the local presence, the latest presence of every other participant,
//! and the two-state input mode controller.

// layers
pub mod domain;
pub mod infrastructure;
pub mod usecase;
