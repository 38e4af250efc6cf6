//! Presence payload DTOs.
//!
//! ```json
//! { "cursor": null }
//! { "cursor": { "x": 10, "y": 20 } }
//! { "cursor": { "x": 10, "y": 20, "message": "hi" } }
//! ```

use serde::{Deserialize, Serialize};

/// Cursor payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorDto {
    pub x: i32,
    pub y: i32,
    /// Absent (or null) means "no message"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Presence payload. `cursor` is always serialized, as `null` when not pointing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceDto {
    pub cursor: Option<CursorDto>,
}
