//! Conversions between DTOs and domain models.

use crate::domain::{Cursor, Presence};

use super::presence::{CursorDto, PresenceDto};

impl From<&Cursor> for CursorDto {
    fn from(cursor: &Cursor) -> Self {
        Self {
            x: cursor.x,
            y: cursor.y,
            message: cursor.message().map(str::to_string),
        }
    }
}

impl From<CursorDto> for Cursor {
    fn from(dto: CursorDto) -> Self {
        Cursor::new(dto.x, dto.y).with_message(dto.message)
    }
}

impl From<&Presence> for PresenceDto {
    fn from(presence: &Presence) -> Self {
        Self {
            cursor: presence.cursor.as_ref().map(CursorDto::from),
        }
    }
}

impl From<PresenceDto> for Presence {
    fn from(dto: PresenceDto) -> Self {
        Self {
            cursor: dto.cursor.map(Cursor::from),
        }
    }
}
