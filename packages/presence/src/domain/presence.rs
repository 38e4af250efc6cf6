/// Cursor position of one participant, with an optional attached message.
///
/// Coordinates are integer pixels relative to the participant's viewport.
/// `message` is `None` both before anything is typed and after the field is
/// cleared; an empty string is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub x: i32,
    pub y: i32,
    message: Option<String>,
}

impl Cursor {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            message: None,
        }
    }

    /// Build a cursor from floating pointer coordinates.
    ///
    /// Rounds half up, the way browsers report rounded client coordinates.
    pub fn from_pointer(x: f64, y: f64) -> Self {
        Self::new(round_pixel(x), round_pixel(y))
    }

    /// Attach (or clear, with `None` or `""`) the message.
    pub fn with_message<S: Into<String>>(mut self, message: Option<S>) -> Self {
        self.set_message(message);
        self
    }

    pub fn set_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.message = message.map(Into::into).filter(|m| !m.is_empty());
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn has_message(&self) -> bool {
        self.message.is_some()
    }
}

fn round_pixel(value: f64) -> i32 {
    // NaN maps to 0 and out-of-range values saturate
    (value + 0.5).floor() as i32
}

/// Ephemeral state broadcast by one participant.
///
/// `cursor: None` means the participant is connected but not pointing inside the room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presence {
    pub cursor: Option<Cursor>,
}

impl Presence {
    pub fn pointing(cursor: Cursor) -> Self {
        Self {
            cursor: Some(cursor),
        }
    }

    pub fn is_pointing(&self) -> bool {
        self.cursor.is_some()
    }

    /// Shallow merge: every field present in the patch replaces the current value.
    pub fn merge(&mut self, patch: PresencePatch) {
        if let Some(cursor) = patch.cursor {
            self.cursor = cursor;
        }
    }
}

/// Partial presence used for shallow-merge updates.
///
/// The outer `Option` says whether the field is touched at all, the inner one is
/// the new value (`Some(None)` sets `cursor: null`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresencePatch {
    pub cursor: Option<Option<Cursor>>,
}

impl PresencePatch {
    pub fn cursor(cursor: Option<Cursor>) -> Self {
        Self {
            cursor: Some(cursor),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.is_none()
    }
}
