//! Input mode controller: toggles between broadcasting only the cursor position and
//! broadcasting the position together with an editable message.

/// Current input mode of one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    /// Broadcasting position only
    #[default]
    Idle,
    /// Broadcasting position and the message being typed
    Editing,
}

/// Key identifier from a key-down event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Other(String),
}

impl Key {
    /// Map a key identifier (`"Enter"`, `"Escape"`, `"a"`, ...) to a [`Key`].
    pub fn from_identifier(identifier: &str) -> Self {
        match identifier {
            "Enter" => Key::Enter,
            "Escape" | "Esc" => Key::Escape,
            other => Key::Other(other.to_string()),
        }
    }
}

/// Keys that open and cancel message editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    pub open: Key,
    pub cancel: Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            open: Key::Enter,
            cancel: Key::Escape,
        }
    }
}

/// Result of feeding a key to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeTransition {
    /// `Idle -> Editing`
    Opened,
    /// `Editing -> Idle`
    Cancelled,
    /// No state change
    Unchanged,
}

/// Two-state controller owned by one session.
///
/// Besides the mode it keeps the draft message typed into the field. The draft is
/// dropped when editing is cancelled, so reopening starts from an empty field.
#[derive(Debug, Clone, Default)]
pub struct InputModeController {
    mode: InputMode,
    bindings: KeyBindings,
    draft: Option<String>,
}

impl InputModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bindings(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn is_editing(&self) -> bool {
        self.mode == InputMode::Editing
    }

    /// Apply a key-down event. Only the bound keys change state.
    pub fn on_key(&mut self, key: &Key) -> ModeTransition {
        match self.mode {
            InputMode::Idle if *key == self.bindings.open => {
                self.mode = InputMode::Editing;
                ModeTransition::Opened
            }
            InputMode::Editing if *key == self.bindings.cancel => {
                self.mode = InputMode::Idle;
                self.draft = None;
                ModeTransition::Cancelled
            }
            _ => ModeTransition::Unchanged,
        }
    }

    /// Record new contents of the message field.
    ///
    /// Returns `false` when not editing: there is no field to type into, so the
    /// change is ignored.
    pub fn on_text_change(&mut self, text: &str) -> bool {
        if !self.is_editing() {
            return false;
        }
        self.draft = Some(text.to_string()).filter(|t| !t.is_empty());
        true
    }

    /// Message to attach to the cursor: the non-empty draft while editing, `None` otherwise.
    pub fn active_message(&self) -> Option<&str> {
        match self.mode {
            InputMode::Editing => self.draft.as_deref(),
            InputMode::Idle => None,
        }
    }
}
