//! Output formatting for the room simulator.

use hiroba_presence::domain::{ConnectionId, InputMode, Presence, RemoteCursor};
use hiroba_shared::time::timestamp_to_rfc3339;

use crate::command::USAGE;

const RULE: &str = "============================================================";

/// Output formatter for the simulator
pub struct RoomFormatter;

impl RoomFormatter {
    /// Format a participant-joined notification
    ///
    /// # Arguments
    ///
    /// * `connection_id` - The participant who joined
    /// * `joined_at` - Unix timestamp when the participant joined (milliseconds)
    pub fn format_joined(connection_id: ConnectionId, joined_at: i64) -> String {
        format!(
            "+ {} entered at {}",
            connection_id,
            timestamp_to_rfc3339(joined_at)
        )
    }

    /// Format a participant-left notification
    pub fn format_left(connection_id: ConnectionId, left_at: i64) -> String {
        format!("- {} left at {}", connection_id, timestamp_to_rfc3339(left_at))
    }

    /// Format the participant list
    ///
    /// # Arguments
    ///
    /// * `participants` - `(connection id, joined at)` pairs, in display order
    pub fn format_participants(participants: &[(ConnectionId, i64)]) -> String {
        let mut output = String::new();
        output.push_str(RULE);
        output.push_str("\nParticipants:\n");

        if participants.is_empty() {
            output.push_str("(No participants)\n");
        } else {
            for (connection_id, joined_at) in participants {
                output.push_str(&format!(
                    "{} - entered at {}\n",
                    connection_id,
                    timestamp_to_rfc3339(*joined_at)
                ));
            }
        }

        output.push_str(RULE);
        output
    }

    /// Format the room as seen by one participant
    ///
    /// # Arguments
    ///
    /// * `local` - The viewing participant
    /// * `mode` - Its input mode
    /// * `presence` - Its own presence (not drawn as a remote cursor)
    /// * `cursors` - Remote cursors to draw, in display order
    /// * `not_pointing` - Remote participants whose cursor is null
    pub fn format_view(
        local: ConnectionId,
        mode: InputMode,
        presence: &Presence,
        cursors: &[RemoteCursor<'_>],
        not_pointing: &[ConnectionId],
    ) -> String {
        let mut output = String::new();
        output.push_str(RULE);
        output.push_str(&format!("\nView of {} ({:?})\n", local, mode));
        output.push_str(&format!("me: {}\n", Self::format_presence(presence)));

        if cursors.is_empty() {
            output.push_str("(No remote cursors)\n");
        }
        for cursor in cursors {
            output.push_str(&format!(
                "{} {} at ({}, {})",
                cursor.color, cursor.connection_id, cursor.x, cursor.y
            ));
            if let Some(message) = cursor.message {
                output.push_str(&format!(" \"{}\"", message));
            }
            output.push('\n');
        }

        if !not_pointing.is_empty() {
            let ids: Vec<String> = not_pointing.iter().map(ToString::to_string).collect();
            output.push_str(&format!("not pointing: {}\n", ids.join(", ")));
        }

        output.push_str(RULE);
        output
    }

    fn format_presence(presence: &Presence) -> String {
        match &presence.cursor {
            None => "(out of room)".to_string(),
            Some(cursor) => match cursor.message() {
                Some(message) => format!("({}, {}) \"{}\"", cursor.x, cursor.y, message),
                None => format!("({}, {})", cursor.x, cursor.y),
            },
        }
    }

    /// Format the command usage
    pub fn format_help() -> String {
        let width = USAGE.iter().map(|(usage, _)| usage.len()).max().unwrap_or(0);
        USAGE
            .iter()
            .map(|(usage, description)| format!("  {:<width$}  {}", usage, description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
