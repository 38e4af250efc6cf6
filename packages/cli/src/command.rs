//! Simulator command-line parsing.

use std::str::FromStr;

use hiroba_presence::domain::ConnectionId;
use thiserror::Error;

/// One simulator command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Join a new participant
    Join,
    /// Move a participant's pointer to viewport coordinates
    Move { id: ConnectionId, x: f64, y: f64 },
    /// Move a participant's pointer out of the room
    Out { id: ConnectionId },
    /// Press a key (`Enter`, `Escape`, ...)
    Key { id: ConnectionId, key: String },
    /// Replace the contents of the message field (empty clears it)
    Type { id: ConnectionId, text: String },
    /// Leave the room
    Leave { id: ConnectionId },
    /// Show what a participant sees
    Show { id: ConnectionId },
    /// List participants in the room
    List,
    Help,
    Quit,
}

/// Command parse errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}' (type 'help' for usage)")]
    Unknown(String),

    #[error("Missing argument <{argument}> for '{command}'")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("Invalid {argument}: '{value}'")]
    InvalidArgument {
        argument: &'static str,
        value: String,
    },
}

/// Usage lines shown by `help`
pub const USAGE: &[(&str, &str)] = &[
    ("join", "join a new participant"),
    ("move <id> <x> <y>", "move the pointer of <id>"),
    ("out <id>", "move the pointer of <id> out of the room"),
    ("key <id> <key>", "press a key (Enter opens, Escape closes the message)"),
    ("type <id> [text]", "set the message field of <id> (empty clears it)"),
    ("leave <id>", "leave the room"),
    ("show <id>", "show the room as seen by <id>"),
    ("list", "list participants"),
    ("help", "show this help"),
    ("quit", "exit"),
];

struct Args<'a> {
    command: &'static str,
    rest: &'a str,
}

impl<'a> Args<'a> {
    /// Take the next whitespace-separated token
    fn next(&mut self, argument: &'static str) -> Result<&'a str, CommandError> {
        let rest = self.rest.trim_start();
        if rest.is_empty() {
            return Err(CommandError::MissingArgument {
                command: self.command,
                argument,
            });
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (token, remaining) = rest.split_at(end);
        self.rest = remaining;
        Ok(token)
    }

    fn connection_id(&mut self) -> Result<ConnectionId, CommandError> {
        let token = self.next("id")?;
        token
            .trim_start_matches('#')
            .parse::<u64>()
            .map(ConnectionId::new)
            .map_err(|_| CommandError::InvalidArgument {
                argument: "id",
                value: token.to_string(),
            })
    }

    fn coordinate(&mut self, argument: &'static str) -> Result<f64, CommandError> {
        let token = self.next(argument)?;
        token
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| CommandError::InvalidArgument {
                argument,
                value: token.to_string(),
            })
    }

    /// Everything after the single separating space, verbatim
    fn remainder(self) -> String {
        self.rest
            .strip_prefix(' ')
            .unwrap_or(self.rest)
            .to_string()
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']).trim_start();
        let end = line.find(char::is_whitespace).unwrap_or(line.len());
        let (name, rest) = line.split_at(end);

        let command: &'static str = match name.to_ascii_lowercase().as_str() {
            "" => return Err(CommandError::Empty),
            "join" => "join",
            "move" => "move",
            "out" => "out",
            "key" => "key",
            "type" => "type",
            "leave" => "leave",
            "show" => "show",
            "list" => "list",
            "help" => "help",
            "quit" | "exit" => "quit",
            _ => return Err(CommandError::Unknown(name.to_string())),
        };
        let mut args = Args { command, rest };

        let parsed = match command {
            "join" => Command::Join,
            "move" => Command::Move {
                id: args.connection_id()?,
                x: args.coordinate("x")?,
                y: args.coordinate("y")?,
            },
            "out" => Command::Out {
                id: args.connection_id()?,
            },
            "key" => Command::Key {
                id: args.connection_id()?,
                key: args.next("key")?.to_string(),
            },
            "type" => Command::Type {
                id: args.connection_id()?,
                text: args.remainder(),
            },
            "leave" => Command::Leave {
                id: args.connection_id()?,
            },
            "show" => Command::Show {
                id: args.connection_id()?,
            },
            "list" => Command::List,
            "help" => Command::Help,
            _ => Command::Quit,
        };
        Ok(parsed)
    }
}
