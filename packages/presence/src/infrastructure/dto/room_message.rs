//! Typed envelopes exchanged through the room channel.
//!
//! ```json
//! {"type":"presence-updated","connectionId":3,"presence":{"cursor":{"x":10,"y":20}}}
//! {"type":"participant-left","connectionId":3}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ConnectionId, Presence, RoomEvent};

use super::presence::PresenceDto;

/// Message type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    PresenceUpdated,
    ParticipantLeft,
}

/// A connection published its latest presence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdatedMessage {
    pub r#type: MessageType,
    pub connection_id: ConnectionId,
    pub presence: PresenceDto,
}

/// A connection left the room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantLeftMessage {
    pub r#type: MessageType,
    pub connection_id: ConnectionId,
}

/// Envelope as received, with the presence payload left unparsed so that a bad
/// payload does not lose the connection id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomingMessage {
    r#type: MessageType,
    connection_id: ConnectionId,
    #[serde(default)]
    presence: serde_json::Value,
}

/// The envelope itself could not be interpreted
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid room message: {0}")]
    InvalidMessage(#[from] serde_json::Error),
}

pub fn encode_presence_updated(
    connection_id: ConnectionId,
    presence: &Presence,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&PresenceUpdatedMessage {
        r#type: MessageType::PresenceUpdated,
        connection_id,
        presence: PresenceDto::from(presence),
    })
}

pub fn encode_participant_left(connection_id: ConnectionId) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ParticipantLeftMessage {
        r#type: MessageType::ParticipantLeft,
        connection_id,
    })
}

/// Decode one room message.
///
/// A `presence-updated` message whose presence does not match the schema is still
/// accepted, as `cursor: null`: a broken remote cursor must not interrupt the
/// session. Only an envelope without a usable type or connection id is an error.
pub fn decode_room_message(text: &str) -> Result<RoomEvent, DecodeError> {
    let incoming: IncomingMessage = serde_json::from_str(text)?;
    let connection_id = incoming.connection_id;

    match incoming.r#type {
        MessageType::ParticipantLeft => Ok(RoomEvent::Leave { connection_id }),
        MessageType::PresenceUpdated => {
            let presence = match serde_json::from_value::<PresenceDto>(incoming.presence) {
                Ok(dto) => Presence::from(dto),
                Err(e) => {
                    tracing::warn!(
                        "Malformed presence from {}, treating cursor as null: {}",
                        connection_id,
                        e
                    );
                    Presence::default()
                }
            };
            Ok(RoomEvent::Update {
                connection_id,
                presence,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Cursor;

    #[test]
    fn test_encode_presence_updated() {
        // テスト項目: presence-updated メッセージが camelCase の JSON になる
        // given (前提条件):
        let presence = Presence::pointing(Cursor::new(10, 20).with_message(Some("hi")));

        // when (操作):
        let json = encode_presence_updated(ConnectionId::new(3), &presence).unwrap();

        // then (期待する結果):
        assert_eq!(
            json,
            r#"{"type":"presence-updated","connectionId":3,"presence":{"cursor":{"x":10,"y":20,"message":"hi"}}}"#
        );
    }

    #[test]
    fn test_encode_participant_left() {
        // テスト項目: participant-left メッセージが正しい JSON になる
        // given (前提条件):

        // when (操作):
        let json = encode_participant_left(ConnectionId::new(4)).unwrap();

        // then (期待する結果):
        assert_eq!(json, r#"{"type":"participant-left","connectionId":4}"#);
    }

    #[test]
    fn test_decode_presence_with_and_without_message() {
        // テスト項目: message の有無・null のいずれも正しく取り込まれる
        // given (前提条件):
        let with_message = r#"{"type":"presence-updated","connectionId":1,"presence":{"cursor":{"x":1,"y":2,"message":"yo"}}}"#;
        let without_message = r#"{"type":"presence-updated","connectionId":1,"presence":{"cursor":{"x":1,"y":2}}}"#;
        let null_message = r#"{"type":"presence-updated","connectionId":1,"presence":{"cursor":{"x":1,"y":2,"message":null}}}"#;

        // when (操作):
        let decoded: Vec<RoomEvent> = [with_message, without_message, null_message]
            .iter()
            .map(|text| decode_room_message(text).unwrap())
            .collect();

        // then (期待する結果):
        let id = ConnectionId::new(1);
        assert_eq!(
            decoded,
            vec![
                RoomEvent::Update {
                    connection_id: id,
                    presence: Presence::pointing(Cursor::new(1, 2).with_message(Some("yo"))),
                },
                RoomEvent::Update {
                    connection_id: id,
                    presence: Presence::pointing(Cursor::new(1, 2)),
                },
                RoomEvent::Update {
                    connection_id: id,
                    presence: Presence::pointing(Cursor::new(1, 2)),
                },
            ]
        );
    }

    #[test]
    fn test_decode_malformed_presence_as_null_cursor() {
        // テスト項目: スキーマに合わないプレゼンスは cursor: null として取り込まれる
        // given (前提条件):
        let inputs = [
            // cursor キーなし
            r#"{"type":"presence-updated","connectionId":5,"presence":{}}"#,
            // presence キーなし
            r#"{"type":"presence-updated","connectionId":5}"#,
            // 座標が整数でない
            r#"{"type":"presence-updated","connectionId":5,"presence":{"cursor":{"x":"a","y":2}}}"#,
            // y がない
            r#"{"type":"presence-updated","connectionId":5,"presence":{"cursor":{"x":1}}}"#,
            // cursor の型が違う
            r#"{"type":"presence-updated","connectionId":5,"presence":{"cursor":"here"}}"#,
            // 座標が小数
            r#"{"type":"presence-updated","connectionId":5,"presence":{"cursor":{"x":1.5,"y":2}}}"#,
        ];

        // when (操作) / then (期待する結果):
        for input in inputs {
            let event = decode_room_message(input).unwrap();
            assert_eq!(
                event,
                RoomEvent::Update {
                    connection_id: ConnectionId::new(5),
                    presence: Presence::default(),
                },
                "input: {}",
                input
            );
        }
    }

    #[test]
    fn test_decode_participant_left() {
        // テスト項目: participant-left メッセージが Leave イベントになる
        // given (前提条件):
        let input = r#"{"type":"participant-left","connectionId":9}"#;

        // when (操作):
        let event = decode_room_message(input).unwrap();

        // then (期待する結果):
        assert_eq!(
            event,
            RoomEvent::Leave {
                connection_id: ConnectionId::new(9)
            }
        );
    }

    #[test]
    fn test_decode_invalid_envelope() {
        // テスト項目: 種別や connectionId が解釈できないメッセージはエラーになる
        // given (前提条件):
        let inputs = [
            "not json",
            r#"{"type":"chat","connectionId":1}"#,
            r#"{"type":"presence-updated"}"#,
            r#"{"type":"participant-left","connectionId":-1}"#,
        ];

        // when (操作) / then (期待する結果):
        for input in inputs {
            assert!(decode_room_message(input).is_err(), "input: {}", input);
        }
    }
}
