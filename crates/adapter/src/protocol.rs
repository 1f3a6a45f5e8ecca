//! Protocol module - JSON message types for the poker session
//!
//! Line-delimited JSON: one object per line, each carrying a `type`
//! discriminator. The codec is stateless; unknown fields are ignored so that
//! clients may send their whole local identity object.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{Participant, SessionSnapshot};
use crate::types::PlayerId;

// ============== Transport Preamble ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinRoomType {
    #[serde(rename = "JoinRoom")]
    JoinRoom,
}

impl Default for JoinRoomType {
    fn default() -> Self {
        Self::JoinRoom
    }
}

/// First line on every connection: names the room out-of-band of the
/// session messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: JoinRoomType,
    pub room: String,
}

// ============== Client -> Server Messages ==============

/// The client's whole local identity, sent with every name or value change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPayload {
    pub player_id: PlayerId,
    pub name: String,
    /// Signed on the wire so that a negative estimate can be rejected
    /// explicitly instead of failing to parse.
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    ChangeName(IdentityPayload),
    ChangeValue(IdentityPayload),
    RevealNumbers { value: bool },
    Pong { player_id: PlayerId },
}

impl ClientMessage {
    pub fn type_name(&self) -> &'static str {
        match self {
            ClientMessage::ChangeName(_) => "ChangeName",
            ClientMessage::ChangeValue(_) => "ChangeValue",
            ClientMessage::RevealNumbers { .. } => "RevealNumbers",
            ClientMessage::Pong { .. } => "Pong",
        }
    }
}

const CLIENT_MESSAGE_TYPES: [&str; 4] = ["ChangeName", "ChangeValue", "RevealNumbers", "Pong"];

// ============== Server -> Client Messages ==============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub player_id: PlayerId,
    pub player_name: String,
    /// 0 means no estimate yet.
    pub value: u32,
    #[serde(default = "connected_by_default")]
    pub is_connected: bool,
}

fn connected_by_default() -> bool {
    true
}

impl From<&Participant> for PlayerState {
    fn from(p: &Participant) -> Self {
        Self {
            player_id: p.seat_id,
            player_name: p.display_name.clone(),
            value: p.estimate,
            is_connected: p.is_connected,
        }
    }
}

/// Reassignment notice. `current_id == new_id` (the default `{0, 0}`) means
/// nobody was moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NotifyChange {
    pub current_id: PlayerId,
    pub new_id: PlayerId,
}

impl NotifyChange {
    pub fn is_reassignment(&self) -> bool {
        self.current_id != self.new_id
    }
}

/// Full room state as broadcast to every client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub players: Vec<PlayerState>,
    pub all_revealed: bool,
    #[serde(default)]
    pub notify_change: NotifyChange,
}

impl StateSnapshot {
    pub fn player(&self, player_id: PlayerId) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.player_id == player_id)
    }
}

impl From<&SessionSnapshot> for StateSnapshot {
    fn from(s: &SessionSnapshot) -> Self {
        Self {
            players: s.participants.iter().map(PlayerState::from).collect(),
            all_revealed: s.all_revealed,
            notify_change: s
                .pending_reassignment
                .map(|r| NotifyChange {
                    current_id: r.current_id,
                    new_id: r.new_id,
                })
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    PlayerAssigned { player_id: PlayerId },
    UpdateState(StateSnapshot),
    Ping,
    ErrorMessage { message: String },
}

const SERVER_MESSAGE_TYPES: [&str; 4] = ["PlayerAssigned", "UpdateState", "Ping", "ErrorMessage"];

// ============== Message Parsing ==============

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("message has no type discriminator")]
    MissingType,
}

/// Parse one line sent by a client.
pub fn parse_client_message(json: &str) -> Result<ClientMessage, CodecError> {
    parse_tagged(json, &CLIENT_MESSAGE_TYPES)
}

/// Parse one line sent by the server.
pub fn parse_server_message(json: &str) -> Result<ServerMessage, CodecError> {
    parse_tagged(json, &SERVER_MESSAGE_TYPES)
}

/// Parse the connection preamble.
pub fn parse_join_room(json: &str) -> Result<JoinRoomMessage, CodecError> {
    Ok(serde_json::from_str::<JoinRoomMessage>(json)?)
}

fn parse_tagged<T>(json: &str, known: &[&str]) -> Result<T, CodecError>
where
    T: for<'de> Deserialize<'de>,
{
    match serde_json::from_str::<T>(json) {
        Ok(msg) => Ok(msg),
        Err(e) => {
            // Distinguish an unknown discriminator from a broken known message.
            #[derive(Debug, Deserialize)]
            struct TypeOnly {
                #[serde(rename = "type")]
                msg_type: Option<String>,
            }
            let msg_type = serde_json::from_str::<TypeOnly>(json)?.msg_type;
            match msg_type {
                None => Err(CodecError::MissingType),
                Some(t) if !known.contains(&t.as_str()) => Err(CodecError::UnknownType(t)),
                Some(_) => Err(CodecError::Malformed(e)),
            }
        }
    }
}

/// Serialize a message to a single line (without the trailing newline).
pub fn encode<T: Serialize>(msg: &T) -> Result<String, CodecError> {
    Ok(serde_json::to_string(msg)?)
}

// ============== Utility Functions ==============

pub fn create_join_room(room: &str) -> JoinRoomMessage {
    JoinRoomMessage {
        msg_type: JoinRoomType::JoinRoom,
        room: room.to_string(),
    }
}

pub fn create_error(message: &str) -> ServerMessage {
    ServerMessage::ErrorMessage {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Reassignment;

    #[test]
    fn test_parse_change_value_ignores_extra_fields() {
        let json = r#"{"type":"ChangeValue","player_id":2,"name":"Ann","value":5,"previous_player_size":3}"#;
        let msg = parse_client_message(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::ChangeValue(IdentityPayload {
                player_id: 2,
                name: "Ann".to_string(),
                value: 5,
            })
        );
    }

    #[test]
    fn test_parse_negative_value_is_not_a_codec_error() {
        let json = r#"{"type":"ChangeValue","player_id":0,"name":"","value":-3}"#;
        match parse_client_message(json).unwrap() {
            ClientMessage::ChangeValue(p) => assert_eq!(p.value, -3),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_reveal_and_pong() {
        assert_eq!(
            parse_client_message(r#"{"type":"RevealNumbers","value":true}"#).unwrap(),
            ClientMessage::RevealNumbers { value: true }
        );
        assert_eq!(
            parse_client_message(r#"{"type":"Pong","player_id":101}"#).unwrap(),
            ClientMessage::Pong { player_id: 101 }
        );
    }

    #[test]
    fn test_unknown_type_is_reported() {
        let err = parse_client_message(r#"{"type":"Shout","text":"hi"}"#).unwrap_err();
        assert!(matches!(err, CodecError::UnknownType(t) if t == "Shout"));
    }

    #[test]
    fn test_missing_type_is_reported() {
        let err = parse_client_message(r#"{"player_id":1}"#).unwrap_err();
        assert!(matches!(err, CodecError::MissingType));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            parse_client_message("not json").unwrap_err(),
            CodecError::Malformed(_)
        ));
        assert!(matches!(
            parse_client_message(r#"{"type":"ChangeValue","player_id":1}"#).unwrap_err(),
            CodecError::Malformed(_)
        ));
    }

    #[test]
    fn test_server_messages_wire_shape() {
        let ping = encode(&ServerMessage::Ping).unwrap();
        assert_eq!(ping, r#"{"type":"Ping"}"#);

        let assigned = encode(&ServerMessage::PlayerAssigned { player_id: 3 }).unwrap();
        assert_eq!(assigned, r#"{"type":"PlayerAssigned","player_id":3}"#);

        let err: serde_json::Value = serde_json::from_str(&encode(&create_error("nope")).unwrap()).unwrap();
        assert_eq!(err["type"], "ErrorMessage");
        assert_eq!(err["message"], "nope");
    }

    #[test]
    fn test_update_state_is_flattened() {
        let snapshot = SessionSnapshot {
            participants: vec![Participant::new(0, "Ann")],
            all_revealed: false,
            pending_reassignment: Some(Reassignment {
                current_id: 100,
                new_id: 0,
            }),
        };
        let msg = ServerMessage::UpdateState(StateSnapshot::from(&snapshot));
        let v: serde_json::Value = serde_json::from_str(&encode(&msg).unwrap()).unwrap();
        assert_eq!(v["type"], "UpdateState");
        assert_eq!(v["players"][0]["player_id"], 0);
        assert_eq!(v["players"][0]["player_name"], "Ann");
        assert_eq!(v["players"][0]["value"], 0);
        assert_eq!(v["players"][0]["is_connected"], true);
        assert_eq!(v["all_revealed"], false);
        assert_eq!(v["notify_change"]["current_id"], 100);
        assert_eq!(v["notify_change"]["new_id"], 0);
    }

    #[test]
    fn test_missing_notice_defaults_to_noop() {
        let json = r#"{"type":"UpdateState","players":[],"all_revealed":true}"#;
        match parse_server_message(json).unwrap() {
            ServerMessage::UpdateState(s) => {
                assert!(s.all_revealed);
                assert!(!s.notify_change.is_reassignment());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_join_room() {
        let join = parse_join_room(r#"{"type":"JoinRoom","room":"SwiftFox"}"#).unwrap();
        assert_eq!(join, create_join_room("SwiftFox"));
        assert!(parse_join_room(r#"{"type":"JoinRoom"}"#).is_err());
    }
}
