use serde::{Deserialize, Serialize};

/// Colour a participant plays in a room
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

/// A move as submitted by the client that played it
///
/// `id` is generated by the submitting client and is what the room dedupes
/// on; it is optional on the wire so a missing id can be reported rather
/// than failing to parse.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MoveSubmission {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// A move as recorded in a room's log, with its room-assigned sequence
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SequencedMove {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
    pub seq: u64,
}

/// A chat line as relayed to everyone in a room
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatLine {
    pub room_id: String,
    pub id: String,
    pub text: String,
    /// Milliseconds since the Unix epoch
    pub ts: i64,
}

/// Messages sent by clients
///
/// Requests that expect an [`ServerMessage::Ack`] carry a `req` number the
/// server echoes back.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    NewGame,
    JoinGame {
        room_id: String,
    },
    PlayerMove {
        req: u64,
        room_id: String,
        #[serde(rename = "move")]
        mv: MoveSubmission,
    },
    SyncRequest {
        req: u64,
        room_id: String,
        last_seq: u64,
    },
    Resign {
        room_id: String,
    },
    RejoinRoom {
        room_id: String,
        player_id: String,
    },
    ChatMessage {
        req: u64,
        room_id: String,
        #[serde(default)]
        id: Option<String>,
        text: String,
        #[serde(default)]
        ts: Option<i64>,
    },
}

/// Messages sent by the server
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First frame on every connection
    ServerInfo {
        build: String,
        connection: u64,
    },
    /// Reply to `new_game`; the creator is host and plays white
    GameCreated {
        room_id: String,
        player_id: String,
    },
    /// Both seats are filled; sent to each participant with its own colour
    StartGame {
        room_id: String,
        color: Side,
        player_id: String,
    },
    OpponentMove(SequencedMove),
    OpponentStatus {
        online: bool,
    },
    OpponentLeft {
        room_id: String,
    },
    OpponentResigned {
        room_id: String,
    },
    RejoinAck {
        ok: bool,
    },
    ChatMessage(ChatLine),
    /// Per-request acknowledgement
    Ack {
        req: u64,
        result: AckResult,
    },
    /// Request that could not be handled and has no ack slot
    Error {
        code: String,
        message: String,
    },
}

/// Body of an acknowledgement
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AckResult {
    /// Move accepted; `duplicate` when the id had been seen before
    Move { seq: u64, duplicate: bool },
    /// Every logged move after the caller's `last_seq`
    Sync {
        moves: Vec<SequencedMove>,
        server_seq: u64,
    },
    Chat { id: String },
    Error { code: String, message: String },
}

impl AckResult {
    pub fn is_ok(&self) -> bool {
        !matches!(self, AckResult::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_player_move_wire_shape() {
        let msg = ClientMessage::PlayerMove {
            req: 7,
            room_id: "ABCD1234".to_string(),
            mv: MoveSubmission {
                from: "e2".to_string(),
                to: "e4".to_string(),
                promotion: None,
                id: Some("m-1".to_string()),
            },
        };
        let value = serde_json::to_value(&msg).expect("Should serialize");
        assert_eq!(
            value,
            json!({
                "type": "player_move",
                "req": 7,
                "room_id": "ABCD1234",
                "move": { "from": "e2", "to": "e4", "id": "m-1" }
            })
        );
    }

    #[test]
    fn test_player_move_without_id_still_parses() {
        let text = r#"{"type":"player_move","req":1,"room_id":"R","move":{"from":"e2","to":"e4"}}"#;
        let decoded: ClientMessage = serde_json::from_str(text).expect("Should deserialize");

        match decoded {
            ClientMessage::PlayerMove { mv, .. } => assert_eq!(mv.id, None),
            _ => panic!("Wrong message type after deserialization"),
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let text = r#"{"type":"launch_missiles","room_id":"R"}"#;
        assert!(serde_json::from_str::<ClientMessage>(text).is_err());
    }

    #[test]
    fn test_opponent_move_is_flat() {
        let msg = ServerMessage::OpponentMove(SequencedMove {
            id: "m-1".to_string(),
            from: "e7".to_string(),
            to: "e5".to_string(),
            promotion: None,
            seq: 2,
        });
        let value = serde_json::to_value(&msg).expect("Should serialize");
        assert_eq!(
            value,
            json!({ "type": "opponent_move", "id": "m-1", "from": "e7", "to": "e5", "seq": 2 })
        );
    }

    #[test]
    fn test_ack_carries_status_tag() {
        let msg = ServerMessage::Ack {
            req: 3,
            result: AckResult::Move {
                seq: 5,
                duplicate: true,
            },
        };
        let text = serde_json::to_string(&msg).expect("Should serialize");
        let decoded: ServerMessage = serde_json::from_str(&text).expect("Should deserialize");
        assert_eq!(decoded, msg);
        assert!(text.contains(r#""status":"move""#));
    }

    #[test]
    fn test_ack_error_is_not_ok() {
        let err = AckResult::Error {
            code: "room_not_found".to_string(),
            message: "Room not found".to_string(),
        };
        assert!(!err.is_ok());
        assert!(AckResult::Chat { id: "c".into() }.is_ok());
    }

    #[test]
    fn test_chat_message_optional_fields() {
        let text = r#"{"type":"chat_message","req":2,"room_id":"R","text":"gg"}"#;
        let decoded: ClientMessage = serde_json::from_str(text).expect("Should deserialize");
        assert_eq!(
            decoded,
            ClientMessage::ChatMessage {
                req: 2,
                room_id: "R".to_string(),
                id: None,
                text: "gg".to_string(),
                ts: None,
            }
        );
    }
}
