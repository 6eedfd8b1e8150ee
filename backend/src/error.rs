//! Protocol errors reported back to clients
//!
//! Each variant has a stable wire code; the human-readable text may change.

use shared::{AckResult, ServerMessage};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Invalid room code")]
    InvalidCode,

    #[error("Room is full")]
    RoomFull,

    #[error("Move id is required")]
    MissingMoveId,

    #[error("Chat messages need a room and some text")]
    BadPayload,

    #[error("Not a participant of this room")]
    NotInRoom,

    #[error("The game in this room is over")]
    GameOver,

    #[error("Malformed message: {0}")]
    Malformed(String),
}

impl BrokerError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            BrokerError::RoomNotFound => "room_not_found",
            BrokerError::InvalidCode => "invalid_code",
            BrokerError::RoomFull => "room_full",
            BrokerError::MissingMoveId => "missing_move_id",
            BrokerError::BadPayload => "bad_payload",
            BrokerError::NotInRoom => "not_in_room",
            BrokerError::GameOver => "game_over",
            BrokerError::Malformed(_) => "malformed",
        }
    }

    pub fn to_ack(&self) -> AckResult {
        AckResult::Error {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }

    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::Error {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

pub type BrokerResult<T> = Result<T, BrokerError>;
