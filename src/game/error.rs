//! Error types for game module
//!
//! Covers move validation, position setup and state machine misuse.

use crate::game::types::Square;

/// Errors that can occur in game logic
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Move rejected by the rule validator
    #[error("Illegal move: {from} to {to}")]
    IllegalMove { from: Square, to: Square },

    /// Move text or coordinates could not be parsed
    #[error("Invalid move: {message}")]
    InvalidMove { message: String },

    /// Board placement text could not be parsed
    #[error("Invalid position: {message}")]
    InvalidPosition { message: String },

    /// Invalid game state transition
    #[error("Invalid game state transition: {message}")]
    InvalidStateTransition { message: String },

    /// History index out of range
    #[error("No history entry at index {index} (history holds {len})")]
    HistoryOutOfRange { index: usize, len: usize },
}

/// Result type alias for game operations
pub type GameResult<T> = Result<T, GameError>;
