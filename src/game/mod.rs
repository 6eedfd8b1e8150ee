//! Chess game logic module
//!
//! Pure, synchronous chess: no I/O and no clocks read behind the caller's
//! back. Online play and engine games drive it from async sessions.
//!
//! # Module Organization
//!
//! - `types` - Coordinates, colours and piece tokens
//! - `board` - The 8x8 grid and castling rights
//! - `position` - Side to move, en passant, scores, king health, repetition tally, FEN export
//! - `rules` - Pure chess logic (move validation, attacks, game-end detection)
//! - `resources` - History, clocks, lifecycle phase, promotion chooser
//! - `machine` - `ChessGame`, the state machine every move goes through
//! - `observer` - Callbacks from the core to a front end
//!
//! # Control flow
//!
//! input -> `ChessGame::attempt_move` -> `rules::legal_move_kind` -> board
//! mutation -> terminal evaluation -> turn switch -> `GameObserver::report`
//! -> `ChessGame::complete_presentation`.

pub mod board;
pub mod error;
pub mod machine;
pub mod observer;
pub mod position;
pub mod resources;
pub mod rules;
pub mod types;

pub use board::{Board, CastleSide, CastlingRights};
pub use error::{GameError, GameResult};
pub use machine::{AppliedMove, ChessGame, HistoryStep, IgnoreReason, MoveOutcome};
pub use observer::GameObserver;
pub use position::GameState;
pub use resources::{GameOutcome, GamePhase, TimeControl};
pub use types::{Color, Piece, PieceKind, Square};

/// Parse `e2e4` / `e7e8q` style coordinate notation
///
/// Returns origin, destination and optional promotion piece; anything else
/// (wrong length, bad squares, unknown promotion letter) is `None`.
pub fn parse_coordinate_move(text: &str) -> Option<(Square, Square, Option<PieceKind>)> {
    let text = text.trim();
    if !text.is_ascii() || !(4..=5).contains(&text.len()) {
        return None;
    }
    let from = Square::from_algebraic(&text[0..2])?;
    let to = Square::from_algebraic(&text[2..4])?;
    let promotion = match text[4..].chars().next() {
        Some(c) => Some(PieceKind::from_char(c).filter(|kind| kind.is_promotion_target())?),
        None => None,
    };
    Some((from, to, promotion))
}
