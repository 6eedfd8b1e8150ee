//! Mutable game flags that travel with the board: side to move, castling
//! rights, en-passant target, capture scores, king health and the
//! repetition tally.

use crate::game::board::{Board, CastlingRights};
use crate::game::types::{ByColor, Color, Square};
use std::collections::HashMap;

/// Floor king health cannot be drained below by captures
pub const KING_BASE_HEALTH: u32 = 5;

/// Starting health: the base plus the value of every non-king piece
pub const MAX_KING_HEALTH: u32 = 39 + KING_BASE_HEALTH;

/// Everything beyond the grid that the rules need to judge a position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub turn: Color,
    pub castling: CastlingRights,
    /// Square a pawn just skipped over with a double push
    pub en_passant: Option<Square>,
    /// Material captured by each side
    pub scores: ByColor<u32>,
    /// King health; drained by captures, zeroed on checkmate
    pub health: ByColor<u32>,
    pub repetition_counts: HashMap<String, u32>,
}

impl GameState {
    /// Flags for the standard starting position
    pub fn new() -> Self {
        Self {
            turn: Color::White,
            castling: CastlingRights::all(),
            en_passant: None,
            scores: ByColor::new(0, 0),
            health: ByColor::new(MAX_KING_HEALTH, MAX_KING_HEALTH),
            repetition_counts: HashMap::new(),
        }
    }

    /// Credit `capturer` with `value` and drain the victim's king health
    ///
    /// Health never drops below the base value through captures; only
    /// checkmate takes it to zero.
    pub fn record_capture(&mut self, capturer: Color, value: u32) {
        *self.scores.get_mut(capturer) += value;
        let health = self.health.get_mut(capturer.opponent());
        *health = health.saturating_sub(value).max(KING_BASE_HEALTH);
    }

    /// Count one more occurrence of `key`, returning the new tally
    pub fn bump_repetition(&mut self, key: String) -> u32 {
        let count = self.repetition_counts.entry(key).or_insert(0);
        *count += 1;
        *count
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of a position for threefold repetition
///
/// Placement, side to move, castling rights and en-passant target. Two
/// positions with the same key offer exactly the same moves.
pub fn repetition_key(
    board: &Board,
    turn: Color,
    castling: &CastlingRights,
    en_passant: Option<Square>,
) -> String {
    let ep = en_passant.map_or_else(|| "-".to_string(), Square::to_algebraic);
    format!(
        "{}|{}|{}|{}",
        board.to_placement(),
        turn.code(),
        castling.to_fen(),
        ep
    )
}

/// Export a FEN string for an engine query
///
/// The halfmove clock and fullmove number are not tracked and are always
/// written as `0 1`.
pub fn to_fen(board: &Board, state: &GameState) -> String {
    let ep = state
        .en_passant
        .map_or_else(|| "-".to_string(), Square::to_algebraic);
    format!(
        "{} {} {} {} 0 1",
        board.to_placement(),
        state.turn.code(),
        state.castling.to_fen(),
        ep
    )
}
