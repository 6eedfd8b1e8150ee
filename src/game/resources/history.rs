//! Move history and position snapshots
//!
//! Maintains a chronological record of all moves made during the game plus a
//! snapshot of the position after each one. This enables:
//!
//! - **Move Review**: step back and forth through earlier positions
//! - **Branching**: resume play from a reviewed position, discarding the
//!   abandoned future
//! - **Three-fold Repetition**: snapshots carry their repetition key, so the
//!   tally can be rebuilt for any prefix of the game
//!
//! # Architecture
//!
//! `records[i]` is the i-th half-move. `snapshots[0]` is the initial position
//! and `snapshots[i + 1]` the position after `records[i]`, so there is always
//! exactly one more snapshot than there are records. `cursor` indexes the
//! snapshot currently shown; it equals `records.len()` at the live end.

use crate::game::board::{Board, CastlingRights};
use crate::game::error::{GameError, GameResult};
use crate::game::position::{repetition_key, GameState};
use crate::game::types::{ByColor, Color, Piece, PieceKind, Square};
use chrono::{DateTime, Utc};

/// One applied half-move. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    pub captured: Option<Piece>,
    /// Kind the pawn promoted to, if it promoted
    pub promotion: Option<PieceKind>,
    pub is_castling: bool,
    pub is_en_passant: bool,
    /// The move left the opponent in check
    pub is_check: bool,
    pub timestamp: DateTime<Utc>,
}

impl MoveRecord {
    /// Coordinate notation as used on the wire and by UCI engines (`e7e8q`)
    pub fn uci(&self) -> String {
        let mut text = format!("{}{}", self.from, self.to);
        if let Some(kind) = self.promotion {
            text.push(kind.to_char());
        }
        text
    }
}

/// Everything needed to put a reviewed position back on the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionSnapshot {
    pub board: Board,
    pub turn: Color,
    pub health: ByColor<u32>,
    pub scores: ByColor<u32>,
    pub castling: CastlingRights,
    pub en_passant: Option<Square>,
    /// Repetition key of this position
    pub key: String,
}

impl PositionSnapshot {
    pub fn capture(board: &Board, state: &GameState) -> Self {
        Self {
            board: *board,
            turn: state.turn,
            health: state.health,
            scores: state.scores,
            castling: state.castling,
            en_passant: state.en_passant,
            key: repetition_key(board, state.turn, &state.castling, state.en_passant),
        }
    }

    /// Write this snapshot back into the live board and flags
    ///
    /// The repetition tally is left alone; it belongs to the game, not to a
    /// single position.
    pub fn restore(&self, board: &mut Board, state: &mut GameState) {
        *board = self.board;
        state.turn = self.turn;
        state.health = self.health;
        state.scores = self.scores;
        state.castling = self.castling;
        state.en_passant = self.en_passant;
    }
}

/// Move list plus snapshots, with a review cursor
#[derive(Debug, Clone)]
pub struct MoveHistory {
    records: Vec<MoveRecord>,
    snapshots: Vec<PositionSnapshot>,
    cursor: usize,
}

impl MoveHistory {
    /// Start a history at `initial`
    pub fn new(initial: PositionSnapshot) -> Self {
        Self {
            records: Vec::new(),
            snapshots: vec![initial],
            cursor: 0,
        }
    }

    /// Append a move and the position it produced
    ///
    /// If the cursor is not at the live end, everything after it is dropped
    /// first: the new move supersedes the abandoned branch.
    pub fn push(&mut self, record: MoveRecord, snapshot: PositionSnapshot) {
        self.truncate_after_cursor();
        self.records.push(record);
        self.snapshots.push(snapshot);
        self.cursor = self.records.len();
    }

    /// Get the most recent move, if any
    pub fn last_move(&self) -> Option<&MoveRecord> {
        self.records.last()
    }

    /// Number of half-moves recorded
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get_move(&self, index: usize) -> Option<&MoveRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MoveRecord> {
        self.records.iter()
    }

    /// Snapshot `index`: 0 is the initial position, `len()` the live one
    pub fn snapshot(&self, index: usize) -> Option<&PositionSnapshot> {
        self.snapshots.get(index)
    }

    /// Index of the snapshot currently shown
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Index of the live (latest) snapshot
    pub fn live_index(&self) -> usize {
        self.records.len()
    }

    pub fn is_at_live_end(&self) -> bool {
        self.cursor == self.live_index()
    }

    /// Move the cursor to `index` and return the snapshot there
    pub fn seek(&mut self, index: usize) -> GameResult<&PositionSnapshot> {
        if index >= self.snapshots.len() {
            return Err(GameError::HistoryOutOfRange {
                index,
                len: self.snapshots.len(),
            });
        }
        self.cursor = index;
        Ok(&self.snapshots[index])
    }

    /// Drop every move and snapshot after the cursor
    pub fn truncate_after_cursor(&mut self) {
        self.records.truncate(self.cursor);
        self.snapshots.truncate(self.cursor + 1);
    }

    /// Repetition keys of every position up to and including the cursor
    pub fn keys_through_cursor(&self) -> impl Iterator<Item = &str> {
        self.snapshots[..=self.cursor].iter().map(|snap| snap.key.as_str())
    }
}
