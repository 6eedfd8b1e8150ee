//! Chess rules module - pure game logic over the board model
//!
//! Implements move validation and game-end detection using pure functions,
//! allowing easy testing and reuse by the state machine, the engine driver
//! (to re-validate engine replies) and the online session (to re-validate
//! remote moves).
//!
//! # Module Structure
//!
//! - `piece_moves` - Movement rules for each piece type, including castling and en passant
//! - `attacks` - Attack detection (`can_attack`, `is_square_attacked`, `is_in_check`)
//! - `legality` - Self-check filtering via `Simulation`, mate/stalemate, insufficient material
//!
//! Legality checks never mutate caller state: simulations run on a copy of
//! the board and restore it when the guard drops.

pub mod attacks;
pub mod legality;
pub mod piece_moves;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use attacks::{can_attack, is_in_check, is_square_attacked};
pub use legality::{
    castle_rook_squares, has_any_legal_move, is_checkmate, is_insufficient_material, is_legal,
    is_stalemate, legal_move_kind, legal_moves, legal_moves_from, Simulation,
};
pub use piece_moves::{classify_move, is_path_clear, MoveKind};
