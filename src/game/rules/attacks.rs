//! Attack detection
//!
//! Attack geometry differs from movement in two places: pawns attack only
//! diagonally, and kings never attack by castling.

use super::piece_moves::is_path_clear;
use crate::game::board::Board;
use crate::game::types::{Color, PieceKind, Square};

/// Whether the piece on `from` attacks `target`
///
/// Ignores what stands on `target`, so it answers "would a piece there be
/// attacked". Empty `from` attacks nothing.
pub fn can_attack(board: &Board, from: Square, target: Square) -> bool {
    let Some(piece) = board.get(from) else {
        return false;
    };
    if from == target {
        return false;
    }

    let (dx, dy) = from.delta_to(target);
    match piece.kind {
        PieceKind::Pawn => dx.abs() == 1 && dy == piece.color.pawn_direction(),
        PieceKind::Knight => {
            let (ax, ay) = (dx.abs(), dy.abs());
            (ax == 2 && ay == 1) || (ax == 1 && ay == 2)
        }
        PieceKind::Bishop => dx.abs() == dy.abs() && is_path_clear(from, target, board),
        PieceKind::Rook => (dx == 0 || dy == 0) && is_path_clear(from, target, board),
        PieceKind::Queen => {
            (dx == 0 || dy == 0 || dx.abs() == dy.abs()) && is_path_clear(from, target, board)
        }
        PieceKind::King => dx.abs() <= 1 && dy.abs() <= 1,
    }
}

/// Whether any piece of `attacker` attacks `square`
pub fn is_square_attacked(board: &Board, square: Square, attacker: Color) -> bool {
    board
        .pieces()
        .filter(|(_, piece)| piece.color == attacker)
        .any(|(from, _)| can_attack(board, from, square))
}

/// Whether `color`'s king stands attacked. A missing king is never in check.
pub fn is_in_check(board: &Board, color: Color) -> bool {
    board
        .find_king(color)
        .is_some_and(|king| is_square_attacked(board, king, color.opponent()))
}
