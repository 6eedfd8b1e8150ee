//! Chess piece movement rules
//!
//! Contains the rules for how each chess piece can move, before the
//! "does this leave my king in check" filter. Pure functions with no side
//! effects.

use super::attacks::is_square_attacked;
use crate::game::board::{Board, CastleSide};
use crate::game::position::GameState;
use crate::game::types::{Piece, PieceKind, Square};

/// Shape of a geometrically valid move, as the state machine needs to apply it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Quiet,
    Capture,
    /// Pawn advancing two squares from its start rank
    DoublePush,
    /// Pawn capturing onto the en-passant target; the victim is beside it
    EnPassant,
    Castle(CastleSide),
}

impl MoveKind {
    /// Square the captured piece stands on, if this move captures
    pub fn capture_square(self, from: Square, to: Square, board: &Board) -> Option<Square> {
        match self {
            MoveKind::EnPassant => Square::new(to.file.index(), from.rank.index()),
            _ if board.get(to).is_some() => Some(to),
            _ => None,
        }
    }
}

/// Classify `piece` moving `from` -> `to` on `board`
///
/// Returns `None` when the move is not possible for the piece's movement
/// pattern. Castling is fully checked here (rights, rook, empty path, no
/// attacked king square) because its legality is geometric.
pub fn classify_move(
    board: &Board,
    state: &GameState,
    piece: Piece,
    from: Square,
    to: Square,
) -> Option<MoveKind> {
    // Can't move to the same square
    if from == to {
        return None;
    }

    // Can't capture your own pieces
    let target = board.get(to);
    if target.is_some_and(|t| t.color == piece.color) {
        return None;
    }
    let plain = if target.is_some() {
        MoveKind::Capture
    } else {
        MoveKind::Quiet
    };

    let valid = match piece.kind {
        PieceKind::Pawn => return classify_pawn_move(board, state, piece, from, to),
        PieceKind::Knight => is_valid_knight_move(from, to),
        PieceKind::Bishop => is_valid_bishop_move(from, to, board),
        PieceKind::Rook => is_valid_rook_move(from, to, board),
        PieceKind::Queen => is_valid_queen_move(from, to, board),
        PieceKind::King => {
            if let Some(side) = castle_side(piece, from, to) {
                return is_valid_castle(board, state, piece, from, side)
                    .then_some(MoveKind::Castle(side));
            }
            is_valid_king_move(from, to)
        }
    };
    valid.then_some(plain)
}

fn classify_pawn_move(
    board: &Board,
    state: &GameState,
    piece: Piece,
    from: Square,
    to: Square,
) -> Option<MoveKind> {
    let direction = piece.color.pawn_direction();
    let (dx, dy) = from.delta_to(to);

    // Forward move
    if dx == 0 && dy == direction {
        return board.is_empty(to).then_some(MoveKind::Quiet);
    }

    // Double move from starting rank
    if dx == 0 && dy == 2 * direction && from.rank.index() == piece.color.pawn_start_rank() {
        let intermediate = from.offset(0, direction)?;
        return (board.is_empty(intermediate) && board.is_empty(to))
            .then_some(MoveKind::DoublePush);
    }

    // Capture diagonally
    if dx.abs() == 1 && dy == direction {
        if let Some(target) = board.get(to) {
            return (target.color != piece.color).then_some(MoveKind::Capture);
        }
        if state.en_passant == Some(to) {
            let victim_square = Square::new(to.file.index(), from.rank.index())?;
            let victim = board.get(victim_square)?;
            return (victim.kind == PieceKind::Pawn && victim.color != piece.color)
                .then_some(MoveKind::EnPassant);
        }
    }

    None
}

fn is_valid_knight_move(from: Square, to: Square) -> bool {
    let (dx, dy) = from.delta_to(to);
    let (dx, dy) = (dx.abs(), dy.abs());
    (dx == 2 && dy == 1) || (dx == 1 && dy == 2)
}

fn is_valid_bishop_move(from: Square, to: Square, board: &Board) -> bool {
    let (dx, dy) = from.delta_to(to);

    // Must move diagonally
    if dx.abs() != dy.abs() {
        return false;
    }

    is_path_clear(from, to, board)
}

fn is_valid_rook_move(from: Square, to: Square, board: &Board) -> bool {
    // Must move horizontally or vertically
    if from.file != to.file && from.rank != to.rank {
        return false;
    }

    is_path_clear(from, to, board)
}

fn is_valid_queen_move(from: Square, to: Square, board: &Board) -> bool {
    // Queen moves like rook or bishop
    is_valid_rook_move(from, to, board) || is_valid_bishop_move(from, to, board)
}

fn is_valid_king_move(from: Square, to: Square) -> bool {
    let (dx, dy) = from.delta_to(to);

    // King moves one square in any direction
    dx.abs() <= 1 && dy.abs() <= 1
}

/// Which wing a two-file king step from its home square castles to
fn castle_side(piece: Piece, from: Square, to: Square) -> Option<CastleSide> {
    let home_rank = piece.color.home_rank();
    if from.file.index() != 4 || from.rank.index() != home_rank || to.rank.index() != home_rank {
        return None;
    }
    match from.delta_to(to).0 {
        2 => Some(CastleSide::KingSide),
        -2 => Some(CastleSide::QueenSide),
        _ => None,
    }
}

fn is_valid_castle(
    board: &Board,
    state: &GameState,
    king: Piece,
    from: Square,
    side: CastleSide,
) -> bool {
    if !state.castling.has(king.color, side) {
        return false;
    }

    let home_rank = king.color.home_rank();
    let rook_home = Square::new(side.rook_file(), home_rank);
    let rook_ready = rook_home
        .and_then(|square| board.get(square))
        .is_some_and(|rook| rook.kind == PieceKind::Rook && rook.color == king.color);
    if !rook_ready {
        return false;
    }

    let path_empty = side
        .between_files()
        .iter()
        .filter_map(|&file| Square::new(file, home_rank))
        .all(|square| board.is_empty(square));
    if !path_empty {
        return false;
    }

    // King may not castle out of, through, or into an attacked square
    let step = match side {
        CastleSide::KingSide => 1,
        CastleSide::QueenSide => -1,
    };
    let attacker = king.color.opponent();
    [0, step, 2 * step]
        .into_iter()
        .filter_map(|dx| from.offset(dx, 0))
        .all(|square| !is_square_attacked(board, square, attacker))
}

/// Every square strictly between `from` and `to` is empty
///
/// Only meaningful for straight or diagonal lines; walks by the sign of each
/// delta.
pub fn is_path_clear(from: Square, to: Square, board: &Board) -> bool {
    let (dx, dy) = from.delta_to(to);
    let (step_x, step_y) = (dx.signum(), dy.signum());

    let mut current = from.offset(step_x, step_y);
    while let Some(square) = current {
        if square == to {
            return true;
        }
        if !board.is_empty(square) {
            return false;
        }
        current = square.offset(step_x, step_y);
    }

    true
}
