//! Full legality: movement pattern plus "own king not left in check", and the
//! game-ending conditions built on top of it.

use super::attacks::is_in_check;
use super::piece_moves::{classify_move, MoveKind};
use crate::game::board::{Board, CastleSide};
use crate::game::position::GameState;
use crate::game::types::{Color, Piece, PieceKind, Square};

/// A move applied to a board for the lifetime of the guard
///
/// The board is restored exactly when the guard drops, whichever way the
/// enclosing scope is left.
pub struct Simulation<'a> {
    board: &'a mut Board,
    from: Square,
    to: Square,
    moved: Option<Piece>,
    captured: Option<(Square, Piece)>,
    rook: Option<(Square, Square)>,
}

impl<'a> Simulation<'a> {
    pub fn apply(board: &'a mut Board, from: Square, to: Square, kind: MoveKind) -> Self {
        let captured = kind
            .capture_square(from, to, board)
            .and_then(|square| board.take(square).map(|piece| (square, piece)));
        let moved = board.take(from);
        board.set(to, moved);

        let rook = match kind {
            MoveKind::Castle(side) => castle_rook_squares(from, side),
            _ => None,
        };
        if let Some((rook_from, rook_to)) = rook {
            let rook_piece = board.take(rook_from);
            board.set(rook_to, rook_piece);
        }

        Self {
            board,
            from,
            to,
            moved,
            captured,
            rook,
        }
    }

    pub fn board(&self) -> &Board {
        self.board
    }
}

impl Drop for Simulation<'_> {
    fn drop(&mut self) {
        if let Some((rook_from, rook_to)) = self.rook {
            let rook_piece = self.board.take(rook_to);
            self.board.set(rook_from, rook_piece);
        }
        self.board.set(self.to, None);
        self.board.set(self.from, self.moved);
        if let Some((square, piece)) = self.captured {
            self.board.set(square, Some(piece));
        }
    }
}

/// Rook origin and destination for a castling king on `king_from`
pub fn castle_rook_squares(king_from: Square, side: CastleSide) -> Option<(Square, Square)> {
    let rank = king_from.rank.index();
    let (rook_from, rook_to) = match side {
        CastleSide::KingSide => (7, 5),
        CastleSide::QueenSide => (0, 3),
    };
    Some((Square::new(rook_from, rank)?, Square::new(rook_to, rank)?))
}

/// Classify a move for `mover` and reject it if it leaves `mover`'s king attacked
fn legal_kind_for(
    board: &Board,
    state: &GameState,
    mover: Color,
    from: Square,
    to: Square,
) -> Option<MoveKind> {
    let piece = board.get(from)?;
    if piece.color != mover {
        return None;
    }
    let kind = classify_move(board, state, piece, from, to)?;

    let mut scratch = *board;
    let simulation = Simulation::apply(&mut scratch, from, to, kind);
    if is_in_check(simulation.board(), mover) {
        return None;
    }
    Some(kind)
}

/// Legal move shape for the side to move, `None` if the move is illegal
pub fn legal_move_kind(
    board: &Board,
    state: &GameState,
    from: Square,
    to: Square,
) -> Option<MoveKind> {
    legal_kind_for(board, state, state.turn, from, to)
}

/// Whether the side to move may play `from` -> `to`
///
/// Rejects: empty source, moving the opponent's piece, capturing your own
/// piece, pattern violations, blocked sliders, and anything that leaves the
/// mover's king in check.
pub fn is_legal(board: &Board, state: &GameState, from: Square, to: Square) -> bool {
    legal_move_kind(board, state, from, to).is_some()
}

/// Destinations the piece on `from` may legally reach
pub fn legal_moves_from(board: &Board, state: &GameState, from: Square) -> Vec<Square> {
    Square::all()
        .filter(|&to| is_legal(board, state, from, to))
        .collect()
}

/// Every legal (from, to) pair for the side to move
pub fn legal_moves(board: &Board, state: &GameState) -> Vec<(Square, Square)> {
    let movers: Vec<Square> = board
        .pieces()
        .filter(|(_, piece)| piece.color == state.turn)
        .map(|(square, _)| square)
        .collect();
    movers
        .into_iter()
        .flat_map(|from| {
            legal_moves_from(board, state, from)
                .into_iter()
                .map(move |to| (from, to))
        })
        .collect()
}

/// Whether `color` has at least one legal move
pub fn has_any_legal_move(board: &Board, state: &GameState, color: Color) -> bool {
    board
        .pieces()
        .filter(|(_, piece)| piece.color == color)
        .any(|(from, _)| {
            Square::all().any(|to| legal_kind_for(board, state, color, from, to).is_some())
        })
}

/// In check with no legal move
pub fn is_checkmate(board: &Board, state: &GameState, color: Color) -> bool {
    is_in_check(board, color) && !has_any_legal_move(board, state, color)
}

/// Not in check with no legal move
pub fn is_stalemate(board: &Board, state: &GameState, color: Color) -> bool {
    !is_in_check(board, color) && !has_any_legal_move(board, state, color)
}

/// Neither side can ever deliver mate
///
/// Covers bare kings, king and one minor piece against a bare king, and one
/// bishop each on same-coloured squares.
pub fn is_insufficient_material(board: &Board) -> bool {
    let mut white = Vec::new();
    let mut black = Vec::new();
    for (square, piece) in board.pieces() {
        if piece.kind == PieceKind::King {
            continue;
        }
        match piece.color {
            Color::White => white.push((square, piece.kind)),
            Color::Black => black.push((square, piece.kind)),
        }
    }

    let minor_only = |set: &[(Square, PieceKind)]| {
        matches!(set, [(_, PieceKind::Bishop | PieceKind::Knight)])
    };
    let square_shade = |square: Square| (square.file.index() + square.rank.index()) % 2;

    match (white.as_slice(), black.as_slice()) {
        ([], []) => true,
        ([], other) | (other, []) => minor_only(other),
        ([(w, PieceKind::Bishop)], [(b, PieceKind::Bishop)]) => square_shade(*w) == square_shade(*b),
        _ => false,
    }
}
