//! Test suite for chess move validation
//!
//! Tests piece movement rules, attack detection, self-check filtering and the
//! game-ending predicates using pure functions over hand-built boards.
//!
//! # Test Organization
//!
//! - `test_pawn_*` - Pawn movement (forward, double-move, capture, en passant)
//! - `test_knight_*` / `test_bishop_*` / `test_rook_*` / `test_queen_*` - Piece patterns
//! - `test_king_*` - King steps and castling
//! - `test_check_*` - Self-check filtering and pins
//! - `test_end_*` - Checkmate, stalemate, insufficient material
//! - `test_simulation_*` - Board restoration after simulated moves

use super::*;
use crate::game::board::{Board, CastleSide, CastlingRights};
use crate::game::position::GameState;
use crate::game::types::{Color, Piece, PieceKind, Square};

fn sq(name: &str) -> Square {
    Square::from_algebraic(name).unwrap()
}

/// Helper to build a position from piece definitions
///
/// Castling rights start revoked so that only tests which ask for them
/// (via `with_castling`) see castling moves.
fn create_test_position(pieces: &[(PieceKind, Color, &str)], turn: Color) -> (Board, GameState) {
    let mut board = Board::empty();
    for &(kind, color, square) in pieces {
        board.set(sq(square), Some(Piece::new(color, kind)));
    }
    let mut state = GameState::new();
    state.turn = turn;
    state.castling = CastlingRights::none();
    (board, state)
}

fn with_castling(mut state: GameState) -> GameState {
    state.castling = CastlingRights::all();
    state
}

fn legal(board: &Board, state: &GameState, from: &str, to: &str) -> bool {
    is_legal(board, state, sq(from), sq(to))
}

// ============================================================================
// Pawn Movement Tests
// ============================================================================

#[test]
fn test_pawn_single_forward_move() {
    //! Pawns step one square toward the opponent if the square is empty
    let (board, state) = create_test_position(
        &[
            (PieceKind::King, Color::White, "e1"),
            (PieceKind::King, Color::Black, "e8"),
            (PieceKind::Pawn, Color::White, "d4"),
            (PieceKind::Pawn, Color::Black, "a6"),
        ],
        Color::White,
    );

    assert!(legal(&board, &state, "d4", "d5"), "White pawn should move forward one square");
    assert!(!legal(&board, &state, "d4", "d3"), "Pawns never move backward");

    let mut black_state = state.clone();
    black_state.turn = Color::Black;
    assert!(legal(&board, &black_state, "a6", "a5"), "Black pawn moves toward rank 1");
}

#[test]
fn test_pawn_double_forward_from_start() {
    //! Two-square advance is only available from the starting rank
    let (board, state) = create_test_position(
        &[
            (PieceKind::King, Color::White, "e1"),
            (PieceKind::King, Color::Black, "e8"),
            (PieceKind::Pawn, Color::White, "c2"),
            (PieceKind::Pawn, Color::White, "g3"),
        ],
        Color::White,
    );

    assert_eq!(
        legal_move_kind(&board, &state, sq("c2"), sq("c4")),
        Some(MoveKind::DoublePush)
    );
    assert!(!legal(&board, &state, "g3", "g5"), "Pawn off its start rank cannot double-move");
}

#[test]
fn test_pawn_blocked_by_piece() {
    //! Pawns cannot move through or onto pieces straight ahead
    let (board, state) = create_test_position(
        &[
            (PieceKind::King, Color::White, "e1"),
            (PieceKind::King, Color::Black, "e8"),
            (PieceKind::Pawn, Color::White, "c2"),
            (PieceKind::Knight, Color::Black, "c3"),
            (PieceKind::Pawn, Color::White, "f2"),
            (PieceKind::Knight, Color::Black, "f4"),
        ],
        Color::White,
    );

    assert!(!legal(&board, &state, "c2", "c3"), "Pawn cannot capture straight ahead");
    assert!(!legal(&board, &state, "c2", "c4"), "Double move is blocked by the piece in between");
    assert!(!legal(&board, &state, "f2", "f4"), "Double move onto an occupied square is blocked");
    assert!(legal(&board, &state, "f2", "f3"));
}

#[test]
fn test_pawn_diagonal_capture() {
    //! Pawns capture one square diagonally forward, never onto empty squares
    let (board, state) = create_test_position(
        &[
            (PieceKind::King, Color::White, "e1"),
            (PieceKind::King, Color::Black, "e8"),
            (PieceKind::Pawn, Color::White, "d4"),
            (PieceKind::Rook, Color::Black, "e5"),
            (PieceKind::Bishop, Color::White, "c5"),
        ],
        Color::White,
    );

    assert_eq!(
        legal_move_kind(&board, &state, sq("d4"), sq("e5")),
        Some(MoveKind::Capture)
    );
    assert!(!legal(&board, &state, "d4", "c5"), "Pawn cannot capture its own colour");
    assert!(!legal(&board, &state, "d4", "e3"), "Pawn cannot capture backwards");
}

#[test]
fn test_pawn_en_passant() {
    //! Capturing onto the en-passant target takes the pawn beside the mover
    let (board, mut state) = create_test_position(
        &[
            (PieceKind::King, Color::White, "e1"),
            (PieceKind::King, Color::Black, "e8"),
            (PieceKind::Pawn, Color::White, "e5"),
            (PieceKind::Pawn, Color::Black, "d5"),
        ],
        Color::White,
    );

    assert!(!legal(&board, &state, "e5", "d6"), "No en passant without a target");

    state.en_passant = Some(sq("d6"));
    let kind = legal_move_kind(&board, &state, sq("e5"), sq("d6"));
    assert_eq!(kind, Some(MoveKind::EnPassant));
    assert_eq!(
        MoveKind::EnPassant.capture_square(sq("e5"), sq("d6"), &board),
        Some(sq("d5")),
        "The captured pawn stands beside the mover, not on the target"
    );
}

#[test]
fn test_pawn_en_passant_cannot_expose_king() {
    //! Removing both pawns from the rank may open a line onto the king
    let (board, mut state) = create_test_position(
        &[
            (PieceKind::King, Color::White, "a5"),
            (PieceKind::Pawn, Color::White, "e5"),
            (PieceKind::Pawn, Color::Black, "d5"),
            (PieceKind::Rook, Color::Black, "h5"),
            (PieceKind::King, Color::Black, "e8"),
        ],
        Color::White,
    );
    state.en_passant = Some(sq("d6"));

    assert!(
        !legal(&board, &state, "e5", "d6"),
        "En passant would leave the king on an open rank"
    );
}

// ============================================================================
// Knight / Bishop / Rook / Queen Movement Tests
// ============================================================================

#[test]
fn test_knight_l_shaped_movement() {
    //! Knights reach exactly eight squares from the centre and jump over pieces
    let (board, state) = create_test_position(
        &[
            (PieceKind::King, Color::White, "a1"),
            (PieceKind::King, Color::Black, "h8"),
            (PieceKind::Knight, Color::White, "d4"),
            (PieceKind::Pawn, Color::White, "d5"),
            (PieceKind::Pawn, Color::White, "e4"),
            (PieceKind::Pawn, Color::White, "c3"),
        ],
        Color::White,
    );

    let mut moves = legal_moves_from(&board, &state, sq("d4"));
    moves.sort_by_key(|s| s.to_algebraic());
    let names: Vec<String> = moves.iter().map(|s| s.to_algebraic()).collect();
    assert_eq!(names, ["b3", "b5", "c2", "c6", "e2", "e6", "f3", "f5"]);
}

#[test]
fn test_bishop_blocked_by_piece() {
    //! Sliders stop at the first piece; they may capture it if it is an enemy
    let (board, state) = create_test_position(
        &[
            (PieceKind::King, Color::White, "a1"),
            (PieceKind::King, Color::Black, "h8"),
            (PieceKind::Bishop, Color::White, "c1"),
            (PieceKind::Pawn, Color::Black, "e3"),
        ],
        Color::White,
    );

    assert!(legal(&board, &state, "c1", "d2"));
    assert!(legal(&board, &state, "c1", "e3"), "Bishop captures the blocker");
    assert!(!legal(&board, &state, "c1", "f4"), "Bishop cannot pass through e3");
    assert!(!legal(&board, &state, "c1", "c3"), "Bishop does not move straight");
}

#[test]
fn test_rook_horizontal_vertical_movement() {
    let (board, state) = create_test_position(
        &[
            (PieceKind::King, Color::White, "h1"),
            (PieceKind::King, Color::Black, "h8"),
            (PieceKind::Rook, Color::White, "d4"),
            (PieceKind::Pawn, Color::White, "d6"),
        ],
        Color::White,
    );

    assert!(legal(&board, &state, "d4", "a4"));
    assert!(legal(&board, &state, "d4", "d1"));
    assert!(legal(&board, &state, "d4", "d5"));
    assert!(!legal(&board, &state, "d4", "d7"), "Own pawn on d6 blocks the file");
    assert!(!legal(&board, &state, "d4", "e5"), "Rook does not move diagonally");
}

#[test]
fn test_queen_combined_movement() {
    let (board, state) = create_test_position(
        &[
            (PieceKind::King, Color::White, "h1"),
            (PieceKind::King, Color::Black, "h8"),
            (PieceKind::Queen, Color::White, "d4"),
        ],
        Color::White,
    );

    assert!(legal(&board, &state, "d4", "d8"));
    assert!(legal(&board, &state, "d4", "a7"));
    assert!(legal(&board, &state, "d4", "g1"));
    assert!(!legal(&board, &state, "d4", "e6"), "Queen cannot move like a knight");
}

// ============================================================================
// King Movement and Castling Tests
// ============================================================================

#[test]
fn test_king_single_square_movement() {
    let (board, state) = create_test_position(
        &[
            (PieceKind::King, Color::White, "e4"),
            (PieceKind::King, Color::Black, "a8"),
        ],
        Color::White,
    );

    assert_eq!(legal_moves_from(&board, &state, sq("e4")).len(), 8);
    assert!(!legal(&board, &state, "e4", "e6"));
}

#[test]
fn test_king_cannot_step_into_attack() {
    let (board, state) = create_test_position(
        &[
            (PieceKind::King, Color::White, "e1"),
            (PieceKind::Rook, Color::Black, "d8"),
            (PieceKind::King, Color::Black, "h8"),
        ],
        Color::White,
    );

    assert!(!legal(&board, &state, "e1", "d1"), "d-file is covered by the rook");
    assert!(legal(&board, &state, "e1", "f1"));
}

fn castling_position(extra: &[(PieceKind, Color, &str)]) -> (Board, GameState) {
    let mut pieces = vec![
        (PieceKind::King, Color::White, "e1"),
        (PieceKind::Rook, Color::White, "a1"),
        (PieceKind::Rook, Color::White, "h1"),
        (PieceKind::King, Color::Black, "e8"),
    ];
    pieces.extend_from_slice(extra);
    let (board, state) = create_test_position(&pieces, Color::White);
    (board, with_castling(state))
}

#[test]
fn test_king_castles_both_sides() {
    let (board, state) = castling_position(&[]);

    assert_eq!(
        legal_move_kind(&board, &state, sq("e1"), sq("g1")),
        Some(MoveKind::Castle(CastleSide::KingSide))
    );
    assert_eq!(
        legal_move_kind(&board, &state, sq("e1"), sq("c1")),
        Some(MoveKind::Castle(CastleSide::QueenSide))
    );
}

#[test]
fn test_king_castling_requires_rights() {
    let (board, mut state) = castling_position(&[]);
    state.castling.revoke(Color::White, CastleSide::KingSide);

    assert!(!legal(&board, &state, "e1", "g1"), "King-side right was revoked");
    assert!(legal(&board, &state, "e1", "c1"), "Queen-side right is untouched");
}

#[test]
fn test_king_castling_blocked_by_piece() {
    let (board, state) = castling_position(&[(PieceKind::Knight, Color::White, "b1")]);

    assert!(
        !legal(&board, &state, "e1", "c1"),
        "b1 must be empty even though the king never crosses it"
    );
    assert!(legal(&board, &state, "e1", "g1"));
}

#[test]
fn test_king_castling_denied_through_attacked_squares() {
    //! f1 and g1 attacked by a rook forbids king-side castling
    let (board, state) = castling_position(&[(PieceKind::Rook, Color::Black, "f8")]);
    assert!(!legal(&board, &state, "e1", "g1"), "King would pass through f1");

    let (board, state) = castling_position(&[(PieceKind::Rook, Color::Black, "g8")]);
    assert!(!legal(&board, &state, "e1", "g1"), "King would land on g1");

    let (board, state) = castling_position(&[(PieceKind::Rook, Color::Black, "e7")]);
    assert!(!legal(&board, &state, "e1", "g1"), "King may not castle out of check");
    assert!(!legal(&board, &state, "e1", "c1"), "King may not castle out of check");
}

#[test]
fn test_king_castling_allowed_when_only_rook_path_attacked() {
    //! b1 being attacked does not matter for queen-side castling
    let (board, state) = castling_position(&[(PieceKind::Rook, Color::Black, "b8")]);
    assert!(legal(&board, &state, "e1", "c1"));
}

// ============================================================================
// Check and Pin Tests
// ============================================================================

#[test]
fn test_check_pinned_piece_cannot_leave_line() {
    let (board, state) = create_test_position(
        &[
            (PieceKind::King, Color::White, "e1"),
            (PieceKind::Bishop, Color::White, "e2"),
            (PieceKind::Rook, Color::Black, "e8"),
            (PieceKind::King, Color::Black, "a8"),
        ],
        Color::White,
    );

    assert!(!legal(&board, &state, "e2", "d3"), "Bishop is pinned to the king");
}

#[test]
fn test_check_must_be_answered() {
    let (board, state) = create_test_position(
        &[
            (PieceKind::King, Color::White, "e1"),
            (PieceKind::Pawn, Color::White, "a2"),
            (PieceKind::Rook, Color::White, "h4"),
            (PieceKind::Rook, Color::Black, "e8"),
            (PieceKind::King, Color::Black, "a8"),
        ],
        Color::White,
    );

    assert!(is_in_check(&board, Color::White));
    assert!(!legal(&board, &state, "a2", "a3"), "Quiet move ignores the check");
    assert!(legal(&board, &state, "h4", "e4"), "Interposing answers the check");
    assert!(legal(&board, &state, "e1", "d1"), "Stepping aside answers the check");
}

#[test]
fn test_check_opponent_piece_cannot_be_moved() {
    let (board, state) = create_test_position(
        &[
            (PieceKind::King, Color::White, "e1"),
            (PieceKind::King, Color::Black, "e8"),
            (PieceKind::Pawn, Color::Black, "e7"),
        ],
        Color::White,
    );

    assert!(!legal(&board, &state, "e7", "e6"));
    assert!(!legal(&board, &state, "c3", "c4"), "Empty source square");
}

#[test]
fn test_check_pawn_attacks_diagonally_only() {
    let (board, _) = create_test_position(
        &[(PieceKind::Pawn, Color::White, "e4")],
        Color::White,
    );

    assert!(can_attack(&board, sq("e4"), sq("d5")));
    assert!(can_attack(&board, sq("e4"), sq("f5")));
    assert!(!can_attack(&board, sq("e4"), sq("e5")));
    assert!(is_square_attacked(&board, sq("f5"), Color::White));
    assert!(!is_square_attacked(&board, sq("f5"), Color::Black));
}

// ============================================================================
// Game End Tests
// ============================================================================

#[test]
fn test_end_back_rank_mate() {
    let (board, mut state) = create_test_position(
        &[
            (PieceKind::King, Color::Black, "g8"),
            (PieceKind::Pawn, Color::Black, "f7"),
            (PieceKind::Pawn, Color::Black, "g7"),
            (PieceKind::Pawn, Color::Black, "h7"),
            (PieceKind::Rook, Color::White, "e8"),
            (PieceKind::King, Color::White, "g1"),
        ],
        Color::Black,
    );

    assert!(is_checkmate(&board, &state, Color::Black));
    assert!(!is_stalemate(&board, &state, Color::Black));

    state.turn = Color::White;
    assert!(!is_checkmate(&board, &state, Color::White));
}

#[test]
fn test_end_stalemate() {
    let (board, state) = create_test_position(
        &[
            (PieceKind::King, Color::Black, "a8"),
            (PieceKind::Queen, Color::White, "b6"),
            (PieceKind::King, Color::White, "c1"),
        ],
        Color::Black,
    );

    assert!(!is_in_check(&board, Color::Black));
    assert!(is_stalemate(&board, &state, Color::Black));
    assert!(!is_checkmate(&board, &state, Color::Black));
    assert!(legal_moves(&board, &state).is_empty());
}

#[test]
fn test_end_insufficient_material() {
    let bare = |extra: &[(PieceKind, Color, &str)]| {
        let mut pieces = vec![
            (PieceKind::King, Color::White, "e1"),
            (PieceKind::King, Color::Black, "e8"),
        ];
        pieces.extend_from_slice(extra);
        create_test_position(&pieces, Color::White).0
    };

    assert!(is_insufficient_material(&bare(&[])));
    assert!(is_insufficient_material(&bare(&[(PieceKind::Knight, Color::White, "b1")])));
    assert!(is_insufficient_material(&bare(&[(PieceKind::Bishop, Color::Black, "c8")])));
    assert!(
        is_insufficient_material(&bare(&[
            (PieceKind::Bishop, Color::White, "c1"),
            (PieceKind::Bishop, Color::Black, "f8"),
        ])),
        "c1 and f8 are both dark squares"
    );
    assert!(!is_insufficient_material(&bare(&[
        (PieceKind::Bishop, Color::White, "c1"),
        (PieceKind::Bishop, Color::Black, "c8"),
    ])));
    assert!(!is_insufficient_material(&bare(&[(PieceKind::Pawn, Color::White, "a2")])));
    assert!(!is_insufficient_material(&bare(&[
        (PieceKind::Knight, Color::White, "b1"),
        (PieceKind::Knight, Color::White, "g1"),
    ])));
}

// ============================================================================
// Simulation Restoration Tests
// ============================================================================

#[test]
fn test_simulation_restores_board() {
    //! Every simulated move leaves the board exactly as it found it
    let (mut board, mut state) = create_test_position(
        &[
            (PieceKind::King, Color::White, "e1"),
            (PieceKind::Rook, Color::White, "h1"),
            (PieceKind::Pawn, Color::White, "e5"),
            (PieceKind::Pawn, Color::Black, "d5"),
            (PieceKind::Queen, Color::Black, "a5"),
            (PieceKind::King, Color::Black, "e8"),
        ],
        Color::White,
    );
    state = with_castling(state);
    state.en_passant = Some(sq("d6"));
    let before = board;

    let cases = [
        ("e5", "d6", MoveKind::EnPassant),
        ("e1", "g1", MoveKind::Castle(CastleSide::KingSide)),
        ("h1", "h8", MoveKind::Quiet),
        ("e1", "d2", MoveKind::Quiet),
    ];
    for (from, to, kind) in cases {
        {
            let simulation = Simulation::apply(&mut board, sq(from), sq(to), kind);
            assert_ne!(*simulation.board(), before, "{from}{to} should change the board");
        }
        assert_eq!(board, before, "{from}{to} was not undone");
        assert_eq!(board.occupancy(), before.occupancy());
    }

    for (from, to) in legal_moves(&board, &state) {
        assert!(is_legal(&board, &state, from, to));
    }
    assert_eq!(board, before, "legality checks must not disturb the board");
}

#[test]
fn test_path_clear_between_squares() {
    let (board, _) = create_test_position(
        &[(PieceKind::Pawn, Color::White, "c3")],
        Color::White,
    );

    assert!(is_path_clear(sq("a1"), sq("b2"), &board), "Adjacent squares have no path");
    assert!(!is_path_clear(sq("a1"), sq("d4"), &board));
    assert!(is_path_clear(sq("a1"), sq("a8"), &board));
}
