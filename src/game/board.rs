//! Board model: the 8x8 grid of piece tokens plus the castling and
//! en-passant flags that travel with it.
//!
//! Pure data. Nothing here knows about legality; the rule validator and the
//! game state machine read and write it.

use crate::game::error::{GameError, GameResult};
use crate::game::types::{ByColor, Color, Piece, PieceKind, Square};
use std::fmt;

/// Placement field of the standard starting position
pub const START_PLACEMENT: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

/// Which wing a castling move goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastleSide {
    KingSide,
    QueenSide,
}

impl CastleSide {
    /// File index of the rook that castles on this wing
    pub fn rook_file(self) -> u8 {
        match self {
            CastleSide::KingSide => 7,
            CastleSide::QueenSide => 0,
        }
    }

    /// Files the rook and king must see empty between them
    pub fn between_files(self) -> &'static [u8] {
        match self {
            CastleSide::KingSide => &[5, 6],
            CastleSide::QueenSide => &[1, 2, 3],
        }
    }
}

/// Per-side castling permissions
///
/// Rights only ever go from `true` to `false` during a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CastlingRights {
    king_side: ByColor<bool>,
    queen_side: ByColor<bool>,
}

impl CastlingRights {
    pub fn all() -> Self {
        Self {
            king_side: ByColor::new(true, true),
            queen_side: ByColor::new(true, true),
        }
    }

    pub fn none() -> Self {
        Self {
            king_side: ByColor::new(false, false),
            queen_side: ByColor::new(false, false),
        }
    }

    pub fn has(&self, color: Color, side: CastleSide) -> bool {
        match side {
            CastleSide::KingSide => *self.king_side.get(color),
            CastleSide::QueenSide => *self.queen_side.get(color),
        }
    }

    pub fn revoke(&mut self, color: Color, side: CastleSide) {
        match side {
            CastleSide::KingSide => *self.king_side.get_mut(color) = false,
            CastleSide::QueenSide => *self.queen_side.get_mut(color) = false,
        }
    }

    pub fn revoke_all(&mut self, color: Color) {
        self.revoke(color, CastleSide::KingSide);
        self.revoke(color, CastleSide::QueenSide);
    }

    /// Drop the right tied to a rook home corner, if `square` is one
    pub fn revoke_for_rook_square(&mut self, square: Square) {
        for color in [Color::White, Color::Black] {
            if square.rank.index() != color.home_rank() {
                continue;
            }
            for side in [CastleSide::KingSide, CastleSide::QueenSide] {
                if square.file.index() == side.rook_file() {
                    self.revoke(color, side);
                }
            }
        }
    }

    /// FEN castling field, `-` when no rights remain
    pub fn to_fen(&self) -> String {
        let mut out = String::new();
        if self.has(Color::White, CastleSide::KingSide) {
            out.push('K');
        }
        if self.has(Color::White, CastleSide::QueenSide) {
            out.push('Q');
        }
        if self.has(Color::Black, CastleSide::KingSide) {
            out.push('k');
        }
        if self.has(Color::Black, CastleSide::QueenSide) {
            out.push('q');
        }
        if out.is_empty() {
            out.push('-');
        }
        out
    }
}

impl Default for CastlingRights {
    fn default() -> Self {
        Self::all()
    }
}

/// The 8x8 grid, indexed `[rank][file]` with rank 0 being White's back rank
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [[Option<Piece>; 8]; 8],
}

impl Board {
    pub fn empty() -> Self {
        Self {
            cells: [[None; 8]; 8],
        }
    }

    /// Standard starting arrangement
    pub fn standard() -> Self {
        let mut board = Self::empty();
        let back_rank = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        for color in [Color::White, Color::Black] {
            for (file, kind) in back_rank.iter().enumerate() {
                board.cells[color.home_rank() as usize][file] = Some(Piece::new(color, *kind));
                board.cells[color.pawn_start_rank() as usize][file] =
                    Some(Piece::new(color, PieceKind::Pawn));
            }
        }
        board
    }

    /// Build a board from the placement field of a FEN string
    ///
    /// Used to set up arbitrary positions (engine replies, tests, analysis).
    pub fn from_placement(placement: &str) -> GameResult<Self> {
        let invalid = |message: String| GameError::InvalidPosition { message };
        let rows: Vec<&str> = placement.split('/').collect();
        if rows.len() != 8 {
            return Err(invalid(format!("expected 8 ranks, found {}", rows.len())));
        }

        let mut board = Self::empty();
        for (row, text) in rows.iter().enumerate() {
            let rank = 7 - row;
            let mut file = 0usize;
            for c in text.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                    continue;
                }
                let piece = Piece::from_fen_char(c)
                    .ok_or_else(|| invalid(format!("unknown piece letter {c:?}")))?;
                if file >= 8 {
                    return Err(invalid(format!("rank {} overflows", rank + 1)));
                }
                board.cells[rank][file] = Some(piece);
                file += 1;
            }
            if file != 8 {
                return Err(invalid(format!("rank {} has {file} files", rank + 1)));
            }
        }
        Ok(board)
    }

    /// Placement field of a FEN string, rank 8 first
    pub fn to_placement(&self) -> String {
        let mut out = String::with_capacity(72);
        for rank in (0..8).rev() {
            let mut gap = 0;
            for file in 0..8 {
                match self.cells[rank][file] {
                    Some(piece) => {
                        if gap > 0 {
                            out.push_str(&gap.to_string());
                            gap = 0;
                        }
                        out.push(piece.fen_char());
                    }
                    None => gap += 1,
                }
            }
            if gap > 0 {
                out.push_str(&gap.to_string());
            }
            if rank > 0 {
                out.push('/');
            }
        }
        out
    }

    pub fn get(&self, square: Square) -> Option<Piece> {
        self.cells[square.rank.index() as usize][square.file.index() as usize]
    }

    pub fn set(&mut self, square: Square, piece: Option<Piece>) {
        self.cells[square.rank.index() as usize][square.file.index() as usize] = piece;
    }

    /// Remove and return whatever stands on `square`
    pub fn take(&mut self, square: Square) -> Option<Piece> {
        let slot = &mut self.cells[square.rank.index() as usize][square.file.index() as usize];
        slot.take()
    }

    pub fn is_empty(&self, square: Square) -> bool {
        self.get(square).is_none()
    }

    pub fn color_at(&self, square: Square) -> Option<Color> {
        self.get(square).map(|piece| piece.color)
    }

    /// Every occupied square with its piece
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |square| self.get(square).map(|piece| (square, piece)))
    }

    pub fn find_king(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, piece)| piece.color == color && piece.kind == PieceKind::King)
            .map(|(square, _)| square)
    }

    /// Bitmask of occupied squares, bit `rank * 8 + file`
    pub fn occupancy(&self) -> u64 {
        self.pieces().fold(0u64, |mask, (square, _)| {
            mask | 1u64 << (square.rank.index() * 8 + square.file.index())
        })
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({})", self.to_placement())
    }
}

/// Text diagram, White at the bottom
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8 {
                let c = self.cells[rank][file].map_or('.', Piece::fen_char);
                write!(f, " {c}")?;
            }
            writeln!(f)?;
        }
        write!(f, "   a b c d e f g h")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    #[test]
    fn test_standard_layout() {
        let board = Board::standard();
        assert_eq!(board.to_placement(), START_PLACEMENT);
        assert_eq!(board.pieces().count(), 32);
        assert_eq!(board.find_king(Color::White), Some(sq("e1")));
        assert_eq!(board.find_king(Color::Black), Some(sq("e8")));
        assert_eq!(
            board.get(sq("d8")),
            Some(Piece::new(Color::Black, PieceKind::Queen))
        );
    }

    #[test]
    fn test_placement_parse_matches_export() {
        let text = "r3k2r/8/8/3pP3/8/8/8/R3K2R";
        let board = Board::from_placement(text).unwrap();
        assert_eq!(board.to_placement(), text);
        assert_eq!(board.color_at(sq("e5")), Some(Color::White));
        assert!(board.is_empty(sq("e4")));
    }

    #[test]
    fn test_placement_rejects_bad_input() {
        assert!(Board::from_placement("8/8/8").is_err());
        assert!(Board::from_placement("9/8/8/8/8/8/8/8").is_err());
        assert!(Board::from_placement("x7/8/8/8/8/8/8/8").is_err());
        assert!(Board::from_placement("7/8/8/8/8/8/8/8").is_err());
    }

    #[test]
    fn test_take_clears_square() {
        let mut board = Board::standard();
        let knight = board.take(sq("g1"));
        assert_eq!(knight, Some(Piece::new(Color::White, PieceKind::Knight)));
        assert!(board.is_empty(sq("g1")));
        assert_eq!(board.take(sq("g1")), None);
    }

    #[test]
    fn test_castling_rights_revocation() {
        let mut rights = CastlingRights::all();
        assert_eq!(rights.to_fen(), "KQkq");

        rights.revoke_for_rook_square(sq("h8"));
        assert!(!rights.has(Color::Black, CastleSide::KingSide));
        assert_eq!(rights.to_fen(), "KQq");

        rights.revoke_for_rook_square(sq("e4"));
        assert_eq!(rights.to_fen(), "KQq");

        rights.revoke_all(Color::White);
        rights.revoke(Color::Black, CastleSide::QueenSide);
        assert_eq!(rights.to_fen(), "-");
    }

    #[test]
    fn test_occupancy_mask() {
        let board = Board::standard();
        assert_eq!(board.occupancy(), 0xFFFF_0000_0000_FFFF);
        assert_eq!(Board::empty().occupancy(), 0);
    }
}
