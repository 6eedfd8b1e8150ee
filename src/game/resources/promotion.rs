//! Pawn promotion choice
//!
//! The state machine asks a `PromotionChooser` which piece a pawn becomes when
//! it reaches the last rank and the move did not already name one. Front
//! ends that want to offer a choice plug in their own chooser.

use crate::game::types::{Color, PieceKind, Square};

/// Picks the piece a promoting pawn becomes
pub trait PromotionChooser: Send {
    fn choose(&mut self, color: Color, square: Square) -> PieceKind;
}

/// Always promotes to a queen
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoQueen;

impl PromotionChooser for AutoQueen {
    fn choose(&mut self, _color: Color, _square: Square) -> PieceKind {
        PieceKind::Queen
    }
}

/// Chooser that always returns a fixed kind
#[derive(Debug, Clone, Copy)]
pub struct FixedPromotion(pub PieceKind);

impl PromotionChooser for FixedPromotion {
    fn choose(&mut self, _color: Color, _square: Square) -> PieceKind {
        self.0
    }
}

/// Check if a move of `kind` landing on `target_rank` promotes
pub fn is_promotion_move(kind: PieceKind, color: Color, target_rank: u8) -> bool {
    kind == PieceKind::Pawn && target_rank == color.promotion_rank()
}
