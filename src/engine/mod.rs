//! External engine opponent
//!
//! The board is exported as FEN, an engine answers with a coordinate move
//! (`e2e4`), and that move is re-validated by the rules before anyone
//! applies it. Illegal or unparsable answers are retried, never applied.
//!
//! # Difficulty Levels
//!
//! | Level | Skill Level | Time/Move |
//! |-------|-------------|-----------|
//! | 1     | 0           | 0.5s      |
//! | 2     | 4           | 1.5s      |
//! | 5     | 14          | 3.0s      |
//! | 10    | 20          | 5.5s      |

pub mod error;
pub mod uci;

pub use error::{EngineError, EngineResult};
pub use uci::UciEngine;

use crate::game::{parse_coordinate_move, rules, ChessGame, PieceKind, Square};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

/// How many times an engine is asked before giving up on a position
pub const MAX_ENGINE_ATTEMPTS: u32 = 3;

const SKILL_BY_LEVEL: [u8; 10] = [0, 4, 8, 12, 14, 16, 18, 19, 20, 20];

/// Engine strength, levels 1 to 10
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Difficulty(u8);

impl Difficulty {
    /// Clamp `level` into 1..=10
    pub fn new(level: u8) -> Self {
        Self(level.clamp(1, 10))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// UCI `Skill Level` option value
    pub fn skill_level(self) -> u8 {
        SKILL_BY_LEVEL[usize::from(self.0 - 1)]
    }

    /// Search time per move
    pub fn movetime(self) -> Duration {
        match self.0 {
            1 => Duration::from_millis(500),
            level => Duration::from_millis(1000 + 500 * u64::from(level - 1)),
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self(5)
    }
}

/// Anything that can propose a move for a FEN position
#[async_trait]
pub trait MoveProvider: Send {
    /// Best move in coordinate form, e.g. `e2e4` or `e7e8q`
    async fn best_move(&mut self, fen: &str, difficulty: Difficulty) -> EngineResult<String>;
}

/// A move the rules accept for the side to move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
}

/// Ask `provider` for a move in `game`'s current position
///
/// Each answer is parsed and checked against the rules; unusable answers
/// are retried up to [`MAX_ENGINE_ATTEMPTS`] times.
pub async fn request_engine_move<P>(
    provider: &mut P,
    game: &ChessGame,
    difficulty: Difficulty,
) -> EngineResult<EngineMove>
where
    P: MoveProvider + ?Sized,
{
    let fen = game.fen();
    for attempt in 1..=MAX_ENGINE_ATTEMPTS {
        let answer = provider.best_move(&fen, difficulty).await?;
        match validate_engine_move(game, &answer) {
            Some(mv) => {
                info!("[ENGINE] Level {} plays {answer}", difficulty.level());
                return Ok(mv);
            }
            None => warn!(
                "[ENGINE] Attempt {attempt}/{MAX_ENGINE_ATTEMPTS}: rejected {answer:?} in {fen}"
            ),
        }
    }
    Err(EngineError::NoLegalMove {
        attempts: MAX_ENGINE_ATTEMPTS,
    })
}

fn validate_engine_move(game: &ChessGame, answer: &str) -> Option<EngineMove> {
    let (from, to, promotion) = parse_coordinate_move(answer)?;
    let piece = game.board().get(from)?;
    if piece.color != game.turn() {
        return None;
    }
    rules::legal_move_kind(game.board(), game.state(), from, to)?;
    Some(EngineMove { from, to, promotion })
}
