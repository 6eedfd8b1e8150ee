//! Game lifecycle and terminal outcomes
//!
//! A game moves `Setup -> InProgress -> Over(outcome)` and never leaves
//! `Over`. Every outcome below is terminal: clocks stop and further moves are
//! ignored.

use crate::game::types::Color;

/// Why a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    /// The loser's king is attacked and they have no legal move
    Checkmate { winner: Color },

    /// The side to move has no legal move but is not in check
    Stalemate,

    /// Neither side can ever deliver mate
    ///
    /// - King vs King
    /// - King + single minor piece vs King
    /// - King + Bishop vs King + Bishop on same-coloured squares
    InsufficientMaterial,

    /// The same position occurred for the third time
    Repetition,

    /// The loser's clock reached zero
    Timeout { winner: Color },

    /// The loser resigned
    Resignation { winner: Color },

    /// The opponent left an online game and did not come back
    OpponentLeft { winner: Color },
}

impl GameOutcome {
    /// The winning side, `None` for draws
    pub fn winner(&self) -> Option<Color> {
        match *self {
            GameOutcome::Checkmate { winner }
            | GameOutcome::Timeout { winner }
            | GameOutcome::Resignation { winner }
            | GameOutcome::OpponentLeft { winner } => Some(winner),
            GameOutcome::Stalemate
            | GameOutcome::InsufficientMaterial
            | GameOutcome::Repetition => None,
        }
    }

    pub fn is_draw(&self) -> bool {
        self.winner().is_none()
    }

    pub fn is_checkmate(&self) -> bool {
        matches!(self, GameOutcome::Checkmate { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, GameOutcome::Timeout { .. })
    }

    /// Human-readable result line
    pub fn message(&self) -> String {
        match *self {
            GameOutcome::Checkmate { winner } => format!("Checkmate! {} wins", winner.name()),
            GameOutcome::Stalemate => "Draw by stalemate".to_string(),
            GameOutcome::InsufficientMaterial => "Draw by insufficient material".to_string(),
            GameOutcome::Repetition => "Draw by threefold repetition".to_string(),
            GameOutcome::Timeout { winner } => format!("{} wins on time", winner.name()),
            GameOutcome::Resignation { winner } => {
                format!("{} resigned, {} wins", winner.opponent().name(), winner.name())
            }
            GameOutcome::OpponentLeft { winner } => {
                format!("Opponent left the game, {} wins", winner.name())
            }
        }
    }
}

/// Lifecycle of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GamePhase {
    /// Created but not started; moves are ignored
    #[default]
    Setup,
    InProgress,
    Over(GameOutcome),
}

impl GamePhase {
    pub fn is_game_over(&self) -> bool {
        matches!(self, GamePhase::Over(_))
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        match self {
            GamePhase::Over(outcome) => Some(*outcome),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winners_and_draws() {
        assert_eq!(
            GameOutcome::Checkmate { winner: Color::Black }.winner(),
            Some(Color::Black)
        );
        assert!(GameOutcome::Stalemate.is_draw());
        assert!(GameOutcome::Repetition.is_draw());
        assert!(!GameOutcome::Timeout { winner: Color::White }.is_draw());
        assert!(GameOutcome::Timeout { winner: Color::White }.is_timeout());
    }

    #[test]
    fn test_resignation_message_names_both_sides() {
        let message = GameOutcome::Resignation { winner: Color::White }.message();
        assert_eq!(message, "Black resigned, White wins");
    }

    #[test]
    fn test_phase_defaults_to_setup() {
        assert_eq!(GamePhase::default(), GamePhase::Setup);
        assert!(!GamePhase::InProgress.is_game_over());
        assert_eq!(
            GamePhase::Over(GameOutcome::Stalemate).outcome(),
            Some(GameOutcome::Stalemate)
        );
    }
}
