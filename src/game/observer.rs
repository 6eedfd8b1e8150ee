//! Callbacks from the game core to whatever presents it

use crate::game::machine::{AppliedMove, ChessGame};
use crate::game::resources::GameOutcome;
use crate::game::types::Color;

/// Receives core-driven notifications
///
/// Implementors render, play sounds, print, or forward to a UI. The session
/// that owns the game calls [`GameObserver::report`] after each applied move
/// and then completes the presentation.
pub trait GameObserver {
    fn move_applied(&mut self, game: &ChessGame, applied: &AppliedMove);

    fn check_detected(&mut self, _color: Color) {}

    /// A local move was refused; nothing changed
    fn move_rejected(&mut self, _reason: &str) {}

    /// The displayed position changed without a move (history navigation)
    /// or was asked for
    fn show_position(&mut self, _game: &ChessGame) {}

    fn game_ended(&mut self, outcome: &GameOutcome);

    /// Dispatch everything an applied move implies, in order
    fn report(&mut self, game: &ChessGame, applied: &AppliedMove) {
        self.move_applied(game, applied);
        match applied.outcome {
            Some(outcome) => self.game_ended(&outcome),
            None if applied.check => self.check_detected(game.turn()),
            None => {}
        }
    }
}
