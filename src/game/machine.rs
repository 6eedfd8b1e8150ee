//! Game state machine
//!
//! `ChessGame` owns the board, the game flags, the history and the clocks of
//! one game. Every move, local or remote, human or engine, goes through
//! [`ChessGame::attempt_move`], which validates it, applies it, resolves the
//! side effects in a fixed order and evaluates the terminal conditions.
//!
//! After a move is applied the game stays *in flight* until the front end
//! calls [`ChessGame::complete_presentation`]; further moves are ignored
//! until then.

use crate::game::board::Board;
use crate::game::error::{GameError, GameResult};
use crate::game::position::{repetition_key, to_fen, GameState};
use crate::game::resources::{
    is_promotion_move, AutoQueen, GameClock, GameOutcome, GamePhase, MoveHistory, MoveRecord,
    PositionSnapshot, PromotionChooser, TimeControl,
};
use crate::game::rules::{self, MoveKind};
use crate::game::types::{Color, Piece, PieceKind, Square};
use chrono::Utc;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Why `attempt_move` did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotStarted,
    GameOver,
    /// History navigation is showing an earlier position
    Reviewing,
    /// The previous move has not finished presenting
    InFlight,
    EmptySquare,
    /// The mover's flag fell before the move arrived; the game is now over
    OutOfTime,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IgnoreReason::NotStarted => "the game has not started",
            IgnoreReason::GameOver => "the game is over",
            IgnoreReason::Reviewing => "showing an earlier position",
            IgnoreReason::InFlight => "the previous move is still being applied",
            IgnoreReason::EmptySquare => "no piece on that square",
            IgnoreReason::OutOfTime => "time ran out before the move",
        };
        f.write_str(text)
    }
}

/// A move that made it onto the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    pub record: MoveRecord,
    pub is_human_move: bool,
    /// The opponent is now in check (including mate)
    pub check: bool,
    /// Set when this move ended the game
    pub outcome: Option<GameOutcome>,
}

/// Result of [`ChessGame::attempt_move`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Applied(AppliedMove),
    /// The rules refused the move; nothing changed
    Rejected(GameError),
    /// The game was not accepting moves; nothing changed
    Ignored(IgnoreReason),
}

impl MoveOutcome {
    pub fn applied(&self) -> Option<&AppliedMove> {
        match self {
            MoveOutcome::Applied(applied) => Some(applied),
            _ => None,
        }
    }
}

/// Direction for stepping through history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStep {
    Start,
    Back,
    Forward,
    End,
}

pub struct ChessGame {
    board: Board,
    state: GameState,
    phase: GamePhase,
    reviewing: bool,
    in_flight: bool,
    history: MoveHistory,
    clock: GameClock,
    chooser: Box<dyn PromotionChooser>,
}

impl ChessGame {
    /// A game from the standard starting position, not yet started
    pub fn new(control: TimeControl) -> Self {
        Self::from_position(Board::standard(), GameState::new(), control)
    }

    /// A game from an arbitrary position, not yet started
    pub fn from_position(board: Board, mut state: GameState, control: TimeControl) -> Self {
        let initial = PositionSnapshot::capture(&board, &state);
        state.bump_repetition(initial.key.clone());
        Self {
            board,
            state,
            phase: GamePhase::Setup,
            reviewing: false,
            in_flight: false,
            history: MoveHistory::new(initial),
            clock: GameClock::new(control),
            chooser: Box::new(AutoQueen),
        }
    }

    /// Replace the promotion chooser (auto-queen by default)
    pub fn with_promotion_chooser(mut self, chooser: impl PromotionChooser + 'static) -> Self {
        self.chooser = Box::new(chooser);
        self
    }

    /// `Setup -> InProgress`; starts the clock of the side to move
    pub fn start(&mut self, now: Instant) -> GameResult<()> {
        if self.phase != GamePhase::Setup {
            return Err(GameError::InvalidStateTransition {
                message: format!("cannot start a game in phase {:?}", self.phase),
            });
        }
        self.phase = GamePhase::InProgress;
        self.clock.start(self.state.turn, now);
        info!("[GAME] Game started, {} to move", self.state.turn.name());
        Ok(())
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn turn(&self) -> Color {
        self.state.turn
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.phase.outcome()
    }

    pub fn history(&self) -> &MoveHistory {
        &self.history
    }

    pub fn is_reviewing(&self) -> bool {
        self.reviewing
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Not able to take a move right now even though the game is running
    pub fn is_busy(&self) -> bool {
        self.reviewing || self.in_flight
    }

    pub fn remaining(&self, color: Color, now: Instant) -> Option<Duration> {
        self.clock.remaining(color, now)
    }

    /// FEN of the shown position for an engine query
    pub fn fen(&self) -> String {
        to_fen(&self.board, &self.state)
    }

    pub fn legal_moves_from(&self, from: Square) -> Vec<Square> {
        rules::legal_moves_from(&self.board, &self.state, from)
    }

    /// Validate and apply `from -> to`, promoting via the chooser if needed
    pub fn attempt_move(
        &mut self,
        from: Square,
        to: Square,
        is_human_move: bool,
        now: Instant,
    ) -> MoveOutcome {
        self.attempt_move_with(from, to, None, is_human_move, now)
    }

    /// Like [`attempt_move`](Self::attempt_move) with an explicit promotion piece
    pub fn attempt_move_with(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
        is_human_move: bool,
        now: Instant,
    ) -> MoveOutcome {
        match self.phase {
            GamePhase::Setup => return MoveOutcome::Ignored(IgnoreReason::NotStarted),
            GamePhase::Over(_) => return MoveOutcome::Ignored(IgnoreReason::GameOver),
            GamePhase::InProgress => {}
        }
        if self.reviewing {
            return MoveOutcome::Ignored(IgnoreReason::Reviewing);
        }
        if self.in_flight {
            return MoveOutcome::Ignored(IgnoreReason::InFlight);
        }
        if self.tick(now).is_some() {
            return MoveOutcome::Ignored(IgnoreReason::OutOfTime);
        }
        let Some(piece) = self.board.get(from) else {
            return MoveOutcome::Ignored(IgnoreReason::EmptySquare);
        };

        let Some(kind) = rules::legal_move_kind(&self.board, &self.state, from, to) else {
            debug!("[GAME] Rejected {}{} for {}", from, to, self.state.turn.name());
            return MoveOutcome::Rejected(GameError::IllegalMove { from, to });
        };

        let promotion = if is_promotion_move(piece.kind, piece.color, to.rank.index()) {
            match promotion {
                Some(kind) if kind.is_promotion_target() => Some(kind),
                Some(kind) => {
                    return MoveOutcome::Rejected(GameError::InvalidMove {
                        message: format!("cannot promote to {kind:?}"),
                    })
                }
                None => {
                    let chosen = self.chooser.choose(piece.color, to);
                    Some(if chosen.is_promotion_target() {
                        chosen
                    } else {
                        PieceKind::Queen
                    })
                }
            }
        } else {
            None
        };

        let applied = self.apply(piece, from, to, kind, promotion, is_human_move, now);
        self.in_flight = true;
        MoveOutcome::Applied(applied)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply(
        &mut self,
        piece: Piece,
        from: Square,
        to: Square,
        kind: MoveKind,
        promotion: Option<PieceKind>,
        is_human_move: bool,
        now: Instant,
    ) -> AppliedMove {
        let mover = piece.color;
        let opponent = mover.opponent();

        // En-passant victims stand beside the destination, not on it
        let captured = kind
            .capture_square(from, to, &self.board)
            .and_then(|square| self.board.take(square));
        if let Some(victim) = captured {
            self.state.record_capture(mover, victim.kind.value());
        }
        self.board.take(from);
        self.board.set(to, Some(piece));

        if let MoveKind::Castle(side) = kind {
            if let Some((rook_from, rook_to)) = rules::castle_rook_squares(from, side) {
                let rook = self.board.take(rook_from);
                self.board.set(rook_to, rook);
            }
        }

        if let Some(promoted) = promotion {
            self.board.set(to, Some(Piece::new(mover, promoted)));
        }

        self.state.en_passant = match kind {
            MoveKind::DoublePush => from.offset(0, mover.pawn_direction()),
            _ => None,
        };

        if piece.kind == PieceKind::King {
            self.state.castling.revoke_all(mover);
        }
        self.state.castling.revoke_for_rook_square(from);
        self.state.castling.revoke_for_rook_square(to);

        let check = rules::is_in_check(&self.board, opponent);
        let outcome = self.evaluate_terminal(mover, check);
        match outcome {
            Some(outcome) => {
                self.clock.stop(now);
                self.phase = GamePhase::Over(outcome);
                info!("[GAME] {}", outcome.message());
            }
            None => {
                self.state.turn = opponent;
                self.clock.switch(mover, now);
            }
        }

        let record = MoveRecord {
            from,
            to,
            piece,
            captured,
            promotion,
            is_castling: matches!(kind, MoveKind::Castle(_)),
            is_en_passant: kind == MoveKind::EnPassant,
            is_check: check,
            timestamp: Utc::now(),
        };
        debug!("[GAME] {} played {}", mover.name(), record.uci());
        self.history
            .push(record.clone(), PositionSnapshot::capture(&self.board, &self.state));

        AppliedMove {
            record,
            is_human_move,
            check,
            outcome,
        }
    }

    /// Mate, stalemate, dead position and repetition, judged for the side
    /// about to move
    fn evaluate_terminal(&mut self, mover: Color, check: bool) -> Option<GameOutcome> {
        let opponent = mover.opponent();
        let can_move = rules::has_any_legal_move(&self.board, &self.state, opponent);

        if check && !can_move {
            *self.state.health.get_mut(opponent) = 0;
            return Some(GameOutcome::Checkmate { winner: mover });
        }
        if !can_move {
            return Some(GameOutcome::Stalemate);
        }
        if rules::is_insufficient_material(&self.board) {
            return Some(GameOutcome::InsufficientMaterial);
        }

        let key = repetition_key(
            &self.board,
            opponent,
            &self.state.castling,
            self.state.en_passant,
        );
        if self.state.bump_repetition(key) >= 3 {
            return Some(GameOutcome::Repetition);
        }
        None
    }

    /// Signal that the last applied move finished presenting
    pub fn complete_presentation(&mut self) {
        self.in_flight = false;
    }

    /// Advance the clock; ends the game if the side to move ran out of time
    pub fn tick(&mut self, now: Instant) -> Option<GameOutcome> {
        if self.phase != GamePhase::InProgress || self.reviewing {
            return None;
        }
        let flagged = self.clock.tick(now)?;
        self.end_game(
            GameOutcome::Timeout {
                winner: flagged.opponent(),
            },
            now,
        )
    }

    /// `color` gives up
    pub fn resign(&mut self, color: Color, now: Instant) -> Option<GameOutcome> {
        self.end_game(
            GameOutcome::Resignation {
                winner: color.opponent(),
            },
            now,
        )
    }

    /// Force a terminal outcome decided outside the board (resignation,
    /// opponent leaving). No-op if the game is not in progress.
    pub fn end_game(&mut self, outcome: GameOutcome, now: Instant) -> Option<GameOutcome> {
        if self.phase != GamePhase::InProgress {
            return None;
        }
        if self.reviewing {
            self.leave_review_at_live_end();
        }
        self.clock.stop(now);
        self.phase = GamePhase::Over(outcome);
        info!("[GAME] {}", outcome.message());
        Some(outcome)
    }

    /// Show snapshot `index` (0 = initial position)
    ///
    /// Anything but the live end enters review mode: the clock pauses and
    /// moves are refused. Reaching the live end leaves review mode and
    /// resumes the clock.
    pub fn go_to_history(&mut self, index: usize, now: Instant) -> GameResult<()> {
        let snapshot = self.history.seek(index)?.clone();
        snapshot.restore(&mut self.board, &mut self.state);

        if self.history.is_at_live_end() {
            if self.reviewing {
                self.reviewing = false;
                if self.phase == GamePhase::InProgress {
                    self.clock.start(self.state.turn, now);
                }
                debug!("[GAME] Left review mode");
            }
        } else if !self.reviewing {
            self.reviewing = true;
            self.clock.stop(now);
            debug!("[GAME] Entered review mode at position {index}");
        }
        Ok(())
    }

    pub fn step_history(&mut self, step: HistoryStep, now: Instant) -> GameResult<()> {
        let cursor = self.history.cursor();
        let target = match step {
            HistoryStep::Start => 0,
            HistoryStep::Back => cursor.saturating_sub(1),
            HistoryStep::Forward => (cursor + 1).min(self.history.live_index()),
            HistoryStep::End => self.history.live_index(),
        };
        self.go_to_history(target, now)
    }

    /// Resume play from the reviewed position, discarding the moves after it
    ///
    /// Only meaningful for local games; online games must stay in step with
    /// the room's move log.
    pub fn branch_from_review(&mut self, now: Instant) -> GameResult<()> {
        if !self.reviewing {
            return Ok(());
        }
        if self.phase != GamePhase::InProgress {
            return Err(GameError::InvalidStateTransition {
                message: "cannot resume play in a finished game".to_string(),
            });
        }
        self.history.truncate_after_cursor();
        self.state.repetition_counts.clear();
        let keys: Vec<String> = self.history.keys_through_cursor().map(str::to_string).collect();
        for key in keys {
            self.state.bump_repetition(key);
        }
        self.reviewing = false;
        self.clock.start(self.state.turn, now);
        info!("[GAME] Resumed play from position {}", self.history.cursor());
        Ok(())
    }

    fn leave_review_at_live_end(&mut self) {
        let live = self.history.live_index();
        if let Ok(snapshot) = self.history.seek(live) {
            let snapshot = snapshot.clone();
            snapshot.restore(&mut self.board, &mut self.state);
        }
        self.reviewing = false;
    }
}

impl Default for ChessGame {
    fn default() -> Self {
        Self::new(TimeControl::default())
    }
}

impl fmt::Debug for ChessGame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChessGame")
            .field("board", &self.board)
            .field("turn", &self.state.turn)
            .field("phase", &self.phase)
            .field("reviewing", &self.reviewing)
            .field("in_flight", &self.in_flight)
            .field("moves", &self.history.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::position::{KING_BASE_HEALTH, MAX_KING_HEALTH};
    use crate::game::resources::FixedPromotion;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    fn started(control: TimeControl) -> (ChessGame, Instant) {
        let now = Instant::now();
        let mut game = ChessGame::new(control);
        game.start(now).unwrap();
        (game, now)
    }

    /// Play a move and complete its presentation immediately
    fn play(game: &mut ChessGame, mv: &str, now: Instant) -> AppliedMove {
        let outcome = game.attempt_move(sq(&mv[0..2]), sq(&mv[2..4]), true, now);
        let applied = outcome
            .applied()
            .cloned()
            .unwrap_or_else(|| panic!("{mv} was not applied: {outcome:?}"));
        game.complete_presentation();
        applied
    }

    #[test]
    fn test_moves_ignored_before_start() {
        let mut game = ChessGame::new(TimeControl::Unlimited);
        let outcome = game.attempt_move(sq("e2"), sq("e4"), true, Instant::now());
        assert_eq!(outcome, MoveOutcome::Ignored(IgnoreReason::NotStarted));
        assert!(game.start(Instant::now()).is_ok());
        assert!(game.start(Instant::now()).is_err(), "Cannot start twice");
    }

    #[test]
    fn test_in_flight_blocks_until_presentation_completes() {
        let (mut game, now) = started(TimeControl::Unlimited);

        assert!(game.attempt_move(sq("e2"), sq("e4"), true, now).applied().is_some());
        assert!(game.is_in_flight());
        assert_eq!(
            game.attempt_move(sq("e7"), sq("e5"), false, now),
            MoveOutcome::Ignored(IgnoreReason::InFlight)
        );

        game.complete_presentation();
        assert!(game.attempt_move(sq("e7"), sq("e5"), false, now).applied().is_some());
    }

    #[test]
    fn test_illegal_move_rejected_without_mutation() {
        let (mut game, now) = started(TimeControl::Unlimited);
        let before = *game.board();

        let outcome = game.attempt_move(sq("e2"), sq("e5"), true, now);
        assert_eq!(
            outcome,
            MoveOutcome::Rejected(GameError::IllegalMove {
                from: sq("e2"),
                to: sq("e5")
            })
        );
        assert_eq!(*game.board(), before);
        assert!(!game.is_in_flight());
        assert_eq!(game.turn(), Color::White);

        let empty = game.attempt_move(sq("e4"), sq("e5"), true, now);
        assert_eq!(empty, MoveOutcome::Ignored(IgnoreReason::EmptySquare));
    }

    #[test]
    fn test_double_push_sets_en_passant_for_one_ply() {
        let (mut game, now) = started(TimeControl::Unlimited);

        play(&mut game, "e2e4", now);
        assert_eq!(game.state().en_passant, Some(sq("e3")));
        play(&mut game, "g8f6", now);
        assert_eq!(game.state().en_passant, None);
    }

    #[test]
    fn test_castling_moves_rook_and_revokes_rights() {
        let (mut game, now) = started(TimeControl::Unlimited);
        for mv in ["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6"] {
            play(&mut game, mv, now);
        }

        let applied = play(&mut game, "e1g1", now);
        assert!(applied.record.is_castling);
        assert_eq!(
            game.board().get(sq("f1")),
            Some(Piece::new(Color::White, PieceKind::Rook))
        );
        assert!(game.board().is_empty(sq("h1")));
        assert_eq!(game.state().castling.to_fen(), "kq");
    }

    #[test]
    fn test_rook_captured_on_home_square_loses_right() {
        let board = Board::from_placement("r3k3/8/8/8/8/8/8/R3K2R").unwrap();
        let (mut game, now) = (
            ChessGame::from_position(board, GameState::new(), TimeControl::Unlimited),
            Instant::now(),
        );
        game.start(now).unwrap();

        let applied = play(&mut game, "a1a8", now);
        assert_eq!(
            applied.record.captured,
            Some(Piece::new(Color::Black, PieceKind::Rook))
        );
        let rights = game.state().castling.to_fen();
        assert!(!rights.contains('q'), "Black lost its queen-side rook: {rights}");
        assert!(!rights.contains('Q'), "White's a1 rook moved: {rights}");
        assert!(rights.contains('K'));
    }

    #[test]
    fn test_capture_updates_score_and_health() {
        let (mut game, now) = started(TimeControl::Unlimited);
        for mv in ["e2e4", "d7d5"] {
            play(&mut game, mv, now);
        }
        let applied = play(&mut game, "e4d5", now);

        assert_eq!(
            applied.record.captured,
            Some(Piece::new(Color::Black, PieceKind::Pawn))
        );
        assert_eq!(game.state().scores.white, 1);
        assert_eq!(game.state().health.black, MAX_KING_HEALTH - 1);
        assert!(game.state().health.black >= KING_BASE_HEALTH);
    }

    #[test]
    fn test_promotion_uses_chooser() {
        let board = Board::from_placement("7k/P7/8/8/8/8/8/K7").unwrap();
        let now = Instant::now();
        let mut game = ChessGame::from_position(board, GameState::new(), TimeControl::Unlimited)
            .with_promotion_chooser(FixedPromotion(PieceKind::Knight));
        game.start(now).unwrap();

        let applied = play(&mut game, "a7a8", now);
        assert_eq!(applied.record.promotion, Some(PieceKind::Knight));
        assert_eq!(
            game.board().get(sq("a8")),
            Some(Piece::new(Color::White, PieceKind::Knight))
        );
    }

    #[test]
    fn test_explicit_promotion_overrides_chooser() {
        let board = Board::from_placement("7k/P7/8/8/8/8/8/K7").unwrap();
        let now = Instant::now();
        let mut game = ChessGame::from_position(board, GameState::new(), TimeControl::Unlimited);
        game.start(now).unwrap();

        let king = game.attempt_move_with(sq("a7"), sq("a8"), Some(PieceKind::King), false, now);
        assert!(matches!(king, MoveOutcome::Rejected(GameError::InvalidMove { .. })));

        let rook = game.attempt_move_with(sq("a7"), sq("a8"), Some(PieceKind::Rook), false, now);
        assert_eq!(
            rook.applied().and_then(|a| a.record.promotion),
            Some(PieceKind::Rook)
        );
    }

    #[test]
    fn test_clock_follows_side_to_move() {
        let (mut game, t0) = started(TimeControl::minutes(1));
        let t1 = t0 + Duration::from_secs(10);
        play(&mut game, "e2e4", t1);

        let t2 = t1 + Duration::from_secs(5);
        assert_eq!(game.remaining(Color::White, t2), Some(Duration::from_secs(50)));
        assert_eq!(game.remaining(Color::Black, t2), Some(Duration::from_secs(55)));
    }

    #[test]
    fn test_timeout_is_a_loss() {
        let (mut game, t0) = started(TimeControl::minutes(1));
        assert_eq!(game.tick(t0 + Duration::from_secs(30)), None);

        let outcome = game.tick(t0 + Duration::from_secs(61));
        assert_eq!(outcome, Some(GameOutcome::Timeout { winner: Color::Black }));
        assert!(game.phase().is_game_over());
        assert_eq!(
            game.attempt_move(sq("e2"), sq("e4"), true, t0),
            MoveOutcome::Ignored(IgnoreReason::GameOver)
        );
    }

    #[test]
    fn test_move_after_flag_fall_loses_on_time() {
        let control = TimeControl::Fischer {
            base_secs: 60,
            increment_secs: 5,
        };
        let (mut game, t0) = started(control);
        let late = t0 + Duration::from_secs(61);

        assert_eq!(
            game.attempt_move(sq("e2"), sq("e4"), true, late),
            MoveOutcome::Ignored(IgnoreReason::OutOfTime)
        );
        assert_eq!(
            game.outcome(),
            Some(GameOutcome::Timeout { winner: Color::Black })
        );
        assert!(game.board().get(sq("e2")).is_some(), "Board is untouched");
        assert_eq!(game.remaining(Color::White, late), Some(Duration::ZERO));
        assert_eq!(game.tick(late + Duration::from_secs(1)), None);
        assert_eq!(
            game.attempt_move(sq("e2"), sq("e4"), true, late),
            MoveOutcome::Ignored(IgnoreReason::GameOver)
        );
    }

    #[test]
    fn test_move_just_inside_the_clock_gets_increment() {
        let control = TimeControl::Fischer {
            base_secs: 60,
            increment_secs: 5,
        };
        let (mut game, t0) = started(control);
        let t1 = t0 + Duration::from_secs(59);
        play(&mut game, "e2e4", t1);
        assert_eq!(game.remaining(Color::White, t1), Some(Duration::from_secs(6)));
        assert_eq!(game.phase(), GamePhase::InProgress);
    }

    #[test]
    fn test_resignation_ends_game_once() {
        let (mut game, now) = started(TimeControl::Unlimited);
        assert_eq!(
            game.resign(Color::White, now),
            Some(GameOutcome::Resignation { winner: Color::Black })
        );
        assert_eq!(game.resign(Color::Black, now), None);
    }

    #[test]
    fn test_history_review_pauses_and_resumes() {
        let (mut game, t0) = started(TimeControl::minutes(5));
        play(&mut game, "e2e4", t0);
        play(&mut game, "e7e5", t0);

        game.go_to_history(1, t0).unwrap();
        assert!(game.is_reviewing());
        assert_eq!(game.turn(), Color::Black);
        assert!(game.board().is_empty(sq("e5")));
        assert_eq!(
            game.attempt_move(sq("g1"), sq("f3"), true, t0),
            MoveOutcome::Ignored(IgnoreReason::Reviewing)
        );

        // Paused time is not charged to White
        let t1 = t0 + Duration::from_secs(60);
        game.step_history(HistoryStep::Forward, t1).unwrap();
        assert!(!game.is_reviewing(), "Reaching the live end leaves review mode");
        assert_eq!(game.remaining(Color::White, t1), Some(Duration::from_secs(300)));
        assert!(game.board().get(sq("e5")).is_some());
        play(&mut game, "g1f3", t1);
    }

    #[test]
    fn test_branch_from_review_truncates_future() {
        let (mut game, now) = started(TimeControl::Unlimited);
        for mv in ["e2e4", "e7e5", "g1f3"] {
            play(&mut game, mv, now);
        }

        game.go_to_history(2, now).unwrap();
        game.branch_from_review(now).unwrap();
        assert_eq!(game.history().len(), 2);
        assert_eq!(game.turn(), Color::White);

        play(&mut game, "d2d4", now);
        assert_eq!(game.history().len(), 3);
        assert_eq!(
            game.history().last_move().map(MoveRecord::uci).as_deref(),
            Some("d2d4")
        );
    }

    #[test]
    fn test_go_to_history_out_of_range() {
        let (mut game, now) = started(TimeControl::Unlimited);
        assert!(game.go_to_history(5, now).is_err());
        assert!(!game.is_reviewing());
    }
}
