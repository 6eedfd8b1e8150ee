//! A game against an external engine
//!
//! The human's commands and the engine's replies go through the same
//! `ChessGame`. An engine that cannot produce a legal move forfeits.

use crate::commands::InputCommand;
use crate::engine::{request_engine_move, Difficulty, MoveProvider};
use crate::game::{
    ChessGame, Color, GameObserver, GamePhase, HistoryStep, IgnoreReason, MoveOutcome, PieceKind, Square,
};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info};

const TICK: Duration = Duration::from_millis(100);

pub struct LocalGame<P: MoveProvider, O: GameObserver> {
    pub game: ChessGame,
    pub engine: P,
    pub difficulty: Difficulty,
    pub human: Color,
    pub observer: O,
}

impl<P: MoveProvider, O: GameObserver> LocalGame<P, O> {
    pub fn new(game: ChessGame, engine: P, difficulty: Difficulty, human: Color, observer: O) -> Self {
        Self {
            game,
            engine,
            difficulty,
            human,
            observer,
        }
    }

    fn engine_to_move(&self) -> bool {
        !self.game.phase().is_game_over()
            && !self.game.is_busy()
            && self.game.turn() != self.human
    }

    /// Ask the engine for its move and play it, forfeiting on failure
    pub async fn play_engine_turn(&mut self) {
        match request_engine_move(&mut self.engine, &self.game, self.difficulty).await {
            Ok(mv) => {
                let outcome = self.game.attempt_move_with(mv.from, mv.to, mv.promotion, false, Instant::now());
                self.present(outcome);
            }
            Err(err) => {
                error!("[ENGINE] {err}; engine forfeits");
                let engine_color = self.human.opponent();
                if let Some(outcome) = self.game.resign(engine_color, Instant::now()) {
                    self.observer.game_ended(&outcome);
                }
            }
        }
    }

    /// Apply one human command; returns false when the player quits
    pub fn handle_input(&mut self, command: InputCommand, now: Instant) -> bool {
        match command {
            InputCommand::Move {
                from,
                to,
                promotion,
            } => self.human_move(from, to, promotion, now),
            InputCommand::Resign => {
                if let Some(outcome) = self.game.resign(self.human, now) {
                    self.observer.game_ended(&outcome);
                }
            }
            InputCommand::Back => self.step(HistoryStep::Back, now),
            InputCommand::Forward => self.step(HistoryStep::Forward, now),
            InputCommand::Live => self.step(HistoryStep::End, now),
            InputCommand::Quit => return false,
            InputCommand::Chat(_) => self.observer.move_rejected("chat is only available online"),
            InputCommand::Board => self.observer.show_position(&self.game),
            InputCommand::Help | InputCommand::Unknown(_) => {}
        }
        true
    }

    fn human_move(&mut self, from: Square, to: Square, promotion: Option<PieceKind>, now: Instant) {
        if self.game.turn() != self.human {
            self.observer.move_rejected("it is not your turn");
            return;
        }
        // A new move from an earlier position abandons the reviewed future
        if self.game.is_reviewing() {
            if let Err(err) = self.game.branch_from_review(now) {
                self.observer.move_rejected(&err.to_string());
                return;
            }
        }
        let outcome = self.game.attempt_move_with(from, to, promotion, true, now);
        self.present(outcome);
    }

    fn step(&mut self, step: HistoryStep, now: Instant) {
        match self.game.step_history(step, now) {
            Ok(()) => self.observer.show_position(&self.game),
            Err(err) => self.observer.move_rejected(&err.to_string()),
        }
    }

    fn present(&mut self, outcome: MoveOutcome) {
        match outcome {
            MoveOutcome::Applied(applied) => {
                self.observer.report(&self.game, &applied);
                self.game.complete_presentation();
            }
            MoveOutcome::Rejected(err) => self.observer.move_rejected(&err.to_string()),
            MoveOutcome::Ignored(IgnoreReason::OutOfTime) => {
                if let Some(outcome) = self.game.outcome() {
                    self.observer.game_ended(&outcome);
                }
            }
            MoveOutcome::Ignored(reason) => self.observer.move_rejected(&reason.to_string()),
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(outcome) = self.game.tick(now) {
            self.observer.game_ended(&outcome);
        }
    }

    /// Play until the game ends or the player quits
    pub async fn run(&mut self, inputs: &mut mpsc::UnboundedReceiver<InputCommand>) -> anyhow::Result<()> {
        if self.game.phase() == GamePhase::Setup {
            self.game.start(Instant::now())?;
        }
        info!(
            "[GAME] {} vs engine level {}",
            self.human.name(),
            self.difficulty.level()
        );
        let mut ticker = tokio::time::interval(TICK);

        while !self.game.phase().is_game_over() {
            if self.engine_to_move() {
                self.play_engine_turn().await;
                continue;
            }
            tokio::select! {
                command = inputs.recv() => {
                    let keep_going = match command {
                        Some(command) => self.handle_input(command, Instant::now()),
                        None => false,
                    };
                    if !keep_going {
                        return Ok(());
                    }
                }
                _ = ticker.tick() => self.tick(Instant::now()),
            }
        }
        Ok(())
    }
}
