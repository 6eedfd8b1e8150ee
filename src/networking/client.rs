//! Online play through the room server
//!
//! [`OnlineSession`] is the protocol brain: it turns server frames and
//! player commands into game mutations and outgoing frames, with no socket
//! of its own. [`run_online`] owns the WebSocket, the reconnect loop and the
//! periodic tick that drains the sync queue and runs the clocks.

use crate::commands::InputCommand;
use crate::game::{
    ChessGame, Color, GameObserver, GameOutcome, HistoryStep, IgnoreReason, MoveOutcome, PieceKind,
    Square, TimeControl,
};
use crate::networking::sync::{Intake, MoveSync, RecentIds, RECENT_ID_CAPACITY};
use anyhow::{bail, Context};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use shared::{AckResult, ChatLine, ClientMessage, MoveSubmission, SequencedMove, ServerMessage, Side};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use websocket::{ClientBuilder, Message};

const TICK: Duration = Duration::from_millis(100);
const RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_BASE_DELAY: Duration = Duration::from_millis(500);

/// How this client enters a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomRequest {
    Create,
    Join(String),
}

/// Session-level happenings a front end may want to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    RoomCreated { room_id: String },
    GameStarted { room_id: String, color: Color },
    OpponentOnline(bool),
    Chat(ChatLine),
    ServerError { code: String, message: String },
    Reconnecting { attempt: u32 },
    Rejoined(bool),
}

/// Game callbacks plus session events
pub trait SessionObserver: GameObserver {
    fn session_event(&mut self, event: &SessionEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingAck {
    Move,
    Sync,
    Chat,
}

pub fn side_to_color(side: Side) -> Color {
    match side {
        Side::White => Color::White,
        Side::Black => Color::Black,
    }
}

fn parse_remote(mv: &SequencedMove) -> Option<(Square, Square, Option<PieceKind>)> {
    let from = Square::from_algebraic(&mv.from)?;
    let to = Square::from_algebraic(&mv.to)?;
    let promotion = match mv.promotion.as_deref().and_then(|p| p.chars().next()) {
        Some(c) => Some(PieceKind::from_char(c).filter(|kind| kind.is_promotion_target())?),
        None => None,
    };
    Some((from, to, promotion))
}

pub struct OnlineSession<O: SessionObserver> {
    observer: O,
    time_control: TimeControl,
    game: Option<ChessGame>,
    color: Option<Color>,
    room_id: Option<String>,
    player_id: Option<String>,
    sync: MoveSync,
    chat_seen: RecentIds,
    pending: HashMap<u64, PendingAck>,
    next_req: u64,
    connected: bool,
    outgoing: Vec<ClientMessage>,
}

impl<O: SessionObserver> OnlineSession<O> {
    pub fn new(observer: O, time_control: TimeControl) -> Self {
        Self {
            observer,
            time_control,
            game: None,
            color: None,
            room_id: None,
            player_id: None,
            sync: MoveSync::new(),
            chat_seen: RecentIds::new(RECENT_ID_CAPACITY),
            pending: HashMap::new(),
            next_req: 0,
            connected: false,
            outgoing: Vec::new(),
        }
    }

    pub fn game(&self) -> Option<&ChessGame> {
        self.game.as_ref()
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn sync(&self) -> &MoveSync {
        &self.sync
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn is_game_over(&self) -> bool {
        self.game.as_ref().is_some_and(|g| g.phase().is_game_over())
    }

    /// Frames to send, in order
    pub fn take_outgoing(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.outgoing)
    }

    /// A fresh connection is up; ask for a room or rejoin the current one
    pub fn on_connected(&mut self, request: &RoomRequest) {
        self.connected = true;
        match (&self.room_id, &self.player_id) {
            (Some(room_id), Some(player_id)) => {
                let rejoin = ClientMessage::RejoinRoom {
                    room_id: room_id.clone(),
                    player_id: player_id.clone(),
                };
                self.outgoing.push(rejoin);
                self.push_sync_request(self.sync.last_applied_seq());
            }
            _ => match request {
                RoomRequest::Create => self.outgoing.push(ClientMessage::NewGame),
                RoomRequest::Join(code) => self.outgoing.push(ClientMessage::JoinGame {
                    room_id: code.trim().to_ascii_uppercase(),
                }),
            },
        }
    }

    pub fn on_disconnected(&mut self) {
        self.connected = false;
        self.pending.clear();
    }

    pub fn handle_server(&mut self, message: ServerMessage, now: Instant) {
        match message {
            ServerMessage::ServerInfo { build, connection } => {
                debug!("[SYNC] Connected to {build} as {connection}");
            }
            ServerMessage::GameCreated { room_id, player_id } => {
                info!("[SYNC] Room {room_id} created, waiting for an opponent");
                self.room_id = Some(room_id.clone());
                self.player_id = Some(player_id);
                self.observer
                    .session_event(&SessionEvent::RoomCreated { room_id });
            }
            ServerMessage::StartGame {
                room_id,
                color,
                player_id,
            } => self.start_game(room_id, side_to_color(color), player_id, now),
            ServerMessage::OpponentMove(mv) => {
                if let Intake::Held { resync: Some(last) } = self.sync.on_opponent_move(mv, now) {
                    self.push_sync_request(last);
                }
                self.drain(now);
            }
            ServerMessage::OpponentStatus { online } => {
                self.observer
                    .session_event(&SessionEvent::OpponentOnline(online));
            }
            ServerMessage::OpponentLeft { .. } => {
                self.observer
                    .session_event(&SessionEvent::OpponentOnline(false));
                self.end_by_opponent(|winner| GameOutcome::OpponentLeft { winner }, now);
            }
            ServerMessage::OpponentResigned { .. } => {
                self.end_by_opponent(|winner| GameOutcome::Resignation { winner }, now);
            }
            ServerMessage::RejoinAck { ok } => {
                if !ok {
                    warn!("[SYNC] Server refused rejoin");
                }
                self.observer.session_event(&SessionEvent::Rejoined(ok));
            }
            ServerMessage::ChatMessage(line) => {
                if self.chat_seen.insert(&line.id) {
                    self.observer.session_event(&SessionEvent::Chat(line));
                }
            }
            ServerMessage::Ack { req, result } => self.on_ack(req, result, now),
            ServerMessage::Error { code, message } => {
                warn!("[SYNC] Server error {code}: {message}");
                self.observer
                    .session_event(&SessionEvent::ServerError { code, message });
            }
        }
    }

    /// A command typed by the local player
    pub fn handle_input(&mut self, command: InputCommand, now: Instant) {
        match command {
            InputCommand::Move {
                from,
                to,
                promotion,
            } => self.submit_local(from, to, promotion, now),
            InputCommand::Resign => self.resign(now),
            InputCommand::Back => self.step(HistoryStep::Back, now),
            InputCommand::Forward => self.step(HistoryStep::Forward, now),
            InputCommand::Live => self.step(HistoryStep::End, now),
            InputCommand::Chat(text) => self.send_chat(&text),
            InputCommand::Board => {
                if let Some(game) = self.game.as_ref() {
                    self.observer.show_position(game);
                }
            }
            InputCommand::Help | InputCommand::Quit | InputCommand::Unknown(_) => {}
        }
    }

    /// Periodic work: watchdog, owed resync, queue drain, clocks
    pub fn tick(&mut self, now: Instant) {
        if self.connected {
            if let Some(last) = self.sync.poll_resync(now) {
                self.push_sync_request(last);
            }
        }
        if self.sync.check_watchdog(now).is_some() {
            if let Some(game) = self.game.as_mut() {
                game.complete_presentation();
            }
        }
        self.drain(now);
        if let Some(game) = self.game.as_mut() {
            if let Some(outcome) = game.tick(now) {
                self.observer.game_ended(&outcome);
            }
        }
    }

    fn start_game(&mut self, room_id: String, color: Color, player_id: String, now: Instant) {
        self.room_id = Some(room_id.clone());
        self.player_id = Some(player_id);
        self.color = Some(color);
        if self.game.is_none() {
            let mut game = ChessGame::new(self.time_control);
            if let Err(err) = game.start(now) {
                warn!("[SYNC] Could not start game: {err}");
            }
            self.game = Some(game);
            self.sync.reset();
            info!("[SYNC] Game started in room {room_id}, playing {}", color.name());
        }
        self.observer
            .session_event(&SessionEvent::GameStarted { room_id, color });
        if let Some(last) = self.sync.request_resync(now) {
            self.push_sync_request(last);
        }
    }

    fn submit_local(&mut self, from: Square, to: Square, promotion: Option<PieceKind>, now: Instant) {
        let refusal = match (&self.game, self.color, &self.room_id) {
            (None, _, _) | (_, None, _) | (_, _, None) => Some("the game has not started".to_string()),
            (Some(game), Some(color), _) if game.turn() != color => Some("it is not your turn".to_string()),
            _ if !self.connected => Some("not connected to the server".to_string()),
            _ => None,
        };
        if let Some(reason) = refusal {
            self.observer.move_rejected(&reason);
            return;
        }
        let (Some(game), Some(room_id)) = (self.game.as_mut(), self.room_id.clone()) else {
            return;
        };

        match game.attempt_move_with(from, to, promotion, true, now) {
            MoveOutcome::Applied(applied) => {
                let id = Uuid::new_v4().to_string();
                self.sync.remember_local(&id);
                self.next_req += 1;
                let req = self.next_req;
                self.pending.insert(req, PendingAck::Move);
                self.outgoing.push(ClientMessage::PlayerMove {
                    req,
                    room_id,
                    mv: MoveSubmission {
                        from: applied.record.from.to_algebraic(),
                        to: applied.record.to.to_algebraic(),
                        promotion: applied.record.promotion.map(|kind| kind.to_char().to_string()),
                        id: Some(id),
                    },
                });
                self.observer.report(game, &applied);
                game.complete_presentation();
            }
            MoveOutcome::Rejected(err) => self.observer.move_rejected(&err.to_string()),
            MoveOutcome::Ignored(IgnoreReason::OutOfTime) => {
                if let Some(outcome) = game.outcome() {
                    self.observer.game_ended(&outcome);
                }
            }
            MoveOutcome::Ignored(reason) => self.observer.move_rejected(&reason.to_string()),
        }
    }

    /// Apply queued remote moves one at a time while the board is idle
    fn drain(&mut self, now: Instant) {
        loop {
            let busy = self.game.as_ref().map_or(true, ChessGame::is_busy);
            let Some(mv) = self.sync.next_ready(busy, now) else {
                break;
            };
            let Some(game) = self.game.as_mut() else {
                self.sync.complete();
                break;
            };

            match parse_remote(&mv) {
                None => warn!("[SYNC] Malformed remote move {mv:?}"),
                Some((from, to, promotion)) => {
                    match game.attempt_move_with(from, to, promotion, false, now) {
                        MoveOutcome::Applied(applied) => {
                            self.observer.report(game, &applied);
                            game.complete_presentation();
                        }
                        MoveOutcome::Rejected(err) => {
                            warn!("[SYNC] Remote move {} (seq {}) rejected: {err}", mv.id, mv.seq);
                        }
                        MoveOutcome::Ignored(IgnoreReason::OutOfTime) => {
                            if let Some(outcome) = game.outcome() {
                                self.observer.game_ended(&outcome);
                            }
                        }
                        MoveOutcome::Ignored(reason) => {
                            warn!("[SYNC] Remote move {} ignored: {reason:?}", mv.id);
                        }
                    }
                }
            }
            self.sync.complete();
        }
    }

    fn on_ack(&mut self, req: u64, result: AckResult, now: Instant) {
        let Some(kind) = self.pending.remove(&req) else {
            debug!("[SYNC] Ack for unknown request {req}");
            return;
        };
        match (kind, result) {
            (PendingAck::Move, result) => {
                if let Some(last) = self.sync.on_submit_ack(&result, now) {
                    self.push_sync_request(last);
                }
            }
            (PendingAck::Sync, AckResult::Sync { moves, server_seq }) => {
                debug!("[SYNC] Resync reply: {} moves, server at {server_seq}", moves.len());
                self.sync.on_sync_reply(moves);
                self.drain(now);
            }
            (PendingAck::Sync, other) => warn!("[SYNC] Resync failed: {other:?}"),
            (PendingAck::Chat, AckResult::Error { code, message }) => {
                self.observer
                    .session_event(&SessionEvent::ServerError { code, message });
            }
            (PendingAck::Chat, _) => {}
        }
    }

    fn resign(&mut self, now: Instant) {
        let (Some(game), Some(color), Some(room_id)) =
            (self.game.as_mut(), self.color, self.room_id.clone())
        else {
            return;
        };
        if let Some(outcome) = game.resign(color, now) {
            self.outgoing.push(ClientMessage::Resign { room_id });
            self.observer.game_ended(&outcome);
        }
    }

    fn end_by_opponent(&mut self, outcome: impl FnOnce(Color) -> GameOutcome, now: Instant) {
        let (Some(game), Some(color)) = (self.game.as_mut(), self.color) else {
            return;
        };
        if let Some(outcome) = game.end_game(outcome(color), now) {
            self.observer.game_ended(&outcome);
        }
    }

    fn step(&mut self, step: HistoryStep, now: Instant) {
        if let Some(game) = self.game.as_mut() {
            match game.step_history(step, now) {
                Ok(()) => self.observer.show_position(game),
                Err(err) => debug!("[SYNC] History step refused: {err}"),
            }
        }
        // Returning to the live end may unblock queued moves
        self.drain(now);
    }

    fn send_chat(&mut self, text: &str) {
        let Some(room_id) = self.room_id.clone() else {
            return;
        };
        let id = Uuid::new_v4().to_string();
        self.chat_seen.insert(&id);
        let req = self.next_req();
        self.pending.insert(req, PendingAck::Chat);
        self.outgoing.push(ClientMessage::ChatMessage {
            req,
            room_id,
            id: Some(id),
            text: text.to_string(),
            ts: Some(Utc::now().timestamp_millis()),
        });
    }

    fn push_sync_request(&mut self, last_seq: u64) {
        let Some(room_id) = self.room_id.clone() else {
            return;
        };
        let req = self.next_req();
        self.pending.insert(req, PendingAck::Sync);
        self.outgoing.push(ClientMessage::SyncRequest {
            req,
            room_id,
            last_seq,
        });
    }

    fn next_req(&mut self) -> u64 {
        self.next_req += 1;
        self.next_req
    }
}

/// Play online until the game ends, the player quits, or the server is gone
pub async fn run_online<O: SessionObserver>(
    server_url: &str,
    request: RoomRequest,
    session: &mut OnlineSession<O>,
    inputs: &mut mpsc::UnboundedReceiver<InputCommand>,
) -> anyhow::Result<()> {
    let mut attempt = 0;
    loop {
        let builder = ClientBuilder::new()
            .uri(server_url)
            .with_context(|| format!("invalid server URL {server_url:?}"))?;
        let (socket, _) = match builder.connect().await {
            Ok(connected) => connected,
            Err(err) if attempt > 0 && attempt < RECONNECT_ATTEMPTS => {
                attempt += 1;
                warn!("[SYNC] Reconnect failed: {err}");
                session
                    .observer
                    .session_event(&SessionEvent::Reconnecting { attempt });
                tokio::time::sleep(RECONNECT_BASE_DELAY * 2u32.pow(attempt)).await;
                continue;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("could not connect to {server_url}"))
            }
        };
        info!("[SYNC] Connected to {server_url}");
        attempt = 0;

        let (mut sink, mut stream) = socket.split();
        session.on_connected(&request);
        let mut ticker = tokio::time::interval(TICK);
        let mut quit = false;

        loop {
            for message in session.take_outgoing() {
                let text = serde_json::to_string(&message)?;
                sink.send(Message::text(text)).await?;
            }
            if quit {
                break;
            }

            tokio::select! {
                frame = stream.next() => {
                    match frame {
                        Some(Ok(message)) => {
                            if let Some(text) = message.as_text() {
                                match serde_json::from_str::<ServerMessage>(text) {
                                    Ok(message) => session.handle_server(message, Instant::now()),
                                    Err(err) => warn!("[SYNC] Unreadable frame: {err}"),
                                }
                            } else if message.is_close() {
                                break;
                            }
                        }
                        Some(Err(err)) => {
                            warn!("[SYNC] Socket error: {err}");
                            break;
                        }
                        None => break,
                    }
                }
                command = inputs.recv() => {
                    match command {
                        Some(InputCommand::Quit) | None => quit = true,
                        Some(command) => session.handle_input(command, Instant::now()),
                    }
                }
                _ = ticker.tick() => session.tick(Instant::now()),
            }
        }

        session.on_disconnected();
        if quit {
            let _ = sink.close().await;
            return Ok(());
        }
        if session.is_game_over() || session.room_id().is_none() {
            bail!("connection to {server_url} lost");
        }
        attempt = 1;
        session
            .observer
            .session_event(&SessionEvent::Reconnecting { attempt });
        tokio::time::sleep(RECONNECT_BASE_DELAY).await;
    }
}
