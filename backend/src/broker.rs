//! Room broker: the authoritative, sequenced move relay
//!
//! `RoomBroker` is a plain state machine. Each call takes one event (a
//! connection opening, a client message, a connection closing, a cleanup
//! timer firing) and returns the [`Effect`]s to carry out: frames to send and
//! timers to arm. The hub task owns the only instance, so every event for a
//! room is handled one at a time.
//!
//! Per room:
//! - `seq` increases by exactly one per accepted move and is never reused
//! - move ids are deduplicated; a repeated id is acknowledged with the
//!   current `seq` and neither logged nor relayed
//! - the full move log is kept so reconnecting clients can resync
//!
//! Cleanup timers carry a token. A timer whose token no longer matches the
//! room's pending cleanup has been superseded and does nothing.

use crate::config::ServerConfig;
use crate::error::{BrokerError, BrokerResult};
use chrono::{DateTime, Utc};
use rand::Rng;
use shared::{AckResult, ChatLine, ClientMessage, MoveSubmission, SequencedMove, ServerMessage, Side};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type ConnectionId = u64;

pub const ROOM_CODE_LEN: usize = 8;
const ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Something the broker wants done
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Send {
        to: ConnectionId,
        message: ServerMessage,
    },
    /// Call [`RoomBroker::cleanup_due`] with this room and token after `after`
    ScheduleCleanup {
        room_id: String,
        token: u64,
        after: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
}

impl Role {
    pub fn side(self) -> Side {
        match self {
            Role::Host => Side::White,
            Role::Guest => Side::Black,
        }
    }

    fn other(self) -> Role {
        match self {
            Role::Host => Role::Guest,
            Role::Guest => Role::Host,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CleanupReason {
    /// Everyone went offline
    Abandoned,
    /// Someone resigned; the game is over
    Resigned,
}

#[derive(Debug)]
struct PendingCleanup {
    token: u64,
    reason: CleanupReason,
}

/// A participant slot. `player_id` is the secret a client presents to rejoin.
#[derive(Debug)]
struct Seat {
    player_id: String,
    connection: Option<ConnectionId>,
    online: bool,
}

impl Seat {
    fn new(connection: ConnectionId) -> Self {
        Self {
            player_id: Uuid::new_v4().to_string(),
            connection: Some(connection),
            online: true,
        }
    }
}

#[derive(Debug)]
struct Room {
    host: Seat,
    guest: Option<Seat>,
    seq: u64,
    moves: Vec<SequencedMove>,
    seen_move_ids: HashSet<String>,
    cleanup: Option<PendingCleanup>,
    created_at: DateTime<Utc>,
}

impl Room {
    fn new(host: Seat) -> Self {
        Self {
            host,
            guest: None,
            seq: 0,
            moves: Vec::new(),
            seen_move_ids: HashSet::new(),
            cleanup: None,
            created_at: Utc::now(),
        }
    }

    fn is_resigned(&self) -> bool {
        self.cleanup
            .as_ref()
            .is_some_and(|c| c.reason == CleanupReason::Resigned)
    }

    fn seat(&self, role: Role) -> Option<&Seat> {
        match role {
            Role::Host => Some(&self.host),
            Role::Guest => self.guest.as_ref(),
        }
    }

    fn seat_mut(&mut self, role: Role) -> Option<&mut Seat> {
        match role {
            Role::Host => Some(&mut self.host),
            Role::Guest => self.guest.as_mut(),
        }
    }

    fn connection_of(&self, role: Role) -> Option<ConnectionId> {
        self.seat(role).and_then(|seat| seat.connection)
    }

    fn anyone_online(&self) -> bool {
        self.host.online || self.guest.as_ref().is_some_and(|guest| guest.online)
    }

    fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        [Role::Host, Role::Guest]
            .into_iter()
            .filter_map(|role| self.connection_of(role))
    }

    fn moves_after(&self, last_seq: u64) -> Vec<SequencedMove> {
        self.moves
            .iter()
            .filter(|mv| mv.seq > last_seq)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone)]
struct Binding {
    room_id: String,
    role: Role,
}

/// All rooms and which connection sits in which seat
pub struct RoomBroker {
    rooms: HashMap<String, Room>,
    bindings: HashMap<ConnectionId, Binding>,
    disconnect_grace: Duration,
    resign_grace: Duration,
    build: String,
    next_token: u64,
}

fn send(out: &mut Vec<Effect>, to: Option<ConnectionId>, message: ServerMessage) {
    if let Some(to) = to {
        out.push(Effect::Send { to, message });
    }
}

impl RoomBroker {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            bindings: HashMap::new(),
            disconnect_grace: config.disconnect_grace,
            resign_grace: config.resign_grace,
            build: config.build.clone(),
            next_token: 0,
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn has_room(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Current sequence number of a room
    pub fn room_seq(&self, room_id: &str) -> Option<u64> {
        self.rooms.get(room_id).map(|room| room.seq)
    }

    /// A connection opened
    pub fn connect(&mut self, conn: ConnectionId) -> Vec<Effect> {
        debug!("[BROKER] Connection {conn} opened");
        vec![Effect::Send {
            to: conn,
            message: ServerMessage::ServerInfo {
                build: self.build.clone(),
                connection: conn,
            },
        }]
    }

    /// A client message arrived on `conn`
    pub fn handle(&mut self, conn: ConnectionId, message: ClientMessage) -> Vec<Effect> {
        let mut out = Vec::new();
        match message {
            ClientMessage::NewGame => self.new_game(conn, &mut out),
            ClientMessage::JoinGame { room_id } => {
                if let Err(err) = self.join_game(conn, &room_id, &mut out) {
                    warn!("[BROKER] Join {room_id:?} from {conn} refused: {err}");
                    send(&mut out, Some(conn), err.to_message());
                }
            }
            ClientMessage::PlayerMove { req, room_id, mv } => {
                let result = self
                    .player_move(conn, &room_id, mv, &mut out)
                    .unwrap_or_else(|err| {
                        warn!("[BROKER] Move in {room_id:?} from {conn} refused: {err}");
                        err.to_ack()
                    });
                send(&mut out, Some(conn), ServerMessage::Ack { req, result });
            }
            ClientMessage::SyncRequest {
                req,
                room_id,
                last_seq,
            } => {
                let result = self
                    .sync_request(conn, &room_id, last_seq)
                    .unwrap_or_else(|err| err.to_ack());
                send(&mut out, Some(conn), ServerMessage::Ack { req, result });
            }
            ClientMessage::Resign { room_id } => {
                if let Err(err) = self.resign(conn, &room_id, &mut out) {
                    send(&mut out, Some(conn), err.to_message());
                }
            }
            ClientMessage::RejoinRoom { room_id, player_id } => {
                let ok = self.rejoin(conn, &room_id, &player_id, &mut out);
                send(&mut out, Some(conn), ServerMessage::RejoinAck { ok });
            }
            ClientMessage::ChatMessage {
                req,
                room_id,
                id,
                text,
                ts,
            } => {
                let result = self
                    .chat(conn, &room_id, id, &text, ts, &mut out)
                    .unwrap_or_else(|err| err.to_ack());
                send(&mut out, Some(conn), ServerMessage::Ack { req, result });
            }
        }
        out
    }

    /// A frame on `conn` could not be parsed
    pub fn reject(&mut self, conn: ConnectionId, error: BrokerError) -> Vec<Effect> {
        warn!("[BROKER] Connection {conn}: {error}");
        vec![Effect::Send {
            to: conn,
            message: error.to_message(),
        }]
    }

    /// A connection closed
    pub fn disconnect(&mut self, conn: ConnectionId) -> Vec<Effect> {
        let mut out = Vec::new();
        self.detach(conn, &mut out);
        debug!("[BROKER] Connection {conn} closed");
        out
    }

    /// A cleanup timer fired
    pub fn cleanup_due(&mut self, room_id: &str, token: u64) -> Vec<Effect> {
        let mut out = Vec::new();
        let Some(room) = self.rooms.get_mut(room_id) else {
            return out;
        };
        let reason = match &room.cleanup {
            Some(pending) if pending.token == token => pending.reason,
            _ => {
                debug!("[BROKER] Stale cleanup timer for room {room_id}");
                return out;
            }
        };
        room.cleanup = None;

        if reason == CleanupReason::Abandoned {
            if room.anyone_online() {
                info!("[BROKER] Room {room_id} cleanup cancelled, a player is back");
                return out;
            }
            let remaining: Vec<ConnectionId> = room.connections().collect();
            for conn in remaining {
                send(
                    &mut out,
                    Some(conn),
                    ServerMessage::OpponentLeft {
                        room_id: room_id.to_string(),
                    },
                );
            }
        }

        self.remove_room(room_id);
        out
    }

    fn new_game(&mut self, conn: ConnectionId, out: &mut Vec<Effect>) {
        self.detach(conn, out);

        let room_id = self.unique_room_code();
        let host = Seat::new(conn);
        let player_id = host.player_id.clone();
        self.rooms.insert(room_id.clone(), Room::new(host));
        self.bindings.insert(
            conn,
            Binding {
                room_id: room_id.clone(),
                role: Role::Host,
            },
        );

        info!("[BROKER] Room {room_id} created by connection {conn}");
        send(
            out,
            Some(conn),
            ServerMessage::GameCreated { room_id, player_id },
        );
    }

    fn join_game(&mut self, conn: ConnectionId, room_id: &str, out: &mut Vec<Effect>) -> BrokerResult<()> {
        let room_id = room_id.trim().to_ascii_uppercase();
        let room = self.rooms.get(&room_id).ok_or(BrokerError::InvalidCode)?;
        if room.guest.is_some() || room.host.connection == Some(conn) {
            return Err(BrokerError::RoomFull);
        }

        self.detach(conn, out);
        let room = self.rooms.get_mut(&room_id).ok_or(BrokerError::InvalidCode)?;
        let guest = Seat::new(conn);
        let guest_id = guest.player_id.clone();
        room.guest = Some(guest);
        if room.cleanup.as_ref().is_some_and(|c| c.reason == CleanupReason::Abandoned) {
            room.cleanup = None;
        }
        self.bindings.insert(
            conn,
            Binding {
                room_id: room_id.clone(),
                role: Role::Guest,
            },
        );

        info!("[BROKER] Connection {conn} joined room {room_id}");
        send(
            out,
            room.host.connection,
            ServerMessage::StartGame {
                room_id: room_id.clone(),
                color: Role::Host.side(),
                player_id: room.host.player_id.clone(),
            },
        );
        send(
            out,
            Some(conn),
            ServerMessage::StartGame {
                room_id: room_id.clone(),
                color: Role::Guest.side(),
                player_id: guest_id,
            },
        );
        Self::push_presence(room, out);
        Ok(())
    }

    fn player_move(
        &mut self,
        conn: ConnectionId,
        room_id: &str,
        mv: MoveSubmission,
        out: &mut Vec<Effect>,
    ) -> BrokerResult<AckResult> {
        let role = self.role_in(conn, room_id);
        let room = self.rooms.get_mut(room_id).ok_or(BrokerError::RoomNotFound)?;
        let id = mv
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or(BrokerError::MissingMoveId)?;
        let role = role.ok_or(BrokerError::NotInRoom)?;

        if room.seen_move_ids.contains(&id) {
            debug!("[BROKER] Duplicate move {id} in room {room_id}");
            return Ok(AckResult::Move {
                seq: room.seq,
                duplicate: true,
            });
        }
        if room.is_resigned() {
            debug!("[BROKER] Move {id} after resignation in room {room_id}");
            return Err(BrokerError::GameOver);
        }
        room.seen_move_ids.insert(id.clone());

        room.seq += 1;
        let entry = SequencedMove {
            id,
            from: mv.from,
            to: mv.to,
            promotion: mv.promotion,
            seq: room.seq,
        };
        room.moves.push(entry.clone());
        debug!(
            "[BROKER] Room {room_id} seq {}: {}{}",
            entry.seq, entry.from, entry.to
        );

        let seq = entry.seq;
        send(
            out,
            room.connection_of(role.other()),
            ServerMessage::OpponentMove(entry),
        );
        Ok(AckResult::Move {
            seq,
            duplicate: false,
        })
    }

    fn sync_request(&self, conn: ConnectionId, room_id: &str, last_seq: u64) -> BrokerResult<AckResult> {
        let room = self.rooms.get(room_id).ok_or(BrokerError::RoomNotFound)?;
        self.role_in(conn, room_id).ok_or(BrokerError::NotInRoom)?;
        Ok(AckResult::Sync {
            moves: room.moves_after(last_seq),
            server_seq: room.seq,
        })
    }

    fn resign(&mut self, conn: ConnectionId, room_id: &str, out: &mut Vec<Effect>) -> BrokerResult<()> {
        let role = self.role_in(conn, room_id);
        let token = self.next_token();
        let resign_grace = self.resign_grace;
        let room = self.rooms.get_mut(room_id).ok_or(BrokerError::RoomNotFound)?;
        let role = role.ok_or(BrokerError::NotInRoom)?;

        info!("[BROKER] {:?} resigned in room {room_id}", role.side());
        send(
            out,
            room.connection_of(role.other()),
            ServerMessage::OpponentResigned {
                room_id: room_id.to_string(),
            },
        );

        room.host.online = false;
        if let Some(guest) = room.guest.as_mut() {
            guest.online = false;
        }
        Self::push_presence(room, out);
        room.cleanup = Some(PendingCleanup {
            token,
            reason: CleanupReason::Resigned,
        });
        out.push(Effect::ScheduleCleanup {
            room_id: room_id.to_string(),
            token,
            after: resign_grace,
        });
        Ok(())
    }

    fn rejoin(&mut self, conn: ConnectionId, room_id: &str, player_id: &str, out: &mut Vec<Effect>) -> bool {
        let role = match self.rooms.get(room_id) {
            Some(room) if room.host.player_id == player_id => Role::Host,
            Some(room) if room.guest.as_ref().is_some_and(|g| g.player_id == player_id) => Role::Guest,
            _ => {
                warn!("[BROKER] Rejoin of {room_id:?} from {conn} refused");
                return false;
            }
        };

        let already_seated = self
            .bindings
            .get(&conn)
            .is_some_and(|b| b.room_id == room_id && b.role == role);
        if !already_seated {
            self.detach(conn, out);
        }

        let Some(room) = self.rooms.get_mut(room_id) else {
            return false;
        };
        let Some(seat) = room.seat_mut(role) else {
            return false;
        };
        if let Some(old) = seat.connection.replace(conn) {
            if old != conn {
                self.bindings.remove(&old);
            }
        }
        seat.online = true;
        if room.cleanup.as_ref().is_some_and(|c| c.reason == CleanupReason::Abandoned) {
            room.cleanup = None;
        }
        self.bindings.insert(
            conn,
            Binding {
                room_id: room_id.to_string(),
                role,
            },
        );

        info!("[BROKER] Connection {conn} rejoined room {room_id} as {:?}", role.side());
        Self::push_presence(room, out);
        true
    }

    fn chat(
        &mut self,
        conn: ConnectionId,
        room_id: &str,
        id: Option<String>,
        text: &str,
        ts: Option<i64>,
        out: &mut Vec<Effect>,
    ) -> BrokerResult<AckResult> {
        let text = text.trim();
        if room_id.trim().is_empty() || text.is_empty() {
            return Err(BrokerError::BadPayload);
        }
        let room = self.rooms.get(room_id).ok_or(BrokerError::RoomNotFound)?;
        self.role_in(conn, room_id).ok_or(BrokerError::NotInRoom)?;

        let ts = ts.unwrap_or_else(|| Utc::now().timestamp_millis());
        let id = id.filter(|id| !id.trim().is_empty()).unwrap_or_else(|| {
            let suffix: u32 = rand::rng().random_range(0..0x100_0000);
            format!("{ts}-{suffix:06x}")
        });
        let line = ChatLine {
            room_id: room_id.to_string(),
            id: id.clone(),
            text: text.to_string(),
            ts,
        };
        for to in room.connections() {
            send(out, Some(to), ServerMessage::ChatMessage(line.clone()));
        }
        Ok(AckResult::Chat { id })
    }

    /// Take `conn` out of whatever seat it holds
    fn detach(&mut self, conn: ConnectionId, out: &mut Vec<Effect>) {
        let Some(binding) = self.bindings.remove(&conn) else {
            return;
        };
        let token = self.next_token();
        let disconnect_grace = self.disconnect_grace;
        let Some(room) = self.rooms.get_mut(&binding.room_id) else {
            return;
        };
        if let Some(seat) = room.seat_mut(binding.role) {
            if seat.connection == Some(conn) {
                seat.connection = None;
                seat.online = false;
            }
        }
        info!(
            "[BROKER] {:?} of room {} went offline",
            binding.role.side(),
            binding.room_id
        );
        Self::push_presence(room, out);

        if room.cleanup.is_none() {
            room.cleanup = Some(PendingCleanup {
                token,
                reason: CleanupReason::Abandoned,
            });
            out.push(Effect::ScheduleCleanup {
                room_id: binding.room_id,
                token,
                after: disconnect_grace,
            });
        }
    }

    /// Tell each participant whether the other one is online
    fn push_presence(room: &Room, out: &mut Vec<Effect>) {
        let Some(guest) = room.guest.as_ref() else {
            return;
        };
        send(
            out,
            room.host.connection,
            ServerMessage::OpponentStatus {
                online: guest.online,
            },
        );
        send(
            out,
            guest.connection,
            ServerMessage::OpponentStatus {
                online: room.host.online,
            },
        );
    }

    fn remove_room(&mut self, room_id: &str) {
        if let Some(room) = self.rooms.remove(room_id) {
            self.bindings.retain(|_, binding| binding.room_id != room_id);
            let age = Utc::now().signed_duration_since(room.created_at);
            info!(
                "[BROKER] Room {room_id} closed after {} moves ({}s old)",
                room.seq,
                age.num_seconds()
            );
        }
    }

    fn role_in(&self, conn: ConnectionId, room_id: &str) -> Option<Role> {
        self.bindings
            .get(&conn)
            .filter(|binding| binding.room_id == room_id)
            .map(|binding| binding.role)
    }

    fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn unique_room_code(&self) -> String {
        loop {
            let code = generate_room_code();
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

/// Random room code of `ROOM_CODE_LEN` characters from `A-Z0-9`
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ROOM_CODE_CHARSET.len());
            ROOM_CODE_CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_code_format() {
        for _ in 0..50 {
            let code = generate_room_code();
            assert_eq!(code.len(), ROOM_CODE_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_connect_sends_server_info() {
        let mut broker = RoomBroker::new(&ServerConfig::default());
        let effects = broker.connect(42);
        assert!(matches!(
            effects.as_slice(),
            [Effect::Send {
                to: 42,
                message: ServerMessage::ServerInfo { connection: 42, .. }
            }]
        ));
    }

    #[test]
    fn test_stale_token_is_ignored() {
        let mut broker = RoomBroker::new(&ServerConfig::default());
        broker.handle(1, ClientMessage::NewGame);
        let effects = broker.disconnect(1);
        let token = effects
            .iter()
            .find_map(|effect| match effect {
                Effect::ScheduleCleanup { token, .. } => Some(*token),
                _ => None,
            })
            .expect("disconnect should arm a cleanup");

        let room_id = broker.rooms.keys().next().cloned().unwrap();
        assert!(broker.cleanup_due(&room_id, token + 100).is_empty());
        assert!(broker.has_room(&room_id), "Stale timer must not close the room");

        broker.cleanup_due(&room_id, token);
        assert!(!broker.has_room(&room_id));
    }
}
