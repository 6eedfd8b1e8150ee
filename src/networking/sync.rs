//! Client side of move synchronization
//!
//! `MoveSync` decides what to do with moves arriving from the room server;
//! it never touches the board itself. The session feeds it network events
//! and asks it for the next move to apply:
//!
//! 1. [`MoveSync::on_opponent_move`] drops repeated ids and orders the rest
//!    by sequence number. A move past a hole in the sequence is held back
//!    until the hole is filled, and a resync is owed.
//! 2. [`MoveSync::next_ready`] hands out one move at a time, and only while
//!    the board is idle.
//! 3. [`MoveSync::complete`] releases the queue once the move has been
//!    applied and presented. [`MoveSync::check_watchdog`] releases it if
//!    that never happens.
//!
//! Resync replies go through the same dedupe and ordering path as live
//! moves. Resync requests always start from the highest *contiguous*
//! sequence number, so a missing move is asked for until it arrives.

use shared::{AckResult, SequencedMove};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How many recent move ids are remembered for dedupe
pub const RECENT_ID_CAPACITY: usize = 300;
/// Minimum spacing between resync requests
pub const RESYNC_COOLDOWN: Duration = Duration::from_millis(600);
/// How long one application may stay unfinished
pub const APPLY_WATCHDOG: Duration = Duration::from_millis(1200);

/// Fixed-capacity set of ids; the oldest id is evicted first
#[derive(Debug, Clone)]
pub struct RecentIds {
    order: VecDeque<String>,
    members: HashSet<String>,
    capacity: usize,
}

impl RecentIds {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Returns false if `id` was already present
    pub fn insert(&mut self, id: &str) -> bool {
        if self.members.contains(id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        self.order.push_back(id.to_string());
        self.members.insert(id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// What happened to an incoming opponent move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intake {
    /// Id already seen; dropped
    Duplicate,
    /// Sequence number already covered by the contiguous log; dropped
    Stale,
    /// Ready to apply once the moves before it are done
    Queued,
    /// Waiting for earlier moves. `resync` carries the `last_seq` to
    /// request if the cooldown allows a request now.
    Held { resync: Option<u64> },
}

#[derive(Debug)]
struct Applying {
    mv: SequencedMove,
    started: Instant,
}

#[derive(Debug)]
pub struct MoveSync {
    recent: RecentIds,
    queue: VecDeque<SequencedMove>,
    /// Known sequence numbers past the hole; `None` marks one of our own
    /// moves, which is already on the board
    held: BTreeMap<u64, Option<SequencedMove>>,
    contiguous_seq: u64,
    highest_seq: u64,
    resync_owed: bool,
    applying: Option<Applying>,
    last_resync: Option<Instant>,
}

impl Default for MoveSync {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveSync {
    pub fn new() -> Self {
        Self {
            recent: RecentIds::new(RECENT_ID_CAPACITY),
            queue: VecDeque::new(),
            held: BTreeMap::new(),
            contiguous_seq: 0,
            highest_seq: 0,
            resync_owed: false,
            applying: None,
            last_resync: None,
        }
    }

    /// Highest sequence number with every move up to it accounted for
    pub fn last_applied_seq(&self) -> u64 {
        self.contiguous_seq
    }

    /// Highest sequence number seen at all
    pub fn highest_seq(&self) -> u64 {
        self.highest_seq
    }

    /// Moves ready to apply
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Moves waiting for a hole in the sequence to fill
    pub fn held(&self) -> usize {
        self.held.values().filter(|entry| entry.is_some()).count()
    }

    pub fn has_gap(&self) -> bool {
        !self.held.is_empty()
    }

    pub fn is_resync_owed(&self) -> bool {
        self.resync_owed
    }

    pub fn is_applying(&self) -> bool {
        self.applying.is_some()
    }

    /// Record the id of a move this client is about to submit
    pub fn remember_local(&mut self, id: &str) {
        self.recent.insert(id);
    }

    /// An `opponent_move` frame arrived
    pub fn on_opponent_move(&mut self, mv: SequencedMove, now: Instant) -> Intake {
        if !self.recent.insert(&mv.id) {
            debug!("[SYNC] Dropping duplicate move {}", mv.id);
            self.mark_known(mv.seq);
            return Intake::Duplicate;
        }
        if mv.seq <= self.contiguous_seq {
            debug!("[SYNC] Dropping stale move {} at seq {}", mv.id, mv.seq);
            return Intake::Stale;
        }
        let seq = mv.seq;
        self.record(mv);
        if self.held.contains_key(&seq) {
            warn!(
                "[SYNC] Gap detected: have seq {}, got {}",
                self.contiguous_seq, seq
            );
            self.resync_owed = true;
            Intake::Held {
                resync: self.request_resync(now),
            }
        } else {
            Intake::Queued
        }
    }

    /// Throttled resync: `Some(last_seq)` if a request should go out now
    pub fn request_resync(&mut self, now: Instant) -> Option<u64> {
        if let Some(last) = self.last_resync {
            if now.saturating_duration_since(last) < RESYNC_COOLDOWN {
                debug!("[SYNC] Resync throttled");
                self.resync_owed = true;
                return None;
            }
        }
        self.last_resync = Some(now);
        self.resync_owed = false;
        Some(self.contiguous_seq)
    }

    /// A resync that was throttled earlier, once the cooldown allows it
    pub fn poll_resync(&mut self, now: Instant) -> Option<u64> {
        if !self.resync_owed {
            return None;
        }
        self.request_resync(now)
    }

    /// Order the moves from a resync reply; returns how many were new
    pub fn on_sync_reply(&mut self, mut moves: Vec<SequencedMove>) -> usize {
        moves.sort_by_key(|mv| mv.seq);
        let mut queued = 0;
        for mv in moves {
            if !self.recent.insert(&mv.id) {
                // Our own move, possibly with its ack lost
                self.mark_known(mv.seq);
                continue;
            }
            if mv.seq <= self.contiguous_seq {
                continue;
            }
            self.record(mv);
            queued += 1;
        }
        if queued > 0 {
            debug!("[SYNC] Resync queued {queued} moves");
        }
        // A hole the reply did not cover is asked for again
        self.resync_owed = self.has_gap();
        queued
    }

    /// Acknowledgement of our own submitted move; `Some(last_seq)` asks for a resync
    pub fn on_submit_ack(&mut self, result: &AckResult, now: Instant) -> Option<u64> {
        match result {
            AckResult::Move { seq, .. } => {
                self.mark_known(*seq);
                if self.has_gap() {
                    self.resync_owed = true;
                    return self.request_resync(now);
                }
                None
            }
            other => {
                warn!("[SYNC] Move not acknowledged: {other:?}");
                self.request_resync(now)
            }
        }
    }

    /// Next move to apply, if nothing is being applied and the board is idle
    pub fn next_ready(&mut self, board_busy: bool, now: Instant) -> Option<SequencedMove> {
        if self.applying.is_some() || board_busy {
            return None;
        }
        let mv = self.queue.pop_front()?;
        self.applying = Some(Applying {
            mv: mv.clone(),
            started: now,
        });
        Some(mv)
    }

    /// The move handed out by `next_ready` is done (applied, rejected or malformed)
    pub fn complete(&mut self) {
        self.applying = None;
    }

    /// Force-release an application that never completed; returns the move
    pub fn check_watchdog(&mut self, now: Instant) -> Option<SequencedMove> {
        let stuck = self
            .applying
            .as_ref()
            .is_some_and(|a| now.saturating_duration_since(a.started) >= APPLY_WATCHDOG);
        if !stuck {
            return None;
        }
        let released = self.applying.take().map(|a| a.mv);
        if let Some(mv) = &released {
            warn!(
                "[SYNC] Watchdog: move {} ({}{}) never completed, releasing queue",
                mv.id, mv.from, mv.to
            );
        }
        released
    }

    /// Forget everything (new room)
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// A sequence number taken by a move already on the board
    fn mark_known(&mut self, seq: u64) {
        if seq <= self.contiguous_seq {
            return;
        }
        self.highest_seq = self.highest_seq.max(seq);
        self.held.entry(seq).or_insert(None);
        self.release_contiguous();
    }

    fn record(&mut self, mv: SequencedMove) {
        self.highest_seq = self.highest_seq.max(mv.seq);
        self.held.insert(mv.seq, Some(mv));
        self.release_contiguous();
    }

    /// Move everything directly after the contiguous log into the queue
    fn release_contiguous(&mut self) {
        while let Some(entry) = self.held.remove(&(self.contiguous_seq + 1)) {
            self.contiguous_seq += 1;
            if let Some(mv) = entry {
                self.queue.push_back(mv);
            }
        }
    }
}
