//! Game clock with Fischer increment support
//!
//! Each side starts with a base time and receives an increment after each of
//! its moves. Only the side to move loses time; the mover's clock stops when
//! the move lands.
//!
//! Time is passed in as `Instant` values rather than read from the system so
//! the clock can be driven deterministically.
//!
//! Example: 10+5 means 10 minutes base time with 5 second increment per move.

use crate::game::types::{ByColor, Color};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// How much time each side gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeControl {
    /// No clocks; games never end on time
    Unlimited,
    /// Base time plus a per-move increment, both in seconds
    Fischer { base_secs: u64, increment_secs: u64 },
}

impl TimeControl {
    pub fn minutes(minutes: u64) -> Self {
        TimeControl::Fischer {
            base_secs: minutes * 60,
            increment_secs: 0,
        }
    }
}

impl Default for TimeControl {
    fn default() -> Self {
        TimeControl::minutes(10)
    }
}

/// Per-side countdown clocks
///
/// # Fields
///
/// - `remaining`: time banked by each side, excluding the running stint
/// - `running`: side currently on the clock and when its stint started
#[derive(Debug, Clone)]
pub struct GameClock {
    control: TimeControl,
    remaining: ByColor<Duration>,
    increment: Duration,
    running: Option<(Color, Instant)>,
}

impl GameClock {
    pub fn new(control: TimeControl) -> Self {
        let (base, increment) = match control {
            TimeControl::Unlimited => (Duration::MAX, Duration::ZERO),
            TimeControl::Fischer {
                base_secs,
                increment_secs,
            } => (
                Duration::from_secs(base_secs),
                Duration::from_secs(increment_secs),
            ),
        };
        Self {
            control,
            remaining: ByColor::new(base, base),
            increment,
            running: None,
        }
    }

    pub fn control(&self) -> TimeControl {
        self.control
    }

    pub fn is_timed(&self) -> bool {
        !matches!(self.control, TimeControl::Unlimited)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Side currently losing time
    pub fn running_side(&self) -> Option<Color> {
        self.running.map(|(color, _)| color)
    }

    /// Start `color`'s clock. Untimed games never run.
    pub fn start(&mut self, color: Color, now: Instant) {
        if self.is_timed() {
            self.running = Some((color, now));
        }
    }

    /// Stop whichever clock is running, banking its elapsed time
    ///
    /// Returns the side that was running so it can be resumed later.
    pub fn stop(&mut self, now: Instant) -> Option<Color> {
        let (color, since) = self.running.take()?;
        let left = self.remaining.get_mut(color);
        *left = left.saturating_sub(now.saturating_duration_since(since));
        Some(color)
    }

    /// Hand the move over: stop `mover`, credit its increment, start the opponent
    pub fn switch(&mut self, mover: Color, now: Instant) {
        self.stop(now);
        self.apply_increment(mover);
        self.start(mover.opponent(), now);
    }

    /// Apply Fischer increment to the player who just moved
    pub fn apply_increment(&mut self, color: Color) {
        if self.is_timed() && !self.increment.is_zero() {
            let left = self.remaining.get_mut(color);
            *left = left.saturating_add(self.increment);
        }
    }

    /// Time `color` has left at `now`, `None` for untimed games
    pub fn remaining(&self, color: Color, now: Instant) -> Option<Duration> {
        if !self.is_timed() {
            return None;
        }
        let banked = *self.remaining.get(color);
        Some(match self.running {
            Some((running, since)) if running == color => {
                banked.saturating_sub(now.saturating_duration_since(since))
            }
            _ => banked,
        })
    }

    /// Check the running clock; returns the side that ran out of time
    ///
    /// A flagged clock is stopped at zero.
    pub fn tick(&mut self, now: Instant) -> Option<Color> {
        let color = self.running_side()?;
        if self.remaining(color, now)?.is_zero() {
            self.stop(now);
            Some(color)
        } else {
            None
        }
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new(TimeControl::default())
    }
}

/// `mm:ss`, or `--:--` for untimed games
pub fn format_clock(remaining: Option<Duration>) -> String {
    match remaining {
        Some(left) => {
            let secs = left.as_secs();
            format!("{:02}:{:02}", secs / 60, secs % 60)
        }
        None => "--:--".to_string(),
    }
}
