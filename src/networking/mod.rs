//! Online play
//!
//! - `sync` - `MoveSync`, the dedupe/gap/queue state machine for remote moves
//! - `client` - `OnlineSession` and the WebSocket loop around it

pub mod client;
pub mod sync;

pub use client::{run_online, OnlineSession, RoomRequest, SessionEvent, SessionObserver};
pub use sync::{Intake, MoveSync, RecentIds};
