//! The hub task: sole owner of the [`RoomBroker`]
//!
//! Socket tasks talk to the hub over an mpsc channel. The hub registers each
//! connection's outbound sender, feeds events to the broker and carries out
//! the effects it returns. Cleanup timers are plain tokio sleeps that post a
//! `CleanupDue` back into the same channel.

use crate::broker::{ConnectionId, Effect, RoomBroker};
use crate::config::ServerConfig;
use crate::error::BrokerError;
use shared::{ClientMessage, ServerMessage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug)]
pub enum HubCommand {
    Connect { conn: ConnectionId, outbox: Outbox },
    Message { conn: ConnectionId, message: ClientMessage },
    Invalid { conn: ConnectionId, reason: String },
    Disconnect { conn: ConnectionId },
    CleanupDue { room_id: String, token: u64 },
}

/// Cloneable handle given to every socket task
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<HubCommand>,
    next_conn: Arc<AtomicU64>,
}

impl HubHandle {
    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_conn.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Returns false once the hub has stopped
    pub fn send(&self, command: HubCommand) -> bool {
        self.commands.send(command).is_ok()
    }
}

/// Start the hub on the current runtime
pub fn spawn(config: &ServerConfig) -> HubHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let broker = RoomBroker::new(config);
    tokio::spawn(run(broker, rx, tx.clone()));
    HubHandle {
        commands: tx,
        next_conn: Arc::new(AtomicU64::new(0)),
    }
}

async fn run(
    mut broker: RoomBroker,
    mut rx: mpsc::UnboundedReceiver<HubCommand>,
    tx: mpsc::UnboundedSender<HubCommand>,
) {
    let mut outboxes: HashMap<ConnectionId, Outbox> = HashMap::new();

    while let Some(command) = rx.recv().await {
        let effects = match command {
            HubCommand::Connect { conn, outbox } => {
                outboxes.insert(conn, outbox);
                broker.connect(conn)
            }
            HubCommand::Message { conn, message } => broker.handle(conn, message),
            HubCommand::Invalid { conn, reason } => broker.reject(conn, BrokerError::Malformed(reason)),
            HubCommand::Disconnect { conn } => {
                outboxes.remove(&conn);
                broker.disconnect(conn)
            }
            HubCommand::CleanupDue { room_id, token } => broker.cleanup_due(&room_id, token),
        };

        for effect in effects {
            match effect {
                Effect::Send { to, message } => {
                    if let Some(outbox) = outboxes.get(&to) {
                        if outbox.send(message).is_err() {
                            debug!("[BROKER] Outbox for {to} already closed");
                        }
                    }
                }
                Effect::ScheduleCleanup {
                    room_id,
                    token,
                    after,
                } => {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = tx.send(HubCommand::CleanupDue { room_id, token });
                    });
                }
            }
        }
    }

    info!("[BROKER] Hub stopped");
}
