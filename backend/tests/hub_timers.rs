//! Hub Timer Tests
//!
//! Runs the real hub task on a paused tokio clock so cleanup timers can be
//! fast-forwarded.

use backend::config::ServerConfig;
use backend::hub::{self, HubCommand, HubHandle};
use shared::{ClientMessage, ServerMessage};
use std::time::Duration;
use tokio::sync::mpsc;

struct Client {
    conn: u64,
    inbox: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Client {
    async fn connect(hub: &HubHandle) -> Self {
        let conn = hub.next_connection_id();
        let (outbox, inbox) = mpsc::unbounded_channel();
        assert!(hub.send(HubCommand::Connect { conn, outbox }));
        let mut client = Client { conn, inbox };
        assert!(matches!(client.recv().await, ServerMessage::ServerInfo { .. }));
        client
    }

    fn send(&self, hub: &HubHandle, message: ClientMessage) {
        assert!(hub.send(HubCommand::Message {
            conn: self.conn,
            message,
        }));
    }

    async fn recv(&mut self) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(1), self.inbox.recv())
            .await
            .expect("hub should answer")
            .expect("outbox should stay open")
    }

    /// Skip frames until one matches
    async fn recv_until(&mut self, wanted: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
        loop {
            let message = self.recv().await;
            if wanted(&message) {
                return message;
            }
        }
    }
}

async fn seated_room(hub: &HubHandle) -> (Client, Client, String) {
    let mut host = Client::connect(hub).await;
    host.send(hub, ClientMessage::NewGame);
    let room_id = match host.recv().await {
        ServerMessage::GameCreated { room_id, .. } => room_id,
        other => panic!("expected game_created, got {other:?}"),
    };

    let mut guest = Client::connect(hub).await;
    guest.send(
        hub,
        ClientMessage::JoinGame {
            room_id: room_id.clone(),
        },
    );
    guest
        .recv_until(|m| matches!(m, ServerMessage::StartGame { .. }))
        .await;
    host.recv_until(|m| matches!(m, ServerMessage::StartGame { .. }))
        .await;
    (host, guest, room_id)
}

async fn join_error(hub: &HubHandle, room_id: &str) -> String {
    let mut probe = Client::connect(hub).await;
    probe.send(
        hub,
        ClientMessage::JoinGame {
            room_id: room_id.to_string(),
        },
    );
    match probe.recv_until(|m| matches!(m, ServerMessage::Error { .. })).await {
        ServerMessage::Error { code, .. } => code,
        _ => unreachable!(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_room_is_torn_down_after_grace() {
    let hub = hub::spawn(&ServerConfig::default());
    let (host, guest, room_id) = seated_room(&hub).await;

    hub.send(HubCommand::Disconnect { conn: guest.conn });
    hub.send(HubCommand::Disconnect { conn: host.conn });

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(join_error(&hub, &room_id).await, "room_full", "Room still held");

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(join_error(&hub, &room_id).await, "invalid_code", "Room torn down");
}

#[tokio::test(start_paused = true)]
async fn test_resigned_room_closes_quickly() {
    let hub = hub::spawn(&ServerConfig::default());
    let (mut host, guest, room_id) = seated_room(&hub).await;

    guest.send(
        &hub,
        ClientMessage::Resign {
            room_id: room_id.clone(),
        },
    );
    let resigned = host
        .recv_until(|m| matches!(m, ServerMessage::OpponentResigned { .. }))
        .await;
    assert_eq!(
        resigned,
        ServerMessage::OpponentResigned {
            room_id: room_id.clone()
        }
    );

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(join_error(&hub, &room_id).await, "invalid_code");
}
