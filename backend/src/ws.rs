//! WebSocket endpoint
//!
//! Each socket gets a reader loop (parse JSON, forward to the hub) and a
//! writer task draining the connection's outbox.

use crate::hub::{HubCommand, HubHandle};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use shared::ClientMessage;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub async fn upgrade(ws: WebSocketUpgrade, State(hub): State<HubHandle>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, hub))
}

async fn serve_socket(socket: WebSocket, hub: HubHandle) {
    let conn = hub.next_connection_id();
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut inbox) = mpsc::unbounded_channel();

    if !hub.send(HubCommand::Connect { conn, outbox }) {
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(message) = inbox.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(err) => {
                    warn!("[BROKER] Could not encode frame for {conn}: {err}");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        let command = match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(message) => HubCommand::Message { conn, message },
                Err(err) => HubCommand::Invalid {
                    conn,
                    reason: err.to_string(),
                },
            },
            Ok(Message::Binary(_)) => HubCommand::Invalid {
                conn,
                reason: "binary frames are not supported".to_string(),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                debug!("[BROKER] Socket {conn} errored: {err}");
                break;
            }
        };
        if !hub.send(command) {
            break;
        }
    }

    hub.send(HubCommand::Disconnect { conn });
    writer.abort();
}
