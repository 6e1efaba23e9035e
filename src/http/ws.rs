//! WebSocket surface: one scene frame per client, plus inbound
//! `joint_update` messages (§6).

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::coordinator::Coordinator;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(coordinator): State<Arc<Coordinator>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, coordinator))
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum InboundMessage {
    #[serde(rename = "joint_update")]
    JointUpdate { joints: HashMap<String, f64> },
}

async fn handle_socket(socket: WebSocket, coordinator: Arc<Coordinator>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let client_id = coordinator.register_client(tx);

    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                // Client gone; the receive loop below will notice on its
                // own next poll and unregister (§4.7: dead-connection
                // cleanup never aborts the broadcast for other clients).
                break;
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        if let Message::Text(text) = msg {
            match serde_json::from_str::<InboundMessage>(&text) {
                Ok(InboundMessage::JointUpdate { joints }) => coordinator.set_joints(&joints),
                Err(err) => tracing::warn!(error = %err, "dropping malformed inbound ws message"),
            }
        }
    }

    coordinator.unregister_client(client_id);
    send_task.abort();
}
