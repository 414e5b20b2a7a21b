pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;

use crate::state::{AppState, Connection};

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (conn, mut outbound) = Connection::new();

    tracing::info!("WebSocket connected: {}", conn.id);

    // Writer: drains this connection's queue so broadcasts never wait on us
    let writer_id = conn.id.clone();
    let mut writer = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                tracing::debug!("Peer {} went away, stopping writer", writer_id);
                break;
            }
        }
    });

    loop {
        tokio::select! {
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);
                        let reply = handlers::handle_text(text.as_str(), &conn, &state).await;
                        if let Some(reply) = reply {
                            conn.send(reply);
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    // Pings are answered by axum
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
            _ = &mut writer => {
                break;
            }
        }
    }

    // Same cleanup as an explicit leave
    if let Err(e) = state.end_session(&conn.id).await {
        if !e.is_stale() {
            tracing::error!("Cleanup for {} failed: {}", conn.id, e);
        }
    }

    tracing::info!("WebSocket connection closed: {}", conn.id);
    drop(conn);
    writer.abort();
}
