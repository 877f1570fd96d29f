use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde_json::json;

use crate::background::analytics::snapshot_now;
use crate::state::AppState;
use crate::ws::manager::WsManager;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with `WsManager`, sent one
/// `sync` frame with the current tickets and analytics, and then receives
/// every subsequent event.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Initial frame so a freshly connected view can render without a separate
/// HTTP round-trip.
fn sync_message(state: &AppState) -> Message {
    let analytics = snapshot_now(&state.tickets, &state.catalogs, state.config.andon.utc_offset);
    let payload = json!({
        "type": "sync",
        "tickets": state.tickets.history(None),
        "analytics": analytics,
    });
    Message::Text(payload.to_string().into())
}

/// Manage a single WebSocket connection after upgrade.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let ws_manager: Arc<WsManager> = Arc::clone(&state.ws_manager);
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let mut rx = ws_manager.add(conn_id.clone()).await;
    let (mut sink, mut stream) = socket.split();

    if sink.send(sync_message(&state)).await.is_err() {
        ws_manager.remove(&conn_id).await;
        return;
    }

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Views only send intents over HTTP; inbound frames are keep-alives.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
