//! Realtime change feed over the backend's Phoenix-channel WebSocket.
//!
//! One session = connect, join the `postgres_changes` channel for the
//! ticket table, then forward every row change into an mpsc channel while
//! sending a heartbeat every 30 seconds. The session ends when the socket
//! closes, errors, or the cancellation token fires.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::error::RemoteError;
use crate::remote::{ChangeKind, RemoteChange};
use crate::rest::RestConfig;

/// Interval between Phoenix heartbeats.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Buffered change notifications per session.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Channel topic joined for the ticket table.
const CHANNEL_TOPIC: &str = "realtime:andon-tickets";

/// Derive the realtime WebSocket URL from the REST base URL.
pub fn realtime_url(base_url: &str, anon_key: &str) -> Result<String, RemoteError> {
    let base = base_url.trim_end_matches('/');
    let host = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(RemoteError::Decode(format!(
            "backend URL must start with http:// or https://, got '{base_url}'"
        )));
    };
    Ok(format!("{host}/realtime/v1/websocket?apikey={anon_key}&vsn=1.0.0"))
}

/// `phx_join` frame subscribing to every change on `table`.
pub fn join_message(table: &str, anon_key: &str) -> Value {
    json!({
        "topic": CHANNEL_TOPIC,
        "event": "phx_join",
        "payload": {
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [
                    { "event": "*", "schema": "public", "table": table }
                ]
            },
            "access_token": anon_key
        },
        "ref": "1",
        "join_ref": "1"
    })
}

fn heartbeat_message(seq: u64) -> Value {
    json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": seq.to_string()
    })
}

/// Extract a row change from a text frame.
///
/// Frames that are not `postgres_changes` notifications (join replies,
/// heartbeat replies, presence) yield `None`.
pub fn parse_change(text: &str) -> Option<RemoteChange> {
    let frame: Value = serde_json::from_str(text).ok()?;
    if frame.get("event")?.as_str()? != "postgres_changes" {
        return None;
    }

    let data = frame.get("payload")?.get("data")?;
    let kind = ChangeKind::parse(data.get("type")?.as_str()?)?;

    let record = match kind {
        ChangeKind::Delete => data.get("old_record")?,
        ChangeKind::Insert | ChangeKind::Update => data.get("record")?,
    };

    Some(RemoteChange {
        kind,
        record: record.clone(),
    })
}

/// Open a session and spawn the task that drives it.
pub async fn connect(
    config: &RestConfig,
    cancel: CancellationToken,
) -> Result<mpsc::Receiver<RemoteChange>, RemoteError> {
    let url = realtime_url(&config.url, &config.anon_key)?;
    let (ws_stream, _response) = connect_async(url.as_str()).await?;
    let (mut sink, mut stream) = ws_stream.split();

    sink.send(Message::Text(
        join_message(&config.table, &config.anon_key).to_string(),
    ))
    .await?;
    tracing::info!(table = %config.table, "Joined realtime change feed");

    let (tx, rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut seq: u64 = 1;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    tracing::info!("Realtime session cancelled");
                    break;
                }
                _ = heartbeat.tick() => {
                    seq += 1;
                    if let Err(e) = sink.send(Message::Text(heartbeat_message(seq).to_string())).await {
                        tracing::warn!(error = %e, "Realtime heartbeat failed");
                        break;
                    }
                }
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(change) = parse_change(&text) {
                                if tx.send(change).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "Realtime socket closed by backend");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Realtime receive error");
                            break;
                        }
                        None => break,
                    }
                }
            }
        }
    });

    Ok(rx)
}
