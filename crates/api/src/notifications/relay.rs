//! Event-to-WebSocket relay.
//!
//! [`EventRelay`] subscribes to the event bus and forwards every
//! [`AndonEvent`] to all connected views as a JSON text frame. Views are
//! projections of the shared store: they apply these events instead of
//! keeping their own copy of the truth.

use std::sync::Arc;

use andon_events::AndonEvent;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::ws::WsManager;

pub struct EventRelay {
    ws_manager: Arc<WsManager>,
}

impl EventRelay {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the relay loop until `cancel` fires or the bus closes.
    pub async fn run(self, mut receiver: broadcast::Receiver<AndonEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = receiver.recv() => match event {
                    Ok(event) => {
                        tracing::trace!(event = event.name(), "Relaying event");
                        self.ws_manager.broadcast_json(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Event relay lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, relay shutting down");
                        break;
                    }
                },
            }
        }
    }
}
