//! Live dashboard analytics.
//!
//! Recomputes the [`AnalyticsSnapshot`] on every store change and once per
//! second while any ticket is unresolved (downtime keeps growing), pushing
//! each snapshot to every WebSocket view.

use std::sync::Arc;
use std::time::Duration;

use andon_core::analytics::{self, AnalyticsSnapshot};
use andon_core::catalog::CatalogKind;
use andon_core::types::now_millis;
use andon_events::{AndonEvent, EventKind};
use andon_store::{CatalogStore, TicketStore};
use chrono::FixedOffset;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::ws::WsManager;

/// How often a live snapshot is refreshed.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Aggregate the current collection against the technician categories.
pub fn snapshot_now(
    tickets: &TicketStore,
    catalogs: &CatalogStore,
    offset: FixedOffset,
) -> AnalyticsSnapshot {
    let categories = catalogs.list(CatalogKind::TechTypes);
    analytics::compute(&tickets.snapshot(), categories.items(), now_millis(), offset)
}

/// WebSocket frame carrying a snapshot.
pub fn snapshot_message(snapshot: &AnalyticsSnapshot) -> Value {
    json!({ "type": "analytics", "snapshot": snapshot })
}

pub struct AnalyticsTicker {
    tickets: Arc<TicketStore>,
    catalogs: Arc<CatalogStore>,
    ws_manager: Arc<WsManager>,
    offset: FixedOffset,
    interval: Duration,
}

impl AnalyticsTicker {
    pub fn new(
        tickets: Arc<TicketStore>,
        catalogs: Arc<CatalogStore>,
        ws_manager: Arc<WsManager>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            tickets,
            catalogs,
            ws_manager,
            offset,
            interval: TICK_INTERVAL,
        }
    }

    /// Run until `cancel` fires or the event bus closes.
    pub async fn run(self, mut events: broadcast::Receiver<AndonEvent>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Analytics ticker started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Analytics ticker stopping");
                    break;
                }
                event = events.recv() => match event {
                    Ok(event) if affects_analytics(&event) => self.push(true).await,
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Analytics ticker lagged");
                        self.push(true).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = ticker.tick() => self.push(false).await,
            }
        }
    }

    /// Compute and broadcast. Periodic pushes are skipped when nothing is
    /// open, since the numbers cannot change without an event.
    async fn push(&self, changed: bool) {
        let snapshot = snapshot_now(&self.tickets, &self.catalogs, self.offset);
        if changed || snapshot.is_live() {
            self.ws_manager
                .broadcast_json(&snapshot_message(&snapshot))
                .await;
        }
    }
}

fn affects_analytics(event: &AndonEvent) -> bool {
    event.touches_tickets()
        || matches!(
            event.event,
            EventKind::CatalogChanged {
                kind: CatalogKind::TechTypes,
                ..
            }
        )
}

#[cfg(test)]
mod tests {
    use andon_core::ticket::NewTicket;
    use andon_events::EventBus;
    use andon_store::LocalStore;
    use axum::extract::ws::Message;

    use super::*;

    async fn next_snapshot(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Message>) -> Value {
        match rx.recv().await {
            Some(Message::Text(text)) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pushes_on_change_and_ticks_while_live() {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(EventBus::default());
        let local = LocalStore::new(dir.path());
        let tickets = Arc::new(TicketStore::new(local.clone(), None, Arc::clone(&bus), 50));
        let catalogs = Arc::new(CatalogStore::load(local, Arc::clone(&bus)).await);
        let ws = Arc::new(WsManager::new());
        let mut rx = ws.add("dash".into()).await;

        let cancel = CancellationToken::new();
        let ticker = AnalyticsTicker::new(
            Arc::clone(&tickets),
            catalogs,
            Arc::clone(&ws),
            FixedOffset::east_opt(0).unwrap(),
        );
        let handle = tokio::spawn(ticker.run(bus.subscribe(), cancel.clone()));

        let input = NewTicket {
            model: "DUAL MOTOR".into(),
            station: "LE-04".into(),
            tech_type: "FCT TECHNICIAN".into(),
            ng_id: "0.01".into(),
        };
        let ticket = andon_core::lifecycle::create(&input, "t-1".into(), now_millis()).unwrap();
        tickets.insert(ticket).await.unwrap();

        let first = next_snapshot(&mut rx).await;
        assert_eq!(first["type"], "analytics");
        assert_eq!(first["snapshot"]["activeCount"], 1);

        // One open ticket: the ticker keeps refreshing on its own.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let refreshed = next_snapshot(&mut rx).await;
        assert_eq!(refreshed["snapshot"]["activeCount"], 1);
        assert_eq!(refreshed["snapshot"]["topDefect"]["code"], "0.01");

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn idle_collection_is_not_pushed_periodically() {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(EventBus::default());
        let local = LocalStore::new(dir.path());
        let tickets = Arc::new(TicketStore::new(local.clone(), None, Arc::clone(&bus), 50));
        let catalogs = Arc::new(CatalogStore::load(local, Arc::clone(&bus)).await);
        let ws = Arc::new(WsManager::new());
        let mut rx = ws.add("dash".into()).await;

        let cancel = CancellationToken::new();
        let ticker = AnalyticsTicker::new(tickets, catalogs, ws, FixedOffset::east_opt(0).unwrap());
        let handle = tokio::spawn(ticker.run(bus.subscribe(), cancel.clone()));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());

        cancel.cancel();
        handle.await.unwrap();
    }
}
