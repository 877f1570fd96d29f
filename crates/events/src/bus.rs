//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the subscription interface of the shared ticket store.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use andon_core::catalog::{CatalogKind, CatalogList};
use andon_core::ticket::Ticket;
use andon_core::types::TicketId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// AndonEvent
// ---------------------------------------------------------------------------

/// Where a change to the collection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    /// An intent handled by this process (optimistic update).
    Local,
    /// The remote backend's change feed.
    Remote,
}

/// What changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    TicketInserted {
        ticket: Ticket,
        origin: EventOrigin,
    },
    /// Carries the full merged record, not just the patch.
    TicketUpdated {
        ticket: Ticket,
        origin: EventOrigin,
    },
    TicketRemoved {
        ticket_id: TicketId,
        origin: EventOrigin,
    },
    CatalogChanged {
        kind: CatalogKind,
        items: CatalogList,
    },
}

/// A change published on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AndonEvent {
    #[serde(flatten)]
    pub event: EventKind,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl AndonEvent {
    pub fn new(event: EventKind) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }

    pub fn ticket_inserted(ticket: Ticket, origin: EventOrigin) -> Self {
        Self::new(EventKind::TicketInserted { ticket, origin })
    }

    pub fn ticket_updated(ticket: Ticket, origin: EventOrigin) -> Self {
        Self::new(EventKind::TicketUpdated { ticket, origin })
    }

    pub fn ticket_removed(ticket_id: TicketId, origin: EventOrigin) -> Self {
        Self::new(EventKind::TicketRemoved { ticket_id, origin })
    }

    pub fn catalog_changed(kind: CatalogKind, items: CatalogList) -> Self {
        Self::new(EventKind::CatalogChanged { kind, items })
    }

    /// `true` for events that change the ticket collection.
    pub fn touches_tickets(&self) -> bool {
        !matches!(self.event, EventKind::CatalogChanged { .. })
    }

    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self.event {
            EventKind::TicketInserted { .. } => "ticket_inserted",
            EventKind::TicketUpdated { .. } => "ticket_updated",
            EventKind::TicketRemoved { .. } => "ticket_removed",
            EventKind::CatalogChanged { .. } => "catalog_changed",
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`AndonEvent`].
///
/// # Usage
///
/// ```rust
/// use andon_events::bus::{AndonEvent, EventBus, EventOrigin};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(AndonEvent::ticket_removed("t-1".into(), EventOrigin::Remote));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<AndonEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: AndonEvent) {
        tracing::trace!(event = event.name(), "Publishing event");
        // Ignore the SendError: it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<AndonEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use andon_core::ticket::TicketStatus;

    use super::*;

    fn ticket() -> Ticket {
        Ticket {
            id: "t-1".into(),
            model: "DUAL MOTOR".into(),
            ng_id: "0.01".into(),
            station: "LE-04".into(),
            tech_type: "FCT TECHNICIAN".into(),
            status: TicketStatus::Pending,
            created_at: 1_000,
            acknowledged_at: None,
            technician_name: None,
            resolved_at: None,
            action_taken: None,
        }
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(AndonEvent::ticket_inserted(ticket(), EventOrigin::Local));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.name(), "ticket_inserted");
        match received.event {
            EventKind::TicketInserted { ticket, origin } => {
                assert_eq!(ticket.id, "t-1");
                assert_eq!(origin, EventOrigin::Local);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(AndonEvent::ticket_removed("t-9".into(), EventOrigin::Remote));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1, e2);
        assert!(e1.touches_tickets());
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(AndonEvent::catalog_changed(
            CatalogKind::Lines,
            CatalogKind::Lines.defaults(),
        ));
    }

    #[test]
    fn serializes_with_type_tag() {
        let event = AndonEvent::catalog_changed(
            CatalogKind::TechTypes,
            CatalogList::from_items(["FCT TECHNICIAN"]),
        );
        assert!(!event.touches_tickets());

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "catalog_changed");
        assert_eq!(json["kind"], "tech-types");
        assert_eq!(json["items"][0], "FCT TECHNICIAN");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn ticket_event_carries_camel_case_record() {
        let event = AndonEvent::ticket_updated(ticket(), EventOrigin::Remote);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "ticket_updated");
        assert_eq!(json["origin"], "remote");
        assert_eq!(json["ticket"]["ngId"], "0.01");
    }
}
