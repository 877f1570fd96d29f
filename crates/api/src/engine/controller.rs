//! Ticket lifecycle operations with their audible side effects.
//!
//! The rules themselves live in [`andon_core::lifecycle`]; this layer applies
//! them to the shared [`TicketStore`] and plays the matching cue once the
//! change is visible locally, before the remote write is awaited.

use std::sync::Arc;

use andon_audio::{AnnouncementCoordinator, Cue};
use andon_core::error::CoreError;
use andon_core::lifecycle;
use andon_core::ticket::{NewTicket, Ticket};
use andon_core::types::now_millis;
use andon_store::TicketStore;

pub struct LifecycleController {
    tickets: Arc<TicketStore>,
    coordinator: Arc<AnnouncementCoordinator>,
}

impl LifecycleController {
    pub fn new(tickets: Arc<TicketStore>, coordinator: Arc<AnnouncementCoordinator>) -> Self {
        Self {
            tickets,
            coordinator,
        }
    }

    /// Raise a new PENDING ticket and start announcing it.
    pub async fn create(&self, input: &NewTicket) -> Result<Ticket, CoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let ticket = lifecycle::create(input, id, now_millis())?;
        let ticket = self.tickets.insert_local(ticket)?;

        tracing::info!(
            ticket_id = %ticket.id,
            station = %ticket.station,
            tech_type = %ticket.tech_type,
            "Ticket created",
        );

        if self.coordinator.announce_submitted(&ticket).is_none() {
            tracing::debug!(ticket_id = %ticket.id, "Announcement deferred to reconciliation");
        }

        self.tickets.sync_insert(&ticket).await;
        Ok(ticket)
    }

    /// PENDING → ACKNOWLEDGED.
    pub async fn acknowledge(&self, id: &str, technician_name: &str) -> Result<Ticket, CoreError> {
        let (ticket, patch) = self.tickets.transition_local(id, |t| {
            lifecycle::acknowledge(t, technician_name, now_millis())
        })?;

        tracing::info!(ticket_id = %id, technician = ?ticket.technician_name, "Ticket acknowledged");
        self.coordinator.scheduler().play_cue(Cue::Acknowledge);

        self.tickets.sync_update(id, &patch).await;
        Ok(ticket)
    }

    /// ACKNOWLEDGED → RESOLVED.
    pub async fn resolve(&self, id: &str, action_taken: &str) -> Result<Ticket, CoreError> {
        let (ticket, patch) = self.tickets.transition_local(id, |t| {
            lifecycle::resolve(t, action_taken, now_millis())
        })?;

        tracing::info!(ticket_id = %id, "Ticket resolved");
        self.coordinator.scheduler().play_cue(Cue::Resolve);

        self.tickets.sync_update(id, &patch).await;
        Ok(ticket)
    }
}
