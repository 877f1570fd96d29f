//! Ticket lifecycle rules.
//!
//! States move strictly `PENDING → ACKNOWLEDGED → RESOLVED`. The functions
//! here never mutate a ticket: they validate the request against the current
//! record and return the [`TicketPatch`] to apply, or a [`CoreError`] leaving
//! the ticket untouched.

use crate::error::CoreError;
use crate::ticket::{NewTicket, Ticket, TicketPatch, TicketStatus};
use crate::types::{EpochMillis, TicketId};

/// `true` if `to` is the direct successor of `from`.
pub fn can_transition(from: TicketStatus, to: TicketStatus) -> bool {
    from.next() == Some(to)
}

/// Build a new PENDING ticket from operator input.
///
/// All four classification fields are required and stored trimmed.
pub fn create(input: &NewTicket, id: TicketId, now: EpochMillis) -> Result<Ticket, CoreError> {
    let model = required("model", &input.model)?;
    let station = required("station", &input.station)?;
    let tech_type = required("techType", &input.tech_type)?;
    let ng_id = required("ngId", &input.ng_id)?;

    Ok(Ticket {
        id,
        model,
        ng_id,
        station,
        tech_type,
        status: TicketStatus::Pending,
        created_at: now,
        acknowledged_at: None,
        technician_name: None,
        resolved_at: None,
        action_taken: None,
    })
}

/// PENDING → ACKNOWLEDGED.
///
/// `acknowledgedAt` is clamped to `createdAt` so timestamps stay ordered even
/// if the local clock lags the device that created the ticket.
pub fn acknowledge(
    ticket: &Ticket,
    technician_name: &str,
    now: EpochMillis,
) -> Result<TicketPatch, CoreError> {
    ensure_transition(ticket, TicketStatus::Acknowledged)?;
    let technician_name = required("technicianName", technician_name)?;

    Ok(TicketPatch {
        status: Some(TicketStatus::Acknowledged),
        acknowledged_at: Some(now.max(ticket.created_at)),
        technician_name: Some(technician_name),
        ..Default::default()
    })
}

/// ACKNOWLEDGED → RESOLVED.
pub fn resolve(
    ticket: &Ticket,
    action_taken: &str,
    now: EpochMillis,
) -> Result<TicketPatch, CoreError> {
    ensure_transition(ticket, TicketStatus::Resolved)?;
    let action_taken = required("actionTaken", action_taken)?;
    let floor = ticket.acknowledged_at.unwrap_or(ticket.created_at);

    Ok(TicketPatch {
        status: Some(TicketStatus::Resolved),
        resolved_at: Some(now.max(floor)),
        action_taken: Some(action_taken),
        ..Default::default()
    })
}

fn ensure_transition(ticket: &Ticket, to: TicketStatus) -> Result<(), CoreError> {
    if can_transition(ticket.status, to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            id: ticket.id.clone(),
            from: ticket.status,
            to,
        })
    }
}

fn required(field: &str, value: &str) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
