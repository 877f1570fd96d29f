//! Ticket record, lifecycle status and partial patches.
//!
//! Field names serialize in camelCase to match the shared `tickets` table
//! that every view (and the remote backend) reads.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{EpochMillis, TicketId};

// ---------------------------------------------------------------------------
// TicketStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a ticket.
///
/// Variants are declared in lifecycle order so `Ord` can be used to detect
/// regressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Pending,
    Acknowledged,
    Resolved,
}

impl TicketStatus {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "PENDING",
            TicketStatus::Acknowledged => "ACKNOWLEDGED",
            TicketStatus::Resolved => "RESOLVED",
        }
    }

    /// Parse the wire representation. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(TicketStatus::Pending),
            "ACKNOWLEDGED" => Some(TicketStatus::Acknowledged),
            "RESOLVED" => Some(TicketStatus::Resolved),
            _ => None,
        }
    }

    /// The only status this one may move to, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            TicketStatus::Pending => Some(TicketStatus::Acknowledged),
            TicketStatus::Acknowledged => Some(TicketStatus::Resolved),
            TicketStatus::Resolved => None,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

/// One reported equipment fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    pub model: String,
    pub ng_id: String,
    pub station: String,
    pub tech_type: String,
    pub status: TicketStatus,
    pub created_at: EpochMillis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<EpochMillis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<EpochMillis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_taken: Option<String>,
}

impl Ticket {
    /// `true` until the ticket is resolved.
    pub fn is_open(&self) -> bool {
        self.status != TicketStatus::Resolved
    }

    /// Apply a partial update.
    ///
    /// The status only moves forward. The acknowledge and resolve fields are
    /// set once: a patch fills them while empty and never replaces a value
    /// already present, so the first acknowledgement wins. Fields the patch
    /// does not carry are never cleared.
    ///
    /// Returns `true` if anything changed.
    pub fn apply(&mut self, patch: &TicketPatch) -> bool {
        let before = self.clone();

        if let Some(status) = patch.status {
            self.status = self.status.max(status);
        }
        fill(&mut self.acknowledged_at, &patch.acknowledged_at);
        fill(&mut self.technician_name, &patch.technician_name);
        fill(&mut self.resolved_at, &patch.resolved_at);
        fill(&mut self.action_taken, &patch.action_taken);

        *self != before
    }
}

fn fill<T: Clone>(slot: &mut Option<T>, incoming: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(incoming);
    }
}

// ---------------------------------------------------------------------------
// TicketPatch
// ---------------------------------------------------------------------------

/// Partial update of a ticket's mutable fields.
///
/// Serializes only the fields it carries, which is also the body sent to the
/// remote backend's partial-update endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<EpochMillis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<EpochMillis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_taken: Option<String>,
}

impl TicketPatch {
    pub fn is_empty(&self) -> bool {
        *self == TicketPatch::default()
    }
}

/// Every mutable field of the ticket, as sent when resynchronizing a row.
impl From<&Ticket> for TicketPatch {
    fn from(ticket: &Ticket) -> Self {
        Self {
            status: Some(ticket.status),
            acknowledged_at: ticket.acknowledged_at,
            technician_name: ticket.technician_name.clone(),
            resolved_at: ticket.resolved_at,
            action_taken: ticket.action_taken.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// NewTicket
// ---------------------------------------------------------------------------

/// Operator input for a new ticket. Validated by
/// [`lifecycle::create`](crate::lifecycle::create).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub station: String,
    #[serde(default)]
    pub tech_type: String,
    #[serde(default)]
    pub ng_id: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
