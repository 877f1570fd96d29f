//! Writes the remote backend has not acknowledged yet.
//!
//! Each entry names a ticket and the kind of write still owed. The ticket's
//! current local state is what gets sent, so one entry per ticket is enough:
//! a pending insert already carries every later update.

use andon_core::types::TicketId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingWrite {
    Insert,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unsynced {
    pub ticket_id: TicketId,
    pub write: PendingWrite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outbox {
    entries: Vec<Unsynced>,
}

impl Outbox {
    /// Remember that `write` did not reach the remote. Returns `true` if the
    /// outbox changed.
    pub fn record(&mut self, ticket_id: &str, write: PendingWrite) -> bool {
        match self.entries.iter_mut().find(|e| e.ticket_id == ticket_id) {
            Some(entry) if entry.write == PendingWrite::Update && write == PendingWrite::Insert => {
                entry.write = PendingWrite::Insert;
                true
            }
            Some(_) => false,
            None => {
                self.entries.push(Unsynced {
                    ticket_id: ticket_id.to_string(),
                    write,
                });
                true
            }
        }
    }

    /// The row already exists remotely: only an update is still owed.
    pub fn settle_insert(&mut self, ticket_id: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.ticket_id == ticket_id) {
            entry.write = PendingWrite::Update;
        }
    }

    pub fn remove(&mut self, ticket_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.ticket_id != ticket_id);
        self.entries.len() != before
    }

    pub fn entries(&self) -> &[Unsynced] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
