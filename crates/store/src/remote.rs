//! Remote source of truth for the ticket table.

use andon_core::ticket::{Ticket, TicketPatch};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::RemoteError;

/// Kind of row change reported by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "INSERT" => Some(ChangeKind::Insert),
            "UPDATE" => Some(ChangeKind::Update),
            "DELETE" => Some(ChangeKind::Delete),
            _ => None,
        }
    }
}

/// One change-feed notification. `record` is the raw row; for deletes it
/// holds at least the `id` of the removed row.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteChange {
    pub kind: ChangeKind,
    pub record: Value,
}

/// A remote ticket table with a live change feed.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Up to `limit` rows ordered by `createdAt` descending.
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<Value>, RemoteError>;

    async fn insert(&self, ticket: &Ticket) -> Result<(), RemoteError>;

    /// Partial update of the row with `id`.
    async fn update(&self, id: &str, patch: &TicketPatch) -> Result<(), RemoteError>;

    /// Open one change-feed session.
    ///
    /// The returned channel closes when the session ends (connection lost or
    /// `cancel` fired); the caller decides whether to reconnect.
    async fn subscribe(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<RemoteChange>, RemoteError>;
}
