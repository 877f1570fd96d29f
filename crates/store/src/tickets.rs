//! The shared ticket collection.
//!
//! [`TicketStore`] keeps every known ticket in memory behind a
//! `std::sync::RwLock` that is never held across an await point. Local
//! mutations are applied and published on the [`EventBus`] first, then
//! written to the remote backend (if any) and persisted to the local
//! fallback. Remote failures are logged and never reach the caller; the
//! write is kept in the [`Outbox`] and resent once the remote answers again.

use std::sync::{
    Arc, Mutex as StdMutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use andon_core::error::CoreError;
use andon_core::history;
use andon_core::ticket::{Ticket, TicketPatch};
use andon_events::{AndonEvent, EventBus, EventOrigin};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::local::LocalStore;
use crate::outbox::{Outbox, PendingWrite};
use crate::reconnect::{next_delay, ReconnectConfig};
use crate::remote::{ChangeKind, RemoteBackend, RemoteChange};
use crate::wire::{self, RemoteRecord};

/// Local fallback key for the ticket collection.
pub const TICKETS_KEY: &str = "andon-tickets";

/// Local fallback key for writes not yet acknowledged by the remote.
pub const OUTBOX_KEY: &str = "andon-outbox";

/// Smallest accepted history limit for remote loads.
pub const MIN_HISTORY_LIMIT: usize = 50;

pub struct TicketStore {
    tickets: RwLock<Vec<Ticket>>,
    remote: Option<Arc<dyn RemoteBackend>>,
    local: LocalStore,
    bus: Arc<EventBus>,
    history_limit: usize,
    outbox: StdMutex<Outbox>,
    /// Serializes local fallback writes so the newest snapshot lands last.
    persist_lock: Mutex<()>,
    reconnect: ReconnectConfig,
}

impl TicketStore {
    pub fn new(
        local: LocalStore,
        remote: Option<Arc<dyn RemoteBackend>>,
        bus: Arc<EventBus>,
        history_limit: usize,
    ) -> Self {
        Self {
            tickets: RwLock::new(Vec::new()),
            remote,
            local,
            bus,
            history_limit: history_limit.max(MIN_HISTORY_LIMIT),
            outbox: StdMutex::new(Outbox::default()),
            persist_lock: Mutex::new(()),
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Override the change-feed reconnect backoff.
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Ticket>> {
        self.tickets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Ticket>> {
        self.tickets.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn outbox(&self) -> MutexGuard<'_, Outbox> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of writes still owed to the remote backend.
    pub fn unsynced(&self) -> usize {
        self.outbox().len()
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Replace the collection with the most recent tickets.
    ///
    /// Reads the remote backend first and the local fallback if the remote is
    /// absent or failing. Tickets with writes still in the outbox are merged
    /// into the remote rows and resent, so a remote snapshot never drops
    /// them. Never fails: with neither source available the collection is
    /// empty. Returns the number of tickets loaded.
    pub async fn load(&self) -> usize {
        let local = self.load_local().await;
        if self.is_remote() {
            let outbox = self.load_outbox().await;
            *self.outbox() = outbox;
        }

        let (loaded, from_remote) = match self.load_remote().await {
            Some(remote) => (self.merge_unsynced(remote, &local), true),
            None => (local, false),
        };

        let count = loaded.len();
        *self.write() = loaded;
        tracing::info!(count, remote = from_remote, "Ticket collection loaded");

        if from_remote {
            self.flush_outbox().await;
        }
        count
    }

    async fn load_outbox(&self) -> Outbox {
        match self.local.read::<Outbox>(OUTBOX_KEY).await {
            Ok(outbox) => outbox.unwrap_or_default(),
            Err(e) => {
                tracing::error!(error = %e, "Outbox unreadable, starting empty");
                Outbox::default()
            }
        }
    }

    /// Add the local state of every unsynced ticket to the remote rows.
    fn merge_unsynced(&self, mut rows: Vec<Ticket>, local: &[Ticket]) -> Vec<Ticket> {
        let mut outbox = self.outbox();
        let pending: Vec<_> = outbox.entries().to_vec();

        for entry in pending {
            let Some(ticket) = local.iter().find(|t| t.id == entry.ticket_id) else {
                tracing::warn!(ticket_id = %entry.ticket_id, "Unsynced ticket missing locally, dropping");
                outbox.remove(&entry.ticket_id);
                continue;
            };

            match rows.iter_mut().find(|row| row.id == ticket.id) {
                Some(row) => {
                    row.apply(&TicketPatch::from(ticket));
                    outbox.settle_insert(&ticket.id);
                }
                None => rows.push(ticket.clone()),
            }
        }

        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    /// Resend every write in the outbox. Stops at the first failure and
    /// keeps what is left for the next attempt. Returns the number resent.
    pub async fn flush_outbox(&self) -> usize {
        let Some(remote) = &self.remote else {
            return 0;
        };
        let pending: Vec<_> = self.outbox().entries().to_vec();
        if pending.is_empty() {
            return 0;
        }

        let mut resent = 0;
        for entry in pending {
            let Some(ticket) = self.get(&entry.ticket_id) else {
                self.outbox().remove(&entry.ticket_id);
                continue;
            };

            let result = match entry.write {
                PendingWrite::Insert => remote.insert(&ticket).await,
                PendingWrite::Update => remote.update(&ticket.id, &TicketPatch::from(&ticket)).await,
            };
            if let Err(e) = result {
                tracing::warn!(ticket_id = %ticket.id, error = %e, "Outbox resend failed");
                break;
            }
            self.outbox().remove(&ticket.id);
            resent += 1;
        }

        tracing::info!(resent, remaining = self.unsynced(), "Outbox flushed");
        self.persist().await;
        resent
    }

    async fn load_remote(&self) -> Option<Vec<Ticket>> {
        let remote = self.remote.as_ref()?;

        match remote.fetch_recent(self.history_limit).await {
            Ok(rows) => Some(
                rows.iter()
                    .filter_map(|row| match wire::decode_ticket(row) {
                        Ok(ticket) => Some(ticket),
                        Err(e) => {
                            tracing::warn!(error = %e, "Skipping undecodable remote row");
                            None
                        }
                    })
                    .collect(),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "Remote load failed, using local fallback");
                None
            }
        }
    }

    async fn load_local(&self) -> Vec<Ticket> {
        match self.local.read::<Vec<Ticket>>(TICKETS_KEY).await {
            Ok(Some(mut tickets)) => {
                tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                tickets
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::error!(error = %e, "Local fallback unreadable, starting empty");
                Vec::new()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Local mutations
    // -----------------------------------------------------------------------

    /// Prepend `ticket` and publish it. Synchronous: the ticket is visible to
    /// readers and subscribers when this returns.
    pub fn insert_local(&self, ticket: Ticket) -> Result<Ticket, CoreError> {
        {
            let mut tickets = self.write();
            if tickets.iter().any(|t| t.id == ticket.id) {
                return Err(CoreError::Conflict(format!(
                    "ticket {} already exists",
                    ticket.id
                )));
            }
            tickets.insert(0, ticket.clone());
        }

        self.bus
            .publish(AndonEvent::ticket_inserted(ticket.clone(), EventOrigin::Local));
        Ok(ticket)
    }

    /// Write an inserted ticket to the remote backend and the local fallback.
    pub async fn sync_insert(&self, ticket: &Ticket) {
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.insert(ticket).await {
                tracing::warn!(ticket_id = %ticket.id, error = %e, "Remote insert failed, kept in outbox");
                self.outbox().record(&ticket.id, PendingWrite::Insert);
            }
        }
        self.persist().await;
    }

    pub async fn insert(&self, ticket: Ticket) -> Result<Ticket, CoreError> {
        let ticket = self.insert_local(ticket)?;
        self.sync_insert(&ticket).await;
        Ok(ticket)
    }

    /// Atomic check-and-apply on one ticket.
    ///
    /// `f` sees the current record under the write lock and returns the patch
    /// to apply. On error nothing is mutated or published.
    pub fn transition_local<F>(&self, id: &str, f: F) -> Result<(Ticket, TicketPatch), CoreError>
    where
        F: FnOnce(&Ticket) -> Result<TicketPatch, CoreError>,
    {
        let updated = {
            let mut tickets = self.write();
            let ticket = tickets
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| CoreError::NotFound {
                    entity: "ticket",
                    id: id.to_string(),
                })?;

            let patch = f(ticket)?;
            ticket.apply(&patch);
            (ticket.clone(), patch)
        };

        self.bus
            .publish(AndonEvent::ticket_updated(updated.0.clone(), EventOrigin::Local));
        Ok(updated)
    }

    /// Write a patch to the remote backend and the local fallback.
    pub async fn sync_update(&self, id: &str, patch: &TicketPatch) {
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.update(id, patch).await {
                tracing::warn!(ticket_id = %id, error = %e, "Remote update failed, kept in outbox");
                self.outbox().record(id, PendingWrite::Update);
            }
        }
        self.persist().await;
    }

    pub async fn transition<F>(&self, id: &str, f: F) -> Result<Ticket, CoreError>
    where
        F: FnOnce(&Ticket) -> Result<TicketPatch, CoreError>,
    {
        let (ticket, patch) = self.transition_local(id, f)?;
        self.sync_update(id, &patch).await;
        Ok(ticket)
    }

    /// Apply `patch` unconditionally (subject to [`Ticket::apply`]'s rules).
    pub async fn update(&self, id: &str, patch: TicketPatch) -> Result<Ticket, CoreError> {
        self.transition(id, move |_| Ok(patch)).await
    }

    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.snapshot();
        if let Err(e) = self.local.write(TICKETS_KEY, &snapshot).await {
            tracing::error!(error = %e, "Failed to persist tickets to local fallback");
        }

        if self.is_remote() {
            let outbox = self.outbox().clone();
            if let Err(e) = self.local.write(OUTBOX_KEY, &outbox).await {
                tracing::error!(error = %e, "Failed to persist outbox");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Remote reconciliation
    // -----------------------------------------------------------------------

    /// Merge one change-feed notification. Returns `true` if the collection
    /// changed.
    pub async fn apply_remote(&self, change: RemoteChange) -> bool {
        let event = match self.merge_remote(&change) {
            Ok(Some(event)) => event,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(kind = ?change.kind, error = %e, "Ignoring remote change");
                return false;
            }
        };

        self.bus.publish(event);
        self.persist().await;
        true
    }

    fn merge_remote(&self, change: &RemoteChange) -> Result<Option<AndonEvent>, crate::RemoteError> {
        let origin = EventOrigin::Remote;

        match change.kind {
            ChangeKind::Insert => {
                let ticket = wire::decode_ticket(&change.record)?;
                let mut tickets = self.write();
                if tickets.iter().any(|t| t.id == ticket.id) {
                    tracing::trace!(ticket_id = %ticket.id, "Remote insert already present");
                    return Ok(None);
                }
                tickets.insert(0, ticket.clone());
                Ok(Some(AndonEvent::ticket_inserted(ticket, origin)))
            }
            ChangeKind::Update => {
                let record = RemoteRecord::decode(&change.record)?;
                let mut tickets = self.write();
                let Some(ticket) = tickets.iter_mut().find(|t| t.id == record.id) else {
                    tracing::debug!(ticket_id = %record.id, "Remote update for unknown ticket");
                    return Ok(None);
                };
                if !ticket.apply(&record.patch()) {
                    return Ok(None);
                }
                Ok(Some(AndonEvent::ticket_updated(ticket.clone(), origin)))
            }
            ChangeKind::Delete => {
                let record = RemoteRecord::decode(&change.record)?;
                let mut tickets = self.write();
                let before = tickets.len();
                tickets.retain(|t| t.id != record.id);
                if tickets.len() == before {
                    return Ok(None);
                }
                Ok(Some(AndonEvent::ticket_removed(record.id, origin)))
            }
        }
    }

    /// Forward the remote change feed into the collection until `cancel`
    /// fires, reconnecting with exponential backoff.
    ///
    /// Returns `None` in local-only mode.
    pub fn subscribe(self: &Arc<Self>, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        let remote = Arc::clone(self.remote.as_ref()?);
        let store = Arc::clone(self);

        Some(tokio::spawn(async move {
            let mut delay = store.reconnect.initial_delay;

            loop {
                let session = tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = remote.subscribe(cancel.child_token()) => result,
                };

                match session {
                    Ok(mut rx) => {
                        delay = store.reconnect.initial_delay;
                        store.flush_outbox().await;
                        loop {
                            tokio::select! {
                                _ = cancel.cancelled() => return,
                                change = rx.recv() => match change {
                                    Some(change) => {
                                        store.apply_remote(change).await;
                                    }
                                    None => break,
                                },
                            }
                        }
                        tracing::warn!("Remote change feed ended, reconnecting");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, delay_ms = delay.as_millis() as u64, "Change feed connection failed");
                    }
                }

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                delay = next_delay(delay, &store.reconnect);
            }

            tracing::info!("Remote change feed stopped");
        }))
    }

    // -----------------------------------------------------------------------
    // Read projections
    // -----------------------------------------------------------------------

    /// Receiver for every subsequent change, local or remote.
    pub fn watch(&self) -> broadcast::Receiver<AndonEvent> {
        self.bus.subscribe()
    }

    /// The collection in storage order (not sorted by `createdAt`).
    pub fn snapshot(&self) -> Vec<Ticket> {
        self.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<Ticket> {
        self.read().iter().find(|t| t.id == id).cloned()
    }

    pub fn history(&self, query: Option<&str>) -> Vec<Ticket> {
        history::history(&self.read(), query)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
