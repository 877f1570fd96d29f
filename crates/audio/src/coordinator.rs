//! Chooses which ticket is announced next on this station.
//!
//! At most one announcement (chime plus speech) is in flight. The in-flight
//! flag is claimed with `compare_exchange` and the ticket is marked as
//! announced before anything is awaited, so concurrent reconciliation passes
//! can neither pick the same ticket twice nor overlap two announcements. The
//! flag stays claimed until the speech clip has finished playing.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use andon_core::announcement::Announcement;
use andon_core::ticket::{Ticket, TicketStatus};
use andon_core::types::TicketId;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::scheduler::{AudioScheduler, PlaybackOutcome};
use crate::tone::Cue;

/// Why a manual re-announce was refused. Refusals are never queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RepeatRejected {
    #[error("Audio has not been enabled on this station")]
    AudioLocked,

    #[error("Only pending tickets can be announced")]
    NotPending,

    #[error("Another announcement is in progress")]
    Busy,
}

pub struct AnnouncementCoordinator {
    scheduler: Arc<AudioScheduler>,
    announced: Mutex<HashSet<TicketId>>,
    /// Pending ids seen on the previous pass, for the arrival cue.
    seen_pending: Mutex<HashSet<TicketId>>,
    enabled: AtomicBool,
    in_flight: AtomicBool,
    idle: Notify,
    arrival_beep: bool,
}

/// Releases the in-flight flag and wakes the announcer when dropped.
struct InFlight(Arc<AnnouncementCoordinator>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::SeqCst);
        self.0.idle.notify_one();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AnnouncementCoordinator {
    pub fn new(scheduler: Arc<AudioScheduler>) -> Self {
        Self {
            scheduler,
            announced: Mutex::new(HashSet::new()),
            seen_pending: Mutex::new(HashSet::new()),
            enabled: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            idle: Notify::new(),
            arrival_beep: false,
        }
    }

    /// Also play the three-beep cue whenever new pending tickets appear.
    pub fn with_arrival_beep(mut self, enabled: bool) -> Self {
        self.arrival_beep = enabled;
        self
    }

    pub fn scheduler(&self) -> &Arc<AudioScheduler> {
        &self.scheduler
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_announcing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn has_announced(&self, id: &str) -> bool {
        lock(&self.announced).contains(id)
    }

    /// Wait until the current announcement finishes.
    pub async fn idle(&self) {
        self.idle.notified().await;
    }

    /// Enable announcements on this station.
    ///
    /// The first call unlocks audio and marks every ticket pending right now
    /// as already announced, so enabling does not replay the backlog.
    /// Returns `true` only for that first call.
    pub fn enable(&self, tickets: &[Ticket]) -> bool {
        self.scheduler.unlock();

        let mut announced = lock(&self.announced);
        if self.enabled.load(Ordering::SeqCst) {
            return false;
        }

        let pending: Vec<&Ticket> = tickets.iter().filter(|t| is_pending(t)).collect();
        announced.extend(pending.iter().map(|t| t.id.clone()));
        lock(&self.seen_pending).extend(pending.iter().map(|t| t.id.clone()));
        self.enabled.store(true, Ordering::SeqCst);

        tracing::info!(backlog = pending.len(), "Announcements enabled");
        true
    }

    /// Announce the oldest pending ticket not yet announced here, if nothing
    /// is in flight. Returns the speech task when an announcement started.
    pub fn reconcile(self: &Arc<Self>, tickets: &[Ticket]) -> Option<JoinHandle<PlaybackOutcome>> {
        if !self.is_enabled() {
            return None;
        }
        self.arrival_cue(tickets);

        let (ticket, guard) = {
            let mut announced = lock(&self.announced);
            let next = tickets
                .iter()
                .filter(|t| is_pending(t) && !announced.contains(&t.id))
                .min_by_key(|t| t.created_at)?;

            let guard = self.claim()?;
            announced.insert(next.id.clone());
            (next.clone(), guard)
        };

        tracing::info!(ticket_id = %ticket.id, "Announcing ticket");
        Some(self.start(&ticket, guard))
    }

    /// Re-announce a pending ticket on request.
    pub fn repeat(self: &Arc<Self>, ticket: &Ticket) -> Result<JoinHandle<PlaybackOutcome>, RepeatRejected> {
        if !self.is_enabled() || !self.scheduler.is_unlocked() {
            return Err(RepeatRejected::AudioLocked);
        }
        if !is_pending(ticket) {
            return Err(RepeatRejected::NotPending);
        }
        let guard = self.claim().ok_or(RepeatRejected::Busy)?;
        lock(&self.announced).insert(ticket.id.clone());

        tracing::info!(ticket_id = %ticket.id, "Repeating announcement");
        Ok(self.start(ticket, guard))
    }

    /// Announce a ticket just submitted on this station.
    ///
    /// If another announcement is in flight the ticket is left for the next
    /// reconciliation pass.
    pub fn announce_submitted(self: &Arc<Self>, ticket: &Ticket) -> Option<JoinHandle<PlaybackOutcome>> {
        if !self.is_enabled() || !is_pending(ticket) {
            return None;
        }

        let guard = {
            let mut announced = lock(&self.announced);
            if announced.contains(&ticket.id) {
                return None;
            }
            let guard = self.claim()?;
            announced.insert(ticket.id.clone());
            guard
        };
        lock(&self.seen_pending).insert(ticket.id.clone());

        tracing::info!(ticket_id = %ticket.id, "Announcing submitted ticket");
        Some(self.start(ticket, guard))
    }

    fn claim(self: &Arc<Self>) -> Option<InFlight> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight(Arc::clone(self)))
    }

    /// Chime now, speech in the background. The guard travels with the task
    /// and is released once the clip has played out.
    fn start(&self, ticket: &Ticket, guard: InFlight) -> JoinHandle<PlaybackOutcome> {
        self.scheduler.play_alert_tone();

        let text = Announcement::from(ticket).text();
        let scheduler = Arc::clone(&self.scheduler);
        tokio::spawn(async move {
            let outcome = scheduler.play_speech(&text).await;
            if let PlaybackOutcome::Scheduled { end_at, .. } = outcome {
                scheduler.wait_until(end_at).await;
            }
            drop(guard);
            outcome
        })
    }

    fn arrival_cue(&self, tickets: &[Ticket]) {
        if !self.arrival_beep {
            return;
        }

        let current: HashSet<TicketId> = tickets
            .iter()
            .filter(|t| is_pending(t))
            .map(|t| t.id.clone())
            .collect();

        let arrived = {
            let mut seen = lock(&self.seen_pending);
            let arrived = current.iter().any(|id| !seen.contains(id));
            *seen = current;
            arrived
        };

        if arrived {
            self.scheduler.play_cue(Cue::NewTicket);
        }
    }
}

fn is_pending(ticket: &Ticket) -> bool {
    ticket.status == TicketStatus::Pending
}
