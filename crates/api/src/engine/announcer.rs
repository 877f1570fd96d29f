//! Drives the announcement coordinator from store changes.
//!
//! A reconciliation pass runs on every ticket change and whenever the
//! previous announcement finishes, so a backlog of new tickets is announced
//! one after another, oldest first.

use std::sync::Arc;

use andon_audio::AnnouncementCoordinator;
use andon_events::AndonEvent;
use andon_store::TicketStore;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

pub struct Announcer {
    tickets: Arc<TicketStore>,
    coordinator: Arc<AnnouncementCoordinator>,
}

impl Announcer {
    pub fn new(tickets: Arc<TicketStore>, coordinator: Arc<AnnouncementCoordinator>) -> Self {
        Self {
            tickets,
            coordinator,
        }
    }

    /// Run until `cancel` fires or the event bus closes.
    pub async fn run(self, mut events: broadcast::Receiver<AndonEvent>, cancel: CancellationToken) {
        tracing::info!("Announcer started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Announcer stopping");
                    break;
                }
                event = events.recv() => match event {
                    Ok(event) if event.touches_tickets() => self.pass(),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Announcer lagged");
                        self.pass();
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, announcer shutting down");
                        break;
                    }
                },
                _ = self.coordinator.idle() => self.pass(),
            }
        }
    }

    fn pass(&self) {
        // The speech task runs detached; completion is observed through `idle`.
        if self.coordinator.reconcile(&self.tickets.snapshot()).is_some() {
            tracing::debug!("Announcement started by reconciliation");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use andon_audio::{AudioScheduler, FallbackSpeaker, SpeechError, Utterance};
    use andon_core::lifecycle;
    use andon_core::ticket::NewTicket;
    use andon_events::EventBus;
    use andon_store::LocalStore;
    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    #[async_trait]
    impl FallbackSpeaker for Recorder {
        async fn cancel(&self) {}

        async fn speak(&self, utterance: Utterance) -> Result<(), SpeechError> {
            self.0.lock().unwrap().push(utterance.text);
            Ok(())
        }
    }

    fn ticket(id: &str, station: &str, created_at: i64) -> andon_core::ticket::Ticket {
        let input = NewTicket {
            model: "DUAL MOTOR".into(),
            station: station.into(),
            tech_type: "FCT TECHNICIAN".into(),
            ng_id: "0.01".into(),
        };
        lifecycle::create(&input, id.into(), created_at).unwrap()
    }

    #[tokio::test]
    async fn announces_remote_arrivals_in_creation_order() {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(EventBus::default());
        let tickets = Arc::new(TicketStore::new(
            LocalStore::new(dir.path()),
            None,
            Arc::clone(&bus),
            50,
        ));
        let recorder = Arc::new(Recorder::default());
        let scheduler = AudioScheduler::new(recorder.clone()).with_fallback_delay(Duration::ZERO);
        let coordinator = Arc::new(AnnouncementCoordinator::new(Arc::new(scheduler)));
        coordinator.enable(&[]);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(
            Announcer::new(Arc::clone(&tickets), Arc::clone(&coordinator))
                .run(bus.subscribe(), cancel.clone()),
        );

        tickets.insert_local(ticket("t2", "LE-05", 2_000)).unwrap();
        tickets.insert_local(ticket("t1", "LE-04", 1_000)).unwrap();

        for _ in 0..200 {
            if recorder.0.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let spoken = recorder.0.lock().unwrap().clone();
        assert_eq!(spoken.len(), 2);
        assert!(spoken[0].contains("LE-04"));
        assert!(spoken[1].contains("LE-05"));

        cancel.cancel();
        handle.await.unwrap();
    }
}
