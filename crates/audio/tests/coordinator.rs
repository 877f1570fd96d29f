mod common;

use std::sync::Arc;
use std::time::Duration;

use andon_audio::clock::{AudioClock, Scheduled};
use andon_audio::tone::DISPATCH_CHIME_LENGTH;
use andon_audio::{AnnouncementCoordinator, PlaybackOutcome, RepeatRejected};
use andon_core::ticket::TicketStatus;
use assert_matches::assert_matches;

use common::{harness, pending, with_synth, DelayedSynth, GatedSynth, Harness};

fn coordinator(h: &Harness) -> Arc<AnnouncementCoordinator> {
    Arc::new(AnnouncementCoordinator::new(h.scheduler.clone()))
}

#[tokio::test(start_paused = true)]
async fn announces_oldest_first_one_at_a_time() {
    let synth = GatedSynth::new(2.0);
    let h = with_synth(synth.clone());
    let coordinator = coordinator(&h);
    coordinator.enable(&[]);

    let tickets = vec![pending("t3", 3_000), pending("t1", 1_000), pending("t2", 2_000)];

    let first = coordinator.reconcile(&tickets).expect("t1 announced");
    assert!(coordinator.has_announced("t1"));
    assert!(coordinator.is_announcing());

    // Still speaking t1: nothing else starts.
    assert!(coordinator.reconcile(&tickets).is_none());
    assert!(!coordinator.has_announced("t2"));

    synth.release();
    assert_matches!(first.await.unwrap(), PlaybackOutcome::Scheduled { .. });
    assert!(!coordinator.is_announcing());

    let second = coordinator.reconcile(&tickets).expect("t2 announced");
    assert!(coordinator.has_announced("t2"));
    assert!(!coordinator.has_announced("t3"));
    synth.release();
    second.await.unwrap();

    let texts = synth.texts.lock().unwrap().clone();
    assert_eq!(texts.len(), 2);
    assert!(texts[0].contains("LE-t1"));
    assert!(texts[1].contains("LE-t2"));
}

#[tokio::test(start_paused = true)]
async fn chime_precedes_speech_on_the_clock() {
    let synth = GatedSynth::new(2.0);
    let h = with_synth(synth.clone());
    let coordinator = coordinator(&h);
    coordinator.enable(&[]);

    let task = coordinator.reconcile(&[pending("t1", 1)]).unwrap();
    synth.release();
    task.await.unwrap();

    let entries = h.clock.entries();
    let chime_end = entries
        .iter()
        .filter(|e| matches!(e, Scheduled::Tone { .. }))
        .map(Scheduled::end)
        .fold(0.0, f64::max);
    let speech = entries
        .iter()
        .filter(|e| matches!(e, Scheduled::Playback { samples, .. } if *samples > 1))
        .collect::<Vec<_>>();
    assert_eq!(speech.len(), 1);
    assert!(speech[0].at() >= chime_end - 1e-9);
}

#[tokio::test(start_paused = true)]
async fn next_announcement_waits_for_previous_speech() {
    let h = with_synth(Arc::new(DelayedSynth {
        delay: Duration::from_millis(500),
        clip_secs: 10.0,
    }));
    let coordinator = coordinator(&h);
    coordinator.enable(&[]);
    let tickets = vec![pending("t1", 1), pending("t2", 2)];

    let first = coordinator.reconcile(&tickets).unwrap();
    let speech_end = match first.await.unwrap() {
        PlaybackOutcome::Scheduled { start_at, end_at } => {
            assert!((start_at - DISPATCH_CHIME_LENGTH).abs() < 1e-6);
            end_at
        }
        other => panic!("unexpected outcome {other:?}"),
    };
    assert!(h.clock.now() >= speech_end - 1e-9);

    let second = coordinator.reconcile(&tickets).expect("t2 announced");
    second.await.unwrap();

    let chimes: Vec<f64> = h
        .clock
        .entries()
        .iter()
        .filter(|e| matches!(e, Scheduled::Tone { .. }))
        .map(Scheduled::at)
        .collect();
    assert_eq!(chimes.len(), 8);
    assert!(chimes[4..].iter().all(|at| *at >= speech_end - 1e-9));
}

#[tokio::test(start_paused = true)]
async fn stays_busy_until_speech_has_played() {
    let h = with_synth(Arc::new(DelayedSynth {
        delay: Duration::ZERO,
        clip_secs: 5.0,
    }));
    let coordinator = coordinator(&h);
    coordinator.enable(&[]);
    let t1 = pending("t1", 1);

    let task = coordinator.reconcile(std::slice::from_ref(&t1)).unwrap();
    // Clip is on the clock at 1.8 but has not finished.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(coordinator.is_announcing());
    assert_eq!(coordinator.repeat(&t1).unwrap_err(), RepeatRejected::Busy);

    task.await.unwrap();
    assert!(!coordinator.is_announcing());
}

#[tokio::test(start_paused = true)]
async fn enabling_skips_the_existing_backlog() {
    let h = harness(None);
    let coordinator = coordinator(&h);
    let backlog = vec![pending("old", 1)];

    assert!(coordinator.enable(&backlog));
    assert!(!coordinator.enable(&backlog));
    assert!(coordinator.reconcile(&backlog).is_none());

    let mut tickets = backlog.clone();
    tickets.push(pending("new", 2));
    let task = coordinator.reconcile(&tickets).expect("new ticket announced");
    assert_eq!(task.await.unwrap(), PlaybackOutcome::Fallback);
}

#[tokio::test(start_paused = true)]
async fn nothing_is_announced_before_enable() {
    let h = harness(None);
    let coordinator = coordinator(&h);

    assert!(coordinator.reconcile(&[pending("t1", 1)]).is_none());
    assert!(coordinator.announce_submitted(&pending("t1", 1)).is_none());
    assert_eq!(
        coordinator.repeat(&pending("t1", 1)).unwrap_err(),
        RepeatRejected::AudioLocked
    );
    assert!(!coordinator.has_announced("t1"));
}

#[tokio::test(start_paused = true)]
async fn non_pending_tickets_are_never_announced() {
    let h = harness(None);
    let coordinator = coordinator(&h);
    coordinator.enable(&[]);

    let mut ticket = pending("t1", 1);
    ticket.status = TicketStatus::Acknowledged;

    assert!(coordinator.reconcile(std::slice::from_ref(&ticket)).is_none());
    assert_eq!(coordinator.repeat(&ticket).unwrap_err(), RepeatRejected::NotPending);
}

#[tokio::test(start_paused = true)]
async fn repeat_is_rejected_while_busy() {
    let synth = GatedSynth::new(1.0);
    let h = with_synth(synth.clone());
    let coordinator = coordinator(&h);
    coordinator.enable(&[]);

    let t1 = pending("t1", 1);
    let task = coordinator.reconcile(std::slice::from_ref(&t1)).unwrap();
    assert_eq!(coordinator.repeat(&t1).unwrap_err(), RepeatRejected::Busy);

    synth.release();
    task.await.unwrap();

    let again = coordinator.repeat(&t1).expect("idle again");
    synth.release();
    assert_matches!(again.await.unwrap(), PlaybackOutcome::Scheduled { .. });
}

#[tokio::test(start_paused = true)]
async fn submitted_ticket_is_announced_once() {
    let h = harness(None);
    let coordinator = coordinator(&h);
    coordinator.enable(&[]);

    let ticket = pending("t1", 1);
    let task = coordinator.announce_submitted(&ticket).expect("announced");
    task.await.unwrap();

    assert!(coordinator.announce_submitted(&ticket).is_none());
    assert!(coordinator.reconcile(std::slice::from_ref(&ticket)).is_none());
}

#[tokio::test(start_paused = true)]
async fn arrival_beep_plays_for_new_pending_tickets() {
    let synth = GatedSynth::new(1.0);
    let h = with_synth(synth.clone());
    let coordinator = Arc::new(
        AnnouncementCoordinator::new(h.scheduler.clone()).with_arrival_beep(true),
    );
    coordinator.enable(&[]);

    let task = coordinator.reconcile(&[pending("t1", 1)]).unwrap();
    let beeps = |entries: &[Scheduled]| {
        entries
            .iter()
            .filter(|e| matches!(e, Scheduled::Tone { tone, .. } if tone.frequency_hz == 987.77))
            .count()
    };
    assert_eq!(beeps(&h.clock.entries()), 3);

    // Same pending set: no second beep.
    coordinator.reconcile(&[pending("t1", 1)]);
    assert_eq!(beeps(&h.clock.entries()), 3);

    synth.release();
    task.await.unwrap();
}
