mod common;

use std::sync::Arc;
use std::time::Duration;

use andon_audio::clock::Scheduled;
use andon_audio::tone::DISPATCH_CHIME_LENGTH;
use andon_audio::{AudioClip, AudioClock, AudioScheduler, ClockError, Cue, PlaybackOutcome, Tone};
use assert_matches::assert_matches;

use common::{harness, with_synth, DelayedSynth, FailingSynth, RecordingSpeaker, SpeakerCall};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[tokio::test(start_paused = true)]
async fn locked_audio_suppresses_everything() {
    let h = harness(None);

    assert_eq!(h.scheduler.play_alert_tone(), None);
    assert_eq!(h.scheduler.play_cue(Cue::Resolve), None);
    assert_eq!(h.scheduler.play_speech("Perhatian").await, PlaybackOutcome::Suppressed);

    assert!(h.clock.entries().is_empty());
    assert!(h.speaker.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn first_unlock_primes_with_silence() {
    let h = harness(None);

    assert!(h.scheduler.unlock());
    assert!(!h.scheduler.unlock());

    let entries = h.clock.entries();
    assert_eq!(entries.len(), 1);
    assert_matches!(entries[0], Scheduled::Playback { samples: 1, .. });
    assert!(h.scheduler.status().clock_running);
}

#[tokio::test(start_paused = true)]
async fn speech_ready_early_waits_for_chime() {
    let synth = Arc::new(DelayedSynth {
        delay: Duration::from_millis(1300),
        clip_secs: 2.0,
    });
    let h = with_synth(synth);
    h.scheduler.unlock();

    let chime_end = h.scheduler.play_alert_tone().unwrap();
    assert!(close(chime_end, DISPATCH_CHIME_LENGTH));

    let outcome = h.scheduler.play_speech("Perhatian").await;
    assert_matches!(outcome, PlaybackOutcome::Scheduled { start_at, end_at } => {
        assert!(close(start_at, chime_end));
        assert!(close(end_at, chime_end + 2.0));
    });
    assert!(close(h.scheduler.status().last_scheduled_end, chime_end + 2.0));
}

#[tokio::test(start_paused = true)]
async fn speech_ready_late_starts_immediately() {
    let synth = Arc::new(DelayedSynth {
        delay: Duration::from_secs(3),
        clip_secs: 1.0,
    });
    let h = with_synth(synth);
    h.scheduler.unlock();
    h.scheduler.play_alert_tone();

    let outcome = h.scheduler.play_speech("Perhatian").await;
    assert_matches!(outcome, PlaybackOutcome::Scheduled { start_at, .. } => {
        assert!(close(start_at, 3.0));
        assert!(close(start_at, h.clock.now()));
    });
}

#[tokio::test(start_paused = true)]
async fn chime_queues_behind_scheduled_speech() {
    let synth = Arc::new(DelayedSynth {
        delay: Duration::ZERO,
        clip_secs: 10.0,
    });
    let h = with_synth(synth);
    h.scheduler.unlock();

    h.scheduler.play_alert_tone();
    let speech_end = match h.scheduler.play_speech("Perhatian").await {
        PlaybackOutcome::Scheduled { end_at, .. } => end_at,
        other => panic!("unexpected outcome {other:?}"),
    };
    assert!(close(speech_end, DISPATCH_CHIME_LENGTH + 10.0));

    let second_end = h.scheduler.play_alert_tone().unwrap();
    assert!(close(second_end, speech_end + DISPATCH_CHIME_LENGTH));

    let tones: Vec<f64> = h
        .clock
        .entries()
        .iter()
        .filter(|e| matches!(e, Scheduled::Tone { .. }))
        .map(Scheduled::at)
        .collect();
    assert_eq!(tones.len(), 8);
    assert!(tones[4..].iter().all(|at| *at >= speech_end - 1e-9));
}

#[tokio::test(start_paused = true)]
async fn wait_until_sleeps_to_clock_time() {
    let h = harness(None);
    h.scheduler.unlock();

    h.scheduler.wait_until(2.5).await;
    assert!(close(h.clock.now(), 2.5));

    // Already past: returns at once.
    h.scheduler.wait_until(1.0).await;
    assert!(close(h.clock.now(), 2.5));
}

#[tokio::test(start_paused = true)]
async fn cues_do_not_delay_speech() {
    let synth = Arc::new(DelayedSynth {
        delay: Duration::ZERO,
        clip_secs: 1.0,
    });
    let h = with_synth(synth);
    h.scheduler.unlock();

    h.scheduler.play_cue(Cue::NewTicket);
    let outcome = h.scheduler.play_speech("Perhatian").await;
    assert_matches!(outcome, PlaybackOutcome::Scheduled { start_at, .. } => {
        assert!(close(start_at, 0.0));
    });
}

#[tokio::test(start_paused = true)]
async fn missing_provider_uses_fallback_speaker() {
    let h = harness(None);
    h.scheduler.unlock();

    let before = h.clock.now();
    let outcome = h.scheduler.play_speech("Perhatian").await;
    assert_eq!(outcome, PlaybackOutcome::Fallback);
    assert!(h.clock.now() - before >= 1.0);

    let calls = h.speaker.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], SpeakerCall::Cancel);
    assert_matches!(&calls[1], SpeakerCall::Speak(u) => {
        assert_eq!(u.text, "Perhatian");
        assert_eq!(u.lang, "id-ID");
        assert_eq!(u.rate, 0.95);
        assert_eq!(u.volume, 1.0);
        assert_eq!(u.pitch, 1.0);
    });
}

#[tokio::test(start_paused = true)]
async fn provider_error_uses_fallback_speaker() {
    let h = with_synth(Arc::new(FailingSynth));
    h.scheduler.unlock();

    assert_eq!(h.scheduler.play_speech("Perhatian").await, PlaybackOutcome::Fallback);
    assert!(h
        .speaker
        .calls()
        .iter()
        .any(|c| matches!(c, SpeakerCall::Speak(_))));
    // Only the priming sample reached the clock.
    assert_eq!(h.clock.entries().len(), 1);
}

/// Clock that runs but refuses every clip.
struct RejectingClock;

impl AudioClock for RejectingClock {
    fn now(&self) -> f64 {
        0.0
    }

    fn resume(&self) -> Result<(), ClockError> {
        Ok(())
    }

    fn is_running(&self) -> bool {
        true
    }

    fn schedule_tone(&self, _tone: &Tone, _at: f64) -> Result<(), ClockError> {
        Ok(())
    }

    fn schedule_playback(&self, _clip: &AudioClip, _at: f64) -> Result<(), ClockError> {
        Err(ClockError::Device("unplugged".into()))
    }
}

#[tokio::test(start_paused = true)]
async fn rejected_clip_uses_fallback_speaker() {
    let speaker = Arc::new(RecordingSpeaker::default());
    let scheduler = AudioScheduler::new(speaker.clone())
        .with_clock(Arc::new(RejectingClock))
        .with_synthesizer(Arc::new(DelayedSynth {
            delay: Duration::ZERO,
            clip_secs: 1.0,
        }));
    scheduler.unlock();

    assert_eq!(scheduler.play_speech("Perhatian").await, PlaybackOutcome::Fallback);
    assert_matches!(speaker.calls().last(), Some(SpeakerCall::Speak(u)) if u.text == "Perhatian");
}
