//! Ordering of tones and speech on the shared audio clock.
//!
//! Feedback cues are scheduled synchronously at the current clock time. The
//! dispatch chime and speech are queued at `max(now, last_scheduled_end)`:
//! speech can never start on top of its chime, however quickly or slowly the
//! provider answers, and a chime never starts on top of earlier speech.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::clock::{AudioClock, TimelineClock};
use crate::fallback::{FallbackSpeaker, Utterance};
use crate::pcm::AudioClip;
use crate::speech::SpeechSynthesizer;
use crate::tone::{Cue, TonePattern};
use crate::SpeechError;

/// Pause between cancelling local speech and starting the fallback.
pub const FALLBACK_DELAY: Duration = Duration::from_secs(1);

type ClockFactory = Box<dyn Fn() -> Arc<dyn AudioClock> + Send + Sync>;

/// What happened to a speech request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlaybackOutcome {
    /// The synthesized clip is on the clock.
    #[serde(rename_all = "camelCase")]
    Scheduled { start_at: f64, end_at: f64 },
    /// Handed to the fallback speaker.
    Fallback,
    /// Audio is still locked; nothing was played or queued.
    Suppressed,
}

/// Snapshot for the audio status endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStatus {
    pub unlocked: bool,
    pub clock_running: bool,
    pub now: f64,
    pub last_scheduled_end: f64,
    pub speech_provider: bool,
}

pub struct AudioScheduler {
    clock: OnceLock<Arc<dyn AudioClock>>,
    make_clock: ClockFactory,
    last_scheduled_end: Mutex<f64>,
    unlocked: AtomicBool,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    fallback: Arc<dyn FallbackSpeaker>,
    fallback_delay: Duration,
}

impl AudioScheduler {
    /// Scheduler on a [`TimelineClock`], created on first use.
    pub fn new(fallback: Arc<dyn FallbackSpeaker>) -> Self {
        Self {
            clock: OnceLock::new(),
            make_clock: Box::new(|| Arc::new(TimelineClock::new())),
            last_scheduled_end: Mutex::new(0.0),
            unlocked: AtomicBool::new(false),
            synthesizer: None,
            fallback,
            fallback_delay: FALLBACK_DELAY,
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Use `clock` instead of a fresh [`TimelineClock`].
    pub fn with_clock(mut self, clock: Arc<dyn AudioClock>) -> Self {
        self.make_clock = Box::new(move || Arc::clone(&clock));
        self
    }

    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    fn clock(&self) -> &Arc<dyn AudioClock> {
        self.clock.get_or_init(|| (self.make_clock)())
    }

    fn last_end(&self) -> f64 {
        *self
            .last_scheduled_end
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn extend_last_end(&self, end: f64) {
        let mut last = self
            .last_scheduled_end
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *last = last.max(end);
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::SeqCst)
    }

    /// Resume the clock after the user gesture.
    ///
    /// The first successful call also plays one silent sample to wake the
    /// output device. Returns `true` only for that first call.
    pub fn unlock(&self) -> bool {
        let clock = self.clock();
        if let Err(e) = clock.resume() {
            tracing::warn!(error = %e, "Audio clock did not resume");
            return false;
        }

        if self.unlocked.swap(true, Ordering::SeqCst) {
            return false;
        }

        if let Err(e) = clock.schedule_playback(&AudioClip::silence(), clock.now()) {
            tracing::warn!(error = %e, "Audio priming failed");
        }
        tracing::info!("Audio unlocked");
        true
    }

    fn schedule_pattern(&self, pattern: &TonePattern, start: f64) -> f64 {
        let clock = self.clock();
        for (offset, tone) in &pattern.tones {
            if let Err(e) = clock.schedule_tone(tone, start + offset) {
                tracing::warn!(error = %e, "Tone not scheduled");
            }
        }
        start + pattern.length
    }

    /// Queue the dispatch chime after everything already scheduled. Returns
    /// its end time, which speech scheduled afterwards will not start
    /// before. `None` while locked.
    pub fn play_alert_tone(&self) -> Option<f64> {
        if !self.is_unlocked() {
            tracing::debug!("Audio locked, chime suppressed");
            return None;
        }

        let mut last = self
            .last_scheduled_end
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let start = self.clock().now().max(*last);
        let end = self.schedule_pattern(&TonePattern::dispatch_chime(), start);
        *last = last.max(end);
        Some(end)
    }

    /// Short feedback cue, played now. Does not delay later speech.
    pub fn play_cue(&self, cue: Cue) -> Option<f64> {
        if !self.is_unlocked() {
            tracing::debug!(?cue, "Audio locked, cue suppressed");
            return None;
        }
        let now = self.clock().now();
        Some(self.schedule_pattern(&cue.pattern(), now))
    }

    /// Sleep until the clock reaches `at`. Returns at once if it already has.
    pub async fn wait_until(&self, at: f64) {
        let remaining = at - self.clock().now();
        if remaining > 0.0 {
            let remaining = Duration::try_from_secs_f64(remaining).unwrap_or_default();
            tokio::time::sleep(remaining).await;
        }
    }

    /// Synthesize `text` and schedule it after everything already queued.
    ///
    /// Falls back to the on-device speaker on any synthesis failure.
    pub async fn play_speech(&self, text: &str) -> PlaybackOutcome {
        if !self.is_unlocked() {
            tracing::debug!("Audio locked, speech suppressed");
            return PlaybackOutcome::Suppressed;
        }

        let result = match &self.synthesizer {
            Some(synthesizer) => synthesizer.synthesize(text).await,
            None => Err(SpeechError::NotConfigured),
        };

        let clip = match result {
            Ok(clip) if !clip.is_empty() => clip,
            Ok(_) => return self.speak_fallback(text, &SpeechError::EmptyAudio).await,
            Err(e) => return self.speak_fallback(text, &e).await,
        };

        let clock = self.clock();
        let start_at = clock.now().max(self.last_end());
        if let Err(e) = clock.schedule_playback(&clip, start_at) {
            return self.speak_fallback(text, &SpeechError::from(e)).await;
        }

        let end_at = start_at + clip.duration_secs();
        self.extend_last_end(end_at);
        tracing::info!(start_at, end_at, "Speech scheduled");
        PlaybackOutcome::Scheduled { start_at, end_at }
    }

    async fn speak_fallback(&self, text: &str, cause: &SpeechError) -> PlaybackOutcome {
        tracing::warn!(error = %cause, "Speech synthesis unavailable, using fallback speaker");

        self.fallback.cancel().await;
        tokio::time::sleep(self.fallback_delay).await;

        if let Err(e) = self.fallback.speak(Utterance::new(text)).await {
            tracing::error!(error = %e, "Fallback speaker failed");
        }
        PlaybackOutcome::Fallback
    }

    pub fn status(&self) -> AudioStatus {
        let clock = self.clock();
        AudioStatus {
            unlocked: self.is_unlocked(),
            clock_running: clock.is_running(),
            now: clock.now(),
            last_scheduled_end: self.last_end(),
            speech_provider: self.synthesizer.is_some(),
        }
    }
}
