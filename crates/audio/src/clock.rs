//! The audio clock capability.
//!
//! Everything audible is scheduled at an absolute time on one clock, in
//! seconds. The clock starts suspended and only advances after
//! [`AudioClock::resume`], which the station operator triggers once.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use tokio::time::Instant;

use crate::error::ClockError;
use crate::pcm::AudioClip;
use crate::tone::Tone;

pub trait AudioClock: Send + Sync {
    /// Current clock time in seconds. Stays at `0.0` while suspended.
    fn now(&self) -> f64;

    /// Start (or keep) the clock running.
    fn resume(&self) -> Result<(), ClockError>;

    fn is_running(&self) -> bool;

    fn schedule_tone(&self, tone: &Tone, at: f64) -> Result<(), ClockError>;

    fn schedule_playback(&self, clip: &AudioClip, at: f64) -> Result<(), ClockError>;
}

/// An entry on the [`TimelineClock`] schedule.
#[derive(Debug, Clone, PartialEq)]
pub enum Scheduled {
    Tone { tone: Tone, at: f64 },
    Playback { samples: usize, duration: f64, at: f64 },
}

impl Scheduled {
    pub fn at(&self) -> f64 {
        match self {
            Scheduled::Tone { at, .. } | Scheduled::Playback { at, .. } => *at,
        }
    }

    pub fn end(&self) -> f64 {
        match self {
            Scheduled::Tone { tone, at } => at + tone.duration,
            Scheduled::Playback { duration, at, .. } => at + duration,
        }
    }
}

/// Most recent entries kept by a [`TimelineClock`].
pub const TIMELINE_CAPACITY: usize = 256;

#[derive(Default)]
struct Timeline {
    origin: Option<Instant>,
    entries: VecDeque<Scheduled>,
}

/// Monotonic clock on `tokio::time::Instant` that records its schedule.
///
/// Nothing is played: each scheduled entry is logged with its start time
/// and the last [`TIMELINE_CAPACITY`] entries are kept for inspection. Used
/// on hosts without an output device and in tests.
#[derive(Default)]
pub struct TimelineClock {
    timeline: Mutex<Timeline>,
}

impl TimelineClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recent entries, in scheduling order.
    pub fn entries(&self) -> Vec<Scheduled> {
        self.lock().entries.iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Timeline> {
        self.timeline.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, entry: Scheduled) -> Result<(), ClockError> {
        let mut timeline = self.lock();
        if timeline.origin.is_none() {
            return Err(ClockError::Suspended);
        }
        if timeline.entries.len() == TIMELINE_CAPACITY {
            timeline.entries.pop_front();
        }
        timeline.entries.push_back(entry);
        Ok(())
    }
}

impl AudioClock for TimelineClock {
    fn now(&self) -> f64 {
        self.lock()
            .origin
            .map(|origin| origin.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn resume(&self) -> Result<(), ClockError> {
        let mut timeline = self.lock();
        if timeline.origin.is_none() {
            timeline.origin = Some(Instant::now());
            tracing::debug!("Audio clock started");
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.lock().origin.is_some()
    }

    fn schedule_tone(&self, tone: &Tone, at: f64) -> Result<(), ClockError> {
        tracing::debug!(
            at,
            frequency_hz = tone.frequency_hz,
            duration = tone.duration,
            "Tone scheduled"
        );
        self.push(Scheduled::Tone {
            tone: tone.clone(),
            at,
        })
    }

    fn schedule_playback(&self, clip: &AudioClip, at: f64) -> Result<(), ClockError> {
        let duration = clip.duration_secs();
        tracing::debug!(at, duration, samples = clip.samples.len(), "Playback scheduled");
        self.push(Scheduled::Playback {
            samples: clip.samples.len(),
            duration,
            at,
        })
    }
}
