//! Playback on the default output device.
//!
//! `rodio`'s output stream is not `Send`, so it lives on a dedicated thread
//! that receives rendered buffers over a channel. Each buffer carries its
//! absolute start instant and is mixed in with a leading delay, so sounds
//! scheduled ahead of time start on the clock rather than on arrival.

use std::sync::mpsc;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Source};

use crate::clock::AudioClock;
use crate::error::ClockError;
use crate::pcm::AudioClip;
use crate::tone::{Tone, TONE_SAMPLE_RATE};

struct Render {
    samples: Vec<f32>,
    sample_rate: u32,
    start: Instant,
}

pub struct RodioClock {
    origin: Mutex<Option<Instant>>,
    renders: mpsc::Sender<Render>,
}

impl RodioClock {
    /// Open the default output device. The clock stays suspended until
    /// [`AudioClock::resume`].
    pub fn open() -> Result<Self, ClockError> {
        let (renders, queue) = mpsc::channel::<Render>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

        std::thread::Builder::new()
            .name("andon-audio-out".into())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(output) => {
                        let _ = ready_tx.send(Ok(()));
                        output
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };

                for render in queue {
                    let delay = render.start.saturating_duration_since(Instant::now());
                    let source =
                        SamplesBuffer::new(1, render.sample_rate, render.samples).delay(delay);
                    if let Err(e) = handle.play_raw(source) {
                        tracing::warn!(error = %e, "Audio output rejected a buffer");
                    }
                }
                tracing::debug!("Audio output thread stopped");
            })
            .map_err(|e| ClockError::Device(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::info!("Audio output device opened");
                Ok(Self {
                    origin: Mutex::new(None),
                    renders,
                })
            }
            Ok(Err(reason)) => Err(ClockError::Device(reason)),
            Err(_) => Err(ClockError::Device("output thread exited".into())),
        }
    }

    fn origin(&self) -> Option<Instant> {
        *self.origin.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn submit(&self, samples: Vec<f32>, sample_rate: u32, at: f64) -> Result<(), ClockError> {
        let origin = self.origin().ok_or(ClockError::Suspended)?;
        if sample_rate == 0 || samples.is_empty() {
            return Err(ClockError::InvalidClip);
        }

        let offset = Duration::try_from_secs_f64(at.max(0.0)).unwrap_or_default();
        self.renders
            .send(Render {
                samples,
                sample_rate,
                start: origin + offset,
            })
            .map_err(|_| ClockError::Device("output thread exited".into()))
    }
}

impl AudioClock for RodioClock {
    fn now(&self) -> f64 {
        self.origin()
            .map(|origin| origin.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn resume(&self) -> Result<(), ClockError> {
        let mut origin = self.origin.lock().unwrap_or_else(PoisonError::into_inner);
        if origin.is_none() {
            *origin = Some(Instant::now());
            tracing::debug!("Audio clock started");
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.origin().is_some()
    }

    fn schedule_tone(&self, tone: &Tone, at: f64) -> Result<(), ClockError> {
        tracing::debug!(at, frequency_hz = tone.frequency_hz, "Tone scheduled");
        self.submit(tone.render(TONE_SAMPLE_RATE), TONE_SAMPLE_RATE, at)
    }

    fn schedule_playback(&self, clip: &AudioClip, at: f64) -> Result<(), ClockError> {
        tracing::debug!(at, duration = clip.duration_secs(), "Playback scheduled");
        self.submit(clip.samples.clone(), clip.sample_rate, at)
    }
}
