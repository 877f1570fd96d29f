#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use andon_audio::{
    AudioClip, AudioScheduler, FallbackSpeaker, SpeechError, SpeechSynthesizer, TimelineClock,
    Utterance,
};
use andon_core::ticket::{Ticket, TicketStatus};
use async_trait::async_trait;
use tokio::sync::Semaphore;

/// A clip of `secs` seconds of silence at 1 kHz.
pub fn clip(secs: f64) -> AudioClip {
    AudioClip {
        samples: vec![0.0; (secs * 1000.0) as usize],
        sample_rate: 1000,
    }
}

/// Synthesizer that only answers when the test releases a permit.
pub struct GatedSynth {
    gate: Semaphore,
    clip_secs: f64,
    pub texts: Mutex<Vec<String>>,
}

impl GatedSynth {
    pub fn new(clip_secs: f64) -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            clip_secs,
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl SpeechSynthesizer for GatedSynth {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SpeechError> {
        self.texts.lock().unwrap().push(text.to_string());
        self.gate.acquire().await.unwrap().forget();
        Ok(clip(self.clip_secs))
    }
}

/// Synthesizer that answers after a fixed delay.
pub struct DelayedSynth {
    pub delay: Duration,
    pub clip_secs: f64,
}

#[async_trait]
impl SpeechSynthesizer for DelayedSynth {
    async fn synthesize(&self, _text: &str) -> Result<AudioClip, SpeechError> {
        tokio::time::sleep(self.delay).await;
        Ok(clip(self.clip_secs))
    }
}

pub struct FailingSynth;

#[async_trait]
impl SpeechSynthesizer for FailingSynth {
    async fn synthesize(&self, _text: &str) -> Result<AudioClip, SpeechError> {
        Err(SpeechError::Provider {
            status: 503,
            body: "overloaded".into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpeakerCall {
    Cancel,
    Speak(Utterance),
}

#[derive(Default)]
pub struct RecordingSpeaker {
    pub calls: Mutex<Vec<SpeakerCall>>,
}

impl RecordingSpeaker {
    pub fn calls(&self) -> Vec<SpeakerCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FallbackSpeaker for RecordingSpeaker {
    async fn cancel(&self) {
        self.calls.lock().unwrap().push(SpeakerCall::Cancel);
    }

    async fn speak(&self, utterance: Utterance) -> Result<(), SpeechError> {
        self.calls.lock().unwrap().push(SpeakerCall::Speak(utterance));
        Ok(())
    }
}

pub struct Harness {
    pub clock: Arc<TimelineClock>,
    pub speaker: Arc<RecordingSpeaker>,
    pub scheduler: Arc<AudioScheduler>,
}

pub fn harness(synth: Option<Arc<dyn SpeechSynthesizer>>) -> Harness {
    let clock = Arc::new(TimelineClock::new());
    let speaker = Arc::new(RecordingSpeaker::default());
    let mut scheduler = AudioScheduler::new(speaker.clone()).with_clock(clock.clone());
    if let Some(synth) = synth {
        scheduler = scheduler.with_synthesizer(synth);
    }
    Harness {
        clock,
        speaker,
        scheduler: Arc::new(scheduler),
    }
}

pub fn pending(id: &str, created_at: i64) -> Ticket {
    Ticket {
        id: id.into(),
        model: "DUAL MOTOR".into(),
        ng_id: "0.01".into(),
        station: format!("LE-{id}"),
        tech_type: "FCT TECHNICIAN".into(),
        status: TicketStatus::Pending,
        created_at,
        acknowledged_at: None,
        technician_name: None,
        resolved_at: None,
        action_taken: None,
    }
}

pub fn with_synth<S: SpeechSynthesizer + 'static>(synth: Arc<S>) -> Harness {
    harness(Some(synth as Arc<dyn SpeechSynthesizer>))
}
