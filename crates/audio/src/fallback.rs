//! On-device speech used when network synthesis is unavailable.

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::{oneshot, Mutex};

use andon_core::announcement::SPEECH_LANGUAGE;

use crate::error::SpeechError;

/// Text plus voice parameters, in the ranges browsers use for speech.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    /// 1.0 is normal speed.
    pub rate: f32,
    /// 0.0 to 1.0.
    pub volume: f32,
    /// 1.0 is the voice's default pitch.
    pub pitch: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lang: SPEECH_LANGUAGE.to_string(),
            rate: 0.95,
            volume: 1.0,
            pitch: 1.0,
        }
    }
}

#[async_trait]
pub trait FallbackSpeaker: Send + Sync {
    /// Stop whatever is being spoken.
    async fn cancel(&self);

    /// Start speaking. Returns once speech has started, not when it ends.
    async fn speak(&self, utterance: Utterance) -> Result<(), SpeechError>;
}

/// Speaks through a local TTS program with espeak-compatible flags.
pub struct CommandSpeaker {
    program: String,
    current: Mutex<Option<oneshot::Sender<()>>>,
}

/// espeak's default speed in words per minute.
const BASE_WPM: f32 = 175.0;

impl CommandSpeaker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            current: Mutex::new(None),
        }
    }

    /// Command-line arguments for `utterance`.
    pub fn args(utterance: &Utterance) -> Vec<String> {
        let voice = utterance
            .lang
            .split('-')
            .next()
            .unwrap_or(SPEECH_LANGUAGE)
            .to_lowercase();
        let wpm = (BASE_WPM * utterance.rate).round() as u32;
        let amplitude = (utterance.volume.clamp(0.0, 2.0) * 100.0).round() as u32;
        let pitch = (utterance.pitch.clamp(0.0, 2.0) * 50.0).round().min(99.0) as u32;

        vec![
            "-v".into(),
            voice,
            "-s".into(),
            wpm.to_string(),
            "-a".into(),
            amplitude.to_string(),
            "-p".into(),
            pitch.to_string(),
            utterance.text.clone(),
        ]
    }
}

#[async_trait]
impl FallbackSpeaker for CommandSpeaker {
    async fn cancel(&self) {
        if let Some(stop) = self.current.lock().await.take() {
            let _ = stop.send(());
        }
    }

    async fn speak(&self, utterance: Utterance) -> Result<(), SpeechError> {
        self.cancel().await;

        let mut child = Command::new(&self.program)
            .args(Self::args(&utterance))
            .kill_on_drop(true)
            .spawn()?;

        let (stop_tx, stop_rx) = oneshot::channel();
        *self.current.lock().await = Some(stop_tx);

        let program = self.program.clone();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) if status.success() => {}
                    Ok(status) => tracing::warn!(program = %program, %status, "Fallback speaker exited with failure"),
                    Err(e) => tracing::warn!(program = %program, error = %e, "Fallback speaker wait failed"),
                },
                _ = stop_rx => {
                    let _ = child.kill().await;
                    tracing::debug!(program = %program, "Fallback speech cancelled");
                }
            }
        });

        tracing::info!(program = %self.program, lang = %utterance.lang, "Speaking via fallback");
        Ok(())
    }
}
