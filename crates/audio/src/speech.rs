//! Network speech synthesis.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::SpeechError;
use crate::pcm::{AudioClip, SPEECH_SAMPLE_RATE};

/// HTTP request timeout for one synthesis call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` into a playable clip.
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SpeechError>;
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// Prebuilt voice name.
    pub voice: String,
    pub endpoint: String,
}

/// `generateContent` text-to-speech with an audio response modality.
pub struct GeminiSpeech {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiSpeech {
    pub fn new(config: GeminiConfig) -> Result<Self, SpeechError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

/// Request body asking for spoken audio of `text` in `voice`.
pub fn request_body(text: &str, voice: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": text }] }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": voice }
                }
            }
        }
    })
}

/// Pull the inline base64 PCM out of a `generateContent` response.
pub fn extract_audio(response: &Value) -> Result<AudioClip, SpeechError> {
    let data = response
        .pointer("/candidates/0/content/parts/0/inlineData/data")
        .and_then(Value::as_str)
        .filter(|data| !data.is_empty())
        .ok_or(SpeechError::EmptyAudio)?;

    let clip = AudioClip::from_base64_pcm16(data, SPEECH_SAMPLE_RATE)?;
    if clip.is_empty() {
        return Err(SpeechError::EmptyAudio);
    }
    Ok(clip)
}

#[async_trait]
impl SpeechSynthesizer for GeminiSpeech {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SpeechError> {
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request_body(text, &self.config.voice))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SpeechError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let clip = extract_audio(&response.json::<Value>().await?)?;
        tracing::debug!(duration = clip.duration_secs(), "Speech synthesized");
        Ok(clip)
    }
}
