//! Decoded audio buffers.

use base64::Engine;

use crate::error::SpeechError;

/// Sample rate of the speech provider's PCM output.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// Mono audio normalized to `[-1.0, 1.0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioClip {
    /// Decode 16-bit little-endian mono PCM. A trailing odd byte is dropped.
    pub fn from_pcm16_le(bytes: &[u8], sample_rate: u32) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn from_base64_pcm16(data: &str, sample_rate: u32) -> Result<Self, SpeechError> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(data.trim())?;
        Ok(Self::from_pcm16_le(&bytes, sample_rate))
    }

    /// One silent sample, used to prime the output device.
    pub fn silence() -> Self {
        Self {
            samples: vec![0.0],
            sample_rate: 22_050,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
