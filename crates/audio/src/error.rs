/// Errors fetching or decoding synthesized speech.
///
/// Any of these makes the scheduler switch to the fallback speaker.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("No speech provider configured")]
    NotConfigured,

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Speech provider error ({status}): {body}")]
    Provider { status: u16, body: String },

    #[error("Speech response carried no audio")]
    EmptyAudio,

    #[error("Invalid base64 audio payload: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The local fallback program could not be started.
    #[error("Fallback speaker failed: {0}")]
    Fallback(#[from] std::io::Error),

    /// The clip could not be placed on the audio clock.
    #[error("Audio clock rejected the clip: {0}")]
    Clock(#[from] ClockError),
}

#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Scheduling was attempted before the clock was resumed.
    #[error("Audio clock is suspended")]
    Suspended,

    #[error("Clip has no playable samples")]
    InvalidClip,

    /// The output device could not be opened or has gone away.
    #[error("Audio output unavailable: {0}")]
    Device(String),
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn clock_failures_keep_their_cause() {
        let err = SpeechError::from(ClockError::InvalidClip);
        assert_matches!(err, SpeechError::Clock(ClockError::InvalidClip));
        assert_eq!(
            err.to_string(),
            "Audio clock rejected the clip: Clip has no playable samples"
        );
    }
}
