//! Audio output for the andon station.
//!
//! The [`AudioScheduler`] owns a lazily created [`AudioClock`] and orders
//! every sound on it: synthesized tones play immediately, while speech clips
//! fetched from the network are scheduled no earlier than the end of the
//! last dispatch chime. The [`AnnouncementCoordinator`] decides which ticket
//! is announced next and guarantees one announcement at a time.
//!
//! With the `playback` feature, [`RodioClock`] plays everything on the
//! default output device; [`TimelineClock`] only records the schedule.

pub mod clock;
pub mod coordinator;
pub mod error;
pub mod fallback;
#[cfg(feature = "playback")]
pub mod output;
pub mod pcm;
pub mod scheduler;
pub mod speech;
pub mod tone;

pub use clock::{AudioClock, TimelineClock};
pub use coordinator::{AnnouncementCoordinator, RepeatRejected};
pub use error::{ClockError, SpeechError};
pub use fallback::{CommandSpeaker, FallbackSpeaker, Utterance};
#[cfg(feature = "playback")]
pub use output::RodioClock;
pub use pcm::AudioClip;
pub use scheduler::{AudioScheduler, AudioStatus, PlaybackOutcome};
pub use speech::{GeminiConfig, GeminiSpeech, SpeechSynthesizer};
pub use tone::{Cue, Tone, TonePattern, Waveform};
