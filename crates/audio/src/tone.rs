//! Synthesized tone cues.
//!
//! Times are seconds on the audio clock; gains are linear (0..1).

use std::f64::consts::TAU;

use serde::Serialize;

/// Sample rate tones are rendered at.
pub const TONE_SAMPLE_RATE: u32 = 44_100;

/// Gain an exponential decay ends at. Exponential ramps cannot reach zero.
const DECAY_FLOOR: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
}

/// One oscillator note with a short attack and an exponential decay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tone {
    pub waveform: Waveform,
    pub frequency_hz: f64,
    /// Exponential frequency sweep target, reached at the end of the note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep_to_hz: Option<f64>,
    pub duration: f64,
    pub gain: f64,
    /// Linear ramp from silence to `gain`. Zero starts at full gain.
    pub attack: f64,
}

impl Tone {
    fn sine(frequency_hz: f64, duration: f64, gain: f64) -> Self {
        Self {
            waveform: Waveform::Sine,
            frequency_hz,
            sweep_to_hz: None,
            duration,
            gain,
            attack: 0.0,
        }
    }

    /// Gain at `t` seconds into the note: linear attack, then exponential
    /// decay to [`DECAY_FLOOR`] at the end of the note.
    pub fn envelope(&self, t: f64) -> f64 {
        if self.gain <= 0.0 || t >= self.duration {
            return 0.0;
        }
        if t < self.attack {
            return self.gain * t / self.attack;
        }
        let decay = (self.duration - self.attack).max(f64::EPSILON);
        let progress = (t - self.attack) / decay;
        self.gain * (DECAY_FLOOR / self.gain).powf(progress)
    }

    /// Frequency at `t`, following the exponential sweep if there is one.
    pub fn frequency_at(&self, t: f64) -> f64 {
        match self.sweep_to_hz {
            Some(target) if self.duration > 0.0 && self.frequency_hz > 0.0 => {
                self.frequency_hz * (target / self.frequency_hz).powf(t / self.duration)
            }
            _ => self.frequency_hz,
        }
    }

    /// Mono samples of the whole note.
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let rate = f64::from(sample_rate);
        let count = (self.duration.max(0.0) * rate).round() as usize;
        let mut phase = 0.0_f64;

        (0..count)
            .map(|i| {
                let t = i as f64 / rate;
                let wave = match self.waveform {
                    Waveform::Sine => phase.sin(),
                    Waveform::Square if phase.sin() >= 0.0 => 1.0,
                    Waveform::Square => -1.0,
                };
                phase = (phase + TAU * self.frequency_at(t) / rate) % TAU;
                (wave * self.envelope(t)) as f32
            })
            .collect()
    }
}

/// Tones with start offsets relative to the pattern start.
#[derive(Debug, Clone, PartialEq)]
pub struct TonePattern {
    pub tones: Vec<(f64, Tone)>,
    /// Time from pattern start until the pattern is considered finished.
    pub length: f64,
}

/// Dispatch chime: G4 B4 D5 G5, 0.25 s apart.
pub const DISPATCH_CHIME_LENGTH: f64 = 1.8;

const DISPATCH_STEP: f64 = 0.25;

impl TonePattern {
    /// Four-tone ascending arpeggio played before every announcement.
    pub fn dispatch_chime() -> Self {
        let notes = [
            (392.00, 0.6, 0.4),
            (493.88, 0.6, 0.4),
            (587.33, 0.6, 0.4),
            (783.99, 0.8, 0.5),
        ];

        let tones = notes
            .iter()
            .enumerate()
            .map(|(i, &(freq, duration, gain))| {
                let tone = Tone {
                    attack: 0.05,
                    ..Tone::sine(freq, duration, gain)
                };
                (i as f64 * DISPATCH_STEP, tone)
            })
            .collect();

        Self {
            tones,
            length: DISPATCH_CHIME_LENGTH,
        }
    }

    /// Three short square beeps (B5) for a newly arrived ticket.
    pub fn new_ticket_alert() -> Self {
        let beep = Tone {
            waveform: Waveform::Square,
            ..Tone::sine(987.77, 0.1, 0.05)
        };
        Self {
            tones: (0..3).map(|i| (i as f64 * 0.15, beep.clone())).collect(),
            length: 0.4,
        }
    }

    pub fn acknowledge() -> Self {
        Self {
            tones: vec![(0.0, Tone::sine(554.37, 0.2, 0.1))],
            length: 0.2,
        }
    }

    /// Rising octave sweep C5 to C6.
    pub fn resolve() -> Self {
        let tone = Tone {
            sweep_to_hz: Some(1046.50),
            ..Tone::sine(523.25, 0.4, 0.1)
        };
        Self {
            tones: vec![(0.0, tone)],
            length: 0.4,
        }
    }
}

/// Short feedback sounds that never delay speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    NewTicket,
    Acknowledge,
    Resolve,
}

impl Cue {
    pub fn pattern(&self) -> TonePattern {
        match self {
            Cue::NewTicket => TonePattern::new_ticket_alert(),
            Cue::Acknowledge => TonePattern::acknowledge(),
            Cue::Resolve => TonePattern::resolve(),
        }
    }
}
