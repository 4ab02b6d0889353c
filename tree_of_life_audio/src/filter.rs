// Per-voice resonant filter built on `biquad`.
//
// Preset voices may insert one filter between their oscillators and their
// output gain. The cutoff is clamped below Nyquist and Q kept positive
// before coefficients are computed, so any preset value yields a usable
// filter at any sample rate.

use crate::error::{Error, Result};
use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(rename = "type")]
    pub kind: FilterKind,
    /// Cutoff or center frequency in Hz.
    pub frequency: f32,
    /// Resonance.
    pub q: f32,
}

pub struct VoiceFilter {
    filter: DirectForm2Transposed<f32>,
}

impl VoiceFilter {
    pub fn new(config: &FilterConfig, sample_rate: f32) -> Result<Self> {
        let kind = match config.kind {
            FilterKind::Lowpass => biquad::Type::LowPass,
            FilterKind::Highpass => biquad::Type::HighPass,
            FilterKind::Bandpass => biquad::Type::BandPass,
            FilterKind::Notch => biquad::Type::Notch,
        };
        let cutoff = config.frequency.clamp(1.0, sample_rate * 0.45);
        let q = config.q.max(0.01);
        let coeffs = Coefficients::<f32>::from_params(kind, sample_rate.hz(), cutoff.hz(), q)
            .map_err(|e| Error::Filter(format!("{e:?}")))?;
        Ok(VoiceFilter {
            filter: DirectForm2Transposed::<f32>::new(coeffs),
        })
    }

    pub fn process(&mut self, input: f32) -> f32 {
        self.filter.run(input)
    }
}
