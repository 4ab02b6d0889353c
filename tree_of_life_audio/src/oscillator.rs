// Phase-accumulator oscillator.
//
// Phase runs over [0, 1) and every waveform outputs in [-1, 1]. Phase
// modulation (used for FM voices) offsets the read position without
// disturbing the accumulator, so the carrier's pitch stays exact.

use crate::config::Waveform;
use std::f32::consts::TAU;

#[derive(Debug, Clone)]
pub struct Oscillator {
    phase: f32,
    pub waveform: Waveform,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Oscillator {
            phase: 0.0,
            waveform,
        }
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    pub fn next_sample(&mut self, freq_hz: f32, sample_rate: f32) -> f32 {
        self.next_sample_pm(freq_hz, sample_rate, 0.0)
    }

    /// Next sample with `phase_offset` (in cycles) added to the read phase.
    pub fn next_sample_pm(&mut self, freq_hz: f32, sample_rate: f32, phase_offset: f32) -> f32 {
        let out = shape(self.waveform, (self.phase + phase_offset).rem_euclid(1.0));
        self.phase = (self.phase + freq_hz / sample_rate).fract();
        out
    }
}

fn shape(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => (phase * TAU).sin(),
        Waveform::Sawtooth => 2.0 * phase - 1.0,
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Triangle => {
            if phase < 0.5 {
                4.0 * phase - 1.0
            } else {
                3.0 - 4.0 * phase
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_in_range() {
        for waveform in [
            Waveform::Sine,
            Waveform::Sawtooth,
            Waveform::Square,
            Waveform::Triangle,
        ] {
            let mut osc = Oscillator::new(waveform);
            for _ in 0..1000 {
                let s = osc.next_sample(440.0, 44_100.0);
                assert!((-1.0..=1.0).contains(&s), "{waveform:?}: {s}");
            }
        }
    }

    #[test]
    fn test_sine_period() {
        // 100 Hz at 1000 Hz sample rate: ten samples per cycle.
        let mut osc = Oscillator::new(Waveform::Sine);
        let first: Vec<f32> = (0..10).map(|_| osc.next_sample(100.0, 1000.0)).collect();
        let second: Vec<f32> = (0..10).map(|_| osc.next_sample(100.0, 1000.0)).collect();
        for (a, b) in first.iter().zip(&second) {
            assert!((a - b).abs() < 1e-4);
        }
        assert!(first[0].abs() < 1e-6);
        assert!((first[2] - (0.2 * TAU).sin()).abs() < 1e-5);
    }

    #[test]
    fn test_phase_offset_shifts_read_only() {
        let mut plain = Oscillator::new(Waveform::Sawtooth);
        let mut shifted = Oscillator::new(Waveform::Sawtooth);
        assert!((shifted.next_sample_pm(100.0, 1000.0, 0.25) + 0.5).abs() < 1e-6);
        plain.next_sample(100.0, 1000.0);
        // Accumulators advanced identically.
        assert_eq!(plain.next_sample(100.0, 1000.0), shifted.next_sample(100.0, 1000.0));
    }
}
