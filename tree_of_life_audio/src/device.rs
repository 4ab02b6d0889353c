// Audio output devices and per-device tuning.
//
// `AudioDevice` is the seam between the engine and whatever actually plays
// samples. Starting a device may fail (no output, autoplay policy, busy
// hardware); the engine reports that as `AudioContextUnavailable` and stays
// retryable. `OfflineDevice` always starts and is what the WAV renderer and
// the tests drive.
//
// `DeviceProfile` marks constrained hardware (phones and tablets). The
// `GainPolicy` derived from it sets the polyphony ceiling, the dynamic gain
// curve, and the chain's wet/limiter adjustments, all tighter on constrained
// devices to stay clear of clipping.

use crate::error::{Error, Result};

/// Environment override that forces the constrained profile.
pub const CONSTRAINED_ENV: &str = "TREE_OF_LIFE_CONSTRAINED_AUDIO";

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

pub trait AudioDevice {
    /// Bring the device up and report its sample rate.
    fn start(&mut self) -> Result<u32>;

    fn name(&self) -> &str;
}

/// A device that renders into caller-provided buffers.
#[derive(Debug, Clone)]
pub struct OfflineDevice {
    sample_rate: u32,
}

impl OfflineDevice {
    pub fn new(sample_rate: u32) -> Self {
        OfflineDevice { sample_rate }
    }
}

impl Default for OfflineDevice {
    fn default() -> Self {
        OfflineDevice::new(DEFAULT_SAMPLE_RATE)
    }
}

impl AudioDevice for OfflineDevice {
    fn start(&mut self) -> Result<u32> {
        if self.sample_rate == 0 {
            return Err(Error::AudioContextUnavailable(
                "sample rate must be positive".to_string(),
            ));
        }
        Ok(self.sample_rate)
    }

    fn name(&self) -> &str {
        "offline"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceProfile {
    pub constrained: bool,
}

impl DeviceProfile {
    pub fn desktop() -> Self {
        DeviceProfile { constrained: false }
    }

    pub fn constrained() -> Self {
        DeviceProfile { constrained: true }
    }

    /// Mobile targets are constrained; elsewhere the environment override
    /// decides.
    pub fn detect() -> Self {
        let mobile = cfg!(any(target_os = "ios", target_os = "android"));
        let forced = std::env::var(CONSTRAINED_ENV)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        DeviceProfile {
            constrained: mobile || forced,
        }
    }

    pub fn gain_policy(self) -> GainPolicy {
        if self.constrained {
            GainPolicy {
                max_voices: 8,
                base_gain: 0.15,
                floor_gain: 0.04,
                per_voice_reduction: 0.03,
                limiter_threshold_db: -6.0,
                chorus_wet: 0.5,
                reverb_wet_scale: 0.7,
            }
        } else {
            GainPolicy {
                max_voices: 12,
                base_gain: 0.2,
                floor_gain: 0.05,
                per_voice_reduction: 0.02,
                limiter_threshold_db: -3.0,
                chorus_wet: 1.0,
                reverb_wet_scale: 1.0,
            }
        }
    }
}

/// Polyphony ceiling, dynamic gain curve and chain adjustments for one
/// device profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainPolicy {
    pub max_voices: usize,
    pub base_gain: f32,
    pub floor_gain: f32,
    pub per_voice_reduction: f32,
    pub limiter_threshold_db: f32,
    /// Chorus wet mix when the chorus is enabled.
    pub chorus_wet: f32,
    /// Multiplier on the configured reverb wet mix.
    pub reverb_wet_scale: f32,
}

impl GainPolicy {
    /// Chain output gain for `active` sounding voices. No voices and one
    /// voice both give the base gain.
    pub fn gain_for(&self, active: usize) -> f32 {
        let extra = active.saturating_sub(1) as f32;
        (self.base_gain - extra * self.per_voice_reduction).max(self.floor_gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gain_curve_non_increasing_and_floored() {
        for profile in [DeviceProfile::desktop(), DeviceProfile::constrained()] {
            let policy = profile.gain_policy();
            let gains: Vec<f32> = (0..=32).map(|n| policy.gain_for(n)).collect();
            assert!(gains.windows(2).all(|w| w[1] <= w[0]));
            assert_relative_eq!(gains[0], policy.base_gain);
            assert_relative_eq!(gains[32], policy.floor_gain);
        }
    }

    #[test]
    fn test_desktop_gain_values() {
        let policy = DeviceProfile::desktop().gain_policy();
        assert_relative_eq!(policy.gain_for(1), 0.2);
        assert_relative_eq!(policy.gain_for(4), 0.14, epsilon = 1e-6);
        assert_relative_eq!(policy.gain_for(12), 0.05, epsilon = 1e-6);
    }

    #[test]
    fn test_constrained_is_tighter() {
        let desktop = DeviceProfile::desktop().gain_policy();
        let mobile = DeviceProfile::constrained().gain_policy();
        assert!(mobile.max_voices < desktop.max_voices);
        assert!(mobile.base_gain < desktop.base_gain);
        assert!(mobile.floor_gain < desktop.floor_gain);
        assert!(mobile.per_voice_reduction > desktop.per_voice_reduction);
        assert!(mobile.limiter_threshold_db < desktop.limiter_threshold_db);
    }

    #[test]
    fn test_offline_device_starts() {
        let mut device = OfflineDevice::default();
        assert_eq!(device.start().unwrap(), 44_100);
        assert!(OfflineDevice::new(0).start().is_err());
    }
}
