// Offline rendering to WAV.

use crate::engine::AudioEngine;
use crate::error::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Render `seconds` of engine output. Empty before initialization.
pub fn render_seconds(engine: &mut AudioEngine, seconds: f32) -> Vec<f32> {
    let Some(rate) = engine.sample_rate() else {
        return Vec::new();
    };
    let mut samples = vec![0.0; (seconds.max(0.0) * rate as f32).round() as usize];
    engine.render(&mut samples);
    samples
}

/// Write mono 32-bit float samples.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
