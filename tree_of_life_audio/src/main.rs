// Offline renderer, CLI entry point.
//
// Plays one note or one chord through the audio engine and writes the
// result as a mono 32-bit float WAV.
//
// Usage:
//   cargo run -p tree_of_life_audio --bin render -- --note C --out c.wav
//   cargo run -p tree_of_life_audio --bin render -- --chord C,E,G
//     [--preset crystal-bells] [--style arpeggio] [--seconds 6]
//     [--sample-rate 48000] [--config audio.json] --out chord.wav

use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tree_of_life_audio::config::{AudioConfig, PlaybackStyle};
use tree_of_life_audio::device::{DEFAULT_SAMPLE_RATE, DeviceProfile, OfflineDevice};
use tree_of_life_audio::engine::AudioEngine;
use tree_of_life_audio::preset::PresetId;
use tree_of_life_audio::wav::{render_seconds, write_wav};

#[derive(Clone, Copy, ValueEnum)]
enum Style {
    Simultaneous,
    Arpeggio,
    Roll,
}

impl From<Style> for PlaybackStyle {
    fn from(style: Style) -> Self {
        match style {
            Style::Simultaneous => PlaybackStyle::Simultaneous,
            Style::Arpeggio => PlaybackStyle::Arpeggio,
            Style::Roll => PlaybackStyle::Roll,
        }
    }
}

#[derive(Parser)]
#[command(name = "render", about = "Render Tree of Life notes and chords to WAV")]
#[command(group(ArgGroup::new("input").required(true).args(["note", "chord"])))]
struct Cli {
    /// Single note, e.g. C or F#
    #[arg(long)]
    note: Option<String>,

    /// Comma-separated chord tones, e.g. C,E,G
    #[arg(long, value_delimiter = ',')]
    chord: Option<Vec<String>>,

    /// Preset for chord playback (celestial-pad, crystal-bells,
    /// ethereal-strings, earth-bass)
    #[arg(long)]
    preset: Option<String>,

    #[arg(long, value_enum)]
    style: Option<Style>,

    /// Length of the rendered file
    #[arg(long, default_value_t = 6.0)]
    seconds: f32,

    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Audio configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Render with the constrained-device gain policy
    #[arg(long)]
    constrained: bool,

    #[arg(short, long)]
    out: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error rendering audio: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> tree_of_life_audio::Result<()> {
    let mut config = match &cli.config {
        Some(path) => AudioConfig::load(path)?,
        None => AudioConfig::default(),
    };
    if let Some(style) = cli.style {
        config.chord.style = style.into();
    }
    let profile = if cli.constrained {
        DeviceProfile::constrained()
    } else {
        DeviceProfile::detect()
    };

    let mut engine = AudioEngine::new(
        Box::new(OfflineDevice::new(cli.sample_rate)),
        config,
        profile,
    );
    engine.initialize()?;

    if let Some(name) = &cli.preset {
        match name.parse::<PresetId>() {
            Ok(id) => engine.select_preset(id),
            Err(e) => warn!("{e}, using basic timbre"),
        }
    }

    if let Some(note) = &cli.note {
        let voices = engine.play_note(note)?;
        info!(note = %note, voices = voices.len(), "playing note");
    } else if let Some(chord) = &cli.chord {
        let names: Vec<&str> = chord.iter().map(String::as_str).collect();
        let playback = engine.play_chord(&names)?;
        let voicing: Vec<String> = playback
            .voicing
            .iter()
            .map(|v| format!("{}{:+}", v.note, v.relative_octave))
            .collect();
        info!(
            voicing = %voicing.join(" "),
            voices = playback.voices.len(),
            dropped = playback.dropped,
            "playing chord"
        );
    }

    let samples = render_seconds(&mut engine, cli.seconds);
    write_wav(&cli.out, &samples, cli.sample_rate)?;
    println!(
        "Wrote {:.2}s to {}",
        samples.len() as f32 / cli.sample_rate as f32,
        cli.out.display()
    );
    Ok(())
}
