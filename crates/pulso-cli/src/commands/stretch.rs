//! Time-stretch / pitch-shift command.

use std::path::PathBuf;

use anyhow::bail;
use clap::{Args, ValueEnum};

use pulso_io::{read_wav, write_wav};
use pulso_stretch::{QualityTier, TimeStretcher};

#[derive(Clone, Copy, ValueEnum)]
pub enum Quality {
    Low,
    Medium,
    High,
    Ultra,
}

impl From<Quality> for QualityTier {
    fn from(quality: Quality) -> Self {
        match quality {
            Quality::Low => QualityTier::Low,
            Quality::Medium => QualityTier::Medium,
            Quality::High => QualityTier::High,
            Quality::Ultra => QualityTier::Ultra,
        }
    }
}

#[derive(Args)]
pub struct StretchArgs {
    /// WAV file to process
    pub input: PathBuf,

    /// Output WAV file
    pub output: PathBuf,

    /// Duration ratio (2.0 = twice as long)
    #[arg(long, default_value_t = 1.0)]
    pub stretch: f32,

    /// Pitch ratio (2.0 = one octave up)
    #[arg(long, default_value_t = 1.0)]
    pub pitch: f32,

    /// Pitch shift in semitones (overrides --pitch)
    #[arg(long)]
    pub semitones: Option<f32>,

    /// Quality tier
    #[arg(long, value_enum, default_value_t = Quality::High)]
    pub quality: Quality,

    /// Preserve formants through pitch shifts
    #[arg(long)]
    pub preserve_formants: bool,
}

pub fn run(args: StretchArgs) -> anyhow::Result<()> {
    let pitch_ratio = match args.semitones {
        Some(semitones) => 2.0f32.powf(semitones / 12.0),
        None => args.pitch,
    };
    if args.stretch <= 0.0 || pitch_ratio <= 0.0 {
        bail!("ratios must be positive");
    }

    let buffer = read_wav(&args.input)?;
    let mut stretcher = TimeStretcher::with_quality(buffer.sample_rate, args.quality.into());
    stretcher.set_formant_preservation(args.preserve_formants);

    let stretched = stretcher.process_buffer(&buffer, args.stretch, pitch_ratio)?;
    write_wav(&args.output, &stretched)?;

    println!(
        "{} -> {} ({:.2}x duration, {:.2}x pitch)",
        args.input.display(),
        args.output.display(),
        args.stretch,
        pitch_ratio,
    );
    Ok(())
}
