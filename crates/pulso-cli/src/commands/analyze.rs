//! Track analysis command.

use std::path::PathBuf;

use clap::Args;

use pulso_analysis::analyze;
use pulso_io::read_wav;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// WAV file to analyze
    pub input: PathBuf,

    /// Emit the raw JSON report instead of the summary
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let buffer = read_wav(&args.input)?;
    let report = analyze(&buffer);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if !report.analyzed {
        println!(
            "Analysis failed: {}",
            report.error.as_deref().unwrap_or("unknown")
        );
        return Ok(());
    }

    println!("{}", args.input.display());
    println!("  Tempo:   {} BPM ({:.0}% confidence)", report.bpm, report.bpm_confidence * 100.0);
    if !report.bpm_candidates.is_empty() {
        let alts: Vec<String> = report
            .bpm_candidates
            .iter()
            .skip(1)
            .map(|(bpm, conf)| format!("{bpm:.0} ({:.0}%)", conf * 100.0))
            .collect();
        if !alts.is_empty() {
            println!("  Also:    {}", alts.join(", "));
        }
    }
    if report.key.is_empty() {
        println!("  Key:     (too short to detect)");
    } else {
        println!("  Key:     {} / Camelot {}", report.key, report.camelot_key);
    }
    println!("  Energy:  {}/10", report.energy);
    println!(
        "  Fades:   in {:.1}s, out {:.1}s",
        report.fade_in_seconds, report.fade_out_seconds
    );
    Ok(())
}
