//! Pulso Analysis - Offline tempo, key, and energy detection
//!
//! The analyzer consumes a fully decoded [`PcmBuffer`], folds it to mono,
//! and produces an [`AnalysisReport`]: tempo with octave candidates, key
//! with Camelot notation, and an energy score, cached per source identity
//! with a 7-day staleness window.
//!
//! Analysis is long-running and must not touch the render thread; the
//! engine schedules it on worker threads and discards superseded results.
//! It never panics on pathological input: degenerate audio degrades to the
//! documented fallbacks, and an unusable buffer yields an
//! `analyzed: false` report with a reason instead of an error.
//!
//! - [`fft`] - FFT wrapper and window functions (shared with the stretch
//!   engine)
//! - [`tempo`] - Onset-envelope tempo detection
//! - [`key`] - Chroma-profile key detection with Camelot mapping
//! - [`energy`] - 1–10 energy scoring and fade envelopes
//! - [`cache`] - Per-source result cache

pub mod cache;
pub mod energy;
pub mod fft;
pub mod key;
pub mod tempo;

use serde::Serialize;
use tracing::info;

use pulso_core::PcmBuffer;

pub use cache::{AnalysisCache, STALENESS_WINDOW};
pub use energy::{EnergyProfile, energy_profile};
pub use fft::{Fft, Window};
pub use key::{Key, KeyEstimate, KeyMode, detect_key};
pub use tempo::{FALLBACK_BPM, TempoCandidate, TempoEstimate, detect_tempo};

/// The analysis output contract shared with the UI/automation layer.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Whether the analysis produced usable values.
    pub analyzed: bool,
    /// Tempo in BPM, rounded to the nearest integer.
    pub bpm: u32,
    /// Tempo confidence in [0, 1].
    pub bpm_confidence: f32,
    /// Alternative tempo hypotheses, strongest first.
    pub bpm_candidates: Vec<(f32, f32)>,
    /// Key short name (`"C"`, `"Am"`, …).
    pub key: String,
    /// Key confidence in [0, 1].
    pub key_confidence: f32,
    /// Camelot wheel position (`"8B"`, …).
    pub camelot_key: String,
    /// Energy score 1–10.
    pub energy: u8,
    /// Seconds until the program reaches its running level.
    pub fade_in_seconds: f32,
    /// Seconds of fading tail.
    pub fade_out_seconds: f32,
    /// Failure reason when `analyzed` is false.
    pub error: Option<String>,
}

impl Default for AnalysisReport {
    fn default() -> Self {
        Self {
            analyzed: false,
            bpm: FALLBACK_BPM as u32,
            bpm_confidence: 0.0,
            bpm_candidates: Vec::new(),
            key: String::new(),
            key_confidence: 0.0,
            camelot_key: String::new(),
            energy: 1,
            fade_in_seconds: 0.0,
            fade_out_seconds: 0.0,
            error: None,
        }
    }
}

impl AnalysisReport {
    /// The failure shape of the contract: `analyzed: false` plus a reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// Analyze a decoded buffer.
///
/// Stereo sources are folded to mono for analysis only. An empty buffer or
/// a zero sample rate yields a failed report; anything else produces a
/// report, degrading per-detector (tempo falls back to 120 BPM, a too-short
/// key analysis is simply omitted).
pub fn analyze(buffer: &PcmBuffer) -> AnalysisReport {
    if buffer.is_empty() {
        return AnalysisReport::failed("empty buffer");
    }
    if buffer.sample_rate <= 0.0 {
        return AnalysisReport::failed("invalid sample rate");
    }

    let mono = buffer.fold_mono();
    let sample_rate = buffer.sample_rate;

    let tempo = detect_tempo(&mono, sample_rate);
    let key = detect_key(&mono, sample_rate);
    let energy = energy_profile(&mono, sample_rate);

    let (key_name, key_confidence, camelot) = match &key {
        Some(estimate) => (
            estimate.key.short_name(),
            estimate.confidence,
            estimate.key.camelot().to_string(),
        ),
        None => (String::new(), 0.0, String::new()),
    };

    info!(
        bpm = tempo.bpm,
        key = %key_name,
        energy = energy.score,
        duration = buffer.duration_seconds(),
        "analysis complete"
    );

    AnalysisReport {
        analyzed: true,
        bpm: libm::roundf(tempo.bpm) as u32,
        bpm_confidence: tempo.confidence,
        bpm_candidates: tempo
            .candidates
            .iter()
            .map(|c| (c.bpm, c.confidence))
            .collect(),
        key: key_name,
        key_confidence,
        camelot_key: camelot,
        energy: energy.score,
        fade_in_seconds: energy.fade_in_seconds,
        fade_out_seconds: energy.fade_out_seconds,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_fails_without_panicking() {
        let report = analyze(&PcmBuffer::default());
        assert!(!report.analyzed);
        assert_eq!(report.error.as_deref(), Some("empty buffer"));
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = AnalysisReport::failed("decode failed");
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"bpmConfidence\""));
        assert!(json.contains("\"camelotKey\""));
        assert!(json.contains("\"analyzed\":false"));
    }
}
