//! Tempo detection from the energy envelope.
//!
//! The estimator is onset-driven: a sliding RMS envelope, dynamic-threshold
//! peak picking, inter-peak intervals converted to instantaneous BPM,
//! octave folding into the plausible DJ range, and a tolerance-bucketed
//! histogram whose mode wins. Pathological input never panics, it degrades
//! to the 120 BPM fallback with near-zero confidence.

use tracing::debug;

/// RMS window length for the energy envelope.
const ENVELOPE_WINDOW_MS: f32 = 100.0;

/// Envelope hop as a fraction of the window (75% overlap).
const ENVELOPE_HOP_RATIO: f32 = 0.25;

/// Peak threshold as a multiple of the mean envelope value.
const PEAK_THRESHOLD_FACTOR: f32 = 1.5;

/// Minimum spacing between onsets, to suppress double-triggers.
const MIN_PEAK_DISTANCE_MS: f32 = 300.0;

/// Plausible tempo range; values outside fold by octaves.
const BPM_MIN: f32 = 60.0;
const BPM_MAX: f32 = 180.0;

/// Histogram bucket width in BPM.
const BUCKET_WIDTH: f32 = 3.0;

/// Fallback tempo for degenerate input.
pub const FALLBACK_BPM: f32 = 120.0;

/// A tempo hypothesis with its supporting evidence share.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoCandidate {
    /// Tempo in BPM.
    pub bpm: f32,
    /// Share of observed intervals supporting this tempo, scaled by the
    /// octave prior.
    pub confidence: f32,
}

/// Result of tempo detection.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoEstimate {
    /// Primary tempo in BPM.
    pub bpm: f32,
    /// Confidence in [0, 1].
    pub confidence: f32,
    /// Alternative octave hypotheses, strongest first.
    pub candidates: Vec<TempoCandidate>,
}

impl TempoEstimate {
    fn fallback() -> Self {
        Self {
            bpm: FALLBACK_BPM,
            confidence: 0.05,
            candidates: vec![TempoCandidate {
                bpm: FALLBACK_BPM,
                confidence: 0.05,
            }],
        }
    }
}

/// Sliding-window RMS energy envelope.
///
/// Window ≈100 ms with 75% overlap; one envelope value per hop.
pub fn energy_envelope(samples: &[f32], sample_rate: f32) -> Vec<f32> {
    if samples.is_empty() || sample_rate <= 0.0 {
        return Vec::new();
    }
    let window = ((sample_rate * ENVELOPE_WINDOW_MS * 1e-3) as usize).max(1);
    let hop = ((window as f32 * ENVELOPE_HOP_RATIO) as usize).max(1);

    let mut envelope = Vec::with_capacity(samples.len() / hop + 1);
    let mut start = 0;
    while start + window <= samples.len() {
        let sum: f32 = samples[start..start + window].iter().map(|s| s * s).sum();
        envelope.push((sum / window as f32).sqrt());
        start += hop;
    }
    envelope
}

/// Pick onset peaks above the dynamic threshold.
///
/// A peak must exceed `1.5 × mean`, be a local maximum, and sit at least
/// ~300 ms after the previous accepted peak.
pub fn pick_peaks(envelope: &[f32], sample_rate: f32) -> Vec<usize> {
    if envelope.len() < 3 {
        return Vec::new();
    }
    let window = ((sample_rate * ENVELOPE_WINDOW_MS * 1e-3) as usize).max(1);
    let hop_seconds = window as f32 * ENVELOPE_HOP_RATIO / sample_rate;
    let min_distance = ((MIN_PEAK_DISTANCE_MS * 1e-3 / hop_seconds) as usize).max(1);

    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let threshold = mean * PEAK_THRESHOLD_FACTOR;

    let mut peaks = Vec::new();
    let mut i = 1;
    while i < envelope.len() - 1 {
        let is_peak = envelope[i] > threshold
            && envelope[i] > envelope[i - 1]
            && envelope[i] >= envelope[i + 1];
        if is_peak {
            let since_last = peaks.last().map_or(usize::MAX, |&last| i - last);
            if since_last >= min_distance {
                peaks.push(i);
                i += min_distance;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

/// Fold a tempo into the plausible range by doubling or halving.
fn fold_octaves(bpm: f32) -> f32 {
    if !bpm.is_finite() || bpm <= 0.0 {
        return FALLBACK_BPM;
    }
    let mut folded = bpm;
    while folded < BPM_MIN {
        folded *= 2.0;
    }
    while folded > BPM_MAX {
        folded *= 0.5;
    }
    folded
}

/// Detect the tempo of a mono buffer.
pub fn detect_tempo(samples: &[f32], sample_rate: f32) -> TempoEstimate {
    let envelope = energy_envelope(samples, sample_rate);
    let peaks = pick_peaks(&envelope, sample_rate);
    if peaks.len() < 2 {
        debug!(peaks = peaks.len(), "too few onsets, tempo fallback");
        return TempoEstimate::fallback();
    }

    let window = ((sample_rate * ENVELOPE_WINDOW_MS * 1e-3) as usize).max(1);
    let hop_seconds = window as f32 * ENVELOPE_HOP_RATIO / sample_rate;

    // Inter-peak intervals to instantaneous BPM, octave-corrected.
    let folded: Vec<f32> = peaks
        .windows(2)
        .map(|pair| {
            let seconds = (pair[1] - pair[0]) as f32 * hop_seconds;
            fold_octaves(60.0 / seconds)
        })
        .collect();

    // Mode via a tolerance-bucketed histogram.
    let bucket_of = |bpm: f32| (bpm / BUCKET_WIDTH).round() as i32;
    let mut buckets: Vec<(i32, Vec<f32>)> = Vec::new();
    for &bpm in &folded {
        let key = bucket_of(bpm);
        match buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(bpm),
            None => buckets.push((key, vec![bpm])),
        }
    }
    let (_, winners) = buckets
        .iter()
        .max_by_key(|(_, members)| members.len())
        .expect("at least one interval");

    let bpm = winners.iter().sum::<f32>() / winners.len() as f32;
    let confidence = (winners.len() as f32 / folded.len() as f32).clamp(0.0, 1.0);

    // Octave hypotheses, weighted below the primary.
    let mut candidates = vec![TempoCandidate { bpm, confidence }];
    for (factor, weight) in [(0.5, 0.6), (2.0, 0.8)] {
        let alt = bpm * factor;
        if (BPM_MIN..=BPM_MAX).contains(&alt) {
            candidates.push(TempoCandidate {
                bpm: alt,
                confidence: confidence * weight,
            });
        }
    }
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    debug!(bpm, confidence, onsets = peaks.len(), "tempo detected");
    TempoEstimate {
        bpm,
        confidence,
        candidates,
    }
}
