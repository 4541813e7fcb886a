//! Energy scoring and fade envelope detection.

/// Segment length for the coarse RMS envelope.
const SEGMENT_SECONDS: f32 = 2.0;

/// Fade-in threshold as a fraction of peak segment energy.
const FADE_IN_FRACTION: f32 = 0.7;

/// Fade-out threshold as a fraction of peak segment energy.
const FADE_OUT_FRACTION: f32 = 0.3;

/// Energy profile of a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyProfile {
    /// Integer score 1–10.
    pub score: u8,
    /// Seconds until the track reaches 70% of its peak energy.
    pub fade_in_seconds: f32,
    /// Seconds of tail below 30% of peak energy.
    pub fade_out_seconds: f32,
}

impl Default for EnergyProfile {
    fn default() -> Self {
        Self {
            score: 1,
            fade_in_seconds: 0.0,
            fade_out_seconds: 0.0,
        }
    }
}

/// Coarse RMS envelope in 2-second segments.
fn segment_envelope(samples: &[f32], sample_rate: f32) -> Vec<f32> {
    let segment = ((sample_rate * SEGMENT_SECONDS) as usize).max(1);
    samples
        .chunks(segment)
        .map(|chunk| {
            let sum: f32 = chunk.iter().map(|s| s * s).sum();
            (sum / chunk.len() as f32).sqrt()
        })
        .collect()
}

/// Score a mono buffer's energy on the DJ 1–10 scale.
///
/// Blends overall RMS level with a crude spectral-energy proxy (mean
/// first-difference magnitude, which rises with high-frequency content) so
/// a loud but dull track scores below a loud and bright one.
pub fn energy_profile(samples: &[f32], sample_rate: f32) -> EnergyProfile {
    if samples.is_empty() || sample_rate <= 0.0 {
        return EnergyProfile::default();
    }

    let rms = {
        let sum: f32 = samples.iter().map(|s| s * s).sum();
        (sum / samples.len() as f32).sqrt()
    };
    let flux = {
        let sum: f32 = samples.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
        sum / (samples.len() - 1).max(1) as f32
    };

    // Normalize against full-scale program material: RMS 0.3 and mean
    // difference 0.1 both map to 1.0.
    let rms_norm = (rms / 0.3).min(1.0);
    let flux_norm = (flux / 0.1).min(1.0);
    let blended = 0.7 * rms_norm + 0.3 * flux_norm;
    let score = ((blended * 9.0).round() as u8 + 1).clamp(1, 10);

    // Fade envelope from the coarse segments.
    let envelope = segment_envelope(samples, sample_rate);
    let peak = envelope.iter().fold(0.0f32, |a, &b| a.max(b));
    let fade_in_seconds = if peak > 0.0 {
        envelope
            .iter()
            .position(|&v| v >= peak * FADE_IN_FRACTION)
            .map_or(0.0, |i| i as f32 * SEGMENT_SECONDS)
    } else {
        0.0
    };
    let fade_out_seconds = if peak > 0.0 {
        envelope
            .iter()
            .rposition(|&v| v >= peak * FADE_OUT_FRACTION)
            .map_or(0.0, |i| (envelope.len() - 1 - i) as f32 * SEGMENT_SECONDS)
    } else {
        0.0
    };

    EnergyProfile {
        score,
        fade_in_seconds,
        fade_out_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_scores_minimum() {
        let profile = energy_profile(&vec![0.0; 48000], 48000.0);
        assert_eq!(profile.score, 1);
    }

    #[test]
    fn loud_noise_scores_high() {
        // Alternating full-scale samples: maximal RMS and flux.
        let samples: Vec<f32> = (0..48000).map(|i| if i % 2 == 0 { 0.9 } else { -0.9 }).collect();
        let profile = energy_profile(&samples, 48000.0);
        assert!(profile.score >= 9, "got {}", profile.score);
    }

    #[test]
    fn score_stays_in_range() {
        for amplitude in [0.0, 0.01, 0.1, 0.5, 1.0] {
            let samples: Vec<f32> = (0..24000)
                .map(|i| (i as f32 * 0.05).sin() * amplitude)
                .collect();
            let profile = energy_profile(&samples, 48000.0);
            assert!((1..=10).contains(&profile.score));
        }
    }

    #[test]
    fn fade_in_detected() {
        // 10 seconds quiet, then 10 seconds loud.
        let sr = 1000.0;
        let mut samples = vec![0.01f32; 10_000];
        samples.extend(vec![0.5f32; 10_000]);
        let profile = energy_profile(&samples, sr);
        assert!(
            (profile.fade_in_seconds - 10.0).abs() <= 2.0,
            "got {}",
            profile.fade_in_seconds
        );
    }

    #[test]
    fn empty_input_is_default() {
        assert_eq!(energy_profile(&[], 48000.0), EnergyProfile::default());
    }
}
