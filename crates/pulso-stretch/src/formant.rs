//! Formant extraction and spectral-envelope reapplication.
//!
//! Pitch shifting moves every bin, so timbre follows pitch and voices turn
//! into chipmunks. Formant preservation divides the spectrum by its own
//! envelope before the shift and multiplies the envelope back afterwards,
//! keeping the resonant structure where it was.

/// One spectral resonance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Formant {
    /// Center frequency in Hz.
    pub frequency: f32,
    /// Peak magnitude.
    pub amplitude: f32,
    /// Half-power (-3 dB) bandwidth in Hz.
    pub bandwidth: f32,
}

/// Maximum formants tracked per frame.
pub const MAX_FORMANTS: usize = 5;

/// Pick formant peaks from a magnitude spectrum.
///
/// A formant is a local maximum at least twice the mean magnitude. Its
/// bandwidth is measured where the magnitude falls below `peak / √2` on
/// each side. The strongest [`MAX_FORMANTS`] peaks are kept, ordered by
/// frequency.
pub fn extract_formants(magnitudes: &[f32], sample_rate: f32, fft_size: usize) -> Vec<Formant> {
    if magnitudes.len() < 3 {
        return Vec::new();
    }
    let bin_hz = sample_rate / fft_size as f32;
    let mean = magnitudes.iter().sum::<f32>() / magnitudes.len() as f32;
    let floor = mean * 2.0;

    let mut peaks: Vec<Formant> = Vec::new();
    for i in 1..magnitudes.len() - 1 {
        let mag = magnitudes[i];
        if mag > floor && mag > magnitudes[i - 1] && mag >= magnitudes[i + 1] {
            let half_power = mag / core::f32::consts::SQRT_2;
            let mut left = i;
            while left > 0 && magnitudes[left] > half_power {
                left -= 1;
            }
            let mut right = i;
            while right < magnitudes.len() - 1 && magnitudes[right] > half_power {
                right += 1;
            }
            peaks.push(Formant {
                frequency: i as f32 * bin_hz,
                amplitude: mag,
                bandwidth: ((right - left) as f32 * bin_hz).max(bin_hz),
            });
        }
    }

    peaks.sort_by(|a, b| b.amplitude.total_cmp(&a.amplitude));
    peaks.truncate(MAX_FORMANTS);
    peaks.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
    peaks
}

/// Smooth formant trajectories across frames with an exponential filter.
///
/// Each current formant is matched to the nearest previous one (within one
/// bandwidth); matched formants blend `factor` of the previous value into
/// the new one, unmatched formants pass through. The default factor is 0.8.
pub fn smooth_trajectories(previous: &[Formant], current: &[Formant], factor: f32) -> Vec<Formant> {
    let alpha = factor.clamp(0.0, 1.0);
    current
        .iter()
        .map(|cur| {
            let matched = previous.iter().min_by(|a, b| {
                (a.frequency - cur.frequency)
                    .abs()
                    .total_cmp(&(b.frequency - cur.frequency).abs())
            });
            match matched {
                Some(prev) if (prev.frequency - cur.frequency).abs() <= prev.bandwidth => Formant {
                    frequency: alpha * prev.frequency + (1.0 - alpha) * cur.frequency,
                    amplitude: alpha * prev.amplitude + (1.0 - alpha) * cur.amplitude,
                    bandwidth: alpha * prev.bandwidth + (1.0 - alpha) * cur.bandwidth,
                },
                _ => *cur,
            }
        })
        .collect()
}

/// Evaluate the spectral envelope implied by a formant set, per bin.
///
/// Each formant contributes a Lorentzian bump; the floor is a small
/// fraction of the strongest formant so the division in whitening stays
/// bounded.
pub fn spectral_envelope(
    formants: &[Formant],
    bins: usize,
    sample_rate: f32,
    fft_size: usize,
) -> Vec<f32> {
    let bin_hz = sample_rate / fft_size as f32;
    let peak = formants
        .iter()
        .map(|f| f.amplitude)
        .fold(0.0f32, f32::max)
        .max(1e-9);
    let floor = peak * 0.01;

    (0..bins)
        .map(|bin| {
            let freq = bin as f32 * bin_hz;
            let sum: f32 = formants
                .iter()
                .map(|f| {
                    let half_bw = (f.bandwidth * 0.5).max(bin_hz);
                    let x = (freq - f.frequency) / half_bw;
                    f.amplitude / (1.0 + x * x)
                })
                .sum();
            sum.max(floor)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum_with_peaks(bins: usize, peaks: &[(usize, f32)]) -> Vec<f32> {
        let mut mags = vec![0.01f32; bins];
        for &(bin, amp) in peaks {
            mags[bin] = amp;
            mags[bin - 1] = amp * 0.6;
            mags[bin + 1] = amp * 0.6;
        }
        mags
    }

    #[test]
    fn peaks_become_formants() {
        let mags = spectrum_with_peaks(512, &[(40, 1.0), (120, 0.8)]);
        let formants = extract_formants(&mags, 48000.0, 1024);
        assert_eq!(formants.len(), 2);
        // bin 40 at 48kHz/1024 ≈ 46.9 Hz per bin.
        assert!((formants[0].frequency - 40.0 * 46.875).abs() < 1.0);
        assert!(formants[0].bandwidth > 0.0);
    }

    #[test]
    fn at_most_five_formants() {
        let peaks: Vec<(usize, f32)> = (1..9).map(|i| (i * 50, 1.0 - i as f32 * 0.05)).collect();
        let mags = spectrum_with_peaks(512, &peaks);
        let formants = extract_formants(&mags, 48000.0, 1024);
        assert!(formants.len() <= MAX_FORMANTS);
    }

    #[test]
    fn smoothing_pulls_toward_previous() {
        let prev = [Formant {
            frequency: 500.0,
            amplitude: 1.0,
            bandwidth: 100.0,
        }];
        let cur = [Formant {
            frequency: 520.0,
            amplitude: 0.5,
            bandwidth: 100.0,
        }];
        let smoothed = smooth_trajectories(&prev, &cur, 0.8);
        assert!((smoothed[0].frequency - 504.0).abs() < 0.1);
        assert!((smoothed[0].amplitude - 0.9).abs() < 0.01);
    }

    #[test]
    fn unmatched_formant_passes_through() {
        let prev = [Formant {
            frequency: 500.0,
            amplitude: 1.0,
            bandwidth: 50.0,
        }];
        let cur = [Formant {
            frequency: 2000.0,
            amplitude: 0.4,
            bandwidth: 80.0,
        }];
        let smoothed = smooth_trajectories(&prev, &cur, 0.8);
        assert_eq!(smoothed[0], cur[0]);
    }

    #[test]
    fn envelope_peaks_at_formants() {
        let formants = [Formant {
            frequency: 1000.0,
            amplitude: 1.0,
            bandwidth: 200.0,
        }];
        let env = spectral_envelope(&formants, 512, 48000.0, 1024);
        let bin_hz: f32 = 48000.0 / 1024.0;
        let peak_bin = (1000.0 / bin_hz).round() as usize;
        assert!(env[peak_bin] > env[peak_bin + 40]);
        assert!(env[peak_bin] > env[peak_bin.saturating_sub(40)]);
        assert!(env.iter().all(|&v| v > 0.0));
    }
}
