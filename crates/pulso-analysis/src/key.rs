//! Musical key detection from a chroma profile.
//!
//! The profile is built with a targeted per-pitch transform (one Goertzel
//! magnitude per semitone) restricted to the melodic band 100 Hz–2000 Hz,
//! which keeps bass and percussion energy out of the profile. Per-frame
//! chroma vectors aggregate by **median** for outlier robustness, then
//! L2-normalize.
//!
//! Mode is decided by comparing the major-third bin against the
//! minor-third bin above the tonic. This is deliberately simpler than
//! Krumhansl-Schmuckler profile correlation and can misread ambiguous or
//! modal material; the tradeoff is documented and intentional, do not
//! "fix" it by swapping the algorithm silently.

use std::f32::consts::PI;

use tracing::debug;

use crate::fft::Window;

/// Melodic band analysed for chroma.
const BAND_LOW_HZ: f32 = 100.0;
const BAND_HIGH_HZ: f32 = 2000.0;

/// Analysis frame length and hop.
const FRAME_SIZE: usize = 4096;
const FRAME_HOP: usize = 2048;

/// Cap on analysed frames; frames are sampled evenly across the buffer.
const MAX_FRAMES: usize = 64;

/// Harmonic-boost weights for the 2nd and 3rd harmonics.
const HARMONIC2_WEIGHT: f32 = 0.5;
const HARMONIC3_WEIGHT: f32 = 0.25;

/// Note names by pitch class, sharps convention.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Major or minor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// Major key.
    Major,
    /// Minor key.
    Minor,
}

/// A detected key: pitch class plus mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    /// Pitch class 0–11, C = 0.
    pub pitch_class: usize,
    /// Major or minor.
    pub mode: KeyMode,
}

impl Key {
    /// Tonic note name (`"C"`, `"F#"`, …).
    pub fn tonic_name(&self) -> &'static str {
        NOTE_NAMES[self.pitch_class % 12]
    }

    /// Short display name: `"C"` for major, `"Am"` for minor.
    pub fn short_name(&self) -> String {
        match self.mode {
            KeyMode::Major => self.tonic_name().to_string(),
            KeyMode::Minor => format!("{}m", self.tonic_name()),
        }
    }

    /// Camelot wheel position for harmonic mixing (`"8B"`, `"8A"`, …).
    pub fn camelot(&self) -> &'static str {
        // Majors take the B ring, relative minors the A ring.
        const MAJOR_WHEEL: [&str; 12] = [
            "8B", "3B", "10B", "5B", "12B", "7B", "2B", "9B", "4B", "11B", "6B", "1B",
        ];
        const MINOR_WHEEL: [&str; 12] = [
            "5A", "12A", "7A", "2A", "9A", "4A", "11A", "6A", "1A", "8A", "3A", "10A",
        ];
        match self.mode {
            KeyMode::Major => MAJOR_WHEEL[self.pitch_class % 12],
            KeyMode::Minor => MINOR_WHEEL[self.pitch_class % 12],
        }
    }
}

/// Result of key detection.
#[derive(Debug, Clone)]
pub struct KeyEstimate {
    /// Detected key.
    pub key: Key,
    /// Confidence in [0, 1].
    pub confidence: f32,
    /// The L2-normalized aggregated chroma profile.
    pub chroma: [f32; 12],
}

/// Goertzel magnitude of one frequency in a windowed frame.
fn goertzel_magnitude(frame: &[f32], frequency: f32, sample_rate: f32) -> f32 {
    let omega = 2.0 * PI * frequency / sample_rate;
    let coeff = 2.0 * omega.cos();
    let mut s_prev = 0.0f32;
    let mut s_prev2 = 0.0f32;
    for &sample in frame {
        let s = sample + coeff * s_prev - s_prev2;
        s_prev2 = s_prev;
        s_prev = s;
    }
    (s_prev * s_prev + s_prev2 * s_prev2 - coeff * s_prev * s_prev2)
        .max(0.0)
        .sqrt()
        / frame.len() as f32
}

/// Semitone frequencies inside the melodic band, with their pitch classes.
fn band_notes() -> Vec<(usize, f32)> {
    let mut notes = Vec::new();
    // MIDI note n has frequency 440 * 2^((n-69)/12); pitch class C = n % 12.
    for midi in 0u32..128 {
        let freq = 440.0 * libm::powf(2.0, (midi as f32 - 69.0) / 12.0);
        if (BAND_LOW_HZ..=BAND_HIGH_HZ).contains(&freq) {
            notes.push(((midi % 12) as usize, freq));
        }
    }
    notes
}

/// Chroma vector of one Hann-windowed frame, harmonic-boosted.
fn frame_chroma(frame: &[f32], sample_rate: f32, notes: &[(usize, f32)]) -> [f32; 12] {
    let mut windowed = frame.to_vec();
    Window::Hann.apply(&mut windowed);

    // Per-note magnitudes first, so harmonics can be looked up.
    let mags: Vec<f32> = notes
        .iter()
        .map(|&(_, freq)| goertzel_magnitude(&windowed, freq, sample_rate))
        .collect();
    let max_mag = mags.iter().fold(1e-9f32, |a, &b| a.max(b));

    // A note whose low harmonics are also present is more likely a real
    // tone than spectral spill; boost it proportionally.
    let magnitude_at = |freq: f32| -> f32 {
        if freq > BAND_HIGH_HZ {
            return goertzel_magnitude(&windowed, freq, sample_rate);
        }
        notes
            .iter()
            .zip(&mags)
            .min_by(|(a, _), (b, _)| (a.1 - freq).abs().total_cmp(&(b.1 - freq).abs()))
            .map_or(0.0, |(_, &m)| m)
    };

    let mut chroma = [0.0f32; 12];
    for (&(pc, freq), &mag) in notes.iter().zip(&mags) {
        let h2 = magnitude_at(freq * 2.0) / max_mag;
        let h3 = magnitude_at(freq * 3.0) / max_mag;
        let boost = 1.0 + HARMONIC2_WEIGHT * h2.min(1.0) + HARMONIC3_WEIGHT * h3.min(1.0);
        chroma[pc] += mag * boost;
    }
    chroma
}

/// Major vs minor by third strength relative to the tonic; major wins
/// ties. A bare fifth or modal material lands on major by construction.
fn mode_from_thirds(profile: &[f32; 12], tonic: usize) -> KeyMode {
    let major_third = profile[(tonic + 4) % 12];
    let minor_third = profile[(tonic + 3) % 12];
    if major_third >= minor_third {
        KeyMode::Major
    } else {
        KeyMode::Minor
    }
}

/// Median of a slice, by sorting a scratch copy.
fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) * 0.5
    } else {
        values[mid]
    }
}

/// Detect the key of a mono buffer.
///
/// Returns `None` when the buffer is shorter than one analysis frame.
pub fn detect_key(samples: &[f32], sample_rate: f32) -> Option<KeyEstimate> {
    if samples.len() < FRAME_SIZE || sample_rate <= 0.0 {
        return None;
    }

    let notes = band_notes();
    let total_frames = (samples.len() - FRAME_SIZE) / FRAME_HOP + 1;
    // Sample frames evenly instead of scanning everything.
    let stride = (total_frames / MAX_FRAMES).max(1);

    let mut frames: Vec<[f32; 12]> = Vec::new();
    let mut index = 0;
    while index < total_frames {
        let start = index * FRAME_HOP;
        frames.push(frame_chroma(
            &samples[start..start + FRAME_SIZE],
            sample_rate,
            &notes,
        ));
        index += stride;
    }
    if frames.is_empty() {
        return None;
    }

    // Median across frames, per bin.
    let mut profile = [0.0f32; 12];
    let mut scratch = vec![0.0f32; frames.len()];
    for (bin, slot) in profile.iter_mut().enumerate() {
        for (i, frame) in frames.iter().enumerate() {
            scratch[i] = frame[bin];
        }
        *slot = median(&mut scratch);
    }

    // L2 normalization.
    let norm = profile.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 1e-9 {
        for v in &mut profile {
            *v /= norm;
        }
    }

    // Tonic: strongest pitch class.
    let pitch_class = profile
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mode = mode_from_thirds(&profile, pitch_class);
    let key = Key { pitch_class, mode };
    let confidence = (profile[pitch_class] * 2.0).min(0.9);
    debug!(key = %key.short_name(), confidence, "key detected");

    Some(KeyEstimate {
        key,
        confidence,
        chroma: profile,
    })
}
