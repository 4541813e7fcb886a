//! Pulso Stretch - Phase-vocoder time-stretch and pitch-shift
//!
//! Frame-based analysis/resynthesis with independent tempo and pitch
//! control. The operation pipeline is a strict state machine:
//!
//! ```text
//! Idle → Analyzing → Stretching → PitchShifting (optional)
//!      → Synthesizing → Done | Failed
//! ```
//!
//! - **Analysis** slides a window (sized by [`QualityTier`]) with hop =
//!   window/4, transforms each frame to magnitude+phase, flags transients,
//!   and optionally tracks formants.
//! - **Stretching** repositions frames at `position × stretch_ratio` and
//!   enforces phase coherence on non-transient frames by unwrapping the
//!   frame-to-frame phase delta into [-π, π] and accumulating it.
//! - **Pitch shifting** remaps bin `i` to `round(i × pitch_ratio)`; with
//!   formant preservation the spectral envelope is whitened out first and
//!   reapplied after, so timbre does not follow pitch.
//! - **Synthesis** inverse-transforms, windows, and overlap-adds into a
//!   buffer of `ceil(input_len × stretch_ratio)` samples, normalized by the
//!   accumulated window energy.
//!
//! Operations run off the render thread, may take a cancellation token, and
//! discard partial buffers when cancelled, no partial results surface.

pub mod formant;
pub mod frame;

use std::f32::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use pulso_analysis::fft::{Fft, Window, magnitudes, phases, polar_to_complex};
use pulso_core::PcmBuffer;

pub use formant::{Formant, MAX_FORMANTS};
pub use frame::{StretchFrame, TransientDetector};

/// Latency/quality tradeoff: window and hop sizes per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityTier {
    /// 1024-sample window; lowest latency, coarsest spectrum.
    Low,
    /// 2048-sample window.
    Medium,
    /// 4096-sample window; the default.
    #[default]
    High,
    /// 8192-sample window; finest spectral resolution.
    Ultra,
}

impl QualityTier {
    /// Analysis window length in samples.
    pub fn window_size(self) -> usize {
        match self {
            QualityTier::Low => 1024,
            QualityTier::Medium => 2048,
            QualityTier::High => 4096,
            QualityTier::Ultra => 8192,
        }
    }

    /// Analysis hop: a quarter of the window (75% overlap).
    pub fn hop_size(self) -> usize {
        self.window_size() / 4
    }
}

/// Where an operation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StretchState {
    /// No operation in flight.
    #[default]
    Idle,
    /// Windowing and transforming input frames.
    Analyzing,
    /// Repositioning frames and accumulating phase.
    Stretching,
    /// Remapping spectral bins.
    PitchShifting,
    /// Overlap-adding the output.
    Synthesizing,
    /// Last operation completed.
    Done,
    /// Last operation failed or was cancelled.
    Failed,
}

/// Validation and cancellation errors.
///
/// Raised before any processing begins (ratios) or between frames
/// (cancellation); a failed operation surfaces no partial buffers.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StretchError {
    /// Stretch ratio must be positive and finite.
    #[error("invalid stretch ratio {0} (must be > 0)")]
    InvalidStretchRatio(f32),

    /// Pitch ratio must be positive and finite.
    #[error("invalid pitch ratio {0} (must be > 0)")]
    InvalidPitchRatio(f32),

    /// The operation was cancelled; partial output was discarded.
    #[error("operation cancelled")]
    Cancelled,
}

/// Tunable analysis options.
#[derive(Debug, Clone, Copy)]
pub struct StretchConfig {
    /// Analysis/synthesis window function.
    pub window: Window,
    /// Transient threshold: a frame is transient when its energy exceeds
    /// the running estimate by more than `1 + threshold`.
    pub transient_threshold: f32,
    /// Whether to track formants and preserve them through pitch shifts.
    pub formant_preservation: bool,
    /// Exponential smoothing factor for formant trajectories.
    pub formant_smoothing: f32,
}

impl Default for StretchConfig {
    fn default() -> Self {
        Self {
            window: Window::Hann,
            transient_threshold: 0.5,
            formant_preservation: false,
            formant_smoothing: 0.8,
        }
    }
}

/// The time-stretch / pitch-shift engine.
pub struct TimeStretcher {
    quality: QualityTier,
    config: StretchConfig,
    fft: Fft,
    window_coeffs: Vec<f32>,
    state: StretchState,
    sample_rate: f32,
}

impl TimeStretcher {
    /// Create a stretcher at the default (High) quality tier.
    pub fn new(sample_rate: f32) -> Self {
        Self::with_quality(sample_rate, QualityTier::default())
    }

    /// Create a stretcher at a specific quality tier.
    pub fn with_quality(sample_rate: f32, quality: QualityTier) -> Self {
        let config = StretchConfig::default();
        Self {
            quality,
            fft: Fft::new(quality.window_size()),
            window_coeffs: config.window.coefficients(quality.window_size()),
            config,
            state: StretchState::Idle,
            sample_rate,
        }
    }

    /// Switch quality tiers. Reinitializes every internal buffer.
    pub fn set_quality(&mut self, quality: QualityTier) {
        if quality != self.quality {
            self.quality = quality;
            self.fft = Fft::new(quality.window_size());
            self.window_coeffs = self.config.window.coefficients(quality.window_size());
            self.state = StretchState::Idle;
        }
    }

    /// Current quality tier.
    pub fn quality(&self) -> QualityTier {
        self.quality
    }

    /// Select the analysis window function.
    pub fn set_window(&mut self, window: Window) {
        self.config.window = window;
        self.window_coeffs = window.coefficients(self.quality.window_size());
    }

    /// Enable or disable formant preservation.
    pub fn set_formant_preservation(&mut self, enabled: bool) {
        self.config.formant_preservation = enabled;
    }

    /// Where the last/current operation stands.
    pub fn state(&self) -> StretchState {
        self.state
    }

    /// Stretch and shift a mono buffer.
    ///
    /// `stretch_ratio` scales duration (2.0 = twice as long), independent
    /// of `pitch_ratio` (2.0 = one octave up). Zero-length input returns an
    /// empty buffer; non-positive ratios are rejected before any work.
    pub fn process(
        &mut self,
        input: &[f32],
        stretch_ratio: f32,
        pitch_ratio: f32,
    ) -> Result<Vec<f32>, StretchError> {
        let no_cancel = Arc::new(AtomicBool::new(false));
        self.process_cancellable(input, stretch_ratio, pitch_ratio, &no_cancel)
    }

    /// [`process`](Self::process) with a cancellation token.
    ///
    /// The token is polled between frames; once set, the operation stops,
    /// drops its partial buffers, and reports [`StretchError::Cancelled`].
    pub fn process_cancellable(
        &mut self,
        input: &[f32],
        stretch_ratio: f32,
        pitch_ratio: f32,
        cancel: &Arc<AtomicBool>,
    ) -> Result<Vec<f32>, StretchError> {
        // Validation precedes every state transition.
        if !stretch_ratio.is_finite() || stretch_ratio <= 0.0 {
            self.state = StretchState::Failed;
            return Err(StretchError::InvalidStretchRatio(stretch_ratio));
        }
        if !pitch_ratio.is_finite() || pitch_ratio <= 0.0 {
            self.state = StretchState::Failed;
            return Err(StretchError::InvalidPitchRatio(pitch_ratio));
        }
        if input.is_empty() {
            self.state = StretchState::Done;
            return Ok(Vec::new());
        }

        let result = self.run(input, stretch_ratio, pitch_ratio, cancel);
        self.state = match result {
            Ok(_) => StretchState::Done,
            Err(_) => StretchState::Failed,
        };
        result
    }

    /// Stretch and shift every channel of a decoded buffer.
    pub fn process_buffer(
        &mut self,
        buffer: &PcmBuffer,
        stretch_ratio: f32,
        pitch_ratio: f32,
    ) -> Result<PcmBuffer, StretchError> {
        let mut channels = Vec::with_capacity(buffer.channel_count());
        for channel in &buffer.channels {
            channels.push(self.process(channel, stretch_ratio, pitch_ratio)?);
        }
        Ok(PcmBuffer::new(buffer.sample_rate, channels))
    }

    fn run(
        &mut self,
        input: &[f32],
        stretch_ratio: f32,
        pitch_ratio: f32,
        cancel: &Arc<AtomicBool>,
    ) -> Result<Vec<f32>, StretchError> {
        let window_size = self.quality.window_size();
        let hop = self.quality.hop_size();
        let bins = self.fft.bins();

        // --- Analysis ---
        self.state = StretchState::Analyzing;
        let mut frames = self.analyze(input, cancel)?;
        debug!(
            frames = frames.len(),
            window = window_size,
            hop,
            "analysis complete"
        );

        // --- Stretching: phase coherence ---
        self.state = StretchState::Stretching;
        let mut prev_phases = frames
            .first()
            .map_or_else(|| vec![0.0; bins], |f| f.phases.clone());
        let mut accumulated = prev_phases.clone();
        for (index, frame) in frames.iter_mut().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                return Err(StretchError::Cancelled);
            }
            if index == 0 {
                continue;
            }
            if frame.transient {
                // Attack frames keep their measured phase; the accumulator
                // restarts from them.
                accumulated.copy_from_slice(&frame.phases);
                prev_phases.copy_from_slice(&frame.phases);
                continue;
            }
            for bin in 0..bins {
                // Expected advance of this bin over one analysis hop.
                let expected = 2.0 * PI * bin as f32 * hop as f32 / window_size as f32;
                let mut delta = frame.phases[bin] - prev_phases[bin] - expected;
                // Wrap into [-π, π].
                delta -= 2.0 * PI * libm::roundf(delta / (2.0 * PI));
                // Advance over the (stretched) synthesis hop.
                accumulated[bin] += (expected + delta) * stretch_ratio;
                prev_phases[bin] = frame.phases[bin];
                frame.phases[bin] = accumulated[bin];
            }
        }

        // --- Pitch shifting ---
        if (pitch_ratio - 1.0).abs() > f32::EPSILON {
            self.state = StretchState::PitchShifting;
            for frame in &mut frames {
                if cancel.load(Ordering::Relaxed) {
                    return Err(StretchError::Cancelled);
                }
                self.shift_frame(frame, pitch_ratio, bins);
            }
        }

        // --- Synthesis ---
        self.state = StretchState::Synthesizing;
        let output_len = libm::ceilf(input.len() as f32 * stretch_ratio) as usize;
        let mut output = vec![0.0f32; output_len + window_size];
        let mut window_sum = vec![0.0f32; output_len + window_size];

        for frame in &frames {
            if cancel.load(Ordering::Relaxed) {
                return Err(StretchError::Cancelled);
            }
            let spectrum = polar_to_complex(&frame.magnitudes, &frame.phases);
            let samples = self.fft.inverse(&spectrum);
            let out_pos = libm::roundf(frame.position as f32 * stretch_ratio) as usize;

            for (i, &sample) in samples.iter().enumerate() {
                let w = self.window_coeffs[i];
                output[out_pos + i] += sample * w;
                window_sum[out_pos + i] += w * w;
            }
        }

        // Normalize by accumulated window energy.
        for (sample, &w) in output.iter_mut().zip(&window_sum) {
            if w > 1e-6 {
                *sample /= w;
            }
        }
        output.truncate(output_len);

        info!(
            input_len = input.len(),
            output_len,
            stretch_ratio,
            pitch_ratio,
            "stretch complete"
        );
        Ok(output)
    }

    /// Window and transform each frame, flagging transients and tracking
    /// formants.
    fn analyze(
        &mut self,
        input: &[f32],
        cancel: &Arc<AtomicBool>,
    ) -> Result<Vec<StretchFrame>, StretchError> {
        let window_size = self.quality.window_size();
        let hop = self.quality.hop_size();

        let mut detector = TransientDetector::new(self.config.transient_threshold);
        let mut frames = Vec::new();
        let mut previous_formants: Vec<Formant> = Vec::new();
        let mut scratch = vec![0.0f32; window_size];

        let mut position = 0;
        loop {
            if cancel.load(Ordering::Relaxed) {
                return Err(StretchError::Cancelled);
            }

            let available = input.len().saturating_sub(position);
            if available == 0 && position > 0 {
                break;
            }
            let take = available.min(window_size);
            scratch[..take].copy_from_slice(&input[position..position + take]);
            scratch[take..].fill(0.0);

            let energy = scratch.iter().map(|s| s * s).sum::<f32>() / window_size as f32;
            let transient = detector.observe(energy);

            for (sample, &w) in scratch.iter_mut().zip(&self.window_coeffs) {
                *sample *= w;
            }
            let spectrum = self.fft.forward(&scratch);
            let mags = magnitudes(&spectrum);
            let phs = phases(&spectrum);

            let formants = if self.config.formant_preservation {
                let raw = formant::extract_formants(&mags, self.sample_rate, window_size);
                let smoothed = formant::smooth_trajectories(
                    &previous_formants,
                    &raw,
                    self.config.formant_smoothing,
                );
                previous_formants.clone_from(&smoothed);
                smoothed
            } else {
                Vec::new()
            };

            frames.push(StretchFrame {
                position,
                magnitudes: mags,
                phases: phs,
                transient,
                formants,
            });

            if available <= window_size {
                break;
            }
            position += hop;
        }
        Ok(frames)
    }

    /// Remap a frame's bins by the pitch ratio, preserving formants when
    /// enabled.
    fn shift_frame(&self, frame: &mut StretchFrame, pitch_ratio: f32, bins: usize) {
        let envelope = if self.config.formant_preservation && !frame.formants.is_empty() {
            Some(formant::spectral_envelope(
                &frame.formants,
                bins,
                self.sample_rate,
                self.quality.window_size(),
            ))
        } else {
            None
        };

        // Whiten: remove the envelope so the shift moves excitation only.
        let source_mags: Vec<f32> = match &envelope {
            Some(env) => frame
                .magnitudes
                .iter()
                .zip(env)
                .map(|(&m, &e)| m / e)
                .collect(),
            None => frame.magnitudes.clone(),
        };

        let mut shifted_mags = vec![0.0f32; bins];
        let mut shifted_phases = vec![0.0f32; bins];
        for bin in 0..bins {
            let target = libm::roundf(bin as f32 * pitch_ratio) as usize;
            if target < bins {
                shifted_mags[target] += source_mags[bin];
                shifted_phases[target] = frame.phases[bin] * pitch_ratio;
            }
        }

        // Reapply the original envelope: timbre stays put.
        if let Some(env) = &envelope {
            for (mag, &e) in shifted_mags.iter_mut().zip(env) {
                *mag *= e;
            }
        }

        frame.magnitudes = shifted_mags;
        frame.phases = shifted_phases;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin() * 0.5)
            .collect()
    }

    #[test]
    fn unity_ratios_reproduce_length_exactly() {
        let mut stretcher = TimeStretcher::with_quality(48000.0, QualityTier::Medium);
        let input = sine(440.0, 48000.0, 19997);
        let output = stretcher.process(&input, 1.0, 1.0).unwrap();
        assert_eq!(output.len(), input.len());
        assert_eq!(stretcher.state(), StretchState::Done);
    }

    #[test]
    fn unity_roundtrip_is_near_identity() {
        let mut stretcher = TimeStretcher::with_quality(48000.0, QualityTier::Medium);
        let input = sine(440.0, 48000.0, 24000);
        let output = stretcher.process(&input, 1.0, 1.0).unwrap();

        // Skip the edge windows where overlap coverage is partial.
        let window = QualityTier::Medium.window_size();
        let mut max_err = 0.0f32;
        for i in window..input.len() - window {
            max_err = max_err.max((output[i] - input[i]).abs());
        }
        assert!(max_err < 0.05, "max reconstruction error {max_err}");
    }

    #[test]
    fn double_stretch_doubles_length() {
        let mut stretcher = TimeStretcher::with_quality(48000.0, QualityTier::Low);
        let input = sine(440.0, 48000.0, 10000);
        let output = stretcher.process(&input, 2.0, 1.0).unwrap();
        assert_eq!(output.len(), 20000);
    }

    #[test]
    fn empty_input_returns_empty() {
        let mut stretcher = TimeStretcher::new(48000.0);
        let output = stretcher.process(&[], 1.5, 1.0).unwrap();
        assert!(output.is_empty());
        assert_eq!(stretcher.state(), StretchState::Done);
    }

    #[test]
    fn bad_ratios_rejected_up_front() {
        let mut stretcher = TimeStretcher::new(48000.0);
        let input = sine(440.0, 48000.0, 4096);
        assert_eq!(
            stretcher.process(&input, 0.0, 1.0),
            Err(StretchError::InvalidStretchRatio(0.0))
        );
        assert_eq!(
            stretcher.process(&input, 1.0, -2.0),
            Err(StretchError::InvalidPitchRatio(-2.0))
        );
        assert_eq!(stretcher.state(), StretchState::Failed);
    }

    #[test]
    fn cancellation_discards_partials() {
        let mut stretcher = TimeStretcher::new(48000.0);
        let input = sine(440.0, 48000.0, 48000);
        let cancel = Arc::new(AtomicBool::new(true));
        assert_eq!(
            stretcher.process_cancellable(&input, 1.5, 1.0, &cancel),
            Err(StretchError::Cancelled)
        );
        assert_eq!(stretcher.state(), StretchState::Failed);
    }

    #[test]
    fn pitch_shift_moves_the_peak() {
        let sample_rate = 48000.0;
        let mut stretcher = TimeStretcher::with_quality(sample_rate, QualityTier::Medium);
        let input = sine(500.0, sample_rate, 24000);
        let output = stretcher.process(&input, 1.0, 1.5).unwrap();

        // Measure the dominant frequency of the middle of the output.
        let window = 2048;
        let fft = Fft::new(window);
        let mid = &output[8192..8192 + window];
        let mags = magnitudes(&fft.forward(mid));
        let peak_bin = mags
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap()
            .0;
        let peak_hz = peak_bin as f32 * sample_rate / window as f32;
        assert!(
            (peak_hz - 750.0).abs() < 50.0,
            "expected ~750 Hz, got {peak_hz}"
        );
    }

    #[test]
    fn quality_switch_reinitializes() {
        let mut stretcher = TimeStretcher::with_quality(48000.0, QualityTier::Low);
        assert_eq!(stretcher.quality().window_size(), 1024);
        stretcher.set_quality(QualityTier::Ultra);
        assert_eq!(stretcher.quality().window_size(), 8192);
        assert_eq!(stretcher.state(), StretchState::Idle);

        let input = sine(440.0, 48000.0, 20000);
        let output = stretcher.process(&input, 1.0, 1.0).unwrap();
        assert_eq!(output.len(), 20000);
    }

    #[test]
    fn stereo_buffer_stretches_per_channel() {
        let mut stretcher = TimeStretcher::with_quality(48000.0, QualityTier::Low);
        let buffer = PcmBuffer::stereo(
            48000.0,
            sine(440.0, 48000.0, 8000),
            sine(330.0, 48000.0, 8000),
        );
        let stretched = stretcher.process_buffer(&buffer, 1.25, 1.0).unwrap();
        assert_eq!(stretched.channel_count(), 2);
        assert_eq!(stretched.len(), 10000);
    }
}
