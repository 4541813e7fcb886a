//! One-pole lowpass for feedback-path tone shaping.
//!
//! A 6 dB/octave lowpass, one multiply per sample. The delay effect places
//! one of these in its feedback loop so repeats darken the way analog echoes
//! do, and the comb filters use the same structure for damping.

use crate::math::flush_denormal;
use libm::expf;

/// One-pole (6 dB/oct) lowpass filter.
///
/// Difference equation `y[n] = (1 - coeff) * x[n] + coeff * y[n-1]` with
/// `coeff = exp(-2π * cutoff / sample_rate)`, kept in [0, 1) for stability.
#[derive(Debug, Clone)]
pub struct OnePole {
    state: f32,
    coeff: f32,
    cutoff_hz: f32,
    sample_rate: f32,
}

impl OnePole {
    /// Create a lowpass at `cutoff_hz`.
    pub fn new(sample_rate: f32, cutoff_hz: f32) -> Self {
        let mut filter = Self {
            state: 0.0,
            coeff: 0.0,
            cutoff_hz,
            sample_rate,
        };
        filter.recalculate();
        filter
    }

    /// Change the cutoff frequency.
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.cutoff_hz = cutoff_hz.max(10.0);
        self.recalculate();
    }

    /// Current cutoff frequency in Hz.
    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate();
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = flush_denormal((1.0 - self.coeff) * input + self.coeff * self.state);
        self.state
    }

    /// Clear the filter state.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }

    fn recalculate(&mut self) {
        let nyquist = self.sample_rate * 0.5;
        let clamped = self.cutoff_hz.clamp(10.0, nyquist - 1.0);
        self.coeff = expf(-2.0 * core::f32::consts::PI * clamped / self.sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_passes() {
        let mut lp = OnePole::new(48000.0, 1000.0);
        let mut out = 0.0;
        for _ in 0..5000 {
            out = lp.process(1.0);
        }
        assert!((out - 1.0).abs() < 0.01);
    }

    #[test]
    fn attenuates_instantly_changing_input() {
        let mut lp = OnePole::new(48000.0, 200.0);
        let first = lp.process(1.0);
        assert!(first < 0.2, "got {first}");
    }
}
