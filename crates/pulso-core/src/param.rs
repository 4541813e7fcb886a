//! Smoothed parameters for click-free changes.
//!
//! Every audible parameter in Pulso ramps instead of jumping: wet/dry gains,
//! BPM-sync retimes, master gain and pan. [`SmoothedParam`] implements the
//! one-pole exponential ramp used throughout the engine.

use libm::expf;

/// A parameter value that approaches its target exponentially.
///
/// The ramp is a one-pole lowpass on the target:
/// `y[n] = y[n-1] + coeff * (target - y[n-1])` with
/// `coeff = 1 - exp(-1 / (tau * sample_rate))` where `tau` is the smoothing
/// time. After five time constants the value is within 1% of the target.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
    sample_rate: f32,
    smoothing_ms: f32,
}

impl SmoothedParam {
    /// Create a parameter with the given initial value and smoothing time.
    pub fn new(initial: f32, sample_rate: f32, smoothing_ms: f32) -> Self {
        let mut param = Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate,
            smoothing_ms,
        };
        param.recalculate();
        param
    }

    /// A fast ramp (5 ms) suitable for gain changes.
    pub fn fast(initial: f32, sample_rate: f32) -> Self {
        Self::new(initial, sample_rate, 5.0)
    }

    /// A slower ramp (50 ms) suitable for retiming synced delays without
    /// audible pitch artifacts.
    pub fn slow(initial: f32, sample_rate: f32) -> Self {
        Self::new(initial, sample_rate, 50.0)
    }

    /// Set the value the parameter ramps towards.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Set the value and skip the ramp.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Current smoothed value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// The ramp target.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Jump the current value to the target.
    #[inline]
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    /// True once the ramp has effectively reached the target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < 1e-6
    }

    /// Update the sample rate, preserving the smoothing time.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate();
    }

    fn recalculate(&mut self) {
        if self.smoothing_ms <= 0.0 || self.sample_rate <= 0.0 {
            self.coeff = 1.0;
        } else {
            let samples_per_tau = self.smoothing_ms * 1e-3 * self.sample_rate;
            self.coeff = 1.0 - expf(-1.0 / samples_per_tau);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_smoothing_snaps() {
        let mut param = SmoothedParam::new(1.0, 48000.0, 0.0);
        param.set_target(0.25);
        assert!((param.advance() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn converges_within_five_time_constants() {
        let mut param = SmoothedParam::new(0.0, 48000.0, 10.0);
        param.set_target(1.0);
        for _ in 0..(48000 / 20) {
            param.advance();
        }
        assert!((param.get() - 1.0).abs() < 0.01, "got {}", param.get());
    }

    #[test]
    fn one_time_constant_is_63_percent() {
        let mut param = SmoothedParam::new(0.0, 48000.0, 10.0);
        param.set_target(1.0);
        for _ in 0..480 {
            param.advance();
        }
        let expected = 1.0 - expf(-1.0);
        assert!((param.get() - expected).abs() < 0.05);
    }

    #[test]
    fn snap_settles() {
        let mut param = SmoothedParam::fast(0.0, 48000.0);
        param.set_target(1.0);
        assert!(!param.is_settled());
        param.snap_to_target();
        assert!(param.is_settled());
    }
}
