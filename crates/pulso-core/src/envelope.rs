//! Amplitude envelope follower for dynamics processing.

use libm::expf;

/// Peak envelope follower with independent attack and release times.
///
/// Coefficients use the standard one-pole time constant
/// `exp(-1 / (time_seconds * sample_rate))`; the follower charges towards a
/// rising input at the attack rate and discharges at the release rate.
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
    attack_ms: f32,
    release_ms: f32,
    sample_rate: f32,
}

impl EnvelopeFollower {
    /// Create a follower with the given times.
    pub fn new(sample_rate: f32, attack_ms: f32, release_ms: f32) -> Self {
        let mut follower = Self {
            envelope: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            attack_ms: attack_ms.max(0.1),
            release_ms: release_ms.max(1.0),
            sample_rate,
        };
        follower.recalculate();
        follower
    }

    /// Set attack time in milliseconds (clamped to ≥ 0.1 ms).
    pub fn set_attack_ms(&mut self, attack_ms: f32) {
        self.attack_ms = attack_ms.max(0.1);
        self.recalculate();
    }

    /// Set release time in milliseconds (clamped to ≥ 1 ms).
    pub fn set_release_ms(&mut self, release_ms: f32) {
        self.release_ms = release_ms.max(1.0);
        self.recalculate();
    }

    /// Current attack time in milliseconds.
    pub fn attack_ms(&self) -> f32 {
        self.attack_ms
    }

    /// Current release time in milliseconds.
    pub fn release_ms(&self) -> f32 {
        self.release_ms
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate();
    }

    /// Track one sample; returns the envelope level (non-negative).
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let rectified = input.abs();
        let coeff = if rectified > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = coeff * self.envelope + (1.0 - coeff) * rectified;
        self.envelope
    }

    /// Current level without processing.
    pub fn level(&self) -> f32 {
        self.envelope
    }

    /// Discharge the envelope to zero.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    fn recalculate(&mut self) {
        self.attack_coeff = expf(-1.0 / (self.attack_ms * 1e-3 * self.sample_rate));
        self.release_coeff = expf(-1.0 / (self.release_ms * 1e-3 * self.sample_rate));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charges_towards_steady_input() {
        let mut env = EnvelopeFollower::new(48000.0, 1.0, 100.0);
        let mut level = 0.0;
        for _ in 0..500 {
            level = env.process(1.0);
        }
        assert!(level > 0.9, "got {level}");
    }

    #[test]
    fn discharges_after_silence() {
        let mut env = EnvelopeFollower::new(48000.0, 1.0, 10.0);
        for _ in 0..500 {
            env.process(1.0);
        }
        let mut level = 0.0;
        for _ in 0..1000 {
            level = env.process(0.0);
        }
        assert!(level < 0.15, "got {level}");
    }

    #[test]
    fn rectifies_negative_input() {
        let mut env = EnvelopeFollower::new(48000.0, 1.0, 100.0);
        assert!(env.process(-0.8) > 0.0);
    }
}
