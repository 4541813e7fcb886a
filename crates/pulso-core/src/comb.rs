//! Feedback comb filter with damping, for the reverb tail.

use crate::delay_line::DelayLine;
use crate::math::flush_denormal;

/// Comb filter with a one-pole damped feedback path.
///
/// Damping rolls off high frequencies in the feedback loop, imitating air
/// and surface absorption in real rooms. Feedback is limited below 0.99 to
/// keep the loop stable.
#[derive(Debug, Clone)]
pub struct CombFilter {
    delay: DelayLine,
    delay_samples: usize,
    feedback: f32,
    damp: f32,
    filter_state: f32,
}

impl CombFilter {
    /// Create a comb with the given loop length in samples.
    pub fn new(delay_samples: usize) -> Self {
        Self {
            delay: DelayLine::new(delay_samples.max(1)),
            delay_samples: delay_samples.max(1),
            feedback: 0.5,
            damp: 0.5,
            filter_state: 0.0,
        }
    }

    /// Set feedback (decay length). Clamped to [0, 0.99].
    #[inline]
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.99);
    }

    /// Set damping: 0 = bright, 1 = dark. Clamped to [0, 1].
    #[inline]
    pub fn set_damp(&mut self, damp: f32) {
        self.damp = damp.clamp(0.0, 1.0);
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.delay.read_integer(self.delay_samples - 1);
        self.filter_state =
            flush_denormal(output * (1.0 - self.damp) + self.filter_state * self.damp);
        self.delay.write(input + self.filter_state * self.feedback);
        output
    }

    /// Clear the loop and damping state.
    pub fn clear(&mut self) {
        self.delay.clear();
        self.filter_state = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_recirculates() {
        let mut comb = CombFilter::new(10);
        comb.set_feedback(0.5);
        comb.set_damp(0.0);

        let mut outputs = Vec::new();
        outputs.push(comb.process(1.0));
        for _ in 0..30 {
            outputs.push(comb.process(0.0));
        }
        // First echo after the loop length, second at half amplitude.
        assert!(outputs[9].abs() > 0.9, "first echo missing");
        assert!((outputs[19].abs() - 0.5).abs() < 0.1, "decay echo missing");
    }

    #[test]
    fn high_feedback_stays_bounded() {
        let mut comb = CombFilter::new(32);
        comb.set_feedback(2.0); // clamped to 0.99
        for _ in 0..10000 {
            let out = comb.process(0.5);
            assert!(out.is_finite() && out.abs() < 100.0);
        }
    }
}
