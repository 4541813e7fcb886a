//! The core [`Effect`] trait implemented by every audio processor.
//!
//! Pulso processes stereo program material, so the trait is stereo-first:
//! [`Effect::process_stereo`] is the required method and the mono entry point
//! is derived from it. Block methods have default per-sample implementations
//! that effects override when a tighter loop matters.
//!
//! The trait is object-safe; chains store `Box<dyn Effect + Send>` so the
//! catalog can hand processors across the control/render boundary.

/// Object-safe trait for all audio effects.
///
/// Implementations must be real-time safe: no allocation, no locking, no I/O
/// inside any `process` method. Pathological parameter values are clamped at
/// the setter, so processing never produces NaN or infinite samples.
pub trait Effect {
    /// Process one stereo sample pair.
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32);

    /// Process one mono sample.
    ///
    /// Default feeds the sample to both channels and returns the left output.
    fn process(&mut self, input: f32) -> f32 {
        self.process_stereo(input, input).0
    }

    /// Process a block of stereo samples in-place.
    ///
    /// Both slices must have the same length.
    fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            (*l, *r) = self.process_stereo(*l, *r);
        }
    }

    /// Update the sample rate.
    ///
    /// Effects recalculate any rate-dependent coefficients here (filter
    /// coefficients, delay times in samples, envelope time constants).
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Clear internal state (delay lines, filter history) without changing
    /// parameters. Called on transport stops and effect resets to prevent
    /// stale audio from leaking into the next pass.
    fn reset(&mut self);

    /// Processing latency in samples. Most effects report 0.
    fn latency_samples(&self) -> usize {
        0
    }

    /// Called when the global tempo changes, for BPM-synced effects.
    ///
    /// Synced effects recompute their time-domain parameters from the new
    /// beat length, applying the change through their smoothed ramps. The
    /// default is a no-op for unsynced effects.
    fn set_tempo(&mut self, _bpm: f32) {}

    /// Toggle tempo following on a syncable effect.
    ///
    /// Default is a no-op; effects whose timing is inherently beat-locked
    /// (rolls, stutters) ignore it as well.
    fn set_sync(&mut self, _synced: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Gain(f32);

    impl Effect for Gain {
        fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
            (left * self.0, right * self.0)
        }
        fn set_sample_rate(&mut self, _: f32) {}
        fn reset(&mut self) {}
    }

    #[test]
    fn mono_derives_from_stereo() {
        let mut gain = Gain(2.0);
        assert_eq!(gain.process(0.5), 1.0);
    }

    #[test]
    fn block_matches_per_sample() {
        let mut gain = Gain(3.0);
        let mut left = [1.0, 2.0];
        let mut right = [0.5, 0.25];
        gain.process_block(&mut left, &mut right);
        assert_eq!(left, [3.0, 6.0]);
        assert_eq!(right, [1.5, 0.75]);
    }
}
