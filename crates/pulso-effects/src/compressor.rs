//! Program compressor with linked stereo detection.

use pulso_core::{
    Effect, EnvelopeFollower, ParamDescriptor, ParamUnit, ParameterInfo, SmoothedParam,
    db_to_linear, linear_to_db,
};

use crate::kind::{EffectCategory, EffectDescriptor, EffectKind};

/// Static descriptor for the catalog.
pub static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    kind: EffectKind::Compressor,
    id: "compressor",
    name: "Compressor",
    description: "Feed-forward compressor with linked stereo detection",
    category: EffectCategory::Dynamics,
    syncable: false,
    params: &[
        ParamDescriptor::new("Threshold", "Thresh", ParamUnit::Decibels, -60.0, 0.0, -18.0),
        ParamDescriptor::new("Ratio", "Ratio", ParamUnit::Ratio, 1.0, 20.0, 4.0),
        ParamDescriptor::new("Attack", "Attack", ParamUnit::Milliseconds, 0.1, 100.0, 10.0),
        ParamDescriptor::new(
            "Release",
            "Release",
            ParamUnit::Milliseconds,
            10.0,
            1000.0,
            100.0,
        ),
        ParamDescriptor::new("Makeup", "Makeup", ParamUnit::Decibels, 0.0, 24.0, 0.0),
    ],
};

/// Feed-forward compressor.
///
/// Signal flow: envelope follower → static gain curve → gain reduction →
/// makeup. Detection runs on the mid signal `(L + R) / 2` so both channels
/// get identical gain and the stereo image cannot shift.
#[derive(Debug, Clone)]
pub struct Compressor {
    envelope: EnvelopeFollower,
    threshold_db: f32,
    ratio: f32,
    makeup: SmoothedParam,
    last_reduction_db: f32,
}

impl Compressor {
    /// Create a compressor with default settings.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            envelope: EnvelopeFollower::new(sample_rate, 10.0, 100.0),
            threshold_db: -18.0,
            ratio: 4.0,
            makeup: SmoothedParam::fast(1.0, sample_rate),
            last_reduction_db: 0.0,
        }
    }

    /// Set the threshold in dB.
    pub fn set_threshold_db(&mut self, threshold_db: f32) {
        self.threshold_db = DESCRIPTOR.params[0].clamp(threshold_db);
    }

    /// Set the compression ratio.
    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = DESCRIPTOR.params[1].clamp(ratio);
    }

    /// Set the attack time in milliseconds.
    pub fn set_attack_ms(&mut self, attack_ms: f32) {
        self.envelope
            .set_attack_ms(DESCRIPTOR.params[2].clamp(attack_ms));
    }

    /// Set the release time in milliseconds.
    pub fn set_release_ms(&mut self, release_ms: f32) {
        self.envelope
            .set_release_ms(DESCRIPTOR.params[3].clamp(release_ms));
    }

    /// Set the makeup gain in dB.
    pub fn set_makeup_db(&mut self, makeup_db: f32) {
        self.makeup
            .set_target(db_to_linear(DESCRIPTOR.params[4].clamp(makeup_db)));
    }

    /// Last computed gain reduction in dB (non-positive).
    pub fn gain_reduction_db(&self) -> f32 {
        self.last_reduction_db
    }

    /// Static curve: gain change in dB for a detector level in dB.
    #[inline]
    fn compute_gain_db(&self, level_db: f32) -> f32 {
        let overshoot = level_db - self.threshold_db;
        if overshoot <= 0.0 {
            0.0
        } else {
            -(overshoot * (1.0 - 1.0 / self.ratio))
        }
    }
}

impl Effect for Compressor {
    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let mid = (left + right) * 0.5;
        let level = self.envelope.process(mid);
        let reduction_db = self.compute_gain_db(linear_to_db(level));
        self.last_reduction_db = reduction_db;
        let gain = db_to_linear(reduction_db) * self.makeup.advance();
        (left * gain, right * gain)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.envelope.set_sample_rate(sample_rate);
        self.makeup.set_sample_rate(sample_rate);
    }

    fn reset(&mut self) {
        self.envelope.reset();
        self.makeup.snap_to_target();
        self.last_reduction_db = 0.0;
    }
}

impl ParameterInfo for Compressor {
    fn param_count(&self) -> usize {
        DESCRIPTOR.params.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        DESCRIPTOR.params.get(index).cloned()
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.threshold_db,
            1 => self.ratio,
            2 => self.envelope.attack_ms(),
            3 => self.envelope.release_ms(),
            4 => linear_to_db(self.makeup.target()),
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.set_threshold_db(value),
            1 => self.set_ratio(value),
            2 => self.set_attack_ms(value),
            3 => self.set_release_ms(value),
            4 => self.set_makeup_db(value),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loud_signal_is_reduced() {
        let mut comp = Compressor::new(48000.0);
        comp.set_threshold_db(-20.0);
        comp.set_ratio(4.0);
        comp.set_attack_ms(1.0);

        let mut out = (0.0, 0.0);
        for _ in 0..2000 {
            out = comp.process_stereo(0.5, 0.5);
        }
        assert!(out.0.abs() < 0.5, "expected reduction, got {}", out.0);
        assert!(comp.gain_reduction_db() < -1.0);
    }

    #[test]
    fn quiet_signal_passes_unchanged() {
        let mut comp = Compressor::new(48000.0);
        comp.set_threshold_db(-6.0);
        let mut out = (0.0, 0.0);
        for _ in 0..2000 {
            out = comp.process_stereo(0.1, 0.1);
        }
        assert!((out.0 - 0.1).abs() < 0.01);
        assert_eq!(comp.gain_reduction_db(), 0.0);
    }

    #[test]
    fn channels_get_identical_gain() {
        let mut comp = Compressor::new(48000.0);
        comp.set_threshold_db(-30.0);
        comp.set_attack_ms(0.5);
        for _ in 0..2000 {
            let (l, r) = comp.process_stereo(0.8, 0.2);
            // Same gain on both sides preserves the 4:1 channel ratio.
            if r.abs() > 1e-9 {
                assert!((l / r - 4.0).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn output_always_finite() {
        let mut comp = Compressor::new(48000.0);
        comp.set_param(0, f32::NAN); // clamped to default by descriptor
        for _ in 0..100 {
            let (l, r) = comp.process_stereo(1.0, -1.0);
            assert!(l.is_finite() && r.is_finite());
        }
    }
}
