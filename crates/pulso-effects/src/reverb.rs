//! Algorithmic reverb tail.
//!
//! Schroeder topology: eight parallel damped combs into four series
//! allpasses per channel. The right channel's loop lengths are offset by a
//! fixed stereo spread so the tail decorrelates without a second tuning
//! table.

use pulso_core::{
    AllpassFilter, CombFilter, Effect, ParamDescriptor, ParamUnit, ParameterInfo, SmoothedParam,
};

use crate::kind::{EffectCategory, EffectDescriptor, EffectKind};

/// Comb loop lengths at the 44.1 kHz reference rate; mutually prime to
/// avoid stacked resonances.
const COMB_TUNINGS_44K: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];

/// Allpass loop lengths at the reference rate.
const ALLPASS_TUNINGS_44K: [usize; 4] = [556, 441, 341, 225];

/// Right-channel offset in samples, from the Freeverb stereo spread.
const STEREO_SPREAD: usize = 23;

const REFERENCE_RATE: f32 = 44100.0;

/// Feedback = ROOM_OFFSET + room_size * ROOM_SCALE.
const ROOM_SCALE: f32 = 0.28;
const ROOM_OFFSET: f32 = 0.7;

/// Static descriptor for the catalog.
pub static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    kind: EffectKind::Reverb,
    id: "reverb",
    name: "Reverb",
    description: "Comb/allpass algorithmic room",
    category: EffectCategory::Time,
    syncable: false,
    params: &[
        ParamDescriptor::new("Room Size", "Room", ParamUnit::Percent, 0.0, 1.0, 0.5),
        ParamDescriptor::new("Damping", "Damp", ParamUnit::Percent, 0.0, 1.0, 0.5),
        ParamDescriptor::new("Mix", "Mix", ParamUnit::Percent, 0.0, 1.0, 0.3),
    ],
};

fn scale_to_rate(samples: usize, target_rate: f32) -> usize {
    ((samples as f32 * target_rate / REFERENCE_RATE).round() as usize).max(1)
}

/// Algorithmic reverb.
pub struct Reverb {
    combs: [[CombFilter; 8]; 2],
    allpasses: [[AllpassFilter; 4]; 2],
    room_size: f32,
    damping: f32,
    mix: SmoothedParam,
    sample_rate: f32,
}

impl Reverb {
    /// Create a reverb at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let build_combs = |offset: usize| {
            core::array::from_fn(|i| {
                CombFilter::new(scale_to_rate(COMB_TUNINGS_44K[i] + offset, sample_rate))
            })
        };
        let build_allpasses = |offset: usize| {
            core::array::from_fn(|i| {
                let mut ap =
                    AllpassFilter::new(scale_to_rate(ALLPASS_TUNINGS_44K[i] + offset, sample_rate));
                ap.set_feedback(0.5);
                ap
            })
        };

        let mut reverb = Self {
            combs: [build_combs(0), build_combs(STEREO_SPREAD)],
            allpasses: [build_allpasses(0), build_allpasses(STEREO_SPREAD)],
            room_size: 0.5,
            damping: 0.5,
            mix: SmoothedParam::fast(0.3, sample_rate),
            sample_rate,
        };
        reverb.update_loops();
        reverb
    }

    /// Set the room size (tail length).
    pub fn set_room_size(&mut self, room_size: f32) {
        self.room_size = DESCRIPTOR.params[0].clamp(room_size);
        self.update_loops();
    }

    /// Set high-frequency damping.
    pub fn set_damping(&mut self, damping: f32) {
        self.damping = DESCRIPTOR.params[1].clamp(damping);
        self.update_loops();
    }

    /// Set wet/dry balance of this instance.
    pub fn set_mix(&mut self, mix: f32) {
        self.mix.set_target(DESCRIPTOR.params[2].clamp(mix));
    }

    fn update_loops(&mut self) {
        let feedback = ROOM_OFFSET + self.room_size * ROOM_SCALE;
        for channel in &mut self.combs {
            for comb in channel {
                comb.set_feedback(feedback);
                comb.set_damp(self.damping);
            }
        }
    }
}

impl Effect for Reverb {
    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let mix = self.mix.advance();
        // Mono drive into both tails keeps the input image stable.
        let input = (left + right) * 0.5 * 0.015;

        let mut wet = [0.0f32; 2];
        for ch in 0..2 {
            for comb in &mut self.combs[ch] {
                wet[ch] += comb.process(input);
            }
            for allpass in &mut self.allpasses[ch] {
                wet[ch] = allpass.process(wet[ch]);
            }
        }

        (
            left * (1.0 - mix) + wet[0] * mix,
            right * (1.0 - mix) + wet[1] * mix,
        )
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        if (sample_rate - self.sample_rate).abs() < f32::EPSILON {
            return;
        }
        // Loop lengths are rate-dependent; rebuild at the new rate.
        *self = {
            let mut fresh = Reverb::new(sample_rate);
            fresh.room_size = self.room_size;
            fresh.damping = self.damping;
            fresh.mix = SmoothedParam::fast(self.mix.target(), sample_rate);
            fresh.update_loops();
            fresh
        };
    }

    fn reset(&mut self) {
        for channel in &mut self.combs {
            for comb in channel {
                comb.clear();
            }
        }
        for channel in &mut self.allpasses {
            for allpass in channel {
                allpass.clear();
            }
        }
        self.mix.snap_to_target();
    }
}

impl ParameterInfo for Reverb {
    fn param_count(&self) -> usize {
        DESCRIPTOR.params.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        DESCRIPTOR.params.get(index).cloned()
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.room_size,
            1 => self.damping,
            2 => self.mix.target(),
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.set_room_size(value),
            1 => self.set_damping(value),
            2 => self.set_mix(value),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_produces_a_tail() {
        let mut reverb = Reverb::new(48000.0);
        reverb.set_mix(1.0);
        reverb.reset();

        reverb.process_stereo(1.0, 1.0);
        let mut energy_early = 0.0;
        let mut energy_late = 0.0;
        for i in 0..48000 {
            let (l, r) = reverb.process_stereo(0.0, 0.0);
            let e = l * l + r * r;
            if i < 4800 {
                energy_early += e;
            } else if i > 24000 {
                energy_late += e;
            }
        }
        assert!(energy_early > 0.0, "no early reflections");
        assert!(energy_late < energy_early, "tail must decay");
    }

    #[test]
    fn dry_mix_passes_input() {
        let mut reverb = Reverb::new(48000.0);
        reverb.set_mix(0.0);
        reverb.reset();
        let (l, r) = reverb.process_stereo(0.5, -0.5);
        assert!((l - 0.5).abs() < 1e-6);
        assert!((r + 0.5).abs() < 1e-6);
    }

    #[test]
    fn output_stays_finite_at_max_room() {
        let mut reverb = Reverb::new(48000.0);
        reverb.set_room_size(1.0);
        reverb.set_mix(1.0);
        for _ in 0..48000 {
            let (l, r) = reverb.process_stereo(0.9, 0.9);
            assert!(l.is_finite() && r.is_finite());
        }
    }
}
