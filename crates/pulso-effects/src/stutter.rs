//! Stutter: retriggers the first half of every beat division.
//!
//! Each division period is split in two: the first half passes through
//! while being captured, the second half replays the captured half. At full
//! depth the program audibly "double-hits" every division; lower depths
//! blend the retrigger under the original.

use pulso_core::{Effect, NoteDivision, ParamDescriptor, ParamUnit, ParameterInfo};

use crate::kind::{EffectCategory, EffectDescriptor, EffectKind};

/// Longest half-slice: half a bar at 60 BPM.
const MAX_SLICE_SECONDS: f32 = 2.0;

/// Static descriptor for the catalog.
pub static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    kind: EffectKind::Stutter,
    id: "stutter",
    name: "Stutter",
    description: "Retriggers the first half of each division",
    category: EffectCategory::Dj,
    syncable: true,
    params: &[
        ParamDescriptor::new("Subdivision", "Subdiv", ParamUnit::Beats, 1.0, 4.0, 2.0),
        ParamDescriptor::new("Depth", "Depth", ParamUnit::Percent, 0.0, 1.0, 1.0),
    ],
};

/// Beat-locked stutter.
pub struct Stutter {
    slice: [Vec<f32>; 2],
    period: usize,
    phase: usize,
    subdivision: f32,
    depth: f32,
    bpm: f32,
    sample_rate: f32,
}

impl Stutter {
    /// Create a stutter at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let capacity = (MAX_SLICE_SECONDS * sample_rate) as usize;
        let mut stutter = Self {
            slice: [vec![0.0; capacity], vec![0.0; capacity]],
            period: 1,
            phase: 0,
            subdivision: 2.0,
            depth: 1.0,
            bpm: 120.0,
            sample_rate,
        };
        stutter.reperiod();
        stutter
    }

    /// Set the beat subdivision of the stutter cycle.
    pub fn set_subdivision(&mut self, subdivision: f32) {
        self.subdivision = DESCRIPTOR.params[0].clamp(subdivision);
        self.reperiod();
    }

    /// Set the blend between original (0) and stuttered (1) signal.
    pub fn set_depth(&mut self, depth: f32) {
        self.depth = DESCRIPTOR.params[1].clamp(depth);
    }

    fn reperiod(&mut self) {
        let division = NoteDivision::from_subdivision(self.subdivision as u32);
        let samples = division.to_samples(self.bpm, self.sample_rate) as usize;
        self.period = samples.clamp(2, self.slice[0].len() * 2);
        self.phase = 0;
    }
}

impl Effect for Stutter {
    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let half = self.period / 2;
        let out = if self.phase < half {
            // Capture half: record and pass through.
            self.slice[0][self.phase] = left;
            self.slice[1][self.phase] = right;
            (left, right)
        } else {
            // Replay half.
            let idx = self.phase - half;
            let wet_l = self.slice[0][idx];
            let wet_r = self.slice[1][idx];
            (
                left * (1.0 - self.depth) + wet_l * self.depth,
                right * (1.0 - self.depth) + wet_r * self.depth,
            )
        };
        self.phase = (self.phase + 1) % self.period;
        out
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        let capacity = (MAX_SLICE_SECONDS * sample_rate) as usize;
        for channel in &mut self.slice {
            channel.clear();
            channel.resize(capacity, 0.0);
        }
        self.reperiod();
    }

    fn reset(&mut self) {
        for channel in &mut self.slice {
            channel.fill(0.0);
        }
        self.phase = 0;
    }

    fn set_tempo(&mut self, bpm: f32) {
        self.bpm = bpm.max(1.0);
        self.reperiod();
    }
}

impl ParameterInfo for Stutter {
    fn param_count(&self) -> usize {
        DESCRIPTOR.params.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        DESCRIPTOR.params.get(index).cloned()
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.subdivision,
            1 => self.depth,
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.set_subdivision(value),
            1 => self.set_depth(value),
            _ => {}
        }
    }
}
