//! Beat roll: captures a division-length slice and loops it while engaged.
//!
//! While idle the roll records the incoming program into a circular capture
//! buffer and passes audio through. Engaging it freezes the most recent
//! division-length slice and replays it until released. The loop length is
//! locked at engage time; tempo changes take effect on the next engage.

use pulso_core::{Effect, ParamDescriptor, ParamUnit, ParameterInfo, NoteDivision};

use crate::kind::{EffectCategory, EffectDescriptor, EffectKind};

/// Longest capturable slice: one bar at 60 BPM.
const MAX_CAPTURE_SECONDS: f32 = 4.0;

/// Static descriptor for the catalog.
pub static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    kind: EffectKind::Roll,
    id: "roll",
    name: "Roll",
    description: "Loops the last beat slice while engaged",
    category: EffectCategory::Dj,
    syncable: true,
    params: &[
        ParamDescriptor::new("Subdivision", "Subdiv", ParamUnit::Beats, 1.0, 4.0, 4.0),
        ParamDescriptor::new("Active", "Active", ParamUnit::Plain, 0.0, 1.0, 0.0),
        ParamDescriptor::new("Mix", "Mix", ParamUnit::Percent, 0.0, 1.0, 1.0),
    ],
};

/// Beat-locked roll.
pub struct Roll {
    capture: [Vec<f32>; 2],
    write_pos: usize,
    loop_len: usize,
    loop_pos: usize,
    active: bool,
    subdivision: f32,
    mix: f32,
    bpm: f32,
    sample_rate: f32,
}

impl Roll {
    /// Create a roll with a 4-second capture buffer.
    pub fn new(sample_rate: f32) -> Self {
        let capacity = (MAX_CAPTURE_SECONDS * sample_rate) as usize;
        Self {
            capture: [vec![0.0; capacity], vec![0.0; capacity]],
            write_pos: 0,
            loop_len: 0,
            loop_pos: 0,
            active: false,
            subdivision: 4.0,
            mix: 1.0,
            bpm: 120.0,
            sample_rate,
        }
    }

    /// Set the beat subdivision of the looped slice.
    pub fn set_subdivision(&mut self, subdivision: f32) {
        self.subdivision = DESCRIPTOR.params[0].clamp(subdivision);
    }

    /// Engage or release the roll.
    pub fn set_active(&mut self, active: bool) {
        if active && !self.active {
            // Freeze the slice length at engage time.
            let division = NoteDivision::from_subdivision(self.subdivision as u32);
            let len = division.to_samples(self.bpm, self.sample_rate) as usize;
            self.loop_len = len.clamp(1, self.capture[0].len());
            self.loop_pos = 0;
        }
        self.active = active;
    }

    /// Whether the roll is engaged.
    pub fn active(&self) -> bool {
        self.active
    }

    /// Set the wet/dry balance.
    pub fn set_mix(&mut self, mix: f32) {
        self.mix = DESCRIPTOR.params[2].clamp(mix);
    }

    #[inline]
    fn looped_sample(&self, channel: usize) -> f32 {
        let capacity = self.capture[channel].len();
        // The slice starts loop_len samples behind the write head.
        let offset = self.loop_len - self.loop_pos;
        let idx = (self.write_pos + capacity - offset) % capacity;
        self.capture[channel][idx]
    }
}

impl Effect for Roll {
    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        if self.active && self.loop_len > 0 {
            let wet_l = self.looped_sample(0);
            let wet_r = self.looped_sample(1);
            self.loop_pos = (self.loop_pos + 1) % self.loop_len;
            (
                left * (1.0 - self.mix) + wet_l * self.mix,
                right * (1.0 - self.mix) + wet_r * self.mix,
            )
        } else {
            let capacity = self.capture[0].len();
            self.write_pos = (self.write_pos + 1) % capacity;
            self.capture[0][self.write_pos] = left;
            self.capture[1][self.write_pos] = right;
            (left, right)
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        let capacity = (MAX_CAPTURE_SECONDS * sample_rate) as usize;
        for channel in &mut self.capture {
            channel.clear();
            channel.resize(capacity, 0.0);
        }
        self.write_pos = 0;
        self.active = false;
    }

    fn reset(&mut self) {
        for channel in &mut self.capture {
            channel.fill(0.0);
        }
        self.write_pos = 0;
        self.loop_pos = 0;
        self.active = false;
    }

    fn set_tempo(&mut self, bpm: f32) {
        // Takes effect on the next engage; an active roll keeps its slice.
        self.bpm = bpm.max(1.0);
    }
}

impl ParameterInfo for Roll {
    fn param_count(&self) -> usize {
        DESCRIPTOR.params.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        DESCRIPTOR.params.get(index).cloned()
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.subdivision,
            1 => f32::from(u8::from(self.active)),
            2 => self.mix,
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.set_subdivision(value),
            1 => self.set_active(value >= 0.5),
            2 => self.set_mix(value),
            _ => {}
        }
    }
}
