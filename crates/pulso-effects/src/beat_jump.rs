//! Beat jump: replays the stream from a whole number of beats back.
//!
//! Engaged, the output is the program delayed by exactly N beats, the
//! listener hears the track "jump back" and replay. Released, the output
//! snaps back to the live stream. The jump length re-quantizes on tempo
//! changes so it stays beat-exact.

use pulso_core::{DelayLine, Effect, ParamDescriptor, ParamUnit, ParameterInfo};

use crate::kind::{EffectCategory, EffectDescriptor, EffectKind};

/// Longest jump: 8 beats at 60 BPM.
const MAX_JUMP_SECONDS: f32 = 8.0;

/// Static descriptor for the catalog.
pub static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    kind: EffectKind::BeatJump,
    id: "beat_jump",
    name: "Beat Jump",
    description: "Replays from a whole number of beats back",
    category: EffectCategory::Dj,
    syncable: true,
    params: &[
        ParamDescriptor::new("Beats", "Beats", ParamUnit::Beats, 1.0, 8.0, 4.0),
        ParamDescriptor::new("Active", "Active", ParamUnit::Plain, 0.0, 1.0, 0.0),
    ],
};

/// Beat-exact jump-back replay.
pub struct BeatJump {
    line: [DelayLine; 2],
    beats: f32,
    active: bool,
    bpm: f32,
    sample_rate: f32,
}

impl BeatJump {
    /// Create a beat jump with an 8-second history.
    pub fn new(sample_rate: f32) -> Self {
        let capacity = (MAX_JUMP_SECONDS * sample_rate) as usize;
        Self {
            line: [DelayLine::new(capacity), DelayLine::new(capacity)],
            beats: 4.0,
            active: false,
            bpm: 120.0,
            sample_rate,
        }
    }

    /// Set the jump length in beats.
    pub fn set_beats(&mut self, beats: f32) {
        self.beats = DESCRIPTOR.params[0].clamp(beats).round();
    }

    /// Engage or release the jump.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn jump_samples(&self) -> f32 {
        let beat_samples = 60.0 / self.bpm * self.sample_rate;
        (self.beats * beat_samples).min((self.line[0].capacity() - 1) as f32)
    }
}

impl Effect for BeatJump {
    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        // History records continuously so a jump is always available.
        self.line[0].write(left);
        self.line[1].write(right);

        if self.active {
            let jump = self.jump_samples();
            (self.line[0].read(jump), self.line[1].read(jump))
        } else {
            (left, right)
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        let capacity = (MAX_JUMP_SECONDS * sample_rate) as usize;
        self.line = [DelayLine::new(capacity), DelayLine::new(capacity)];
    }

    fn reset(&mut self) {
        for line in &mut self.line {
            line.clear();
        }
        self.active = false;
    }

    fn set_tempo(&mut self, bpm: f32) {
        self.bpm = bpm.max(1.0);
    }
}

impl ParameterInfo for BeatJump {
    fn param_count(&self) -> usize {
        DESCRIPTOR.params.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        DESCRIPTOR.params.get(index).cloned()
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.beats,
            1 => f32::from(u8::from(self.active)),
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.set_beats(value),
            1 => self.set_active(value >= 0.5),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engaged_jump_outputs_past_audio() {
        let mut jump = BeatJump::new(48000.0);
        jump.set_tempo(120.0);
        jump.set_beats(1.0); // 1 beat = 24000 samples

        for i in 0..48000 {
            jump.process_stereo(i as f32, 0.0);
        }
        jump.set_active(true);
        let (l, _) = jump.process_stereo(48000.0, 0.0);
        // One beat back from the newest sample.
        assert!((l - 24000.0).abs() <= 1.5, "got {l}");
    }

    #[test]
    fn released_jump_is_live() {
        let mut jump = BeatJump::new(48000.0);
        for i in 0..1000 {
            jump.process_stereo(i as f32, 0.0);
        }
        let (l, _) = jump.process_stereo(7.5, 0.0);
        assert_eq!(l, 7.5);
    }
}
