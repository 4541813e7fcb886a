//! Multi-tap echo, BPM-syncable.
//!
//! Three taps at 1×, 2×, and 3× the base time with decaying gains. Where
//! the plain delay is a single recirculating loop, the echo lays out its
//! repeats explicitly, which keeps them rhythmically exact at any feedback
//! setting.

use pulso_core::{
    DelayLine, Effect, NoteDivision, ParamDescriptor, ParamUnit, ParameterInfo, SmoothedParam,
};

use crate::kind::{EffectCategory, EffectDescriptor, EffectKind};

const MAX_TAP_MS: f32 = 1000.0;
const TAP_COUNT: usize = 3;

/// Static descriptor for the catalog.
pub static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    kind: EffectKind::Echo,
    id: "echo",
    name: "Echo",
    description: "Three-tap echo with decaying repeats",
    category: EffectCategory::Time,
    syncable: true,
    params: &[
        ParamDescriptor::new("Time", "Time", ParamUnit::Milliseconds, 10.0, 1000.0, 250.0),
        ParamDescriptor::new("Decay", "Decay", ParamUnit::Percent, 0.1, 0.9, 0.5),
        ParamDescriptor::new("Subdivision", "Subdiv", ParamUnit::Beats, 1.0, 4.0, 2.0),
        ParamDescriptor::new("Mix", "Mix", ParamUnit::Percent, 0.0, 1.0, 0.5),
    ],
};

/// Multi-tap echo.
#[derive(Debug, Clone)]
pub struct Echo {
    line: [DelayLine; 2],
    tap_samples: SmoothedParam,
    decay: f32,
    mix: SmoothedParam,
    time_ms: f32,
    subdivision: f32,
    synced: bool,
    bpm: f32,
    sample_rate: f32,
}

impl Echo {
    /// Create an echo with a 1-second base-tap ceiling.
    pub fn new(sample_rate: f32) -> Self {
        // Capacity covers the furthest tap (3x the base time).
        let capacity = (MAX_TAP_MS * TAP_COUNT as f32 * 1e-3 * sample_rate) as usize + 1;
        Self {
            line: [DelayLine::new(capacity), DelayLine::new(capacity)],
            tap_samples: SmoothedParam::slow(250.0 * 1e-3 * sample_rate, sample_rate),
            decay: 0.5,
            mix: SmoothedParam::fast(0.5, sample_rate),
            time_ms: 250.0,
            subdivision: 2.0,
            synced: false,
            bpm: 120.0,
            sample_rate,
        }
    }

    /// Set the base tap time in milliseconds (ignored while synced).
    pub fn set_time_ms(&mut self, time_ms: f32) {
        self.time_ms = DESCRIPTOR.params[0].clamp(time_ms);
        if !self.synced {
            self.retime();
        }
    }

    /// Set the per-tap decay factor.
    pub fn set_decay(&mut self, decay: f32) {
        self.decay = DESCRIPTOR.params[1].clamp(decay);
    }

    /// Set the beat subdivision used while synced.
    pub fn set_subdivision(&mut self, subdivision: f32) {
        self.subdivision = DESCRIPTOR.params[2].clamp(subdivision);
        if self.synced {
            self.retime();
        }
    }

    /// Set the wet/dry balance of this instance.
    pub fn set_mix(&mut self, mix: f32) {
        self.mix.set_target(DESCRIPTOR.params[3].clamp(mix));
    }

    /// Enable or disable BPM sync.
    pub fn set_synced(&mut self, synced: bool) {
        self.synced = synced;
        self.retime();
    }

    fn effective_ms(&self) -> f32 {
        if self.synced {
            NoteDivision::from_subdivision(self.subdivision as u32)
                .to_ms(self.bpm)
                .min(MAX_TAP_MS)
        } else {
            self.time_ms
        }
    }

    fn retime(&mut self) {
        self.tap_samples
            .set_target(self.effective_ms() * 1e-3 * self.sample_rate);
    }
}

impl Effect for Echo {
    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let base = self.tap_samples.advance();
        let mix = self.mix.advance();

        let mut wet_l = 0.0;
        let mut wet_r = 0.0;
        let mut gain = self.decay;
        for tap in 1..=TAP_COUNT {
            let delay = base * tap as f32;
            wet_l += self.line[0].read(delay) * gain;
            wet_r += self.line[1].read(delay) * gain;
            gain *= self.decay;
        }

        self.line[0].write(left);
        self.line[1].write(right);

        (
            left * (1.0 - mix) + wet_l * mix,
            right * (1.0 - mix) + wet_r * mix,
        )
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.tap_samples.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.retime();
    }

    fn reset(&mut self) {
        for line in &mut self.line {
            line.clear();
        }
        self.tap_samples.snap_to_target();
        self.mix.snap_to_target();
    }

    fn set_tempo(&mut self, bpm: f32) {
        self.bpm = bpm.max(1.0);
        if self.synced {
            self.retime();
        }
    }

    fn set_sync(&mut self, synced: bool) {
        self.set_synced(synced);
    }
}

impl ParameterInfo for Echo {
    fn param_count(&self) -> usize {
        DESCRIPTOR.params.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        DESCRIPTOR.params.get(index).cloned()
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.time_ms,
            1 => self.decay,
            2 => self.subdivision,
            3 => self.mix.target(),
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.set_time_ms(value),
            1 => self.set_decay(value),
            2 => self.set_subdivision(value),
            3 => self.set_mix(value),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_taps_with_decaying_gain() {
        let sr = 48000.0;
        let mut echo = Echo::new(sr);
        echo.set_time_ms(10.0); // 480 samples
        echo.set_decay(0.5);
        echo.set_mix(1.0);
        echo.reset();

        echo.process_stereo(1.0, 1.0);
        let mut peaks = Vec::new();
        for _ in 0..2000 {
            let (l, _) = echo.process_stereo(0.0, 0.0);
            peaks.push(l);
        }

        let near = |idx: usize| -> f32 {
            peaks[idx.saturating_sub(2)..(idx + 2).min(peaks.len())]
                .iter()
                .fold(0.0f32, |a, &b| a.max(b.abs()))
        };
        assert!((near(479) - 0.5).abs() < 0.05, "tap 1: {}", near(479));
        assert!((near(959) - 0.25).abs() < 0.05, "tap 2: {}", near(959));
        assert!((near(1439) - 0.125).abs() < 0.05, "tap 3: {}", near(1439));
    }

    #[test]
    fn sync_follows_tempo() {
        let mut echo = Echo::new(48000.0);
        echo.set_synced(true);
        echo.set_subdivision(1.0);
        echo.set_tempo(60.0); // quarter = 1000ms, clamped to MAX_TAP_MS
        assert!((echo.effective_ms() - 1000.0).abs() < 0.1);
        echo.set_tempo(120.0);
        assert!((echo.effective_ms() - 500.0).abs() < 0.1);
    }
}
