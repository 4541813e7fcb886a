//! Feedback delay with damped repeats, BPM-syncable.
//!
//! The feedback path runs through a one-pole lowpass so each repeat is
//! darker than the last, the way analog echoes decay. When BPM sync is on,
//! the delay time follows `beat length / subdivision` and tempo changes
//! ramp the time smoothly instead of jumping, so a tempo nudge never
//! clicks.

use pulso_core::{
    DelayLine, Effect, NoteDivision, OnePole, ParamDescriptor, ParamUnit, ParameterInfo,
    SmoothedParam, flush_denormal,
};

use crate::kind::{EffectCategory, EffectDescriptor, EffectKind};

const MAX_DELAY_MS: f32 = 2000.0;

/// Static descriptor for the catalog.
pub static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    kind: EffectKind::Delay,
    id: "delay",
    name: "Delay",
    description: "Feedback delay with damped repeats",
    category: EffectCategory::Time,
    syncable: true,
    params: &[
        ParamDescriptor::new("Time", "Time", ParamUnit::Milliseconds, 1.0, 2000.0, 300.0),
        ParamDescriptor::new("Feedback", "Fdbk", ParamUnit::Percent, 0.0, 0.95, 0.4),
        ParamDescriptor::new("Tone", "Tone", ParamUnit::Hertz, 500.0, 16000.0, 6000.0),
        ParamDescriptor::new("Subdivision", "Subdiv", ParamUnit::Beats, 1.0, 4.0, 2.0),
        ParamDescriptor::new("Mix", "Mix", ParamUnit::Percent, 0.0, 1.0, 0.5),
    ],
};

/// Feedback delay.
#[derive(Debug, Clone)]
pub struct SyncDelay {
    line: [DelayLine; 2],
    tone: [OnePole; 2],
    time_samples: SmoothedParam,
    feedback: SmoothedParam,
    mix: SmoothedParam,
    time_ms: f32,
    subdivision: f32,
    synced: bool,
    bpm: f32,
    sample_rate: f32,
}

impl SyncDelay {
    /// Create a delay with a 2-second ceiling.
    pub fn new(sample_rate: f32) -> Self {
        let capacity = (MAX_DELAY_MS * 1e-3 * sample_rate) as usize + 1;
        let default_samples = 300.0 * 1e-3 * sample_rate;
        Self {
            line: [DelayLine::new(capacity), DelayLine::new(capacity)],
            tone: [
                OnePole::new(sample_rate, 6000.0),
                OnePole::new(sample_rate, 6000.0),
            ],
            time_samples: SmoothedParam::slow(default_samples, sample_rate),
            feedback: SmoothedParam::fast(0.4, sample_rate),
            mix: SmoothedParam::fast(0.5, sample_rate),
            time_ms: 300.0,
            subdivision: 2.0,
            synced: false,
            bpm: 120.0,
            sample_rate,
        }
    }

    /// Set the delay time in milliseconds (ignored while synced).
    pub fn set_time_ms(&mut self, time_ms: f32) {
        self.time_ms = DESCRIPTOR.params[0].clamp(time_ms);
        if !self.synced {
            self.retime();
        }
    }

    /// Set feedback (0–0.95).
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback
            .set_target(DESCRIPTOR.params[1].clamp(feedback));
    }

    /// Set the feedback-path lowpass cutoff in Hz.
    pub fn set_tone_hz(&mut self, cutoff_hz: f32) {
        let clamped = DESCRIPTOR.params[2].clamp(cutoff_hz);
        for tone in &mut self.tone {
            tone.set_cutoff(clamped);
        }
    }

    /// Set the beat subdivision used while synced.
    pub fn set_subdivision(&mut self, subdivision: f32) {
        self.subdivision = DESCRIPTOR.params[3].clamp(subdivision);
        if self.synced {
            self.retime();
        }
    }

    /// Set the wet/dry balance of this instance.
    pub fn set_mix(&mut self, mix: f32) {
        self.mix.set_target(DESCRIPTOR.params[4].clamp(mix));
    }

    /// Enable or disable BPM sync.
    pub fn set_synced(&mut self, synced: bool) {
        self.synced = synced;
        self.retime();
    }

    /// Whether BPM sync is on.
    pub fn synced(&self) -> bool {
        self.synced
    }

    /// Effective delay time target in milliseconds.
    fn effective_ms(&self) -> f32 {
        if self.synced {
            let division = NoteDivision::from_subdivision(self.subdivision as u32);
            division.to_ms(self.bpm).min(MAX_DELAY_MS)
        } else {
            self.time_ms
        }
    }

    fn retime(&mut self) {
        let samples = self.effective_ms() * 1e-3 * self.sample_rate;
        self.time_samples.set_target(samples);
    }
}

impl Effect for SyncDelay {
    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let delay = self.time_samples.advance();
        let feedback = self.feedback.advance();
        let mix = self.mix.advance();

        let wet_l = self.line[0].read(delay);
        let wet_r = self.line[1].read(delay);

        let fb_l = flush_denormal(left + self.tone[0].process(wet_l) * feedback);
        let fb_r = flush_denormal(right + self.tone[1].process(wet_r) * feedback);
        self.line[0].write(fb_l);
        self.line[1].write(fb_r);

        (
            left * (1.0 - mix) + wet_l * mix,
            right * (1.0 - mix) + wet_r * mix,
        )
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.time_samples.set_sample_rate(sample_rate);
        self.feedback.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        for tone in &mut self.tone {
            tone.set_sample_rate(sample_rate);
        }
        self.retime();
    }

    fn reset(&mut self) {
        for line in &mut self.line {
            line.clear();
        }
        for tone in &mut self.tone {
            tone.reset();
        }
        self.time_samples.snap_to_target();
        self.feedback.snap_to_target();
        self.mix.snap_to_target();
    }

    fn set_tempo(&mut self, bpm: f32) {
        self.bpm = bpm.max(1.0);
        if self.synced {
            // Retime through the smoothed ramp; never an instantaneous jump.
            self.retime();
        }
    }

    fn set_sync(&mut self, synced: bool) {
        self.set_synced(synced);
    }
}

impl ParameterInfo for SyncDelay {
    fn param_count(&self) -> usize {
        DESCRIPTOR.params.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        DESCRIPTOR.params.get(index).cloned()
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.time_ms,
            1 => self.feedback.target(),
            2 => self.tone[0].cutoff(),
            3 => self.subdivision,
            4 => self.mix.target(),
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.set_time_ms(value),
            1 => self.set_feedback(value),
            2 => self.set_tone_hz(value),
            3 => self.set_subdivision(value),
            4 => self.set_mix(value),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_returns_after_delay() {
        let mut delay = SyncDelay::new(48000.0);
        delay.set_time_ms(10.0);
        delay.set_mix(1.0);
        delay.reset();

        delay.process_stereo(1.0, 1.0);
        let mut found_at = None;
        for i in 1..1000 {
            let (l, _) = delay.process_stereo(0.0, 0.0);
            if l.abs() > 0.5 {
                found_at = Some(i);
                break;
            }
        }
        // 10ms at 48kHz = 480 samples.
        let at = found_at.expect("echo expected");
        assert!((at as i64 - 480).abs() <= 2, "echo at {at}");
    }

    #[test]
    fn tempo_change_ramps_not_jumps() {
        let mut delay = SyncDelay::new(48000.0);
        delay.set_synced(true);
        delay.set_subdivision(1.0); // quarter note
        delay.set_tempo(120.0); // 500ms
        delay.reset();

        // After reset the ramp is settled at 500ms worth of samples.
        let before = delay.time_samples.get();
        delay.set_tempo(150.0); // 400ms target
        delay.process_stereo(0.0, 0.0);
        let after_one_sample = delay.time_samples.get();

        // One sample into the ramp the time has barely moved.
        assert!((after_one_sample - before).abs() < before * 0.01);
        assert!((delay.time_samples.target() - 400.0 * 48.0).abs() < 1.0);
    }

    #[test]
    fn synced_time_follows_subdivision() {
        let mut delay = SyncDelay::new(48000.0);
        delay.set_synced(true);
        delay.set_tempo(120.0);
        delay.set_subdivision(2.0); // eighth note = 250ms
        assert!((delay.effective_ms() - 250.0).abs() < 0.1);
        delay.set_subdivision(4.0); // sixteenth = 125ms
        assert!((delay.effective_ms() - 125.0).abs() < 0.1);
    }

    #[test]
    fn feedback_never_diverges() {
        let mut delay = SyncDelay::new(48000.0);
        delay.set_time_ms(5.0);
        delay.set_param(1, 10.0); // clamped to 0.95
        for _ in 0..48000 {
            let (l, r) = delay.process_stereo(0.5, 0.5);
            assert!(l.is_finite() && r.is_finite());
            assert!(l.abs() < 50.0);
        }
    }
}
