//! Resonant sweep filter (lowpass or highpass).

use pulso_core::{
    Biquad, Effect, ParamDescriptor, ParamUnit, ParameterInfo, highpass_coefficients,
    lowpass_coefficients,
};

use crate::kind::{EffectCategory, EffectDescriptor, EffectKind};

/// Static descriptor for the catalog.
pub static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    kind: EffectKind::Filter,
    id: "filter",
    name: "Sweep Filter",
    description: "Resonant lowpass/highpass sweep",
    category: EffectCategory::Filter,
    syncable: false,
    params: &[
        ParamDescriptor::new("Cutoff", "Cutoff", ParamUnit::Hertz, 20.0, 20000.0, 1000.0),
        ParamDescriptor::new("Resonance", "Res", ParamUnit::Ratio, 0.3, 20.0, 1.0),
        ParamDescriptor::new("Mode", "Mode", ParamUnit::Plain, 0.0, 1.0, 0.0),
    ],
};

/// Filter mode selected by the stepped `Mode` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterMode {
    Lowpass,
    Highpass,
}

/// Resonant sweep filter.
#[derive(Debug, Clone)]
pub struct SweepFilter {
    biquad: [Biquad; 2],
    cutoff_hz: f32,
    resonance: f32,
    mode: FilterMode,
    sample_rate: f32,
}

impl SweepFilter {
    /// Create a lowpass at 1 kHz.
    pub fn new(sample_rate: f32) -> Self {
        let mut filter = Self {
            biquad: [Biquad::new(), Biquad::new()],
            cutoff_hz: 1000.0,
            resonance: 1.0,
            mode: FilterMode::Lowpass,
            sample_rate,
        };
        filter.update_coefficients();
        filter
    }

    /// Set the cutoff frequency in Hz.
    pub fn set_cutoff_hz(&mut self, cutoff_hz: f32) {
        self.cutoff_hz = DESCRIPTOR.params[0]
            .clamp(cutoff_hz)
            .min(self.sample_rate * 0.49);
        self.update_coefficients();
    }

    /// Set the resonance (Q).
    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = DESCRIPTOR.params[1].clamp(resonance);
        self.update_coefficients();
    }

    /// Select lowpass (false) or highpass (true).
    pub fn set_highpass(&mut self, highpass: bool) {
        self.mode = if highpass {
            FilterMode::Highpass
        } else {
            FilterMode::Lowpass
        };
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        let coeffs = match self.mode {
            FilterMode::Lowpass => {
                lowpass_coefficients(self.cutoff_hz, self.resonance, self.sample_rate)
            }
            FilterMode::Highpass => {
                highpass_coefficients(self.cutoff_hz, self.resonance, self.sample_rate)
            }
        };
        for biquad in &mut self.biquad {
            biquad.set_coefficients(coeffs);
        }
    }
}

impl Effect for SweepFilter {
    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        (self.biquad[0].process(left), self.biquad[1].process(right))
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }

    fn reset(&mut self) {
        for biquad in &mut self.biquad {
            biquad.clear();
        }
    }
}

impl ParameterInfo for SweepFilter {
    fn param_count(&self) -> usize {
        DESCRIPTOR.params.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        DESCRIPTOR.params.get(index).cloned()
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.cutoff_hz,
            1 => self.resonance,
            2 => match self.mode {
                FilterMode::Lowpass => 0.0,
                FilterMode::Highpass => 1.0,
            },
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.set_cutoff_hz(value),
            1 => self.set_resonance(value),
            2 => self.set_highpass(value >= 0.5),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowpass_passes_dc() {
        let mut filter = SweepFilter::new(48000.0);
        let mut out = 0.0;
        for _ in 0..4000 {
            out = filter.process_stereo(1.0, 1.0).0;
        }
        assert!((out - 1.0).abs() < 0.05);
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut filter = SweepFilter::new(48000.0);
        filter.set_highpass(true);
        let mut out = 0.0;
        for _ in 0..4000 {
            out = filter.process_stereo(1.0, 1.0).0;
        }
        assert!(out.abs() < 0.05);
    }

    #[test]
    fn cutoff_clamps_below_nyquist() {
        let mut filter = SweepFilter::new(44100.0);
        filter.set_param(0, 30000.0);
        assert!(filter.get_param(0) < 22050.0);
    }
}
