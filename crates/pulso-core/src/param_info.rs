//! Parameter introspection for effects.
//!
//! Controllers, preset systems, and the chain engine all need to discover an
//! effect's parameters at runtime: names for display, ranges for clamping,
//! and response curves for mapping a hardware control's 0–1 travel onto the
//! parameter's range. [`ParamDescriptor`] carries that metadata and
//! [`ParameterInfo`] exposes index-based access on every effect.

use serde::{Deserialize, Serialize};

/// Display unit of a parameter, for formatting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamUnit {
    /// Frequency in hertz.
    Hertz,
    /// Time in milliseconds.
    Milliseconds,
    /// Level in decibels.
    Decibels,
    /// Ratio such as compression ratio.
    Ratio,
    /// Normalized or percentage value.
    Percent,
    /// Beat subdivision count.
    Beats,
    /// Dimensionless.
    Plain,
}

/// How a normalized control value in [0, 1] maps into a parameter's range.
///
/// Controller mappings default to `Linear`. `Logarithmic` suits frequency
/// ranges; `Exponential` gives fine resolution near the bottom of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResponseCurve {
    /// Equal resolution across the range.
    #[default]
    Linear,
    /// More resolution at low values. Requires `min > 0`.
    Logarithmic,
    /// Squared travel; fine control near the minimum.
    Exponential,
}

impl ResponseCurve {
    /// Map a normalized value in [0, 1] into `[min, max]` along this curve.
    pub fn apply(self, normalized: f32, min: f32, max: f32) -> f32 {
        let t = normalized.clamp(0.0, 1.0);
        match self {
            ResponseCurve::Linear => min + t * (max - min),
            ResponseCurve::Logarithmic => {
                if min <= 0.0 {
                    min + t * (max - min)
                } else {
                    min * libm::powf(max / min, t)
                }
            }
            ResponseCurve::Exponential => min + t * t * (max - min),
        }
    }
}

/// Static description of one effect parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    /// Full display name.
    pub name: &'static str,
    /// Abbreviated name for narrow displays.
    pub short_name: &'static str,
    /// Display unit.
    pub unit: ParamUnit,
    /// Minimum plain value.
    pub min: f32,
    /// Maximum plain value.
    pub max: f32,
    /// Default plain value.
    pub default: f32,
}

impl ParamDescriptor {
    /// Construct a descriptor.
    pub const fn new(
        name: &'static str,
        short_name: &'static str,
        unit: ParamUnit,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            short_name,
            unit,
            min,
            max,
            default,
        }
    }

    /// Clamp a plain value into the declared range.
    ///
    /// Out-of-range writes are clamped, never rejected, the contract for
    /// every parameter setter in the engine.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        value.clamp(self.min, self.max)
    }

    /// Map a plain value to normalized [0, 1] (linear).
    #[inline]
    pub fn normalize(&self, value: f32) -> f32 {
        if (self.max - self.min).abs() < f32::EPSILON {
            0.0
        } else {
            ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
        }
    }

    /// Map a normalized [0, 1] value to a plain value (linear).
    #[inline]
    pub fn denormalize(&self, normalized: f32) -> f32 {
        ResponseCurve::Linear.apply(normalized, self.min, self.max)
    }
}

/// Runtime parameter discovery, implemented alongside [`Effect`].
///
/// Parameters are index-addressed; the chain engine resolves names to
/// indices through the descriptors.
///
/// [`Effect`]: crate::Effect
pub trait ParameterInfo {
    /// Number of parameters.
    fn param_count(&self) -> usize;

    /// Descriptor for the parameter at `index`, or `None` if out of range.
    fn param_info(&self, index: usize) -> Option<ParamDescriptor>;

    /// Current plain value of the parameter at `index`.
    fn get_param(&self, index: usize) -> f32;

    /// Set the plain value of the parameter at `index`.
    ///
    /// Implementations clamp to the descriptor range.
    fn set_param(&mut self, index: usize, value: f32);

    /// Find a parameter index by its descriptor name.
    fn param_index(&self, name: &str) -> Option<usize> {
        (0..self.param_count()).find(|&i| {
            self.param_info(i)
                .is_some_and(|d| d.name.eq_ignore_ascii_case(name))
        })
    }

    /// Restore every parameter to its default value.
    fn reset_params(&mut self) {
        for i in 0..self.param_count() {
            if let Some(desc) = self.param_info(i) {
                self.set_param(i, desc.default);
            }
        }
    }
}
