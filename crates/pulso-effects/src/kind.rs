//! The closed effect catalog.
//!
//! Effect types are a closed enumeration rather than string tags: adding a
//! kind without wiring its factory, descriptor, and category is a compile
//! error. The chain engine and the render domain both dispatch on
//! [`EffectKind`].

use pulso_core::{Effect, ParamDescriptor, ParameterInfo};

use crate::{
    BeatJump, Compressor, Echo, Reverb, Roll, Stutter, SweepFilter, SyncDelay, ThreeBandEq,
};

/// Category of an effect, for browsing and catalog queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectCategory {
    /// Lowpass/highpass sweeps and EQ.
    Filter,
    /// Delay, echo, reverb.
    Time,
    /// Compression and other dynamics.
    Dynamics,
    /// Beat-locked performance effects.
    Dj,
}

impl EffectCategory {
    /// Human-readable category name.
    pub const fn name(self) -> &'static str {
        match self {
            EffectCategory::Filter => "Filter",
            EffectCategory::Time => "Time-Based",
            EffectCategory::Dynamics => "Dynamics",
            EffectCategory::Dj => "DJ",
        }
    }
}

/// Combined processing + parameter-introspection object.
///
/// The chain engine stores instance state against this interface and the
/// render domain executes it; no effect is addressed by concrete type
/// outside its own module.
pub trait EffectUnit: Effect + ParameterInfo + Send {}

impl<T: Effect + ParameterInfo + Send> EffectUnit for T {}

/// The closed effect enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// Resonant sweep filter.
    Filter,
    /// 3-band shelving/peaking EQ.
    Eq,
    /// Program compressor.
    Compressor,
    /// Feedback delay (syncable).
    Delay,
    /// Multi-tap echo (syncable).
    Echo,
    /// Algorithmic reverb.
    Reverb,
    /// Beat-length loop roll (syncable).
    Roll,
    /// Gated stutter (syncable).
    Stutter,
    /// Jump-back replay (syncable).
    BeatJump,
}

/// Static metadata for one effect kind.
#[derive(Debug, Clone, Copy)]
pub struct EffectDescriptor {
    /// The kind described.
    pub kind: EffectKind,
    /// Stable string tag used in documents and logs.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Catalog category.
    pub category: EffectCategory,
    /// Whether the kind recomputes time parameters on tempo changes.
    pub syncable: bool,
    /// Declared parameters, in index order.
    pub params: &'static [ParamDescriptor],
}

impl EffectKind {
    /// Every kind, in catalog order.
    pub const ALL: [EffectKind; 9] = [
        EffectKind::Filter,
        EffectKind::Eq,
        EffectKind::Compressor,
        EffectKind::Delay,
        EffectKind::Echo,
        EffectKind::Reverb,
        EffectKind::Roll,
        EffectKind::Stutter,
        EffectKind::BeatJump,
    ];

    /// The kind's static descriptor.
    pub fn descriptor(self) -> &'static EffectDescriptor {
        match self {
            EffectKind::Filter => &crate::filter::DESCRIPTOR,
            EffectKind::Eq => &crate::eq::DESCRIPTOR,
            EffectKind::Compressor => &crate::compressor::DESCRIPTOR,
            EffectKind::Delay => &crate::delay::DESCRIPTOR,
            EffectKind::Echo => &crate::echo::DESCRIPTOR,
            EffectKind::Reverb => &crate::reverb::DESCRIPTOR,
            EffectKind::Roll => &crate::roll::DESCRIPTOR,
            EffectKind::Stutter => &crate::stutter::DESCRIPTOR,
            EffectKind::BeatJump => &crate::beat_jump::DESCRIPTOR,
        }
    }

    /// Stable string tag (`"delay"`, `"reverb"`, …).
    pub fn id(self) -> &'static str {
        self.descriptor().id
    }

    /// Whether the kind responds to tempo changes.
    pub fn is_syncable(self) -> bool {
        self.descriptor().syncable
    }

    /// Resolve a string tag back to a kind.
    pub fn from_id(id: &str) -> Option<EffectKind> {
        EffectKind::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(id))
    }

    /// Instantiate a processor for this kind at the given sample rate,
    /// with every parameter at its declared default.
    ///
    /// Construction allocates and must happen in the control domain; the
    /// box is shipped to the render domain over the command ring.
    pub fn create(self, sample_rate: f32) -> Box<dyn EffectUnit> {
        match self {
            EffectKind::Filter => Box::new(SweepFilter::new(sample_rate)),
            EffectKind::Eq => Box::new(ThreeBandEq::new(sample_rate)),
            EffectKind::Compressor => Box::new(Compressor::new(sample_rate)),
            EffectKind::Delay => Box::new(SyncDelay::new(sample_rate)),
            EffectKind::Echo => Box::new(Echo::new(sample_rate)),
            EffectKind::Reverb => Box::new(Reverb::new(sample_rate)),
            EffectKind::Roll => Box::new(Roll::new(sample_rate)),
            EffectKind::Stutter => Box::new(Stutter::new(sample_rate)),
            EffectKind::BeatJump => Box::new(BeatJump::new(sample_rate)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_consistent_descriptor() {
        for kind in EffectKind::ALL {
            let desc = kind.descriptor();
            assert_eq!(desc.kind, kind);
            assert!(!desc.id.is_empty());
            assert!(EffectKind::from_id(desc.id) == Some(kind));
        }
    }

    #[test]
    fn factory_matches_descriptor_params() {
        for kind in EffectKind::ALL {
            let unit = kind.create(48000.0);
            let desc = kind.descriptor();
            assert_eq!(
                unit.param_count(),
                desc.params.len(),
                "param count mismatch for {:?}",
                kind
            );
            for (i, expected) in desc.params.iter().enumerate() {
                let actual = unit.param_info(i).expect("descriptor in range");
                assert_eq!(actual.name, expected.name, "{:?} param {i}", kind);
            }
        }
    }

    #[test]
    fn factory_defaults_match_descriptors() {
        for kind in EffectKind::ALL {
            let unit = kind.create(48000.0);
            for (i, desc) in kind.descriptor().params.iter().enumerate() {
                let value = unit.get_param(i);
                assert!(
                    (value - desc.default).abs() < 1e-3,
                    "{:?} param {} default {} != {}",
                    kind,
                    desc.name,
                    value,
                    desc.default
                );
            }
        }
    }

    #[test]
    fn syncable_set_matches_catalog() {
        let syncable: Vec<EffectKind> = EffectKind::ALL
            .into_iter()
            .filter(|k| k.is_syncable())
            .collect();
        assert_eq!(
            syncable,
            vec![
                EffectKind::Delay,
                EffectKind::Echo,
                EffectKind::Roll,
                EffectKind::Stutter,
                EffectKind::BeatJump
            ]
        );
    }

    #[test]
    fn unknown_id_is_none() {
        assert!(EffectKind::from_id("granular").is_none());
    }
}
