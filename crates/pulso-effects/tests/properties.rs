//! Property tests for chain laws and parameter clamping.

use proptest::prelude::*;
use pulso_effects::{ChainSet, EffectKind};

proptest! {
    /// wet² + dry² == 1 for every mix value once an effect is enabled.
    #[test]
    fn equal_power_law_for_all_mixes(mix in 0.0f32..=1.0) {
        let mut set = ChainSet::new(48000.0);
        let chain = set.create_chain("deck-a", 4);
        set.add_effect(chain, EffectKind::Delay, &[]).unwrap();
        set.set_mix(chain, mix).unwrap();

        let (wet, dry) = set.chain(chain).unwrap().wet_dry_gains();
        prop_assert!((wet * wet + dry * dry - 1.0).abs() < 1e-5);
        prop_assert!(wet >= 0.0 && dry >= 0.0);
    }

    /// Every parameter write lands inside the declared range, for every
    /// kind, every parameter, and any finite input value.
    #[test]
    fn parameter_writes_always_clamp(
        kind_index in 0usize..EffectKind::ALL.len(),
        param_scale in -10.0f32..10.0,
    ) {
        let kind = EffectKind::ALL[kind_index];
        let descriptor = kind.descriptor();
        let mut set = ChainSet::new(48000.0);
        let chain = set.create_chain("deck-a", 4);
        let fx = set.add_effect(chain, kind, &[]).unwrap();

        for desc in descriptor.params {
            let wild = desc.min + (desc.max - desc.min) * param_scale;
            let applied = set.set_parameter(chain, fx, desc.name, wild).unwrap();
            prop_assert!(applied >= desc.min && applied <= desc.max,
                "{:?}.{} applied {} outside [{}, {}]",
                kind, desc.name, applied, desc.min, desc.max);
        }
    }

    /// Processors never emit NaN or infinite samples for in-range audio.
    #[test]
    fn processors_emit_finite_samples(
        kind_index in 0usize..EffectKind::ALL.len(),
        seed in 0u32..1000,
    ) {
        let kind = EffectKind::ALL[kind_index];
        let mut unit = kind.create(48000.0);

        // Deterministic pseudo-noise input.
        let mut state = seed.wrapping_mul(2654435761).wrapping_add(1);
        for _ in 0..512 {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            let sample = (state >> 8) as f32 / 8388608.0 - 1.0;
            let (l, r) = unit.process_stereo(sample, -sample);
            prop_assert!(l.is_finite() && r.is_finite(), "{:?} emitted non-finite", kind);
        }
    }
}
