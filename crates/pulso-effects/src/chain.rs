//! Effect chains over the routing graph.
//!
//! A chain is an ordered list of effect instances wired through the routing
//! graph as `input → effect[0] → … → wet_gain → output`, with the parallel
//! dry path `input → dry_gain → output` always present. Every structural
//! change runs a full reconnect; the relink order wires the dry path first
//! so it is never dropped, even transiently.
//!
//! Wet/dry mixing uses the equal-power law (`wet = sin(mix·π/2)`,
//! `dry = cos(mix·π/2)`) so perceived loudness is constant across the whole
//! mix range. With zero enabled effects the wet path does not exist and the
//! dry gain is exactly 1.

use tracing::debug;

use pulso_core::graph::{
    ChainSpec, ConnectionId, EffectSpec, Module, ModuleCategory, ModuleId, PortDirection,
    PortKind, RoutingGraph,
};
use pulso_core::{GraphError, TempoClock, equal_power_gains};

use crate::kind::EffectKind;

/// Stable handle of a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChainId(pub u32);

/// Stable handle of an effect instance, unique across all chains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EffectInstanceId(pub u32);

/// Errors from chain operations.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ChainError {
    /// The chain holds its maximum number of instances.
    #[error("chain is full (max {max} effects)")]
    ChainFull {
        /// The chain's instance limit.
        max: usize,
    },

    /// The effect type tag is not in the catalog.
    #[error("unknown effect type \"{0}\"")]
    UnknownType(String),

    /// The chain does not exist.
    #[error("chain {0:?} does not exist")]
    UnknownChain(ChainId),

    /// The effect instance does not exist in the chain.
    #[error("effect {0:?} does not exist in this chain")]
    UnknownEffect(EffectInstanceId),

    /// The parameter name is not declared by the effect kind.
    #[error("effect {kind:?} has no parameter \"{name}\"")]
    UnknownParameter {
        /// Kind whose descriptor was consulted.
        kind: EffectKind,
        /// The unmatched name.
        name: String,
    },

    /// BPM sync requested on a kind that is not syncable.
    #[error("effect kind {0:?} is not BPM-syncable")]
    NotSyncable(EffectKind),

    /// The requested order index is out of bounds.
    #[error("index {index} out of bounds for chain of {len} effects")]
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of effects in the chain.
        len: usize,
    },

    /// A graph operation failed underneath the chain.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Control-side state of one effect in a chain.
#[derive(Debug, Clone)]
pub struct EffectInstance {
    /// Stable handle.
    pub id: EffectInstanceId,
    /// Catalog kind.
    pub kind: EffectKind,
    /// Graph module backing this instance.
    pub module: ModuleId,
    /// Current parameter values, in descriptor index order.
    pub parameters: Vec<f32>,
    /// Whether the instance is in the wet path.
    pub enabled: bool,
    /// Whether the instance retimes with the global tempo.
    pub bpm_sync: bool,
}

impl EffectInstance {
    /// Parameter value by descriptor name.
    pub fn parameter(&self, name: &str) -> Option<f32> {
        let params = self.kind.descriptor().params;
        params
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(name))
            .map(|i| self.parameters[i])
    }
}

/// One ordered, wet/dry-mixed effect chain.
#[derive(Debug)]
pub struct EffectChain {
    /// Stable handle.
    pub id: ChainId,
    /// Display name (`"deck-a"`, `"master"`, …).
    pub name: String,
    input: ModuleId,
    dry_gain: ModuleId,
    wet_gain: ModuleId,
    output: ModuleId,
    effects: Vec<EffectInstance>,
    internal: Vec<ConnectionId>,
    mix: f32,
    enabled: bool,
    max_effects: usize,
}

impl EffectChain {
    /// The chain's effects in processing order.
    pub fn effects(&self) -> &[EffectInstance] {
        &self.effects
    }

    /// Look up an instance.
    pub fn effect(&self, id: EffectInstanceId) -> Option<&EffectInstance> {
        self.effects.iter().find(|e| e.id == id)
    }

    /// Wet/dry mix in [0, 1].
    pub fn mix(&self) -> f32 {
        self.mix
    }

    /// Whether the chain processes at all.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Maximum number of instances.
    pub fn max_effects(&self) -> usize {
        self.max_effects
    }

    /// The chain's graph endpoints: (input, output).
    pub fn endpoints(&self) -> (ModuleId, ModuleId) {
        (self.input, self.output)
    }

    /// Effective (wet, dry) gains under the equal-power law.
    ///
    /// A chain with no enabled effect has no wet path: (0, 1).
    pub fn wet_dry_gains(&self) -> (f32, f32) {
        let any_enabled = self.enabled && self.effects.iter().any(|e| e.enabled);
        if any_enabled {
            equal_power_gains(self.mix)
        } else {
            (0.0, 1.0)
        }
    }

    fn enabled_effects(&self) -> impl Iterator<Item = &EffectInstance> {
        self.effects.iter().filter(|e| e.enabled)
    }
}

/// All chains of one engine instance, plus the routing graph they are wired
/// through.
pub struct ChainSet {
    graph: RoutingGraph,
    chains: Vec<EffectChain>,
    tempo: TempoClock,
    next_chain: u32,
    next_instance: u32,
    sample_rate: f32,
}

impl ChainSet {
    /// Create an empty chain set with its own routing graph.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            graph: RoutingGraph::new(),
            chains: Vec::new(),
            tempo: TempoClock::new(sample_rate, 120.0),
            next_chain: 0,
            next_instance: 0,
            sample_rate,
        }
    }

    /// The routing graph the chains are wired through.
    pub fn graph(&self) -> &RoutingGraph {
        &self.graph
    }

    /// Mutable access to the routing graph (for listener registration and
    /// module-level tweaks; chain wiring stays under chain operations).
    pub fn graph_mut(&mut self) -> &mut RoutingGraph {
        &mut self.graph
    }

    /// Global tempo clock.
    pub fn tempo(&self) -> &TempoClock {
        &self.tempo
    }

    /// Sample rate the chains run at.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    // --- Chain lifecycle ---

    /// Create a chain with its four endpoint modules and a wired dry path.
    pub fn create_chain(&mut self, name: impl Into<String>, max_effects: usize) -> ChainId {
        let name = name.into();
        let id = ChainId(self.next_chain);
        self.next_chain += 1;

        let input = self.graph.add_module(
            Module::new(format!("{name} In"), ModuleCategory::Effect)
                .with_audio_in("Audio In")
                .with_audio_out("Audio Out"),
        );
        let dry_gain = self.graph.add_module(
            Module::new(format!("{name} Dry"), ModuleCategory::Effect)
                .with_audio_in("Audio In")
                .with_audio_out("Audio Out")
                .with_parameter("gain", 1.0),
        );
        let wet_gain = self.graph.add_module(
            Module::new(format!("{name} Wet"), ModuleCategory::Effect)
                .with_audio_in("Audio In")
                .with_audio_out("Audio Out")
                .with_parameter("gain", 0.0),
        );
        let output = self.graph.add_module(
            Module::new(format!("{name} Out"), ModuleCategory::Effect)
                .with_audio_in("Audio In")
                .with_audio_out("Audio Out"),
        );

        let mut chain = EffectChain {
            id,
            name,
            input,
            dry_gain,
            wet_gain,
            output,
            effects: Vec::new(),
            internal: Vec::new(),
            mix: 0.5,
            enabled: true,
            max_effects,
        };
        Self::reconnect(&mut self.graph, &mut chain);
        self.chains.push(chain);
        id
    }

    /// Look up a chain.
    pub fn chain(&self, id: ChainId) -> Option<&EffectChain> {
        self.chains.iter().find(|c| c.id == id)
    }

    /// All chains.
    pub fn chains(&self) -> &[EffectChain] {
        &self.chains
    }

    fn chain_mut(&mut self, id: ChainId) -> Result<&mut EffectChain, ChainError> {
        self.chains
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ChainError::UnknownChain(id))
    }

    // --- Effect lifecycle ---

    /// Append an effect to a chain.
    ///
    /// `params` are (name, value) overrides on top of the kind's declared
    /// defaults; values clamp to the declared ranges. Fails with
    /// [`ChainError::ChainFull`] at the instance limit.
    pub fn add_effect(
        &mut self,
        chain_id: ChainId,
        kind: EffectKind,
        params: &[(&str, f32)],
    ) -> Result<EffectInstanceId, ChainError> {
        let instance_id = EffectInstanceId(self.next_instance);
        let chain = self.chains.iter().find(|c| c.id == chain_id);
        let chain = chain.ok_or(ChainError::UnknownChain(chain_id))?;
        if chain.effects.len() >= chain.max_effects {
            return Err(ChainError::ChainFull {
                max: chain.max_effects,
            });
        }

        let descriptor = kind.descriptor();
        let mut values: Vec<f32> = descriptor.params.iter().map(|d| d.default).collect();
        for (name, value) in params {
            let index = descriptor
                .params
                .iter()
                .position(|d| d.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| ChainError::UnknownParameter {
                    kind,
                    name: (*name).to_string(),
                })?;
            values[index] = descriptor.params[index].clamp(*value);
        }

        self.next_instance += 1;
        let module = self.graph.add_module(
            Module::new(descriptor.name, ModuleCategory::Effect)
                .with_audio_in("Audio In")
                .with_audio_out("Audio Out"),
        );

        let chain = self.chain_mut(chain_id)?;
        chain.effects.push(EffectInstance {
            id: instance_id,
            kind,
            module,
            parameters: values,
            enabled: true,
            bpm_sync: false,
        });
        let chain_index = self.chains.iter().position(|c| c.id == chain_id).unwrap();
        Self::reconnect(&mut self.graph, &mut self.chains[chain_index]);

        debug!(chain = chain_id.0, kind = descriptor.id, "effect added");
        Ok(instance_id)
    }

    /// Append an effect by its string tag (document import, CLI).
    pub fn add_effect_by_tag(
        &mut self,
        chain_id: ChainId,
        tag: &str,
        params: &[(&str, f32)],
    ) -> Result<EffectInstanceId, ChainError> {
        let kind =
            EffectKind::from_id(tag).ok_or_else(|| ChainError::UnknownType(tag.to_string()))?;
        self.add_effect(chain_id, kind, params)
    }

    /// Remove an effect instance and its graph module.
    ///
    /// Returns `false` if the chain or instance does not exist.
    pub fn remove_effect(&mut self, chain_id: ChainId, effect: EffectInstanceId) -> bool {
        let Some(chain_index) = self.chains.iter().position(|c| c.id == chain_id) else {
            return false;
        };
        let Some(pos) = self.chains[chain_index]
            .effects
            .iter()
            .position(|e| e.id == effect)
        else {
            return false;
        };

        let instance = self.chains[chain_index].effects.remove(pos);
        // Removing the module cascades its connections; the reconnect then
        // rebuilds the remaining links.
        self.graph.remove_module(instance.module);
        Self::reconnect(&mut self.graph, &mut self.chains[chain_index]);
        debug!(chain = chain_id.0, "effect removed");
        true
    }

    /// Move an effect to a new position in its chain.
    pub fn reorder(
        &mut self,
        chain_id: ChainId,
        effect: EffectInstanceId,
        new_index: usize,
    ) -> Result<(), ChainError> {
        let chain_index = self
            .chains
            .iter()
            .position(|c| c.id == chain_id)
            .ok_or(ChainError::UnknownChain(chain_id))?;
        let chain = &mut self.chains[chain_index];
        let len = chain.effects.len();
        if new_index >= len {
            return Err(ChainError::IndexOutOfBounds {
                index: new_index,
                len,
            });
        }
        let pos = chain
            .effects
            .iter()
            .position(|e| e.id == effect)
            .ok_or(ChainError::UnknownEffect(effect))?;

        let instance = chain.effects.remove(pos);
        chain.effects.insert(new_index, instance);
        Self::reconnect(&mut self.graph, &mut self.chains[chain_index]);
        Ok(())
    }

    // --- Parameters, mix, sync ---

    /// Set a named parameter on an instance.
    ///
    /// The value clamps to the declared range; the applied value is
    /// returned. Out-of-range writes are never rejected.
    pub fn set_parameter(
        &mut self,
        chain_id: ChainId,
        effect: EffectInstanceId,
        name: &str,
        value: f32,
    ) -> Result<f32, ChainError> {
        let chain = self.chain_mut(chain_id)?;
        let instance = chain
            .effects
            .iter_mut()
            .find(|e| e.id == effect)
            .ok_or(ChainError::UnknownEffect(effect))?;
        let descriptor = instance.kind.descriptor();
        let index = descriptor
            .params
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ChainError::UnknownParameter {
                kind: instance.kind,
                name: name.to_string(),
            })?;

        let applied = descriptor.params[index].clamp(value);
        instance.parameters[index] = applied;
        Ok(applied)
    }

    /// Parameter index for a (instance, name) pair, as shipped to the
    /// render domain.
    pub fn parameter_index(
        &self,
        chain_id: ChainId,
        effect: EffectInstanceId,
        name: &str,
    ) -> Result<usize, ChainError> {
        let chain = self
            .chain(chain_id)
            .ok_or(ChainError::UnknownChain(chain_id))?;
        let instance = chain
            .effect(effect)
            .ok_or(ChainError::UnknownEffect(effect))?;
        instance
            .kind
            .descriptor()
            .params
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ChainError::UnknownParameter {
                kind: instance.kind,
                name: name.to_string(),
            })
    }

    /// Restore an instance's parameters to the declared defaults. Returns
    /// the default values in index order.
    pub fn reset_effect(
        &mut self,
        chain_id: ChainId,
        effect: EffectInstanceId,
    ) -> Result<Vec<f32>, ChainError> {
        let chain = self.chain_mut(chain_id)?;
        let instance = chain
            .effects
            .iter_mut()
            .find(|e| e.id == effect)
            .ok_or(ChainError::UnknownEffect(effect))?;
        let defaults: Vec<f32> = instance
            .kind
            .descriptor()
            .params
            .iter()
            .map(|d| d.default)
            .collect();
        instance.parameters.clone_from(&defaults);
        Ok(defaults)
    }

    /// Set the wet/dry mix in [0, 1] and refresh the gain modules.
    pub fn set_mix(&mut self, chain_id: ChainId, mix: f32) -> Result<(), ChainError> {
        let chain = self.chain_mut(chain_id)?;
        chain.mix = mix.clamp(0.0, 1.0);
        let chain_index = self.chains.iter().position(|c| c.id == chain_id).unwrap();
        Self::apply_gains(&mut self.graph, &self.chains[chain_index]);
        Ok(())
    }

    /// Enable or disable an instance. Structural: the wet path is rebuilt.
    pub fn set_effect_enabled(
        &mut self,
        chain_id: ChainId,
        effect: EffectInstanceId,
        enabled: bool,
    ) -> Result<(), ChainError> {
        let chain = self.chain_mut(chain_id)?;
        let instance = chain
            .effects
            .iter_mut()
            .find(|e| e.id == effect)
            .ok_or(ChainError::UnknownEffect(effect))?;
        instance.enabled = enabled;
        let chain_index = self.chains.iter().position(|c| c.id == chain_id).unwrap();
        Self::reconnect(&mut self.graph, &mut self.chains[chain_index]);
        Ok(())
    }

    /// Flag an instance as BPM-synced. Only valid for syncable kinds.
    pub fn set_bpm_sync(
        &mut self,
        chain_id: ChainId,
        effect: EffectInstanceId,
        synced: bool,
    ) -> Result<(), ChainError> {
        let chain = self.chain_mut(chain_id)?;
        let instance = chain
            .effects
            .iter_mut()
            .find(|e| e.id == effect)
            .ok_or(ChainError::UnknownEffect(effect))?;
        if !instance.kind.is_syncable() {
            return Err(ChainError::NotSyncable(instance.kind));
        }
        instance.bpm_sync = synced;
        Ok(())
    }

    /// Update the global tempo. Synced instances in the render domain pick
    /// this up through their smoothed ramps.
    pub fn set_tempo(&mut self, bpm: f32) {
        self.tempo.set_bpm(bpm);
    }

    // --- Documents ---

    /// Serialize every chain for the routing document.
    pub fn export_chains(&self) -> Vec<ChainSpec> {
        self.chains
            .iter()
            .map(|chain| ChainSpec {
                id: chain.name.clone(),
                mix: chain.mix,
                enabled: chain.enabled,
                max_effects: chain.max_effects,
                effects: chain
                    .effects
                    .iter()
                    .map(|e| EffectSpec {
                        kind: e.kind.id().to_string(),
                        parameters: e
                            .kind
                            .descriptor()
                            .params
                            .iter()
                            .zip(&e.parameters)
                            .map(|(d, v)| (d.name.to_string(), *v))
                            .collect(),
                        enabled: e.enabled,
                        bpm_sync: e.bpm_sync,
                    })
                    .collect(),
            })
            .collect()
    }

    /// Validate chain specs without mutating anything.
    ///
    /// Checks every effect tag against the catalog and every parameter
    /// name against its kind's descriptor. This runs before
    /// [`import_chains`](Self::import_chains) touches state, which is what
    /// makes the import atomic.
    pub fn validate_chain_specs(specs: &[ChainSpec]) -> Result<(), ChainError> {
        for spec in specs {
            for effect in &spec.effects {
                let kind = EffectKind::from_id(&effect.kind)
                    .ok_or_else(|| ChainError::UnknownType(effect.kind.clone()))?;
                if effect.bpm_sync && !kind.is_syncable() {
                    return Err(ChainError::NotSyncable(kind));
                }
                let descriptor = kind.descriptor();
                for (name, _) in &effect.parameters {
                    if !descriptor
                        .params
                        .iter()
                        .any(|d| d.name.eq_ignore_ascii_case(name))
                    {
                        return Err(ChainError::UnknownParameter {
                            kind,
                            name: name.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Replace every chain (and the graph underneath) with imported specs.
    ///
    /// Atomic: specs are validated first; on any error the current state is
    /// left untouched. Returns the new chain handles in spec order.
    pub fn import_chains(&mut self, specs: &[ChainSpec]) -> Result<Vec<ChainId>, ChainError> {
        Self::validate_chain_specs(specs)?;

        self.graph.clear();
        self.chains.clear();

        let mut ids = Vec::with_capacity(specs.len());
        for spec in specs {
            let max_effects = spec.max_effects.max(spec.effects.len());
            let chain_id = self.create_chain(spec.id.clone(), max_effects);
            for effect_spec in &spec.effects {
                let params: Vec<(&str, f32)> = effect_spec
                    .parameters
                    .iter()
                    .map(|(name, value)| (name.as_str(), *value))
                    .collect();
                let instance = self.add_effect_by_tag(chain_id, &effect_spec.kind, &params)?;
                if !effect_spec.enabled {
                    self.set_effect_enabled(chain_id, instance, false)?;
                }
                if effect_spec.bpm_sync {
                    self.set_bpm_sync(chain_id, instance, true)?;
                }
            }
            self.set_mix(chain_id, spec.mix)?;
            ids.push(chain_id);
        }
        Ok(ids)
    }

    // --- Wiring ---

    /// Tear down and rebuild a chain's internal links.
    ///
    /// Order matters: the dry path is wired before the old wet links are
    /// replaced, so audio always has a path from input to output.
    fn reconnect(graph: &mut RoutingGraph, chain: &mut EffectChain) {
        // Dry path first. create_connection is idempotent, so wiring it
        // before tearing down old links never duplicates it.
        let mut fresh = Vec::new();
        let mut link = |graph: &mut RoutingGraph, from: ModuleId, to: ModuleId| {
            let out = graph
                .module(from)
                .and_then(|m| m.find_port(PortDirection::Output, PortKind::Audio))
                .map(|p| p.id);
            let inp = graph
                .module(to)
                .and_then(|m| m.find_port(PortDirection::Input, PortKind::Audio))
                .map(|p| p.id);
            if let (Some(out), Some(inp)) = (out, inp) {
                if let Ok(id) = graph.create_connection(from, out, to, inp, PortKind::Audio) {
                    fresh.push(id);
                }
            }
        };

        link(graph, chain.input, chain.dry_gain);
        link(graph, chain.dry_gain, chain.output);

        // Wet path only when at least one enabled effect exists.
        if chain.enabled_effects().next().is_some() {
            let hops: Vec<ModuleId> = chain.enabled_effects().map(|e| e.module).collect();
            let mut prev = chain.input;
            for module in hops {
                link(graph, prev, module);
                prev = module;
            }
            link(graph, prev, chain.wet_gain);
            link(graph, chain.wet_gain, chain.output);
        }

        // Drop stale links that are not part of the fresh wiring.
        let stale: Vec<ConnectionId> = chain
            .internal
            .iter()
            .copied()
            .filter(|id| !fresh.contains(id))
            .collect();
        for id in stale {
            graph.remove_connection(id);
        }
        chain.internal = fresh;

        Self::apply_gains(graph, chain);
    }

    /// Push the equal-power gains into the chain's gain modules.
    fn apply_gains(graph: &mut RoutingGraph, chain: &EffectChain) {
        let (wet, dry) = chain.wet_dry_gains();
        if let Some(module) = graph.module_mut(chain.dry_gain) {
            module.set_parameter("gain", dry);
        }
        if let Some(module) = graph.module_mut(chain.wet_gain) {
            module.set_parameter("gain", wet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_with_chain() -> (ChainSet, ChainId) {
        let mut set = ChainSet::new(48000.0);
        let chain = set.create_chain("deck-a", 4);
        (set, chain)
    }

    #[test]
    fn empty_chain_is_fully_dry() {
        let (set, chain) = set_with_chain();
        let (wet, dry) = set.chain(chain).unwrap().wet_dry_gains();
        assert_eq!((wet, dry), (0.0, 1.0));
        // Dry path wired: input→dry, dry→out.
        assert_eq!(set.graph().connection_count(), 2);
    }

    #[test]
    fn one_effect_at_half_mix_is_equal_power() {
        let (mut set, chain) = set_with_chain();
        set.add_effect(chain, EffectKind::Delay, &[]).unwrap();
        set.set_mix(chain, 0.5).unwrap();

        let (wet, dry) = set.chain(chain).unwrap().wet_dry_gains();
        assert!((wet - 0.7071).abs() < 1e-3, "wet {wet}");
        assert!((dry - 0.7071).abs() < 1e-3, "dry {dry}");
        assert!((wet * wet + dry * dry - 1.0).abs() < 1e-5);
    }

    #[test]
    fn chain_full_is_rejected() {
        let mut set = ChainSet::new(48000.0);
        let chain = set.create_chain("deck-a", 2);
        set.add_effect(chain, EffectKind::Delay, &[]).unwrap();
        set.add_effect(chain, EffectKind::Reverb, &[]).unwrap();
        assert_eq!(
            set.add_effect(chain, EffectKind::Eq, &[]),
            Err(ChainError::ChainFull { max: 2 })
        );
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let (mut set, chain) = set_with_chain();
        assert_eq!(
            set.add_effect_by_tag(chain, "vocoder", &[]),
            Err(ChainError::UnknownType("vocoder".into()))
        );
    }

    #[test]
    fn wet_path_appears_and_disappears() {
        let (mut set, chain) = set_with_chain();
        let fx = set.add_effect(chain, EffectKind::Delay, &[]).unwrap();
        // input→dry, dry→out, input→fx, fx→wet, wet→out
        assert_eq!(set.graph().connection_count(), 5);

        set.set_effect_enabled(chain, fx, false).unwrap();
        assert_eq!(set.graph().connection_count(), 2);
        let (wet, dry) = set.chain(chain).unwrap().wet_dry_gains();
        assert_eq!((wet, dry), (0.0, 1.0));

        set.set_effect_enabled(chain, fx, true).unwrap();
        assert_eq!(set.graph().connection_count(), 5);
    }

    #[test]
    fn remove_effect_relinks_chain() {
        let (mut set, chain) = set_with_chain();
        let a = set.add_effect(chain, EffectKind::Delay, &[]).unwrap();
        let b = set.add_effect(chain, EffectKind::Reverb, &[]).unwrap();
        // input→dry, dry→out, input→a, a→b, b→wet, wet→out
        assert_eq!(set.graph().connection_count(), 6);

        assert!(set.remove_effect(chain, a));
        assert_eq!(set.chain(chain).unwrap().effects().len(), 1);
        assert_eq!(set.chain(chain).unwrap().effects()[0].id, b);
        assert_eq!(set.graph().connection_count(), 5);

        // Unknown ids are a boolean no, not an error.
        assert!(!set.remove_effect(chain, a));
    }

    #[test]
    fn reorder_swaps_processing_order() {
        let (mut set, chain) = set_with_chain();
        let a = set.add_effect(chain, EffectKind::Delay, &[]).unwrap();
        let b = set.add_effect(chain, EffectKind::Reverb, &[]).unwrap();

        set.reorder(chain, b, 0).unwrap();
        let order: Vec<EffectInstanceId> = set
            .chain(chain)
            .unwrap()
            .effects()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(order, vec![b, a]);

        assert_eq!(
            set.reorder(chain, a, 5),
            Err(ChainError::IndexOutOfBounds { index: 5, len: 2 })
        );
    }

    #[test]
    fn parameters_clamp_not_reject() {
        let (mut set, chain) = set_with_chain();
        let fx = set.add_effect(chain, EffectKind::Delay, &[]).unwrap();

        let applied = set.set_parameter(chain, fx, "Feedback", 7.0).unwrap();
        assert_eq!(applied, 0.95);
        assert_eq!(
            set.chain(chain).unwrap().effect(fx).unwrap().parameter("Feedback"),
            Some(0.95)
        );

        assert!(matches!(
            set.set_parameter(chain, fx, "Sparkle", 1.0),
            Err(ChainError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn add_with_param_overrides() {
        let (mut set, chain) = set_with_chain();
        let fx = set
            .add_effect(chain, EffectKind::Delay, &[("Time", 125.0), ("Feedback", 0.6)])
            .unwrap();
        let instance = set.chain(chain).unwrap().effect(fx).unwrap();
        assert_eq!(instance.parameter("Time"), Some(125.0));
        assert_eq!(instance.parameter("Feedback"), Some(0.6));
        // Unspecified params sit at defaults.
        assert_eq!(instance.parameter("Mix"), Some(0.5));
    }

    #[test]
    fn bpm_sync_only_on_syncable_kinds() {
        let (mut set, chain) = set_with_chain();
        let delay = set.add_effect(chain, EffectKind::Delay, &[]).unwrap();
        let eq = set.add_effect(chain, EffectKind::Eq, &[]).unwrap();

        set.set_bpm_sync(chain, delay, true).unwrap();
        assert_eq!(
            set.set_bpm_sync(chain, eq, true),
            Err(ChainError::NotSyncable(EffectKind::Eq))
        );
    }

    #[test]
    fn reset_effect_restores_defaults() {
        let (mut set, chain) = set_with_chain();
        let fx = set.add_effect(chain, EffectKind::Compressor, &[]).unwrap();
        set.set_parameter(chain, fx, "Ratio", 10.0).unwrap();

        let defaults = set.reset_effect(chain, fx).unwrap();
        assert_eq!(defaults[1], 4.0);
        assert_eq!(
            set.chain(chain).unwrap().effect(fx).unwrap().parameter("Ratio"),
            Some(4.0)
        );
    }

    #[test]
    fn export_round_trips_state() {
        let (mut set, chain) = set_with_chain();
        let fx = set.add_effect(chain, EffectKind::Delay, &[]).unwrap();
        set.set_bpm_sync(chain, fx, true).unwrap();
        set.set_mix(chain, 0.8).unwrap();

        let specs = set.export_chains();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].id, "deck-a");
        assert!((specs[0].mix - 0.8).abs() < 1e-6);
        assert_eq!(specs[0].max_effects, 4);
        assert_eq!(specs[0].effects[0].kind, "delay");
        assert!(specs[0].effects[0].bpm_sync);
    }

    #[test]
    fn import_rebuilds_chains() {
        let (mut set, chain) = set_with_chain();
        let fx = set.add_effect(chain, EffectKind::Delay, &[("Time", 125.0)]).unwrap();
        set.set_bpm_sync(chain, fx, true).unwrap();
        set.set_mix(chain, 0.75).unwrap();
        let specs = set.export_chains();

        let mut restored = ChainSet::new(48000.0);
        restored.create_chain("stale", 2);
        let ids = restored.import_chains(&specs).unwrap();
        assert_eq!(ids.len(), 1);

        let chain = restored.chain(ids[0]).unwrap();
        assert_eq!(chain.name, "deck-a");
        assert!((chain.mix() - 0.75).abs() < 1e-6);
        assert_eq!(chain.effects().len(), 1);
        assert_eq!(chain.effects()[0].kind, EffectKind::Delay);
        assert!(chain.effects()[0].bpm_sync);
        assert_eq!(chain.effects()[0].parameter("Time"), Some(125.0));
        // The stale chain and its graph plumbing are gone.
        assert!(restored.chains().iter().all(|c| c.name != "stale"));
    }

    #[test]
    fn bad_import_leaves_chains_untouched() {
        let (mut set, chain) = set_with_chain();
        set.add_effect(chain, EffectKind::Reverb, &[]).unwrap();

        let mut specs = set.export_chains();
        specs[0].effects[0].kind = "granular".into();

        let err = set.import_chains(&specs).unwrap_err();
        assert_eq!(err, ChainError::UnknownType("granular".into()));
        // Prior state intact.
        assert_eq!(set.chains().len(), 1);
        assert_eq!(set.chain(chain).unwrap().effects().len(), 1);
    }

    #[test]
    fn dry_path_survives_every_mutation() {
        let (mut set, chain) = set_with_chain();
        let dry_wired = |set: &ChainSet| {
            let c = set.chain(chain).unwrap();
            let (input, output) = c.endpoints();
            // input feeds something, and output is fed; the dry gain module
            // sits in between on every topology.
            let snap = set.graph().snapshot();
            snap.outputs_of(input).count() >= 1 && snap.inputs_of(output).count() >= 1
        };

        assert!(dry_wired(&set));
        let a = set.add_effect(chain, EffectKind::Delay, &[]).unwrap();
        assert!(dry_wired(&set));
        let b = set.add_effect(chain, EffectKind::Reverb, &[]).unwrap();
        assert!(dry_wired(&set));
        set.reorder(chain, b, 0).unwrap();
        assert!(dry_wired(&set));
        set.remove_effect(chain, a);
        assert!(dry_wired(&set));
        set.remove_effect(chain, b);
        assert!(dry_wired(&set));
    }
}
