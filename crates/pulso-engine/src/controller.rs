//! The control-domain handle.
//!
//! [`EngineController`] owns the authoritative chain/graph state and is the
//! single writer of the command ring, which serializes concurrent
//! control-domain callers and keeps graph operations applied in submission
//! order. It also implements the control protocol used by the UI and
//! automation layers: parameter writes, metering, performance stats, and
//! effect resets.

use std::sync::Arc;

use rtrb::{Consumer, Producer};
use tracing::{debug, warn};

use pulso_core::graph::RoutingDocument;
use pulso_core::{Effect, ParamDescriptor, ParameterInfo, ResponseCurve};
use pulso_effects::{ChainError, ChainId, ChainSet, EffectInstanceId, EffectKind};

use crate::command::{EngineCommand, EngineReport, Metering, PerformanceStats, TrashItem};

/// Errors surfaced by control operations.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EngineError {
    /// A chain operation failed.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// The command ring is full; the mutation was not delivered.
    #[error("engine command ring is full")]
    CommandRingFull,
}

/// One controller-to-parameter mapping table entry.
#[derive(Debug, Clone)]
pub struct ControlMapping {
    /// Hardware controller identity.
    pub controller_id: u32,
    /// Control (knob/fader/CC) index on that controller.
    pub control_index: u32,
    /// Target chain.
    pub chain: ChainId,
    /// Target effect instance.
    pub effect: EffectInstanceId,
    /// Target parameter name.
    pub parameter: String,
    /// Response curve from normalized travel to the parameter range.
    pub curve: ResponseCurve,
}

/// Control-domain half of the engine.
pub struct EngineController {
    chains: ChainSet,
    commands: Producer<EngineCommand>,
    trash: Consumer<TrashItem>,
    reports: Consumer<EngineReport>,
    latest_report: EngineReport,
    mappings: Vec<ControlMapping>,
    sample_rate: f32,
}

impl EngineController {
    pub(crate) fn new(
        commands: Producer<EngineCommand>,
        trash: Consumer<TrashItem>,
        reports: Consumer<EngineReport>,
        sample_rate: f32,
    ) -> Self {
        Self {
            chains: ChainSet::new(sample_rate),
            commands,
            trash,
            reports,
            latest_report: EngineReport::default(),
            mappings: Vec::new(),
            sample_rate,
        }
    }

    /// The chain set (and through it, the routing graph).
    pub fn chains(&self) -> &ChainSet {
        &self.chains
    }

    /// Sample rate the engine runs at.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    // --- Chain / effect lifecycle ---

    /// Create a chain and its render slot.
    pub fn create_chain(
        &mut self,
        name: impl Into<String>,
        max_effects: usize,
    ) -> Result<ChainId, EngineError> {
        let chain = self.chains.create_chain(name, max_effects);
        self.push(EngineCommand::CreateChain { chain, max_effects })?;
        self.sync_wet_dry(chain)?;
        self.publish_topology()?;
        Ok(chain)
    }

    /// Add an effect; the processor is built and parameterized here, then
    /// shipped to the render domain.
    pub fn add_effect(
        &mut self,
        chain: ChainId,
        kind: EffectKind,
        params: &[(&str, f32)],
    ) -> Result<EffectInstanceId, EngineError> {
        let instance = self.chains.add_effect(chain, kind, params)?;

        let state = self
            .chains
            .chain(chain)
            .and_then(|c| c.effect(instance))
            .expect("instance just added");
        let mut processor = kind.create(self.sample_rate);
        for (index, &value) in state.parameters.iter().enumerate() {
            processor.set_param(index, value);
        }
        processor.set_tempo(self.chains.tempo().bpm());
        let index = self
            .chains
            .chain(chain)
            .map(|c| c.effects().iter().position(|e| e.id == instance).unwrap_or(0))
            .unwrap_or(0);

        self.push(EngineCommand::AddEffect {
            chain,
            index,
            instance,
            processor,
        })?;
        self.sync_wet_dry(chain)?;
        self.publish_topology()?;
        debug!(chain = chain.0, kind = kind.id(), "effect shipped to renderer");
        Ok(instance)
    }

    /// Remove an effect. Returns `false` for unknown handles.
    pub fn remove_effect(&mut self, chain: ChainId, instance: EffectInstanceId) -> bool {
        if !self.chains.remove_effect(chain, instance) {
            return false;
        }
        let mut delivered = self.push(EngineCommand::RemoveEffect { chain, instance });
        if delivered.is_ok() {
            delivered = self.sync_wet_dry(chain);
        }
        if delivered.is_ok() {
            delivered = self.publish_topology();
        }
        if delivered.is_err() {
            warn!(chain = chain.0, "remove delivered partially: ring full");
        }
        true
    }

    /// Move an effect within its chain.
    pub fn reorder(
        &mut self,
        chain: ChainId,
        instance: EffectInstanceId,
        new_index: usize,
    ) -> Result<(), EngineError> {
        self.chains.reorder(chain, instance, new_index)?;
        self.push(EngineCommand::ReorderEffect {
            chain,
            instance,
            index: new_index,
        })?;
        self.publish_topology()
    }

    // --- Control protocol ---

    /// `set_effect_parameter`: clamp to the declared range, apply, and
    /// forward to the render domain. Returns the applied value.
    pub fn set_effect_parameter(
        &mut self,
        chain: ChainId,
        instance: EffectInstanceId,
        name: &str,
        value: f32,
    ) -> Result<f32, EngineError> {
        let applied = self.chains.set_parameter(chain, instance, name, value)?;
        let param = self.chains.parameter_index(chain, instance, name)?;
        self.push(EngineCommand::SetParam {
            chain,
            instance,
            param,
            value: applied,
        })?;
        Ok(applied)
    }

    /// `reset_effect`: restore declared defaults and clear DSP state.
    pub fn reset_effect(
        &mut self,
        chain: ChainId,
        instance: EffectInstanceId,
    ) -> Result<(), EngineError> {
        self.chains.reset_effect(chain, instance)?;
        self.push(EngineCommand::ResetEffect { chain, instance })
    }

    /// `get_metering`: the most recent ≈30 Hz metering frame.
    pub fn metering(&mut self) -> Metering {
        self.drain_reports();
        self.latest_report.metering
    }

    /// `get_performance_stats`: the most recent render-callback counters.
    pub fn performance_stats(&mut self) -> PerformanceStats {
        self.drain_reports();
        self.latest_report.stats
    }

    // --- Mix, enable, sync, tempo, master ---

    /// Set a chain's wet/dry mix.
    pub fn set_mix(&mut self, chain: ChainId, mix: f32) -> Result<(), EngineError> {
        self.chains.set_mix(chain, mix)?;
        self.sync_wet_dry(chain)
    }

    /// Enable or disable an effect instance.
    pub fn set_effect_enabled(
        &mut self,
        chain: ChainId,
        instance: EffectInstanceId,
        enabled: bool,
    ) -> Result<(), EngineError> {
        self.chains.set_effect_enabled(chain, instance, enabled)?;
        self.push(EngineCommand::SetEffectEnabled {
            chain,
            instance,
            enabled,
        })?;
        self.sync_wet_dry(chain)?;
        self.publish_topology()
    }

    /// Flag an instance as BPM-synced (syncable kinds only).
    pub fn set_bpm_sync(
        &mut self,
        chain: ChainId,
        instance: EffectInstanceId,
        synced: bool,
    ) -> Result<(), EngineError> {
        self.chains.set_bpm_sync(chain, instance, synced)?;
        self.push(EngineCommand::SetEffectSync {
            chain,
            instance,
            synced,
        })
    }

    /// Change the global tempo; synced effects ramp to the new timing.
    pub fn set_tempo(&mut self, bpm: f32) -> Result<(), EngineError> {
        self.chains.set_tempo(bpm);
        self.push(EngineCommand::SetTempo(bpm.max(1.0)))
    }

    /// Master output gain (linear).
    pub fn set_master_gain(&mut self, gain: f32) -> Result<(), EngineError> {
        self.push(EngineCommand::SetMasterGain(gain))
    }

    /// Master pan in [-1, 1].
    pub fn set_master_pan(&mut self, pan: f32) -> Result<(), EngineError> {
        self.push(EngineCommand::SetMasterPan(pan))
    }

    // --- Controller mapping ---

    /// Register a control mapping. An existing mapping for the same
    /// (controller, control) pair is replaced.
    pub fn map_control(&mut self, mapping: ControlMapping) {
        self.mappings.retain(|m| {
            !(m.controller_id == mapping.controller_id
                && m.control_index == mapping.control_index)
        });
        self.mappings.push(mapping);
    }

    /// Remove a mapping. Returns `false` if none existed.
    pub fn unmap_control(&mut self, controller_id: u32, control_index: u32) -> bool {
        let before = self.mappings.len();
        self.mappings
            .retain(|m| !(m.controller_id == controller_id && m.control_index == control_index));
        self.mappings.len() != before
    }

    /// Dispatch an incoming control event.
    ///
    /// The raw value is normalized against `raw_max` (127 for MIDI CC),
    /// mapped through the entry's response curve into the parameter's
    /// declared range, and applied. Returns the applied value, or `None`
    /// when no mapping matches.
    pub fn handle_control_event(
        &mut self,
        controller_id: u32,
        control_index: u32,
        raw_value: f32,
        raw_max: f32,
    ) -> Option<Result<f32, EngineError>> {
        let mapping = self
            .mappings
            .iter()
            .find(|m| m.controller_id == controller_id && m.control_index == control_index)?
            .clone();

        let normalized = if raw_max > 0.0 {
            (raw_value / raw_max).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let descriptor = self.parameter_descriptor(mapping.chain, mapping.effect, &mapping.parameter);
        let Some(descriptor) = descriptor else {
            return Some(Err(EngineError::Chain(ChainError::UnknownEffect(
                mapping.effect,
            ))));
        };
        let value = mapping
            .curve
            .apply(normalized, descriptor.min, descriptor.max);
        Some(self.set_effect_parameter(mapping.chain, mapping.effect, &mapping.parameter, value))
    }

    fn parameter_descriptor(
        &self,
        chain: ChainId,
        instance: EffectInstanceId,
        name: &str,
    ) -> Option<ParamDescriptor> {
        let state = self.chains.chain(chain)?.effect(instance)?;
        state
            .kind
            .descriptor()
            .params
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    // --- Documents & housekeeping ---

    /// Export the full routing document: graph plus signal chains.
    pub fn export_document(&self) -> RoutingDocument {
        let mut document = self.chains.graph().export_document();
        document.signal_chains = self.chains.export_chains();
        document
    }

    /// Import a routing document, replacing every chain.
    ///
    /// Atomic on the control side: the specs validate before any state is
    /// cleared. The render domain is rebuilt through the command ring -
    /// tear-down, then each chain and effect in order, so it only ever
    /// observes complete states at block boundaries. Control mappings are
    /// dropped, since their instance handles no longer exist.
    pub fn import_document(&mut self, document: &RoutingDocument) -> Result<(), EngineError> {
        pulso_effects::ChainSet::validate_chain_specs(&document.signal_chains)?;

        let chain_ids = self.chains.import_chains(&document.signal_chains)?;
        self.mappings.clear();
        self.push(EngineCommand::ClearAllChains)?;

        for &chain in &chain_ids {
            let (max_effects, instances) = {
                let state = self
                    .chains
                    .chain(chain)
                    .ok_or(EngineError::Chain(ChainError::UnknownChain(chain)))?;
                let instances: Vec<_> = state
                    .effects()
                    .iter()
                    .map(|e| (e.id, e.kind, e.parameters.clone(), e.enabled, e.bpm_sync))
                    .collect();
                (state.max_effects(), instances)
            };

            self.push(EngineCommand::CreateChain { chain, max_effects })?;
            for (index, (instance, kind, parameters, enabled, bpm_sync)) in
                instances.into_iter().enumerate()
            {
                let mut processor = kind.create(self.sample_rate);
                for (param, &value) in parameters.iter().enumerate() {
                    processor.set_param(param, value);
                }
                processor.set_sync(bpm_sync);
                processor.set_tempo(self.chains.tempo().bpm());
                self.push(EngineCommand::AddEffect {
                    chain,
                    index,
                    instance,
                    processor,
                })?;
                if !enabled {
                    self.push(EngineCommand::SetEffectEnabled {
                        chain,
                        instance,
                        enabled: false,
                    })?;
                }
            }
            self.sync_wet_dry(chain)?;
        }
        self.publish_topology()?;
        debug!(chains = chain_ids.len(), "document imported");
        Ok(())
    }

    /// Drop allocations the render domain retired. Call periodically from
    /// the control thread. Returns how many items were freed.
    pub fn collect_garbage(&mut self) -> usize {
        let mut freed = 0;
        while self.trash.pop().is_ok() {
            freed += 1;
        }
        freed
    }

    fn drain_reports(&mut self) {
        while let Ok(report) = self.reports.pop() {
            self.latest_report = report;
        }
    }

    fn sync_wet_dry(&mut self, chain: ChainId) -> Result<(), EngineError> {
        let (wet, dry) = self
            .chains
            .chain(chain)
            .map(pulso_effects::EffectChain::wet_dry_gains)
            .ok_or(EngineError::Chain(ChainError::UnknownChain(chain)))?;
        self.push(EngineCommand::SetWetDry { chain, wet, dry })
    }

    fn publish_topology(&mut self) -> Result<(), EngineError> {
        let snapshot = Arc::new(self.chains.graph().snapshot());
        self.push(EngineCommand::ReplaceTopology(snapshot))
    }

    fn push(&mut self, command: EngineCommand) -> Result<(), EngineError> {
        self.commands
            .push(command)
            .map_err(|_| EngineError::CommandRingFull)
    }
}
