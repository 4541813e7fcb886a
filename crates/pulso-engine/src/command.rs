//! The control→render command ring and the render→control trash ring.
//!
//! All cross-domain traffic is single-producer single-consumer and
//! lock-free (`rtrb`). Commands carry fully constructed state, boxed
//! processors, `Arc` topology snapshots, so the render domain only ever
//! installs or removes, never allocates. Retired allocations travel back on
//! the trash ring and are dropped by the control domain.

use std::sync::Arc;

use pulso_core::TopologySnapshot;
use pulso_effects::{ChainId, EffectInstanceId, EffectUnit};

/// Ring capacities. Sized generously; a full command ring makes the
/// control call report failure rather than block.
pub(crate) const COMMAND_RING_CAPACITY: usize = 256;
pub(crate) const TRASH_RING_CAPACITY: usize = 256;
pub(crate) const REPORT_RING_CAPACITY: usize = 64;

/// One mutation applied by the render domain at a block boundary.
pub enum EngineCommand {
    /// Register a chain's render slot.
    CreateChain {
        /// Chain handle.
        chain: ChainId,
        /// Maximum effects; the render slot pre-allocates this capacity so
        /// later inserts never reallocate on the audio thread.
        max_effects: usize,
    },
    /// Insert a fully constructed processor.
    AddEffect {
        /// Owning chain.
        chain: ChainId,
        /// Position in the chain.
        index: usize,
        /// Instance handle.
        instance: EffectInstanceId,
        /// The processor, built and parameterized in the control domain.
        processor: Box<dyn EffectUnit>,
    },
    /// Remove a processor (it returns via the trash ring).
    RemoveEffect {
        /// Owning chain.
        chain: ChainId,
        /// Instance handle.
        instance: EffectInstanceId,
    },
    /// Move a processor to a new position.
    ReorderEffect {
        /// Owning chain.
        chain: ChainId,
        /// Instance handle.
        instance: EffectInstanceId,
        /// New position.
        index: usize,
    },
    /// Set one parameter by index.
    SetParam {
        /// Owning chain.
        chain: ChainId,
        /// Instance handle.
        instance: EffectInstanceId,
        /// Parameter index in descriptor order.
        param: usize,
        /// Clamped plain value.
        value: f32,
    },
    /// Include or exclude a processor from the wet path.
    SetEffectEnabled {
        /// Owning chain.
        chain: ChainId,
        /// Instance handle.
        instance: EffectInstanceId,
        /// New state.
        enabled: bool,
    },
    /// Toggle tempo following on a processor.
    SetEffectSync {
        /// Owning chain.
        chain: ChainId,
        /// Instance handle.
        instance: EffectInstanceId,
        /// New state.
        synced: bool,
    },
    /// New wet/dry gain targets (already equal-power mapped).
    SetWetDry {
        /// Owning chain.
        chain: ChainId,
        /// Wet gain target.
        wet: f32,
        /// Dry gain target.
        dry: f32,
    },
    /// Clear a processor's DSP state and restore parameter defaults.
    ResetEffect {
        /// Owning chain.
        chain: ChainId,
        /// Instance handle.
        instance: EffectInstanceId,
    },
    /// Global tempo change; synced processors ramp to the new timing.
    SetTempo(f32),
    /// Master output gain target (linear).
    SetMasterGain(f32),
    /// Master pan target in [-1, 1].
    SetMasterPan(f32),
    /// Install a new immutable topology snapshot.
    ReplaceTopology(Arc<TopologySnapshot>),
    /// Tear down every render chain (document import). Processors retire
    /// through the trash ring.
    ClearAllChains,
}

/// Allocations retired by the render domain, to be dropped control-side.
pub enum TrashItem {
    /// A removed or replaced processor.
    Processor(Box<dyn EffectUnit>),
    /// A superseded topology snapshot.
    Snapshot(Arc<TopologySnapshot>),
}

/// Left/right value pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct ChannelPair {
    /// Left channel value.
    pub l: f32,
    /// Right channel value.
    pub r: f32,
}

/// Metering frame reported at the fixed cadence.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct Metering {
    /// Decaying peak level per channel.
    pub peak: ChannelPair,
    /// RMS level over the report period per channel.
    pub rms: ChannelPair,
    /// Peak-hold level (2 s hold, then decay) per channel.
    pub peak_hold: ChannelPair,
}

/// Render-callback performance counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceStats {
    /// Mean block processing time in milliseconds.
    pub avg_processing_time_ms: f32,
    /// Worst block processing time in milliseconds.
    pub max_processing_time_ms: f32,
    /// Processing time over block duration, in percent.
    pub cpu_usage_pct: f32,
    /// Total samples rendered.
    pub sample_count: u64,
}

/// One report frame published by the render domain at ≈30 Hz.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineReport {
    /// Metering values.
    pub metering: Metering,
    /// Performance counters.
    pub stats: PerformanceStats,
}
