//! The render-domain processor.
//!
//! [`Renderer`] lives on the audio thread. Per block it drains the command
//! ring (so a batch of control mutations lands atomically at a block
//! boundary), then runs every sample through the chain cascade and the
//! master stage, accumulates metering, and publishes a report frame at a
//! fixed ≈30 Hz cadence regardless of the block rate.
//!
//! Real-time rules enforced here: no allocation (render slots pre-allocate
//! their capacity), no locks (all traffic is SPSC rings), no frees (retired
//! boxes go to the trash ring), and the output buffer is always written -
//! non-finite samples are flushed to silence rather than propagated.

use std::sync::Arc;
use std::time::Instant;

use rtrb::{Consumer, Producer};

use pulso_core::{Effect, ParameterInfo, SmoothedParam, TopologySnapshot, constant_power_pan};
use pulso_effects::{ChainId, EffectInstanceId, EffectUnit};

use crate::command::{
    ChannelPair, EngineCommand, EngineReport, Metering, PerformanceStats, TrashItem,
};

/// Metering report cadence in Hz.
const REPORT_RATE_HZ: f32 = 30.0;

/// Per-block peak decay factor.
const PEAK_DECAY: f32 = 0.995;

/// Peak-hold duration in seconds.
const PEAK_HOLD_SECONDS: f32 = 2.0;

struct RenderEffect {
    instance: EffectInstanceId,
    processor: Box<dyn EffectUnit>,
    enabled: bool,
}

struct RenderChain {
    id: ChainId,
    effects: Vec<RenderEffect>,
    wet: SmoothedParam,
    dry: SmoothedParam,
}

#[derive(Default)]
struct MeterAccumulator {
    peak: [f32; 2],
    peak_hold: [f32; 2],
    hold_remaining: [u64; 2],
    sum_squares: [f64; 2],
    samples: u64,
}

#[derive(Default)]
struct StatsAccumulator {
    time_sum_ms: f32,
    blocks: u32,
    max_ms: f32,
    block_duration_ms: f32,
    total_samples: u64,
}

/// The audio-thread half of the engine.
pub struct Renderer {
    commands: Consumer<EngineCommand>,
    trash: Producer<TrashItem>,
    reports: Producer<EngineReport>,
    chains: Vec<RenderChain>,
    master_gain: SmoothedParam,
    master_pan: SmoothedParam,
    topology: Option<Arc<TopologySnapshot>>,
    meter: MeterAccumulator,
    stats: StatsAccumulator,
    sample_rate: f32,
    report_interval: u64,
    samples_since_report: u64,
}

impl Renderer {
    pub(crate) fn new(
        commands: Consumer<EngineCommand>,
        trash: Producer<TrashItem>,
        reports: Producer<EngineReport>,
        sample_rate: f32,
    ) -> Self {
        Self {
            commands,
            trash,
            reports,
            chains: Vec::with_capacity(16),
            master_gain: SmoothedParam::fast(1.0, sample_rate),
            master_pan: SmoothedParam::fast(0.0, sample_rate),
            topology: None,
            meter: MeterAccumulator::default(),
            stats: StatsAccumulator::default(),
            sample_rate,
            report_interval: (sample_rate / REPORT_RATE_HZ) as u64,
            samples_since_report: 0,
        }
    }

    /// The per-block render callback.
    ///
    /// Input and output slices must all share one length (the block size).
    /// This always writes the full output, silent in the worst case.
    pub fn process_block(
        &mut self,
        input_left: &[f32],
        input_right: &[f32],
        output_left: &mut [f32],
        output_right: &mut [f32],
    ) {
        let started = Instant::now();
        // Mismatched host buffers must degrade, not panic.
        let block = input_left
            .len()
            .min(input_right.len())
            .min(output_left.len())
            .min(output_right.len());
        debug_assert_eq!(block, input_left.len());

        // Mutations land exactly here; mid-block the topology is frozen.
        self.apply_pending_commands();

        for i in 0..block {
            let mut left = input_left[i];
            let mut right = input_right[i];

            for chain in &mut self.chains {
                (left, right) = Self::process_chain_sample(chain, left, right);
            }

            // Master gain and constant-power pan: left = gain·cos,
            // right = gain·sin over the quarter-circle.
            let gain = self.master_gain.advance();
            let (pan_l, pan_r) = constant_power_pan(self.master_pan.advance());
            left *= gain * pan_l;
            right *= gain * pan_r;

            // The callback must always produce a valid buffer.
            if !left.is_finite() {
                left = 0.0;
            }
            if !right.is_finite() {
                right = 0.0;
            }

            output_left[i] = left;
            output_right[i] = right;
        }

        // Any unmatched tail still gets valid (silent) output.
        output_left[block..].fill(0.0);
        output_right[block..].fill(0.0);

        self.update_metering(&output_left[..block], &output_right[..block]);
        self.update_stats(started, block);
        self.maybe_publish_report(block);
    }

    #[inline]
    fn process_chain_sample(chain: &mut RenderChain, left: f32, right: f32) -> (f32, f32) {
        let wet_gain = chain.wet.advance();
        let dry_gain = chain.dry.advance();

        let mut any_enabled = false;
        let mut wet_l = left;
        let mut wet_r = right;
        for effect in &mut chain.effects {
            if effect.enabled {
                any_enabled = true;
                (wet_l, wet_r) = effect.processor.process_stereo(wet_l, wet_r);
            }
        }
        if any_enabled {
            (
                left * dry_gain + wet_l * wet_gain,
                right * dry_gain + wet_r * wet_gain,
            )
        } else {
            // No wet path exists; the dry ramp still applies so a chain
            // emptying out fades rather than steps.
            (left * dry_gain, right * dry_gain)
        }
    }

    fn apply_pending_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            self.apply_command(command);
        }
    }

    fn apply_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::CreateChain { chain, max_effects } => {
                if self.chains.iter().all(|c| c.id != chain)
                    && self.chains.len() < self.chains.capacity()
                {
                    let mut dry = SmoothedParam::fast(1.0, self.sample_rate);
                    dry.snap_to_target();
                    let mut wet = SmoothedParam::fast(0.0, self.sample_rate);
                    wet.snap_to_target();
                    self.chains.push(RenderChain {
                        id: chain,
                        effects: Vec::with_capacity(max_effects),
                        wet,
                        dry,
                    });
                }
            }
            EngineCommand::AddEffect {
                chain,
                index,
                instance,
                processor,
            } => {
                if let Some(slot) = self.chains.iter_mut().find(|c| c.id == chain) {
                    if slot.effects.len() < slot.effects.capacity() {
                        let at = index.min(slot.effects.len());
                        slot.effects.insert(
                            at,
                            RenderEffect {
                                instance,
                                processor,
                                enabled: true,
                            },
                        );
                        return;
                    }
                }
                // No slot: retire the box instead of leaking or growing.
                let _ = self.trash.push(TrashItem::Processor(processor));
            }
            EngineCommand::RemoveEffect { chain, instance } => {
                if let Some(slot) = self.chains.iter_mut().find(|c| c.id == chain) {
                    if let Some(pos) = slot.effects.iter().position(|e| e.instance == instance) {
                        let removed = slot.effects.remove(pos);
                        let _ = self.trash.push(TrashItem::Processor(removed.processor));
                    }
                }
            }
            EngineCommand::ReorderEffect {
                chain,
                instance,
                index,
            } => {
                if let Some(slot) = self.chains.iter_mut().find(|c| c.id == chain) {
                    if let Some(pos) = slot.effects.iter().position(|e| e.instance == instance) {
                        let effect = slot.effects.remove(pos);
                        let at = index.min(slot.effects.len());
                        slot.effects.insert(at, effect);
                    }
                }
            }
            EngineCommand::SetParam {
                chain,
                instance,
                param,
                value,
            } => {
                if let Some(effect) = self.find_effect(chain, instance) {
                    effect.processor.set_param(param, value);
                }
            }
            EngineCommand::SetEffectEnabled {
                chain,
                instance,
                enabled,
            } => {
                if let Some(effect) = self.find_effect(chain, instance) {
                    effect.enabled = enabled;
                    if !enabled {
                        // A re-enabled effect must not replay stale tails.
                        effect.processor.reset();
                    }
                }
            }
            EngineCommand::SetEffectSync {
                chain,
                instance,
                synced,
            } => {
                if let Some(effect) = self.find_effect(chain, instance) {
                    effect.processor.set_sync(synced);
                }
            }
            EngineCommand::SetWetDry { chain, wet, dry } => {
                if let Some(slot) = self.chains.iter_mut().find(|c| c.id == chain) {
                    slot.wet.set_target(wet);
                    slot.dry.set_target(dry);
                }
            }
            EngineCommand::ResetEffect { chain, instance } => {
                if let Some(effect) = self.find_effect(chain, instance) {
                    effect.processor.reset();
                    effect.processor.reset_params();
                }
            }
            EngineCommand::SetTempo(bpm) => {
                for chain in &mut self.chains {
                    for effect in &mut chain.effects {
                        effect.processor.set_tempo(bpm);
                    }
                }
            }
            EngineCommand::SetMasterGain(gain) => {
                self.master_gain.set_target(gain.clamp(0.0, 4.0));
            }
            EngineCommand::SetMasterPan(pan) => {
                self.master_pan.set_target(pan.clamp(-1.0, 1.0));
            }
            EngineCommand::ReplaceTopology(snapshot) => {
                if let Some(old) = self.topology.replace(snapshot) {
                    let _ = self.trash.push(TrashItem::Snapshot(old));
                }
            }
            EngineCommand::ClearAllChains => {
                for mut chain in self.chains.drain(..) {
                    for effect in chain.effects.drain(..) {
                        let _ = self.trash.push(TrashItem::Processor(effect.processor));
                    }
                }
            }
        }
    }

    fn find_effect(
        &mut self,
        chain: ChainId,
        instance: EffectInstanceId,
    ) -> Option<&mut RenderEffect> {
        self.chains
            .iter_mut()
            .find(|c| c.id == chain)?
            .effects
            .iter_mut()
            .find(|e| e.instance == instance)
    }

    fn update_metering(&mut self, left: &[f32], right: &[f32]) {
        let hold_samples = (PEAK_HOLD_SECONDS * self.sample_rate) as u64;
        for (channel, samples) in [left, right].into_iter().enumerate() {
            let mut block_peak = 0.0f32;
            let mut sum = 0.0f64;
            for &s in samples {
                let mag = s.abs();
                block_peak = block_peak.max(mag);
                sum += f64::from(s) * f64::from(s);
            }

            self.meter.peak[channel] = block_peak.max(self.meter.peak[channel] * PEAK_DECAY);
            self.meter.sum_squares[channel] += sum;

            if block_peak > self.meter.peak_hold[channel] {
                self.meter.peak_hold[channel] = block_peak;
                self.meter.hold_remaining[channel] = hold_samples;
            } else if self.meter.hold_remaining[channel] > samples.len() as u64 {
                self.meter.hold_remaining[channel] -= samples.len() as u64;
            } else {
                self.meter.hold_remaining[channel] = 0;
                self.meter.peak_hold[channel] *= PEAK_DECAY;
            }
        }
        self.meter.samples += left.len() as u64;
    }

    fn update_stats(&mut self, started: Instant, block: usize) {
        let elapsed_ms = started.elapsed().as_secs_f32() * 1000.0;
        self.stats.time_sum_ms += elapsed_ms;
        self.stats.blocks += 1;
        self.stats.max_ms = self.stats.max_ms.max(elapsed_ms);
        self.stats.block_duration_ms = block as f32 / self.sample_rate * 1000.0;
        self.stats.total_samples += block as u64;
    }

    fn maybe_publish_report(&mut self, block: usize) {
        self.samples_since_report += block as u64;
        if self.samples_since_report < self.report_interval {
            return;
        }
        self.samples_since_report = 0;

        let rms = |channel: usize| -> f32 {
            if self.meter.samples == 0 {
                0.0
            } else {
                ((self.meter.sum_squares[channel] / self.meter.samples as f64) as f32).sqrt()
            }
        };
        let avg_ms = if self.stats.blocks == 0 {
            0.0
        } else {
            self.stats.time_sum_ms / self.stats.blocks as f32
        };
        let cpu = if self.stats.block_duration_ms > 0.0 {
            (avg_ms / self.stats.block_duration_ms * 100.0).min(100.0)
        } else {
            0.0
        };

        let report = EngineReport {
            metering: Metering {
                peak: ChannelPair {
                    l: self.meter.peak[0],
                    r: self.meter.peak[1],
                },
                rms: ChannelPair {
                    l: rms(0),
                    r: rms(1),
                },
                peak_hold: ChannelPair {
                    l: self.meter.peak_hold[0],
                    r: self.meter.peak_hold[1],
                },
            },
            stats: PerformanceStats {
                avg_processing_time_ms: avg_ms,
                max_processing_time_ms: self.stats.max_ms,
                cpu_usage_pct: cpu,
                sample_count: self.stats.total_samples,
            },
        };
        // A full report ring drops the frame; the next cadence tick
        // carries fresh values anyway.
        let _ = self.reports.push(report);

        // RMS and averages restart per report period; peaks decay across
        // periods.
        self.meter.sum_squares = [0.0; 2];
        self.meter.samples = 0;
        self.stats.time_sum_ms = 0.0;
        self.stats.blocks = 0;
    }
}
