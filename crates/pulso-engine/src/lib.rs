//! Pulso Engine - The control/render domain split
//!
//! The engine is two halves of one object:
//!
//! - [`EngineController`] (control domain) owns the chain set and routing
//!   graph, validates every mutation, builds processors, and is the single
//!   writer of the command ring.
//! - [`Renderer`] (render domain) is handed to the host audio platform's
//!   callback. It drains commands at block boundaries, runs the per-sample
//!   chain cascade and master stage, and publishes metering/performance
//!   reports at ≈30 Hz.
//!
//! All cross-domain traffic is lock-free SPSC rings; the render domain
//! never allocates, never frees (retired boxes return on the trash ring),
//! and always writes a valid output buffer.
//!
//! [`OfflinePool`] runs analysis and stretch jobs on worker threads with
//! cancellation and latest-wins supersession per source.

pub mod command;
pub mod controller;
pub mod offline;
pub mod renderer;

use rtrb::RingBuffer;

pub use command::{
    ChannelPair, EngineCommand, EngineReport, Metering, PerformanceStats, TrashItem,
};
pub use controller::{ControlMapping, EngineController, EngineError};
pub use offline::{JobOutput, JobResult, OfflinePool};
pub use renderer::Renderer;

use command::{COMMAND_RING_CAPACITY, REPORT_RING_CAPACITY, TRASH_RING_CAPACITY};

/// Create a connected controller/renderer pair.
///
/// The controller stays on the control thread; the renderer moves into the
/// host platform's audio callback.
pub fn create_engine(sample_rate: f32) -> (EngineController, Renderer) {
    let (command_tx, command_rx) = RingBuffer::new(COMMAND_RING_CAPACITY);
    let (trash_tx, trash_rx) = RingBuffer::new(TRASH_RING_CAPACITY);
    let (report_tx, report_rx) = RingBuffer::new(REPORT_RING_CAPACITY);

    let controller = EngineController::new(command_tx, trash_rx, report_rx, sample_rate);
    let renderer = Renderer::new(command_rx, trash_tx, report_tx, sample_rate);
    (controller, renderer)
}
