//! Pulso Core - DSP primitives and the signal-routing graph
//!
//! This crate provides the foundational building blocks of the Pulso audio
//! engine: stereo effect traits, parameter smoothing and introspection,
//! filters and delay lines, tempo utilities, and the routing graph that every
//! audio path in the application flows through.
//!
//! # Core Abstractions
//!
//! ## Effect System
//!
//! - [`Effect`] - Object-safe trait for all audio processors (mono + stereo)
//! - [`ParameterInfo`] - Runtime parameter discovery for controllers and UIs
//!
//! ## Parameter Smoothing
//!
//! - [`SmoothedParam`] - One-pole exponential ramps for zipper-free changes
//!
//! ## Filters & Delays
//!
//! - [`Biquad`] - Second-order IIR with RBJ cookbook coefficients
//!   (including the shelving types used by the render EQ)
//! - [`DelayLine`] - Fractional-read circular delay
//! - [`CombFilter`] / [`AllpassFilter`] - Reverb building blocks
//! - [`OnePole`] - Feedback-path tone filter
//!
//! ## Tempo
//!
//! - [`TempoClock`] / [`NoteDivision`] - Beat-length math for synced effects
//!
//! ## Routing Graph
//!
//! The [`graph`] module holds the mutable module/port/connection graph, its
//! typed change notifications, the immutable render snapshots published to
//! the audio thread, and the JSON export/import schema.
//!
//! # Design Principles
//!
//! - **Real-time safe**: no allocations or locks in audio processing paths
//! - **Explicit contexts**: no global state; the graph and clocks are plain
//!   objects passed to their collaborators

pub mod allpass;
pub mod biquad;
pub mod comb;
pub mod delay_line;
pub mod effect;
pub mod envelope;
pub mod graph;
pub mod math;
pub mod one_pole;
pub mod param;
pub mod pcm;
pub mod param_info;
pub mod tempo;

pub use allpass::AllpassFilter;
pub use biquad::{
    Biquad, highpass_coefficients, highshelf_coefficients, lowpass_coefficients,
    lowshelf_coefficients, peaking_eq_coefficients,
};
pub use comb::CombFilter;
pub use delay_line::DelayLine;
pub use effect::Effect;
pub use envelope::EnvelopeFollower;
pub use graph::{
    Connection, ConnectionId, GraphError, GraphEvent, ListenerId, Module, ModuleCategory,
    ModuleId, Port, PortDirection, PortId, PortKind, RoutingGraph, TopologySnapshot,
};
pub use math::{
    constant_power_pan, db_to_linear, equal_power_gains, flush_denormal, linear_to_db, mono_fold,
};
pub use one_pole::OnePole;
pub use param::SmoothedParam;
pub use pcm::PcmBuffer;
pub use param_info::{ParamDescriptor, ParamUnit, ParameterInfo, ResponseCurve};
pub use tempo::{NoteDivision, TempoClock};
