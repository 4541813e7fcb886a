//! Pulso Effects - The effect catalog and chain engine
//!
//! This crate provides the closed catalog of DJ effects and the chain engine
//! that arranges them over the routing graph:
//!
//! - [`EffectKind`] - Closed effect enumeration with a factory table
//! - [`ThreeBandEq`] - Low shelf / mid peak / high shelf EQ
//! - [`Compressor`] - Program compressor with linked stereo detection
//! - [`SyncDelay`] - Feedback delay with damped repeats, BPM-syncable
//! - [`Echo`] - Multi-tap echo, BPM-syncable
//! - [`Reverb`] - Schroeder comb/allpass algorithmic tail
//! - [`SweepFilter`] - Resonant lowpass/highpass sweep filter
//! - [`Roll`] / [`Stutter`] / [`BeatJump`] - Beat-locked loop effects
//! - [`EffectChain`] / [`ChainSet`] - Ordered, wet/dry-mixed chains wired
//!   through the routing graph
//!
//! Every effect implements [`Effect`](pulso_core::Effect) and
//! [`ParameterInfo`](pulso_core::ParameterInfo); the chain engine clamps
//! parameter writes against the declared ranges and recomputes BPM-synced
//! times through smoothed ramps, never jumps.

pub mod beat_jump;
pub mod chain;
pub mod compressor;
pub mod delay;
pub mod echo;
pub mod eq;
pub mod filter;
pub mod kind;
pub mod reverb;
pub mod roll;
pub mod stutter;

pub use beat_jump::BeatJump;
pub use chain::{ChainError, ChainId, ChainSet, EffectChain, EffectInstance, EffectInstanceId};
pub use compressor::Compressor;
pub use delay::SyncDelay;
pub use echo::Echo;
pub use eq::ThreeBandEq;
pub use filter::SweepFilter;
pub use kind::{EffectCategory, EffectDescriptor, EffectKind, EffectUnit};
pub use reverb::Reverb;
pub use roll::Roll;
pub use stutter::Stutter;
