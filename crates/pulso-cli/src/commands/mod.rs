//! CLI subcommands.

pub mod analyze;
pub mod devices;
pub mod effects;
pub mod play;
pub mod stretch;
