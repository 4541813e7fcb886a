//! Pulso IO - Host audio platform boundary
//!
//! The engine's render logic never touches a platform audio API; it
//! implements [`Renderer::process_block`](pulso_engine::Renderer) and this
//! crate adapts it to whatever host is present:
//!
//! - [`RenderHost`] - the platform abstraction (device listing + stream
//!   construction against an interleaved output callback)
//! - [`CpalHost`] - the cpal implementation (ALSA/CoreAudio/WASAPI)
//! - [`wav`] - hound-based WAV decode/encode into [`PcmBuffer`]s, standing
//!   in for the external decoder in tests and the CLI
//!
//! [`PcmBuffer`]: pulso_core::PcmBuffer

pub mod backend;
pub mod cpal_backend;
pub mod wav;

pub use backend::{
    AudioDevice, ErrorCallback, OutputCallback, RenderHost, StreamConfig, StreamHandle,
    renderer_callback,
};
pub use cpal_backend::CpalHost;
pub use wav::{read_wav, write_wav};

/// Errors from the I/O layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV read/write failure.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Stream setup or runtime failure.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// No audio device is available.
    #[error("no audio device available")]
    NoDevice,

    /// The requested device was not found.
    #[error("audio device not found: {0}")]
    DeviceNotFound(String),
}

/// Result alias for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
