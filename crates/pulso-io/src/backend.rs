//! The host-platform abstraction.
//!
//! [`RenderHost`] is the only seam between the engine and a platform audio
//! API: enumerate devices, build an output stream against a boxed
//! interleaved callback. Boxed closures keep the trait object-safe so
//! backends can be selected at runtime, and [`StreamHandle`] erases the
//! backend's stream type while keeping it alive RAII-style.

use pulso_engine::Renderer;

use crate::Result;

/// An audio device as reported by the host.
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Human-readable name.
    pub name: String,
    /// Whether the device can play audio.
    pub is_output: bool,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
}

/// Requested stream parameters.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred block size in frames.
    pub buffer_size: u32,
    /// Device name filter; system default when `None`.
    pub device_name: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 256,
            device_name: None,
        }
    }
}

/// Output callback: fill an interleaved stereo buffer (`[L0, R0, L1, …]`).
///
/// Runs on the host's real-time thread; implementations must not allocate,
/// lock, or block.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Stream error callback, invoked off the render path.
pub type ErrorCallback = Box<dyn FnMut(String) + Send>;

/// Type-erased stream handle. The stream runs until this is dropped.
pub struct StreamHandle {
    _inner: Box<dyn std::any::Any>,
}

impl StreamHandle {
    /// Wrap a backend stream object.
    pub fn new<T: 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// A host audio platform the engine can register its render callback with.
pub trait RenderHost {
    /// Enumerate output-capable devices.
    fn list_devices(&self) -> Result<Vec<AudioDevice>>;

    /// Build and start an output stream driving `render` per block.
    fn build_output_stream(
        &self,
        config: &StreamConfig,
        render: OutputCallback,
        error: ErrorCallback,
    ) -> Result<StreamHandle>;
}

/// Largest block the adapter pre-allocates for.
const MAX_BLOCK_FRAMES: usize = 8192;

/// Adapt an engine [`Renderer`] plus a source into an interleaved
/// [`OutputCallback`].
///
/// `source` fills the per-channel input for each block (deck playback,
/// a test oscillator, silence). Scratch buffers are allocated once here,
/// never in the callback.
pub fn renderer_callback(
    mut renderer: Renderer,
    mut source: impl FnMut(&mut [f32], &mut [f32]) + Send + 'static,
) -> OutputCallback {
    let mut in_l = vec![0.0f32; MAX_BLOCK_FRAMES];
    let mut in_r = vec![0.0f32; MAX_BLOCK_FRAMES];
    let mut out_l = vec![0.0f32; MAX_BLOCK_FRAMES];
    let mut out_r = vec![0.0f32; MAX_BLOCK_FRAMES];

    Box::new(move |buffer: &mut [f32]| {
        let frames = (buffer.len() / 2).min(MAX_BLOCK_FRAMES);

        in_l[..frames].fill(0.0);
        in_r[..frames].fill(0.0);
        source(&mut in_l[..frames], &mut in_r[..frames]);

        renderer.process_block(
            &in_l[..frames],
            &in_r[..frames],
            &mut out_l[..frames],
            &mut out_r[..frames],
        );

        for frame in 0..frames {
            buffer[frame * 2] = out_l[frame];
            buffer[frame * 2 + 1] = out_r[frame];
        }
        // Anything past the pre-allocated ceiling stays silent.
        for sample in &mut buffer[frames * 2..] {
            *sample = 0.0;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulso_engine::create_engine;

    #[test]
    fn adapter_interleaves_renderer_output() {
        let (_controller, renderer) = create_engine(48000.0);
        let mut callback = renderer_callback(renderer, |left, right| {
            left.fill(0.5);
            right.fill(-0.5);
        });

        let mut buffer = vec![0.0f32; 64];
        // Let the master ramps settle.
        for _ in 0..200 {
            callback(&mut buffer);
        }

        // Center pan law: ±0.5 · cos(π/4).
        assert!((buffer[0] - 0.3535).abs() < 0.01, "left {}", buffer[0]);
        assert!((buffer[1] + 0.3535).abs() < 0.01, "right {}", buffer[1]);
    }

    #[test]
    fn oversized_host_buffer_is_silenced_past_ceiling() {
        let (_controller, renderer) = create_engine(48000.0);
        let mut callback = renderer_callback(renderer, |_, _| {});
        let mut buffer = vec![1.0f32; (MAX_BLOCK_FRAMES + 16) * 2];
        callback(&mut buffer);
        assert!(buffer[MAX_BLOCK_FRAMES * 2..].iter().all(|&s| s == 0.0));
    }
}
