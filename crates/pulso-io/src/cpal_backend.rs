//! cpal implementation of [`RenderHost`].

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Host, SampleRate};
use tracing::{error, info};

use crate::backend::{
    AudioDevice, ErrorCallback, OutputCallback, RenderHost, StreamConfig, StreamHandle,
};
use crate::{Error, Result};

/// The default desktop host: ALSA on Linux, CoreAudio on macOS, WASAPI on
/// Windows.
pub struct CpalHost {
    host: Host,
}

impl Default for CpalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalHost {
    /// Connect to the platform's default audio host.
    pub fn new() -> Self {
        let host = cpal::default_host();
        info!(host = host.id().name(), "audio host initialized");
        Self { host }
    }

    fn find_output_device(&self, name: Option<&str>) -> Result<cpal::Device> {
        match name {
            Some(search) => {
                let needle = search.to_lowercase();
                let devices = self
                    .host
                    .output_devices()
                    .map_err(|e| Error::Stream(e.to_string()))?;
                for device in devices {
                    if let Ok(device_name) = device.name() {
                        if device_name.to_lowercase().contains(&needle) {
                            return Ok(device);
                        }
                    }
                }
                Err(Error::DeviceNotFound(search.to_string()))
            }
            None => self.host.default_output_device().ok_or(Error::NoDevice),
        }
    }
}

impl RenderHost for CpalHost {
    fn list_devices(&self) -> Result<Vec<AudioDevice>> {
        let mut devices = Vec::new();
        let outputs = self
            .host
            .output_devices()
            .map_err(|e| Error::Stream(e.to_string()))?;
        for device in outputs {
            let Ok(name) = device.name() else { continue };
            let default_sample_rate = device
                .default_output_config()
                .map(|c| c.sample_rate().0)
                .unwrap_or(48000);
            devices.push(AudioDevice {
                name,
                is_output: true,
                default_sample_rate,
            });
        }
        Ok(devices)
    }

    fn build_output_stream(
        &self,
        config: &StreamConfig,
        mut render: OutputCallback,
        mut error_cb: ErrorCallback,
    ) -> Result<StreamHandle> {
        let device = self.find_output_device(config.device_name.as_deref())?;
        let stream_config = cpal::StreamConfig {
            channels: 2,
            sample_rate: SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
        };

        let stream = device
            .build_output_stream(
                &stream_config,
                move |buffer: &mut [f32], _info| {
                    render(buffer);
                },
                move |err| {
                    error!(%err, "audio stream error");
                    error_cb(err.to_string());
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        info!(
            sample_rate = config.sample_rate,
            buffer = config.buffer_size,
            "output stream started"
        );
        Ok(StreamHandle::new(stream))
    }
}
