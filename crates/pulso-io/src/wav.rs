//! WAV decode/encode into [`PcmBuffer`]s.
//!
//! A convenience stand-in for the external decoder: tests and the CLI load
//! WAV files, the engine proper only ever sees `PcmBuffer`s.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::info;

use pulso_core::PcmBuffer;

use crate::Result;

/// Decode a WAV file into per-channel float buffers.
///
/// Integer formats are normalized to [-1, 1]; float files pass through.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<PcmBuffer> {
    let mut reader = WavReader::open(&path)?;
    let spec = reader.spec();
    let channel_count = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result2<_>>()?,
        SampleFormat::Int => {
            let full_scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<Result2<_>>()?
        }
    };

    let frames = interleaved.len() / channel_count;
    let mut channels = vec![Vec::with_capacity(frames); channel_count];
    for frame in interleaved.chunks_exact(channel_count) {
        for (channel, &sample) in channels.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }

    info!(
        path = %path.as_ref().display(),
        channels = channel_count,
        sample_rate = spec.sample_rate,
        frames,
        "wav decoded"
    );
    Ok(PcmBuffer::new(spec.sample_rate as f32, channels))
}

type Result2<T> = std::result::Result<T, hound::Error>;

/// Encode a buffer as 32-bit float WAV.
pub fn write_wav<P: AsRef<Path>>(path: P, buffer: &PcmBuffer) -> Result<()> {
    let spec = WavSpec {
        channels: buffer.channel_count().max(1) as u16,
        sample_rate: buffer.sample_rate as u32,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&path, spec)?;
    for frame in 0..buffer.len() {
        for channel in &buffer.channels {
            writer.write_sample(channel[frame])?;
        }
    }
    writer.finalize()?;
    info!(path = %path.as_ref().display(), frames = buffer.len(), "wav written");
    Ok(())
}
