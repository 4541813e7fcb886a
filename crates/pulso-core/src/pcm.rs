//! Decoded PCM buffers, the unit of exchange with the external decoder.
//!
//! The engine never parses containers or codecs; a decoder hands it
//! [`PcmBuffer`]s, per-channel float samples at a known rate, and
//! everything downstream (analysis, stretching, playback) consumes those.

/// A fully decoded block of audio.
#[derive(Debug, Clone, Default)]
pub struct PcmBuffer {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// One `Vec<f32>` per channel, all the same length.
    pub channels: Vec<Vec<f32>>,
}

impl PcmBuffer {
    /// Wrap decoded channels. All channels must have equal length.
    pub fn new(sample_rate: f32, channels: Vec<Vec<f32>>) -> Self {
        debug_assert!(
            channels.windows(2).all(|w| w[0].len() == w[1].len()),
            "channel length mismatch"
        );
        Self {
            sample_rate,
            channels,
        }
    }

    /// A mono buffer.
    pub fn mono(sample_rate: f32, samples: Vec<f32>) -> Self {
        Self::new(sample_rate, vec![samples])
    }

    /// A stereo buffer.
    pub fn stereo(sample_rate: f32, left: Vec<f32>, right: Vec<f32>) -> Self {
        Self::new(sample_rate, vec![left, right])
    }

    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// True when the buffer holds no audio.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate > 0.0 {
            self.len() as f32 / self.sample_rate
        } else {
            0.0
        }
    }

    /// Fold to mono by averaging channels.
    ///
    /// Analysis runs on the folded signal; playback stays multi-channel.
    pub fn fold_mono(&self) -> Vec<f32> {
        match self.channels.len() {
            0 => Vec::new(),
            1 => self.channels[0].clone(),
            n => {
                let len = self.len();
                let scale = 1.0 / n as f32;
                let mut mono = vec![0.0; len];
                for channel in &self.channels {
                    for (acc, &s) in mono.iter_mut().zip(channel) {
                        *acc += s;
                    }
                }
                for s in &mut mono {
                    *s *= scale;
                }
                mono
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_folds_by_averaging() {
        let buffer = PcmBuffer::stereo(48000.0, vec![1.0, 0.0], vec![0.0, 1.0]);
        assert_eq!(buffer.fold_mono(), vec![0.5, 0.5]);
    }

    #[test]
    fn mono_fold_is_identity() {
        let buffer = PcmBuffer::mono(48000.0, vec![0.25, -0.25]);
        assert_eq!(buffer.fold_mono(), vec![0.25, -0.25]);
    }

    #[test]
    fn empty_buffer_reports_empty() {
        let buffer = PcmBuffer::default();
        assert!(buffer.is_empty());
        assert_eq!(buffer.duration_seconds(), 0.0);
        assert!(buffer.fold_mono().is_empty());
    }
}
