//! FFT wrapper with analysis window functions.

use rustfft::{FftPlanner, num_complex::Complex};
use std::f32::consts::PI;
use std::sync::Arc;

/// Analysis window applied before a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    /// No windowing.
    Rectangular,
    /// Raised cosine; the default for spectral analysis.
    #[default]
    Hann,
    /// Slightly raised endpoints, lower near-sidelobe leakage.
    Hamming,
    /// Wider main lobe, much lower sidelobes.
    Blackman,
}

impl Window {
    /// Multiply the window into a buffer.
    pub fn apply(self, buffer: &mut [f32]) {
        let n = buffer.len();
        if n < 2 {
            return;
        }
        let step = 2.0 * PI / (n - 1) as f32;
        match self {
            Window::Rectangular => {}
            Window::Hann => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    *sample *= 0.5 * (1.0 - (step * i as f32).cos());
                }
            }
            Window::Hamming => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    *sample *= 0.54 - 0.46 * (step * i as f32).cos();
                }
            }
            Window::Blackman => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let x = step * i as f32;
                    *sample *= 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos();
                }
            }
        }
    }

    /// The window's coefficients at a given size.
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        let mut coeffs = vec![1.0; size];
        self.apply(&mut coeffs);
        coeffs
    }
}

/// Cached-plan FFT processor for one transform size.
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f32>>,
    ifft: Arc<dyn rustfft::Fft<f32>>,
    size: usize,
}

impl Fft {
    /// Plan forward and inverse transforms of `size` points.
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(size),
            ifft: planner.plan_fft_inverse(size),
            size,
        }
    }

    /// Transform size in samples.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of non-redundant bins (DC through Nyquist).
    pub fn bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Forward transform of a real signal.
    ///
    /// Input shorter than the transform size is zero-padded. Returns the
    /// positive-frequency half of the spectrum (DC through Nyquist).
    pub fn forward(&self, input: &[f32]) -> Vec<Complex<f32>> {
        let mut buffer: Vec<Complex<f32>> =
            input.iter().map(|&x| Complex::new(x, 0.0)).collect();
        buffer.resize(self.size, Complex::new(0.0, 0.0));
        self.fft.process(&mut buffer);
        buffer.truncate(self.bins());
        buffer
    }

    /// Inverse transform of a half spectrum back to a real signal.
    ///
    /// The negative frequencies are reconstructed by conjugate symmetry and
    /// the output is normalized by the transform size.
    pub fn inverse(&self, half_spectrum: &[Complex<f32>]) -> Vec<f32> {
        let mut buffer = Vec::with_capacity(self.size);
        buffer.extend_from_slice(&half_spectrum[..half_spectrum.len().min(self.bins())]);
        buffer.resize(self.bins(), Complex::new(0.0, 0.0));
        for i in (1..self.size - self.size / 2).rev() {
            let conj = buffer[i].conj();
            buffer.push(conj);
        }
        buffer.truncate(self.size);

        self.ifft.process(&mut buffer);
        let scale = 1.0 / self.size as f32;
        buffer.iter().map(|c| c.re * scale).collect()
    }
}

/// Magnitudes of a complex spectrum.
pub fn magnitudes(spectrum: &[Complex<f32>]) -> Vec<f32> {
    spectrum.iter().map(|c| c.norm()).collect()
}

/// Phases of a complex spectrum, in radians.
pub fn phases(spectrum: &[Complex<f32>]) -> Vec<f32> {
    spectrum.iter().map(|c| c.arg()).collect()
}

/// Rebuild a complex spectrum from magnitudes and phases.
pub fn polar_to_complex(magnitudes: &[f32], phases: &[f32]) -> Vec<Complex<f32>> {
    magnitudes
        .iter()
        .zip(phases)
        .map(|(&m, &p)| Complex::new(m * p.cos(), m * p.sin()))
        .collect()
}
