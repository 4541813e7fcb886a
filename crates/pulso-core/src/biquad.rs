//! Second-order IIR filter with RBJ Audio EQ Cookbook coefficients.
//!
//! The render EQ cascades shelving and peaking sections built from these
//! constructors; the sweep filter and delay damping use the lowpass and
//! highpass forms.

use core::f32::consts::PI;
use libm::{cosf, powf, sinf, sqrtf};

/// Second-order IIR section in transposed Direct Form II.
///
/// ```text
/// y[n] = b0*x[n] + z1
/// z1   = b1*x[n] - a1*y[n] + z2
/// z2   = b2*x[n] - a2*y[n]
/// ```
///
/// Two state variables instead of four; numerically well-behaved at audio
/// rates with f32.
#[derive(Debug, Clone, Default)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    /// A passthrough section (`y[n] = x[n]`).
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            ..Self::default()
        }
    }

    /// Install coefficients, normalizing by `a0`.
    pub fn set_coefficients(&mut self, coeffs: (f32, f32, f32, f32, f32, f32)) {
        let (b0, b1, b2, a0, a1, a2) = coeffs;
        let inv_a0 = 1.0 / a0;
        self.b0 = b0 * inv_a0;
        self.b1 = b1 * inv_a0;
        self.b2 = b2 * inv_a0;
        self.a1 = a1 * inv_a0;
        self.a2 = a2 * inv_a0;
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    /// Clear the state variables without touching coefficients.
    pub fn clear(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Intermediate values shared by every cookbook formula.
fn omega_terms(frequency: f32, q: f32, sample_rate: f32) -> (f32, f32, f32) {
    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_w = cosf(omega);
    let alpha = sinf(omega) / (2.0 * q);
    (cos_w, alpha, omega)
}

/// RBJ lowpass coefficients.
pub fn lowpass_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let (cos_w, alpha, _) = omega_terms(frequency, q, sample_rate);
    let b1 = 1.0 - cos_w;
    let b0 = b1 / 2.0;
    (b0, b1, b0, 1.0 + alpha, -2.0 * cos_w, 1.0 - alpha)
}

/// RBJ highpass coefficients.
pub fn highpass_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let (cos_w, alpha, _) = omega_terms(frequency, q, sample_rate);
    let b0 = (1.0 + cos_w) / 2.0;
    (
        b0,
        -(1.0 + cos_w),
        b0,
        1.0 + alpha,
        -2.0 * cos_w,
        1.0 - alpha,
    )
}

/// RBJ peaking EQ coefficients. Positive `gain_db` boosts, negative cuts.
pub fn peaking_eq_coefficients(
    frequency: f32,
    q: f32,
    gain_db: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let a = powf(10.0, gain_db / 40.0);
    let (cos_w, alpha, _) = omega_terms(frequency, q, sample_rate);
    (
        1.0 + alpha * a,
        -2.0 * cos_w,
        1.0 - alpha * a,
        1.0 + alpha / a,
        -2.0 * cos_w,
        1.0 - alpha / a,
    )
}

/// RBJ low-shelf coefficients. Shelf slope fixed at 1.0.
pub fn lowshelf_coefficients(
    frequency: f32,
    gain_db: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let a = powf(10.0, gain_db / 40.0);
    let (cos_w, alpha, _) = omega_terms(frequency, 0.707, sample_rate);
    let two_sqrt_a_alpha = 2.0 * sqrtf(a) * alpha;

    let b0 = a * ((a + 1.0) - (a - 1.0) * cos_w + two_sqrt_a_alpha);
    let b1 = 2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w);
    let b2 = a * ((a + 1.0) - (a - 1.0) * cos_w - two_sqrt_a_alpha);
    let a0 = (a + 1.0) + (a - 1.0) * cos_w + two_sqrt_a_alpha;
    let a1 = -2.0 * ((a - 1.0) + (a + 1.0) * cos_w);
    let a2 = (a + 1.0) + (a - 1.0) * cos_w - two_sqrt_a_alpha;

    (b0, b1, b2, a0, a1, a2)
}

/// RBJ high-shelf coefficients. Shelf slope fixed at 1.0.
pub fn highshelf_coefficients(
    frequency: f32,
    gain_db: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let a = powf(10.0, gain_db / 40.0);
    let (cos_w, alpha, _) = omega_terms(frequency, 0.707, sample_rate);
    let two_sqrt_a_alpha = 2.0 * sqrtf(a) * alpha;

    let b0 = a * ((a + 1.0) + (a - 1.0) * cos_w + two_sqrt_a_alpha);
    let b1 = -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w);
    let b2 = a * ((a + 1.0) + (a - 1.0) * cos_w - two_sqrt_a_alpha);
    let a0 = (a + 1.0) - (a - 1.0) * cos_w + two_sqrt_a_alpha;
    let a1 = 2.0 * ((a - 1.0) - (a + 1.0) * cos_w);
    let a2 = (a + 1.0) - (a - 1.0) * cos_w - two_sqrt_a_alpha;

    (b0, b1, b2, a0, a1, a2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle_dc(biquad: &mut Biquad) -> f32 {
        let mut out = 0.0;
        for _ in 0..2000 {
            out = biquad.process(1.0);
        }
        out
    }

    #[test]
    fn passthrough_by_default() {
        let mut biquad = Biquad::new();
        for i in 0..10 {
            let x = i as f32 * 0.1;
            assert!((biquad.process(x) - x).abs() < 1e-6);
        }
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut biquad = Biquad::new();
        biquad.set_coefficients(lowpass_coefficients(1000.0, 0.707, 48000.0));
        assert!((settle_dc(&mut biquad) - 1.0).abs() < 0.05);
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut biquad = Biquad::new();
        biquad.set_coefficients(highpass_coefficients(1000.0, 0.707, 48000.0));
        assert!(settle_dc(&mut biquad).abs() < 0.05);
    }

    #[test]
    fn peaking_unity_at_zero_gain() {
        let mut biquad = Biquad::new();
        biquad.set_coefficients(peaking_eq_coefficients(1000.0, 1.0, 0.0, 48000.0));
        assert!((settle_dc(&mut biquad) - 1.0).abs() < 0.05);
    }

    #[test]
    fn lowshelf_boost_raises_dc() {
        let mut biquad = Biquad::new();
        biquad.set_coefficients(lowshelf_coefficients(200.0, 6.0, 48000.0));
        // +6 dB shelf below the corner: DC gain ~2.0
        let dc = settle_dc(&mut biquad);
        assert!((dc - 1.995).abs() < 0.1, "got {dc}");
    }

    #[test]
    fn highshelf_cut_leaves_dc() {
        let mut biquad = Biquad::new();
        biquad.set_coefficients(highshelf_coefficients(8000.0, -12.0, 48000.0));
        // A high shelf cut leaves low frequencies alone.
        assert!((settle_dc(&mut biquad) - 1.0).abs() < 0.05);
    }

    #[test]
    fn all_coefficients_finite() {
        for (b0, b1, b2, a0, a1, a2) in [
            lowpass_coefficients(20.0, 0.5, 44100.0),
            highpass_coefficients(20000.0, 10.0, 44100.0),
            peaking_eq_coefficients(1000.0, 0.3, 12.0, 44100.0),
            lowshelf_coefficients(80.0, -24.0, 44100.0),
            highshelf_coefficients(12000.0, 24.0, 44100.0),
        ] {
            for v in [b0, b1, b2, a0, a1, a2] {
                assert!(v.is_finite());
            }
            assert!(a0 > 0.0);
        }
    }

    #[test]
    fn clear_resets_state() {
        let mut biquad = Biquad::new();
        biquad.set_coefficients(lowpass_coefficients(500.0, 0.707, 48000.0));
        for _ in 0..64 {
            biquad.process(1.0);
        }
        biquad.clear();
        // First output after clear only reflects b0*x.
        let first = biquad.process(0.0);
        assert_eq!(first, 0.0);
    }
}
