//! Bandpass biquad — matches WebAudio BiquadFilterNode ("bandpass") coefficients.

use std::f64::consts::PI;

/// A constant 0 dB peak-gain bandpass filter (2nd order IIR).
///
/// Direct Form II Transposed; coefficients from the Audio EQ Cookbook
/// (Robert Bristow-Johnson).
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    frequency: f64,
    q: f64,

    b0: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    z1: f64,
    z2: f64,

    sample_rate: f64,
    dirty: bool,
}

impl BandpassFilter {
    pub fn new(frequency: f64, q: f64, sample_rate: f64) -> Self {
        let mut f = BandpassFilter {
            frequency,
            q,
            b0: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
            dirty: true,
        };
        f.update_coefficients();
        f
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    /// Recompute filter coefficients from current parameters.
    pub fn update_coefficients(&mut self) {
        // Keep the centre below Nyquist so the filter stays stable.
        let nyquist = self.sample_rate / 2.0;
        let freq = self.frequency.clamp(1.0, nyquist * 0.999);
        let w0 = 2.0 * PI * freq / self.sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * self.q);

        let a0 = 1.0 + alpha;
        self.b0 = alpha / a0;
        // b1 is zero for the bandpass form.
        self.b2 = -alpha / a0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
        self.dirty = false;
    }

    /// Process a single sample through the filter.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        if self.dirty {
            self.update_coefficients();
        }

        let output = self.b0 * input + self.z1;
        self.z1 = -self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    /// Reset filter state.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    /// Set centre frequency and mark coefficients dirty.
    pub fn set_frequency(&mut self, freq: f64) {
        if freq != self.frequency {
            self.frequency = freq;
            self.dirty = true;
        }
    }
}
