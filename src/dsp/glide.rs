//! Exponential glide — a one-pole approach toward a target value.
//!
//! Per-sample equivalent of WebAudio `AudioParam.setTargetAtTime`:
//! `v(t) = target + (v0 - target) * exp(-(t - t0) / tau)`.

use serde::{Deserialize, Serialize};

/// Glide timing for live parameter retargeting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlideConfig {
    /// Time constant (tau) in seconds.
    pub time_constant: f64,
}

impl Default for GlideConfig {
    fn default() -> Self {
        GlideConfig { time_constant: 0.02 }
    }
}

/// Snap to the target once closer than this, relative to the target.
const SETTLE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct Glide {
    value: f64,
    target: f64,
    /// Per-sample retention factor, `exp(-1 / (tau * sr))`.
    coeff: f64,
}

impl Glide {
    pub fn new(value: f64, config: GlideConfig, sample_rate: f64) -> Self {
        let samples = config.time_constant * sample_rate;
        let coeff = if samples > 0.0 { (-1.0 / samples).exp() } else { 0.0 };
        Glide {
            value,
            target: value,
            coeff,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    /// Jump straight to `value` with no glide.
    pub fn set_immediate(&mut self, value: f64) {
        self.value = value;
        self.target = value;
    }

    pub fn is_settled(&self) -> bool {
        self.value == self.target
    }

    /// Advance one sample and return the new value.
    #[inline]
    pub fn next_value(&mut self) -> f64 {
        if self.value != self.target {
            self.value = self.target + (self.value - self.target) * self.coeff;
            if (self.value - self.target).abs() <= SETTLE_EPSILON * self.target.abs().max(1.0) {
                self.value = self.target;
            }
        }
        self.value
    }
}
