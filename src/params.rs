//! Synth parameters — pitch and the two movable formants.
//!
//! The widget's sliders clamp values before they reach the synthesis core;
//! [`SynthParameters::clamped`] is that input layer. Everything downstream
//! assumes finite, positive frequencies.

use serde::{Deserialize, Serialize};

use crate::error::{FormantError, Result};

/// Inclusive bounds for a single slider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Bounds { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Fundamental frequency slider (integer step).
pub const PITCH_BOUNDS: Bounds = Bounds::new(80.0, 300.0);
/// First formant slider.
pub const F1_BOUNDS: Bounds = Bounds::new(200.0, 1000.0);
/// Second formant slider.
pub const F2_BOUNDS: Bounds = Bounds::new(500.0, 3000.0);

/// Pitch and formant frequencies in Hz. Replaced wholesale on every edit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthParameters {
    pub pitch: f64,
    pub f1: f64,
    pub f2: f64,
}

impl Default for SynthParameters {
    fn default() -> Self {
        let (f1, f2) = VowelPreset::Aaah.formants();
        SynthParameters { pitch: 150.0, f1, f2 }
    }
}

impl SynthParameters {
    pub fn new(pitch: f64, f1: f64, f2: f64) -> Self {
        SynthParameters { pitch, f1, f2 }
    }

    /// Apply the slider bounds: each value is clamped, pitch is rounded to
    /// whole Hz. Non-finite input falls back to the lower bound.
    pub fn clamped(pitch: f64, f1: f64, f2: f64) -> Self {
        fn bounded(v: f64, b: Bounds) -> f64 {
            if v.is_finite() { b.clamp(v) } else { b.min }
        }
        SynthParameters {
            pitch: bounded(pitch, PITCH_BOUNDS).round(),
            f1: bounded(f1, F1_BOUNDS),
            f2: bounded(f2, F2_BOUNDS),
        }
    }

    /// Same pitch, formants taken from a preset.
    pub fn with_preset(self, preset: VowelPreset) -> Self {
        let (f1, f2) = preset.formants();
        SynthParameters { f1, f2, ..self }
    }

    /// Check the builder precondition: all three values finite and > 0.
    pub fn validate(&self) -> Result<()> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.pitch) && ok(self.f1) && ok(self.f2) {
            Ok(())
        } else {
            Err(FormantError::InvalidParameters {
                pitch: self.pitch,
                f1: self.f1,
                f2: self.f2,
            })
        }
    }

    /// Samples in one fundamental period, rounded up.
    pub fn period_samples(&self, sample_rate: u32) -> usize {
        (sample_rate as f64 / self.pitch).ceil() as usize
    }
}

/// Vowel-like timbres, each a fixed `(F1, F2)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VowelPreset {
    Aaah,
    Eeee,
    Oooo,
    Ehhh,
}

impl VowelPreset {
    pub const ALL: [VowelPreset; 4] = [
        VowelPreset::Aaah,
        VowelPreset::Eeee,
        VowelPreset::Oooo,
        VowelPreset::Ehhh,
    ];

    /// `(F1, F2)` in Hz.
    pub fn formants(self) -> (f64, f64) {
        match self {
            VowelPreset::Aaah => (730.0, 1090.0),
            VowelPreset::Eeee => (270.0, 2300.0),
            VowelPreset::Oooo => (300.0, 870.0),
            VowelPreset::Ehhh => (530.0, 1840.0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VowelPreset::Aaah => "aaah",
            VowelPreset::Eeee => "eeee",
            VowelPreset::Oooo => "oooo",
            VowelPreset::Ehhh => "ehhh",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        VowelPreset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
    }
}
