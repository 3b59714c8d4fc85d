//! Offline waveform sampler — renders a short buffer off the real-time clock
//! and cuts one stable display window out of it.
//!
//! The window is anchored on the largest sample within the first two
//! periods after the settle time, then moved back to the upward zero
//! crossing that precedes it. Both landmarks survive small parameter edits,
//! so the displayed cycle does not jump around while a slider moves.

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dsp::graph::FormantGraph;
use crate::error::{FormantError, Result};
use crate::params::SynthParameters;

/// Offline render timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub sample_rate: u32,
    /// Time for the resonators to reach steady state.
    pub settle_seconds: f64,
    /// Length of the displayed window.
    pub display_seconds: f64,
    pub margin_seconds: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            sample_rate: 44100,
            settle_seconds: 0.1,
            display_seconds: 0.04,
            margin_seconds: 0.02,
        }
    }
}

impl SamplerConfig {
    pub fn settle_samples(&self) -> usize {
        (self.settle_seconds * self.sample_rate as f64).round() as usize
    }

    pub fn display_samples(&self) -> usize {
        (self.display_seconds * self.sample_rate as f64).round() as usize
    }

    pub fn margin_samples(&self) -> usize {
        (self.margin_seconds * self.sample_rate as f64).round() as usize
    }

    /// Samples searched for the peak: one period, doubled.
    pub fn search_samples(&self, params: &SynthParameters) -> usize {
        params.period_samples(self.sample_rate) * 2
    }

    /// Length of the offline render. The nominal duration is
    /// settle + display + margin; it grows when a long period would push
    /// the window past the end of the buffer.
    pub fn render_samples(&self, params: &SynthParameters) -> usize {
        let nominal = self.settle_samples() + self.display_samples() + self.margin_samples();
        let worst_case =
            self.settle_samples() + self.search_samples(params) + self.display_samples();
        nominal.max(worst_case)
    }
}

/// How the window start was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Anchor {
    /// Upward zero crossing preceding the peak.
    ZeroCrossing,
    /// No crossing between the settle boundary and the peak; the window
    /// starts on the peak itself.
    Peak,
}

/// One display window of amplitudes. Never mutated once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformSample {
    samples: Arc<[f32]>,
    params: SynthParameters,
    anchor: Anchor,
}

impl WaveformSample {
    pub fn new(samples: Vec<f32>, params: SynthParameters, anchor: Anchor) -> Self {
        WaveformSample {
            samples: samples.into(),
            params,
            anchor,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Parameters this window was rendered from.
    pub fn params(&self) -> SynthParameters {
        self.params
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }
}

/// Renders and extracts display windows. Stateless apart from its config.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSampler {
    config: SamplerConfig,
}

impl OfflineSampler {
    pub fn new(config: SamplerConfig) -> Self {
        OfflineSampler { config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Render the full offline buffer for `params`, oscillator started at t = 0.
    pub fn render_buffer(&self, params: &SynthParameters) -> Result<Vec<f32>> {
        let mut graph = FormantGraph::build(params, self.config.sample_rate as f64)?;
        graph.start();
        Ok(graph.render(self.config.render_samples(params)))
    }

    /// Render and extract one window of exactly `display_samples()` samples.
    pub fn sample(&self, params: &SynthParameters) -> Result<WaveformSample> {
        let buffer = self.render_buffer(params)?;
        let (start, anchor) = find_window_start(
            &buffer,
            self.config.settle_samples(),
            self.config.search_samples(params),
        );

        let len = self.config.display_samples();
        let end = start + len;
        if end > buffer.len() {
            return Err(FormantError::RenderTooShort {
                needed: end,
                available: buffer.len(),
            });
        }
        debug!(
            "extracted window at {start} ({anchor:?}) for pitch={} f1={} f2={}",
            params.pitch, params.f1, params.f2
        );
        Ok(WaveformSample::new(buffer[start..end].to_vec(), *params, anchor))
    }
}

/// Find the display window start in `buffer`.
///
/// Searches `[settle, settle + search)` for the largest sample, then walks
/// back toward `settle` for the closest index `i` with
/// `buffer[i] <= 0 && buffer[i + 1] > 0`.
pub fn find_window_start(buffer: &[f32], settle: usize, search: usize) -> (usize, Anchor) {
    let end = (settle + search).min(buffer.len());
    if settle >= end {
        return (settle.min(buffer.len()), Anchor::Peak);
    }

    // First occurrence wins on ties.
    let mut peak = settle;
    for i in settle + 1..end {
        if buffer[i] > buffer[peak] {
            peak = i;
        }
    }

    for i in (settle..peak).rev() {
        if buffer[i] <= 0.0 && buffer[i + 1] > 0.0 {
            return (i, Anchor::ZeroCrossing);
        }
    }
    (peak, Anchor::Peak)
}
