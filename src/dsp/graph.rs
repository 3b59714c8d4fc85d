//! Formant graph — one sawtooth source through three parallel resonators.
//!
//! ```text
//!              ┌─> bandpass F1 (Q 8)   ─> gain 1.0 ─┐
//! saw(pitch) ──┼─> bandpass F2 (Q 12)  ─> gain 0.5 ─┼─> master 0.25 ─> sink
//!              └─> bandpass 2800 (Q 12)─> gain 0.3 ─┘
//! ```
//!
//! Building a graph has no playback side effects: the oscillator is not
//! started and nothing is connected. The owner decides both.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::params::SynthParameters;

use super::filter::BandpassFilter;
use super::glide::{Glide, GlideConfig};
use super::oscillator::SawOscillator;

/// Resonator constants shared by every graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormantLayout {
    pub f1_q: f64,
    pub f1_gain: f64,
    pub f2_q: f64,
    pub f2_gain: f64,
    /// Fixed high formant; not exposed to the sliders.
    pub f3_frequency: f64,
    pub f3_q: f64,
    pub f3_gain: f64,
    pub master_gain: f64,
}

impl Default for FormantLayout {
    fn default() -> Self {
        FormantLayout {
            f1_q: 8.0,
            f1_gain: 1.0,
            f2_q: 12.0,
            f2_gain: 0.5,
            f3_frequency: 2800.0,
            f3_q: 12.0,
            f3_gain: 0.3,
            master_gain: 0.25,
        }
    }
}

/// A bandpass resonator followed by its own gain stage.
#[derive(Debug, Clone)]
pub struct Formant {
    filter: BandpassFilter,
    gain: f64,
}

impl Formant {
    fn new(frequency: f64, q: f64, gain: f64, sample_rate: f64) -> Self {
        Formant {
            filter: BandpassFilter::new(frequency, q, sample_rate),
            gain,
        }
    }

    pub fn filter(&self) -> &BandpassFilter {
        &self.filter
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    #[inline]
    fn process(&mut self, input: f64) -> f64 {
        self.filter.process(input) * self.gain
    }
}

/// The synthesis chain. Owned by exactly one user: a live session or a
/// single offline render.
#[derive(Debug, Clone)]
pub struct FormantGraph {
    oscillator: SawOscillator,
    formant1: Formant,
    formant2: Formant,
    formant3: Formant,
    master_gain: f64,

    // Retargetable parameters; the oscillator and the first two filters
    // follow these every sample.
    pitch: Glide,
    f1: Glide,
    f2: Glide,

    sample_rate: f64,
}

impl FormantGraph {
    /// Build a graph with the default layout and glide timing.
    pub fn build(params: &SynthParameters, sample_rate: f64) -> Result<Self> {
        Self::build_with(params, sample_rate, &FormantLayout::default(), GlideConfig::default())
    }

    pub fn build_with(
        params: &SynthParameters,
        sample_rate: f64,
        layout: &FormantLayout,
        glide: GlideConfig,
    ) -> Result<Self> {
        params.validate()?;
        debug!(
            "building formant graph: pitch={} f1={} f2={} @ {sample_rate} Hz",
            params.pitch, params.f1, params.f2
        );

        Ok(FormantGraph {
            oscillator: SawOscillator::new(params.pitch, sample_rate),
            formant1: Formant::new(params.f1, layout.f1_q, layout.f1_gain, sample_rate),
            formant2: Formant::new(params.f2, layout.f2_q, layout.f2_gain, sample_rate),
            formant3: Formant::new(layout.f3_frequency, layout.f3_q, layout.f3_gain, sample_rate),
            master_gain: layout.master_gain,
            pitch: Glide::new(params.pitch, glide, sample_rate),
            f1: Glide::new(params.f1, glide, sample_rate),
            f2: Glide::new(params.f2, glide, sample_rate),
            sample_rate,
        })
    }

    pub fn oscillator(&self) -> &SawOscillator {
        &self.oscillator
    }

    pub fn formant1(&self) -> &Formant {
        &self.formant1
    }

    pub fn formant2(&self) -> &Formant {
        &self.formant2
    }

    pub fn formant3(&self) -> &Formant {
        &self.formant3
    }

    pub fn master_gain(&self) -> f64 {
        self.master_gain
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Parameters the graph is currently heading toward.
    pub fn target(&self) -> SynthParameters {
        SynthParameters::new(self.pitch.target(), self.f1.target(), self.f2.target())
    }

    /// Parameters the graph is producing right now (mid-glide values).
    pub fn current(&self) -> SynthParameters {
        SynthParameters::new(self.pitch.value(), self.f1.value(), self.f2.value())
    }

    pub fn is_gliding(&self) -> bool {
        !(self.pitch.is_settled() && self.f1.is_settled() && self.f2.is_settled())
    }

    pub fn start(&mut self) {
        self.oscillator.start();
    }

    pub fn stop(&mut self) {
        self.oscillator.stop();
    }

    /// Glide the oscillator and both movable filters toward `params`.
    pub fn retarget(&mut self, params: &SynthParameters) -> Result<()> {
        params.validate()?;
        self.pitch.set_target(params.pitch);
        self.f1.set_target(params.f1);
        self.f2.set_target(params.f2);
        Ok(())
    }

    /// Generate one output sample (post master gain).
    #[inline]
    pub fn next_sample(&mut self) -> f64 {
        if self.is_gliding() {
            self.oscillator.set_frequency(self.pitch.next_value());
            self.formant1.filter.set_frequency(self.f1.next_value());
            self.formant2.filter.set_frequency(self.f2.next_value());
        }

        let source = self.oscillator.next_sample();
        let sum = self.formant1.process(source)
            + self.formant2.process(source)
            + self.formant3.process(source);
        sum * self.master_gain
    }

    /// Fill `out` with consecutive samples.
    pub fn render_into(&mut self, out: &mut [f32]) {
        for s in out.iter_mut() {
            *s = self.next_sample() as f32;
        }
    }

    /// Render `num_samples` into a new buffer.
    pub fn render(&mut self, num_samples: usize) -> Vec<f32> {
        let mut out = vec![0.0; num_samples];
        self.render_into(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aaah() -> SynthParameters {
        SynthParameters::new(150.0, 730.0, 1090.0)
    }

    #[test]
    fn build_wires_layout() {
        let g = FormantGraph::build(&aaah(), 44100.0).unwrap();
        assert_eq!(g.oscillator().frequency(), 150.0);
        assert_eq!(g.formant1().filter().frequency(), 730.0);
        assert_eq!(g.formant1().filter().q(), 8.0);
        assert_eq!(g.formant1().gain(), 1.0);
        assert_eq!(g.formant2().filter().frequency(), 1090.0);
        assert_eq!(g.formant2().filter().q(), 12.0);
        assert_eq!(g.formant2().gain(), 0.5);
        assert_eq!(g.formant3().filter().frequency(), 2800.0);
        assert_eq!(g.formant3().gain(), 0.3);
        assert_eq!(g.master_gain(), 0.25);
    }

    #[test]
    fn build_does_not_start() {
        let mut g = FormantGraph::build(&aaah(), 44100.0).unwrap();
        assert!(!g.oscillator().is_running());
        assert!(g.render(512).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn build_rejects_invalid_parameters() {
        let bad = SynthParameters::new(0.0, 730.0, 1090.0);
        assert!(FormantGraph::build(&bad, 44100.0).is_err());
    }

    #[test]
    fn started_graph_is_bounded_and_audible() {
        let mut g = FormantGraph::build(&aaah(), 44100.0).unwrap();
        g.start();
        let out = g.render(44100);
        let peak = out.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.01, "graph should be audible, peak {peak}");
        assert!(peak < 1.0, "master gain should keep output below 1, peak {peak}");
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn retarget_glides_instead_of_jumping() {
        let mut g = FormantGraph::build(&aaah(), 44100.0).unwrap();
        g.start();
        g.render(4410);

        let eeee = SynthParameters::new(300.0, 270.0, 2300.0);
        g.retarget(&eeee).unwrap();
        assert_eq!(g.target(), eeee);
        g.next_sample();
        let now = g.current();
        assert!(now.pitch > 150.0 && now.pitch < 151.0, "pitch jumped to {}", now.pitch);
        assert!(g.is_gliding());

        // 20 ms time constant: well settled after half a second.
        g.render(22050);
        assert!(!g.is_gliding());
        assert_eq!(g.current(), eeee);
        assert_eq!(g.oscillator().frequency(), 300.0);
        assert_eq!(g.formant2().filter().frequency(), 2300.0);
    }

    #[test]
    fn retarget_has_no_click() {
        let mut g = FormantGraph::build(&aaah(), 44100.0).unwrap();
        g.start();
        let before = g.render(8820);
        let max_step = |buf: &[f32]| {
            buf.windows(2)
                .map(|w| (w[1] - w[0]).abs())
                .fold(0.0f32, f32::max)
        };
        let steady = max_step(&before[4410..]);

        g.retarget(&SynthParameters::new(300.0, 270.0, 2300.0)).unwrap();
        let mut across = vec![*before.last().unwrap()];
        across.extend(g.render(4410));
        let during = max_step(&across);
        let after = max_step(&g.render(8820)[4410..]);
        let bound = steady.max(after) * 2.0 + 0.01;
        assert!(
            during < bound,
            "retarget produced a discontinuity: step {during}, steady {steady}/{after}"
        );
    }

    #[test]
    fn identical_graphs_render_identically() {
        let mut a = FormantGraph::build(&aaah(), 44100.0).unwrap();
        let mut b = FormantGraph::build(&aaah(), 44100.0).unwrap();
        a.start();
        b.start();
        assert_eq!(a.render(2048), b.render(2048));
    }
}
