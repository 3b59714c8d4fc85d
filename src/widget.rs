//! The "Sound" tab: sliders, transport, scope and readout wired together.
//!
//! Parameter edits always request a fresh offline window and, while a
//! session is playing, retarget it. The scope only ever shows the newest
//! finished window; the readout follows the selection on that window.

use log::debug;

use crate::error::Result;
use crate::inspector::SampleReadout;
use crate::params::{SynthParameters, VowelPreset};
use crate::playback::{AudioBackend, LivePlayback, PlaybackState};
use crate::render::{DrawList, RendererConfig, WaveformRenderer};
use crate::sampler::{OfflineSampler, SamplerConfig};
use crate::scope::{RenderWorker, WaveformScope, WorkerMode};
use crate::wav;

pub struct SoundWidget<B: AudioBackend> {
    params: SynthParameters,
    scope: WaveformScope,
    worker: RenderWorker,
    renderer: WaveformRenderer,
    playback: LivePlayback<B>,
}

impl<B: AudioBackend> SoundWidget<B> {
    /// Create the widget and request the first window.
    pub fn new(backend: B, params: SynthParameters, mode: WorkerMode) -> Self {
        Self::with_config(
            backend,
            params,
            mode,
            SamplerConfig::default(),
            RendererConfig::default(),
        )
    }

    pub fn with_config(
        backend: B,
        params: SynthParameters,
        mode: WorkerMode,
        sampler: SamplerConfig,
        renderer: RendererConfig,
    ) -> Self {
        let mut widget = SoundWidget {
            params,
            scope: WaveformScope::new(),
            worker: RenderWorker::new(OfflineSampler::new(sampler), mode),
            renderer: WaveformRenderer::new(renderer),
            playback: LivePlayback::new(backend, params),
        };
        widget.request_window();
        widget
    }

    pub fn params(&self) -> SynthParameters {
        self.params
    }

    pub fn scope(&self) -> &WaveformScope {
        &self.scope
    }

    pub fn worker(&self) -> &RenderWorker {
        &self.worker
    }

    pub fn playback(&self) -> &LivePlayback<B> {
        &self.playback
    }

    /// Replace the parameters (already clamped by the sliders).
    pub fn set_parameters(&mut self, params: SynthParameters) {
        self.params = params;
        self.request_window();
        self.playback.on_parameters_changed(params);
    }

    pub fn apply_preset(&mut self, preset: VowelPreset) {
        debug!("preset {}", preset.name());
        self.set_parameters(self.params.with_preset(preset));
    }

    fn request_window(&mut self) {
        let ticket = self.scope.request(self.params);
        self.worker.submit(ticket);
    }

    /// Apply finished renders. Returns true if the scope needs a redraw.
    pub fn poll(&mut self) -> bool {
        self.worker.poll(&mut self.scope)
    }

    /// Play/stop button.
    pub fn toggle_playback(&mut self) -> PlaybackState {
        self.playback.start()
    }

    pub fn transport_enabled(&self) -> bool {
        self.playback.is_available()
    }

    /// Pointer click at a horizontal fraction of the scope width.
    pub fn click(&mut self, fraction: f64) -> Option<usize> {
        self.scope.select_at(fraction)
    }

    /// Current frame for the scope canvas. Empty before the first window.
    pub fn draw(&self) -> DrawList {
        match self.scope.current() {
            Some(sample) => self.renderer.render(sample.samples(), self.scope.selection()),
            None => self.renderer.render(&[], None),
        }
    }

    pub fn readout(&self) -> Option<SampleReadout> {
        self.scope
            .current()
            .map(|sample| SampleReadout::new(sample.samples(), self.scope.selection()))
    }

    /// Current timbre as a mono WAV file, rendered at the sampler's rate.
    pub fn export_wav(&self, seconds: f64) -> Result<Vec<u8>> {
        wav::render_wav(&self.params, seconds, self.worker.sampler().config().sample_rate)
    }

    /// Stop audio and release the device; also runs on drop.
    pub fn dispose(&mut self) {
        self.playback.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::testing::FakeBackend;
    use crate::render::DrawOp;
    use std::time::Duration;

    fn widget(backend: FakeBackend) -> SoundWidget<FakeBackend> {
        SoundWidget::new(backend, SynthParameters::default(), WorkerMode::Inline)
    }

    #[test]
    fn first_window_arrives_on_poll() {
        let mut w = widget(FakeBackend::default());
        assert!(w.readout().is_none());
        assert!(w.poll());
        assert_eq!(w.scope().current().unwrap().len(), 1764);
        assert!(w.draw().ops.len() >= 3);
    }

    #[test]
    fn only_latest_edit_is_displayed() {
        let mut w = widget(FakeBackend::default());
        w.set_parameters(SynthParameters::new(100.0, 730.0, 1090.0));
        w.set_parameters(SynthParameters::new(200.0, 730.0, 1090.0));
        w.poll();
        assert_eq!(w.scope().current().unwrap().params().pitch, 200.0);
    }

    #[test]
    fn threaded_edits_resolve_to_latest() {
        let mut w = SoundWidget::new(
            FakeBackend::default(),
            SynthParameters::default(),
            WorkerMode::Threaded,
        );
        w.set_parameters(SynthParameters::new(100.0, 730.0, 1090.0));
        w.set_parameters(SynthParameters::new(200.0, 270.0, 2300.0));
        let SoundWidget { worker, scope, .. } = &mut w;
        assert!(worker.wait_latest(scope, Duration::from_secs(30)));
        assert_eq!(
            w.scope().current().unwrap().params(),
            SynthParameters::new(200.0, 270.0, 2300.0)
        );
    }

    #[test]
    fn click_selects_and_edit_clears() {
        let mut w = widget(FakeBackend::default());
        w.poll();
        assert_eq!(w.click(0.5), Some(882));
        let readout = w.readout().unwrap();
        assert_eq!(readout.selected.map(|(i, _)| i), Some(882));
        assert!(matches!(w.draw().ops.last(), Some(DrawOp::Dot { .. })));

        w.apply_preset(VowelPreset::Eeee);
        w.poll();
        assert_eq!(w.scope().selection(), None);
        assert!(w.readout().unwrap().selected.is_none());
    }

    #[test]
    fn edits_reach_live_session() {
        let backend = FakeBackend::default();
        let mut w = widget(backend.clone());
        assert_eq!(w.toggle_playback(), PlaybackState::Playing);
        w.apply_preset(VowelPreset::Oooo);
        let session = w.playback().session().unwrap();
        assert_eq!(session.params(), SynthParameters::default().with_preset(VowelPreset::Oooo));
        assert_eq!(w.toggle_playback(), PlaybackState::Idle);
        assert_eq!(backend.log.borrow().live, 0);
    }

    #[test]
    fn dispose_releases_audio() {
        let backend = FakeBackend::default();
        let mut w = widget(backend.clone());
        w.toggle_playback();
        w.dispose();
        assert!(!w.playback().is_playing());
        assert_eq!(backend.log.borrow().live, 0);
    }

    #[test]
    fn export_follows_current_parameters() {
        let mut w = widget(FakeBackend::default());
        w.apply_preset(VowelPreset::Eeee);
        let wav = w.export_wav(0.25).unwrap();
        let expected =
            wav::render_wav(&w.params(), 0.25, w.worker().sampler().config().sample_rate).unwrap();
        assert_eq!(wav, expected);
        assert_eq!(wav.len(), 44 + 2 * 11025);
        assert!(w.export_wav(-1.0).is_err());
    }

    #[test]
    fn broken_audio_disables_transport() {
        let backend = FakeBackend {
            fail_open: true,
            ..Default::default()
        };
        let mut w = widget(backend);
        assert_eq!(w.toggle_playback(), PlaybackState::Idle);
        assert!(!w.transport_enabled());
        // The scope keeps working without audio.
        assert!(w.poll());
    }
}
