//! Live playback — one formant graph connected to a real-time output.
//!
//! A [`LiveSession`] is the audio resource: it owns the output stream and
//! the control channel into the audio callback. [`LivePlayback`] is the
//! transport state machine (`Idle` ⇄ `Playing`) that guarantees at most one
//! session exists per widget. Parameter edits while playing are sent to the
//! callback and applied as exponential glides, never as jumps.

#[cfg(feature = "playback")]
pub mod cpal_backend;

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use log::{debug, error, info, warn};

use crate::dsp::analyser::AnalysisTap;
use crate::dsp::glide::GlideConfig;
use crate::dsp::graph::FormantGraph;
use crate::error::Result;
use crate::params::SynthParameters;

/// Messages handled at the start of each audio callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiveMsg {
    Retarget(SynthParameters),
    Stop,
}

/// Upper bound on messages drained per callback, so a flood of slider
/// events cannot starve the audio.
const MAX_MSGS_PER_BLOCK: usize = 24;

/// Frames rendered per pass inside one callback; the scratch buffer is
/// allocated once at this size.
const RENDER_BLOCK: usize = 1024;

/// Negotiated output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

/// A real-time audio output, e.g. the system default device.
pub trait AudioBackend {
    type Stream: OutputStream;

    /// Pick an output format on the device.
    fn configure(&self) -> Result<OutputConfig>;

    /// Connect `source` to the output and start pulling from it.
    fn open(&self, config: &OutputConfig, source: LiveSource) -> Result<Self::Stream>;
}

/// A running output. Dropping it releases the device.
pub trait OutputStream {
    /// Halt output. May fail if the device already went away.
    fn stop(&mut self) -> Result<()>;
}

/// Everything the audio callback owns: graph, control inbox, analysis tap.
pub struct LiveSource {
    graph: FormantGraph,
    inbox: Receiver<LiveMsg>,
    tap: AnalysisTap,
    mono: Vec<f32>,
}

impl LiveSource {
    fn new(graph: FormantGraph, inbox: Receiver<LiveMsg>, tap: AnalysisTap) -> Self {
        LiveSource {
            graph,
            inbox,
            tap,
            mono: vec![0.0; RENDER_BLOCK],
        }
    }

    pub fn graph(&self) -> &FormantGraph {
        &self.graph
    }

    /// Fill an interleaved output buffer; the mono graph output is copied
    /// to every channel and written to the analysis tap. A trailing partial
    /// frame is zeroed. Never allocates.
    pub fn fill(&mut self, out: &mut [f32], channels: usize) {
        self.drain_messages();

        let channels = channels.max(1);
        let whole = out.len() - out.len() % channels;
        let (frames, partial) = out.split_at_mut(whole);

        for block in frames.chunks_mut(RENDER_BLOCK * channels) {
            let mono = &mut self.mono[..block.len() / channels];
            self.graph.render_into(mono);
            for (frame, &s) in block.chunks_exact_mut(channels).zip(mono.iter()) {
                frame.fill(s);
            }
            self.tap.write_block(mono);
        }
        partial.fill(0.0);
    }

    fn drain_messages(&mut self) {
        for _ in 0..MAX_MSGS_PER_BLOCK {
            match self.inbox.try_recv() {
                Ok(LiveMsg::Retarget(params)) => {
                    if let Err(e) = self.graph.retarget(&params) {
                        warn!("ignoring retarget: {e}");
                    }
                }
                Ok(LiveMsg::Stop) => self.graph.stop(),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }
}

/// One live audio session. Created by [`LiveSession::start`], released by
/// [`LiveSession::stop`] (or by dropping it).
pub struct LiveSession<S: OutputStream> {
    stream: S,
    control: Sender<LiveMsg>,
    tap: AnalysisTap,
    params: SynthParameters,
    config: OutputConfig,
}

impl<S: OutputStream> LiveSession<S> {
    /// Build a graph, tap its master output, connect it to the backend and
    /// start the oscillator.
    pub fn start<B>(backend: &B, params: SynthParameters, glide: GlideConfig) -> Result<Self>
    where
        B: AudioBackend<Stream = S>,
    {
        let config = backend.configure()?;
        let mut graph = FormantGraph::build_with(
            &params,
            config.sample_rate as f64,
            &Default::default(),
            glide,
        )?;
        graph.start();

        let (control, inbox) = unbounded();
        let tap = AnalysisTap::default();
        let source = LiveSource::new(graph, inbox, tap.clone());
        let stream = backend.open(&config, source)?;

        info!(
            "live session started: {} Hz, {} ch, pitch={} f1={} f2={}",
            config.sample_rate, config.channels, params.pitch, params.f1, params.f2
        );
        Ok(LiveSession {
            stream,
            control,
            tap,
            params,
            config,
        })
    }

    pub fn params(&self) -> SynthParameters {
        self.params
    }

    pub fn config(&self) -> OutputConfig {
        self.config
    }

    pub fn tap(&self) -> &AnalysisTap {
        &self.tap
    }

    /// Glide the running graph toward `params`.
    pub fn retarget(&mut self, params: SynthParameters) {
        self.params = params;
        // The callback owns the receiver; if it is gone the stream is dead
        // and the next stop() cleans up.
        let _ = self.control.send(LiveMsg::Retarget(params));
    }

    /// Stop the oscillator and release the output. Never fails: errors from
    /// an already-stopped device are logged and dropped.
    pub fn stop(mut self) {
        let _ = self.control.send(LiveMsg::Stop);
        if let Err(e) = self.stream.stop() {
            warn!("ignoring error while stopping output: {e}");
        }
        info!("live session stopped");
    }
}

/// Transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
}

/// Owns at most one [`LiveSession`] and routes parameter edits to it.
pub struct LivePlayback<B: AudioBackend> {
    backend: B,
    session: Option<LiveSession<B::Stream>>,
    params: SynthParameters,
    glide: GlideConfig,
    available: bool,
}

impl<B: AudioBackend> LivePlayback<B> {
    pub fn new(backend: B, params: SynthParameters) -> Self {
        Self::with_glide(backend, params, GlideConfig::default())
    }

    pub fn with_glide(backend: B, params: SynthParameters, glide: GlideConfig) -> Self {
        LivePlayback {
            backend,
            session: None,
            params,
            glide,
            available: true,
        }
    }

    pub fn state(&self) -> PlaybackState {
        if self.session.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        }
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_some()
    }

    /// False once the audio output failed to initialize; the transport
    /// control should render as disabled.
    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn params(&self) -> SynthParameters {
        self.params
    }

    pub fn session(&self) -> Option<&LiveSession<B::Stream>> {
        self.session.as_ref()
    }

    /// Start playback. While already playing this acts as the transport
    /// toggle and stops the current session instead, so a second session
    /// is never opened. Failures are logged and leave the controller idle.
    pub fn start(&mut self) -> PlaybackState {
        if self.session.is_some() {
            self.stop();
            return PlaybackState::Idle;
        }
        match LiveSession::start(&self.backend, self.params, self.glide) {
            Ok(session) => {
                self.session = Some(session);
                self.available = true;
                PlaybackState::Playing
            }
            Err(e) => {
                error!("audio output unavailable: {e}");
                self.available = false;
                PlaybackState::Idle
            }
        }
    }

    /// Stop playback. No-op when idle.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
        }
    }

    /// Record new parameters; glide the live graph if playing. When idle
    /// they apply on the next start.
    pub fn on_parameters_changed(&mut self, params: SynthParameters) {
        self.params = params;
        if let Some(session) = self.session.as_mut() {
            debug!("retargeting live graph to {params:?}");
            session.retarget(params);
        }
    }

    /// Recent live output, oldest first. Empty when idle.
    pub fn analyser_snapshot(&self) -> Vec<f32> {
        self.session
            .as_ref()
            .map(|s| s.tap().snapshot())
            .unwrap_or_default()
    }

    /// Release everything; call on widget disposal.
    pub fn teardown(&mut self) {
        self.stop();
    }
}

impl<B: AudioBackend> Drop for LivePlayback<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
