//! DSP core — pure Rust formant synthesis.
//!
//! The same graph drives both the offline sampler (deterministic display
//! windows) and the live session on the audio device.

pub mod analyser;
pub mod filter;
pub mod glide;
pub mod graph;
pub mod oscillator;
