//! System audio output through cpal.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info};

use crate::error::{FormantError, Result};

use super::{AudioBackend, LiveSource, OutputConfig, OutputStream};

/// Plays through the host's default output device.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        CpalBackend
    }

    fn device(&self) -> Result<cpal::Device> {
        cpal::default_host()
            .default_output_device()
            .ok_or_else(|| FormantError::AudioUnavailable("no default output device".into()))
    }
}

impl AudioBackend for CpalBackend {
    type Stream = CpalStream;

    fn configure(&self) -> Result<OutputConfig> {
        let device = self.device()?;
        let default = device
            .default_output_config()
            .map_err(|e| FormantError::AudioUnavailable(e.to_string()))?;
        let sample_rate = default.sample_rate();

        let chosen = if default.sample_format() == cpal::SampleFormat::F32 {
            default
        } else {
            // Same rate, f32 samples.
            let supported = device
                .supported_output_configs()
                .map_err(|e| FormantError::AudioUnavailable(e.to_string()))?;
            supported
                .filter(|range| range.sample_format() == cpal::SampleFormat::F32)
                .find(|range| {
                    range.min_sample_rate() <= sample_rate && range.max_sample_rate() >= sample_rate
                })
                .map(|range| range.with_sample_rate(sample_rate))
                .ok_or_else(|| {
                    FormantError::AudioUnavailable(format!(
                        "no f32 output config at {} Hz",
                        sample_rate.0
                    ))
                })?
        };

        info!(
            "audio: {} @ {} Hz, {} ch",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            chosen.sample_rate().0,
            chosen.channels()
        );
        Ok(OutputConfig {
            sample_rate: chosen.sample_rate().0,
            channels: chosen.channels(),
        })
    }

    fn open(&self, config: &OutputConfig, mut source: LiveSource) -> Result<CpalStream> {
        let device = self.device()?;
        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let channels = config.channels as usize;

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    source.fill(data, channels);
                },
                |e| error!("audio stream error: {e}"),
                None,
            )
            .map_err(|e| FormantError::StreamBuild(e.to_string()))?;
        stream
            .play()
            .map_err(|e| FormantError::StreamPlay(e.to_string()))?;

        Ok(CpalStream {
            stream,
            stopped: false,
        })
    }
}

/// A playing cpal stream. The device is released when this is dropped.
pub struct CpalStream {
    stream: cpal::Stream,
    stopped: bool,
}

impl OutputStream for CpalStream {
    fn stop(&mut self) -> Result<()> {
        if self.stopped {
            return Err(FormantError::StreamStop("already stopped".into()));
        }
        self.stopped = true;
        self.stream
            .pause()
            .map_err(|e| FormantError::StreamStop(e.to_string()))
    }
}
