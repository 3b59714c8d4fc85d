use thiserror::Error;

/// Errors raised by the formant synthesis core.
#[derive(Debug, Error)]
pub enum FormantError {
    /// No host, output device or usable stream configuration.
    #[error("Audio output unavailable: {0}")]
    AudioUnavailable(String),

    #[error("Failed to build output stream: {0}")]
    StreamBuild(String),

    #[error("Failed to start output stream: {0}")]
    StreamPlay(String),

    #[error("Stopping the output stream failed: {0}")]
    StreamStop(String),

    /// The graph builder only accepts finite, positive frequencies.
    #[error("Invalid synth parameters: pitch={pitch} f1={f1} f2={f2}")]
    InvalidParameters { pitch: f64, f1: f64, f2: f64 },

    #[error("Offline render too short: needed {needed} samples, got {available}")]
    RenderTooShort { needed: usize, available: usize },

    #[error("Invalid WAV export: {0}")]
    InvalidExport(String),

    #[error("Raster encoding failed: {0}")]
    Raster(String),
}

pub type Result<T> = std::result::Result<T, FormantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let e = FormantError::RenderTooShort { needed: 1764, available: 12 };
        assert_eq!(
            e.to_string(),
            "Offline render too short: needed 1764 samples, got 12"
        );

        let e = FormantError::InvalidParameters { pitch: 0.0, f1: 730.0, f2: 1090.0 };
        assert!(e.to_string().contains("pitch=0"), "got {e}");
    }
}
