//! WAV export — the current timbre rendered offline as 16-bit mono PCM.

use log::debug;

use crate::dsp::graph::FormantGraph;
use crate::error::{FormantError, Result};
use crate::params::SynthParameters;

const HEADER_LEN: usize = 44;
const BYTES_PER_SAMPLE: u16 = 2;

/// Longest export accepted, in seconds.
pub const MAX_EXPORT_SECONDS: f64 = 60.0;

/// Render `seconds` of the formant graph for `params` as a mono WAV file.
pub fn render_wav(params: &SynthParameters, seconds: f64, sample_rate: u32) -> Result<Vec<u8>> {
    if !(seconds.is_finite() && (0.0..=MAX_EXPORT_SECONDS).contains(&seconds)) {
        return Err(FormantError::InvalidExport(format!(
            "length {seconds}s outside 0..={MAX_EXPORT_SECONDS}s"
        )));
    }
    if sample_rate == 0 {
        return Err(FormantError::InvalidExport("sample rate is 0".into()));
    }

    let mut graph = FormantGraph::build(params, sample_rate as f64)?;
    graph.start();
    let frames = (seconds * sample_rate as f64).round() as usize;
    debug!("exporting {frames} frames at {sample_rate} Hz");
    Ok(encode_mono(&graph.render(frames), sample_rate))
}

/// Encode mono float samples as 16-bit PCM WAV. Samples are clipped to [-1, 1].
pub fn encode_mono(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = samples.len() as u32 * BYTES_PER_SAMPLE as u32;
    let mut buf = Vec::with_capacity(HEADER_LEN + data_len as usize);

    chunk_header(&mut buf, b"RIFF", 36 + data_len);
    buf.extend_from_slice(b"WAVE");

    chunk_header(&mut buf, b"fmt ", 16);
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * BYTES_PER_SAMPLE as u32).to_le_bytes());
    buf.extend_from_slice(&BYTES_PER_SAMPLE.to_le_bytes());
    buf.extend_from_slice(&(BYTES_PER_SAMPLE * 8).to_le_bytes());

    chunk_header(&mut buf, b"data", data_len);
    buf.extend(samples.iter().flat_map(|&s| to_pcm16(s).to_le_bytes()));
    buf
}

fn chunk_header(buf: &mut Vec<u8>, id: &[u8; 4], len: u32) {
    buf.extend_from_slice(id);
    buf.extend_from_slice(&len.to_le_bytes());
}

fn to_pcm16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le_u32(b: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
    }

    #[test]
    fn header_describes_mono_pcm16() {
        let wav = render_wav(&SynthParameters::default(), 0.1, 44100).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(le_u32(&wav, 4) as usize, wav.len() - 8);
        assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 1, "channels");
        assert_eq!(le_u32(&wav, 24), 44100);
        assert_eq!(le_u32(&wav, 28), 88200, "byte rate");
        assert_eq!(u16::from_le_bytes([wav[34], wav[35]]), 16, "bits");
    }

    #[test]
    fn data_length_matches_duration() {
        let wav = render_wav(&SynthParameters::default(), 0.5, 44100).unwrap();
        // 22050 frames * 2 bytes
        assert_eq!(le_u32(&wav, 40), 44100);
        assert_eq!(wav.len(), HEADER_LEN + 44100);
    }

    #[test]
    fn rendered_wav_is_not_silent() {
        let wav = render_wav(&SynthParameters::new(220.0, 270.0, 2300.0), 0.2, 22050).unwrap();
        let has_signal = wav[HEADER_LEN..]
            .chunks_exact(2)
            .any(|b| i16::from_le_bytes([b[0], b[1]]) != 0);
        assert!(has_signal, "Rendered WAV should contain audio");
    }

    #[test]
    fn samples_are_clipped_and_rounded() {
        let wav = encode_mono(&[2.0, -2.0, 0.5, f32::NAN], 8000);
        let pcm: Vec<i16> = wav[HEADER_LEN..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(pcm, vec![i16::MAX, -i16::MAX, 16384, 0]);
    }

    #[test]
    fn rejects_bad_requests() {
        let params = SynthParameters::default();
        assert!(render_wav(&SynthParameters::new(0.0, 1.0, 1.0), 0.1, 44100).is_err());
        assert!(render_wav(&params, -1.0, 44100).is_err());
        assert!(render_wav(&params, f64::INFINITY, 44100).is_err());
        assert!(render_wav(&params, MAX_EXPORT_SECONDS + 1.0, 44100).is_err());
        assert!(render_wav(&params, 0.1, 0).is_err());
    }
}
