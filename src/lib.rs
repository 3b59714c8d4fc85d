pub mod dsp;
pub mod error;
pub mod inspector;
pub mod params;
pub mod playback;
pub mod raster;
pub mod render;
pub mod sampler;
pub mod scope;
pub mod wav;
pub mod widget;

use crate::inspector::SampleReadout;
use crate::params::{SynthParameters, VowelPreset};
use crate::render::WaveformRenderer;
use crate::sampler::OfflineSampler;
use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use crate::error::{FormantError, Result};

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the formant_scope version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: render one display window for the given slider values.
/// Values are clamped to the slider bounds first.
#[wasm_bindgen]
pub fn sample_waveform(pitch: f64, f1: f64, f2: f64) -> std::result::Result<Vec<f32>, JsValue> {
    let params = SynthParameters::clamped(pitch, f1, f2);
    let window = OfflineSampler::default()
        .sample(&params)
        .map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(window.samples().to_vec())
}

/// WASM-exposed: render `seconds` of the timbre as 16-bit mono WAV bytes.
/// Values are clamped to the slider bounds first.
#[wasm_bindgen]
pub fn render_wav(
    pitch: f64,
    f1: f64,
    f2: f64,
    seconds: f64,
    sample_rate: u32,
) -> std::result::Result<Vec<u8>, JsValue> {
    let params = SynthParameters::clamped(pitch, f1, f2);
    wav::render_wav(&params, seconds, sample_rate).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: drawing operations for a window and optional selection,
/// to be replayed onto a 500×120 canvas.
#[wasm_bindgen]
pub fn waveform_draw_list(
    samples: &[f32],
    selection: Option<usize>,
) -> std::result::Result<JsValue, JsValue> {
    let list = WaveformRenderer::default().render(samples, selection);
    serde_wasm_bindgen::to_value(&list).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: sample index nearest a click at `fraction` of the width.
#[wasm_bindgen]
pub fn nearest_sample(fraction: f64, len: usize) -> Option<usize> {
    inspector::nearest_index(fraction, len)
}

/// WASM-exposed: formatted readout around the selection.
#[wasm_bindgen]
pub fn sample_readout(samples: &[f32], selection: Option<usize>) -> String {
    SampleReadout::new(samples, selection).to_string()
}

#[derive(Serialize)]
struct PresetEntry {
    name: &'static str,
    f1: f64,
    f2: f64,
}

/// WASM-exposed: the vowel presets as `[{ name, f1, f2 }]`.
#[wasm_bindgen]
pub fn vowel_presets() -> std::result::Result<JsValue, JsValue> {
    let entries: Vec<PresetEntry> = VowelPreset::ALL
        .into_iter()
        .map(|p| {
            let (f1, f2) = p.formants();
            PresetEntry { name: p.name(), f1, f2 }
        })
        .collect();
    serde_wasm_bindgen::to_value(&entries).map_err(|e| JsValue::from_str(&format!("{e}")))
}
