//! Sample inspector — pointer-to-index mapping and a raw value readout.

use std::fmt;

use serde::Serialize;

/// Number of consecutive samples shown in the readout.
pub const SAMPLES_WINDOW: usize = 20;

/// Map a horizontal pointer position, as a fraction of the display width,
/// to the nearest sample index: `round(fraction * (len - 1))`, clamped.
///
/// Returns `None` for an empty sample or a non-finite fraction.
pub fn nearest_index(fraction: f64, len: usize) -> Option<usize> {
    if len == 0 || !fraction.is_finite() {
        return None;
    }
    let last = (len - 1) as f64;
    Some((fraction * last).round().clamp(0.0, last) as usize)
}

/// First index of a `window`-sized run centred on `selected`, kept inside
/// `[0, len)`.
pub fn window_start(selected: usize, len: usize, window: usize) -> usize {
    let max_start = len.saturating_sub(window);
    selected.saturating_sub(window / 2).min(max_start)
}

/// One row of the readout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReadoutRow {
    pub index: usize,
    pub value: f32,
    pub selected: bool,
}

/// Up to [`SAMPLES_WINDOW`] raw amplitudes around the selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleReadout {
    pub rows: Vec<ReadoutRow>,
    /// `(index, value)` of the selected sample.
    pub selected: Option<(usize, f32)>,
}

impl SampleReadout {
    /// Build the readout for `samples`. Without a selection the window
    /// starts at the first sample.
    pub fn new(samples: &[f32], selection: Option<usize>) -> Self {
        let selection = selection.filter(|&i| i < samples.len());
        let start = selection.map_or(0, |i| window_start(i, samples.len(), SAMPLES_WINDOW));
        let end = (start + SAMPLES_WINDOW).min(samples.len());

        let rows = samples[start..end]
            .iter()
            .enumerate()
            .map(|(offset, &value)| ReadoutRow {
                index: start + offset,
                value,
                selected: selection == Some(start + offset),
            })
            .collect();

        SampleReadout {
            rows,
            selected: selection.map(|i| (i, samples[i])),
        }
    }

    pub fn start(&self) -> Option<usize> {
        self.rows.first().map(|r| r.index)
    }
}

impl fmt::Display for SampleReadout {
    /// Selected sample at 4 decimals, then the window at 3 decimals with
    /// the selected entry bracketed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((index, value)) = self.selected {
            writeln!(f, "sample[{index}] = {value:.4}")?;
        }
        let cells: Vec<String> = self
            .rows
            .iter()
            .map(|r| {
                if r.selected {
                    format!("[{:.3}]", r.value)
                } else {
                    format!("{:.3}", r.value)
                }
            })
            .collect();
        write!(f, "{}", cells.join(" "))
    }
}
