//! Waveform renderer — turns a sample window into drawing operations.
//!
//! Rendering is pure: the same samples and selection always give the same
//! [`DrawList`]. The list can be replayed onto a browser canvas (it
//! serializes to plain JSON objects) or rasterized with [`crate::raster`].

use serde::{Deserialize, Serialize};

use crate::inspector;

/// RGBA, 8 bits per channel.
pub type Colour = [u8; 4];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Logical canvas size in pixels.
    pub width: u32,
    pub height: u32,
    /// Headroom added above and below the sample's own range, as a
    /// fraction of that range.
    pub padding: f64,
    /// Smallest range used for scaling; stands in for flat input.
    pub min_range: f64,
    pub background: Colour,
    pub zero_line: Colour,
    pub waveform: Colour,
    pub hairline: Colour,
    pub marker: Colour,
    pub line_width: f32,
    pub marker_radius: f32,
    /// Dash and gap lengths of the zero reference line.
    pub dash: [f32; 2],
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            width: 500,
            height: 120,
            padding: 0.08,
            min_range: 1e-6,
            background: [255, 255, 255, 255],
            zero_line: [160, 160, 160, 255],
            waveform: [37, 99, 235, 255],
            hairline: [220, 38, 38, 110],
            marker: [220, 38, 38, 255],
            line_width: 1.5,
            marker_radius: 3.5,
            dash: [4.0, 4.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Clear {
        colour: Colour,
    },
    DashedLine {
        from: (f32, f32),
        to: (f32, f32),
        dash: [f32; 2],
        colour: Colour,
        width: f32,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        colour: Colour,
        width: f32,
    },
    Polyline {
        points: Vec<(f32, f32)>,
        colour: Colour,
        width: f32,
    },
    Dot {
        centre: (f32, f32),
        radius: f32,
        colour: Colour,
    },
}

/// Drawing operations for one frame, in paint order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawList {
    pub width: u32,
    pub height: u32,
    pub ops: Vec<DrawOp>,
}

/// Amplitude-to-pixel mapping fitted to a sample window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalScale {
    lo: f64,
    hi: f64,
    height: f64,
}

impl VerticalScale {
    /// Fit `samples` (min/max plus padding) into `height` pixels.
    pub fn fit(samples: &[f32], height: u32, padding: f64, min_range: f64) -> Self {
        let (min, max) = samples.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| {
            (lo.min(s as f64), hi.max(s as f64))
        });
        let (min, max) = if min.is_finite() { (min, max) } else { (0.0, 0.0) };

        let mut range = max - min;
        let (mut lo, mut hi) = (min, max);
        if range < min_range {
            let mid = (min + max) / 2.0;
            range = min_range;
            lo = mid - range / 2.0;
            hi = mid + range / 2.0;
        }
        let pad = range * padding;
        VerticalScale {
            lo: lo - pad,
            hi: hi + pad,
            height: height as f64,
        }
    }

    /// Pixel row for an amplitude; larger amplitudes sit higher.
    pub fn y(&self, amplitude: f64) -> f32 {
        (self.height - (amplitude - self.lo) / (self.hi - self.lo) * self.height) as f32
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WaveformRenderer {
    config: RendererConfig,
}

impl WaveformRenderer {
    pub fn new(config: RendererConfig) -> Self {
        WaveformRenderer { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Horizontal position of sample `index` in a window of `len` samples,
    /// on the same pixel scale as the polyline (first sample at x = 0, last
    /// at x = width - 1).
    pub fn sample_x(&self, index: usize, len: usize) -> f32 {
        if len < 2 {
            return 0.0;
        }
        let last_px = self.last_px();
        (index as f64 / (len - 1) as f64 * last_px) as f32
    }

    fn last_px(&self) -> f64 {
        self.config.width.saturating_sub(1).max(1) as f64
    }

    pub fn render(&self, samples: &[f32], selection: Option<usize>) -> DrawList {
        let c = &self.config;
        let mut ops = vec![DrawOp::Clear { colour: c.background }];

        if !samples.is_empty() {
            let scale = VerticalScale::fit(samples, c.height, c.padding, c.min_range);
            let width = c.width as f32;

            let zero = scale.y(0.0);
            ops.push(DrawOp::DashedLine {
                from: (0.0, zero),
                to: (width, zero),
                dash: c.dash,
                colour: c.zero_line,
                width: 1.0,
            });

            let last_px = self.last_px();
            let points = (0..c.width)
                .filter_map(|px| {
                    let idx = inspector::nearest_index(px as f64 / last_px, samples.len())?;
                    Some((px as f32, scale.y(samples[idx] as f64)))
                })
                .collect();
            ops.push(DrawOp::Polyline {
                points,
                colour: c.waveform,
                width: c.line_width,
            });

            if let Some(idx) = selection.filter(|&i| i < samples.len()) {
                let x = self.sample_x(idx, samples.len());
                ops.push(DrawOp::Line {
                    from: (x, 0.0),
                    to: (x, c.height as f32),
                    colour: c.hairline,
                    width: 1.0,
                });
                ops.push(DrawOp::Dot {
                    centre: (x, scale.y(samples[idx] as f64)),
                    radius: c.marker_radius,
                    colour: c.marker,
                });
            }
        }

        DrawList {
            width: c.width,
            height: c.height,
            ops,
        }
    }
}
