//! Rasterizer — paints a [`DrawList`] onto an RGBA image.
//!
//! Lines are drawn by stamping discs along the segment, which keeps thick
//! strokes and round joins simple. Colours are blended source-over.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::error::{FormantError, Result};
use crate::render::{Colour, DrawList, DrawOp};

/// Step along a segment, in pixels.
const STROKE_STEP: f32 = 0.5;

/// Rasterize at `scale` device pixels per logical pixel.
pub fn rasterize(list: &DrawList, scale: f32) -> RgbaImage {
    let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
    let w = ((list.width as f32 * scale).round() as u32).max(1);
    let h = ((list.height as f32 * scale).round() as u32).max(1);
    let mut img = RgbaImage::new(w, h);
    let sp = |(x, y): (f32, f32)| (x * scale, y * scale);

    for op in &list.ops {
        match op {
            DrawOp::Clear { colour } => {
                for px in img.pixels_mut() {
                    *px = Rgba(*colour);
                }
            }
            DrawOp::DashedLine { from, to, dash, colour, width } => {
                let pattern = [dash[0] * scale, dash[1] * scale];
                stroke(&mut img, sp(*from), sp(*to), width * scale, *colour, Some(pattern));
            }
            DrawOp::Line { from, to, colour, width } => {
                stroke(&mut img, sp(*from), sp(*to), width * scale, *colour, None);
            }
            DrawOp::Polyline { points, colour, width } => {
                // Single-point polylines still leave a mark.
                if let [only] = points.as_slice() {
                    disc(&mut img, sp(*only), width * scale / 2.0, *colour);
                }
                for pair in points.windows(2) {
                    stroke(&mut img, sp(pair[0]), sp(pair[1]), width * scale, *colour, None);
                }
            }
            DrawOp::Dot { centre, radius, colour } => {
                disc(&mut img, sp(*centre), radius * scale, *colour);
            }
        }
    }
    img
}

/// Encode an image as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| FormantError::Raster(e.to_string()))?;
    Ok(out.into_inner())
}

fn stroke(
    img: &mut RgbaImage,
    from: (f32, f32),
    to: (f32, f32),
    width: f32,
    colour: Colour,
    dash: Option<[f32; 2]>,
) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let length = (dx * dx + dy * dy).sqrt();
    let steps = (length / STROKE_STEP).ceil().max(1.0) as usize;
    let radius = width / 2.0;
    // Translucent strokes would darken where stamps overlap; paint each
    // pixel once per stroke instead.
    let mut painted = std::collections::HashSet::new();

    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        if let Some([on, off]) = dash {
            let period = on + off;
            if period > 0.0 && (t * length) % period >= on {
                continue;
            }
        }
        let centre = (from.0 + dx * t, from.1 + dy * t);
        for (x, y) in disc_pixels(img, centre, radius) {
            if painted.insert((x, y)) {
                blend(img, x, y, colour);
            }
        }
    }
}

fn disc(img: &mut RgbaImage, centre: (f32, f32), radius: f32, colour: Colour) {
    for (x, y) in disc_pixels(img, centre, radius) {
        blend(img, x, y, colour);
    }
}

/// Pixels whose centres fall inside the disc; at least the pixel under the
/// centre when the radius is tiny.
fn disc_pixels(img: &RgbaImage, centre: (f32, f32), radius: f32) -> Vec<(u32, u32)> {
    let (w, h) = img.dimensions();
    let r = radius.max(0.5);
    let x0 = (centre.0 - r).floor().max(0.0) as i64;
    let y0 = (centre.1 - r).floor().max(0.0) as i64;
    let x1 = ((centre.0 + r).ceil() as i64).min(w as i64 - 1);
    let y1 = ((centre.1 + r).ceil() as i64).min(h as i64 - 1);

    let mut out = Vec::new();
    for y in y0..=y1 {
        for x in x0..=x1 {
            let (cx, cy) = (x as f32 + 0.5 - centre.0, y as f32 + 0.5 - centre.1);
            if cx * cx + cy * cy <= r * r {
                out.push((x as u32, y as u32));
            }
        }
    }
    out
}

fn blend(img: &mut RgbaImage, x: u32, y: u32, colour: Colour) {
    let dst = img.get_pixel_mut(x, y);
    let a = colour[3] as f32 / 255.0;
    for c in 0..3 {
        dst.0[c] = (colour[c] as f32 * a + dst.0[c] as f32 * (1.0 - a)).round() as u8;
    }
    let out_a = a + dst.0[3] as f32 / 255.0 * (1.0 - a);
    dst.0[3] = (out_a * 255.0).round() as u8;
}
