//! Applying remap fields to images.

use super::remap::RemapField;
use super::ProjectionError;
use crate::core::CubeFace;
use image::{Rgb, RgbImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Resampling kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    Bilinear,
    #[default]
    Bicubic,
}

/// Keys cubic convolution coefficient.
const CUBIC_A: f64 = -0.75;

/// Sample `image` at every coordinate of `field`.
///
/// Horizontal indices wrap around (longitude is cyclic), vertical indices
/// clamp to the first/last row. Non-finite coordinates produce black.
pub fn resample(image: &RgbImage, field: &RemapField, interpolation: Interpolation) -> RgbImage {
    let mut out = RgbImage::new(field.width, field.height);
    if image.width() == 0 || image.height() == 0 || field.is_empty() {
        return out;
    }

    let row_len = field.width as usize * 3;
    let buffer: &mut [u8] = &mut out;
    buffer
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(row, pixels)| {
            for col in 0..field.width {
                let (x, y) = field.get(col, row as u32);
                let rgb = sample(image, x as f64, y as f64, interpolation);
                let i = col as usize * 3;
                pixels[i..i + 3].copy_from_slice(&rgb);
            }
        });

    out
}

pub(crate) fn sample(image: &RgbImage, x: f64, y: f64, interpolation: Interpolation) -> [u8; 3] {
    if !x.is_finite() || !y.is_finite() {
        return [0, 0, 0];
    }
    // Keep the integer casts in range. Taps still read the same pixels.
    let x = x.rem_euclid(image.width() as f64);
    let y = y.clamp(-2.0, image.height() as f64 + 1.0);

    match interpolation {
        Interpolation::Nearest => {
            let Rgb(p) = *pixel(image, x.round() as i64, y.round() as i64);
            p
        }
        Interpolation::Bilinear => {
            let (x0, y0) = (x.floor(), y.floor());
            let (fx, fy) = (x - x0, y - y0);
            let (x0, y0) = (x0 as i64, y0 as i64);
            let weights = [
                (0, 0, (1.0 - fx) * (1.0 - fy)),
                (1, 0, fx * (1.0 - fy)),
                (0, 1, (1.0 - fx) * fy),
                (1, 1, fx * fy),
            ];
            let mut acc = [0.0f64; 3];
            for (dx, dy, w) in weights {
                let p = pixel(image, x0 + dx, y0 + dy);
                for c in 0..3 {
                    acc[c] += w * p[c] as f64;
                }
            }
            to_rgb(acc)
        }
        Interpolation::Bicubic => {
            let (x0, y0) = (x.floor(), y.floor());
            let (fx, fy) = (x - x0, y - y0);
            let (x0, y0) = (x0 as i64, y0 as i64);
            let wx = [-1, 0, 1, 2].map(|m| cubic_weight(fx - m as f64));
            let wy = [-1, 0, 1, 2].map(|n| cubic_weight(fy - n as f64));
            let mut acc = [0.0f64; 3];
            for (j, wy) in wy.iter().enumerate() {
                for (i, wx) in wx.iter().enumerate() {
                    let p = pixel(image, x0 + i as i64 - 1, y0 + j as i64 - 1);
                    for c in 0..3 {
                        acc[c] += wx * wy * p[c] as f64;
                    }
                }
            }
            to_rgb(acc)
        }
    }
}

#[inline]
fn pixel(image: &RgbImage, x: i64, y: i64) -> &Rgb<u8> {
    let x = x.rem_euclid(image.width() as i64) as u32;
    let y = y.clamp(0, image.height() as i64 - 1) as u32;
    image.get_pixel(x, y)
}

fn cubic_weight(t: f64) -> f64 {
    let t = t.abs();
    if t <= 1.0 {
        (CUBIC_A + 2.0) * t.powi(3) - (CUBIC_A + 3.0) * t.powi(2) + 1.0
    } else if t < 2.0 {
        CUBIC_A * t.powi(3) - 5.0 * CUBIC_A * t.powi(2) + 8.0 * CUBIC_A * t - 4.0 * CUBIC_A
    } else {
        0.0
    }
}

fn to_rgb(acc: [f64; 3]) -> [u8; 3] {
    acc.map(|v| v.round().clamp(0.0, 255.0) as u8)
}

/// Lay six square faces side by side in [`CubeFace::ALL`] order.
///
/// This is the source layout expected by the inverse cubemap remap.
pub fn cube_strip(faces: &[RgbImage]) -> Result<RgbImage, ProjectionError> {
    let size = faces.first().map(|f| f.width()).unwrap_or(0);
    let square = |f: &RgbImage| f.width() == size && f.height() == size;
    if size == 0 || faces.len() != CubeFace::ALL.len() || !faces.iter().all(square) {
        return Err(ProjectionError::FaceCount {
            expected: CubeFace::ALL.len(),
            got: faces.iter().filter(|f| size > 0 && square(f)).count(),
            size,
        });
    }

    let mut strip = RgbImage::new(size * faces.len() as u32, size);
    for (i, face) in faces.iter().enumerate() {
        image::imageops::replace(&mut strip, face, i as i64 * size as i64, 0);
    }
    Ok(strip)
}
