//! Repair of the panorama seam on the back face.
//!
//! The left and right edges of an equirectangular image meet in the centre
//! column of the back face. Stitchers often leave a thin black line there;
//! this pass detects it row by row and paints it over.

use image::{imageops, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Seam detection and repair parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeamRepair {
    /// Width of the centre strip, in pixels
    pub strip_width: u32,

    /// A strip pixel whose channel mean is below this value marks its row as damaged
    pub darkness_threshold: f32,

    /// Sigma of the Gaussian used to soften the repaired strip
    pub blur_sigma: f32,
}

impl Default for SeamRepair {
    fn default() -> Self {
        Self {
            strip_width: 3,
            darkness_threshold: 30.0,
            blur_sigma: 1.1,
        }
    }
}

impl SeamRepair {
    /// Inclusive column range of the centre strip, or `None` when the image
    /// is too narrow to have a flank on either side.
    pub fn strip_columns(&self, width: u32) -> Option<(u32, u32)> {
        if self.strip_width == 0 || width < 2 {
            return None;
        }
        let strip = self.strip_width.min(width - 1);
        let left = (width / 2).saturating_sub(strip / 2);
        let right = (left + strip - 1).min(width - 1);
        Some((left, right))
    }

    /// Repair the centre strip of `image`.
    ///
    /// Returns an unmodified copy when no row of the strip is dark.
    pub fn repair(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        let Some((left, right)) = self.strip_columns(width) else {
            return image.clone();
        };

        let mut fixed = image.clone();
        let mut damaged_rows = 0usize;
        let n = (right - left + 1) as f32;

        for y in 0..height {
            let dark = (left..=right).any(|x| mean(image.get_pixel(x, y)) < self.darkness_threshold);
            if !dark {
                continue;
            }
            damaged_rows += 1;

            let left_flank = if left > 0 { left - 1 } else { right + 1 };
            let right_flank = if right + 1 < width { right + 1 } else { left_flank };
            let a = *image.get_pixel(left_flank, y);
            let b = *image.get_pixel(right_flank, y);

            for (i, x) in (left..=right).enumerate() {
                let alpha = (i as f32 + 1.0) / (n + 1.0);
                let mix = |c: usize| (a[c] as f32 * (1.0 - alpha) + b[c] as f32 * alpha).round() as u8;
                fixed.put_pixel(x, y, Rgb([mix(0), mix(1), mix(2)]));
            }
        }

        if damaged_rows == 0 {
            return fixed;
        }
        log::debug!(
            "seam repair: {} of {} rows in columns {}..={}",
            damaged_rows,
            height,
            left,
            right
        );

        if self.blur_sigma > 0.0 {
            // Blur a band wide enough that the kernel never sees the band's own edge
            // when producing strip columns.
            let pad = (3.0 * self.blur_sigma).ceil() as u32 + 2;
            let band_left = left.saturating_sub(pad);
            let band_right = (right + pad).min(width - 1);
            let band = imageops::crop_imm(&fixed, band_left, 0, band_right - band_left + 1, height)
                .to_image();
            let blurred = imageops::blur(&band, self.blur_sigma);

            for y in 0..height {
                for x in left..=right {
                    fixed.put_pixel(x, y, *blurred.get_pixel(x - band_left, y));
                }
            }
        }

        fixed
    }
}

fn mean(p: &Rgb<u8>) -> f32 {
    (p[0] as f32 + p[1] as f32 + p[2] as f32) / 3.0
}

/// [`SeamRepair::repair`] with the default parameters.
pub fn repair_seam_artifact(image: &RgbImage) -> RgbImage {
    SeamRepair::default().repair(image)
}
