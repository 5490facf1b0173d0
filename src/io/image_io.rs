//! Loading panoramas and encoding face images.

use super::atomic::write_atomic;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageIoError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{0} has zero area")]
    Empty(PathBuf),

    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output encoding of face images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
    Tiff,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Tiff => "tiff",
        }
    }
}

/// PNG compression for a 1..=100 quality: higher quality compresses less.
fn png_compression(quality: u8) -> CompressionType {
    let level = 10u8.saturating_sub(quality / 10).min(9);
    match level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Load an equirectangular panorama as 8-bit RGB.
pub fn load_panorama(path: &Path) -> Result<RgbImage, ImageIoError> {
    let img = image::open(path)
        .map_err(|source| ImageIoError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();

    if img.width() == 0 || img.height() == 0 {
        return Err(ImageIoError::Empty(path.to_path_buf()));
    }
    Ok(img)
}

/// Encode `image` to `path`; the file appears only once fully written.
pub fn save_image(
    image: &RgbImage,
    path: &Path,
    format: ImageFormat,
    quality: u8,
) -> Result<(), ImageIoError> {
    let encode_err = |source| ImageIoError::Encode {
        path: path.to_path_buf(),
        source,
    };
    let (width, height) = image.dimensions();

    write_atomic(path, |w| {
        let result = match format {
            ImageFormat::Jpeg => JpegEncoder::new_with_quality(&mut *w, quality.clamp(1, 100))
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8),
            ImageFormat::Png => {
                PngEncoder::new_with_quality(&mut *w, png_compression(quality), FilterType::Adaptive)
                    .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8)
            }
            ImageFormat::Tiff => TiffEncoder::new(&mut *w).write_image(
                image.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            ),
        };
        result.map_err(encode_err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_png_roundtrip_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        let img = RgbImage::from_fn(16, 8, |x, y| Rgb([x as u8 * 9, y as u8 * 20, 5]));

        save_image(&img, &path, ImageFormat::Png, 95).unwrap();
        assert_eq!(load_panorama(&path).unwrap(), img);
    }

    #[test]
    fn test_jpeg_and_tiff_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbImage::from_pixel(32, 32, Rgb([200, 100, 50]));
        for format in [ImageFormat::Jpeg, ImageFormat::Tiff] {
            let path = dir.path().join(format!("face.{}", format.extension()));
            save_image(&img, &path, format, 90).unwrap();
            let loaded = load_panorama(&path).unwrap();
            assert_eq!(loaded.dimensions(), (32, 32));
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_panorama(&dir.path().join("nope.jpg")),
            Err(ImageIoError::Read { .. })
        ));
    }

    #[test]
    fn test_compression_follows_quality() {
        assert_eq!(png_compression(95), CompressionType::Fast);
        assert_eq!(png_compression(50), CompressionType::Default);
        assert_eq!(png_compression(5), CompressionType::Best);
    }
}
