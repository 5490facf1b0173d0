//! Conversion settings.

use crate::core::CubeFace;
use crate::io::ImageFormat;
use crate::pose::UpAxis;
use crate::projection::{
    EdgeCheck, Interpolation, ProjectionMethod, SeamRepair, DEFAULT_OVERLAP_DEG, MAX_OVERLAP_DEG,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Smallest and largest face size chosen by [`FaceSize::Auto`].
pub const AUTO_FACE_SIZE_RANGE: (u32, u32) = (512, 4096);

/// Upper bound on the default face-pool size.
const MAX_FACE_THREADS: usize = 6;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("overlap {0}° is outside [0, {max}]", max = MAX_OVERLAP_DEG)]
    Overlap(f64),

    #[error("quality {0} is outside 1..=100")]
    Quality(u8),

    #[error("face size must be positive")]
    FaceSize,

    #[error("{0} thread count must be positive")]
    Threads(&'static str),

    #[error("no faces selected")]
    NoFaces,

    #[error("face {0} selected twice")]
    DuplicateFace(CubeFace),

    #[error("max points must be positive")]
    MaxPoints,

    #[error("seam strip width must be positive")]
    SeamStrip,

    #[error("edge check needs samples > 0 and a tolerance in [0, 1]")]
    EdgeCheck,

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Face edge length in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceSize {
    /// A quarter of the panorama width, clamped to 512..=4096.
    #[default]
    Auto,
    Fixed(u32),
}

/// Where the world up axis comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpAxisSetting {
    /// Detected from the panoramas' orientations.
    #[default]
    Auto,
    Fixed(UpAxis),
}

/// All settings of a conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Extra field of view added to every face, in degrees
    pub overlap_deg: f64,

    pub face_size: FaceSize,

    pub format: ImageFormat,

    /// JPEG quality; also drives PNG compression
    pub quality: u8,

    pub interpolation: Interpolation,

    /// Face-pool size; `None` means `min(6, cores)`
    pub face_threads: Option<usize>,

    /// Panorama-pool size; `None` means `cores`
    pub panorama_threads: Option<usize>,

    pub up_axis: UpAxisSetting,

    /// Faces to render, in output order
    pub faces: Vec<CubeFace>,

    pub projection: ProjectionMethod,

    /// Back-face seam repair; `None` disables it
    pub seam_repair: Option<SeamRepair>,

    /// Point budget for the sparse cloud; `None` keeps every point
    pub max_points: Option<usize>,

    /// Compare rendered faces along their shared edges; `None` skips it
    pub edge_check: Option<EdgeCheck>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            overlap_deg: DEFAULT_OVERLAP_DEG,
            face_size: FaceSize::Auto,
            format: ImageFormat::Jpeg,
            quality: 95,
            interpolation: Interpolation::Bicubic,
            face_threads: None,
            panorama_threads: None,
            up_axis: UpAxisSetting::Auto,
            faces: CubeFace::ALL.to_vec(),
            projection: ProjectionMethod::Direct,
            seam_repair: Some(SeamRepair::default()),
            max_points: Some(50_000),
            edge_check: None,
        }
    }
}

impl ConversionConfig {
    /// Load a JSON config; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=MAX_OVERLAP_DEG).contains(&self.overlap_deg) {
            return Err(ConfigError::Overlap(self.overlap_deg));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Quality(self.quality));
        }
        if self.face_size == FaceSize::Fixed(0) {
            return Err(ConfigError::FaceSize);
        }
        if self.face_threads == Some(0) {
            return Err(ConfigError::Threads("face"));
        }
        if self.panorama_threads == Some(0) {
            return Err(ConfigError::Threads("panorama"));
        }
        if self.faces.is_empty() {
            return Err(ConfigError::NoFaces);
        }
        let mut seen = HashSet::new();
        if let Some(&face) = self.faces.iter().find(|&&face| !seen.insert(face)) {
            return Err(ConfigError::DuplicateFace(face));
        }
        if self.max_points == Some(0) {
            return Err(ConfigError::MaxPoints);
        }
        if matches!(self.seam_repair, Some(SeamRepair { strip_width: 0, .. })) {
            return Err(ConfigError::SeamStrip);
        }
        if let Some(check) = &self.edge_check {
            if check.samples == 0 || !(0.0..=1.0).contains(&check.tolerance) {
                return Err(ConfigError::EdgeCheck);
            }
        }
        Ok(())
    }

    /// Face size for a panorama `source_width` pixels wide.
    pub fn resolve_face_size(&self, source_width: u32) -> u32 {
        match self.face_size {
            FaceSize::Fixed(size) => size,
            FaceSize::Auto => {
                let (min, max) = AUTO_FACE_SIZE_RANGE;
                (source_width / 4).clamp(min, max)
            }
        }
    }

    pub fn face_threads(&self) -> usize {
        self.face_threads
            .unwrap_or_else(|| available_cores().min(MAX_FACE_THREADS))
    }

    pub fn panorama_threads(&self) -> usize {
        self.panorama_threads.unwrap_or_else(available_cores)
    }
}

fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
