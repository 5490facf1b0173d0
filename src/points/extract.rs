//! Decimation, color resolution and id assignment.

use super::color::{ColorSource, FALLBACK_GRAY};
use crate::io::Point3D;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Below this fraction of colored points the report warns about missing colors.
const LOW_COLOR_RATIO: f64 = 0.3;

fn default_valid() -> bool {
    true
}

/// One point of the host's sparse cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePoint {
    pub position: Vector3<f64>,

    #[serde(default)]
    pub color: ColorSource,

    /// Points flagged invalid by the host are skipped
    #[serde(default = "default_valid")]
    pub valid: bool,

    /// Reconstruction error reported by the host
    #[serde(default)]
    pub error: f64,
}

impl SourcePoint {
    pub fn new(position: Vector3<f64>, color: ColorSource) -> Self {
        Self {
            position,
            color,
            valid: true,
            error: 0.0,
        }
    }
}

/// The host's point cloud plus an optional per-index color table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointStore {
    #[serde(default)]
    pub points: Vec<SourcePoint>,

    /// Colors indexed like `points`, consulted when a point has no usable color
    #[serde(default)]
    pub color_table: Option<Vec<ColorSource>>,
}

/// An output point and whether a real color was found for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPoint {
    pub point: Point3D,
    pub color_found: bool,
}

/// Counters describing one extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionReport {
    /// Points in the store
    pub total: usize,
    /// Decimation step (1 = every point)
    pub stride: usize,
    /// Points emitted
    pub valid: usize,
    /// Emitted points whose color came from the point or the color table
    pub colored: usize,
    /// Emitted points painted gray
    pub gray_fallback: usize,
}

impl ExtractionReport {
    pub fn color_ratio(&self) -> f64 {
        if self.valid == 0 {
            return 0.0;
        }
        self.colored as f64 / self.valid as f64
    }

    /// Log the summary; warns when few points carry a color.
    pub fn log_summary(&self) {
        log::info!(
            "points: {} of {} kept (stride {}), {} colored, {} gray",
            self.valid,
            self.total,
            self.stride,
            self.colored,
            self.gray_fallback
        );
        if self.valid > 0 && self.color_ratio() < LOW_COLOR_RATIO {
            log::warn!(
                "only {:.1}% of points have colors; compute point colors in the source project before exporting",
                self.color_ratio() * 100.0
            );
        }
    }
}

/// Result of [`extract_points`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub points: Vec<ExtractedPoint>,
    pub report: ExtractionReport,
}

impl Extraction {
    pub fn into_points(self) -> Vec<Point3D> {
        self.points.into_iter().map(|p| p.point).collect()
    }
}

/// Decimate `store` to at most about `max_count` points and resolve colors.
///
/// When the store is larger than `max_count`, only indices divisible by
/// `ceil(total / max_count)` are kept. Invalid points are skipped. A point's
/// color comes from its own [`ColorSource`], then the store's color table,
/// then [`FALLBACK_GRAY`]. Ids are the source index plus one, so they stay
/// stable under decimation.
pub fn extract_points(store: &PointStore, max_count: Option<usize>) -> Extraction {
    let total = store.points.len();
    let stride = match max_count {
        Some(max) if max > 0 && total > max => total.div_ceil(max),
        _ => 1,
    };

    let mut report = ExtractionReport {
        total,
        stride,
        ..Default::default()
    };
    let mut points = Vec::with_capacity(total / stride + 1);

    for (idx, source) in store.points.iter().enumerate().step_by(stride) {
        if !source.valid {
            continue;
        }

        let table_color = || {
            store
                .color_table
                .as_ref()
                .and_then(|table| table.get(idx))
                .and_then(ColorSource::resolve)
        };
        let (rgb, color_found) = match source.color.resolve().or_else(table_color) {
            Some(rgb) => (rgb, true),
            None => (FALLBACK_GRAY, false),
        };

        report.valid += 1;
        if color_found {
            report.colored += 1;
        } else {
            report.gray_fallback += 1;
        }

        points.push(ExtractedPoint {
            point: Point3D {
                id: idx as u64 + 1,
                xyz: source.position,
                rgb,
                error: if source.error.is_finite() { source.error } else { 0.0 },
                track: Vec::new(),
            },
            color_found,
        });
    }

    Extraction { points, report }
}
