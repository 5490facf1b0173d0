//! Sparse point cloud extraction.
//!
//! Source points arrive from the host with colors in whatever shape the host
//! stores them: unit-range floats, 0..255 values, named channels, a parallel
//! per-point table, or nothing at all. [`extract_points`] decimates the cloud,
//! resolves every color to 8-bit RGB and assigns exchange ids.

mod color;
mod extract;

pub use color::{normalize_rgb, ColorSource, FALLBACK_GRAY};
pub use extract::{extract_points, ExtractedPoint, Extraction, ExtractionReport, PointStore, SourcePoint};
