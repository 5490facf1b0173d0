//! Equirectangular ↔ perspective/cubemap projection.
//!
//! This module is split in two halves:
//! - `remap`: pure builders producing [`RemapField`]s (per-pixel source
//!   coordinates) for perspective views, cube faces, the dice layout and the
//!   inverse cubemap → equirectangular direction
//! - `sample` / `seam` / `edges`: applying a field to an image, the back-face
//!   seam repair and the edge continuity check on rendered faces
//!
//! Fields are expensive to build and independent of pixel content, so
//! [`RemapCache`] memoizes them per parameter tuple.

mod cache;
mod edges;
mod remap;
mod sample;
mod seam;

pub use cache::{RemapCache, RemapKey};
pub use edges::{EdgeCheck, EdgeMetric, EdgeReport, CUBE_EDGES};
pub use remap::{
    cube_dice_layout, cube_face_field, cube_face_remap, cubemap_to_equirect_remap,
    cubemap_to_equirect_remap_with_overlap, direction_to_lon_lat, lon_lat_to_direction,
    perspective_remap, unwrap_longitude, ImageShape, ProjectionMethod, RemapField,
    DEFAULT_OVERLAP_DEG, MAX_OVERLAP_DEG,
};
pub use sample::{cube_strip, resample, Interpolation};
pub use seam::{repair_seam_artifact, SeamRepair};

use thiserror::Error;

/// Errors raised while building remap fields or assembling face images.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("{what} has zero area ({width}x{height})")]
    EmptyShape {
        what: &'static str,
        width: u32,
        height: u32,
    },

    #[error("overlap {0}° is outside [0, {max}]", max = MAX_OVERLAP_DEG)]
    InvalidOverlap(f64),

    #[error("effective field of view {0}° must lie in (0, 180)")]
    InvalidFov(f64),

    #[error("expected {expected} face tiles of {size}x{size}, got {got}")]
    FaceCount {
        expected: usize,
        got: usize,
        size: u32,
    },
}
