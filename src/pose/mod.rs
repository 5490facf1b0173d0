//! Per-face camera pose synthesis.
//!
//! Given a panorama's world position and orientation, each cube face becomes
//! a pinhole camera at the same position, rotated to look along the face's
//! direction. Which world axis is "up" is either configured or detected from
//! the panoramas' own orientations.

mod directions;
mod synth;
mod up_axis;

pub use directions::{face_directions, sphere_to_local, FaceDirection, FaceDirections};
pub use synth::{compose_pose, face_rotation, synthesize_face_poses};
pub use up_axis::{detect_up_axis, UnknownUpAxis, UpAxis, UpAxisEstimate, DEFAULT_UP_AXIS_SAMPLES};

use nalgebra::Vector3;
use thiserror::Error;

/// Errors raised while synthesizing poses.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoseError {
    #[error("cannot build a face basis from forward {forward:?} and up {up:?}")]
    DegenerateBasis {
        forward: Vector3<f64>,
        up: Vector3<f64>,
    },

    #[error("base orientation is not a proper rotation (orthonormality error {0:.2e})")]
    InvalidBaseRotation(f64),
}
