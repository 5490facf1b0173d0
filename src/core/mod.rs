//! Core data structures and mathematical operations.
//!
//! This module contains the fundamental types used throughout the crate:
//! - `CubeFace`: the six faces and their canonical orientation
//! - `CameraPose`: world position plus camera-to-world rotation
//! - `PinholeCamera`: zero-distortion intrinsics for face images
//! - Math utilities: rotation ↔ quaternion conversion
//!
//! All types here are pure data; no I/O, no resampling.

mod camera;
mod face;
pub mod math;
mod pose;

pub use camera::{focal_length_px, PinholeCamera};
pub use face::{CubeFace, UnknownFace};
pub use math::{is_proper_rotation, quaternion_to_matrix, rotation_to_quaternion};
pub use pose::CameraPose;
