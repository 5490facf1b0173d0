//! Pinhole camera model (intrinsics plus a world-to-camera pose).
//!
//! Face cameras are always zero-distortion pinholes with square pixels and
//! the principal point at the image centre.

use super::pose::CameraPose;
use nalgebra::{Matrix3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// A pinhole camera with intrinsic and extrinsic parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinholeCamera {
    /// Focal length in X (pixels)
    pub fx: f64,

    /// Focal length in Y (pixels)
    pub fy: f64,

    /// Principal point X (pixels)
    pub cx: f64,

    /// Principal point Y (pixels)
    pub cy: f64,

    /// Image width (pixels)
    pub width: u32,

    /// Image height (pixels)
    pub height: u32,

    /// Rotation from world to camera coordinates
    pub rotation: Matrix3<f64>,

    /// Translation from world to camera coordinates
    pub translation: Vector3<f64>,
}

/// Focal length in pixels for a square face of `size` pixels covering `fov_deg`.
pub fn focal_length_px(size: u32, fov_deg: f64) -> f64 {
    size as f64 / (2.0 * (fov_deg.to_radians() / 2.0).tan())
}

impl PinholeCamera {
    /// Intrinsics of a square cube-face camera with identity pose.
    pub fn for_cube_face(size: u32, fov_deg: f64) -> Self {
        let f = focal_length_px(size, fov_deg);
        let c = size as f64 / 2.0;
        Self {
            fx: f,
            fy: f,
            cx: c,
            cy: c,
            width: size,
            height: size,
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Same intrinsics, placed at `pose`.
    pub fn with_pose(mut self, pose: &CameraPose) -> Self {
        self.rotation = pose.world_to_camera();
        self.translation = pose.translation();
        self
    }

    /// Transform a point from world coordinates to camera coordinates.
    ///
    /// p_camera = R * p_world + t
    pub fn world_to_camera(&self, point_world: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * point_world + self.translation
    }

    /// Project a point in camera coordinates to pixel coordinates.
    ///
    /// Returns None if the point is behind the camera (z <= 0).
    pub fn project(&self, point_camera: &Vector3<f64>) -> Option<Vector2<f64>> {
        if point_camera.z <= 0.0 {
            return None;
        }

        let x = point_camera.x / point_camera.z;
        let y = point_camera.y / point_camera.z;

        Some(Vector2::new(self.fx * x + self.cx, self.fy * y + self.cy))
    }

    /// Project a world point directly to pixel coordinates.
    pub fn world_to_pixel(&self, point_world: &Vector3<f64>) -> Option<Vector2<f64>> {
        self.project(&self.world_to_camera(point_world))
    }

    /// Camera center in world coordinates: C = -Rᵀ t
    pub fn camera_center(&self) -> Vector3<f64> {
        -self.rotation.transpose() * self.translation
    }

    /// Horizontal field of view in degrees.
    pub fn fov_x_deg(&self) -> f64 {
        (2.0 * (self.width as f64 / (2.0 * self.fx)).atan()).to_degrees()
    }
}
