//! Camera pose: world position plus camera-to-world rotation.

use super::math::rotation_to_quaternion;
use nalgebra::{Matrix3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Pose of a camera in world space.
///
/// `rotation` maps camera axes to world axes (its columns are the camera's
/// x, y, z axes expressed in world coordinates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    /// Camera centre in world coordinates
    pub position: Vector3<f64>,

    /// Camera-to-world rotation
    pub rotation: Matrix3<f64>,
}

impl CameraPose {
    pub fn new(position: Vector3<f64>, rotation: Matrix3<f64>) -> Self {
        Self { position, rotation }
    }

    /// World-to-camera rotation (transpose of the camera-to-world rotation).
    pub fn world_to_camera(&self) -> Matrix3<f64> {
        self.rotation.transpose()
    }

    /// World-to-camera translation: t = -R_w2c * C
    pub fn translation(&self) -> Vector3<f64> {
        -(self.world_to_camera() * self.position)
    }

    /// World-to-camera rotation as a unit quaternion (w >= 0).
    pub fn quaternion(&self) -> UnitQuaternion<f64> {
        rotation_to_quaternion(&self.world_to_camera())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_translation_of_identity_pose() {
        let pose = CameraPose::new(Vector3::new(1.0, 2.0, 3.0), Matrix3::identity());
        assert_relative_eq!(pose.translation(), Vector3::new(-1.0, -2.0, -3.0), epsilon = 1e-12);
    }

    #[test]
    fn test_center_maps_to_camera_origin() {
        let rotation = UnitQuaternion::from_euler_angles(0.3, -0.2, 1.4)
            .to_rotation_matrix()
            .into_inner();
        let pose = CameraPose::new(Vector3::new(-4.0, 0.5, 2.0), rotation);
        let origin = pose.world_to_camera() * pose.position + pose.translation();
        assert_relative_eq!(origin, Vector3::zeros(), epsilon = 1e-12);
    }
}
