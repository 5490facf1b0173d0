//! Face rotations and poses.

use super::directions::face_directions;
use super::up_axis::UpAxis;
use super::PoseError;
use crate::core::math::orthonormality_error;
use crate::core::{CameraPose, CubeFace};
use nalgebra::{Matrix3, Vector3};

const DEGENERATE_EPS: f64 = 1e-9;

/// Largest accepted deviation of a base orientation from orthonormality.
const BASE_ROTATION_TOL: f64 = 1e-3;

/// Camera-to-world rotation of a face looking along `forward` with `up` on top,
/// relative to the base orientation `base`.
///
/// The face frame has rows `[right; -up; forward]` with
/// `right = forward × up` re-orthogonalized. Image y points down in the
/// pinhole convention, hence `-up`; this keeps the frame a proper rotation.
/// The result is `base * frameᵀ`. With the direction tables of
/// [`face_directions`] the camera x axis matches the right edge of the
/// rendered face image.
pub fn face_rotation(
    forward: &Vector3<f64>,
    up: &Vector3<f64>,
    base: &Matrix3<f64>,
) -> Result<Matrix3<f64>, PoseError> {
    let degenerate = || PoseError::DegenerateBasis {
        forward: *forward,
        up: *up,
    };

    let forward_n = forward.try_normalize(DEGENERATE_EPS).ok_or_else(degenerate)?;
    let right = forward_n
        .cross(up)
        .try_normalize(DEGENERATE_EPS)
        .ok_or_else(degenerate)?;
    let up_n = right.cross(&forward_n).normalize();

    let frame_t = Matrix3::from_columns(&[right, -up_n, forward_n]);
    Ok(base * frame_t)
}

pub fn compose_pose(position: Vector3<f64>, rotation: Matrix3<f64>) -> CameraPose {
    CameraPose::new(position, rotation)
}

/// Poses of the selected `faces` for a panorama at `position` with
/// orientation `base`, using the direction table of `axis`.
pub fn synthesize_face_poses(
    position: &Vector3<f64>,
    base: &Matrix3<f64>,
    axis: UpAxis,
    faces: &[CubeFace],
) -> Result<Vec<(CubeFace, CameraPose)>, PoseError> {
    let error = orthonormality_error(base);
    if !error.is_finite() || error > BASE_ROTATION_TOL || base.determinant() <= 0.0 {
        return Err(PoseError::InvalidBaseRotation(error));
    }

    let directions = face_directions(axis);
    faces
        .iter()
        .map(|&face| {
            let d = directions.get(face);
            let rotation = face_rotation(&d.forward, &d.up, base)?;
            Ok((face, compose_pose(*position, rotation)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::is_proper_rotation;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    #[test]
    fn test_identity_base_front_face() {
        let r = face_rotation(&Vector3::z(), &Vector3::y(), &Matrix3::identity()).unwrap();
        // Camera z looks along +Z, camera y points down.
        assert_relative_eq!(r * Vector3::z(), Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(r * Vector3::y(), -Vector3::y(), epsilon = 1e-12);
        assert!(is_proper_rotation(&r, 1e-9));
    }

    #[test]
    fn test_front_face_of_level_panorama_is_base() {
        let base = UnitQuaternion::from_euler_angles(0.2, 0.9, -0.4)
            .to_rotation_matrix()
            .into_inner();
        let poses =
            synthesize_face_poses(&Vector3::zeros(), &base, UpAxis::YUp, &[CubeFace::Front])
                .unwrap();
        assert_relative_eq!(poses[0].1.rotation, base, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_is_orthonormal_for_generic_inputs() {
        let inputs = [
            (Vector3::new(0.3, -1.2, 0.4), Vector3::new(1.0, 0.2, -0.5)),
            (Vector3::new(5.0, 0.0, 0.1), Vector3::new(0.0, 0.0, 2.0)),
            (Vector3::new(-0.01, 0.02, -3.0), Vector3::new(0.7, 0.7, 0.0)),
        ];
        let base = UnitQuaternion::from_euler_angles(0.4, -1.1, 2.5)
            .to_rotation_matrix()
            .into_inner();
        for (forward, up) in inputs {
            let r = face_rotation(&forward, &up, &base).unwrap();
            assert_relative_eq!(r.transpose() * r, Matrix3::identity(), epsilon = 1e-5);
            assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-5);
            // Camera z axis is the base-rotated forward direction.
            assert_relative_eq!(r.column(2).into_owned(), base * forward.normalize(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_parallel_inputs_are_rejected() {
        let v = Vector3::new(0.0, 2.0, 0.0);
        assert!(matches!(
            face_rotation(&v, &(v * 3.0), &Matrix3::identity()),
            Err(PoseError::DegenerateBasis { .. })
        ));
        assert!(face_rotation(&Vector3::zeros(), &v, &Matrix3::identity()).is_err());
    }

    #[test]
    fn test_synthesized_poses_share_position() {
        let position = Vector3::new(1.0, 2.0, 3.0);
        for axis in UpAxis::PRIORITY {
            let poses =
                synthesize_face_poses(&position, &Matrix3::identity(), axis, &CubeFace::ALL)
                    .unwrap();
            assert_eq!(poses.len(), 6);
            for (_, pose) in &poses {
                assert_eq!(pose.position, position);
                assert!(is_proper_rotation(&pose.rotation, 1e-9));
            }
        }
    }

    #[test]
    fn test_invalid_base_rotation() {
        let scaled = Matrix3::identity() * 2.0;
        assert!(matches!(
            synthesize_face_poses(&Vector3::zeros(), &scaled, UpAxis::YUp, &CubeFace::ALL),
            Err(PoseError::InvalidBaseRotation(_))
        ));
    }
}
