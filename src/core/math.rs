//! Rotation utilities (matrix ↔ quaternion, orthonormality checks).

use nalgebra::{Matrix3, Quaternion, UnitQuaternion};

/// Convert a proper rotation matrix to a unit quaternion.
///
/// Uses the trace-based method: when the trace is positive the `w` component is
/// the largest and is solved first; otherwise the branch for the largest
/// diagonal element is taken, which keeps the divisor away from zero for
/// rotations near 180°.
///
/// The result is normalized and its sign is chosen so that `w >= 0`.
pub fn rotation_to_quaternion(r: &Matrix3<f64>) -> UnitQuaternion<f64> {
    let trace = r.trace();

    let (w, x, y, z) = if trace > 0.0 {
        let s = 0.5 / (trace + 1.0).sqrt();
        (
            0.25 / s,
            (r[(2, 1)] - r[(1, 2)]) * s,
            (r[(0, 2)] - r[(2, 0)]) * s,
            (r[(1, 0)] - r[(0, 1)]) * s,
        )
    } else if r[(0, 0)] > r[(1, 1)] && r[(0, 0)] > r[(2, 2)] {
        let s = 2.0 * (1.0 + r[(0, 0)] - r[(1, 1)] - r[(2, 2)]).sqrt();
        (
            (r[(2, 1)] - r[(1, 2)]) / s,
            0.25 * s,
            (r[(0, 1)] + r[(1, 0)]) / s,
            (r[(0, 2)] + r[(2, 0)]) / s,
        )
    } else if r[(1, 1)] > r[(2, 2)] {
        let s = 2.0 * (1.0 + r[(1, 1)] - r[(0, 0)] - r[(2, 2)]).sqrt();
        (
            (r[(0, 2)] - r[(2, 0)]) / s,
            (r[(0, 1)] + r[(1, 0)]) / s,
            0.25 * s,
            (r[(1, 2)] + r[(2, 1)]) / s,
        )
    } else {
        let s = 2.0 * (1.0 + r[(2, 2)] - r[(0, 0)] - r[(1, 1)]).sqrt();
        (
            (r[(1, 0)] - r[(0, 1)]) / s,
            (r[(0, 2)] + r[(2, 0)]) / s,
            (r[(1, 2)] + r[(2, 1)]) / s,
            0.25 * s,
        )
    };

    let q = Quaternion::new(w, x, y, z);
    let q = if q.w < 0.0 { -q } else { q };
    UnitQuaternion::new_normalize(q)
}

/// Convert a unit quaternion to a 3×3 rotation matrix.
///
/// R = | 1-2(y²+z²)   2(xy-wz)    2(xz+wy)  |
///     | 2(xy+wz)     1-2(x²+z²)  2(yz-wx)  |
///     | 2(xz-wy)     2(yz+wx)    1-2(x²+y²)|
pub fn quaternion_to_matrix(q: &UnitQuaternion<f64>) -> Matrix3<f64> {
    q.to_rotation_matrix().into_inner()
}

/// Largest deviation of `RᵀR` from the identity.
pub fn orthonormality_error(r: &Matrix3<f64>) -> f64 {
    (r.transpose() * r - Matrix3::identity()).abs().max()
}

/// True if `r` is orthonormal within `tol` and has determinant +1.
pub fn is_proper_rotation(r: &Matrix3<f64>, tol: f64) -> bool {
    orthonormality_error(r) <= tol && (r.determinant() - 1.0).abs() <= tol
}
