//! Face direction tables for each up-axis convention.

use super::up_axis::UpAxis;
use crate::core::CubeFace;
use nalgebra::{Matrix3, Vector3};

/// Forward and up vector of one face in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDirection {
    pub forward: Vector3<f64>,
    pub up: Vector3<f64>,
}

/// Directions of all six faces under one up-axis convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDirections {
    pub axis: UpAxis,
    entries: [FaceDirection; 6],
}

impl FaceDirections {
    pub fn get(&self, face: CubeFace) -> FaceDirection {
        self.entries[face.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (CubeFace, FaceDirection)> + '_ {
        CubeFace::ALL.iter().map(move |&face| (face, self.get(face)))
    }
}

fn dir(f: [f64; 3], u: [f64; 3]) -> FaceDirection {
    FaceDirection {
        forward: Vector3::new(f[0], f[1], f[2]),
        up: Vector3::new(u[0], u[1], u[2]),
    }
}

// Entries follow CubeFace::ALL: front, right, left, top, down, back.
// Every table is a proper rotation of the sphere frame, so `forward × up`
// always points to the right edge of the rendered face.
fn y_up() -> [FaceDirection; 6] {
    [
        dir([0.0, 0.0, 1.0], [0.0, -1.0, 0.0]),
        dir([1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
        dir([-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
        dir([0.0, -1.0, 0.0], [0.0, 0.0, -1.0]),
        dir([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        dir([0.0, 0.0, -1.0], [0.0, -1.0, 0.0]),
    ]
}

fn z_up() -> [FaceDirection; 6] {
    [
        dir([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        dir([0.0, -1.0, 0.0], [0.0, 0.0, 1.0]),
        dir([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        dir([0.0, 0.0, 1.0], [-1.0, 0.0, 0.0]),
        dir([0.0, 0.0, -1.0], [1.0, 0.0, 0.0]),
        dir([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ]
}

fn x_up() -> [FaceDirection; 6] {
    [
        dir([0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
        dir([0.0, 0.0, -1.0], [1.0, 0.0, 0.0]),
        dir([0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
        dir([1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
        dir([-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        dir([0.0, -1.0, 0.0], [1.0, 0.0, 0.0]),
    ]
}

/// Face directions for `axis`.
pub fn face_directions(axis: UpAxis) -> FaceDirections {
    let entries = match axis {
        UpAxis::YUp => y_up(),
        UpAxis::ZUp => z_up(),
        UpAxis::XUp => x_up(),
    };
    FaceDirections { axis, entries }
}

/// Rotation taking sphere-frame directions into the panorama frame of `axis`.
///
/// A pixel that samples sphere direction `d` is seen by the face camera
/// along `sphere_to_local(axis) * d`. Identity for Y_UP.
pub fn sphere_to_local(axis: UpAxis) -> Matrix3<f64> {
    let front = face_directions(axis).get(CubeFace::Front);
    let local = Matrix3::from_columns(&[
        front.forward.cross(&front.up),
        -front.up,
        front.forward,
    ]);
    let face = CubeFace::Front;
    let sphere = Matrix3::from_columns(&[face.right(), -face.up(), face.forward()]);
    local * sphere.transpose()
}
