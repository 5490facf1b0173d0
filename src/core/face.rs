//! Cube faces and their canonical orientation in the sphere frame.
//!
//! The sphere frame is the panorama's own camera frame: x right, y down and
//! z towards the centre column. It is right-handed, so a face's image-right
//! is `forward × up`. Longitude is `atan2(x, z)` and latitude is `asin(-y)`.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the six faces of a cubemap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CubeFace {
    Front,
    Right,
    Left,
    Top,
    Down,
    Back,
}

impl CubeFace {
    /// All faces in canonical order (also the order used for file naming and strips).
    pub const ALL: [CubeFace; 6] = [
        CubeFace::Front,
        CubeFace::Right,
        CubeFace::Left,
        CubeFace::Top,
        CubeFace::Down,
        CubeFace::Back,
    ];

    /// Lowercase name used in output file names (`<label>_<name>.<ext>`).
    pub fn name(self) -> &'static str {
        match self {
            CubeFace::Front => "front",
            CubeFace::Right => "right",
            CubeFace::Left => "left",
            CubeFace::Top => "top",
            CubeFace::Down => "down",
            CubeFace::Back => "back",
        }
    }

    /// Position of this face in [`CubeFace::ALL`].
    pub fn index(self) -> usize {
        match self {
            CubeFace::Front => 0,
            CubeFace::Right => 1,
            CubeFace::Left => 2,
            CubeFace::Top => 3,
            CubeFace::Down => 4,
            CubeFace::Back => 5,
        }
    }

    /// Viewing direction of the face centre.
    pub fn forward(self) -> Vector3<f64> {
        match self {
            CubeFace::Front => Vector3::new(0.0, 0.0, 1.0),
            CubeFace::Back => Vector3::new(0.0, 0.0, -1.0),
            CubeFace::Right => Vector3::new(1.0, 0.0, 0.0),
            CubeFace::Left => Vector3::new(-1.0, 0.0, 0.0),
            CubeFace::Top => Vector3::new(0.0, -1.0, 0.0),
            CubeFace::Down => Vector3::new(0.0, 1.0, 0.0),
        }
    }

    /// Direction of the top edge of the face image.
    pub fn up(self) -> Vector3<f64> {
        match self {
            CubeFace::Front | CubeFace::Back | CubeFace::Right | CubeFace::Left => {
                Vector3::new(0.0, -1.0, 0.0)
            }
            CubeFace::Top => Vector3::new(0.0, 0.0, -1.0),
            CubeFace::Down => Vector3::new(0.0, 0.0, 1.0),
        }
    }

    /// Direction of the right edge of the face image (`forward × up`).
    pub fn right(self) -> Vector3<f64> {
        match self {
            CubeFace::Front | CubeFace::Top | CubeFace::Down => Vector3::new(1.0, 0.0, 0.0),
            CubeFace::Back => Vector3::new(-1.0, 0.0, 0.0),
            CubeFace::Right => Vector3::new(0.0, 0.0, -1.0),
            CubeFace::Left => Vector3::new(0.0, 0.0, 1.0),
        }
    }

    /// (yaw, pitch) in degrees for the Euler-angle perspective path.
    pub fn yaw_pitch(self) -> (f64, f64) {
        match self {
            CubeFace::Front => (0.0, 0.0),
            CubeFace::Right => (90.0, 0.0),
            CubeFace::Left => (-90.0, 0.0),
            CubeFace::Top => (0.0, 90.0),
            CubeFace::Down => (0.0, -90.0),
            CubeFace::Back => (180.0, 0.0),
        }
    }
}

impl fmt::Display for CubeFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown face name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cube face: {0}")]
pub struct UnknownFace(pub String);

impl FromStr for CubeFace {
    type Err = UnknownFace;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "front" => Ok(CubeFace::Front),
            "right" => Ok(CubeFace::Right),
            "left" => Ok(CubeFace::Left),
            "top" | "up" => Ok(CubeFace::Top),
            "down" | "bottom" => Ok(CubeFace::Down),
            "back" => Ok(CubeFace::Back),
            _ => Err(UnknownFace(s.to_string())),
        }
    }
}
