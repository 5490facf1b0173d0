//! World up-axis conventions and their detection.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of orientations inspected by [`detect_up_axis`] by default.
pub const DEFAULT_UP_AXIS_SAMPLES: usize = 5;

/// Which world axis points up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpAxis {
    #[default]
    #[serde(rename = "Y_UP")]
    YUp,
    #[serde(rename = "Z_UP")]
    ZUp,
    #[serde(rename = "X_UP")]
    XUp,
}

impl UpAxis {
    /// Tie-break order: Y, then Z, then X.
    pub const PRIORITY: [UpAxis; 3] = [UpAxis::YUp, UpAxis::ZUp, UpAxis::XUp];

    pub fn tag(self) -> &'static str {
        match self {
            UpAxis::YUp => "Y_UP",
            UpAxis::ZUp => "Z_UP",
            UpAxis::XUp => "X_UP",
        }
    }

    /// Parse a tag, falling back to [`UpAxis::YUp`] with a warning.
    pub fn from_tag(tag: &str) -> UpAxis {
        tag.parse().unwrap_or_else(|e: UnknownUpAxis| {
            log::warn!("{}, using Y_UP", e);
            UpAxis::YUp
        })
    }

    fn slot(self) -> usize {
        match self {
            UpAxis::YUp => 0,
            UpAxis::ZUp => 1,
            UpAxis::XUp => 2,
        }
    }

    /// Component of `v` along this axis.
    fn component(self, v: &Vector3<f64>) -> f64 {
        match self {
            UpAxis::YUp => v.y,
            UpAxis::ZUp => v.z,
            UpAxis::XUp => v.x,
        }
    }
}

impl fmt::Display for UpAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown up-axis tag: {0:?}")]
pub struct UnknownUpAxis(pub String);

impl FromStr for UpAxis {
    type Err = UnknownUpAxis;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "Y_UP" | "Y" => Ok(UpAxis::YUp),
            "Z_UP" | "Z" => Ok(UpAxis::ZUp),
            "X_UP" | "X" => Ok(UpAxis::XUp),
            _ => Err(UnknownUpAxis(s.to_string())),
        }
    }
}

/// Result of [`detect_up_axis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpAxisEstimate {
    pub axis: UpAxis,
    /// Votes per axis, indexed Y, Z, X
    pub votes: [usize; 3],
    pub samples: usize,
}

impl UpAxisEstimate {
    /// Fraction of samples that voted for the winning axis (0 with no samples).
    pub fn confidence(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        self.votes[self.axis.slot()] as f64 / self.samples as f64
    }
}

/// Guess the world up axis from camera orientations.
///
/// Each of the first `max_samples` orientations rotates the local up vector
/// (0, 1, 0); the world axis whose absolute component is strictly the largest
/// gets a vote. A sample with a tie for the largest component casts no vote
/// but still counts as a sample. Ties in the final count go to Y, then Z,
/// then X. With no orientations (or no votes) the result is Y_UP.
pub fn detect_up_axis(orientations: &[Matrix3<f64>], max_samples: usize) -> UpAxisEstimate {
    let mut votes = [0usize; 3];
    let mut samples = 0;

    for rotation in orientations.iter().take(max_samples) {
        let up = rotation * Vector3::y();
        let dominant = UpAxis::PRIORITY.into_iter().find(|&axis| {
            UpAxis::PRIORITY
                .into_iter()
                .filter(|&other| other != axis)
                .all(|other| axis.component(&up).abs() > other.component(&up).abs())
        });
        if let Some(axis) = dominant {
            votes[axis.slot()] += 1;
        }
        samples += 1;
    }

    let mut axis = UpAxis::YUp;
    for candidate in UpAxis::PRIORITY {
        if votes[candidate.slot()] > votes[axis.slot()] {
            axis = candidate;
        }
    }

    UpAxisEstimate {
        axis,
        votes,
        samples,
    }
}
