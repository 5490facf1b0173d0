//! Color normalization.

use serde::{Deserialize, Serialize};

/// Color used when no source provides one.
pub const FALLBACK_GRAY: [u8; 3] = [128, 128, 128];

/// Color attached to a source point.
///
/// Deserializes from an array of at least three components (`[r, g, b]` or
/// `[r, g, b, a]`), `{"r": .., "g": .., "b": ..}` or `null`. Arrays with fewer
/// than three components are `Missing`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "RawColor")]
pub enum ColorSource {
    Triple([f64; 3]),
    Channels { r: f64, g: f64, b: f64 },
    #[default]
    Missing,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawColor {
    Components(Vec<f64>),
    Channels { r: f64, g: f64, b: f64 },
    Missing,
}

impl From<RawColor> for ColorSource {
    fn from(raw: RawColor) -> Self {
        match raw {
            RawColor::Components(values) => ColorSource::from_components(&values),
            RawColor::Channels { r, g, b } => ColorSource::Channels { r, g, b },
            RawColor::Missing => ColorSource::Missing,
        }
    }
}

impl ColorSource {
    /// Take the first three components of `values`; fewer than three is `Missing`.
    pub fn from_components(values: &[f64]) -> Self {
        match values {
            [r, g, b, ..] => ColorSource::Triple([*r, *g, *b]),
            _ => ColorSource::Missing,
        }
    }

    /// 8-bit RGB, or `None` when the source is missing or not finite.
    pub fn resolve(&self) -> Option<[u8; 3]> {
        match *self {
            ColorSource::Triple(rgb) => normalize_rgb(rgb),
            ColorSource::Channels { r, g, b } => normalize_rgb([r, g, b]),
            ColorSource::Missing => None,
        }
    }
}

/// Scale a color to 0..255.
///
/// Colors whose largest channel is at most 1 are treated as unit range and
/// scaled by 255; colors up to 255 are taken as-is; anything larger is
/// rescaled so its largest channel becomes 255. Channels are truncated toward
/// zero and clamped.
pub fn normalize_rgb(rgb: [f64; 3]) -> Option<[u8; 3]> {
    if rgb.iter().any(|c| !c.is_finite()) {
        return None;
    }

    let max = rgb.iter().copied().fold(f64::MIN, f64::max);
    let scale = if max <= 1.0 {
        255.0
    } else if max <= 255.0 {
        1.0
    } else {
        255.0 / max
    };

    Some(rgb.map(|c| (c * scale).trunc().clamp(0.0, 255.0) as u8))
}
