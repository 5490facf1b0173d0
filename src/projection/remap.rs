//! Remap field builders.
//!
//! A [`RemapField`] stores, for every output pixel, the (x, y) coordinate in the
//! source image to sample from. Building one is pure: equal inputs produce
//! bit-identical fields.
//!
//! Two coordinate conventions are used:
//! - the cube-face path works in the y-down sphere frame of [`CubeFace`],
//!   with longitude `atan2(x, z)` and latitude `asin(-y)`
//! - the Euler path works in a Z-up frame with x forward and y right, as used
//!   for arbitrary (yaw, pitch) perspective extraction

use super::ProjectionError;
use crate::core::CubeFace;
use nalgebra::{Rotation3, Unit, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Default angular widening of each face, in degrees.
pub const DEFAULT_OVERLAP_DEG: f64 = 10.0;

/// Largest accepted overlap, in degrees.
pub const MAX_OVERLAP_DEG: f64 = 20.0;

/// Height and width of an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageShape {
    pub height: u32,
    pub width: u32,
}

impl ImageShape {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    pub fn of(image: &image::RgbImage) -> Self {
        Self::new(image.height(), image.width())
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn check(self, what: &'static str) -> Result<Self, ProjectionError> {
        if self.is_empty() {
            return Err(ProjectionError::EmptyShape {
                what,
                width: self.width,
                height: self.height,
            });
        }
        Ok(self)
    }
}

/// Which construction is used for cube faces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMethod {
    /// Rays built straight from the face's forward/up/right vectors.
    #[default]
    Direct,
    /// Rays rotated by the face's (yaw, pitch) via [`perspective_remap`].
    Euler,
}

/// Per-pixel source coordinates, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RemapField {
    pub width: u32,
    pub height: u32,
    pub map_x: Vec<f32>,
    pub map_y: Vec<f32>,
}

impl RemapField {
    /// Build a field by evaluating `f(row, col)` for every output pixel.
    ///
    /// Rows are evaluated in parallel; the result does not depend on scheduling.
    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
    where
        F: Fn(u32, u32) -> (f32, f32) + Sync,
    {
        let coords: Vec<(f32, f32)> = (0..height)
            .into_par_iter()
            .flat_map_iter(|row| (0..width).map(move |col| (row, col)))
            .map(|(row, col)| f(row, col))
            .collect();
        let (map_x, map_y) = coords.into_iter().unzip();

        Self {
            width,
            height,
            map_x,
            map_y,
        }
    }

    /// Source coordinate for output pixel (`col`, `row`).
    #[inline]
    pub fn get(&self, col: u32, row: u32) -> (f32, f32) {
        let i = row as usize * self.width as usize + col as usize;
        (self.map_x[i], self.map_y[i])
    }

    pub fn len(&self) -> usize {
        self.map_x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map_x.is_empty()
    }

    /// Bitwise equality, treating identical NaN payloads as equal.
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self
                .map_x
                .iter()
                .zip(&other.map_x)
                .all(|(a, b)| a.to_bits() == b.to_bits())
            && self
                .map_y
                .iter()
                .zip(&other.map_y)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

fn check_overlap(overlap_deg: f64) -> Result<(), ProjectionError> {
    if !(0.0..=MAX_OVERLAP_DEG).contains(&overlap_deg) {
        return Err(ProjectionError::InvalidOverlap(overlap_deg));
    }
    Ok(())
}

fn check_fov(fov_deg: f64) -> Result<(), ProjectionError> {
    if !(fov_deg > 0.0 && fov_deg < 180.0) {
        return Err(ProjectionError::InvalidFov(fov_deg));
    }
    Ok(())
}

/// Longitude of the ray (x forward, y right) in (-π, π].
///
/// Quadrant-corrected unwrap of `atan(y / x)`:
/// - x > 0: `atan(y/x)`
/// - x < 0, y >= 0: `atan(y/x) + π`
/// - x < 0, y < 0: `atan(y/x) - π`
/// - x == 0: `±π/2` by the sign of y (0 when y is also 0)
pub fn unwrap_longitude(x: f64, y: f64) -> f64 {
    if x > 0.0 {
        (y / x).atan()
    } else if x < 0.0 {
        if y >= 0.0 {
            (y / x).atan() + PI
        } else {
            (y / x).atan() - PI
        }
    } else if y > 0.0 {
        FRAC_PI_2
    } else if y < 0.0 {
        -FRAC_PI_2
    } else {
        0.0
    }
}

/// Remap for a perspective view looking at (`yaw`, `pitch`) degrees.
///
/// The horizontal FOV is widened by `overlap_deg`; the vertical FOV follows
/// the target aspect ratio. Rays are rotated by yaw about Z, then by `-pitch`
/// about the yaw-rotated Y axis.
pub fn perspective_remap(
    src: ImageShape,
    fov_deg: f64,
    yaw_deg: f64,
    pitch_deg: f64,
    target_h: u32,
    target_w: u32,
    overlap_deg: f64,
) -> Result<RemapField, ProjectionError> {
    src.check("source image")?;
    ImageShape::new(target_h, target_w).check("target view")?;
    check_overlap(overlap_deg)?;

    let w_fov = fov_deg + overlap_deg;
    let h_fov = target_h as f64 / target_w as f64 * w_fov;
    check_fov(w_fov)?;
    check_fov(h_fov)?;

    let c_x = target_w as f64 / 2.0;
    let c_y = target_h as f64 / 2.0;
    let w_step = 2.0 * (w_fov.to_radians() / 2.0).tan() / target_w as f64;
    let h_step = 2.0 * (h_fov.to_radians() / 2.0).tan() / target_h as f64;

    let yaw = Rotation3::from_axis_angle(&Vector3::z_axis(), yaw_deg.to_radians());
    let pitch_axis = Unit::new_normalize(yaw * Vector3::y());
    let pitch = Rotation3::from_axis_angle(&pitch_axis, -pitch_deg.to_radians());
    let rotation = pitch * yaw;

    let equ_cx = src.width as f64 / 2.0;
    let equ_cy = src.height as f64 / 2.0;

    Ok(RemapField::from_fn(target_w, target_h, |row, col| {
        let ray = Vector3::new(
            1.0,
            (col as f64 - c_x) * w_step,
            -(row as f64 - c_y) * h_step,
        )
        .normalize();
        let d = rotation * ray;

        let lat = d.z.clamp(-1.0, 1.0).asin();
        let lon = unwrap_longitude(d.x, d.y);

        let x = lon / PI * equ_cx + equ_cx;
        let y = -lat / FRAC_PI_2 * equ_cy + equ_cy;
        (x as f32, y as f32)
    }))
}

/// (longitude, latitude) in radians of a unit direction in the sphere frame.
pub fn direction_to_lon_lat(d: &Vector3<f64>) -> (f64, f64) {
    (d.x.atan2(d.z), (-d.y).clamp(-1.0, 1.0).asin())
}

/// Unit direction in the sphere frame for a (longitude, latitude) in radians.
pub fn lon_lat_to_direction(lon: f64, lat: f64) -> Vector3<f64> {
    Vector3::new(lat.cos() * lon.sin(), -lat.sin(), lat.cos() * lon.cos())
}

/// Remap for one cube face, built from the face's orientation vectors.
pub fn cube_face_remap(
    src: ImageShape,
    face: CubeFace,
    face_size: u32,
    fov_deg: f64,
    overlap_deg: f64,
) -> Result<RemapField, ProjectionError> {
    src.check("source image")?;
    ImageShape::new(face_size, face_size).check("cube face")?;
    check_overlap(overlap_deg)?;
    let effective = fov_deg + overlap_deg;
    check_fov(effective)?;

    let scale = (effective.to_radians() / 2.0).tan();
    let half = face_size as f64 / 2.0;
    let (forward, up, right) = (face.forward(), face.up(), face.right());
    let (w, h) = (src.width as f64, src.height as f64);

    Ok(RemapField::from_fn(face_size, face_size, |row, col| {
        let x_n = (col as f64 - half) / half * scale;
        let y_n = -(row as f64 - half) / half * scale;
        let d = (forward + right * x_n + up * y_n).normalize();

        let (lon, lat) = direction_to_lon_lat(&d);

        let x = ((lon + PI) / (2.0 * PI) * w).rem_euclid(w);
        let y = ((FRAC_PI_2 - lat) / PI * h).clamp(0.0, h - 1.0);
        (x as f32, y as f32)
    }))
}

/// Remap for one cube face using the chosen construction (90° base FOV).
pub fn cube_face_field(
    src: ImageShape,
    face: CubeFace,
    face_size: u32,
    overlap_deg: f64,
    method: ProjectionMethod,
) -> Result<RemapField, ProjectionError> {
    match method {
        ProjectionMethod::Direct => cube_face_remap(src, face, face_size, 90.0, overlap_deg),
        ProjectionMethod::Euler => {
            let (yaw, pitch) = face.yaw_pitch();
            perspective_remap(src, 90.0, yaw, pitch, face_size, face_size, overlap_deg)
        }
    }
}

/// Tile position (row, col) of each face in the 3×4 horizontal cross.
fn dice_tile(face: CubeFace) -> (u32, u32) {
    match face {
        CubeFace::Top => (0, 1),
        CubeFace::Left => (1, 0),
        CubeFace::Front => (1, 1),
        CubeFace::Right => (1, 2),
        CubeFace::Back => (1, 3),
        CubeFace::Down => (2, 1),
    }
}

/// Combine six per-face fields (in [`CubeFace::ALL`] order) into a
/// `3s × 4s` horizontal-cross field.
///
/// Tiles not covered by a face hold NaN coordinates, which the resampler
/// renders as black.
pub fn cube_dice_layout(fields: &[RemapField], face_size: u32) -> Result<RemapField, ProjectionError> {
    ImageShape::new(face_size, face_size).check("cube face")?;
    let tile_ok = |f: &RemapField| f.width == face_size && f.height == face_size;
    if fields.len() != CubeFace::ALL.len() || !fields.iter().all(tile_ok) {
        return Err(ProjectionError::FaceCount {
            expected: CubeFace::ALL.len(),
            got: fields.iter().filter(|f| tile_ok(f)).count(),
            size: face_size,
        });
    }

    let width = face_size * 4;
    let height = face_size * 3;
    let mut dice = RemapField {
        width,
        height,
        map_x: vec![f32::NAN; width as usize * height as usize],
        map_y: vec![f32::NAN; width as usize * height as usize],
    };

    for face in CubeFace::ALL {
        let field = &fields[face.index()];
        let (tile_row, tile_col) = dice_tile(face);
        for row in 0..face_size {
            let src = row as usize * face_size as usize;
            let dst = (tile_row * face_size + row) as usize * width as usize
                + (tile_col * face_size) as usize;
            let n = face_size as usize;
            dice.map_x[dst..dst + n].copy_from_slice(&field.map_x[src..src + n]);
            dice.map_y[dst..dst + n].copy_from_slice(&field.map_y[src..src + n]);
        }
    }

    Ok(dice)
}

/// Inverse remap: equirectangular output sampled from a six-face strip.
///
/// See [`cubemap_to_equirect_remap_with_overlap`]; faces are assumed to
/// cover exactly 90°.
pub fn cubemap_to_equirect_remap(
    face_size: u32,
    out: ImageShape,
) -> Result<RemapField, ProjectionError> {
    cubemap_to_equirect_remap_with_overlap(face_size, out, 0.0)
}

/// Inverse remap for faces rendered with `overlap_deg` of widening.
///
/// The source is a horizontal strip of the six faces in [`CubeFace::ALL`]
/// order (see [`super::cube_strip`]), so face `i` occupies columns
/// `[i*s, (i+1)*s)`.
pub fn cubemap_to_equirect_remap_with_overlap(
    face_size: u32,
    out: ImageShape,
    overlap_deg: f64,
) -> Result<RemapField, ProjectionError> {
    ImageShape::new(face_size, face_size).check("cube face")?;
    out.check("equirectangular output")?;
    check_overlap(overlap_deg)?;

    let scale = ((90.0 + overlap_deg).to_radians() / 2.0).tan();
    let half = face_size as f64 / 2.0;
    let max = face_size as f64 - 1.0;
    let (w, h) = (out.width as f64, out.height as f64);

    Ok(RemapField::from_fn(out.width, out.height, |row, col| {
        let lon = col as f64 / w * 2.0 * PI - PI;
        let lat = FRAC_PI_2 - row as f64 / h * PI;

        let (face, center) = side_face(lon);
        let face = if lat.abs().tan() > (lon - center).cos() {
            if lat > 0.0 {
                CubeFace::Top
            } else {
                CubeFace::Down
            }
        } else {
            face
        };

        let d = lon_lat_to_direction(lon, lat);
        let depth = d.dot(&face.forward());
        let a = d.dot(&face.right()) / depth / scale;
        let b = d.dot(&face.up()) / depth / scale;

        let x = (half * (a + 1.0)).clamp(0.0, max);
        let y = (half * (1.0 - b)).clamp(0.0, max);
        let offset = (face.index() as u32 * face_size) as f64;
        ((offset + x) as f32, y as f32)
    }))
}

/// Side face whose longitude band contains `lon`, with the band centre.
fn side_face(lon: f64) -> (CubeFace, f64) {
    let shifted = (lon + FRAC_PI_4).rem_euclid(2.0 * PI);
    match (shifted / FRAC_PI_2) as u32 {
        0 => (CubeFace::Front, 0.0),
        1 => (CubeFace::Right, FRAC_PI_2),
        2 => (CubeFace::Back, PI),
        _ => (CubeFace::Left, -FRAC_PI_2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SRC: ImageShape = ImageShape {
        height: 200,
        width: 400,
    };

    #[test]
    fn test_unwrap_matches_atan2() {
        let samples = [
            (1.0, 0.5),
            (1.0, -0.5),
            (-1.0, 0.5),
            (-1.0, -0.5),
            (-1.0, 0.0),
            (0.0, 2.0),
            (0.0, -2.0),
            (0.3, 0.0),
        ];
        for (x, y) in samples {
            assert_relative_eq!(unwrap_longitude(x, y), y.atan2(x), epsilon = 1e-12);
        }
        assert_eq!(unwrap_longitude(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_front_face_centre_samples_image_centre() {
        let field = cube_face_remap(SRC, CubeFace::Front, 64, 90.0, 0.0).unwrap();
        let (x, y) = field.get(32, 32);
        assert_relative_eq!(x, 200.0, epsilon = 1e-3);
        assert_relative_eq!(y, 100.0, epsilon = 1e-3);
    }

    #[test]
    fn test_face_centres_follow_longitude() {
        // Right face looks at +90° longitude, left at -90°, back straddles the seam.
        let centre = |face| {
            cube_face_remap(SRC, face, 64, 90.0, 0.0)
                .unwrap()
                .get(32, 32)
        };
        assert_relative_eq!(centre(CubeFace::Right).0, 300.0, epsilon = 1e-3);
        assert_relative_eq!(centre(CubeFace::Left).0, 100.0, epsilon = 1e-3);
        let back = centre(CubeFace::Back).0;
        assert!(back < 1e-3 || back > 399.9, "back centre at {}", back);
        assert_relative_eq!(centre(CubeFace::Top).1, 0.0, epsilon = 1e-3);
        assert_relative_eq!(centre(CubeFace::Down).1, 199.0, epsilon = 1e-3);
    }

    #[test]
    fn test_coordinates_stay_in_range() {
        for face in CubeFace::ALL {
            let field = cube_face_remap(SRC, face, 32, 90.0, 20.0).unwrap();
            for (&x, &y) in field.map_x.iter().zip(&field.map_y) {
                assert!((0.0..=400.0).contains(&x), "{} x={}", face, x);
                assert!((0.0..=199.0).contains(&y), "{} y={}", face, y);
            }
        }
    }

    #[test]
    fn test_euler_path_agrees_with_direct_path_at_centre() {
        for face in [CubeFace::Front, CubeFace::Right, CubeFace::Left] {
            let direct = cube_face_field(SRC, face, 64, 10.0, ProjectionMethod::Direct).unwrap();
            let euler = cube_face_field(SRC, face, 64, 10.0, ProjectionMethod::Euler).unwrap();
            let (dx, dy) = direct.get(32, 32);
            let (ex, ey) = euler.get(32, 32);
            assert_relative_eq!(dx, ex, epsilon = 1e-2);
            assert_relative_eq!(dy, ey, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_perspective_pitch_up_looks_north() {
        let field = perspective_remap(SRC, 60.0, 0.0, 60.0, 32, 32, 0.0).unwrap();
        let (_, y) = field.get(16, 16);
        // Latitude 60° maps to row H/2 - 60/90 * H/2.
        assert_relative_eq!(y, 100.0 - 60.0 / 90.0 * 100.0, epsilon = 0.5);
    }

    #[test]
    fn test_fields_are_bit_identical() {
        let a = cube_face_remap(SRC, CubeFace::Top, 48, 90.0, 10.0).unwrap();
        let b = cube_face_remap(SRC, CubeFace::Top, 48, 90.0, 10.0).unwrap();
        assert!(a.bit_eq(&b));
        assert_eq!(a, b);

        let p = perspective_remap(SRC, 70.0, 33.0, -12.0, 40, 60, 5.0).unwrap();
        let q = perspective_remap(SRC, 70.0, 33.0, -12.0, 40, 60, 5.0).unwrap();
        assert!(p.bit_eq(&q));
    }

    #[test]
    fn test_invalid_arguments() {
        let empty = ImageShape::new(0, 400);
        assert!(matches!(
            cube_face_remap(empty, CubeFace::Front, 32, 90.0, 10.0),
            Err(ProjectionError::EmptyShape { .. })
        ));
        assert!(matches!(
            cube_face_remap(SRC, CubeFace::Front, 0, 90.0, 10.0),
            Err(ProjectionError::EmptyShape { .. })
        ));
        assert!(matches!(
            cube_face_remap(SRC, CubeFace::Front, 32, 90.0, 25.0),
            Err(ProjectionError::InvalidOverlap(_))
        ));
        assert!(matches!(
            perspective_remap(SRC, 175.0, 0.0, 0.0, 32, 32, 10.0),
            Err(ProjectionError::InvalidFov(_))
        ));
    }

    #[test]
    fn test_dice_layout_shape_and_empty_tiles() {
        let fields: Vec<_> = CubeFace::ALL
            .iter()
            .map(|&f| cube_face_remap(SRC, f, 16, 90.0, 0.0).unwrap())
            .collect();
        let dice = cube_dice_layout(&fields, 16).unwrap();
        assert_eq!((dice.width, dice.height), (64, 48));
        // Top-left tile is unused.
        assert!(dice.get(0, 0).0.is_nan());
        // Front tile copies the front field.
        assert_eq!(dice.get(16 + 5, 16 + 7), fields[0].get(5, 7));

        assert!(matches!(
            cube_dice_layout(&fields[..5], 16),
            Err(ProjectionError::FaceCount { .. })
        ));
    }

    #[test]
    fn test_inverse_band_selection() {
        assert_eq!(side_face(0.0).0, CubeFace::Front);
        assert_eq!(side_face(FRAC_PI_2).0, CubeFace::Right);
        assert_eq!(side_face(-FRAC_PI_2).0, CubeFace::Left);
        assert_eq!(side_face(PI - 0.1).0, CubeFace::Back);
        assert_eq!(side_face(-PI + 0.1).0, CubeFace::Back);
    }

    #[test]
    fn test_inverse_centre_hits_front_tile_centre() {
        let field = cubemap_to_equirect_remap(64, ImageShape::new(100, 200)).unwrap();
        // Output column 100 is longitude 0, row 50 is the equator.
        let (x, y) = field.get(100, 50);
        assert_relative_eq!(x, 32.0, epsilon = 1e-3);
        assert_relative_eq!(y, 32.0, epsilon = 1e-3);
        // Top row lands on the top tile.
        let (x, _) = field.get(100, 0);
        let top = CubeFace::Top.index() as f32 * 64.0;
        assert!((top..top + 64.0).contains(&x));
    }
}
