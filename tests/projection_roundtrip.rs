//! Projection round trips: panorama -> cube faces -> panorama.
//!
//! The source is a smooth synthetic panorama whose color encodes the viewing
//! direction, so any misplaced sample shows up as a color error.

use cubemap_rs::core::CubeFace;
use cubemap_rs::projection::{
    cube_dice_layout, cube_face_remap, cube_strip, cubemap_to_equirect_remap,
    cubemap_to_equirect_remap_with_overlap, lon_lat_to_direction, perspective_remap, resample,
    ImageShape, Interpolation, RemapField,
};
use image::{Rgb, RgbImage};
use std::f64::consts::{FRAC_PI_2, PI};

/// Panorama where each pixel's color is 128 + 100 * (its sphere direction).
fn direction_panorama(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |col, row| {
        let lon = col as f64 / width as f64 * 2.0 * PI - PI;
        let lat = FRAC_PI_2 - row as f64 / height as f64 * PI;
        let d = lon_lat_to_direction(lon, lat);
        Rgb([d.x, d.y, d.z].map(|c| (128.0 + 100.0 * c).round() as u8))
    })
}

fn render_faces(pano: &RgbImage, face_size: u32, overlap: f64) -> Vec<RgbImage> {
    let shape = ImageShape::of(pano);
    CubeFace::ALL
        .iter()
        .map(|&face| {
            let field = cube_face_remap(shape, face, face_size, 90.0, overlap).unwrap();
            resample(pano, &field, Interpolation::Bilinear)
        })
        .collect()
}

fn max_channel_error(a: &RgbImage, b: &RgbImage, rows: std::ops::Range<u32>, cols: std::ops::Range<u32>) -> u8 {
    let mut worst = 0;
    for y in rows {
        for x in cols.clone() {
            let (pa, pb) = (a.get_pixel(x, y), b.get_pixel(x, y));
            for c in 0..3 {
                worst = worst.max(pa[c].abs_diff(pb[c]));
            }
        }
    }
    worst
}

#[test]
fn test_cube_roundtrip_reproduces_panorama() {
    let (w, h) = (512, 256);
    let pano = direction_panorama(w, h);
    let faces = render_faces(&pano, 128, 0.0);

    let strip = cube_strip(&faces).unwrap();
    let inverse = cubemap_to_equirect_remap(128, ImageShape::new(h, w)).unwrap();
    let back = resample(&strip, &inverse, Interpolation::Bilinear);

    assert_eq!(back.dimensions(), (w, h));
    // Skip the poles and the outermost seam columns.
    let error = max_channel_error(&pano, &back, 20..h - 20, 4..w - 4);
    assert!(error <= 6, "round-trip error {}", error);
}

#[test]
fn test_cube_roundtrip_with_overlap() {
    let (w, h) = (512, 256);
    let pano = direction_panorama(w, h);
    let faces = render_faces(&pano, 160, 10.0);

    let strip = cube_strip(&faces).unwrap();
    let inverse = cubemap_to_equirect_remap_with_overlap(160, ImageShape::new(h, w), 10.0).unwrap();
    let back = resample(&strip, &inverse, Interpolation::Bilinear);

    let error = max_channel_error(&pano, &back, 20..h - 20, 4..w - 4);
    assert!(error <= 6, "round-trip error {}", error);
}

#[test]
fn test_face_centres_see_their_direction() {
    let pano = direction_panorama(512, 256);
    let faces = render_faces(&pano, 64, 10.0);
    for face in CubeFace::ALL {
        let expected = face.forward().map(|c| (128.0 + 100.0 * c).round() as i32);
        let centre = faces[face.index()].get_pixel(32, 32);
        for c in 0..3 {
            let diff = (centre[c] as i32 - expected[c]).abs();
            assert!(diff <= 3, "{} channel {}: {} vs {}", face, c, centre[c], expected[c]);
        }
    }
}

#[test]
fn test_remap_fields_are_deterministic() {
    let shape = ImageShape::new(1000, 2000);
    for face in CubeFace::ALL {
        let a = cube_face_remap(shape, face, 96, 90.0, 10.0).unwrap();
        let b = cube_face_remap(shape, face, 96, 90.0, 10.0).unwrap();
        assert!(a.bit_eq(&b), "{} differs between runs", face);
    }
    let a = perspective_remap(shape, 90.0, 45.0, 30.0, 80, 120, 10.0).unwrap();
    let b = perspective_remap(shape, 90.0, 45.0, 30.0, 80, 120, 10.0).unwrap();
    assert!(a.bit_eq(&b));
}

fn wrapped_distance(a: f32, b: f32, width: f32) -> f32 {
    let d = (a - b).abs() % width;
    d.min(width - d)
}

#[test]
fn test_dice_tiles_meet_at_shared_edges() {
    let shape = ImageShape::new(256, 512);
    let s = 64;
    let fields: Vec<RemapField> = CubeFace::ALL
        .iter()
        .map(|&f| cube_face_remap(shape, f, s, 90.0, 0.0).unwrap())
        .collect();
    let dice = cube_dice_layout(&fields, s).unwrap();

    // Top tile bottom row sits above the front tile top row.
    for col in [s + 5, s + 32, s + 60] {
        let (tx, ty) = dice.get(col, s - 1);
        let (fx, fy) = dice.get(col, s);
        assert!(wrapped_distance(tx, fx, 512.0) < 2.0, "col {}: x {} vs {}", col, tx, fx);
        assert!((ty - fy).abs() < 2.0, "col {}: y {} vs {}", col, ty, fy);
    }

    // Front tile right column continues into the right tile.
    for row in [s + 10, s + 32, s + 50] {
        let (ax, ay) = dice.get(2 * s - 1, row);
        let (bx, by) = dice.get(2 * s, row);
        assert!(wrapped_distance(ax, bx, 512.0) < 2.0);
        assert!((ay - by).abs() < 2.0);
    }

    // Back tile right column wraps around to the left tile.
    for row in [s + 10, s + 50] {
        let (ax, ay) = dice.get(4 * s - 1, row);
        let (bx, by) = dice.get(0, row);
        assert!(wrapped_distance(ax, bx, 512.0) < 2.0);
        assert!((ay - by).abs() < 2.0);
    }
}
