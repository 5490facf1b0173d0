//! Continuity check along the twelve shared edges of a rendered cube.

use super::sample::{sample, Interpolation};
use crate::core::CubeFace;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Face pairs sharing a cube edge.
pub const CUBE_EDGES: [(CubeFace, CubeFace); 12] = [
    (CubeFace::Front, CubeFace::Right),
    (CubeFace::Front, CubeFace::Left),
    (CubeFace::Front, CubeFace::Top),
    (CubeFace::Front, CubeFace::Down),
    (CubeFace::Back, CubeFace::Right),
    (CubeFace::Back, CubeFace::Left),
    (CubeFace::Back, CubeFace::Top),
    (CubeFace::Back, CubeFace::Down),
    (CubeFace::Right, CubeFace::Top),
    (CubeFace::Right, CubeFace::Down),
    (CubeFace::Left, CubeFace::Top),
    (CubeFace::Left, CubeFace::Down),
];

/// Settings of the edge continuity check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeCheck {
    /// Pairs below this similarity make the cube non-seamless
    pub tolerance: f64,

    /// Points compared along each edge
    pub samples: u32,
}

impl Default for EdgeCheck {
    fn default() -> Self {
        Self {
            tolerance: 0.8,
            samples: 64,
        }
    }
}

/// Similarity of one face pair along its shared edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeMetric {
    pub faces: (CubeFace, CubeFace),
    /// `1 - mse / 255²`, 1.0 for identical edges
    pub similarity: f64,
}

/// Result of checking every edge whose two faces were rendered.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EdgeReport {
    pub metrics: Vec<EdgeMetric>,
    pub seamless: bool,
}

impl EdgeReport {
    pub fn worst(&self) -> Option<&EdgeMetric> {
        self.metrics
            .iter()
            .min_by(|a, b| a.similarity.total_cmp(&b.similarity))
    }
}

impl EdgeCheck {
    /// Compare the faces in `faces` along their shared cube edges.
    ///
    /// Points on an edge are projected into both faces with the same pinhole
    /// geometry used to render them (`fov_deg` including overlap), so faces
    /// rendered with overlap are compared at the true edge, not at their
    /// image borders.
    pub fn verify(&self, faces: &[(CubeFace, &RgbImage)], fov_deg: f64) -> EdgeReport {
        let scale = (fov_deg.to_radians() / 2.0).tan();
        let find = |face: CubeFace| faces.iter().find(|(f, _)| *f == face).map(|(_, img)| *img);

        let mut report = EdgeReport {
            metrics: Vec::new(),
            seamless: true,
        };
        for (a, b) in CUBE_EDGES {
            let (Some(img_a), Some(img_b)) = (find(a), find(b)) else {
                continue;
            };
            let similarity = self.edge_similarity((a, img_a), (b, img_b), scale);
            if similarity < self.tolerance {
                report.seamless = false;
            }
            report.metrics.push(EdgeMetric {
                faces: (a, b),
                similarity,
            });
        }
        report
    }

    fn edge_similarity(&self, a: (CubeFace, &RgbImage), b: (CubeFace, &RgbImage), scale: f64) -> f64 {
        let n = self.samples.max(1);
        let corner = a.0.forward() + b.0.forward();
        let along = a.0.forward().cross(&b.0.forward());

        let mut sum = 0.0;
        let mut count = 0usize;
        for i in 0..n {
            // Stay clear of the cube corners.
            let t = -0.9 + 1.8 * (i as f64 + 0.5) / n as f64;
            let d = corner + along * t;
            let pa = face_sample(a.0, a.1, &d, scale);
            let pb = face_sample(b.0, b.1, &d, scale);
            for c in 0..3 {
                let diff = pa[c] as f64 - pb[c] as f64;
                sum += diff * diff;
                count += 1;
            }
        }

        let mse = sum / count as f64;
        1.0 - mse / (255.0 * 255.0)
    }
}

/// Color of the sphere direction `d` as seen in the rendered `face` image.
fn face_sample(face: CubeFace, image: &RgbImage, d: &nalgebra::Vector3<f64>, scale: f64) -> [u8; 3] {
    let depth = d.dot(&face.forward());
    let a = d.dot(&face.right()) / depth / scale;
    let b = d.dot(&face.up()) / depth / scale;
    let half = image.width() as f64 / 2.0;
    let max_x = image.width().saturating_sub(1) as f64;
    let max_y = image.height().saturating_sub(1) as f64;
    let x = (half * (a + 1.0)).clamp(0.0, max_x);
    let y = (half * (1.0 - b)).clamp(0.0, max_y);
    sample(image, x, y, Interpolation::Bilinear)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{cube_face_remap, lon_lat_to_direction, resample, ImageShape};
    use image::Rgb;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn smooth_panorama() -> RgbImage {
        RgbImage::from_fn(512, 256, |col, row| {
            let lon = col as f64 / 512.0 * 2.0 * PI - PI;
            let lat = FRAC_PI_2 - row as f64 / 256.0 * PI;
            let d = lon_lat_to_direction(lon, lat);
            Rgb([d.x, d.y, d.z].map(|c| (128.0 + 100.0 * c).round() as u8))
        })
    }

    fn render(pano: &RgbImage, overlap: f64) -> Vec<(CubeFace, RgbImage)> {
        CubeFace::ALL
            .iter()
            .map(|&face| {
                let field = cube_face_remap(ImageShape::of(pano), face, 64, 90.0, overlap).unwrap();
                (face, resample(pano, &field, Interpolation::Bilinear))
            })
            .collect()
    }

    #[test]
    fn test_edges_share_faces() {
        for (a, b) in CUBE_EDGES {
            assert_eq!(a.forward().dot(&b.forward()), 0.0, "{} {}", a, b);
        }
    }

    #[test]
    fn test_rendered_cube_is_seamless() {
        let pano = smooth_panorama();
        for overlap in [0.0, 10.0] {
            let faces = render(&pano, overlap);
            let refs: Vec<_> = faces.iter().map(|(f, img)| (*f, img)).collect();
            let report = EdgeCheck::default().verify(&refs, 90.0 + overlap);
            assert_eq!(report.metrics.len(), 12);
            assert!(report.seamless);
            let worst = report.worst().unwrap();
            assert!(worst.similarity > 0.999, "{:?}", worst);
        }
    }

    #[test]
    fn test_mismatched_face_is_reported() {
        let pano = smooth_panorama();
        let mut faces = render(&pano, 0.0);
        image::imageops::invert(&mut faces[CubeFace::Right.index()].1);
        let refs: Vec<_> = faces.iter().map(|(f, img)| (*f, img)).collect();
        let report = EdgeCheck {
            tolerance: 0.95,
            ..Default::default()
        }
        .verify(&refs, 90.0);
        assert!(!report.seamless);
        for metric in &report.metrics {
            let touches_right = metric.faces.0 == CubeFace::Right || metric.faces.1 == CubeFace::Right;
            assert_eq!(metric.similarity < 0.95, touches_right, "{:?}", metric);
        }
    }

    #[test]
    fn test_missing_faces_are_skipped() {
        let pano = smooth_panorama();
        let faces = render(&pano, 0.0);
        let refs: Vec<_> = faces
            .iter()
            .filter(|(f, _)| matches!(f, CubeFace::Front | CubeFace::Right | CubeFace::Back))
            .map(|(f, img)| (*f, img))
            .collect();
        let report = EdgeCheck::default().verify(&refs, 90.0);
        assert_eq!(report.metrics.len(), 2);
        assert!(report.seamless);
    }
}
