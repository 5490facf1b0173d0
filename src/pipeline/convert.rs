//! Conversion of one panorama into face images and face cameras.

use super::cancel::CancellationToken;
use super::config::ConversionConfig;
use super::pool::run_tasks;
use super::TaskError;
use crate::core::{focal_length_px, CameraPose, CubeFace, PinholeCamera};
use crate::io::{load_panorama, save_image, ImageFormat};
use crate::pose::{synthesize_face_poses, UpAxis};
use crate::projection::{resample, EdgeReport, ImageShape, RemapCache, RemapKey};
use image::RgbImage;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A panorama as supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanoramaRecord {
    /// Used as the prefix of every face image name
    pub label: String,

    pub position: Vector3<f64>,

    /// Camera-to-world orientation (column-major in JSON)
    pub rotation: Matrix3<f64>,

    pub image_path: PathBuf,
}

/// A face camera to be registered with the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceCamera {
    /// `<panorama label>_<face>`
    pub label: String,
    pub face: CubeFace,
    pub width: u32,
    pub height: u32,
    pub focal_length_px: f64,
    pub principal_point: [f64; 2],
    pub pose: CameraPose,
    pub image_path: PathBuf,
}

impl FaceCamera {
    /// Pinhole camera with this face's intrinsics and pose.
    pub fn pinhole(&self) -> PinholeCamera {
        PinholeCamera {
            fx: self.focal_length_px,
            fy: self.focal_length_px,
            cx: self.principal_point[0],
            cy: self.principal_point[1],
            width: self.width,
            height: self.height,
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
        .with_pose(&self.pose)
    }
}

/// Output directory layout of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn sparse_dir(&self) -> PathBuf {
        self.root.join("sparse").join("0")
    }

    pub fn face_image_path(&self, label: &str, face: CubeFace, format: ImageFormat) -> PathBuf {
        self.images_dir()
            .join(format!("{}_{}.{}", label, face, format.extension()))
    }

    pub fn create_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(self.images_dir())?;
        fs::create_dir_all(self.sparse_dir())
    }
}

/// Faces produced for one panorama.
#[derive(Debug)]
pub struct PanoramaResult {
    pub label: String,
    pub face_size: u32,
    pub cameras: Vec<FaceCamera>,
    /// Faces that failed while the rest of the panorama succeeded
    pub face_errors: Vec<(CubeFace, TaskError)>,
    /// Edge continuity of the written faces, when the check is enabled
    pub edge_report: Option<EdgeReport>,
}

/// Render, save and pose every selected face of `record`.
///
/// Faces run on their own bounded pool. The panorama fails only if its image
/// cannot be loaded, its pose is unusable, or every face fails.
pub fn convert_panorama(
    record: &PanoramaRecord,
    config: &ConversionConfig,
    up_axis: UpAxis,
    layout: &OutputLayout,
    cache: &RemapCache,
    token: &CancellationToken,
) -> Result<PanoramaResult, TaskError> {
    let image = load_panorama(&record.image_path).map_err(TaskError::Input)?;
    let shape = ImageShape::of(&image);
    let face_size = config.resolve_face_size(shape.width);
    let fov = 90.0 + config.overlap_deg;

    let poses = synthesize_face_poses(&record.position, &record.rotation, up_axis, &config.faces)?;
    log::info!(
        "{}: {}x{} panorama, {} faces at {}px",
        record.label,
        shape.width,
        shape.height,
        poses.len(),
        face_size
    );

    let outcomes = run_tasks(config.face_threads(), poses, token, |(face, pose)| {
        let key = RemapKey::new(shape, face, face_size, config.overlap_deg, config.projection);
        let field = cache.get_or_build(key)?;
        let mut rendered = resample(&image, &field, config.interpolation);

        if face == CubeFace::Back {
            if let Some(seam) = &config.seam_repair {
                rendered = seam.repair(&rendered);
            }
        }

        let path = layout.face_image_path(&record.label, face, config.format);
        save_image(&rendered, &path, config.format, config.quality).map_err(TaskError::Io)?;
        log::debug!("{}: wrote {}", record.label, path.display());

        let camera = FaceCamera {
            label: format!("{}_{}", record.label, face),
            face,
            width: face_size,
            height: face_size,
            focal_length_px: focal_length_px(face_size, fov),
            principal_point: [face_size as f64 / 2.0, face_size as f64 / 2.0],
            pose,
            image_path: path,
        };
        Ok((camera, config.edge_check.map(|_| rendered)))
    });

    let mut cameras = Vec::new();
    let mut rendered_faces: Vec<(CubeFace, RgbImage)> = Vec::new();
    let mut face_errors = Vec::new();
    for (face, outcome) in config.faces.iter().zip(outcomes) {
        match outcome {
            Ok((camera, rendered)) => {
                if let Some(rendered) = rendered {
                    rendered_faces.push((camera.face, rendered));
                }
                cameras.push(camera);
            }
            Err(e) => {
                if !matches!(e, TaskError::Cancelled) {
                    log::error!("{}: {} face failed: {}", record.label, face, e);
                }
                face_errors.push((*face, e));
            }
        }
    }

    if cameras.is_empty() {
        // Surface the first error; all faces share the same inputs.
        if let Some((_, e)) = face_errors.drain(..).next() {
            return Err(e);
        }
    }

    let edge_report = config.edge_check.map(|check| {
        let refs: Vec<_> = rendered_faces.iter().map(|(f, img)| (*f, img)).collect();
        let report = check.verify(&refs, fov);
        if !report.seamless {
            if let Some(worst) = report.worst() {
                log::warn!(
                    "{}: {}/{} edge similarity {:.3} below {}",
                    record.label,
                    worst.faces.0,
                    worst.faces.1,
                    worst.similarity,
                    check.tolerance
                );
            }
        }
        report
    });

    Ok(PanoramaResult {
        label: record.label.clone(),
        face_size,
        cameras,
        face_errors,
        edge_report,
    })
}

/// File name component of `path`, as written into the exchange files.
pub(crate) fn image_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FaceSize;
    use crate::projection::EdgeCheck;
    use image::Rgb;

    fn write_panorama(dir: &Path) -> PathBuf {
        let path = dir.join("pano.png");
        RgbImage::from_fn(256, 128, |x, y| Rgb([x as u8, y as u8 * 2, 90]))
            .save(&path)
            .unwrap();
        path
    }

    fn record(image_path: PathBuf) -> PanoramaRecord {
        PanoramaRecord {
            label: "pano".to_string(),
            position: Vector3::new(1.0, 2.0, 3.0),
            rotation: Matrix3::identity(),
            image_path,
        }
    }

    #[test]
    fn test_layout_paths() {
        let layout = OutputLayout::new("/out");
        assert_eq!(
            layout.face_image_path("p1", CubeFace::Back, ImageFormat::Png),
            PathBuf::from("/out/images/p1_back.png")
        );
        assert_eq!(layout.sparse_dir(), PathBuf::from("/out/sparse/0"));
        assert_eq!(image_name(Path::new("/out/images/p1_back.png")), "p1_back.png");
    }

    #[test]
    fn test_convert_selected_faces() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path().join("out"));
        layout.create_dirs().unwrap();
        let config = ConversionConfig {
            face_size: FaceSize::Fixed(32),
            format: ImageFormat::Png,
            faces: vec![CubeFace::Front, CubeFace::Back, CubeFace::Top],
            ..Default::default()
        };

        let result = convert_panorama(
            &record(write_panorama(dir.path())),
            &config,
            UpAxis::YUp,
            &layout,
            &RemapCache::new(),
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(result.cameras.len(), 3);
        assert!(result.face_errors.is_empty());
        for camera in &result.cameras {
            assert!(camera.image_path.exists());
            assert_eq!(camera.pose.position, Vector3::new(1.0, 2.0, 3.0));
            assert_eq!(camera.principal_point, [16.0, 16.0]);
            approx::assert_relative_eq!(camera.pinhole().fov_x_deg(), 100.0, epsilon = 1e-9);
        }
        assert_eq!(result.cameras[1].label, "pano_back");
        assert!(result.edge_report.is_none());
    }

    #[test]
    fn test_edge_check_reports_rendered_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path().join("out"));
        layout.create_dirs().unwrap();
        let config = ConversionConfig {
            face_size: FaceSize::Fixed(32),
            format: ImageFormat::Png,
            faces: vec![CubeFace::Front, CubeFace::Right, CubeFace::Top],
            edge_check: Some(EdgeCheck::default()),
            ..Default::default()
        };

        let result = convert_panorama(
            &record(write_panorama(dir.path())),
            &config,
            UpAxis::YUp,
            &layout,
            &RemapCache::new(),
            &CancellationToken::new(),
        )
        .unwrap();

        let report = result.edge_report.unwrap();
        // front/right, front/top, right/top
        assert_eq!(report.metrics.len(), 3);
        assert!(report.metrics.iter().all(|m| m.similarity > 0.0 && m.similarity <= 1.0));
    }

    #[test]
    fn test_every_face_failing_fails_the_panorama() {
        let dir = tempfile::tempdir().unwrap();
        // Output directories are never created, so every save fails.
        let layout = OutputLayout::new(dir.path().join("not_created"));
        let config = ConversionConfig {
            face_size: FaceSize::Fixed(16),
            format: ImageFormat::Png,
            ..Default::default()
        };

        let result = convert_panorama(
            &record(write_panorama(dir.path())),
            &config,
            UpAxis::YUp,
            &layout,
            &RemapCache::new(),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(TaskError::Io(_))), "{:?}", result.map(|r| r.cameras.len()));
    }

    #[test]
    fn test_missing_image_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let result = convert_panorama(
            &record(dir.path().join("missing.jpg")),
            &ConversionConfig::default(),
            UpAxis::YUp,
            &layout,
            &RemapCache::new(),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(TaskError::Input(_))));
    }
}
