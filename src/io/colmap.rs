//! COLMAP binary format reader and writer.
//!
//! A sparse reconstruction is stored as three little-endian files:
//! - cameras.bin: Camera intrinsics
//! - images.bin: Camera poses (extrinsics) + 2D observations
//! - points3D.bin: 3D points with color and track
//!
//! Format reference: https://colmap.github.io/format.html
//!
//! Writing goes through [`write_atomic`], so a failed export never leaves a
//! truncated file in place of a previous one.

use super::atomic::write_atomic;
use crate::core::{quaternion_to_matrix, CameraPose, PinholeCamera};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};
use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::Path;
use thiserror::Error;

pub const CAMERAS_FILE: &str = "cameras.bin";
pub const IMAGES_FILE: &str = "images.bin";
pub const POINTS3D_FILE: &str = "points3D.bin";

/// Cap on pre-allocation from header counts, so a corrupt count cannot
/// trigger a huge allocation before the read fails.
const MAX_PREALLOC: u64 = 1 << 16;

/// Errors that can occur when loading COLMAP data.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid COLMAP binary format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported camera model: {0}")]
    UnsupportedCameraModel(i32),
}

/// Errors that can occur when writing COLMAP data.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image name {0:?} contains a NUL byte")]
    InvalidName(String),

    #[error("camera {camera_id}: model {model} takes {expected} parameters, got {got}")]
    ParamCount {
        camera_id: u32,
        model: &'static str,
        expected: usize,
        got: usize,
    },
}

/// COLMAP camera models, with their on-disk ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraModel {
    SimplePinhole,
    Pinhole,
    SimpleRadial,
    Radial,
    OpenCv,
    OpenCvFisheye,
    FullOpenCv,
    Fov,
    SimpleRadialFisheye,
    RadialFisheye,
    ThinPrismFisheye,
}

impl CameraModel {
    pub fn id(self) -> i32 {
        match self {
            CameraModel::SimplePinhole => 0,
            CameraModel::Pinhole => 1,
            CameraModel::SimpleRadial => 2,
            CameraModel::Radial => 3,
            CameraModel::OpenCv => 4,
            CameraModel::OpenCvFisheye => 5,
            CameraModel::FullOpenCv => 6,
            CameraModel::Fov => 7,
            CameraModel::SimpleRadialFisheye => 8,
            CameraModel::RadialFisheye => 9,
            CameraModel::ThinPrismFisheye => 10,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        Some(match id {
            0 => CameraModel::SimplePinhole,
            1 => CameraModel::Pinhole,
            2 => CameraModel::SimpleRadial,
            3 => CameraModel::Radial,
            4 => CameraModel::OpenCv,
            5 => CameraModel::OpenCvFisheye,
            6 => CameraModel::FullOpenCv,
            7 => CameraModel::Fov,
            8 => CameraModel::SimpleRadialFisheye,
            9 => CameraModel::RadialFisheye,
            10 => CameraModel::ThinPrismFisheye,
            _ => return None,
        })
    }

    /// Number of f64 parameters stored for this model.
    pub fn num_params(self) -> usize {
        match self {
            CameraModel::SimplePinhole => 3,
            CameraModel::Pinhole => 4,
            CameraModel::SimpleRadial => 4,
            CameraModel::Radial => 5,
            CameraModel::OpenCv => 8,
            CameraModel::OpenCvFisheye => 8,
            CameraModel::FullOpenCv => 12,
            CameraModel::Fov => 5,
            CameraModel::SimpleRadialFisheye => 4,
            CameraModel::RadialFisheye => 5,
            CameraModel::ThinPrismFisheye => 12,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CameraModel::SimplePinhole => "SIMPLE_PINHOLE",
            CameraModel::Pinhole => "PINHOLE",
            CameraModel::SimpleRadial => "SIMPLE_RADIAL",
            CameraModel::Radial => "RADIAL",
            CameraModel::OpenCv => "OPENCV",
            CameraModel::OpenCvFisheye => "OPENCV_FISHEYE",
            CameraModel::FullOpenCv => "FULL_OPENCV",
            CameraModel::Fov => "FOV",
            CameraModel::SimpleRadialFisheye => "SIMPLE_RADIAL_FISHEYE",
            CameraModel::RadialFisheye => "RADIAL_FISHEYE",
            CameraModel::ThinPrismFisheye => "THIN_PRISM_FISHEYE",
        }
    }
}

/// One entry of cameras.bin.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraIntrinsics {
    pub id: u32,
    pub model: CameraModel,
    pub width: u64,
    pub height: u64,
    pub params: Vec<f64>,
}

impl CameraIntrinsics {
    /// PINHOLE entry (fx, fy, cx, cy) for a pinhole camera.
    pub fn pinhole(id: u32, camera: &PinholeCamera) -> Self {
        Self {
            id,
            model: CameraModel::Pinhole,
            width: camera.width as u64,
            height: camera.height as u64,
            params: vec![camera.fx, camera.fy, camera.cx, camera.cy],
        }
    }
}

/// A 2D observation in an image, linked to a 3D point (or -1 as u64::MAX).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub x: f64,
    pub y: f64,
    pub point3d_id: u64,
}

/// One entry of images.bin.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub id: u32,

    /// World-to-camera rotation as (w, x, y, z), stored verbatim
    pub quaternion: [f64; 4],

    /// World-to-camera translation
    pub translation: Vector3<f64>,

    pub camera_id: u32,
    pub name: String,
    pub observations: Vec<Observation>,
}

impl ImageRecord {
    /// Record for a camera at `pose`, with no observations.
    pub fn from_pose(id: u32, camera_id: u32, name: impl Into<String>, pose: &CameraPose) -> Self {
        let q = pose.quaternion();
        Self {
            id,
            quaternion: [q.w, q.i, q.j, q.k],
            translation: pose.translation(),
            camera_id,
            name: name.into(),
            observations: Vec::new(),
        }
    }

    /// World-to-camera rotation matrix.
    pub fn rotation(&self) -> Matrix3<f64> {
        let [w, x, y, z] = self.quaternion;
        quaternion_to_matrix(&UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)))
    }

    /// Camera centre in world coordinates: C = -Rᵀ t
    pub fn camera_center(&self) -> Vector3<f64> {
        -(self.rotation().transpose() * self.translation)
    }
}

/// One element of a point's track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackElement {
    pub image_id: u32,
    pub point2d_idx: u32,
}

/// A 3D point from a sparse reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Point3D {
    /// Point ID
    pub id: u64,

    /// 3D position
    pub xyz: Vector3<f64>,

    /// RGB color (0-255)
    pub rgb: [u8; 3],

    /// Reprojection error
    pub error: f64,

    pub track: Vec<TrackElement>,
}

/// A complete sparse model: cameras, images and 3D points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseModel {
    pub cameras: Vec<CameraIntrinsics>,
    pub images: Vec<ImageRecord>,
    pub points: Vec<Point3D>,
}

/// Write cameras.bin, images.bin and points3D.bin into `dir` (created if needed).
pub fn write_sparse_model(dir: &Path, model: &SparseModel) -> Result<(), ExportError> {
    fs::create_dir_all(dir)?;
    write_cameras_bin(&dir.join(CAMERAS_FILE), &model.cameras)?;
    write_images_bin(&dir.join(IMAGES_FILE), &model.images)?;
    write_points3d_bin(&dir.join(POINTS3D_FILE), &model.points)?;

    log::info!(
        "wrote sparse model to {}: {} cameras, {} images, {} points",
        dir.display(),
        model.cameras.len(),
        model.images.len(),
        model.points.len()
    );
    Ok(())
}

pub fn write_cameras_bin(path: &Path, cameras: &[CameraIntrinsics]) -> Result<(), ExportError> {
    validate_cameras(cameras)?;
    write_atomic(path, |w| write_cameras(w, cameras))
}

pub fn write_images_bin(path: &Path, images: &[ImageRecord]) -> Result<(), ExportError> {
    validate_images(images)?;
    write_atomic(path, |w| write_images(w, images))
}

pub fn write_points3d_bin(path: &Path, points: &[Point3D]) -> Result<(), ExportError> {
    write_atomic(path, |w| write_points3d(w, points).map_err(ExportError::from))
}

fn validate_cameras(cameras: &[CameraIntrinsics]) -> Result<(), ExportError> {
    for camera in cameras {
        if camera.params.len() != camera.model.num_params() {
            return Err(ExportError::ParamCount {
                camera_id: camera.id,
                model: camera.model.name(),
                expected: camera.model.num_params(),
                got: camera.params.len(),
            });
        }
    }
    Ok(())
}

fn validate_images(images: &[ImageRecord]) -> Result<(), ExportError> {
    match images.iter().find(|image| image.name.contains('\0')) {
        Some(image) => Err(ExportError::InvalidName(image.name.clone())),
        None => Ok(()),
    }
}

/// Serialize cameras.
///
/// Binary format (little-endian):
/// - num_cameras: u64
/// - For each camera:
///   - camera_id: u32
///   - model_id: i32
///   - width: u64
///   - height: u64
///   - params: [f64; N] (N depends on model)
pub fn write_cameras<W: Write>(w: &mut W, cameras: &[CameraIntrinsics]) -> Result<(), ExportError> {
    validate_cameras(cameras)?;
    w.write_u64::<LittleEndian>(cameras.len() as u64)?;
    for camera in cameras {
        w.write_u32::<LittleEndian>(camera.id)?;
        w.write_i32::<LittleEndian>(camera.model.id())?;
        w.write_u64::<LittleEndian>(camera.width)?;
        w.write_u64::<LittleEndian>(camera.height)?;
        for &p in &camera.params {
            w.write_f64::<LittleEndian>(p)?;
        }
    }
    Ok(())
}

/// Serialize images.
///
/// Binary format (little-endian):
/// - num_images: u64
/// - For each image:
///   - image_id: u32
///   - qw, qx, qy, qz: f64
///   - tx, ty, tz: f64
///   - camera_id: u32
///   - name: null-terminated string
///   - num_points2d: u64, then (x: f64, y: f64, point3d_id: u64) each
pub fn write_images<W: Write>(w: &mut W, images: &[ImageRecord]) -> Result<(), ExportError> {
    validate_images(images)?;
    w.write_u64::<LittleEndian>(images.len() as u64)?;
    for image in images {
        w.write_u32::<LittleEndian>(image.id)?;
        for &q in &image.quaternion {
            w.write_f64::<LittleEndian>(q)?;
        }
        for &t in image.translation.iter() {
            w.write_f64::<LittleEndian>(t)?;
        }
        w.write_u32::<LittleEndian>(image.camera_id)?;
        w.write_all(image.name.as_bytes())?;
        w.write_u8(0)?;

        w.write_u64::<LittleEndian>(image.observations.len() as u64)?;
        for obs in &image.observations {
            w.write_f64::<LittleEndian>(obs.x)?;
            w.write_f64::<LittleEndian>(obs.y)?;
            w.write_u64::<LittleEndian>(obs.point3d_id)?;
        }
    }
    Ok(())
}

/// Serialize 3D points.
///
/// Binary format (little-endian):
/// - num_points: u64
/// - For each point:
///   - point_id: u64
///   - x, y, z: f64
///   - r, g, b: u8
///   - error: f64
///   - track_length: u64, then (image_id: u32, point2d_idx: u32) each
pub fn write_points3d<W: Write>(w: &mut W, points: &[Point3D]) -> std::io::Result<()> {
    w.write_u64::<LittleEndian>(points.len() as u64)?;
    for point in points {
        w.write_u64::<LittleEndian>(point.id)?;
        for &c in point.xyz.iter() {
            w.write_f64::<LittleEndian>(c)?;
        }
        w.write_all(&point.rgb)?;
        w.write_f64::<LittleEndian>(point.error)?;

        w.write_u64::<LittleEndian>(point.track.len() as u64)?;
        for el in &point.track {
            w.write_u32::<LittleEndian>(el.image_id)?;
            w.write_u32::<LittleEndian>(el.point2d_idx)?;
        }
    }
    Ok(())
}

/// Load a complete sparse model from a directory.
///
/// Expected directory structure:
/// ```text
/// sparse/0/
///   cameras.bin
///   images.bin
///   points3D.bin
/// ```
pub fn load_sparse_model(sparse_dir: &Path) -> Result<SparseModel, LoadError> {
    Ok(SparseModel {
        cameras: read_cameras_bin(&sparse_dir.join(CAMERAS_FILE))?,
        images: read_images_bin(&sparse_dir.join(IMAGES_FILE))?,
        points: read_points3d_bin(&sparse_dir.join(POINTS3D_FILE))?,
    })
}

pub fn read_cameras_bin(path: &Path) -> Result<Vec<CameraIntrinsics>, LoadError> {
    read_cameras(&mut BufReader::new(File::open(path)?))
}

pub fn read_images_bin(path: &Path) -> Result<Vec<ImageRecord>, LoadError> {
    read_images(&mut BufReader::new(File::open(path)?))
}

pub fn read_points3d_bin(path: &Path) -> Result<Vec<Point3D>, LoadError> {
    read_points3d(&mut BufReader::new(File::open(path)?))
}

pub fn read_cameras<R: Read>(reader: &mut R) -> Result<Vec<CameraIntrinsics>, LoadError> {
    let num_cameras = reader.read_u64::<LittleEndian>()?;
    let mut cameras = Vec::with_capacity(num_cameras.min(MAX_PREALLOC) as usize);

    for _ in 0..num_cameras {
        let id = reader.read_u32::<LittleEndian>()?;
        let model_id = reader.read_i32::<LittleEndian>()?;
        let model =
            CameraModel::from_id(model_id).ok_or(LoadError::UnsupportedCameraModel(model_id))?;
        let width = reader.read_u64::<LittleEndian>()?;
        let height = reader.read_u64::<LittleEndian>()?;

        let mut params = Vec::with_capacity(model.num_params());
        for _ in 0..model.num_params() {
            params.push(reader.read_f64::<LittleEndian>()?);
        }

        cameras.push(CameraIntrinsics {
            id,
            model,
            width,
            height,
            params,
        });
    }

    Ok(cameras)
}

pub fn read_images<R: Read>(reader: &mut R) -> Result<Vec<ImageRecord>, LoadError> {
    let num_images = reader.read_u64::<LittleEndian>()?;
    let mut images = Vec::with_capacity(num_images.min(MAX_PREALLOC) as usize);

    for _ in 0..num_images {
        let id = reader.read_u32::<LittleEndian>()?;

        let mut quaternion = [0.0; 4];
        for q in &mut quaternion {
            *q = reader.read_f64::<LittleEndian>()?;
        }
        let tx = reader.read_f64::<LittleEndian>()?;
        let ty = reader.read_f64::<LittleEndian>()?;
        let tz = reader.read_f64::<LittleEndian>()?;

        let camera_id = reader.read_u32::<LittleEndian>()?;

        // Read null-terminated image name
        let mut name_bytes = Vec::new();
        loop {
            let byte = reader.read_u8()?;
            if byte == 0 {
                break;
            }
            name_bytes.push(byte);
        }
        let name = String::from_utf8(name_bytes)
            .map_err(|e| LoadError::InvalidFormat(format!("Invalid UTF-8 in image name: {}", e)))?;

        let num_points2d = reader.read_u64::<LittleEndian>()?;
        let mut observations = Vec::with_capacity(num_points2d.min(MAX_PREALLOC) as usize);
        for _ in 0..num_points2d {
            observations.push(Observation {
                x: reader.read_f64::<LittleEndian>()?,
                y: reader.read_f64::<LittleEndian>()?,
                point3d_id: reader.read_u64::<LittleEndian>()?,
            });
        }

        images.push(ImageRecord {
            id,
            quaternion,
            translation: Vector3::new(tx, ty, tz),
            camera_id,
            name,
            observations,
        });
    }

    Ok(images)
}

pub fn read_points3d<R: Read>(reader: &mut R) -> Result<Vec<Point3D>, LoadError> {
    let num_points = reader.read_u64::<LittleEndian>()?;
    let mut points = Vec::with_capacity(num_points.min(MAX_PREALLOC) as usize);

    for _ in 0..num_points {
        let id = reader.read_u64::<LittleEndian>()?;

        let x = reader.read_f64::<LittleEndian>()?;
        let y = reader.read_f64::<LittleEndian>()?;
        let z = reader.read_f64::<LittleEndian>()?;

        let mut rgb = [0u8; 3];
        reader.read_exact(&mut rgb)?;

        let error = reader.read_f64::<LittleEndian>()?;

        let track_length = reader.read_u64::<LittleEndian>()?;
        let mut track = Vec::with_capacity(track_length.min(MAX_PREALLOC) as usize);
        for _ in 0..track_length {
            track.push(TrackElement {
                image_id: reader.read_u32::<LittleEndian>()?,
                point2d_idx: reader.read_u32::<LittleEndian>()?,
            });
        }

        points.push(Point3D {
            id,
            xyz: Vector3::new(x, y, z),
            rgb,
            error,
            track,
        });
    }

    Ok(points)
}
