//! I/O operations for loading and saving data.
//!
//! This module handles all file format parsing and export:
//! - COLMAP binary format (cameras, images, points3D), read and write
//! - Panorama loading and face image encoding (JPEG, PNG, TIFF)
//! - Atomic rename-on-success writes shared by both

mod atomic;
mod colmap;
mod image_io;

pub use atomic::write_atomic;
pub use colmap::{
    load_sparse_model, read_cameras, read_cameras_bin, read_images, read_images_bin,
    read_points3d, read_points3d_bin, write_cameras, write_cameras_bin, write_images,
    write_images_bin, write_points3d, write_points3d_bin, write_sparse_model, CameraIntrinsics,
    CameraModel, ExportError, ImageRecord, LoadError, Observation, Point3D, SparseModel,
    TrackElement, CAMERAS_FILE, IMAGES_FILE, POINTS3D_FILE,
};
pub use image_io::{load_panorama, save_image, ImageFormat, ImageIoError};
