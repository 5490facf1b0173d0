//! # cubemap-rs: panoramas to cube faces and sparse models
//!
//! This crate turns equirectangular panoramas into six perspective cube-face
//! images, gives each face a pinhole camera pose derived from its panorama,
//! and writes the cameras plus a colored sparse point cloud in the COLMAP
//! binary format.
//!
//! ## Architecture
//!
//! The crate is organized into several modules:
//!
//! - `core`: Fundamental data structures (faces, poses, cameras, rotation math)
//! - `projection`: Remap fields, resampling, seam repair
//! - `pose`: Up-axis detection and per-face pose synthesis
//! - `points`: Point cloud decimation and color normalization
//! - `io`: File I/O (COLMAP read/write, image encoding)
//! - `pipeline`: Configuration, worker pools and batch export

// Core data structures and math
pub mod core;

// Equirectangular <-> cube face projection
pub mod projection;

// Face pose synthesis
pub mod pose;

// Sparse point extraction
pub mod points;

// I/O operations (COLMAP, images)
pub mod io;

// Batch orchestration
pub mod pipeline;

// Re-export commonly used types at crate root for convenience
pub use core::{CameraPose, CubeFace, PinholeCamera};
pub use io::{ExportError, LoadError, SparseModel};
pub use pipeline::{run_batch, BatchReport, CancellationToken, ConversionConfig, PanoramaRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
