//! Orchestration: configuration, worker pools and batch export.
//!
//! A run converts every panorama on a bounded pool (each panorama renders its
//! faces on a nested face pool), aggregates the face cameras, extracts the
//! point cloud and finally writes the sparse model. Units fail independently;
//! the [`BatchReport`] lists what went wrong. Progress goes to a
//! [`ProgressSink`] after every panorama and stage.

mod batch;
mod cancel;
mod config;
mod convert;
mod pool;
mod progress;

pub use batch::{
    build_sparse_model, run_batch, run_batch_with_progress, BatchReport, PanoramaEdges, UnitFailure,
};
pub use cancel::CancellationToken;
pub use config::{ConfigError, ConversionConfig, FaceSize, UpAxisSetting, AUTO_FACE_SIZE_RANGE};
pub use convert::{convert_panorama, FaceCamera, OutputLayout, PanoramaRecord, PanoramaResult};
pub use pool::{run_tasks, TaskOutcome};
pub use progress::{BatchProgress, LogProgress, NoProgress, ProgressSink, Stage};

use crate::io::{ExportError, ImageIoError};
use crate::pose::PoseError;
use crate::projection::ProjectionError;
use thiserror::Error;

/// Why a single face or panorama task failed.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Missing, unreadable or empty source image
    #[error("input: {0}")]
    Input(#[source] ImageIoError),

    #[error("projection: {0}")]
    Projection(#[from] ProjectionError),

    /// Pose synthesis failed for this panorama
    #[error("computation: {0}")]
    Computation(#[from] PoseError),

    /// Face image could not be written
    #[error("output: {0}")]
    Io(#[source] ImageIoError),

    #[error("cancelled")]
    Cancelled,

    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to write sparse model: {0}")]
    Export(#[from] ExportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
