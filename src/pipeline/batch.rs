//! Batch export: many panoramas, one sparse model.

use super::cancel::CancellationToken;
use super::config::{ConversionConfig, UpAxisSetting};
use super::convert::{convert_panorama, image_name, FaceCamera, OutputLayout, PanoramaRecord, PanoramaResult};
use super::pool::run_tasks;
use super::progress::{BatchProgress, NoProgress, ProgressSink, ProgressTracker, Stage};
use super::{PipelineError, TaskError};
use crate::io::{write_atomic, write_sparse_model, CameraIntrinsics, ImageRecord, Point3D, SparseModel};
use crate::points::{extract_points, ExtractionReport, PointStore};
use crate::pose::{detect_up_axis, UpAxis, DEFAULT_UP_AXIS_SAMPLES};
use crate::projection::{EdgeReport, RemapCache};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

/// A unit of work that failed, identified by its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFailure {
    pub label: String,
    pub message: String,
}

/// Edge continuity of one converted panorama.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanoramaEdges {
    pub label: String,
    pub report: EdgeReport,
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Panoramas with at least one face written
    pub processed: usize,
    /// Panoramas not started because the run was cancelled
    pub skipped: usize,
    pub errors: Vec<UnitFailure>,
    pub elapsed: Duration,
    pub faces_written: usize,
    pub up_axis: UpAxis,
    pub cameras: Vec<FaceCamera>,
    pub points: Option<ExtractionReport>,
    /// Per-panorama edge checks, empty unless enabled in the configuration
    pub edge_checks: Vec<PanoramaEdges>,
    /// False when the run was cancelled and the exchange files were not touched
    pub model_written: bool,
}

impl BatchReport {
    /// Write the face cameras as pretty JSON; the file appears only once complete.
    pub fn write_cameras_json(&self, path: &Path) -> std::io::Result<()> {
        write_atomic(path, |w| {
            serde_json::to_writer_pretty(w, &self.cameras).map_err(std::io::Error::from)
        })
    }
}

/// Convert every panorama, then write the sparse model.
///
/// Failures of individual panoramas or faces are collected in the report.
/// Only invalid configuration or a failed model write fail the whole run.
/// When `token` is cancelled, nothing is written to the sparse directory.
pub fn run_batch(
    panoramas: &[PanoramaRecord],
    points: &PointStore,
    config: &ConversionConfig,
    out_root: &Path,
    token: &CancellationToken,
) -> Result<BatchReport, PipelineError> {
    run_batch_with_progress(panoramas, points, config, out_root, token, &NoProgress)
}

/// [`run_batch`] reporting each finished panorama and stage to `progress`.
pub fn run_batch_with_progress(
    panoramas: &[PanoramaRecord],
    points: &PointStore,
    config: &ConversionConfig,
    out_root: &Path,
    token: &CancellationToken,
    progress: &dyn ProgressSink,
) -> Result<BatchReport, PipelineError> {
    let start = Instant::now();
    config.validate()?;

    let layout = OutputLayout::new(out_root);
    layout.create_dirs()?;

    let up_axis = match config.up_axis {
        UpAxisSetting::Fixed(axis) => axis,
        UpAxisSetting::Auto => {
            let orientations: Vec<_> = panoramas.iter().map(|p| p.rotation).collect();
            let estimate = detect_up_axis(&orientations, DEFAULT_UP_AXIS_SAMPLES);
            log::info!(
                "detected {} from {} orientations (confidence {:.0}%)",
                estimate.axis,
                estimate.samples,
                estimate.confidence() * 100.0
            );
            estimate.axis
        }
    };

    log::info!(
        "converting {} panoramas into {}",
        panoramas.len(),
        out_root.display()
    );
    let cache = RemapCache::new();
    let tracker = ProgressTracker::new(progress, start, Stage::Converting, panoramas.len());
    let outcomes = run_tasks(
        config.panorama_threads(),
        panoramas.iter().collect(),
        token,
        |record| {
            let outcome = convert_panorama(record, config, up_axis, &layout, &cache, token);
            tracker.finish(&record.label);
            outcome
        },
    );

    let mut report = BatchReport {
        up_axis,
        ..Default::default()
    };
    let mut results = Vec::new();
    for (record, outcome) in panoramas.iter().zip(outcomes) {
        match outcome {
            Ok(result) => {
                for (face, e) in &result.face_errors {
                    if matches!(e, TaskError::Cancelled) {
                        continue;
                    }
                    report.errors.push(UnitFailure {
                        label: format!("{}_{}", record.label, face),
                        message: e.to_string(),
                    });
                }
                report.processed += 1;
                report.faces_written += result.cameras.len();
                if let Some(edges) = &result.edge_report {
                    report.edge_checks.push(PanoramaEdges {
                        label: record.label.clone(),
                        report: edges.clone(),
                    });
                }
                results.push(result);
            }
            Err(TaskError::Cancelled) => report.skipped += 1,
            Err(e) => {
                log::error!("{}: {}", record.label, e);
                report.errors.push(UnitFailure {
                    label: record.label.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    report.cameras = results.iter().flat_map(|r| r.cameras.iter().cloned()).collect();

    if token.is_cancelled() {
        log::warn!(
            "run cancelled after {} panoramas; sparse model not written",
            report.processed
        );
        report.elapsed = start.elapsed();
        return Ok(report);
    }

    let tracker = ProgressTracker::new(progress, start, Stage::ExtractingPoints, 1);
    let extraction = extract_points(points, config.max_points);
    extraction.report.log_summary();
    report.points = Some(extraction.report);
    tracker.finish("points");

    let tracker = ProgressTracker::new(progress, start, Stage::WritingModel, 1);
    let model = build_sparse_model(&results, extraction.into_points());
    write_sparse_model(&layout.sparse_dir(), &model)?;
    report.model_written = true;
    tracker.finish("sparse model");

    report.elapsed = start.elapsed();
    progress.update(&BatchProgress {
        stage: Stage::Done,
        completed: report.processed,
        total: panoramas.len(),
        label: None,
        elapsed: report.elapsed,
        eta: None,
    });
    log::info!(
        "done in {:.1}s: {} processed, {} skipped, {} errors, {} faces",
        report.elapsed.as_secs_f64(),
        report.processed,
        report.skipped,
        report.errors.len(),
        report.faces_written
    );
    Ok(report)
}

/// Assemble the exchange model from converted panoramas and points.
///
/// Faces with identical intrinsics share one camera entry. Image ids follow
/// panorama order, then face order, starting at 1.
pub fn build_sparse_model(results: &[PanoramaResult], points: Vec<Point3D>) -> SparseModel {
    let mut model = SparseModel {
        points,
        ..Default::default()
    };
    let mut camera_ids: HashMap<(u32, u32, u64, u64, u64), u32> = HashMap::new();

    for camera in results.iter().flat_map(|r| &r.cameras) {
        let key = (
            camera.width,
            camera.height,
            camera.focal_length_px.to_bits(),
            camera.principal_point[0].to_bits(),
            camera.principal_point[1].to_bits(),
        );
        let next_id = camera_ids.len() as u32 + 1;
        let camera_id = *camera_ids.entry(key).or_insert_with(|| {
            model
                .cameras
                .push(CameraIntrinsics::pinhole(next_id, &camera.pinhole()));
            next_id
        });

        let image_id = model.images.len() as u32 + 1;
        model.images.push(ImageRecord::from_pose(
            image_id,
            camera_id,
            image_name(&camera.image_path),
            &camera.pose,
        ));
    }

    model
}
