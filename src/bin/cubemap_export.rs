//! cubemap-export: Convert panoramas to cube faces and write a COLMAP sparse model
//!
//! Usage:
//!   cubemap-export --manifest scene.json --out export/
//!   cubemap-export --manifest scene.json --out export/ --config config.json --face-size 1024
//!
//! The manifest lists the panoramas (label, position, rotation, image path)
//! and the sparse point cloud:
//!
//! ```json
//! {
//!   "panoramas": [{"label": "p0", "position": [0, 0, 0],
//!                  "rotation": [1, 0, 0, 0, 1, 0, 0, 0, 1], "image_path": "p0.jpg"}],
//!   "points": {"points": [{"position": [1, 2, 3], "color": [0.5, 0.2, 0.1]}]}
//! }
//! ```

use anyhow::{bail, Context, Result};
use cubemap_rs::core::CubeFace;
use cubemap_rs::io::ImageFormat;
use cubemap_rs::pipeline::{
    run_batch_with_progress, CancellationToken, ConversionConfig, FaceSize, LogProgress,
    PanoramaRecord, UpAxisSetting,
};
use cubemap_rs::projection::EdgeCheck;
use cubemap_rs::points::PointStore;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct Manifest {
    panoramas: Vec<PanoramaRecord>,
    #[serde(default)]
    points: PointStore,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("cubemap-export v{}", cubemap_rs::VERSION);

    // Parse command-line arguments
    let mut args = std::env::args().skip(1);
    let mut manifest_path: Option<PathBuf> = None;
    let mut out_dir: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut face_size: Option<u32> = None;
    let mut overlap: Option<f64> = None;
    let mut format: Option<ImageFormat> = None;
    let mut faces: Option<Vec<CubeFace>> = None;
    let mut up_axis: Option<String> = None;
    let mut edge_check = false;

    while let Some(arg) = args.next() {
        let mut value = || {
            args.next()
                .with_context(|| format!("Missing value for {}", arg))
        };
        match arg.as_str() {
            "--manifest" => manifest_path = Some(PathBuf::from(value()?)),
            "--out" => out_dir = Some(PathBuf::from(value()?)),
            "--config" => config_path = Some(PathBuf::from(value()?)),
            "--face-size" => {
                face_size = Some(value()?.parse().context("Invalid --face-size")?);
            }
            "--overlap" => {
                overlap = Some(value()?.parse().context("Invalid --overlap")?);
            }
            "--format" => {
                format = Some(match value()?.to_ascii_lowercase().as_str() {
                    "jpg" | "jpeg" => ImageFormat::Jpeg,
                    "png" => ImageFormat::Png,
                    "tif" | "tiff" => ImageFormat::Tiff,
                    other => bail!("Unknown image format: {}", other),
                });
            }
            "--faces" => {
                faces = Some(
                    value()?
                        .split(',')
                        .map(|s| s.trim().parse::<CubeFace>())
                        .collect::<Result<_, _>>()?,
                );
            }
            "--up-axis" => up_axis = Some(value()?),
            "--check-edges" => edge_check = true,
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => bail!("Unknown argument: {} (see --help)", other),
        }
    }

    let manifest_path = manifest_path.context("--manifest is required")?;
    let out_dir = out_dir.context("--out is required")?;

    let mut config = match &config_path {
        Some(path) => ConversionConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ConversionConfig::default(),
    };
    if let Some(size) = face_size {
        config.face_size = FaceSize::Fixed(size);
    }
    if let Some(deg) = overlap {
        config.overlap_deg = deg;
    }
    if let Some(fmt) = format {
        config.format = fmt;
    }
    if let Some(faces) = faces {
        config.faces = faces;
    }
    if let Some(tag) = up_axis {
        config.up_axis = match tag.to_ascii_lowercase().as_str() {
            "auto" => UpAxisSetting::Auto,
            _ => UpAxisSetting::Fixed(cubemap_rs::pose::UpAxis::from_tag(&tag)),
        };
    }
    if edge_check && config.edge_check.is_none() {
        config.edge_check = Some(EdgeCheck::default());
    }
    config.validate().context("Invalid configuration")?;

    let manifest = load_manifest(&manifest_path)?;
    log::info!(
        "{} panoramas, {} points",
        manifest.panoramas.len(),
        manifest.points.points.len()
    );

    let token = CancellationToken::new();
    let report = run_batch_with_progress(
        &manifest.panoramas,
        &manifest.points,
        &config,
        &out_dir,
        &token,
        &LogProgress,
    )
    .context("Export failed")?;

    let cameras_path = out_dir.join("cameras.json");
    report
        .write_cameras_json(&cameras_path)
        .with_context(|| format!("Failed to write {}", cameras_path.display()))?;

    println!();
    println!("Processed:     {}", report.processed);
    println!("Skipped:       {}", report.skipped);
    println!("Faces written: {}", report.faces_written);
    println!("Up axis:       {}", report.up_axis);
    if let Some(points) = &report.points {
        println!(
            "Points:        {} ({:.1}% colored)",
            points.valid,
            points.color_ratio() * 100.0
        );
    }
    for edges in &report.edge_checks {
        if let Some(worst) = edges.report.worst() {
            println!(
                "Edges {}: worst {}/{} {:.3}{}",
                edges.label,
                worst.faces.0,
                worst.faces.1,
                worst.similarity,
                if edges.report.seamless { "" } else { " (seams)" }
            );
        }
    }
    println!("Elapsed:       {:.1}s", report.elapsed.as_secs_f64());
    if !report.errors.is_empty() {
        println!("Errors:");
        for failure in &report.errors {
            println!("  {}: {}", failure.label, failure.message);
        }
    }

    Ok(())
}

fn load_manifest(path: &Path) -> Result<Manifest> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    let mut manifest: Manifest = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse manifest {}", path.display()))?;

    // Relative image paths are resolved against the manifest's directory.
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for record in &mut manifest.panoramas {
        if record.image_path.is_relative() {
            record.image_path = base.join(&record.image_path);
        }
    }
    Ok(manifest)
}

fn print_help() {
    println!("cubemap-export: panoramas to cube faces plus a COLMAP sparse model");
    println!();
    println!("USAGE:");
    println!("  cubemap-export --manifest <json> --out <dir> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  --manifest <path>     Panoramas and points (JSON)");
    println!("  --out <dir>           Output root (images/ and sparse/0/)");
    println!("  --config <path>       Conversion config (JSON); flags below override it");
    println!("  --face-size <px>      Fixed face size (default: width/4, clamped 512..4096)");
    println!("  --overlap <deg>       Extra field of view per face, 0..20 (default: 10)");
    println!("  --format <fmt>        jpg, png or tiff (default: jpg)");
    println!("  --faces <list>        Comma-separated faces (default: all six)");
    println!("  --up-axis <tag>       auto, Y_UP, Z_UP or X_UP (default: auto)");
    println!("  --check-edges         Compare faces along the twelve cube edges");
    println!("  -h, --help            Print this help");
    println!();
    println!("Set RUST_LOG=debug for per-face logging.");
}
