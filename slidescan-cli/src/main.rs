mod annotate;
mod args;
mod config;
mod detector;
mod input;
mod types;

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use slidescan_core::DetectionCandidate;
use slidescan_utils::{configure_telemetry, init_logging, normalize_path, timing_guard};

use crate::annotate::{DETECTION_COLOR, RAW_COLOR, annotate_image};
use crate::args::DetectArgs;
use crate::config::{apply_cli_overrides, load_settings};
use crate::detector::build_cli_detector;
use crate::input::collect_targets;
use crate::types::{DetectionRecord, ImageDetections};

fn main() -> Result<()> {
    init_logging(log::LevelFilter::Info)?;
    let args = DetectArgs::parse();

    let input_path = normalize_path(&args.input)?;
    let annotate_dir = prepare_output_dir(args.annotate.as_ref())?;
    let annotate_raw_dir = prepare_output_dir(args.annotate_raw.as_ref())?;

    let mut settings = load_settings(args.config.as_ref())?;
    apply_cli_overrides(&mut settings, &args);
    configure_telemetry(
        settings.telemetry.enabled,
        settings.telemetry.level_filter(),
    );

    let model_path = settings
        .model_path
        .as_deref()
        .context("no model path configured; pass --model or set model_path in settings")?;
    let model_path = normalize_path(model_path)?;
    info!("Loading linear SVM from {}", model_path.display());
    let detector = build_cli_detector(&model_path, &settings)?;

    let images = collect_targets(&input_path)?;

    info!("Processing {} image(s)...", images.len());
    let _batch_guard = timing_guard("slidescan_cli::batch", log::Level::Info);
    let mut results = Vec::with_capacity(images.len());
    for image_path in images {
        match detector.detect_path(&image_path) {
            Ok(output) => {
                info!(
                    "{} -> {} detection(s) from {} candidate(s)",
                    image_path.display(),
                    output.detections.len(),
                    output.raw.len()
                );
                let annotated = write_annotation(
                    &image_path,
                    output.detections.as_slice(),
                    DETECTION_COLOR,
                    annotate_dir.as_deref(),
                );
                let annotated_raw = write_annotation(
                    &image_path,
                    output.raw.as_slice(),
                    RAW_COLOR,
                    annotate_raw_dir.as_deref(),
                );

                results.push(ImageDetections {
                    image: image_path.display().to_string(),
                    detections: output.detections.iter().map(DetectionRecord::from).collect(),
                    raw_count: output.raw.len(),
                    annotated,
                    annotated_raw,
                });
            }
            Err(err) => {
                warn!("Failed to process {}: {err:#}", image_path.display());
            }
        }
    }

    if results.is_empty() {
        anyhow::bail!("all detections failed; cannot produce output");
    }

    if let Some(json_path) = args.json.as_ref() {
        if let Some(dir) = json_path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }
        let file = File::create(json_path)
            .with_context(|| format!("failed to create {}", json_path.display()))?;
        serde_json::to_writer_pretty(file, &results).with_context(|| {
            format!("failed to write detection JSON to {}", json_path.display())
        })?;
        info!("Wrote detections to {}", json_path.display());
    } else {
        let json =
            serde_json::to_string_pretty(&results).context("failed to serialize detections")?;
        println!("{json}");
    }

    Ok(())
}

fn prepare_output_dir(dir: Option<&PathBuf>) -> Result<Option<PathBuf>> {
    let Some(dir) = dir else {
        return Ok(None);
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create annotation directory {}", dir.display()))?;
    Ok(Some(normalize_path(dir)?))
}

/// Annotate into `dir` when requested; failures are logged, not fatal.
fn write_annotation(
    image_path: &Path,
    detections: &[DetectionCandidate],
    color: image::Rgba<u8>,
    dir: Option<&Path>,
) -> Option<String> {
    let dir = dir?;
    match annotate_image(image_path, detections, color, dir) {
        Ok(path) => {
            info!("Annotated image saved to {}", path.display());
            Some(path.display().to_string())
        }
        Err(err) => {
            warn!("Failed to annotate {}: {err:#}", image_path.display());
            None
        }
    }
}
