//! Detector construction from resolved settings.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use slidescan_core::{
    DetectorConfig, HogDescriptor, HogSvmClassifier, LinearSvm, Size, SlidingWindowDetector,
};
use slidescan_utils::config::AppSettings;

pub type CliDetector = SlidingWindowDetector<HogSvmClassifier>;

/// Load the SVM at `model_path` and couple it with the HOG layout and scan
/// parameters from `settings`.
pub fn build_cli_detector(model_path: &Path, settings: &AppSettings) -> Result<CliDetector> {
    let svm = LinearSvm::load(model_path)?;
    let hog = HogDescriptor::from(&settings.hog);
    let window = Size::new(settings.window.width, settings.window.height);
    let classifier = HogSvmClassifier::new(hog, svm, window).with_context(|| {
        format!(
            "model {} does not fit the configured window and HOG layout",
            model_path.display()
        )
    })?;

    let config = DetectorConfig::from(settings);
    let detector = SlidingWindowDetector::new(config, classifier)?;
    info!(
        "Scanning with a {}x{} window every {}x{} px, downscale {} down to {}x{}",
        window.width,
        window.height,
        settings.window.step_x,
        settings.window.step_y,
        settings.pyramid.downscale,
        settings.pyramid.min_width,
        settings.pyramid.min_height
    );
    Ok(detector)
}
