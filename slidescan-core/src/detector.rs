use std::path::Path;

use anyhow::{Result, ensure};
use image::GrayImage;
use slidescan_utils::{config::AppSettings, load_grayscale, timing_guard};

use crate::aggregate::DetectionSet;
use crate::classifier::Classifier;
use crate::nms::{GreedyNms, Suppression};
use crate::scan::{ScanConfig, ScanObserver, ScanStats, Scanner};

/// Full configuration of a detector: scan parameters plus the overlap
/// threshold handed to suppression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    pub scan: ScanConfig,
    pub nms_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig::from(&AppSettings::default())
    }
}

impl From<&AppSettings> for DetectorConfig {
    fn from(settings: &AppSettings) -> Self {
        Self {
            scan: ScanConfig::from(settings),
            nms_threshold: settings.detection.nms_threshold,
        }
    }
}

/// Result of running the detector on one image.
///
/// Both candidate lists are in original-image coordinates.
#[derive(Debug, Clone)]
pub struct DetectionOutput {
    /// Every accepted window in scan order, before suppression.
    pub raw: DetectionSet,
    /// Candidates that survived suppression.
    pub detections: DetectionSet,
    /// The original dimensions of the input image.
    pub original_size: (u32, u32),
    pub stats: ScanStats,
}

/// Couples a scanner with a classifier and a suppression routine.
///
/// This is the main entry point for running detection on one image at a time.
#[derive(Debug)]
pub struct SlidingWindowDetector<C, S = GreedyNms> {
    scanner: Scanner,
    classifier: C,
    suppression: S,
    nms_threshold: f32,
}

impl<C: Classifier> SlidingWindowDetector<C, GreedyNms> {
    /// Construct a detector that uses greedy NMS.
    ///
    /// # Arguments
    ///
    /// * `config` - Scan parameters and the suppression overlap threshold.
    /// * `classifier` - Window classifier.
    pub fn new(config: DetectorConfig, classifier: C) -> Result<Self> {
        Self::with_suppression(config, classifier, GreedyNms)
    }
}

impl<C: Classifier, S: Suppression> SlidingWindowDetector<C, S> {
    /// Construct a detector with a custom suppression routine.
    pub fn with_suppression(config: DetectorConfig, classifier: C, suppression: S) -> Result<Self> {
        ensure!(
            config.nms_threshold.is_finite() && (0.0..=1.0).contains(&config.nms_threshold),
            "overlap threshold must be within [0, 1] (got {})",
            config.nms_threshold
        );
        let scanner = Scanner::new(config.scan)?;
        Ok(Self {
            scanner,
            classifier,
            suppression,
            nms_threshold: config.nms_threshold,
        })
    }

    /// Run detection on an image file; it is converted to 8-bit grayscale.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the image file.
    pub fn detect_path<P: AsRef<Path>>(&self, path: P) -> Result<DetectionOutput> {
        let _guard = timing_guard("slidescan_core::detect_path", log::Level::Debug);
        let image = {
            let _guard = timing_guard("slidescan_core::load_image", log::Level::Trace);
            load_grayscale(path)?
        };
        self.detect_image(&image)
    }

    /// Run detection on an in-memory grayscale image.
    pub fn detect_image(&self, image: &GrayImage) -> Result<DetectionOutput> {
        self.detect_image_observed(image, crate::scan::NoopObserver)
    }

    /// Like [`detect_image`](Self::detect_image), reporting scan progress to
    /// `observer`.
    pub fn detect_image_observed<O: ScanObserver>(
        &self,
        image: &GrayImage,
        observer: O,
    ) -> Result<DetectionOutput> {
        let _guard = timing_guard("slidescan_core::detect_image", log::Level::Debug);

        let (raw, stats) = {
            let _guard = timing_guard("slidescan_core::scan", log::Level::Debug);
            let mut scan = self
                .scanner
                .scan_observed(image, &self.classifier, observer);
            let raw = DetectionSet::collect(&mut scan)?;
            (raw, scan.stats())
        };

        let detections = {
            let _guard = timing_guard("slidescan_core::suppress", log::Level::Debug);
            raw.clone().suppress(&self.suppression, self.nms_threshold)
        };

        log::debug!(
            "{}x{} image: {} raw candidate(s), {} detection(s)",
            image.width(),
            image.height(),
            raw.len(),
            detections.len()
        );

        Ok(DetectionOutput {
            raw,
            detections,
            original_size: image.dimensions(),
            stats,
        })
    }

    /// Access the validated scan configuration.
    pub fn scan_config(&self) -> &ScanConfig {
        self.scanner.config()
    }

    pub fn nms_threshold(&self) -> f32 {
        self.nms_threshold
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }
}
