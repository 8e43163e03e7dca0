//! Multi-scale sliding-window object detection.
//!
//! An image is turned into a pyramid of progressively smaller copies, each
//! level is sampled with a fixed-size window, every full window is handed to
//! a [`Classifier`], accepted windows are mapped back to original-image
//! coordinates and the resulting candidates are collapsed by a
//! [`Suppression`] routine. [`HogSvmClassifier`] is the stock classifier.

/// Candidate collection for one image.
pub mod aggregate;
/// Detection boxes and overlap geometry.
pub mod candidate;
/// The window classifier seam.
pub mod classifier;
/// High-level detection runner.
pub mod detector;
pub mod error;
/// HOG feature extraction.
pub mod hog;
/// Non-maximum suppression.
pub mod nms;
/// Image pyramid construction.
pub mod pyramid;
/// The multi-scale scan engine.
pub mod scan;
/// Linear SVM model loading and scoring.
pub mod svm;
/// Sliding-window sampling.
pub mod window;

pub use aggregate::DetectionSet;
pub use candidate::DetectionCandidate;
pub use classifier::{Classifier, FnClassifier, Label, Verdict, classify_fn};
pub use detector::{DetectionOutput, DetectorConfig, SlidingWindowDetector};
pub use error::ScanError;
pub use hog::HogDescriptor;
pub use nms::{GreedyNms, Suppression};
pub use pyramid::{LevelSizes, Pyramid, PyramidConfig, PyramidLevel, level_sizes, pyramid};
pub use scan::{
    LevelView, NoopObserver, Scan, ScanConfig, ScanObserver, ScanStats, Scanner, WindowEvent,
};
pub use svm::{HogSvmClassifier, LinearSvm};
pub use window::{Patch, Size, SlidingWindows, Window, WindowGrid, sliding_window};

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
