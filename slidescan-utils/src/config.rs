//! Shared configuration types consumed across the slidescan workspace.
//!
//! These structures describe one detection run (window geometry, pyramid
//! shape, thresholds, HOG layout) and can be serialized to disk so the same
//! parameters are reused between runs.

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Sliding-window geometry in pixels.
///
/// The window is the fixed patch size handed to the classifier; the step is
/// the offset between neighbouring windows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub step_x: u32,
    pub step_y: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 100,
            height: 40,
            step_x: 10,
            step_y: 10,
        }
    }
}

/// Resize filter preference used when building pyramid levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeQuality {
    /// Smooth downscaling (Triangle filter).
    #[default]
    Quality,
    /// Nearest-neighbour downscaling for throughput.
    Speed,
}

impl fmt::Display for ResizeQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ResizeQuality::Quality => "quality",
                ResizeQuality::Speed => "speed",
            }
        )
    }
}

impl FromStr for ResizeQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quality" => Ok(ResizeQuality::Quality),
            "speed" => Ok(ResizeQuality::Speed),
            other => Err(format!(
                "invalid resize quality '{other}'; expected 'quality' or 'speed'"
            )),
        }
    }
}

/// Image pyramid parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PyramidSettings {
    /// Ratio between consecutive level widths (must be greater than 1).
    pub downscale: f32,
    /// Levels narrower than this are never produced.
    pub min_width: u32,
    /// Levels shorter than this are never produced.
    pub min_height: u32,
    pub resize_quality: ResizeQuality,
}

impl Default for PyramidSettings {
    fn default() -> Self {
        Self {
            downscale: 1.25,
            min_width: 100,
            min_height: 40,
            resize_quality: ResizeQuality::Quality,
        }
    }
}

/// Thresholds applied to classifier verdicts and to duplicate suppression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionSettings {
    /// Minimum classifier confidence for a positive window to become a candidate.
    pub score_threshold: f32,
    /// Overlap (IoU) above which a lower-confidence candidate is suppressed.
    pub nms_threshold: f32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            nms_threshold: 0.3,
        }
    }
}

/// Histogram-of-oriented-gradients layout used by the reference classifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HogSettings {
    pub orientations: usize,
    /// Cell size in pixels as `[rows, cols]`, i.e. `[height, width]`.
    pub pixels_per_cell: [u32; 2],
    /// Block size in cells as `[rows, cols]`, i.e. `[height, width]`.
    pub cells_per_block: [u32; 2],
    /// Apply square-root gamma compression before computing gradients.
    pub transform_sqrt: bool,
}

impl Default for HogSettings {
    fn default() -> Self {
        Self {
            orientations: 9,
            pixels_per_cell: [8, 8],
            cells_per_block: [3, 3],
            transform_sqrt: true,
        }
    }
}

/// Settings controlling optional runtime telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Whether telemetry timing logs are enabled.
    pub enabled: bool,
    /// Logging level for telemetry output (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

impl TelemetrySettings {
    /// Resolve the configured level string into a `LevelFilter`.
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Debug,
        }
    }
}

/// Persistent settings for one detection run.
///
/// Loaded from JSON, then overridden from the command line; after that the
/// values are treated as immutable for the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Path to the linear SVM model JSON.
    pub model_path: Option<String>,
    pub window: WindowSettings,
    pub pyramid: PyramidSettings,
    pub detection: DetectionSettings,
    pub hog: HogSettings,
    pub telemetry: TelemetrySettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            model_path: Some("models/linear_svm.json".into()),
            window: WindowSettings::default(),
            pyramid: PyramidSettings::default(),
            detection: DetectionSettings::default(),
            hog: HogSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

impl AppSettings {
    /// Load settings from a JSON file.
    ///
    /// Missing sections fall back to their defaults. If `model_path` is
    /// absent the default model location is used.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let mut settings: AppSettings = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))?;

        if settings.model_path.is_none() {
            settings.model_path = AppSettings::default().model_path;
        }

        Ok(settings)
    }

    /// Serialize settings to disk in pretty-printed JSON.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize settings JSON")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write settings file {}", path.display()))?;
        Ok(())
    }
}

/// Returns the default path for persisted settings (`config/slidescan.json`).
pub fn default_settings_path() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join("config/slidescan.json"))
        .unwrap_or_else(|_| PathBuf::from("config/slidescan.json"))
}
