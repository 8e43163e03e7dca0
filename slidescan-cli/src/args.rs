//! Command-line argument definitions for slidescan-cli.

use clap::{ArgAction, Parser};
use slidescan_utils::config::ResizeQuality;
use std::path::PathBuf;

/// Run multi-scale sliding-window detection over images or directories.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct DetectArgs {
    /// Path to an image file or a directory containing images.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Path to the linear SVM model JSON (overrides `model_path` from settings).
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Optional settings JSON. Defaults to `config/slidescan.json` when present, otherwise built-in parameters.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable telemetry timing logs (defaults to settings file).
    #[arg(long, action = ArgAction::SetTrue)]
    pub telemetry: bool,

    /// Override telemetry logging level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub telemetry_level: Option<String>,

    /// Override window width (pixels).
    #[arg(long)]
    pub window_width: Option<u32>,

    /// Override window height (pixels).
    #[arg(long)]
    pub window_height: Option<u32>,

    /// Override horizontal step between windows (pixels).
    #[arg(long)]
    pub step_x: Option<u32>,

    /// Override vertical step between windows (pixels).
    #[arg(long)]
    pub step_y: Option<u32>,

    /// Override the pyramid downscale factor (must be greater than 1).
    #[arg(long)]
    pub downscale: Option<f32>,

    /// Override the smallest pyramid level width (pixels).
    #[arg(long)]
    pub min_width: Option<u32>,

    /// Override the smallest pyramid level height (pixels).
    #[arg(long)]
    pub min_height: Option<u32>,

    /// Resize quality mode for pyramid levels: `quality` (Triangle) or `speed` (Nearest).
    #[arg(long, value_name = "MODE")]
    pub resize_quality: Option<ResizeQuality>,

    /// Override the minimum classifier confidence for a detection.
    #[arg(long)]
    pub score_threshold: Option<f32>,

    /// Override the overlap threshold used by non-maximum suppression.
    #[arg(long)]
    pub nms_threshold: Option<f32>,

    /// Write detections to a JSON file instead of stdout.
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Directory to write images with the final detections overlaid.
    #[arg(long)]
    pub annotate: Option<PathBuf>,

    /// Directory to write images with every candidate before suppression overlaid.
    #[arg(long)]
    pub annotate_raw: Option<PathBuf>,
}
