//! Common helpers shared across slidescan crates.

/// Run settings and JSON persistence.
pub mod config;
/// Test fixture loading and path resolution.
pub mod fixtures;
/// Image loading and resizing.
pub mod image_utils;
/// Instrumentation helpers for optional performance tracing.
pub mod telemetry;

use std::path::Path;

use anyhow::Result;
use log::LevelFilter;

pub use fixtures::{fixture_path, fixtures_dir, load_fixture_json};
pub use image_utils::{
    load_grayscale, load_image, proportional_height, resize_filter, resize_gray,
};
pub use telemetry::{
    TELEMETRY_TARGET, TimingGuard, configure as configure_telemetry, telemetry_allows,
    telemetry_enabled, telemetry_level, timing_guard, timing_guard_if,
};

/// Initialize logging once.
///
/// `RUST_LOG` takes precedence; otherwise `default_filter` is used. The
/// telemetry target is always let through so `--telemetry` works without
/// touching `RUST_LOG`.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module(TELEMETRY_TARGET, LevelFilter::Trace);

    // A second call (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
    Ok(())
}

/// Validate that a path exists and resolve it to an absolute path.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<std::path::PathBuf> {
    let path = path.as_ref();
    anyhow::ensure!(path.exists(), "path does not exist: {}", path.display());
    Ok(path.canonicalize()?)
}
