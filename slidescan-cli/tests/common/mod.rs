/// Common test utilities for CLI integration tests
use std::{error::Error, fs, path::Path, path::PathBuf};

use assert_cmd::{Command, cargo::cargo_bin_cmd};
use image::{ImageBuffer, Rgb};
use serde::Deserialize;
use slidescan_utils::fixture_path;

#[derive(Debug, Deserialize)]
pub struct CliDetection {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}

#[derive(Debug, Deserialize)]
pub struct CliImage {
    pub image: String,
    pub detections: Vec<CliDetection>,
    pub raw_count: usize,
    pub annotated: Option<String>,
    pub annotated_raw: Option<String>,
}

pub fn model(name: &str) -> PathBuf {
    fixture_path(format!("models/{name}.json")).expect("model fixture should exist")
}

pub fn tiny_config() -> PathBuf {
    fixture_path("config/tiny_window.json").expect("settings fixture should exist")
}

/// Write a 32x32 colour test image.
pub fn write_sample_image(path: &Path) -> Result<(), Box<dyn Error>> {
    let img = ImageBuffer::from_fn(32, 32, |x, y| {
        let r = ((x * 7 + y * 3) % 255) as u8;
        Rgb([r, 128, 255u8.saturating_sub(r)])
    });
    img.save(path)?;
    Ok(())
}

/// Base command: tiny settings plus the given model and JSON output path.
pub fn detect_cmd(input: &Path, model_name: &str, json_path: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("slidescan-cli");
    cmd.arg("--input")
        .arg(input)
        .arg("--config")
        .arg(tiny_config())
        .arg("--model")
        .arg(model(model_name))
        .arg("--json")
        .arg(json_path);
    cmd
}

pub fn read_results(json_path: &Path) -> Result<Vec<CliImage>, Box<dyn Error>> {
    let payload = fs::read_to_string(json_path)?;
    Ok(serde_json::from_str(&payload)?)
}
