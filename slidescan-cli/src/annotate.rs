//! Image annotation functionality for drawing detections.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use slidescan_core::DetectionCandidate;
use slidescan_utils::load_image;

/// Outline colour for final detections.
pub const DETECTION_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
/// Outline colour for candidates before suppression.
pub const RAW_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Draw detections on a colour copy of an image and save it to a directory
/// under the same file name.
pub fn annotate_image(
    image_path: &Path,
    detections: &[DetectionCandidate],
    color: Rgba<u8>,
    output_dir: &Path,
) -> Result<PathBuf> {
    let mut image = load_image(image_path)?.to_rgba8();
    let (img_w, img_h) = image.dimensions();

    if img_w == 0 || img_h == 0 {
        anyhow::bail!(
            "cannot annotate image with zero dimensions: {}",
            image_path.display()
        );
    }

    draw_detections(&mut image, detections, color);

    let file_name = image_path
        .file_name()
        .with_context(|| format!("image path has no file name: {}", image_path.display()))?;
    let output_path = output_dir.join(file_name);

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    image
        .save(&output_path)
        .with_context(|| format!("failed to save annotated image {}", output_path.display()))?;

    Ok(output_path)
}

/// Outline every detection on `image`.
pub fn draw_detections(image: &mut RgbaImage, detections: &[DetectionCandidate], color: Rgba<u8>) {
    let (img_w, img_h) = image.dimensions();
    for detection in detections {
        if let Some(rect) = rect_from_candidate(detection, img_w, img_h) {
            draw_hollow_rect_mut(image, rect, color);
        }
    }
}

/// Convert a candidate to an `imageproc` rectangle clipped to the image.
/// Returns `None` when nothing of it is visible.
fn rect_from_candidate(candidate: &DetectionCandidate, img_w: u32, img_h: u32) -> Option<Rect> {
    if candidate.x >= img_w || candidate.y >= img_h {
        return None;
    }
    let width = candidate.width.min(img_w - candidate.x).max(1);
    let height = candidate.height.min(img_h - candidate.y).max(1);
    Some(Rect::at(candidate.x as i32, candidate.y as i32).of_size(width, height))
}
