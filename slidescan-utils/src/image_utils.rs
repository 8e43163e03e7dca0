use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage, imageops::FilterType};

use crate::config::ResizeQuality;

/// Load an image from disk into memory.
///
/// # Arguments
///
/// * `path` - The path to the image file.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path_ref = path.as_ref();
    image::open(path_ref).with_context(|| format!("failed to open image {}", path_ref.display()))
}

/// Load an image from disk and convert it to 8-bit luminance.
pub fn load_grayscale<P: AsRef<Path>>(path: P) -> Result<GrayImage> {
    Ok(load_image(path)?.to_luma8())
}

/// Map the configured resize preference onto an `image` filter.
pub fn resize_filter(quality: ResizeQuality) -> FilterType {
    match quality {
        ResizeQuality::Quality => FilterType::Triangle,
        ResizeQuality::Speed => FilterType::Nearest,
    }
}

/// Resize a grayscale image to exactly `width` x `height`.
pub fn resize_gray(image: &GrayImage, width: u32, height: u32, filter: FilterType) -> GrayImage {
    image::imageops::resize(image, width, height, filter)
}

/// Height that keeps the aspect ratio when an image of `width` x `height`
/// is resized to `new_width`.
///
/// Computed in integer arithmetic and rounded down, so repeated shrinking
/// gives the same chain of sizes on every platform.
pub fn proportional_height(width: u32, height: u32, new_width: u32) -> u32 {
    if width == 0 {
        return 0;
    }
    (u64::from(height) * u64::from(new_width) / u64::from(width)) as u32
}
