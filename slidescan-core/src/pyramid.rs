//! Lazy multi-scale image pyramid.
//!
//! Level 0 is the input image itself. Every further level shrinks the width
//! of the previous one by the scale factor (rounding down) and derives the
//! height from the aspect ratio of the previous level, also rounding down.
//! The sequence ends at the first level that would fall below the minimum
//! size; that level is never produced.
//!
//! Pixels for level `i` are resampled directly from the original image at
//! the chained size, so at most one downscaled buffer is alive per consumer.

use std::borrow::Cow;

use image::GrayImage;
use slidescan_utils::{
    config::{PyramidSettings, ResizeQuality},
    proportional_height, resize_filter, resize_gray,
};

use crate::window::Size;

/// Shape of the pyramid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PyramidConfig {
    /// Ratio between consecutive level widths; must be greater than 1.
    pub scale_factor: f64,
    /// Smallest level that is still produced.
    pub min_size: Size,
    pub resize_quality: ResizeQuality,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        PyramidConfig::from(&PyramidSettings::default())
    }
}

impl From<&PyramidSettings> for PyramidConfig {
    fn from(settings: &PyramidSettings) -> Self {
        Self {
            scale_factor: f64::from(settings.downscale),
            min_size: Size::new(settings.min_width, settings.min_height),
            resize_quality: settings.resize_quality,
        }
    }
}

impl PyramidConfig {
    /// Cumulative scale of level `index` relative to the original image.
    pub fn level_scale(&self, index: u32) -> f64 {
        self.scale_factor.powi(index as i32)
    }

    /// Size of the level after one of `width` x `height`.
    fn next_size(&self, width: u32, height: u32) -> (u32, u32) {
        let next_width = (f64::from(width) / self.scale_factor).floor() as u32;
        (next_width, proportional_height(width, height, next_width))
    }
}

/// Iterator over `(scale_index, width, height)` of every pyramid level,
/// without touching pixels.
#[derive(Debug, Clone)]
pub struct LevelSizes {
    config: PyramidConfig,
    next: Option<(u32, u32, u32)>,
}

impl LevelSizes {
    pub fn new(width: u32, height: u32, config: PyramidConfig) -> Self {
        Self {
            config,
            next: Some((0, width, height)),
        }
    }
}

impl Iterator for LevelSizes {
    type Item = (u32, u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let (index, width, height) = self.next.take()?;
        let (next_width, next_height) = self.config.next_size(width, height);
        let shrinks = next_width < width;
        let large_enough =
            next_width >= self.config.min_size.width && next_height >= self.config.min_size.height;
        // A factor that does not shrink the width would never terminate.
        if shrinks && large_enough && next_width > 0 && next_height > 0 {
            self.next = Some((index + 1, next_width, next_height));
        }
        Some((index, width, height))
    }
}

impl std::iter::FusedIterator for LevelSizes {}

/// Dimensions of every level the pyramid of a `width` x `height` image yields.
pub fn level_sizes(width: u32, height: u32, config: PyramidConfig) -> Vec<(u32, u32)> {
    LevelSizes::new(width, height, config)
        .map(|(_, w, h)| (w, h))
        .collect()
}

/// One pyramid level. Level 0 borrows the original image.
#[derive(Debug, Clone)]
pub struct PyramidLevel<'a> {
    pub scale_index: u32,
    pub image: Cow<'a, GrayImage>,
}

impl PyramidLevel<'_> {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Lazy, finite sequence of pyramid levels. See [`pyramid`].
pub struct Pyramid<'a> {
    source: &'a GrayImage,
    config: PyramidConfig,
    sizes: LevelSizes,
}

impl<'a> Pyramid<'a> {
    pub fn config(&self) -> &PyramidConfig {
        &self.config
    }
}

impl<'a> Iterator for Pyramid<'a> {
    type Item = PyramidLevel<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (scale_index, width, height) = self.sizes.next()?;
        let image = if scale_index == 0 {
            Cow::Borrowed(self.source)
        } else {
            let filter = resize_filter(self.config.resize_quality);
            Cow::Owned(resize_gray(self.source, width, height, filter))
        };
        log::trace!("pyramid level {scale_index}: {width}x{height}");
        Some(PyramidLevel { scale_index, image })
    }
}

impl std::iter::FusedIterator for Pyramid<'_> {}

/// Build the pyramid of `image`.
///
/// The first level is always the input, regardless of the minimum size.
pub fn pyramid(image: &GrayImage, config: PyramidConfig) -> Pyramid<'_> {
    let (width, height) = image.dimensions();
    Pyramid {
        source: image,
        config,
        sizes: LevelSizes::new(width, height, config),
    }
}
