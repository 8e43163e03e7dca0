//! Fixed-size window sampling over a single image.
//!
//! Window origins advance in row-major order (`y` outer, `x` inner) for as
//! long as the origin itself lies inside the image. Windows near the right
//! and bottom edges are therefore truncated rather than padded; filtering
//! those out is the caller's job.

use image::{GenericImageView, GrayImage, SubImage, imageops};

/// Borrowed view of one window inside a grayscale image.
pub type Patch<'a> = SubImage<&'a GrayImage>;

/// Positive `(width, height)` pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` when either side is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// `true` when a window of this size fits inside `width` x `height`.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width <= width && self.height <= height
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

/// Row-major iterator over window origins.
///
/// Yields `(x, y)` for `y = 0, step.height, ...` while `y < height` and,
/// within each row, `x = 0, step.width, ...` while `x < width`. A zero step
/// component yields nothing.
#[derive(Debug, Clone)]
pub struct WindowGrid {
    width: u32,
    height: u32,
    step: Size,
    x: u32,
    y: u32,
}

impl WindowGrid {
    pub fn new(width: u32, height: u32, step: Size) -> Self {
        Self {
            width,
            height,
            step,
            x: 0,
            y: 0,
        }
    }

    fn exhausted(&self) -> bool {
        self.step.is_empty() || self.width == 0 || self.y >= self.height
    }

    fn remaining(&self) -> usize {
        if self.exhausted() {
            return 0;
        }
        let per_row = self.width.div_ceil(self.step.width) as usize;
        let rows_left = (self.height - self.y).div_ceil(self.step.height) as usize;
        let done_in_row = (self.x / self.step.width) as usize;
        rows_left * per_row - done_in_row
    }
}

impl Iterator for WindowGrid {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted() {
            return None;
        }
        let origin = (self.x, self.y);
        match self.x.checked_add(self.step.width) {
            Some(next_x) if next_x < self.width => self.x = next_x,
            _ => {
                self.x = 0;
                self.y = self.y.saturating_add(self.step.height);
            }
        }
        Some(origin)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for WindowGrid {}

/// One sampled window: its top-left origin and the (possibly truncated) patch.
pub struct Window<'a> {
    pub x: u32,
    pub y: u32,
    pub patch: Patch<'a>,
}

impl Window<'_> {
    /// `true` when the patch has exactly the requested window size.
    pub fn is_full(&self, size: Size) -> bool {
        self.patch.dimensions() == (size.width, size.height)
    }
}

/// Lazy sequence of windows over one image. See [`sliding_window`].
pub struct SlidingWindows<'a> {
    image: &'a GrayImage,
    window: Size,
    grid: WindowGrid,
}

impl<'a> Iterator for SlidingWindows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (x, y) = self.grid.next()?;
        Some(Window {
            x,
            y,
            patch: crop_window(self.image, x, y, self.window),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.grid.size_hint()
    }
}

impl ExactSizeIterator for SlidingWindows<'_> {}

/// Sample `image` with a `window`-sized patch every `step` pixels.
///
/// Patches are zero-copy views. Patches that would cross the right or bottom
/// border are truncated to the image, so their size can be smaller than
/// `window`.
pub fn sliding_window(image: &GrayImage, window: Size, step: Size) -> SlidingWindows<'_> {
    let (width, height) = image.dimensions();
    SlidingWindows {
        image,
        window,
        grid: WindowGrid::new(width, height, step),
    }
}

/// Crop a window at `(x, y)`, truncated at the image border.
pub(crate) fn crop_window(image: &GrayImage, x: u32, y: u32, window: Size) -> Patch<'_> {
    imageops::crop_imm(image, x, y, window.width, window.height)
}
