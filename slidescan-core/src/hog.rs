//! Histogram-of-oriented-gradients descriptor for grayscale windows.
//!
//! The layout matches the classic Dalal–Triggs formulation: centred
//! gradients, unsigned orientation bins over `[0, 180)` degrees, per-cell
//! histograms averaged over the cell area, and overlapping blocks
//! normalised with L2-Hys. Descriptor values are laid out block by block
//! (row-major), then cell by cell within a block, then by orientation.

use anyhow::{Result, anyhow, ensure};
use image::{GenericImageView, Luma};
use ndarray::{Array1, Array2, Array3, s};
use slidescan_utils::config::HogSettings;

use crate::window::{Patch, Size};

const L2_HYS_CLIP: f32 = 0.2;
const NORM_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HogDescriptor {
    pub orientations: usize,
    pub pixels_per_cell: Size,
    pub cells_per_block: Size,
    /// Square-root gamma compression of intensities before gradients.
    pub transform_sqrt: bool,
}

impl Default for HogDescriptor {
    fn default() -> Self {
        HogDescriptor::from(&HogSettings::default())
    }
}

impl From<&HogSettings> for HogDescriptor {
    fn from(settings: &HogSettings) -> Self {
        Self {
            orientations: settings.orientations,
            // Settings are `[rows, cols]`.
            pixels_per_cell: Size::new(settings.pixels_per_cell[1], settings.pixels_per_cell[0]),
            cells_per_block: Size::new(settings.cells_per_block[1], settings.cells_per_block[0]),
            transform_sqrt: settings.transform_sqrt,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    cells: (usize, usize),
    blocks: (usize, usize),
}

impl HogDescriptor {
    fn layout(&self, window: Size) -> Option<Layout> {
        if self.orientations == 0 || self.pixels_per_cell.is_empty() || self.cells_per_block.is_empty()
        {
            return None;
        }
        let cells_x = (window.width / self.pixels_per_cell.width) as usize;
        let cells_y = (window.height / self.pixels_per_cell.height) as usize;
        let block_w = self.cells_per_block.width as usize;
        let block_h = self.cells_per_block.height as usize;
        if cells_x < block_w || cells_y < block_h {
            return None;
        }
        Some(Layout {
            cells: (cells_x, cells_y),
            blocks: (cells_x - block_w + 1, cells_y - block_h + 1),
        })
    }

    /// Check that windows of `window` size produce at least one block.
    pub fn validate(&self, window: Size) -> Result<()> {
        ensure!(self.orientations > 0, "HOG needs at least one orientation bin");
        ensure!(
            !self.pixels_per_cell.is_empty() && !self.cells_per_block.is_empty(),
            "HOG cell and block sizes must be positive"
        );
        self.layout(window).map(|_| ()).ok_or_else(|| {
            anyhow!(
                "a {}x{} window holds no {}x{}-cell block of {}x{} pixels",
                window.width,
                window.height,
                self.cells_per_block.width,
                self.cells_per_block.height,
                self.pixels_per_cell.width,
                self.pixels_per_cell.height
            )
        })
    }

    /// Length of the descriptor for `window`, or zero when it has no block.
    pub fn descriptor_len(&self, window: Size) -> usize {
        self.layout(window).map_or(0, |layout| {
            layout.blocks.0
                * layout.blocks.1
                * self.cells_per_block.width as usize
                * self.cells_per_block.height as usize
                * self.orientations
        })
    }

    /// Compute the descriptor of a window cut from a scanned level.
    pub fn compute_patch(&self, patch: &Patch<'_>) -> Result<Array1<f32>> {
        self.compute(&**patch)
    }

    /// Compute the descriptor of one grayscale patch.
    pub fn compute<I>(&self, patch: &I) -> Result<Array1<f32>>
    where
        I: GenericImageView<Pixel = Luma<u8>>,
    {
        let (width, height) = patch.dimensions();
        let size = Size::new(width, height);
        self.validate(size)?;
        let layout = self
            .layout(size)
            .ok_or_else(|| anyhow!("patch {width}x{height} is too small for HOG"))?;

        let intensity = self.intensities(patch);
        let histograms = self.cell_histograms(&intensity, layout);
        Ok(self.normalize_blocks(&histograms, layout))
    }

    fn intensities<I>(&self, patch: &I) -> Array2<f32>
    where
        I: GenericImageView<Pixel = Luma<u8>>,
    {
        let (width, height) = patch.dimensions();
        let mut intensity = Array2::<f32>::zeros((height as usize, width as usize));
        for (x, y, pixel) in patch.pixels() {
            let value = f32::from(pixel.0[0]) / 255.0;
            intensity[(y as usize, x as usize)] = if self.transform_sqrt {
                value.sqrt()
            } else {
                value
            };
        }
        intensity
    }

    fn cell_histograms(&self, intensity: &Array2<f32>, layout: Layout) -> Array3<f32> {
        let (rows, cols) = intensity.dim();
        let cell_w = self.pixels_per_cell.width as usize;
        let cell_h = self.pixels_per_cell.height as usize;
        let (cells_x, cells_y) = layout.cells;
        let bins = self.orientations;
        let bin_width = 180.0 / bins as f32;

        let mut histograms = Array3::<f32>::zeros((cells_y, cells_x, bins));
        for y in 0..cells_y * cell_h {
            for x in 0..cells_x * cell_w {
                // Centred differences; the outermost pixels get no gradient.
                let gx = if x > 0 && x + 1 < cols {
                    intensity[(y, x + 1)] - intensity[(y, x - 1)]
                } else {
                    0.0
                };
                let gy = if y > 0 && y + 1 < rows {
                    intensity[(y + 1, x)] - intensity[(y - 1, x)]
                } else {
                    0.0
                };
                let magnitude = gx.hypot(gy);
                if magnitude == 0.0 {
                    continue;
                }
                let mut angle = gy.atan2(gx).to_degrees();
                if angle < 0.0 {
                    angle += 180.0;
                }
                if angle >= 180.0 {
                    angle -= 180.0;
                }
                let bin = ((angle / bin_width) as usize).min(bins - 1);
                histograms[(y / cell_h, x / cell_w, bin)] += magnitude;
            }
        }
        histograms /= (cell_w * cell_h) as f32;
        histograms
    }

    fn normalize_blocks(&self, histograms: &Array3<f32>, layout: Layout) -> Array1<f32> {
        let block_w = self.cells_per_block.width as usize;
        let block_h = self.cells_per_block.height as usize;
        let block_len = block_w * block_h * self.orientations;
        let (blocks_x, blocks_y) = layout.blocks;

        let mut descriptor = Array1::<f32>::zeros(blocks_x * blocks_y * block_len);
        let mut offset = 0;
        for by in 0..blocks_y {
            for bx in 0..blocks_x {
                let block = histograms.slice(s![by..by + block_h, bx..bx + block_w, ..]);
                let mut values: Vec<f32> = block.iter().copied().collect();
                l2_hys(&mut values);
                descriptor
                    .slice_mut(s![offset..offset + block_len])
                    .iter_mut()
                    .zip(&values)
                    .for_each(|(dst, src)| *dst = *src);
                offset += block_len;
            }
        }
        descriptor
    }
}

fn l2_normalize(values: &mut [f32]) {
    let norm = (values.iter().map(|v| v * v).sum::<f32>() + NORM_EPSILON * NORM_EPSILON).sqrt();
    values.iter_mut().for_each(|v| *v /= norm);
}

/// L2 normalisation, clipping at 0.2, then renormalisation.
fn l2_hys(values: &mut [f32]) {
    l2_normalize(values);
    values.iter_mut().for_each(|v| *v = v.min(L2_HYS_CLIP));
    l2_normalize(values);
}
