use ndarray::{s, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{Result, XPlanarError};

/// Number of pixels removed from each side of the detector before any
/// per-pixel field is materialized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Crop {
    pub left: usize,
    pub right: usize,
    pub top: usize,
    pub bottom: usize,
}

impl Crop {
    pub fn new(left: usize, right: usize, top: usize, bottom: usize) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// Keep only columns `[start, end)` of a `width`-wide image.
    pub fn columns(start: usize, end: usize, width: usize) -> Self {
        Self::new(start, width.saturating_sub(end), 0, 0)
    }

    /// Keep only rows `[start, end)` of a `height`-tall image.
    pub fn rows(start: usize, end: usize, height: usize) -> Self {
        Self::new(0, 0, start, height.saturating_sub(end))
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check that at least one pixel survives cropping a `width`x`height` image.
    pub fn validated(&self, width: usize, height: usize) -> Result<Crop> {
        if self.left + self.right >= width || self.top + self.bottom >= height {
            return Err(XPlanarError::InvalidGeometry(format!(
                "Crop (left {}, right {}, top {}, bottom {}) leaves no pixels of a {width}x{height} detector",
                self.left, self.right, self.top, self.bottom
            )));
        }
        Ok(*self)
    }

    /// Shape `(rows, cols)` of a `width`x`height` image after cropping.
    pub fn cropped_dim(&self, width: usize, height: usize) -> (usize, usize) {
        (
            height.saturating_sub(self.top + self.bottom),
            width.saturating_sub(self.left + self.right),
        )
    }

    /// Borrow the cropped region of `data`. The crop must already be validated
    /// against `data`'s shape.
    pub fn apply<'a, T>(&self, data: ArrayView2<'a, T>) -> ArrayView2<'a, T> {
        let (h, w) = data.dim();
        data.slice_move(s![self.top..h - self.bottom, self.left..w - self.right])
    }
}
