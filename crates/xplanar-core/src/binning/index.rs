use ndarray::{Array2, ArrayView2, Zip};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{Result, XPlanarError};
use crate::geometry::Crop;

use super::grid::BinGrid;

/// Per-pixel bin assignment for one grid.
///
/// Excluded and out-of-range pixels point at a discard slot one past the
/// last bin, so a single pass over the pixels drops them without branching
/// on the mask again.
#[derive(Clone, Debug, PartialEq)]
pub struct BinIndex {
    bins: Array2<usize>,
    len: usize,
}

impl BinIndex {
    /// Assign each value of `values` to its bin in `grid`. Pixels where
    /// `mask` is true take a sentinel coordinate beyond the last edge.
    pub fn new(
        values: ArrayView2<f64>,
        grid: &BinGrid,
        mask: Option<ArrayView2<bool>>,
    ) -> Result<Self> {
        let len = grid.len();
        let discard = len;
        let mut bins = Array2::<usize>::zeros(values.dim());

        let assign = |b: &mut usize, value: f64, excluded: bool| {
            let value = if excluded { f64::INFINITY } else { value };
            *b = grid.locate(value).unwrap_or(discard);
        };

        match mask {
            Some(mask) => {
                XPlanarError::check_shape(values.dim(), mask.dim())?;
                let zip = Zip::from(&mut bins).and(values).and(mask);
                if values.len() >= PARALLEL_PIXEL_THRESHOLD {
                    zip.par_for_each(|b, &v, &m| assign(b, v, m));
                } else {
                    zip.for_each(|b, &v, &m| assign(b, v, m));
                }
            }
            None => {
                let zip = Zip::from(&mut bins).and(values);
                if values.len() >= PARALLEL_PIXEL_THRESHOLD {
                    zip.par_for_each(|b, &v| assign(b, v, false));
                } else {
                    zip.for_each(|b, &v| assign(b, v, false));
                }
            }
        }

        Ok(Self { bins, len })
    }

    /// Bin index per pixel; `self.discard_slot()` marks dropped pixels.
    pub fn bins(&self) -> &Array2<usize> {
        &self.bins
    }

    pub fn view(&self) -> ArrayView2<'_, usize> {
        self.bins.view()
    }

    pub fn dim(&self) -> (usize, usize) {
        self.bins.dim()
    }

    /// Number of real bins.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn discard_slot(&self) -> usize {
        self.len
    }

    /// Same assignment with additional pixels sent to the discard slot.
    pub fn masked(&self, mask: ArrayView2<bool>) -> Result<Self> {
        XPlanarError::check_shape(self.bins.dim(), mask.dim())?;
        let discard = self.len;
        let bins = Zip::from(&self.bins)
            .and(mask)
            .map_collect(|&b, &m| if m { discard } else { b });
        Ok(Self {
            bins,
            len: self.len,
        })
    }

    /// Restrict to the pixels kept by `crop`, which must fit this index.
    pub fn cropped(&self, crop: &Crop) -> Self {
        Self {
            bins: crop.apply(self.bins.view()).to_owned(),
            len: self.len,
        }
    }

    /// Pixel count per bin, before clamping.
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.len + 1];
        for &b in self.bins.iter() {
            counts[b] += 1;
        }
        counts.truncate(self.len);
        counts
    }
}
