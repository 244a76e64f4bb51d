use ndarray::{Array2, ArrayView1, Axis};

use super::grid::IntegrationSpace;

/// A reduced 1D pattern: rows are `[x, intensity]` or
/// `[x, intensity, uncertainty]`, one column per bin.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    data: Array2<f64>,
    counts: Vec<usize>,
    space: IntegrationSpace,
}

impl Pattern {
    pub(crate) fn new(data: Array2<f64>, counts: Vec<usize>, space: IntegrationSpace) -> Self {
        Self {
            data,
            counts,
            space,
        }
    }

    /// Bin centers.
    pub fn x(&self) -> ArrayView1<'_, f64> {
        self.data.index_axis(Axis(0), 0)
    }

    /// Mean corrected intensity per bin; 0 where the bin is empty.
    pub fn intensity(&self) -> ArrayView1<'_, f64> {
        self.data.index_axis(Axis(0), 1)
    }

    pub fn uncertainty(&self) -> Option<ArrayView1<'_, f64>> {
        (self.data.nrows() > 2).then(|| self.data.index_axis(Axis(0), 2))
    }

    /// Unmasked pixels that landed in each bin.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn space(&self) -> IntegrationSpace {
        self.space
    }

    pub fn len(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.data.ncols() == 0
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn into_data(self) -> Array2<f64> {
        self.data
    }
}
