use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::consts::{LOCAL_VARIANCE_WINDOW, SELF_CORRECTION_HIGH, SELF_CORRECTION_LOW};
use crate::error::{Result, XPlanarError};

use super::grid::BinGrid;
use super::index::BinIndex;
use super::pattern::Pattern;
use super::variance::local_variance;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinningOptions {
    /// Emit a third row with the per-bin standard uncertainty.
    pub uncertainty: bool,
    /// Drop pixels far from their bin median before averaging.
    pub self_correction: bool,
}

/// Reduces a corrected pixel field to per-bin means.
#[derive(Clone, Debug)]
pub struct BinningEngine {
    grid: BinGrid,
    options: BinningOptions,
}

impl BinningEngine {
    pub fn new(grid: BinGrid, options: BinningOptions) -> Self {
        Self { grid, options }
    }

    pub fn grid(&self) -> &BinGrid {
        &self.grid
    }

    pub fn options(&self) -> BinningOptions {
        self.options
    }

    /// Bin `corrected` using the assignment in `index`.
    ///
    /// `variance` is the per-pixel variance field; when uncertainty is
    /// enabled and none is given it is estimated from `corrected`.
    pub fn integrate(
        &self,
        corrected: ArrayView2<f64>,
        index: &BinIndex,
        variance: Option<ArrayView2<f64>>,
    ) -> Result<Pattern> {
        XPlanarError::check_shape(index.dim(), corrected.dim())?;
        if index.len() != self.grid.len() {
            return Err(XPlanarError::InvalidBinning(format!(
                "index built for {} bins, grid has {}",
                index.len(),
                self.grid.len()
            )));
        }
        let n = self.grid.len();

        let counts = index.counts();
        let mut sums = vec![0.0; n + 1];
        let mut kept = counts.clone();
        if self.options.self_correction {
            self.rejecting_sums(corrected, index, &mut sums, &mut kept);
        } else {
            Zip::from(index.bins())
                .and(corrected)
                .for_each(|&b, &v| sums[b] += v);
        }

        let intensity: Vec<f64> = (0..n)
            .map(|k| sums[k] / kept[k].max(1) as f64)
            .collect();

        let rows = if self.options.uncertainty { 3 } else { 2 };
        let mut data = Array2::<f64>::zeros((rows, n));
        for k in 0..n {
            data[[0, k]] = self.grid.centers()[k];
            data[[1, k]] = intensity[k];
        }

        if self.options.uncertainty {
            let estimated;
            let variance = match variance {
                Some(v) => {
                    XPlanarError::check_shape(index.dim(), v.dim())?;
                    v
                }
                None => {
                    estimated = local_variance(corrected, LOCAL_VARIANCE_WINDOW);
                    estimated.view()
                }
            };
            let mut var_sums = vec![0.0; n + 1];
            Zip::from(index.bins())
                .and(variance)
                .for_each(|&b, &v| var_sums[b] += v);
            for k in 0..n {
                data[[2, k]] = (var_sums[k] / counts[k].max(1) as f64).sqrt();
            }
        }

        trace!(
            bins = n,
            occupied = counts.iter().filter(|&&c| c > 0).count(),
            "Pattern binned"
        );
        Ok(Pattern::new(data, counts, self.grid.space()))
    }

    /// Sum only the pixels inside `(low, high) x median` of their bin.
    fn rejecting_sums(
        &self,
        corrected: ArrayView2<f64>,
        index: &BinIndex,
        sums: &mut [f64],
        kept: &mut [usize],
    ) {
        let n = self.grid.len();
        let mut members: Vec<Vec<f64>> = vec![Vec::new(); n + 1];
        Zip::from(index.bins())
            .and(corrected)
            .for_each(|&b, &v| members[b].push(v));

        for (k, values) in members.iter_mut().enumerate().take(n) {
            let Some(median) = median(values) else {
                continue;
            };
            let (low, high) = (SELF_CORRECTION_LOW * median, SELF_CORRECTION_HIGH * median);
            let mut sum = 0.0;
            let mut count = 0;
            for &v in values.iter().filter(|&&v| v > low && v < high) {
                sum += v;
                count += 1;
            }
            sums[k] = sum;
            kept[k] = count;
        }
    }
}

/// Median of `values`, averaging the two middle elements for even lengths.
/// Reorders `values`.
fn median(values: &mut [f64]) -> Option<f64> {
    let len = values.len();
    if len == 0 {
        return None;
    }
    let mid = len / 2;
    let (lower, upper, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    let upper = *upper;
    if len % 2 == 1 {
        Some(upper)
    } else {
        let below = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(0.5 * (below + upper))
    }
}
