use std::ops::Range;

use crate::binning::Pattern;
use crate::error::Result;
use crate::frame::Frame;
use crate::geometry::{Crop, GeometryParameter};
use crate::pipeline::Integrator;

/// Two complementary windows of the cropped frame.
pub type HalfPair = (Crop, Crop);

/// Left/right split at column `split` of a `width`-wide frame.
pub fn vertical_split(split: usize, width: usize) -> HalfPair {
    (
        Crop::columns(0, split, width),
        Crop::columns(split, width, width),
    )
}

/// Top/bottom split at row `split` of a `height`-tall frame.
pub fn horizontal_split(split: usize, height: usize) -> HalfPair {
    (
        Crop::rows(0, split, height),
        Crop::rows(split, height, height),
    )
}

/// Pointwise difference of two half patterns over `range`, normalized by
/// the mean of their average.
///
/// Bins that one of the halves does not reach contribute 0. When the halves
/// carry no intensity in `range` every entry is NaN.
pub fn half_difference(a: &Pattern, b: &Pattern, range: Range<usize>) -> Vec<f64> {
    let (ia, ib) = (a.intensity(), b.intensity());
    let (ca, cb) = (a.counts(), b.counts());
    let shared = |k: usize| ca[k] > 0 && cb[k] > 0;

    let mut total = 0.0;
    let mut n = 0usize;
    for k in range.clone().filter(|&k| shared(k)) {
        total += 0.5 * (ia[k] + ib[k]);
        n += 1;
    }
    let mean = if n > 0 { total / n as f64 } else { 0.0 };
    if !(mean > 0.0 && mean.is_finite()) {
        return vec![f64::NAN; range.len()];
    }

    range
        .map(|k| if shared(k) { (ia[k] - ib[k]) / mean } else { 0.0 })
        .collect()
}

/// Write `values` into the geometry, integrate each half pair of `frame`
/// and concatenate their normalized differences.
pub fn halfcut(
    integrator: &mut Integrator,
    frame: &Frame,
    parameters: &[GeometryParameter],
    values: &[f64],
    halves: &[HalfPair],
    range: Range<usize>,
) -> Result<Vec<f64>> {
    integrator.update(|config| {
        for (&p, &v) in parameters.iter().zip(values) {
            config.geometry.set(p, v);
        }
    })?;

    let mut residual = Vec::with_capacity(halves.len() * range.len());
    for &(first, second) in halves {
        let a = integrator.integrate_window(frame, first)?;
        let b = integrator.integrate_window(frame, second)?;
        residual.extend(half_difference(&a, &b, range.clone()));
    }
    Ok(residual)
}

/// Sum of squares, NaN-propagating.
pub fn sum_of_squares(residual: &[f64]) -> f64 {
    residual.iter().map(|r| r * r).sum()
}
