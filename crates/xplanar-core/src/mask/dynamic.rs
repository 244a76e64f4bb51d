use ndarray::{Array2, ArrayView2, Zip};

use crate::consts::{BRIGHT_DILATION_SIZE, DARK_DILATION_SIZE, DARK_EROSION_SIZE};
use crate::filters::{percentile_filter, rank_filter};

use super::config::{BrightPixelConfig, DarkPixelConfig};
use super::morphology::{dilate, dilate_then_erode};

/// Dead or dark pixels: the local low percentile falls below a fraction of
/// the frame average. Seeds are grown then shrunk back with a larger
/// kernel, which drops isolated seeds and consolidates dead clusters.
pub fn dark_pixel_mask(frame: ArrayView2<f64>, config: &DarkPixelConfig) -> Array2<bool> {
    let average = frame.mean().unwrap_or(0.0);
    let threshold = config.ratio * average;
    let low = percentile_filter(frame, config.window, config.percentile);
    let seeds = low.mapv(|v| v < threshold);
    dilate_then_erode(&seeds, DARK_DILATION_SIZE, DARK_EROSION_SIZE)
}

/// Bright spots: pixels well above a high rank of their neighbourhood,
/// dilated to cover the spot halo.
pub fn bright_pixel_mask(frame: ArrayView2<f64>, config: &BrightPixelConfig) -> Array2<bool> {
    let n = config.window.max(1).pow(2);
    let rank = n.saturating_sub(config.rank_from_top.max(1));
    let local = rank_filter(frame, config.window, rank);

    let mut seeds = Array2::from_elem(frame.dim(), false);
    Zip::from(&mut seeds)
        .and(frame)
        .and(&local)
        .for_each(|s, &v, &l| *s = v > l * config.ratio);
    dilate(&seeds, BRIGHT_DILATION_SIZE)
}
