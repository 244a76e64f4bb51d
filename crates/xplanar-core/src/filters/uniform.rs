use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Mean over a `size`x`size` window centered on each pixel.
///
/// Separable: a row pass followed by a column pass. Out-of-range neighbours
/// repeat the nearest edge pixel.
pub fn uniform_filter(data: ArrayView2<f64>, size: usize) -> Array2<f64> {
    let size = size.max(1);
    let row_pass = box_rows(data, size);
    box_cols(row_pass.view(), size)
}

fn box_rows(data: ArrayView2<f64>, size: usize) -> Array2<f64> {
    let (h, w) = data.dim();
    let (before, after) = window_extent(size);
    let norm = 1.0 / size as f64;

    let mean_at = |row: usize, col: usize| {
        let mut sum = 0.0;
        for k in -before..=after {
            let src_col = (col as isize + k).clamp(0, w as isize - 1) as usize;
            sum += data[[row, src_col]];
        }
        sum * norm
    };

    fill(h, w, mean_at)
}

fn box_cols(data: ArrayView2<f64>, size: usize) -> Array2<f64> {
    let (h, w) = data.dim();
    let (before, after) = window_extent(size);
    let norm = 1.0 / size as f64;

    let mean_at = |row: usize, col: usize| {
        let mut sum = 0.0;
        for k in -before..=after {
            let src_row = (row as isize + k).clamp(0, h as isize - 1) as usize;
            sum += data[[src_row, col]];
        }
        sum * norm
    };

    fill(h, w, mean_at)
}

/// Offsets before and after the center covered by a window of `size` taps.
/// Even sizes extend one further before the center.
pub(crate) fn window_extent(size: usize) -> (isize, isize) {
    let before = (size / 2) as isize;
    let after = (size as isize - 1) - before;
    (before, after)
}

/// Evaluate `f(row, col)` for every pixel, row-parallel for large images.
pub(crate) fn fill<F>(h: usize, w: usize, f: F) -> Array2<f64>
where
    F: Fn(usize, usize) -> f64 + Sync,
{
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let rows: Vec<Vec<f64>> = (0..h)
            .into_par_iter()
            .map(|row| (0..w).map(|col| f(row, col)).collect())
            .collect();

        let mut result = Array2::<f64>::zeros((h, w));
        for (row, row_data) in rows.into_iter().enumerate() {
            for (col, val) in row_data.into_iter().enumerate() {
                result[[row, col]] = val;
            }
        }
        result
    } else {
        Array2::from_shape_fn((h, w), |(row, col)| f(row, col))
    }
}
