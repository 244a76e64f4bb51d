use ndarray::{Array2, ArrayView2};

use super::uniform::{fill, window_extent};

/// Replace each pixel by the `rank`-th smallest value of its `size`x`size`
/// neighbourhood (0 = minimum). Out-of-range neighbours repeat the nearest
/// edge pixel.
///
/// Uses `select_nth_unstable_by` for O(n) selection per pixel.
pub fn rank_filter(data: ArrayView2<f64>, size: usize, rank: usize) -> Array2<f64> {
    let size = size.max(1);
    let n = size * size;
    let rank = rank.min(n - 1);
    let (h, w) = data.dim();
    let (before, after) = window_extent(size);

    let select_at = |row: usize, col: usize| {
        let mut window = Vec::with_capacity(n);
        for dr in -before..=after {
            let r = (row as isize + dr).clamp(0, h as isize - 1) as usize;
            for dc in -before..=after {
                let c = (col as isize + dc).clamp(0, w as isize - 1) as usize;
                window.push(data[[r, c]]);
            }
        }
        *window.select_nth_unstable_by(rank, |a, b| a.total_cmp(b)).1
    };

    fill(h, w, select_at)
}

/// Rank filter addressed by percentile of the window population.
pub fn percentile_filter(data: ArrayView2<f64>, size: usize, percentile: f64) -> Array2<f64> {
    let n = size.max(1).pow(2);
    rank_filter(data, size, percentile_rank(percentile, n))
}

/// Index into a sorted window of `n` values for `percentile` in `[0, 100]`.
pub(crate) fn percentile_rank(percentile: f64, n: usize) -> usize {
    let p = percentile.clamp(0.0, 100.0);
    if p >= 100.0 {
        n - 1
    } else {
        ((p / 100.0) * n as f64) as usize
    }
}
