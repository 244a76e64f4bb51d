use ndarray::{Array2, ArrayView2};

use crate::filters::uniform_filter;

/// Per-pixel noise estimate: the squared deviation from the local mean,
/// smoothed with the same `window`.
pub fn local_variance(data: ArrayView2<f64>, window: usize) -> Array2<f64> {
    let mean = uniform_filter(data, window);
    let deviation = (&data - &mean).mapv(|d| d * d);
    uniform_filter(deviation.view(), window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_field_has_no_variance() {
        let data = Array2::from_elem((12, 12), 7.5);
        let var = local_variance(data.view(), 5);
        assert!(var.iter().all(|&v| v.abs() < 1e-12));
    }

    #[test]
    fn checkerboard_has_uniform_interior_variance() {
        let data =
            Array2::from_shape_fn((20, 20), |(r, c)| if (r + c) % 2 == 0 { 1.0 } else { 3.0 });
        let var = local_variance(data.view(), 5);
        // Interior local means sit near 2, deviations near 1.
        let v = var[[10, 10]];
        assert!(v > 0.9 && v < 1.1, "{v}");
    }
}
