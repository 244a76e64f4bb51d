use ndarray::Array2;

use crate::filters::uniform::window_extent;

/// Binary dilation with a `size`x`size` square kernel: a pixel becomes true
/// if ANY pixel in its neighbourhood is true.
pub fn dilate(mask: &Array2<bool>, size: usize) -> Array2<bool> {
    let rows = sweep(mask, size, Axis::Row, Op::Any);
    sweep(&rows, size, Axis::Col, Op::Any)
}

/// Binary erosion with a `size`x`size` square kernel: a pixel stays true
/// only if ALL pixels in its neighbourhood are true. Out-of-bounds counts as false.
pub fn erode(mask: &Array2<bool>, size: usize) -> Array2<bool> {
    let rows = sweep(mask, size, Axis::Row, Op::All);
    sweep(&rows, size, Axis::Col, Op::All)
}

/// Dilation followed by erosion.
pub fn dilate_then_erode(mask: &Array2<bool>, dilation: usize, erosion: usize) -> Array2<bool> {
    erode(&dilate(mask, dilation), erosion)
}

#[derive(Clone, Copy)]
enum Axis {
    Row,
    Col,
}

#[derive(Clone, Copy)]
enum Op {
    Any,
    All,
}

/// One separable pass along `axis`, counting true pixels with a running window.
fn sweep(mask: &Array2<bool>, size: usize, axis: Axis, op: Op) -> Array2<bool> {
    let (h, w) = mask.dim();
    let size = size.max(1);
    let (before, after) = window_extent(size);
    let mut result = Array2::from_elem((h, w), false);

    let (lines, len) = match axis {
        Axis::Row => (h, w),
        Axis::Col => (w, h),
    };
    let at = |line: usize, i: usize| match axis {
        Axis::Row => mask[[line, i]],
        Axis::Col => mask[[i, line]],
    };

    for line in 0..lines {
        // Prefix counts of true pixels along this line.
        let mut prefix = vec![0usize; len + 1];
        for i in 0..len {
            prefix[i + 1] = prefix[i] + usize::from(at(line, i));
        }
        for i in 0..len {
            let lo = i as isize - before;
            let hi = i as isize + after;
            let lo_c = lo.max(0) as usize;
            let hi_c = (hi.min(len as isize - 1)) as usize;
            let count = prefix[hi_c + 1] - prefix[lo_c];
            let value = match op {
                Op::Any => count > 0,
                Op::All => lo >= 0 && hi < len as isize && count == size,
            };
            match axis {
                Axis::Row => result[[line, i]] = value,
                Axis::Col => result[[i, line]] = value,
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dilation_grows_a_point_to_the_kernel() {
        let mut mask = Array2::from_elem((9, 9), false);
        mask[[4, 4]] = true;
        let out = dilate(&mask, 3);
        assert_eq!(out.iter().filter(|&&v| v).count(), 9);
        assert!(out[[3, 3]] && out[[5, 5]]);
        assert!(!out[[2, 4]]);
    }

    #[test]
    fn erosion_treats_border_as_background() {
        let mask = Array2::from_elem((5, 5), true);
        let out = erode(&mask, 3);
        assert_eq!(out.iter().filter(|&&v| v).count(), 9);
        assert!(!out[[0, 2]]);
        assert!(out[[2, 2]]);
    }

    #[test]
    fn isolated_pixel_vanishes_with_larger_erosion() {
        let mut mask = Array2::from_elem((21, 21), false);
        mask[[10, 10]] = true;
        let out = dilate_then_erode(&mask, 5, 7);
        assert!(out.iter().all(|&v| !v));
    }

    #[test]
    fn large_cluster_survives() {
        let mut mask = Array2::from_elem((31, 31), false);
        for r in 10..20 {
            for c in 10..20 {
                mask[[r, c]] = true;
            }
        }
        let out = dilate_then_erode(&mask, 5, 7);
        assert!(out[[15, 15]]);
        assert!(!out[[5, 5]]);
    }
}
