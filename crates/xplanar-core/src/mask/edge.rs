use ndarray::{s, Array2};

use super::config::EdgeMask;

/// Border and rounded-corner exclusion for a detector of shape `(rows, cols)`.
pub fn edge_mask(dim: (usize, usize), edges: &EdgeMask) -> Array2<bool> {
    let (h, w) = dim;
    let mut mask = Array2::from_elem((h, w), false);

    let left = edges.left.min(w);
    let right = edges.right.min(w);
    let top = edges.top.min(h);
    let bottom = edges.bottom.min(h);

    mask.slice_mut(s![.., ..left]).fill(true);
    mask.slice_mut(s![.., w - right..]).fill(true);
    mask.slice_mut(s![..top, ..]).fill(true);
    mask.slice_mut(s![h - bottom.., ..]).fill(true);

    let radius = edges.corner_radius;
    if radius == 0 || left + right + 2 * radius > w || top + bottom + 2 * radius > h {
        return mask;
    }

    // Inset points, in pixel-edge coordinates, around which each quarter disc
    // of valid pixels is drawn.
    let r = radius as f64;
    let corners = [
        (top, left, (top + radius) as f64, (left + radius) as f64),
        (top, w - right - radius, (top + radius) as f64, (w - right - radius) as f64),
        (h - bottom - radius, left, (h - bottom - radius) as f64, (left + radius) as f64),
        (
            h - bottom - radius,
            w - right - radius,
            (h - bottom - radius) as f64,
            (w - right - radius) as f64,
        ),
    ];

    for (row0, col0, cy, cx) in corners {
        for row in row0..row0 + radius {
            for col in col0..col0 + radius {
                let dy = row as f64 + 0.5 - cy;
                let dx = col as f64 + 0.5 - cx;
                if dx.hypot(dy) > r {
                    mask[[row, col]] = true;
                }
            }
        }
    }

    mask
}
