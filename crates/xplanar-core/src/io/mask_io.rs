use std::path::{Path, PathBuf};

use image::{GrayImage, ImageFormat, Luma};
use ndarray::Array2;
use tracing::warn;

use crate::error::Result;
use crate::pipeline::InputConfig;

use super::image_io::{load_raw, orient};

/// Load a mask image; every pixel above 0 is excluded.
///
/// TIFF masks are drawn on raw detector images and get the same flips as
/// frames. PNG masks are already in frame orientation, as written by
/// [`save_mask_png`].
pub fn load_mask(path: &Path, input: &InputConfig) -> Result<Array2<bool>> {
    let mask = load_raw(path)?.mapv(|v| v > 0.0);
    if is_tiff(path) {
        Ok(orient(mask, input.flip_horizontal, input.flip_vertical))
    } else {
        Ok(mask)
    }
}

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
}

/// Load every existing mask in `paths`. Missing files are skipped.
pub fn load_masks(paths: &[PathBuf], input: &InputConfig) -> Result<Vec<Array2<bool>>> {
    let mut masks = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.exists() {
            warn!(path = %path.display(), "Mask file not found, skipping");
            continue;
        }
        masks.push(load_mask(path, input)?);
    }
    Ok(masks)
}

/// Save a mask as 8-bit PNG: 255 where excluded, 0 elsewhere.
pub fn save_mask_png(mask: &Array2<bool>, path: &Path) -> Result<()> {
    let (h, w) = mask.dim();
    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &excluded) in mask.indexed_iter() {
        img.put_pixel(col as u32, row as u32, Luma([if excluded { 255 } else { 0 }]));
    }
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
