pub mod config;
pub mod dynamic;
pub mod edge;
pub mod morphology;

pub use config::{AutoMaskConfig, BrightPixelConfig, DarkPixelConfig, EdgeMask, MaskConfig};

use ndarray::{Array2, ArrayView2, Zip};
use tracing::debug;

use crate::error::{Result, XPlanarError};
use crate::geometry::Crop;

/// Builds the exclusion field consumed by binning. `true` = excluded.
#[derive(Clone, Debug, Default)]
pub struct MaskEngine {
    config: MaskConfig,
    imported: Vec<Array2<bool>>,
}

impl MaskEngine {
    pub fn new(config: MaskConfig) -> Self {
        Self {
            config,
            imported: Vec::new(),
        }
    }

    /// Attach externally loaded masks of the full detector shape.
    pub fn with_imported(mut self, masks: Vec<Array2<bool>>) -> Self {
        self.imported = masks;
        self
    }

    pub fn config(&self) -> &MaskConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: MaskConfig) {
        self.config = config;
    }

    pub fn imported(&self) -> &[Array2<bool>] {
        &self.imported
    }

    pub fn has_dynamic(&self) -> bool {
        self.config.has_dynamic()
    }

    /// Frame-independent exclusions (imported masks and edges) for a detector
    /// of shape `detector`, cropped to `crop`.
    pub fn static_mask(&self, detector: (usize, usize), crop: &Crop) -> Result<Array2<bool>> {
        let mut mask = edge::edge_mask(detector, &self.config.edges);
        for imported in &self.imported {
            XPlanarError::check_shape(detector, imported.dim())?;
            Zip::from(&mut mask)
                .and(imported)
                .for_each(|m, &i| *m = *m || i);
        }
        let (h, w) = detector;
        let crop = crop.validated(w, h)?;
        let cropped = crop.apply(mask.view()).to_owned();
        debug!(
            excluded = count(&cropped),
            imported = self.imported.len(),
            "Static mask built"
        );
        Ok(cropped)
    }

    /// Exclusions derived from `frame` itself, or `None` when no per-frame
    /// detector is enabled.
    pub fn dynamic_mask(&self, frame: ArrayView2<f64>) -> Option<Array2<bool>> {
        if !self.has_dynamic() {
            return None;
        }
        let mut mask = Array2::from_elem(frame.dim(), false);
        if let Some(dark) = &self.config.dark {
            mask = mask | dynamic::dark_pixel_mask(frame, dark);
        }
        if let Some(bright) = &self.config.bright {
            mask = mask | dynamic::bright_pixel_mask(frame, bright);
        }
        debug!(excluded = count(&mask), "Dynamic mask built");
        Some(mask)
    }
}

/// Logical OR of two masks of equal shape.
pub fn union(a: ArrayView2<bool>, b: ArrayView2<bool>) -> Result<Array2<bool>> {
    XPlanarError::check_shape(a.dim(), b.dim())?;
    Ok(Zip::from(a).and(b).map_collect(|&x, &y| x || y))
}

/// Number of excluded pixels.
pub fn count(mask: &Array2<bool>) -> usize {
    mask.iter().filter(|&&v| v).count()
}
