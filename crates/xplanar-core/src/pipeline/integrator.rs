use ndarray::{Array2, ArrayView2, Zip};
use tracing::{debug, info};

use crate::binning::{BinIndex, BinningEngine, Pattern};
use crate::correction::CorrectionModel;
use crate::error::{Result, XPlanarError};
use crate::frame::Frame;
use crate::geometry::{Crop, GeometryModel};
use crate::mask::{self, MaskEngine};

use super::config::XPlanarConfig;

/// Frame-independent state derived from one configuration.
#[derive(Debug)]
struct Prepared {
    geometry: GeometryModel,
    correction: CorrectionModel,
    engine: BinningEngine,
    static_mask: Array2<bool>,
    index: BinIndex,
}

impl Prepared {
    fn build(
        config: &XPlanarConfig,
        masks: &MaskEngine,
        auto_mask: Option<&Array2<bool>>,
    ) -> Result<Self> {
        let space = config.integration.space;
        let crop = config.integration.crop;
        let geometry = GeometryModel::new(&config.geometry, crop)?;
        let correction = CorrectionModel::new(&geometry, &config.correction, space)?;
        let grid = config.integration.grid()?;

        let mut static_mask = masks.static_mask(config.geometry.dim(), &crop)?;
        if let Some(auto) = auto_mask {
            static_mask = mask::union(static_mask.view(), auto.view())?;
        }

        let values = space.field(&geometry);
        let index = BinIndex::new(values.view(), &grid, Some(static_mask.view()))?;

        info!(
            space = %space,
            bins = grid.len(),
            rows = geometry.dim().0,
            cols = geometry.dim().1,
            excluded = mask::count(&static_mask),
            "Integrator prepared"
        );

        Ok(Self {
            geometry,
            correction,
            engine: BinningEngine::new(grid, config.integration.options()),
            static_mask,
            index,
        })
    }
}

/// Owns the configuration and the cached geometry, corrections and static
/// mask derived from it.
///
/// The cache is rebuilt lazily after [`Integrator::update`]; integrating
/// never changes it, so repeated calls on the same frame give identical
/// patterns.
#[derive(Debug)]
pub struct Integrator {
    config: XPlanarConfig,
    masks: MaskEngine,
    auto_mask: Option<Array2<bool>>,
    prepared: Option<Prepared>,
}

impl Integrator {
    pub fn new(config: XPlanarConfig) -> Result<Self> {
        config.validate()?;
        let mut config = config;
        config.geometry = config.geometry.normalized();
        Ok(Self {
            masks: MaskEngine::new(config.mask.clone()),
            config,
            auto_mask: None,
            prepared: None,
        })
    }

    /// Attach mask images of the full detector shape.
    pub fn with_imported_masks(mut self, masks: Vec<Array2<bool>>) -> Self {
        self.masks = self.masks.with_imported(masks);
        self.prepared = None;
        self
    }

    pub fn config(&self) -> &XPlanarConfig {
        &self.config
    }

    /// Change the configuration through `edit`, then drop every cached field.
    ///
    /// On validation failure the previous configuration stays in place.
    /// The auto-mask survives unless the crop or detector shape changes.
    pub fn update<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut XPlanarConfig),
    {
        let mut next = self.config.clone();
        edit(&mut next);
        next.validate()?;
        next.geometry = next.geometry.normalized();

        if next.integration.crop != self.config.integration.crop
            || next.geometry.dim() != self.config.geometry.dim()
        {
            self.auto_mask = None;
        }
        if next.mask != self.config.mask {
            self.masks.set_config(next.mask.clone());
        }
        self.config = next;
        self.prepared = None;
        debug!("Integrator cache invalidated");
        Ok(())
    }

    /// Build the cached fields now instead of on the next integration.
    pub fn prepare(&mut self) -> Result<()> {
        self.prepared_mut()?;
        Ok(())
    }

    pub fn geometry(&mut self) -> Result<&GeometryModel> {
        Ok(&self.prepared_mut()?.geometry)
    }

    pub fn correction(&mut self) -> Result<&CorrectionModel> {
        Ok(&self.prepared_mut()?.correction)
    }

    /// Static exclusions, including a bootstrapped auto-mask, in cropped coordinates.
    pub fn static_mask(&mut self) -> Result<&Array2<bool>> {
        Ok(&self.prepared_mut()?.static_mask)
    }

    pub fn auto_mask(&self) -> Option<&Array2<bool>> {
        self.auto_mask.as_ref()
    }

    /// Integrate a full-detector frame.
    pub fn integrate(&mut self, frame: &Frame) -> Result<Pattern> {
        self.integrate_window(frame, Crop::default())
    }

    /// Integrate only the pixels of `window`, given in cropped coordinates.
    /// Dynamic masks are still derived from the whole cropped frame.
    pub fn integrate_window(&mut self, frame: &Frame, window: Crop) -> Result<Pattern> {
        XPlanarError::check_shape(self.config.geometry.dim(), frame.dim())?;
        let crop = self.config.integration.crop;
        let raw = crop.apply(frame.data.view());
        self.integrate_cropped(raw, window)
    }

    /// Sum `frames` pixel by pixel and integrate the result.
    pub fn integrate_sum(&mut self, frames: &[Frame]) -> Result<Pattern> {
        let Some(first) = frames.first() else {
            return Err(XPlanarError::InvalidConfig("no frames to sum".into()));
        };
        let mut total = first.data.clone();
        for frame in &frames[1..] {
            XPlanarError::check_shape(total.dim(), frame.dim())?;
            total += &frame.data;
        }
        debug!(frames = frames.len(), "Frames summed");
        self.integrate(&Frame::new(total))
    }

    /// Mask pixels of `frame` that stray from their bin average by more
    /// than the configured tolerances, and keep that mask for every later
    /// frame. Returns the number of pixels it excludes; 0 when auto-masking
    /// is not configured.
    pub fn bootstrap_auto_mask(&mut self, frame: &Frame) -> Result<usize> {
        let Some(tolerance) = self.config.mask.auto_mask.clone() else {
            return Ok(0);
        };
        XPlanarError::check_shape(self.config.geometry.dim(), frame.dim())?;
        self.auto_mask = None;
        self.prepared = None;

        let crop = self.config.integration.crop;
        let raw = crop.apply(frame.data.view());
        let prepared = prepared_slot(&mut self.prepared, &self.config, &self.masks, None)?;
        let corrected = prepared.correction.apply(raw)?;
        let pattern = prepared.engine.integrate(corrected.view(), &prepared.index, None)?;
        let averages = pattern.intensity();
        let discard = prepared.index.discard_slot();

        let auto = Zip::from(prepared.index.bins())
            .and(&corrected)
            .map_collect(|&b, &v| {
                if b == discard {
                    return false;
                }
                let avg = averages[b];
                v > avg * (1.0 + tolerance.high) || v < avg * (1.0 - tolerance.low)
            });

        let excluded = mask::count(&auto);
        info!(excluded, "Auto-mask bootstrapped");
        self.auto_mask = Some(auto);
        self.prepared = None;
        Ok(excluded)
    }

    /// Static mask merged with the dynamic mask of `frame`, if given.
    pub fn composed_mask(&mut self, frame: Option<&Frame>) -> Result<Array2<bool>> {
        let crop = self.config.integration.crop;
        let prepared = prepared_slot(
            &mut self.prepared,
            &self.config,
            &self.masks,
            self.auto_mask.as_ref(),
        )?;
        let Some(frame) = frame else {
            return Ok(prepared.static_mask.clone());
        };
        XPlanarError::check_shape(self.config.geometry.dim(), frame.dim())?;
        match self.masks.dynamic_mask(crop.apply(frame.data.view())) {
            Some(dynamic) => mask::union(prepared.static_mask.view(), dynamic.view()),
            None => Ok(prepared.static_mask.clone()),
        }
    }

    fn integrate_cropped(&mut self, raw: ArrayView2<f64>, window: Crop) -> Result<Pattern> {
        let prepared = prepared_slot(
            &mut self.prepared,
            &self.config,
            &self.masks,
            self.auto_mask.as_ref(),
        )?;
        let (h, w) = prepared.geometry.dim();
        XPlanarError::check_shape((h, w), raw.dim())?;
        let window = window.validated(w, h)?;

        let corrected = prepared.correction.apply(raw)?;
        let dynamic = self.masks.dynamic_mask(raw);

        // Without a dynamic mask or window the cached assignment is used as is.
        let adjusted;
        let index = match (&dynamic, window.is_empty()) {
            (None, true) => &prepared.index,
            (None, false) => {
                adjusted = prepared.index.cropped(&window);
                &adjusted
            }
            (Some(dynamic), _) => {
                adjusted = prepared
                    .index
                    .masked(dynamic.view())?
                    .cropped(&window);
                &adjusted
            }
        };

        prepared
            .engine
            .integrate(window.apply(corrected.view()), index, None)
    }

    fn prepared_mut(&mut self) -> Result<&Prepared> {
        prepared_slot(
            &mut self.prepared,
            &self.config,
            &self.masks,
            self.auto_mask.as_ref(),
        )
    }
}

/// Fill `slot` from the configuration when empty and borrow its content.
fn prepared_slot<'a>(
    slot: &'a mut Option<Prepared>,
    config: &XPlanarConfig,
    masks: &MaskEngine,
    auto_mask: Option<&Array2<bool>>,
) -> Result<&'a Prepared> {
    let prepared = match slot.take() {
        Some(prepared) => prepared,
        None => Prepared::build(config, masks, auto_mask)?,
    };
    Ok(slot.insert(prepared))
}
