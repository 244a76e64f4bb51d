use std::f64::consts::PI;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::binning::{BinGrid, BinningOptions, IntegrationSpace};
use crate::consts::{
    DEFAULT_Q_MAX, DEFAULT_Q_STEP, DEFAULT_READ_ATTEMPTS, DEFAULT_READ_DELAY_MS,
    DEFAULT_TTH_MAX_DEG, DEFAULT_TTH_STEP_DEG, STEP_MISMATCH_TOLERANCE,
};
use crate::correction::CorrectionConfig;
use crate::error::{Result, XPlanarError};
use crate::geometry::{Crop, GeometryParameters};
use crate::io::gsas::GsasFormat;
use crate::mask::MaskConfig;

/// Everything needed to reduce images from one detector setup.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XPlanarConfig {
    pub geometry: GeometryParameters,
    pub integration: IntegrationConfig,
    pub correction: CorrectionConfig,
    pub mask: MaskConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    pub space: IntegrationSpace,
    /// Two-theta bin width, degrees.
    pub tth_step_deg: f64,
    /// Upper two-theta limit, degrees.
    pub tth_max_deg: f64,
    pub q_step: f64,
    pub q_max: f64,
    /// Emit the per-bin uncertainty row.
    pub uncertainty: bool,
    /// Reject per-bin outliers before averaging.
    pub self_correction: bool,
    /// Pixels cut from each side of the detector before integration.
    pub crop: Crop,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            space: IntegrationSpace::TwoTheta,
            tth_step_deg: DEFAULT_TTH_STEP_DEG,
            tth_max_deg: DEFAULT_TTH_MAX_DEG,
            q_step: DEFAULT_Q_STEP,
            q_max: DEFAULT_Q_MAX,
            uncertainty: false,
            self_correction: false,
            crop: Crop::default(),
        }
    }
}

impl IntegrationConfig {
    /// Bin width in the active space.
    pub fn step(&self) -> f64 {
        match self.space {
            IntegrationSpace::TwoTheta => self.tth_step_deg,
            IntegrationSpace::Q => self.q_step,
        }
    }

    /// Upper limit in the active space.
    pub fn max(&self) -> f64 {
        match self.space {
            IntegrationSpace::TwoTheta => self.tth_max_deg,
            IntegrationSpace::Q => self.q_max,
        }
    }

    pub fn grid(&self) -> Result<BinGrid> {
        BinGrid::new(self.space, self.step(), self.max())
    }

    pub fn options(&self) -> BinningOptions {
        BinningOptions {
            uncertainty: self.uncertainty,
            self_correction: self.self_correction,
        }
    }
}

/// Pre-processing applied by the image loader.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Mirror columns after loading.
    pub flip_horizontal: bool,
    /// Mirror rows after loading.
    pub flip_vertical: bool,
    /// Image subtracted from every frame.
    pub background: Option<PathBuf>,
    pub read_attempts: usize,
    pub read_delay_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            flip_horizontal: false,
            flip_vertical: false,
            background: None,
            read_attempts: DEFAULT_READ_ATTEMPTS,
            read_delay_ms: DEFAULT_READ_DELAY_MS,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for result files; next to the input when unset.
    pub directory: Option<PathBuf>,
    /// Appended to the input file stem.
    pub suffix: String,
    /// Also write a GSAS file in this format.
    pub gsas: Option<GsasFormat>,
}

/// Outcome of [`XPlanarConfig::resolve_range`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangeReport {
    /// Largest value reached on the detector in the active space.
    pub detector_max: f64,
    /// True when the configured maximum was raised to `detector_max`.
    pub extended: bool,
    /// Width of one pixel at normal incidence in the active space.
    pub natural_step: f64,
    /// True when the configured step differs from `natural_step` by more
    /// than the tolerance.
    pub step_mismatch: bool,
}

impl XPlanarConfig {
    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;
        self.correction.validate()?;
        let (h, w) = self.geometry.dim();
        self.integration.crop.validated(w, h)?;
        self.integration.grid()?;
        if self.input.read_attempts == 0 {
            return Err(XPlanarError::InvalidConfig(
                "read_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Raise the maximum of the active space to cover the detector corners
    /// and compare the step with the width of one pixel.
    pub fn resolve_range(&mut self) -> RangeReport {
        let g = &self.geometry;
        let tth_max = g.max_two_theta();
        let tth_pixel = (g.x_pixel_size / g.distance).atan();
        let to_q = |tth: f64| 4.0 * PI * (tth / 2.0).sin() / g.wavelength;

        let (detector_max, natural_step) = match self.integration.space {
            IntegrationSpace::TwoTheta => (tth_max.to_degrees(), tth_pixel.to_degrees()),
            IntegrationSpace::Q => (to_q(tth_max), to_q(tth_pixel)),
        };

        let step = self.integration.step();
        let extended = detector_max > self.integration.max();
        if extended {
            let raised = detector_max + step;
            match self.integration.space {
                IntegrationSpace::TwoTheta => self.integration.tth_max_deg = raised,
                IntegrationSpace::Q => self.integration.q_max = raised,
            }
        }

        let step_mismatch =
            ((step - natural_step) / natural_step).abs() > STEP_MISMATCH_TOLERANCE;
        if step_mismatch {
            warn!(
                space = %self.integration.space,
                step,
                natural_step,
                "Bin step differs from one pixel width"
            );
        }

        RangeReport {
            detector_max,
            extended,
            natural_step,
            step_mismatch,
        }
    }
}
