//! Geometry self-calibration by half-pattern symmetry.
//!
//! An azimuthally symmetric frame integrates to the same curve from any two
//! complementary halves of the detector once the geometry is right. The
//! calibrator searches the geometry that makes the halves agree.

pub mod lsq;
pub mod objective;
pub mod search;

use std::f64::consts::{FRAC_PI_2, TAU};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::binning::IntegrationSpace;
use crate::consts::{CALIBRATION_LOW_Q_SKIP, CALIBRATION_Q_MAX, CALIBRATION_Q_STEP};
use crate::error::{Result, XPlanarError};
use crate::frame::Frame;
use crate::geometry::{GeometryParameter, GeometryParameters};
use crate::pipeline::{Integrator, XPlanarConfig};

use objective::{halfcut, horizontal_split, sum_of_squares, vertical_split, HalfPair};
use search::{grid_refine, powell, SearchResult};

/// Which parameters to refine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationMode {
    /// Beam center column, left vs right halves.
    #[default]
    X,
    /// Beam center row, top vs bottom halves.
    Y,
    Tilt,
    Rotation,
    /// Beam center, tilt and rotation together.
    All,
}

impl CalibrationMode {
    pub fn parameters(self) -> &'static [GeometryParameter] {
        use GeometryParameter::*;
        match self {
            Self::X => &[XBeamCenter],
            Self::Y => &[YBeamCenter],
            Self::Tilt => &[Tilt],
            Self::Rotation => &[Rotation],
            Self::All => &[XBeamCenter, YBeamCenter, Tilt, Rotation],
        }
    }
}

impl fmt::Display for CalibrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "x"),
            Self::Y => write!(f, "y"),
            Self::Tilt => write!(f, "tilt"),
            Self::Rotation => write!(f, "rotation"),
            Self::All => write!(f, "all"),
        }
    }
}

/// Shape of the objective handed to the optimizer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveMode {
    /// Sum of squared differences, minimized by grid refinement (one
    /// parameter) or Powell's method (several).
    #[default]
    Scalar,
    /// The difference vector itself, minimized by Levenberg-Marquardt.
    Vector,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub mode: CalibrationMode,
    pub objective: ObjectiveMode,
    /// Search half-width around the starting beam center, pixels.
    pub center_bound: f64,
    /// Search half-width around the starting tilt, degrees.
    pub tilt_bound_deg: f64,
    /// Q bin width while calibrating.
    pub q_step: f64,
    /// Upper end of the compared Q range.
    pub q_max: f64,
    /// Keep dark/bright pixel detection on while calibrating.
    pub keep_dynamic_masks: bool,
    pub coarse_points: usize,
    pub fine_points: usize,
    /// Powell iterations, or Levenberg-Marquardt patience.
    pub max_iterations: usize,
    /// Relative tolerance on the objective for Powell's method.
    pub tolerance: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            mode: CalibrationMode::X,
            objective: ObjectiveMode::Scalar,
            center_bound: 3.0,
            tilt_bound_deg: 5.0,
            q_step: CALIBRATION_Q_STEP,
            q_max: CALIBRATION_Q_MAX,
            keep_dynamic_masks: false,
            coarse_points: 21,
            fine_points: 21,
            max_iterations: 20,
            tolerance: 1e-6,
        }
    }
}

impl CalibrationConfig {
    /// Search interval of `parameter` starting from `start`.
    pub fn bounds(&self, parameter: GeometryParameter, start: f64) -> (f64, f64) {
        match parameter {
            GeometryParameter::XBeamCenter | GeometryParameter::YBeamCenter => {
                (start - self.center_bound, start + self.center_bound)
            }
            GeometryParameter::Tilt => {
                let t = self.tilt_bound_deg.to_radians();
                ((start - t).max(-FRAC_PI_2), (start + t).min(FRAC_PI_2))
            }
            GeometryParameter::Rotation => (0.0, TAU),
        }
    }

    /// Finite-difference increment of `parameter`.
    fn difference_step(parameter: GeometryParameter) -> f64 {
        match parameter {
            GeometryParameter::XBeamCenter | GeometryParameter::YBeamCenter => 0.1,
            GeometryParameter::Tilt | GeometryParameter::Rotation => 1e-3,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationResult {
    pub mode: CalibrationMode,
    pub initial: GeometryParameters,
    pub refined: GeometryParameters,
    /// Sum of squared half differences at `refined`.
    pub objective: f64,
    pub evaluations: usize,
}

/// Refines the geometry held by an [`Integrator`].
///
/// Integration settings are switched to a fine Q grid for the search and
/// restored afterwards; only the refined geometry is kept. On failure the
/// integrator is left exactly as it was.
pub struct Calibrator<'a> {
    integrator: &'a mut Integrator,
    config: CalibrationConfig,
}

impl<'a> Calibrator<'a> {
    pub fn new(integrator: &'a mut Integrator, config: CalibrationConfig) -> Self {
        Self { integrator, config }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Refine the parameters of the configured mode.
    pub fn calibrate(&mut self, frame: &Frame) -> Result<CalibrationResult> {
        self.run(frame, self.config.mode)
    }

    /// One-parameter passes over x, y, tilt and rotation in turn, each
    /// starting from the previous result.
    pub fn calibrate_sequential(&mut self, frame: &Frame) -> Result<Vec<CalibrationResult>> {
        [
            CalibrationMode::X,
            CalibrationMode::Y,
            CalibrationMode::Tilt,
            CalibrationMode::Rotation,
        ]
        .into_iter()
        .map(|mode| self.run(frame, mode))
        .collect()
    }

    fn run(&mut self, frame: &Frame, mode: CalibrationMode) -> Result<CalibrationResult> {
        let saved = self.integrator.config().clone();
        let outcome = self.search(frame, mode, &saved);

        let mut restored = saved;
        if let Ok(result) = &outcome {
            restored.geometry = result.refined.clone();
        }
        self.integrator.update(move |config| *config = restored)?;
        outcome
    }

    fn search(
        &mut self,
        frame: &Frame,
        mode: CalibrationMode,
        saved: &XPlanarConfig,
    ) -> Result<CalibrationResult> {
        let cfg = &self.config;
        self.integrator.update(|config| {
            config.integration.space = IntegrationSpace::Q;
            config.integration.q_step = cfg.q_step;
            config.integration.q_max = cfg.q_max;
            config.integration.uncertainty = false;
            if !cfg.keep_dynamic_masks {
                config.mask.dark = None;
                config.mask.bright = None;
            }
        })?;

        let initial = saved.geometry.clone();
        let crop = saved.integration.crop;
        let (h, w) = crop.cropped_dim(initial.x_dimension, initial.y_dimension);

        // Halves split at the starting beam center, in cropped coordinates.
        let split = |center: f64, offset: usize, len: usize| {
            let upper = len.saturating_sub(1).max(1) as f64;
            (center.round() - offset as f64).clamp(1.0, upper) as usize
        };
        let split_col = split(initial.x_beam_center, crop.left, w);
        let split_row = split(initial.y_beam_center, crop.top, h);
        let halves: Vec<HalfPair> = match mode {
            CalibrationMode::X => vec![vertical_split(split_col, w)],
            CalibrationMode::Y => vec![horizontal_split(split_row, h)],
            _ => vec![vertical_split(split_col, w), horizontal_split(split_row, h)],
        };

        let bins = self.integrator.config().integration.grid()?.len();
        let last = ((cfg.q_max / cfg.q_step).round() as usize).min(bins);
        let range = CALIBRATION_LOW_Q_SKIP..last;
        if range.is_empty() {
            return Err(XPlanarError::CalibrationDegenerate(format!(
                "no bins left to compare between {CALIBRATION_LOW_Q_SKIP} and {last}"
            )));
        }

        let parameters = mode.parameters();
        let x0: Vec<f64> = parameters.iter().map(|&p| initial.get(p)).collect();
        let bounds: Vec<(f64, f64)> = parameters
            .iter()
            .zip(&x0)
            .map(|(&p, &start)| cfg.bounds(p, start))
            .collect();
        let x0: Vec<f64> = x0
            .iter()
            .zip(&bounds)
            .map(|(&v, &(lo, hi))| v.clamp(lo, hi))
            .collect();

        let residual_len = halves.len() * range.len();
        let mut failure: Option<XPlanarError> = None;
        let best = {
            let integrator = &mut *self.integrator;
            let mut residual = |values: &[f64]| -> Vec<f64> {
                if failure.is_some() {
                    return vec![f64::NAN; residual_len];
                }
                match halfcut(integrator, frame, parameters, values, &halves, range.clone()) {
                    Ok(r) => {
                        debug!(?values, objective = sum_of_squares(&r), "Calibration step");
                        r
                    }
                    Err(e) => {
                        failure = Some(e);
                        vec![f64::NAN; residual_len]
                    }
                }
            };

            match (cfg.objective, parameters.len()) {
                (ObjectiveMode::Vector, _) => {
                    let steps: Vec<f64> = parameters
                        .iter()
                        .map(|&p| CalibrationConfig::difference_step(p))
                        .collect();
                    lsq::least_squares(&mut residual, &x0, &bounds, &steps, cfg.max_iterations)
                }
                (ObjectiveMode::Scalar, 1) => grid_refine(
                    |x| sum_of_squares(&residual(&[x])),
                    bounds[0],
                    cfg.coarse_points,
                    cfg.fine_points,
                    x0[0],
                ),
                (ObjectiveMode::Scalar, _) => powell(
                    |x| sum_of_squares(&residual(x)),
                    &x0,
                    &bounds,
                    cfg.max_iterations,
                    cfg.tolerance,
                ),
            }
        };

        if let Some(e) = failure {
            return Err(e);
        }
        let SearchResult {
            x,
            value,
            evaluations,
        } = best;
        if !value.is_finite() {
            return Err(XPlanarError::CalibrationDegenerate(format!(
                "objective not finite at any of {evaluations} sampled points in {mode} mode"
            )));
        }

        let mut refined = initial.clone();
        for (&p, &v) in parameters.iter().zip(&x) {
            refined.set(p, v);
        }
        let refined = refined.normalized();

        info!(
            %mode,
            x_beam_center = refined.x_beam_center,
            y_beam_center = refined.y_beam_center,
            tilt_deg = refined.tilt.to_degrees(),
            rotation_deg = refined.rotation.to_degrees(),
            objective = value,
            evaluations,
            "Calibration finished"
        );

        Ok(CalibrationResult {
            mode,
            initial,
            refined,
            objective: value,
            evaluations,
        })
    }
}
