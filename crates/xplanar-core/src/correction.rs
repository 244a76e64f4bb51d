use std::f64::consts::PI;
use std::fmt;

use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

use crate::binning::IntegrationSpace;
use crate::consts::DEFAULT_POLARIZATION_FACTOR;
use crate::error::{Result, XPlanarError};
use crate::geometry::GeometryModel;

/// Where the polarization correction takes its scattering angles from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolarizationSource {
    /// Recompute two-theta from the geometry parameters.
    #[default]
    Fresh,
    /// Derive two-theta from the cached field of the active integration space
    /// (inverting Q when integrating in Q).
    IntegrationField,
}

impl fmt::Display for PolarizationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fresh => write!(f, "Fresh"),
            Self::IntegrationField => write!(f, "Integration Field"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Apply the flat-detector solid-angle correction.
    pub solid_angle: bool,
    /// Power applied to the path-length ratio. 1.0 is the plain ratio;
    /// 3.0 gives the full obliquity-and-distance correction.
    pub solid_angle_exponent: f64,
    /// Apply the polarization correction.
    pub polarization: bool,
    /// Polarization fraction in `[0, 1]`.
    pub polarization_factor: f64,
    pub polarization_source: PolarizationSource,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            solid_angle: true,
            solid_angle_exponent: 1.0,
            polarization: false,
            polarization_factor: DEFAULT_POLARIZATION_FACTOR,
            polarization_source: PolarizationSource::default(),
        }
    }
}

impl CorrectionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.polarization_factor) {
            return Err(XPlanarError::InvalidConfig(format!(
                "polarization factor must lie in [0, 1], got {}",
                self.polarization_factor
            )));
        }
        if !self.solid_angle_exponent.is_finite() {
            return Err(XPlanarError::InvalidConfig(
                "solid angle exponent must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Multiplicative per-pixel correction, applied to raw intensities before binning.
#[derive(Clone, Debug)]
pub struct CorrectionModel {
    factor: Array2<f64>,
}

impl CorrectionModel {
    pub fn new(
        geometry: &GeometryModel,
        config: &CorrectionConfig,
        space: IntegrationSpace,
    ) -> Result<Self> {
        config.validate()?;
        let mut factor = if config.solid_angle {
            solid_angle(geometry, config.solid_angle_exponent)
        } else {
            Array2::ones(geometry.dim())
        };
        if config.polarization {
            factor *= &polarization(
                geometry,
                config.polarization_factor,
                config.polarization_source,
                space,
            );
        }
        Ok(Self { factor })
    }

    /// A correction of exactly 1 everywhere.
    pub fn identity(dim: (usize, usize)) -> Self {
        Self {
            factor: Array2::ones(dim),
        }
    }

    pub fn factor(&self) -> &Array2<f64> {
        &self.factor
    }

    /// `raw * factor`, pixel by pixel.
    pub fn apply(&self, raw: ArrayView2<f64>) -> Result<Array2<f64>> {
        XPlanarError::check_shape(self.factor.dim(), raw.dim())?;
        Ok(&raw * &self.factor)
    }
}

/// Ratio of each pixel's path length to the normal-incidence path length,
/// raised to `exponent`.
pub fn solid_angle(geometry: &GeometryModel, exponent: f64) -> Array2<f64> {
    let params = geometry.params();
    let normal = params.distance * params.tilt.cos();
    geometry
        .distance_field()
        .mapv(|d| (d / normal).powf(exponent))
}

/// Inverse of the powder polarization factor
/// `0.5 (1 + cos^2 2t) - 0.5 f cos(2 phi) sin^2 2t`.
pub fn polarization(
    geometry: &GeometryModel,
    factor: f64,
    source: PolarizationSource,
    space: IntegrationSpace,
) -> Array2<f64> {
    let two_theta = match (source, space) {
        (PolarizationSource::Fresh, _) => geometry.recompute_two_theta(),
        (PolarizationSource::IntegrationField, IntegrationSpace::TwoTheta) => {
            geometry.two_theta_field().clone()
        }
        (PolarizationSource::IntegrationField, IntegrationSpace::Q) => {
            let scale = geometry.params().wavelength / (4.0 * PI);
            geometry
                .q_field()
                .mapv(|q| 2.0 * (q * scale).clamp(-1.0, 1.0).asin())
        }
    };

    let mut out = Array2::<f64>::zeros(two_theta.dim());
    Zip::from(&mut out)
        .and(&two_theta)
        .and(geometry.azimuth_field())
        .for_each(|o, &tt, &phi| {
            let (sin_tt, cos_tt) = tt.sin_cos();
            let p = 0.5 * (1.0 + cos_tt * cos_tt)
                - 0.5 * factor * (2.0 * phi).cos() * sin_tt * sin_tt;
            *o = 1.0 / p;
        });
    out
}
