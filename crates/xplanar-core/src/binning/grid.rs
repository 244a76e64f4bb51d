use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, XPlanarError};
use crate::geometry::GeometryModel;

/// The 1D axis pixels are binned onto.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationSpace {
    /// Scattering angle, in degrees.
    #[default]
    TwoTheta,
    /// Momentum transfer, in inverse wavelength units.
    Q,
}

impl fmt::Display for IntegrationSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TwoTheta => write!(f, "Two-Theta"),
            Self::Q => write!(f, "Q"),
        }
    }
}

impl IntegrationSpace {
    /// Per-pixel coordinate of `geometry` along this axis.
    pub fn field(self, geometry: &GeometryModel) -> Array2<f64> {
        match self {
            Self::TwoTheta => geometry.two_theta_field().mapv(f64::to_degrees),
            Self::Q => geometry.q_field().clone(),
        }
    }
}

/// Bin edges `[0, step/2, 3 step/2, ...]` below `max`, with centers at
/// whole multiples of `step` starting from 0.
#[derive(Clone, Debug, PartialEq)]
pub struct BinGrid {
    space: IntegrationSpace,
    step: f64,
    edges: Vec<f64>,
    centers: Vec<f64>,
}

impl BinGrid {
    pub fn new(space: IntegrationSpace, step: f64, max: f64) -> Result<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(XPlanarError::InvalidBinning(format!(
                "step must be positive, got {step}"
            )));
        }
        if !(max.is_finite() && max > 0.0) {
            return Err(XPlanarError::InvalidBinning(format!(
                "max must be positive, got {max}"
            )));
        }

        let mut edges = vec![0.0];
        let mut k = 0usize;
        loop {
            let edge = step / 2.0 + k as f64 * step;
            if edge >= max {
                break;
            }
            edges.push(edge);
            k += 1;
        }
        if edges.len() < 2 {
            return Err(XPlanarError::InvalidBinning(format!(
                "max {max} leaves no bins at step {step}"
            )));
        }

        let centers = (0..edges.len() - 1).map(|k| k as f64 * step).collect();
        Ok(Self {
            space,
            step,
            edges,
            centers,
        })
    }

    pub fn space(&self) -> IntegrationSpace {
        self.space
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    /// Index of the bin holding `value`; `None` for negative, NaN, or
    /// values past the last edge. The last bin includes its upper edge.
    pub fn locate(&self, value: f64) -> Option<usize> {
        let last = *self.edges.last()?;
        if !(value >= 0.0) || value > last {
            return None;
        }
        let half = self.step / 2.0;
        let bin = if value < half {
            0
        } else {
            ((value - half) / self.step).floor() as usize + 1
        };
        // Guard against rounding at bin edges.
        let bin = bin.min(self.len() - 1);
        if value < self.edges[bin] {
            Some(bin - 1)
        } else if bin + 1 < self.len() && value >= self.edges[bin + 1] {
            Some(bin + 1)
        } else {
            Some(bin)
        }
    }
}
