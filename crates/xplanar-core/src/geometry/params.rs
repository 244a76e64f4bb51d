use std::f64::consts::{FRAC_PI_2, TAU};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_DIMENSION, DEFAULT_DISTANCE, DEFAULT_PIXEL_SIZE, DEFAULT_WAVELENGTH};
use crate::error::{Result, XPlanarError};

/// Detector position and pixel grid.
///
/// Lengths (`distance`, pixel sizes) share one unit, conventionally millimetres.
/// `wavelength` is in angstroms, so Q comes out in inverse angstroms.
/// Angles are held in radians; the serialized form uses degrees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryParameters {
    /// Beam center column, in pixels.
    pub x_beam_center: f64,
    /// Beam center row, in pixels.
    pub y_beam_center: f64,
    /// Sample-to-detector distance along the beam.
    pub distance: f64,
    /// Rotation of the tilt plane, radians.
    #[serde(rename = "rotation_deg", with = "degrees")]
    pub rotation: f64,
    /// Detector tilt, radians.
    #[serde(rename = "tilt_deg", with = "degrees")]
    pub tilt: f64,
    pub wavelength: f64,
    pub x_pixel_size: f64,
    pub y_pixel_size: f64,
    pub x_dimension: usize,
    pub y_dimension: usize,
}

impl Default for GeometryParameters {
    fn default() -> Self {
        Self {
            x_beam_center: DEFAULT_DIMENSION as f64 / 2.0,
            y_beam_center: DEFAULT_DIMENSION as f64 / 2.0,
            distance: DEFAULT_DISTANCE,
            rotation: 0.0,
            tilt: 0.0,
            wavelength: DEFAULT_WAVELENGTH,
            x_pixel_size: DEFAULT_PIXEL_SIZE,
            y_pixel_size: DEFAULT_PIXEL_SIZE,
            x_dimension: DEFAULT_DIMENSION,
            y_dimension: DEFAULT_DIMENSION,
        }
    }
}

impl GeometryParameters {
    /// Detector shape as `(rows, cols)`.
    pub fn dim(&self) -> (usize, usize) {
        (self.y_dimension, self.x_dimension)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.distance.is_finite() && self.distance > 0.0) {
            return Err(XPlanarError::InvalidGeometry(format!(
                "distance must be positive, got {}",
                self.distance
            )));
        }
        if !(self.wavelength.is_finite() && self.wavelength > 0.0) {
            return Err(XPlanarError::InvalidGeometry(format!(
                "wavelength must be positive, got {}",
                self.wavelength
            )));
        }
        if !(self.x_pixel_size > 0.0 && self.y_pixel_size > 0.0) {
            return Err(XPlanarError::InvalidGeometry(format!(
                "pixel sizes must be positive, got {}x{}",
                self.x_pixel_size, self.y_pixel_size
            )));
        }
        if self.x_dimension == 0 || self.y_dimension == 0 {
            return Err(XPlanarError::InvalidGeometry(format!(
                "detector must have pixels, got {}x{}",
                self.x_dimension, self.y_dimension
            )));
        }
        let finite = [
            self.x_beam_center,
            self.y_beam_center,
            self.rotation,
            self.tilt,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(XPlanarError::InvalidGeometry(
                "beam center, rotation and tilt must be finite".into(),
            ));
        }
        Ok(())
    }

    /// Rotation wrapped into `[0, 2pi)` and tilt clamped to `[-pi/2, pi/2]`.
    pub fn normalized(&self) -> Self {
        let mut p = self.clone();
        if p.rotation.is_finite() {
            p.rotation = p.rotation.rem_euclid(TAU);
        }
        p.tilt = p.tilt.clamp(-FRAC_PI_2, FRAC_PI_2);
        p
    }

    /// Position of the sample relative to the beam center, in detector-plane
    /// coordinates `(x, y, z)`, with `z` along the detector normal.
    pub fn source_offset(&self) -> [f64; 3] {
        let (sin_t, cos_t) = self.tilt.sin_cos();
        let (sin_r, cos_r) = self.rotation.sin_cos();
        [
            -self.distance * sin_t * cos_r,
            self.distance * sin_t * sin_r,
            self.distance * cos_t,
        ]
    }

    /// Scattering angle (radians) at pixel center `(col, row)` of the uncropped detector.
    pub fn two_theta_at(&self, col: f64, row: f64) -> f64 {
        let [sx, sy, sz] = self.source_offset();
        let xr = (col - self.x_beam_center + 0.5) * self.x_pixel_size;
        let yr = (row - self.y_beam_center + 0.5) * self.y_pixel_size;
        pixel_two_theta(xr, yr, [sx, sy, sz], self.distance)
    }

    /// Largest scattering angle over the four detector corners.
    pub fn max_two_theta(&self) -> f64 {
        let far_col = self.x_dimension.saturating_sub(1) as f64;
        let far_row = self.y_dimension.saturating_sub(1) as f64;
        [(0.0, 0.0), (far_col, 0.0), (0.0, far_row), (far_col, far_row)]
            .iter()
            .map(|&(c, r)| self.two_theta_at(c, r))
            .fold(0.0, f64::max)
    }

    pub fn get(&self, which: GeometryParameter) -> f64 {
        match which {
            GeometryParameter::XBeamCenter => self.x_beam_center,
            GeometryParameter::YBeamCenter => self.y_beam_center,
            GeometryParameter::Rotation => self.rotation,
            GeometryParameter::Tilt => self.tilt,
        }
    }

    pub fn set(&mut self, which: GeometryParameter, value: f64) {
        match which {
            GeometryParameter::XBeamCenter => self.x_beam_center = value,
            GeometryParameter::YBeamCenter => self.y_beam_center = value,
            GeometryParameter::Rotation => self.rotation = value,
            GeometryParameter::Tilt => self.tilt = value,
        }
    }

    /// Update parameters from a Fit2D calibration report pasted into a text file.
    ///
    /// Recognizes the "Refined ..." lines for beam centre, distance,
    /// wavelength, tilt plane rotation and tilt angle (degrees).
    /// Returns the number of lines applied.
    pub fn apply_fit2d_report(&mut self, text: &str) -> usize {
        let mut applied = 0;
        for line in text.lines() {
            let numbers = numbers_in(line);
            let first = numbers.first().copied();
            if line.contains("Refined Beam centre") && line.contains("pixels") {
                if let [x, y, ..] = numbers[..] {
                    self.x_beam_center = x;
                    self.y_beam_center = y;
                    applied += 1;
                }
            } else if line.contains("Refined sample to detector distance") {
                if let Some(v) = first {
                    self.distance = v;
                    applied += 1;
                }
            } else if line.contains("Refined wavelength") {
                if let Some(v) = first {
                    self.wavelength = v;
                    applied += 1;
                }
            } else if line.contains("Refined tilt plane rotation angle") {
                if let Some(v) = first {
                    self.rotation = v.to_radians();
                    applied += 1;
                }
            } else if line.contains("Refined tilt angle") {
                if let Some(v) = first {
                    self.tilt = v.to_radians();
                    applied += 1;
                }
            }
        }
        applied
    }
}

/// Scattering angle of a pixel at detector-plane offset `(xr, yr)` from the beam center.
///
/// The arccos argument is clamped to `[-1, 1]`; rounding near zero angle
/// would otherwise produce NaN.
pub(crate) fn pixel_two_theta(xr: f64, yr: f64, source: [f64; 3], distance: f64) -> f64 {
    let [sx, sy, sz] = source;
    let path = ((xr - sx).powi(2) + (yr - sy).powi(2) + sz * sz).sqrt();
    let cos_2t = ((sx - xr) * sx + (sy - yr) * sy + sz * sz) / (path * distance);
    cos_2t.clamp(-1.0, 1.0).acos()
}

fn numbers_in(line: &str) -> Vec<f64> {
    line.split(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
        .filter_map(|tok| tok.parse::<f64>().ok())
        .collect()
}

/// One refinable entry of [`GeometryParameters`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryParameter {
    XBeamCenter,
    YBeamCenter,
    Rotation,
    Tilt,
}

impl fmt::Display for GeometryParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XBeamCenter => write!(f, "x beam center"),
            Self::YBeamCenter => write!(f, "y beam center"),
            Self::Rotation => write!(f, "rotation"),
            Self::Tilt => write!(f, "tilt"),
        }
    }
}

mod degrees {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(radians: &f64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(radians.to_degrees())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        f64::deserialize(d).map(f64::to_radians)
    }
}
