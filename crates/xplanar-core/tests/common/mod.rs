#![allow(dead_code)]

use std::f64::consts::PI;

use ndarray::Array2;

use xplanar_core::correction::CorrectionConfig;
use xplanar_core::frame::Frame;
use xplanar_core::geometry::{Crop, GeometryModel, GeometryParameters};
use xplanar_core::pipeline::XPlanarConfig;

/// Square detector of `dim` pixels with the beam at `center`, 200 mm away,
/// 0.2 mm pixels and a 0.1 A wavelength.
pub fn square_geometry(dim: usize, center: f64) -> GeometryParameters {
    GeometryParameters {
        x_beam_center: center,
        y_beam_center: center,
        distance: 200.0,
        rotation: 0.0,
        tilt: 0.0,
        wavelength: 0.1,
        x_pixel_size: 0.2,
        y_pixel_size: 0.2,
        x_dimension: dim,
        y_dimension: dim,
    }
}

/// Configuration with solid-angle and polarization corrections switched off.
pub fn uncorrected_config(geometry: GeometryParameters) -> XPlanarConfig {
    XPlanarConfig {
        geometry,
        correction: CorrectionConfig {
            solid_angle: false,
            polarization: false,
            ..CorrectionConfig::default()
        },
        ..XPlanarConfig::default()
    }
}

pub fn flat_frame(dim: (usize, usize), value: f64) -> Frame {
    Frame::new(Array2::from_elem(dim, value))
}

/// Azimuthally symmetric rings: Gaussian peaks `(q, sigma, amplitude)` in Q
/// over a constant `base`, rendered with the geometry of `params`.
pub fn ring_frame(params: &GeometryParameters, rings: &[(f64, f64, f64)], base: f64) -> Frame {
    let model = GeometryModel::new(params, Crop::default()).unwrap();
    let data = model.q_field().mapv(|q| {
        base + rings
            .iter()
            .map(|&(q0, sigma, amp)| amp * (-(q - q0).powi(2) / (2.0 * sigma * sigma)).exp())
            .sum::<f64>()
    });
    Frame::new(data)
}

/// Q at two-theta `tth` (radians) for `wavelength`.
pub fn q_of(tth: f64, wavelength: f64) -> f64 {
    4.0 * PI * (tth / 2.0).sin() / wavelength
}
