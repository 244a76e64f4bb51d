use std::f64::consts::PI;
use std::sync::OnceLock;

use ndarray::{Array1, Array2, Zip};
use tracing::debug;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::Result;

use super::crop::Crop;
use super::params::{pixel_two_theta, GeometryParameters};

/// Per-pixel scattering geometry for one parameter set and crop.
///
/// Distance and two-theta fields are built eagerly; Q and azimuth are
/// materialized on first access and then reused. A model never changes
/// after construction: build a new one when the parameters change.
#[derive(Debug)]
pub struct GeometryModel {
    params: GeometryParameters,
    crop: Crop,
    source: [f64; 3],
    xr: Array1<f64>,
    yr: Array1<f64>,
    distance: Array2<f64>,
    two_theta: Array2<f64>,
    q: OnceLock<Array2<f64>>,
    azimuth: OnceLock<Array2<f64>>,
}

impl GeometryModel {
    pub fn new(params: &GeometryParameters, crop: Crop) -> Result<Self> {
        params.validate()?;
        let params = params.normalized();
        let crop = crop.validated(params.x_dimension, params.y_dimension)?;
        let (h, w) = crop.cropped_dim(params.x_dimension, params.y_dimension);

        // Pixel centers sit half a pixel past the integer index.
        let xr = Array1::from_iter((0..w).map(|col| {
            ((col + crop.left) as f64 - params.x_beam_center + 0.5) * params.x_pixel_size
        }));
        let yr = Array1::from_iter((0..h).map(|row| {
            ((row + crop.top) as f64 - params.y_beam_center + 0.5) * params.y_pixel_size
        }));

        let source = params.source_offset();
        let (distance, two_theta) = build_fields(&xr, &yr, source, params.distance);

        debug!(
            rows = h,
            cols = w,
            x_beam_center = params.x_beam_center,
            y_beam_center = params.y_beam_center,
            "Geometry fields built"
        );

        Ok(Self {
            params,
            crop,
            source,
            xr,
            yr,
            distance,
            two_theta,
            q: OnceLock::new(),
            azimuth: OnceLock::new(),
        })
    }

    pub fn params(&self) -> &GeometryParameters {
        &self.params
    }

    pub fn crop(&self) -> Crop {
        self.crop
    }

    /// Shape `(rows, cols)` of every field.
    pub fn dim(&self) -> (usize, usize) {
        self.distance.dim()
    }

    pub fn source_offset(&self) -> [f64; 3] {
        self.source
    }

    /// Physical x coordinate of each column's pixel center.
    pub fn x_coordinates(&self) -> &Array1<f64> {
        &self.xr
    }

    /// Physical y coordinate of each row's pixel center.
    pub fn y_coordinates(&self) -> &Array1<f64> {
        &self.yr
    }

    /// Sample-to-pixel path length.
    pub fn distance_field(&self) -> &Array2<f64> {
        &self.distance
    }

    /// Scattering angle in radians, in `[0, pi]`.
    pub fn two_theta_field(&self) -> &Array2<f64> {
        &self.two_theta
    }

    /// Momentum transfer `4 pi sin(theta) / lambda`.
    pub fn q_field(&self) -> &Array2<f64> {
        self.q.get_or_init(|| {
            let scale = 4.0 * PI / self.params.wavelength;
            self.two_theta.mapv(|tt| scale * (tt / 2.0).sin())
        })
    }

    /// Azimuth `atan2(y, x)` of each pixel center, in `(-pi, pi]`.
    pub fn azimuth_field(&self) -> &Array2<f64> {
        self.azimuth.get_or_init(|| {
            let (h, w) = self.dim();
            Array2::from_shape_fn((h, w), |(row, col)| {
                let a = self.yr[row].atan2(self.xr[col]);
                if a <= -PI {
                    a + 2.0 * PI
                } else {
                    a
                }
            })
        })
    }

    /// Two-theta recomputed from the parameters instead of read from the cache.
    pub fn recompute_two_theta(&self) -> Array2<f64> {
        build_fields(&self.xr, &self.yr, self.source, self.params.distance).1
    }
}

fn build_fields(
    xr: &Array1<f64>,
    yr: &Array1<f64>,
    source: [f64; 3],
    distance: f64,
) -> (Array2<f64>, Array2<f64>) {
    let (h, w) = (yr.len(), xr.len());
    let [sx, sy, sz] = source;
    let mut path = Array2::<f64>::zeros((h, w));
    let mut two_theta = Array2::<f64>::zeros((h, w));

    let kernel = |(row, col): (usize, usize), d: &mut f64, t: &mut f64| {
        let (x, y) = (xr[col], yr[row]);
        *d = ((x - sx).powi(2) + (y - sy).powi(2) + sz * sz).sqrt();
        *t = pixel_two_theta(x, y, source, distance);
    };

    let zip = Zip::indexed(&mut path).and(&mut two_theta);
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_for_each(kernel);
    } else {
        zip.for_each(kernel);
    }

    (path, two_theta)
}
