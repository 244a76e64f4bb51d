mod common;

use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use ndarray::s;

use xplanar_core::error::XPlanarError;
use xplanar_core::geometry::{Crop, GeometryModel, GeometryParameter, GeometryParameters};

use common::{q_of, square_geometry};

// ---------------------------------------------------------------------------
// Field ranges
// ---------------------------------------------------------------------------

#[test]
fn test_two_theta_within_zero_and_pi() {
    let mut params = square_geometry(64, 20.0);
    params.tilt = 30f64.to_radians();
    params.rotation = 1.0;
    let model = GeometryModel::new(&params, Crop::default()).unwrap();
    for &tt in model.two_theta_field().iter() {
        assert!((0.0..=PI).contains(&tt), "two-theta {tt} out of range");
    }
}

#[test]
fn test_q_non_negative_and_monotonic_in_two_theta() {
    let params = square_geometry(48, 10.0);
    let model = GeometryModel::new(&params, Crop::default()).unwrap();
    let mut pairs: Vec<(f64, f64)> = model
        .two_theta_field()
        .iter()
        .zip(model.q_field().iter())
        .map(|(&tt, &q)| (tt, q))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    for w in pairs.windows(2) {
        assert!(w[0].1 >= 0.0);
        assert!(w[1].1 >= w[0].1, "Q not monotonic: {:?} -> {:?}", w[0], w[1]);
    }
}

#[test]
fn test_q_matches_formula() {
    let params = square_geometry(16, 8.0);
    let model = GeometryModel::new(&params, Crop::default()).unwrap();
    let tt = model.two_theta_field()[[3, 12]];
    assert_abs_diff_eq!(model.q_field()[[3, 12]], q_of(tt, 0.1), epsilon = 1e-12);
}

#[test]
fn test_azimuth_range() {
    let params = square_geometry(32, 16.0);
    let model = GeometryModel::new(&params, Crop::default()).unwrap();
    for &a in model.azimuth_field().iter() {
        assert!(a > -PI && a <= PI);
    }
    // Pixel to the right of the beam sits near azimuth 0.
    assert!(model.azimuth_field()[[16, 30]].abs() < 0.1);
}

// ---------------------------------------------------------------------------
// Symmetry and pixel centers
// ---------------------------------------------------------------------------

#[test]
fn test_untilted_field_is_mirror_symmetric_about_integer_center() {
    let params = square_geometry(64, 32.0);
    let model = GeometryModel::new(&params, Crop::default()).unwrap();
    let tt = model.two_theta_field();
    for row in 0..64 {
        for col in 0..64 {
            assert_abs_diff_eq!(tt[[row, col]], tt[[row, 63 - col]], epsilon = 1e-12);
            assert_abs_diff_eq!(tt[[row, col]], tt[[63 - row, col]], epsilon = 1e-12);
        }
    }
}

#[test]
fn test_pixel_centers_are_half_pixel_offset() {
    let params = square_geometry(10, 5.0);
    let model = GeometryModel::new(&params, Crop::default()).unwrap();
    assert_abs_diff_eq!(model.x_coordinates()[5], 0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(model.y_coordinates()[0], -0.9, epsilon = 1e-12);
}

#[test]
fn test_distance_at_normal_incidence_equals_distance() {
    let params = square_geometry(10, 5.0);
    let model = GeometryModel::new(&params, Crop::default()).unwrap();
    let d = model.distance_field()[[5, 5]];
    assert_abs_diff_eq!(d, (200.0f64.powi(2) + 0.02).sqrt(), epsilon = 1e-9);
}

#[test]
fn test_tilt_breaks_symmetry() {
    let mut params = square_geometry(64, 32.0);
    params.tilt = 2f64.to_radians();
    let model = GeometryModel::new(&params, Crop::default()).unwrap();
    let tt = model.two_theta_field();
    assert!((tt[[32, 2]] - tt[[32, 61]]).abs() > 1e-4);
}

/// Angle between the incident beam and the ray to pixel `(xr, yr)`, built
/// from unit vectors rather than the cached field.
fn two_theta_by_hand(xr: f64, yr: f64, source: [f64; 3]) -> f64 {
    let [sx, sy, sz] = source;
    let d = (sx * sx + sy * sy + sz * sz).sqrt();
    let beam = [-sx / d, -sy / d, -sz / d];
    let ray = [xr - sx, yr - sy, -sz];
    let len = (ray[0] * ray[0] + ray[1] * ray[1] + ray[2] * ray[2]).sqrt();
    let cos = (beam[0] * ray[0] + beam[1] * ray[1] + beam[2] * ray[2]) / len;
    cos.clamp(-1.0, 1.0).acos()
}

#[test]
fn test_tilt_sign_convention() {
    let mut params = square_geometry(64, 32.0);
    let tilt = 2f64.to_radians();
    params.tilt = tilt;
    let model = GeometryModel::new(&params, Crop::default()).unwrap();

    // Zero rotation tilts the source offset towards negative x.
    let [sx, sy, sz] = model.source_offset();
    assert!(sx < 0.0);
    assert_abs_diff_eq!(sx, -200.0 * tilt.sin(), epsilon = 1e-12);
    assert_abs_diff_eq!(sy, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(sz, 200.0 * tilt.cos(), epsilon = 1e-12);

    // The low-column side sits further from the beam; rows stay symmetric.
    let tt = model.two_theta_field();
    assert!(tt[[32, 1]] > tt[[32, 62]]);
    assert_abs_diff_eq!(tt[[1, 32]], tt[[62, 32]], epsilon = 1e-14);

    for &(row, col) in &[(0, 0), (5, 50), (32, 1), (32, 62), (60, 10), (63, 63)] {
        let xr = model.x_coordinates()[col];
        let yr = model.y_coordinates()[row];
        let expected = two_theta_by_hand(xr, yr, model.source_offset());
        assert_abs_diff_eq!(tt[[row, col]], expected, epsilon = 1e-12);
    }
}

#[test]
fn test_rotation_turns_the_tilt_direction() {
    let mut params = square_geometry(64, 32.0);
    params.tilt = 2f64.to_radians();
    params.rotation = std::f64::consts::FRAC_PI_2;
    let model = GeometryModel::new(&params, Crop::default()).unwrap();

    let [sx, sy, _] = model.source_offset();
    assert_abs_diff_eq!(sx, 0.0, epsilon = 1e-12);
    assert!(sy > 0.0);

    let tt = model.two_theta_field();
    assert!(tt[[62, 32]] > tt[[1, 32]]);
    for &(row, col) in &[(3, 40), (50, 12), (62, 32)] {
        let xr = model.x_coordinates()[col];
        let yr = model.y_coordinates()[row];
        let expected = two_theta_by_hand(xr, yr, model.source_offset());
        assert_abs_diff_eq!(tt[[row, col]], expected, epsilon = 1e-12);
    }
}

#[test]
fn test_crop_matches_full_field_slice() {
    let params = square_geometry(40, 17.3);
    let full = GeometryModel::new(&params, Crop::default()).unwrap();
    let crop = Crop::new(3, 5, 2, 7);
    let cropped = GeometryModel::new(&params, crop).unwrap();
    assert_eq!(cropped.dim(), (31, 32));
    let expected = full.two_theta_field().slice(s![2..33, 3..35]).to_owned();
    for (a, b) in cropped.two_theta_field().iter().zip(expected.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-14);
    }
}

#[test]
fn test_recomputed_two_theta_matches_cache() {
    let mut params = square_geometry(24, 11.0);
    params.tilt = 0.01;
    let model = GeometryModel::new(&params, Crop::default()).unwrap();
    assert_eq!(&model.recompute_two_theta(), model.two_theta_field());
}

#[test]
fn test_max_two_theta_bounds_field() {
    let params = square_geometry(50, 12.0);
    let model = GeometryModel::new(&params, Crop::default()).unwrap();
    let field_max = model.two_theta_field().iter().copied().fold(0.0, f64::max);
    assert_abs_diff_eq!(params.max_two_theta(), field_max, epsilon = 1e-12);
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn test_non_positive_distance_is_invalid() {
    let mut params = square_geometry(16, 8.0);
    params.distance = 0.0;
    assert!(matches!(
        GeometryModel::new(&params, Crop::default()),
        Err(XPlanarError::InvalidGeometry(_))
    ));
}

#[test]
fn test_crop_removing_everything_is_invalid() {
    let params = square_geometry(16, 8.0);
    assert!(matches!(
        GeometryModel::new(&params, Crop::new(8, 8, 0, 0)),
        Err(XPlanarError::InvalidGeometry(_))
    ));
}

#[test]
fn test_model_normalizes_rotation() {
    let mut params = square_geometry(8, 4.0);
    params.rotation = -PI / 2.0;
    let model = GeometryModel::new(&params, Crop::default()).unwrap();
    assert_abs_diff_eq!(model.params().rotation, 1.5 * PI, epsilon = 1e-12);
}

#[test]
fn test_parameter_get_set() {
    let mut params = GeometryParameters::default();
    params.set(GeometryParameter::YBeamCenter, 99.5);
    params.set(GeometryParameter::Tilt, 0.25);
    assert_eq!(params.get(GeometryParameter::YBeamCenter), 99.5);
    assert_eq!(params.get(GeometryParameter::Tilt), 0.25);
}
