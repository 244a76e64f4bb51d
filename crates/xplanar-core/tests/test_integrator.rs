mod common;

use approx::assert_abs_diff_eq;
use ndarray::{s, Array2};

use xplanar_core::binning::IntegrationSpace;
use xplanar_core::error::XPlanarError;
use xplanar_core::frame::Frame;
use xplanar_core::geometry::Crop;
use xplanar_core::mask::{AutoMaskConfig, BrightPixelConfig, EdgeMask};
use xplanar_core::pipeline::Integrator;

use common::{flat_frame, square_geometry, uncorrected_config};

fn integrator(dim: usize) -> Integrator {
    Integrator::new(uncorrected_config(square_geometry(dim, dim as f64 / 2.0))).unwrap()
}

fn assert_occupied_bins_equal(pattern: &xplanar_core::binning::Pattern, value: f64) {
    let mut occupied = 0;
    for (k, &n) in pattern.counts().iter().enumerate() {
        if n > 0 {
            assert_abs_diff_eq!(pattern.intensity()[k], value, epsilon = 1e-9);
            occupied += 1;
        } else {
            assert_eq!(pattern.intensity()[k], 0.0);
        }
    }
    assert!(occupied > 0);
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_symmetric_detector_flat_image() {
    let mut integrator = integrator(1024);
    let frame = flat_frame((1024, 1024), 100.0);
    let pattern = integrator.integrate(&frame).unwrap();
    assert_eq!(pattern.data().nrows(), 2);
    assert_occupied_bins_equal(&pattern, 100.0);
    assert_eq!(pattern.counts().iter().sum::<usize>(), 1024 * 1024);
}

#[test]
fn test_repeated_integration_is_bit_identical() {
    let mut config = uncorrected_config(square_geometry(96, 40.3));
    config.correction.solid_angle = true;
    config.correction.polarization = true;
    config.integration.uncertainty = true;
    let mut integrator = Integrator::new(config).unwrap();
    let frame = Frame::new(Array2::from_shape_fn((96, 96), |(r, c)| {
        ((r * 31 + c * 17) % 23) as f64 + 5.0
    }));
    let first = integrator.integrate(&frame).unwrap();
    let second = integrator.integrate(&frame).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_fully_masked_frame_gives_zero_pattern() {
    let mut config = uncorrected_config(square_geometry(64, 32.0));
    config.mask.edges = EdgeMask::uniform(32);
    let mut integrator = Integrator::new(config).unwrap();
    let pattern = integrator.integrate(&flat_frame((64, 64), 7.0)).unwrap();
    assert!(pattern.intensity().iter().all(|&v| v == 0.0));
    assert_eq!(pattern.counts().iter().sum::<usize>(), 0);
}

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

#[test]
fn test_frame_of_wrong_shape_is_rejected() {
    let mut integrator = integrator(32);
    let result = integrator.integrate(&flat_frame((32, 33), 1.0));
    assert!(matches!(result, Err(XPlanarError::ShapeMismatch { .. })));
}

#[test]
fn test_invalid_config_is_rejected_at_construction() {
    let mut config = uncorrected_config(square_geometry(32, 16.0));
    config.integration.tth_step_deg = 0.0;
    assert!(matches!(
        Integrator::new(config),
        Err(XPlanarError::InvalidBinning(_))
    ));
}

// ---------------------------------------------------------------------------
// Update path
// ---------------------------------------------------------------------------

#[test]
fn test_update_rebuilds_geometry() {
    let mut integrator = integrator(64);
    let before = integrator.geometry().unwrap().two_theta_field()[[0, 0]];
    integrator.update(|c| c.geometry.distance = 100.0).unwrap();
    let after = integrator.geometry().unwrap().two_theta_field()[[0, 0]];
    assert!(after > before);
}

#[test]
fn test_failed_update_keeps_previous_config() {
    let mut integrator = integrator(64);
    let result = integrator.update(|c| c.geometry.distance = -1.0);
    assert!(matches!(result, Err(XPlanarError::InvalidGeometry(_))));
    assert_eq!(integrator.config().geometry.distance, 200.0);
    assert!(integrator.integrate(&flat_frame((64, 64), 1.0)).is_ok());
}

#[test]
fn test_update_to_q_space() {
    let mut integrator = integrator(64);
    integrator
        .update(|c| {
            c.integration.space = IntegrationSpace::Q;
            c.integration.q_step = 0.1;
            c.integration.q_max = 10.0;
        })
        .unwrap();
    let pattern = integrator.integrate(&flat_frame((64, 64), 3.0)).unwrap();
    assert_eq!(pattern.space(), IntegrationSpace::Q);
    assert_abs_diff_eq!(pattern.x()[7], 0.7, epsilon = 1e-12);
    assert_occupied_bins_equal(&pattern, 3.0);
}

// ---------------------------------------------------------------------------
// Cropping and windows
// ---------------------------------------------------------------------------

#[test]
fn test_crop_removes_pixels_from_pattern() {
    let mut integrator = integrator(64);
    integrator
        .update(|c| c.integration.crop = Crop::new(10, 0, 0, 4))
        .unwrap();
    let pattern = integrator.integrate(&flat_frame((64, 64), 2.0)).unwrap();
    assert_eq!(pattern.counts().iter().sum::<usize>(), 54 * 60);
    assert_occupied_bins_equal(&pattern, 2.0);
}

#[test]
fn test_window_halves_partition_the_frame() {
    let mut integrator = integrator(64);
    let frame = flat_frame((64, 64), 5.0);
    let full = integrator.integrate(&frame).unwrap();
    let left = integrator
        .integrate_window(&frame, Crop::columns(0, 32, 64))
        .unwrap();
    let right = integrator
        .integrate_window(&frame, Crop::columns(32, 64, 64))
        .unwrap();
    for k in 0..full.len() {
        assert_eq!(left.counts()[k] + right.counts()[k], full.counts()[k]);
    }
    assert_occupied_bins_equal(&left, 5.0);
    assert_occupied_bins_equal(&right, 5.0);
}

// ---------------------------------------------------------------------------
// Masks
// ---------------------------------------------------------------------------

#[test]
fn test_dynamic_mask_excludes_hot_pixel() {
    let mut config = uncorrected_config(square_geometry(64, 32.0));
    config.mask.bright = Some(BrightPixelConfig::default());
    let mut integrator = Integrator::new(config).unwrap();
    let mut data = Array2::from_elem((64, 64), 10.0);
    data[[50, 50]] = 10_000.0;
    let pattern = integrator.integrate(&Frame::new(data)).unwrap();
    assert_occupied_bins_equal(&pattern, 10.0);
    assert_eq!(pattern.counts().iter().sum::<usize>(), 64 * 64 - 9);
}

#[test]
fn test_composed_mask_merges_static_and_dynamic() {
    let mut config = uncorrected_config(square_geometry(32, 16.0));
    config.mask.edges = EdgeMask::uniform(1);
    config.mask.bright = Some(BrightPixelConfig::default());
    let mut integrator = Integrator::new(config).unwrap();
    let mut data = Array2::from_elem((32, 32), 10.0);
    data[[10, 10]] = 500.0;
    let frame = Frame::new(data);

    let static_only = integrator.composed_mask(None).unwrap();
    assert_eq!(static_only.iter().filter(|&&v| v).count(), 32 * 32 - 30 * 30);
    let composed = integrator.composed_mask(Some(&frame)).unwrap();
    assert_eq!(composed.iter().filter(|&&v| v).count(), 32 * 32 - 30 * 30 + 9);
}

#[test]
fn test_imported_mask_is_applied() {
    let mut mask = Array2::from_elem((32, 32), false);
    mask.slice_mut(s![.., ..16]).fill(true);
    let mut integrator = integrator(32).with_imported_masks(vec![mask]);
    let pattern = integrator.integrate(&flat_frame((32, 32), 1.0)).unwrap();
    assert_eq!(pattern.counts().iter().sum::<usize>(), 32 * 16);
}

#[test]
fn test_auto_mask_bootstrap_removes_outliers() {
    let mut config = uncorrected_config(square_geometry(64, 32.0));
    config.mask.auto_mask = Some(AutoMaskConfig::default());
    let mut integrator = Integrator::new(config).unwrap();

    let mut data = Array2::from_elem((64, 64), 100.0);
    for &(r, c) in &[(5, 5), (58, 10), (12, 55), (60, 60)] {
        data[[r, c]] = 1000.0;
    }
    let frame = Frame::new(data);

    let excluded = integrator.bootstrap_auto_mask(&frame).unwrap();
    assert_eq!(excluded, 4);
    assert!(integrator.auto_mask().unwrap()[[5, 5]]);

    let pattern = integrator.integrate(&frame).unwrap();
    assert_occupied_bins_equal(&pattern, 100.0);
    assert_eq!(pattern.counts().iter().sum::<usize>(), 64 * 64 - 4);

    // Changing the geometry keeps the bootstrap; changing the crop drops it.
    integrator.update(|c| c.geometry.distance = 210.0).unwrap();
    assert!(integrator.auto_mask().is_some());
    integrator
        .update(|c| c.integration.crop = Crop::new(1, 0, 0, 0))
        .unwrap();
    assert!(integrator.auto_mask().is_none());
}

#[test]
fn test_auto_mask_without_config_is_noop() {
    let mut integrator = integrator(16);
    let excluded = integrator
        .bootstrap_auto_mask(&flat_frame((16, 16), 1.0))
        .unwrap();
    assert_eq!(excluded, 0);
    assert!(integrator.auto_mask().is_none());
}

// ---------------------------------------------------------------------------
// Summation and options
// ---------------------------------------------------------------------------

#[test]
fn test_integrate_sum_adds_frames() {
    let mut integrator = integrator(32);
    let frames = [flat_frame((32, 32), 40.0), flat_frame((32, 32), 60.0)];
    let pattern = integrator.integrate_sum(&frames).unwrap();
    assert_occupied_bins_equal(&pattern, 100.0);
}

#[test]
fn test_integrate_sum_of_nothing_fails() {
    let mut integrator = integrator(32);
    assert!(integrator.integrate_sum(&[]).is_err());
}

#[test]
fn test_solid_angle_correction_raises_outer_bins() {
    let mut config = uncorrected_config(square_geometry(128, 64.0));
    config.correction.solid_angle = true;
    let mut integrator = Integrator::new(config).unwrap();
    let pattern = integrator.integrate(&flat_frame((128, 128), 1.0)).unwrap();
    let last = pattern
        .counts()
        .iter()
        .rposition(|&n| n > 0)
        .unwrap();
    assert!(pattern.intensity()[last] > pattern.intensity()[1]);
    assert!(pattern.intensity()[last] > 1.0);
}

#[test]
fn test_uncertainty_row_is_emitted() {
    let mut integrator = integrator(32);
    integrator.update(|c| c.integration.uncertainty = true).unwrap();
    let pattern = integrator.integrate(&flat_frame((32, 32), 4.0)).unwrap();
    assert_eq!(pattern.data().nrows(), 3);
    assert!(pattern.uncertainty().unwrap().iter().all(|&v| v.abs() < 1e-9));
}
