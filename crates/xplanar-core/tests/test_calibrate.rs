mod common;

use xplanar_core::binning::IntegrationSpace;
use xplanar_core::calibrate::{
    CalibrationConfig, CalibrationMode, Calibrator, ObjectiveMode,
};
use xplanar_core::error::XPlanarError;
use xplanar_core::frame::Frame;
use xplanar_core::geometry::GeometryParameters;
use xplanar_core::pipeline::Integrator;

use common::{flat_frame, ring_frame, square_geometry, uncorrected_config};

const RINGS: &[(f64, f64, f64)] = &[
    (3.0, 0.15, 200.0),
    (6.0, 0.15, 150.0),
    (9.0, 0.15, 120.0),
    (12.0, 0.15, 100.0),
    (15.0, 0.15, 80.0),
];

/// Rings rendered at `truth`, integrator seeded at `seed`.
fn setup(truth: &GeometryParameters, seed: GeometryParameters) -> (Integrator, Frame) {
    let frame = ring_frame(truth, RINGS, 20.0);
    let integrator = Integrator::new(uncorrected_config(seed)).unwrap();
    (integrator, frame)
}

fn x_config(bound: f64, points: usize) -> CalibrationConfig {
    CalibrationConfig {
        mode: CalibrationMode::X,
        center_bound: bound,
        coarse_points: points,
        fine_points: points,
        ..CalibrationConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

#[test]
fn test_calibration_recovers_x_offset() {
    let mut truth = square_geometry(1024, 512.0);
    truth.x_beam_center = 515.0;
    let (mut integrator, frame) = setup(&truth, square_geometry(1024, 512.0));

    let result = Calibrator::new(&mut integrator, x_config(5.0, 11))
        .calibrate(&frame)
        .unwrap();

    let x = result.refined.x_beam_center;
    assert!((x - 515.0).abs() < 0.5, "refined x beam center {x}");
    assert_eq!(integrator.config().geometry.x_beam_center, x);
    assert_eq!(integrator.config().geometry.y_beam_center, 512.0);
    assert!(result.evaluations > 11);
}

#[test]
fn test_calibration_recovers_y_offset() {
    let mut truth = square_geometry(256, 128.0);
    truth.y_beam_center = 126.0;
    let (mut integrator, frame) = setup(&truth, square_geometry(256, 128.0));

    let config = CalibrationConfig {
        mode: CalibrationMode::Y,
        ..x_config(4.0, 17)
    };
    let result = Calibrator::new(&mut integrator, config)
        .calibrate(&frame)
        .unwrap();
    let y = result.refined.y_beam_center;
    assert!((y - 126.0).abs() < 0.5, "refined y beam center {y}");
    assert_eq!(result.refined.x_beam_center, 128.0);
}

#[test]
fn test_calibration_restores_integration_settings() {
    let mut truth = square_geometry(256, 128.0);
    truth.x_beam_center = 129.0;
    let (mut integrator, frame) = setup(&truth, square_geometry(256, 128.0));
    integrator
        .update(|c| c.integration.uncertainty = true)
        .unwrap();
    let before = integrator.config().integration.clone();

    Calibrator::new(&mut integrator, x_config(3.0, 13))
        .calibrate(&frame)
        .unwrap();

    assert_eq!(integrator.config().integration, before);
    assert_eq!(
        integrator.config().integration.space,
        IntegrationSpace::TwoTheta
    );
    let pattern = integrator.integrate(&frame).unwrap();
    assert_eq!(pattern.data().nrows(), 3);
}

fn tilt_config() -> CalibrationConfig {
    CalibrationConfig {
        mode: CalibrationMode::Tilt,
        q_max: 8.0,
        ..CalibrationConfig::default()
    }
}

#[test]
fn test_calibration_recovers_tilt() {
    let mut truth = square_geometry(256, 128.0);
    truth.tilt = 2f64.to_radians();
    truth.rotation = 0.3;
    let mut seed = square_geometry(256, 128.0);
    seed.rotation = 0.3;
    let (mut integrator, frame) = setup(&truth, seed);

    let result = Calibrator::new(&mut integrator, tilt_config())
        .calibrate(&frame)
        .unwrap();

    let tilt = result.refined.tilt.to_degrees();
    assert!((tilt - 2.0).abs() < 0.3, "refined tilt {tilt} deg");
    assert_eq!(result.refined.rotation, 0.3);
    assert_eq!(integrator.config().geometry.tilt, result.refined.tilt);
}

#[test]
fn test_calibration_keeps_a_large_starting_tilt() {
    let mut truth = square_geometry(256, 128.0);
    truth.tilt = 8f64.to_radians();
    truth.rotation = 0.3;
    let (mut integrator, frame) = setup(&truth, truth.clone());

    let result = Calibrator::new(&mut integrator, tilt_config())
        .calibrate(&frame)
        .unwrap();

    let tilt = result.refined.tilt.to_degrees();
    assert!((tilt - 8.0).abs() < 0.5, "refined tilt {tilt} deg");
}

#[test]
fn test_joint_calibration_recovers_both_centers() {
    let mut truth = square_geometry(256, 128.0);
    truth.x_beam_center = 129.5;
    truth.y_beam_center = 127.0;
    let (mut integrator, frame) = setup(&truth, square_geometry(256, 128.0));

    let config = CalibrationConfig {
        mode: CalibrationMode::All,
        max_iterations: 6,
        ..CalibrationConfig::default()
    };
    let result = Calibrator::new(&mut integrator, config)
        .calibrate(&frame)
        .unwrap();

    let (x, y) = (result.refined.x_beam_center, result.refined.y_beam_center);
    assert!((x - 129.5).abs() < 0.5, "refined x beam center {x}");
    assert!((y - 127.0).abs() < 0.5, "refined y beam center {y}");
    assert_eq!(result.mode, CalibrationMode::All);
    assert_eq!(integrator.config().geometry.x_beam_center, x);
}

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

#[test]
fn test_blank_frame_is_degenerate_and_leaves_geometry() {
    let seed = square_geometry(128, 64.0);
    let mut integrator = Integrator::new(uncorrected_config(seed.clone())).unwrap();
    let before = integrator.config().clone();

    let result = Calibrator::new(&mut integrator, x_config(3.0, 7))
        .calibrate(&flat_frame((128, 128), 0.0));

    assert!(matches!(result, Err(XPlanarError::CalibrationDegenerate(_))));
    assert_eq!(integrator.config(), &before);
    assert_eq!(integrator.config().geometry, seed);
}

#[test]
fn test_blank_frame_is_degenerate_in_vector_mode() {
    let mut integrator = Integrator::new(uncorrected_config(square_geometry(64, 32.0))).unwrap();
    let config = CalibrationConfig {
        objective: ObjectiveMode::Vector,
        max_iterations: 5,
        ..x_config(2.0, 5)
    };
    let result = Calibrator::new(&mut integrator, config).calibrate(&flat_frame((64, 64), 0.0));
    assert!(matches!(result, Err(XPlanarError::CalibrationDegenerate(_))));
    assert_eq!(integrator.config().geometry.x_beam_center, 32.0);
}

#[test]
fn test_vector_mode_stays_in_bounds() {
    let mut truth = square_geometry(192, 96.0);
    truth.x_beam_center = 97.0;
    let (mut integrator, frame) = setup(&truth, square_geometry(192, 96.0));
    let config = CalibrationConfig {
        objective: ObjectiveMode::Vector,
        max_iterations: 10,
        ..x_config(2.0, 5)
    };
    let result = Calibrator::new(&mut integrator, config)
        .calibrate(&frame)
        .unwrap();
    let x = result.refined.x_beam_center;
    assert!((94.0..=98.0).contains(&x), "x beam center {x}");
    assert!(result.objective.is_finite());
}

// ---------------------------------------------------------------------------
// Modes and bounds
// ---------------------------------------------------------------------------

#[test]
fn test_mode_parameters() {
    use xplanar_core::geometry::GeometryParameter::*;
    assert_eq!(CalibrationMode::X.parameters(), &[XBeamCenter]);
    assert_eq!(CalibrationMode::Rotation.parameters(), &[Rotation]);
    assert_eq!(CalibrationMode::All.parameters().len(), 4);
    assert_eq!(format!("{}", CalibrationMode::Tilt), "tilt");
}

#[test]
fn test_default_bounds() {
    use std::f64::consts::TAU;
    use xplanar_core::geometry::GeometryParameter;

    let config = CalibrationConfig::default();
    assert_eq!(config.bounds(GeometryParameter::XBeamCenter, 100.0), (97.0, 103.0));
    let (lo, hi) = config.bounds(GeometryParameter::Tilt, 0.0);
    assert!((hi - 5f64.to_radians()).abs() < 1e-12 && lo == -hi);
    assert_eq!(config.bounds(GeometryParameter::Rotation, 1.0), (0.0, TAU));
}

#[test]
fn test_tilt_bounds_follow_the_start() {
    use std::f64::consts::FRAC_PI_2;
    use xplanar_core::geometry::GeometryParameter;

    let config = CalibrationConfig::default();
    let (lo, hi) = config.bounds(GeometryParameter::Tilt, 8f64.to_radians());
    assert!((lo - 3f64.to_radians()).abs() < 1e-12, "lower tilt bound {lo}");
    assert!((hi - 13f64.to_radians()).abs() < 1e-12, "upper tilt bound {hi}");

    let (lo, hi) = config.bounds(GeometryParameter::Tilt, FRAC_PI_2 - 0.01);
    assert_eq!(hi, FRAC_PI_2);
    assert!(lo < FRAC_PI_2 - 0.01);
    let (lo, _) = config.bounds(GeometryParameter::Tilt, -FRAC_PI_2);
    assert_eq!(lo, -FRAC_PI_2);
}

#[test]
fn test_sequential_calibration_runs_every_pass() {
    let mut truth = square_geometry(128, 64.0);
    truth.x_beam_center = 65.0;
    let (mut integrator, frame) = setup(&truth, square_geometry(128, 64.0));
    let config = CalibrationConfig {
        q_max: 8.0,
        ..x_config(2.0, 9)
    };
    let results = Calibrator::new(&mut integrator, config)
        .calibrate_sequential(&frame)
        .unwrap();
    let modes: Vec<CalibrationMode> = results.iter().map(|r| r.mode).collect();
    assert_eq!(
        modes,
        vec![
            CalibrationMode::X,
            CalibrationMode::Y,
            CalibrationMode::Tilt,
            CalibrationMode::Rotation
        ]
    );
    // Each pass starts where the previous one ended.
    assert_eq!(results[1].initial.x_beam_center, results[0].refined.x_beam_center);
    assert!((results[0].refined.x_beam_center - 65.0).abs() < 0.5);
}
