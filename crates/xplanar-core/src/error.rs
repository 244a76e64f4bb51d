use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum XPlanarError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Invalid binning: {0}")]
    InvalidBinning(String),

    #[error("Calibration degenerate: {0}")]
    CalibrationDegenerate(String),

    #[error("Failed to read {path:?} after {attempts} attempts: {reason}")]
    TransientReadFailure {
        path: PathBuf,
        attempts: usize,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),
}

impl XPlanarError {
    /// Check that `actual` matches `expected`, or produce a `ShapeMismatch`.
    pub fn check_shape(expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::ShapeMismatch { expected, actual })
        }
    }
}

pub type Result<T> = std::result::Result<T, XPlanarError>;
