use std::path::Path;
use std::thread;
use std::time::Duration;

use image::DynamicImage;
use ndarray::{s, Array2};
use tracing::{debug, warn};

use crate::error::{Result, XPlanarError};
use crate::frame::{Frame, FrameMetadata};
use crate::pipeline::InputConfig;

/// Load a grayscale image file as raw pixel values.
///
/// 8- and 16-bit grayscale keep their integer counts; float images keep
/// their values; anything else is converted to 16-bit luma.
pub fn load_raw(path: &Path) -> Result<Array2<f64>> {
    let img = image::open(path)?;
    let (w, h) = (img.width() as usize, img.height() as usize);

    let values: Vec<f64> = match img {
        DynamicImage::ImageLuma8(gray) => gray.into_raw().into_iter().map(f64::from).collect(),
        DynamicImage::ImageLuma16(gray) => gray.into_raw().into_iter().map(f64::from).collect(),
        float @ (DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_)) => float
            .to_luma32f()
            .into_raw()
            .into_iter()
            .map(f64::from)
            .collect(),
        other => other
            .to_luma16()
            .into_raw()
            .into_iter()
            .map(f64::from)
            .collect(),
    };

    Array2::from_shape_vec((h, w), values).map_err(|e| {
        XPlanarError::InvalidConfig(format!("{}: pixel buffer mismatch: {e}", path.display()))
    })
}

/// Bounded retry for reads that may race an acquisition process still
/// writing the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: usize, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn from_config(input: &InputConfig) -> Self {
        Self::new(input.read_attempts, Duration::from_millis(input.read_delay_ms))
    }

    /// Call `read` until it succeeds, sleeping between failures. The last
    /// failure is reported as `TransientReadFailure`.
    pub fn run<T, F>(&self, path: &Path, mut read: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match read() {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.attempts => {
                    return Err(XPlanarError::TransientReadFailure {
                        path: path.to_path_buf(),
                        attempts: attempt,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        attempt,
                        error = %e,
                        "Image read failed, retrying"
                    );
                    thread::sleep(self.delay);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&InputConfig::default())
    }
}

/// Reads detector frames with orientation fixes and background subtraction.
#[derive(Clone, Debug)]
pub struct ImageLoader {
    flip_horizontal: bool,
    flip_vertical: bool,
    background: Option<Array2<f64>>,
    retry: RetryPolicy,
}

impl ImageLoader {
    /// A configured background that cannot be read is skipped with a warning.
    pub fn new(input: &InputConfig) -> Self {
        let mut loader = Self {
            flip_horizontal: input.flip_horizontal,
            flip_vertical: input.flip_vertical,
            background: None,
            retry: RetryPolicy::from_config(input),
        };
        if let Some(path) = &input.background {
            match loader.retry.run(path, || load_raw(path)) {
                Ok(raw) => loader.background = Some(loader.orient(raw)),
                Err(e) => warn!(path = %path.display(), error = %e, "Background disabled"),
            }
        }
        loader
    }

    pub fn with_background(mut self, background: Array2<f64>) -> Self {
        self.background = Some(background);
        self
    }

    pub fn has_background(&self) -> bool {
        self.background.is_some()
    }

    /// Read `path`, flip it, clamp negative counts to 0 and subtract the background.
    pub fn load(&self, path: &Path) -> Result<Frame> {
        let raw = self.retry.run(path, || load_raw(path))?;
        let mut data = self.orient(raw);
        data.mapv_inplace(|v| v.max(0.0));

        let background_subtracted = match &self.background {
            Some(background) => {
                XPlanarError::check_shape(data.dim(), background.dim())?;
                data -= background;
                true
            }
            None => false,
        };

        debug!(
            path = %path.display(),
            rows = data.nrows(),
            cols = data.ncols(),
            background_subtracted,
            "Frame loaded"
        );
        Ok(Frame::with_metadata(
            data,
            FrameMetadata {
                source: Some(path.to_path_buf()),
                background_subtracted,
            },
        ))
    }

    fn orient(&self, data: Array2<f64>) -> Array2<f64> {
        orient(data, self.flip_horizontal, self.flip_vertical)
    }
}

/// Mirror columns and/or rows of an image as read from disk.
pub(crate) fn orient<T: Clone>(
    data: Array2<T>,
    flip_horizontal: bool,
    flip_vertical: bool,
) -> Array2<T> {
    match (flip_horizontal, flip_vertical) {
        (false, false) => data,
        (true, false) => data.slice(s![.., ..;-1]).to_owned(),
        (false, true) => data.slice(s![..;-1, ..]).to_owned(),
        (true, true) => data.slice(s![..;-1, ..;-1]).to_owned(),
    }
}
