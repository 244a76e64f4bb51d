use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_AUTO_MASK_HIGH, DEFAULT_AUTO_MASK_LOW, DEFAULT_BRIGHT_RANK, DEFAULT_BRIGHT_RATIO,
    DEFAULT_BRIGHT_WINDOW, DEFAULT_DARK_PERCENTILE, DEFAULT_DARK_RATIO, DEFAULT_DARK_WINDOW,
};

/// Border exclusion, in pixels, of the full detector.
///
/// `corner_radius` rounds the four inner corners: inside each
/// `corner_radius`-sized square next to the border, only the quarter disc
/// around the inset point stays valid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeMask {
    pub left: usize,
    pub right: usize,
    pub top: usize,
    pub bottom: usize,
    pub corner_radius: usize,
}

impl EdgeMask {
    pub fn uniform(width: usize) -> Self {
        Self {
            left: width,
            right: width,
            top: width,
            bottom: width,
            corner_radius: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Dead/dark pixel detection on the current frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DarkPixelConfig {
    /// Edge of the percentile filter window.
    pub window: usize,
    /// Percentile taken inside the window.
    pub percentile: f64,
    /// Threshold as a fraction of the frame average.
    pub ratio: f64,
}

impl Default for DarkPixelConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_DARK_WINDOW,
            percentile: DEFAULT_DARK_PERCENTILE,
            ratio: DEFAULT_DARK_RATIO,
        }
    }
}

/// Bright spot detection on the current frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrightPixelConfig {
    /// Edge of the rank filter window.
    pub window: usize,
    /// Which value, counted from the brightest, estimates the local level.
    pub rank_from_top: usize,
    /// A pixel is excluded above `ratio` times the local level.
    pub ratio: f64,
}

impl Default for BrightPixelConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_BRIGHT_WINDOW,
            rank_from_top: DEFAULT_BRIGHT_RANK,
            ratio: DEFAULT_BRIGHT_RATIO,
        }
    }
}

/// One-shot outlier mask estimated from a bootstrap frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoMaskConfig {
    /// Exclude pixels above `bin_average * (1 + high)`.
    pub high: f64,
    /// Exclude pixels below `bin_average * (1 - low)`.
    pub low: f64,
}

impl Default for AutoMaskConfig {
    fn default() -> Self {
        Self {
            high: DEFAULT_AUTO_MASK_HIGH,
            low: DEFAULT_AUTO_MASK_LOW,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    /// Mask images of the detector shape; nonzero pixels are excluded.
    pub files: Vec<PathBuf>,
    pub edges: EdgeMask,
    pub dark: Option<DarkPixelConfig>,
    pub bright: Option<BrightPixelConfig>,
    pub auto_mask: Option<AutoMaskConfig>,
}

impl MaskConfig {
    /// True when any per-frame detector is enabled.
    pub fn has_dynamic(&self) -> bool {
        self.dark.is_some() || self.bright.is_some()
    }
}
