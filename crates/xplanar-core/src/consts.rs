/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Default X-ray wavelength in angstroms.
pub const DEFAULT_WAVELENGTH: f64 = 0.1;

/// Default sample-to-detector distance in millimetres.
pub const DEFAULT_DISTANCE: f64 = 200.0;

/// Default pixel edge length in millimetres.
pub const DEFAULT_PIXEL_SIZE: f64 = 0.2;

/// Default detector edge length in pixels.
pub const DEFAULT_DIMENSION: usize = 2048;

/// Default two-theta bin width in degrees.
pub const DEFAULT_TTH_STEP_DEG: f64 = 0.04;

/// Default upper two-theta limit in degrees.
pub const DEFAULT_TTH_MAX_DEG: f64 = 40.0;

/// Default Q bin width in inverse angstroms.
pub const DEFAULT_Q_STEP: f64 = 0.04;

/// Default upper Q limit in inverse angstroms.
pub const DEFAULT_Q_MAX: f64 = 40.0;

/// Default horizontal polarization fraction of the incident beam.
pub const DEFAULT_POLARIZATION_FACTOR: f64 = 0.95;

/// Window edge (pixels) of the local mean used by the per-pixel variance estimator.
pub const LOCAL_VARIANCE_WINDOW: usize = 5;

/// Per-bin self-correction keeps pixels above this fraction of the bin median.
pub const SELF_CORRECTION_LOW: f64 = 0.2;

/// Per-bin self-correction keeps pixels below this multiple of the bin median.
pub const SELF_CORRECTION_HIGH: f64 = 5.0;

/// Default window edge for the dark-pixel percentile filter.
pub const DEFAULT_DARK_WINDOW: usize = 3;

/// Default percentile used by the dark-pixel filter.
pub const DEFAULT_DARK_PERCENTILE: f64 = 5.0;

/// A pixel is dark when its local percentile is below this fraction of the frame mean.
pub const DEFAULT_DARK_RATIO: f64 = 0.1;

/// Structuring element edge for growing dark-pixel seeds.
pub const DARK_DILATION_SIZE: usize = 5;

/// Structuring element edge for shrinking dark-pixel clusters back.
/// Must stay larger than `DARK_DILATION_SIZE` so isolated seeds vanish.
pub const DARK_EROSION_SIZE: usize = 7;

/// Default window edge for the bright-pixel rank filter.
pub const DEFAULT_BRIGHT_WINDOW: usize = 5;

/// Default rank (counted from the brightest) used as the local background.
pub const DEFAULT_BRIGHT_RANK: usize = 5;

/// A pixel is bright when it exceeds the local rank value by this factor.
pub const DEFAULT_BRIGHT_RATIO: f64 = 1.2;

/// Structuring element edge covering the halo of a bright spot.
pub const BRIGHT_DILATION_SIZE: usize = 3;

/// Default relative tolerance above the bin average for the auto-mask bootstrap.
pub const DEFAULT_AUTO_MASK_HIGH: f64 = 0.5;

/// Default relative tolerance below the bin average for the auto-mask bootstrap.
pub const DEFAULT_AUTO_MASK_LOW: f64 = 0.5;

/// Q bin width used while self-calibrating.
pub const CALIBRATION_Q_STEP: f64 = 0.02;

/// Upper Q limit of the compared range while self-calibrating.
pub const CALIBRATION_Q_MAX: f64 = 20.0;

/// Number of low-Q bins skipped by the calibration objective.
pub const CALIBRATION_LOW_Q_SKIP: usize = 50;

/// Default number of image read attempts before giving up.
pub const DEFAULT_READ_ATTEMPTS: usize = 5;

/// Default delay between image read attempts, in milliseconds.
pub const DEFAULT_READ_DELAY_MS: u64 = 200;

/// Fraction of the configured step that a natural (one-pixel) step may
/// differ by before the configuration is reported as mismatched.
pub const STEP_MISMATCH_TOLERANCE: f64 = 0.05;
