//! System-wide default constants.
//!
//! Centralises the fixed model constants of the CRM pipeline. Grouped by
//! subsystem for easy discovery. Operator-tunable values live in
//! [`super::CrmConfig`] and default to the constants below.

// ============================================================================
// Field-average fallbacks
// ============================================================================

/// Porosity fallback (fraction).
pub const FALLBACK_POROSITY: f64 = 0.15;

/// Net thickness fallback (m).
pub const FALLBACK_THICKNESS_M: f64 = 10.0;

/// Oil viscosity fallback (cP).
pub const FALLBACK_VISCOSITY_CP: f64 = 1.0;

/// Permeability fallback (mD).
pub const FALLBACK_PERMEABILITY_MD: f64 = 100.0;

/// Total compressibility fallback (1/bar).
pub const FALLBACK_COMPRESSIBILITY: f64 = 0.0005;

/// Drainage radius fallback (m).
pub const FALLBACK_DRAINAGE_RADIUS_M: f64 = 500.0;

/// Well-bore radius fallback (m).
pub const FALLBACK_WELL_RADIUS_M: f64 = 0.1;

/// Skin factor fallback (dimensionless).
pub const FALLBACK_SKIN_FACTOR: f64 = 0.0;

// ============================================================================
// Geodesy / productivity
// ============================================================================

/// Mean Earth radius used by the haversine distance (km).
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Unit-conversion constant of the radial-flow productivity index.
pub const PRODUCTIVITY_UNIT_CONSTANT: f64 = 0.008_527;

/// Lower bound on J when dividing by it for the time constant.
pub const MIN_PRODUCTIVITY_INDEX: f64 = 0.001;

/// Time constant returned when it cannot be computed.
pub const FALLBACK_TIME_CONSTANT: f64 = 1.0;

// ============================================================================
// Connectivity estimator
// ============================================================================

/// Added to the producer rate so the rate ratio never divides by zero.
pub const RATE_RATIO_EPSILON: f64 = 1e-4;

/// Rate assumed for a well with no monthly sample.
pub const MISSING_RATE_DEFAULT: f64 = 1.0;

/// Weight of the freshly computed ratio when blending with `last_ratio`.
pub const SMOOTHING_RAW_WEIGHT: f64 = 0.75;

/// Weight of the persisted `last_ratio` when blending.
pub const SMOOTHING_LAST_RATIO_WEIGHT: f64 = 0.15;

// ============================================================================
// Ratio forecaster
// ============================================================================

/// Minimum history length for the trend/average projection.
pub const MIN_POINTS_FOR_TREND: usize = 3;

/// Number of trailing points in the simple moving average.
pub const SMA_POINTS: usize = 3;

/// Blend weight of the moving average in the projected ratio.
pub const SMA_BLEND_WEIGHT: f64 = 0.3;

/// Blend weight of the linear trend in the projected ratio.
pub const TREND_BLEND_WEIGHT: f64 = 0.7;

/// Confidence weight of a link projected from its history.
pub const TREND_CONFIDENCE: f64 = 1.5;

/// Confidence weight of a link that reuses its calculated ratio.
pub const FALLBACK_CONFIDENCE: f64 = 0.8;

/// Minimum relative distance between forecast and calculated ratio.
pub const MIN_DEVIATION_FRACTION: f64 = 0.05;

// ============================================================================
// Production forecaster
// ============================================================================

/// Months of production history handed to the series forecaster.
pub const PRODUCTION_HISTORY_MONTHS: usize = 24;

/// Minimum months of history before a production forecast is attempted.
pub const MIN_PRODUCTION_SAMPLES: usize = 3;

/// Window size passed to the series forecaster.
pub const FORECAST_WINDOW: usize = 3;

/// Confidence level passed to the series forecaster.
pub const FORECAST_CONFIDENCE: f64 = 0.95;

/// Upper bound on a single series-forecaster call (ms).
pub const FORECAST_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// Server / storage
// ============================================================================

/// Default HTTP bind address.
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";

/// Default sled database directory.
pub const DEFAULT_STORAGE_PATH: &str = "./data/crm.db";

/// Environment variable holding the coordinate key when not set in the file.
pub const DEFAULT_CODEC_KEY_ENV: &str = "CRM_COORDINATE_KEY";
