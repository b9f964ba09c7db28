//! CRM Configuration - operator-tunable model knobs as TOML values
//!
//! Each struct implements `Default` with values matching the constants in
//! [`super::defaults`], so a missing config file changes nothing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a CRM engine deployment.
///
/// Load with `CrmConfig::load()` which searches:
/// 1. `$CRM_CONFIG` env var
/// 2. `./crm_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrmConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Record store location and backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Coordinate cipher settings
    #[serde(default)]
    pub codec: CodecConfig,

    /// Fallback values used when the store has no usable samples
    #[serde(default)]
    pub field_defaults: FieldDefaultsConfig,

    /// Blend between computed ratio and persisted `last_ratio`
    #[serde(default)]
    pub smoothing: SmoothingConfig,

    /// Ratio and production forecasting
    #[serde(default)]
    pub forecast: ForecastConfig,
}

impl CrmConfig {
    /// Load configuration using the standard search order:
    /// 1. `$CRM_CONFIG` environment variable
    /// 2. `./crm_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("CRM_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded CRM config from CRM_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from CRM_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "CRM_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("crm_config.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded CRM config from ./crm_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./crm_config.toml, using defaults");
                }
            }
        }

        info!("No crm_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all values for internal consistency.
    ///
    /// Rules:
    /// - Physical fallbacks must be finite and positive (skin may be any finite value)
    /// - Blend weights must be finite and non-negative
    /// - Forecast window must be >= 1 and fit inside the history window
    /// - Confidence must lie in (0, 1)
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let f = &self.field_defaults;
        for (name, value) in [
            ("porosity", f.porosity),
            ("thickness", f.thickness),
            ("viscosity", f.viscosity),
            ("permeability", f.permeability),
            ("compressibility", f.compressibility),
            ("drainage_radius", f.drainage_radius),
            ("well_radius", f.well_radius),
        ] {
            Self::check_positive(value, &format!("field_defaults.{name}"), &mut errors);
        }
        if !f.skin_factor.is_finite() {
            errors.push(format!(
                "field_defaults.skin_factor must be finite, got {}",
                f.skin_factor
            ));
        }
        if f.porosity > 1.0 {
            errors.push(format!(
                "field_defaults.porosity ({:.3}) must be a fraction <= 1",
                f.porosity
            ));
        }
        if f.drainage_radius <= f.well_radius {
            errors.push(format!(
                "field_defaults.drainage_radius ({:.3}) must exceed well_radius ({:.3})",
                f.drainage_radius, f.well_radius
            ));
        }

        let s = &self.smoothing;
        Self::check_non_negative(s.raw_weight, "smoothing.raw_weight", &mut errors);
        Self::check_non_negative(s.last_ratio_weight, "smoothing.last_ratio_weight", &mut errors);

        let fc = &self.forecast;
        if fc.window == 0 {
            errors.push("forecast.window must be > 0".to_string());
        }
        if fc.history_months < fc.window {
            errors.push(format!(
                "forecast.history_months ({}) must be >= forecast.window ({})",
                fc.history_months, fc.window
            ));
        }
        if !(fc.confidence > 0.0 && fc.confidence < 1.0) {
            errors.push(format!(
                "forecast.confidence must be in (0, 1), got {}",
                fc.confidence
            ));
        }
        for (name, value) in [
            ("min_deviation_fraction", fc.min_deviation_fraction),
            ("sma_weight", fc.sma_weight),
            ("trend_weight", fc.trend_weight),
            ("trend_confidence", fc.trend_confidence),
            ("fallback_confidence", fc.fallback_confidence),
        ] {
            Self::check_non_negative(value, &format!("forecast.{name}"), &mut errors);
        }

        if self.codec.mode == CodecMode::Chacha
            && self.codec.key_hex.is_none()
            && self.codec.key_env.trim().is_empty()
        {
            errors.push("codec.mode = \"chacha\" requires codec.key_hex or codec.key_env".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_positive(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() || value <= 0.0 {
            errors.push(format!("{name} must be finite and > 0, got {value}"));
        }
    }

    fn check_non_negative(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() || value < 0.0 {
            errors.push(format!("{name} must be finite and >= 0, got {value}"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Server / Storage
// ============================================================================

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, overridden by `CRM_SERVER_ADDR` and `--addr`.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String { defaults::DEFAULT_SERVER_ADDR.to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: default_server_addr() }
    }
}

/// Which repository implementation backs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sled,
    Memory,
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// sled database directory.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    #[serde(default)]
    pub backend: StorageBackend,
}

fn default_storage_path() -> PathBuf { PathBuf::from(defaults::DEFAULT_STORAGE_PATH) }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            backend: StorageBackend::default(),
        }
    }
}

// ============================================================================
// Codec
// ============================================================================

/// How stored coordinate strings are turned into numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CodecMode {
    /// Coordinates are stored as plain decimal strings.
    #[default]
    Plain,
    /// Coordinates are ChaCha20-Poly1305 ciphertext.
    Chacha,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    #[serde(default)]
    pub mode: CodecMode,

    /// 64 hex characters. Prefer `key_env` outside development.
    #[serde(default)]
    pub key_hex: Option<String>,

    /// Environment variable consulted when `key_hex` is unset.
    #[serde(default = "default_key_env")]
    pub key_env: String,
}

fn default_key_env() -> String { defaults::DEFAULT_CODEC_KEY_ENV.to_string() }

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            mode: CodecMode::default(),
            key_hex: None,
            key_env: default_key_env(),
        }
    }
}

impl CodecConfig {
    /// Resolve the key material, file value first, then the environment.
    pub fn resolve_key_hex(&self) -> Option<String> {
        self.key_hex
            .clone()
            .or_else(|| std::env::var(&self.key_env).ok())
    }
}

// ============================================================================
// Field Defaults
// ============================================================================

/// Fallback field averages, used per parameter when the store holds no
/// positive sample or cannot be read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefaultsConfig {
    #[serde(default = "default_fd_porosity")]
    pub porosity: f64,
    #[serde(default = "default_fd_thickness")]
    pub thickness: f64,
    #[serde(default = "default_fd_viscosity")]
    pub viscosity: f64,
    #[serde(default = "default_fd_permeability")]
    pub permeability: f64,
    #[serde(default = "default_fd_compressibility")]
    pub compressibility: f64,
    #[serde(default = "default_fd_drainage_radius")]
    pub drainage_radius: f64,
    #[serde(default = "default_fd_well_radius")]
    pub well_radius: f64,
    #[serde(default = "default_fd_skin")]
    pub skin_factor: f64,
}

fn default_fd_porosity() -> f64 { defaults::FALLBACK_POROSITY }
fn default_fd_thickness() -> f64 { defaults::FALLBACK_THICKNESS_M }
fn default_fd_viscosity() -> f64 { defaults::FALLBACK_VISCOSITY_CP }
fn default_fd_permeability() -> f64 { defaults::FALLBACK_PERMEABILITY_MD }
fn default_fd_compressibility() -> f64 { defaults::FALLBACK_COMPRESSIBILITY }
fn default_fd_drainage_radius() -> f64 { defaults::FALLBACK_DRAINAGE_RADIUS_M }
fn default_fd_well_radius() -> f64 { defaults::FALLBACK_WELL_RADIUS_M }
fn default_fd_skin() -> f64 { defaults::FALLBACK_SKIN_FACTOR }

impl Default for FieldDefaultsConfig {
    fn default() -> Self {
        Self {
            porosity: default_fd_porosity(),
            thickness: default_fd_thickness(),
            viscosity: default_fd_viscosity(),
            permeability: default_fd_permeability(),
            compressibility: default_fd_compressibility(),
            drainage_radius: default_fd_drainage_radius(),
            well_radius: default_fd_well_radius(),
            skin_factor: default_fd_skin(),
        }
    }
}

// ============================================================================
// Smoothing
// ============================================================================

/// `ratio = raw_weight * raw + last_ratio_weight * last_ratio` when a
/// positive `last_ratio` is persisted. The weights do not sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothingConfig {
    #[serde(default = "default_sm_raw")]
    pub raw_weight: f64,
    #[serde(default = "default_sm_last")]
    pub last_ratio_weight: f64,
}

fn default_sm_raw() -> f64 { defaults::SMOOTHING_RAW_WEIGHT }
fn default_sm_last() -> f64 { defaults::SMOOTHING_LAST_RATIO_WEIGHT }

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            raw_weight: default_sm_raw(),
            last_ratio_weight: default_sm_last(),
        }
    }
}

// ============================================================================
// Forecast
// ============================================================================

/// Ratio projection and production forecast tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Trailing months of production handed to the series forecaster.
    #[serde(default = "default_fc_history")]
    pub history_months: usize,

    /// Window size for the series forecaster.
    #[serde(default = "default_fc_window")]
    pub window: usize,

    /// Confidence level for the series forecaster.
    #[serde(default = "default_fc_confidence")]
    pub confidence: f64,

    /// Per-call timeout for the series forecaster (ms). 0 disables it.
    #[serde(default = "default_fc_timeout")]
    pub timeout_ms: u64,

    /// Minimum relative gap between forecast and calculated ratio.
    #[serde(default = "default_fc_min_dev")]
    pub min_deviation_fraction: f64,

    #[serde(default = "default_fc_sma_weight")]
    pub sma_weight: f64,

    #[serde(default = "default_fc_trend_weight")]
    pub trend_weight: f64,

    /// Confidence weight for links projected from history.
    #[serde(default = "default_fc_trend_conf")]
    pub trend_confidence: f64,

    /// Confidence weight for links without enough history.
    #[serde(default = "default_fc_fallback_conf")]
    pub fallback_confidence: f64,
}

fn default_fc_history() -> usize { defaults::PRODUCTION_HISTORY_MONTHS }
fn default_fc_window() -> usize { defaults::FORECAST_WINDOW }
fn default_fc_confidence() -> f64 { defaults::FORECAST_CONFIDENCE }
fn default_fc_timeout() -> u64 { defaults::FORECAST_TIMEOUT_MS }
fn default_fc_min_dev() -> f64 { defaults::MIN_DEVIATION_FRACTION }
fn default_fc_sma_weight() -> f64 { defaults::SMA_BLEND_WEIGHT }
fn default_fc_trend_weight() -> f64 { defaults::TREND_BLEND_WEIGHT }
fn default_fc_trend_conf() -> f64 { defaults::TREND_CONFIDENCE }
fn default_fc_fallback_conf() -> f64 { defaults::FALLBACK_CONFIDENCE }

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            history_months: default_fc_history(),
            window: default_fc_window(),
            confidence: default_fc_confidence(),
            timeout_ms: default_fc_timeout(),
            min_deviation_fraction: default_fc_min_dev(),
            sma_weight: default_fc_sma_weight(),
            trend_weight: default_fc_trend_weight(),
            trend_confidence: default_fc_trend_conf(),
            fallback_confidence: default_fc_fallback_conf(),
        }
    }
}
