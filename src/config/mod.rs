//! CRM Configuration Module
//!
//! Provides deployment configuration loaded from TOML, replacing the fixed
//! model constants with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `CRM_CONFIG` environment variable (path to TOML file)
//! 2. `crm_config.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! ## Usage
//!
//! ```ignore
//! // In main():
//! config::init(CrmConfig::load());
//!
//! // Anywhere in the codebase:
//! let window = config::get().forecast.window;
//! ```

mod crm_config;
pub mod defaults;

pub use crm_config::*;

use std::sync::OnceLock;

/// Global configuration, initialized once at startup.
static CRM_CONFIG: OnceLock<CrmConfig> = OnceLock::new();

/// Initialize the global configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: CrmConfig) {
    if CRM_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get a reference to the global configuration.
///
/// Falls back to built-in defaults when `init()` was never called, which
/// is what library users and unit tests get.
pub fn get() -> &'static CrmConfig {
    CRM_CONFIG.get_or_init(CrmConfig::default)
}

