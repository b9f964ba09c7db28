//! Config Validation Tests
//!
//! Loads `crm_config.toml` documents from disk and checks that invalid
//! values are rejected with every problem listed.

use crm_engine::config::{CodecMode, ConfigError, CrmConfig, StorageBackend};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn full_config_file_loads() {
    let file = write_config(
        r#"
[server]
addr = "127.0.0.1:9100"

[storage]
path = "/var/lib/crm/store"
backend = "memory"

[codec]
mode = "chacha"
key_env = "FIELD_KEY"

[field_defaults]
porosity = 0.22
permeability = 140.0

[smoothing]
raw_weight = 0.8
last_ratio_weight = 0.2

[forecast]
history_months = 36
window = 4
timeout_ms = 0
"#,
    );

    let cfg = CrmConfig::load_from_file(file.path()).unwrap();
    assert_eq!(cfg.server.addr, "127.0.0.1:9100");
    assert_eq!(cfg.storage.backend, StorageBackend::Memory);
    assert_eq!(cfg.codec.mode, CodecMode::Chacha);
    assert_eq!(cfg.codec.key_env, "FIELD_KEY");
    assert_eq!(cfg.field_defaults.porosity, 0.22);
    // Untouched keys keep their defaults
    assert_eq!(cfg.field_defaults.viscosity, 1.0);
    assert_eq!(cfg.smoothing.raw_weight, 0.8);
    assert_eq!(cfg.forecast.window, 4);
    assert_eq!(cfg.forecast.confidence, 0.95);
}

#[test]
fn empty_file_is_all_defaults() {
    let file = write_config("");
    let cfg = CrmConfig::load_from_file(file.path()).unwrap();
    assert_eq!(cfg.forecast.history_months, 24);
    assert_eq!(cfg.smoothing.last_ratio_weight, 0.15);
    assert_eq!(cfg.storage.backend, StorageBackend::Sled);
}

#[test]
fn every_invalid_value_is_reported() {
    let file = write_config(
        r#"
[field_defaults]
porosity = 1.5
viscosity = 0.0

[forecast]
window = 30
history_months = 12
confidence = 1.2
"#,
    );

    match CrmConfig::load_from_file(file.path()) {
        Err(ConfigError::Validation(errors)) => {
            assert!(errors.iter().any(|e| e.contains("porosity")), "{errors:?}");
            assert!(errors.iter().any(|e| e.contains("viscosity")), "{errors:?}");
            assert!(errors.iter().any(|e| e.contains("history_months")), "{errors:?}");
            assert!(errors.iter().any(|e| e.contains("confidence")), "{errors:?}");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn parse_error_names_the_file() {
    let file = write_config("[forecast\nwindow = 3");
    let err = CrmConfig::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(..)));
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

#[test]
fn missing_file_is_io_error() {
    let err = CrmConfig::load_from_file(std::path::Path::new("/nonexistent/crm_config.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
}
