//! Application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate locations.
//!
//! # Environment Overrides
//!
//! - `VOXTRIS_CONFIG_DIR`: overrides [`config_dir`]
//! - `VOXTRIS_DATA_DIR`: overrides [`data_dir`]

use std::path::PathBuf;

/// Directory holding `config.toml`.
///
/// Resolves to `dirs::config_dir()/voxtris/` unless `VOXTRIS_CONFIG_DIR` is set.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("VOXTRIS_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("voxtris"))
        .unwrap_or_else(|| PathBuf::from("/tmp/voxtris-config"))
}

/// Application data root.
///
/// Resolves to `dirs::data_dir()/voxtris/` unless `VOXTRIS_DATA_DIR` is set.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("VOXTRIS_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("voxtris"))
        .unwrap_or_else(|| PathBuf::from("/tmp/voxtris-data"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}
