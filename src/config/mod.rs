// SPDX-License-Identifier: MPL-2.0
//! This module handles the bus configuration, including loading and saving
//! per-severity default durations to a `settings.toml` file.
//!
//! # Examples
//!
//! ```no_run
//! use toast_bus::config::{self, Config};
//! use std::path::PathBuf;
//!
//! // Load existing configuration
//! let mut config = config::load().unwrap_or_default();
//!
//! // Keep error toasts on screen until dismissed
//! config.error_ms = Some(0);
//!
//! // To load/save from a specific path (e.g., for testing)
//! let temp_dir = PathBuf::from("./temp_config_dir");
//! std::fs::create_dir_all(&temp_dir).unwrap();
//! let temp_file = temp_dir.join("test_settings.toml");
//! config::save_to_path(&config, &temp_file).expect("Failed to save to path");
//! let loaded_config = config::load_from_path(&temp_file).expect("Failed to load from path");
//! assert_eq!(loaded_config.error_ms, Some(0));
//! std::fs::remove_dir_all(&temp_dir).unwrap();
//! ```

pub mod defaults;

pub use defaults::{DEFAULT_DURATION_MS, DEFAULT_ERROR_DURATION_MS, PERSISTENT_DURATION_MS};

use crate::error::Result;
use crate::notifications::Severity;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "settings.toml";
const APP_NAME: &str = "ToastBus";

/// Default notification lifetimes, in milliseconds, per severity.
///
/// A missing entry falls back to the built-in default; an entry of `0` makes
/// that severity persistent (removed only by an explicit dismiss).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub success_ms: Option<u64>,
    #[serde(default)]
    pub info_ms: Option<u64>,
    #[serde(default)]
    pub warning_ms: Option<u64>,
    #[serde(default)]
    pub error_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            success_ms: Some(DEFAULT_DURATION_MS),
            info_ms: Some(DEFAULT_DURATION_MS),
            warning_ms: Some(DEFAULT_DURATION_MS),
            error_ms: Some(DEFAULT_ERROR_DURATION_MS),
        }
    }
}

impl Config {
    /// Returns the configured default lifetime in milliseconds for `severity`.
    #[must_use]
    pub fn duration_ms_for(&self, severity: Severity) -> u64 {
        let configured = match severity {
            Severity::Success => self.success_ms,
            Severity::Info => self.info_ms,
            Severity::Warning => self.warning_ms,
            Severity::Error => self.error_ms,
        };
        configured.unwrap_or_else(|| builtin_duration_ms(severity))
    }

    /// Returns the default lifetime for `severity`, or `None` when that
    /// severity is configured as persistent.
    #[must_use]
    pub fn duration_for(&self, severity: Severity) -> Option<Duration> {
        match self.duration_ms_for(severity) {
            PERSISTENT_DURATION_MS => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

fn builtin_duration_ms(severity: Severity) -> u64 {
    match severity {
        Severity::Error => DEFAULT_ERROR_DURATION_MS,
        Severity::Success | Severity::Info | Severity::Warning => DEFAULT_DURATION_MS,
    }
}

fn get_default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(APP_NAME);
        path.push(CONFIG_FILE);
        path
    })
}

pub fn load() -> Result<Config> {
    if let Some(path) = get_default_config_path() {
        if path.exists() {
            return load_from_path(&path);
        }
    }
    Ok(Config::default())
}

pub fn save(config: &Config) -> Result<()> {
    if let Some(path) = get_default_config_path() {
        return save_to_path(config, &path);
    }
    Ok(())
}

/// Loads a configuration file. Unparseable content falls back to defaults
/// so a broken settings file never takes notifications down with it.
pub fn load_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    match toml::from_str(&content) {
        Ok(config) => Ok(config),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "invalid settings file, using defaults");
            Ok(Config::default())
        }
    }
}

pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
