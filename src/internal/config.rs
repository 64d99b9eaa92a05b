//! Lifecycle configuration: loading and layering.
//!
//! Two TOML tiers are read and merged key by key, project over user:
//!
//! 1. `{working_dir}/.vega/config.toml` (project-local)
//! 2. `~/.config/vega/config.toml` (user-global)
//!
//! `VEGA_AUTOSAVE` and `VEGA_SAVE_INTERVAL_SECS` are applied last.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    internal::session::error::{Result, SessionError},
    utils::path,
};

pub const AUTOSAVE_ENV: &str = "VEGA_AUTOSAVE";
pub const SAVE_INTERVAL_ENV: &str = "VEGA_SAVE_INTERVAL_SECS";

/// Settings for the session lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Master switch; when off, start and save do nothing.
    pub enabled: bool,
    /// Seconds between periodic saves.
    pub save_interval_secs: u64,
    /// Whether the most recent session is offered for restore at startup.
    pub auto_load: bool,
    /// Sessions idle longer than this are deleted. 0 keeps them forever.
    pub max_age_days: u64,
    /// Retain at most this many sessions. 0 means unlimited.
    pub max_sessions: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            save_interval_secs: 30,
            auto_load: true,
            max_age_days: 30,
            max_sessions: 100,
        }
    }
}

impl LifecycleConfig {
    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs.max(1))
    }

    /// `None` when age-based retention is disabled.
    pub fn max_age(&self) -> Option<chrono::Duration> {
        match self.max_age_days {
            0 => None,
            days => i64::try_from(days).ok().and_then(chrono::Duration::try_days),
        }
    }

    /// Apply `VEGA_AUTOSAVE` and `VEGA_SAVE_INTERVAL_SECS` if set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(AUTOSAVE_ENV) {
            match parse_bool(&value) {
                Some(enabled) => self.enabled = enabled,
                None => tracing::warn!("ignoring {AUTOSAVE_ENV}={value:?}: not a boolean"),
            }
        }
        if let Ok(value) = std::env::var(SAVE_INTERVAL_ENV) {
            match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.save_interval_secs = secs,
                _ => tracing::warn!("ignoring {SAVE_INTERVAL_ENV}={value:?}: not a positive integer"),
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Load the effective lifecycle configuration for `working_dir`.
///
/// A tier that is missing contributes nothing; one that fails to parse is
/// logged and skipped.
pub fn load_lifecycle_config(working_dir: &Path) -> LifecycleConfig {
    let mut merged = toml::Table::new();

    // User-global first so project-local keys win.
    let tiers = [path::user_config(), Some(path::project_config(working_dir))];
    for config_path in tiers.into_iter().flatten() {
        match load_config_file(&config_path) {
            Ok(Some(table)) => {
                for (key, value) in table {
                    merged.insert(key, value);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("{e}"),
        }
    }

    let mut config = match toml::Value::Table(merged).try_into::<LifecycleConfig>() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("invalid lifecycle config, using defaults: {e}");
            LifecycleConfig::default()
        }
    };
    config.apply_env_overrides();
    config
}

/// Read one tier. `Ok(None)` when the file does not exist.
pub fn load_config_file(config_path: &Path) -> Result<Option<toml::Table>> {
    let content = match std::fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SessionError::io(config_path, e)),
    };
    let table: toml::Table =
        content
            .parse()
            .map_err(|e: toml::de::Error| SessionError::Config {
                path: config_path.to_path_buf(),
                message: e.to_string(),
            })?;
    // Each tier must be valid on its own.
    toml::Value::Table(table.clone())
        .try_into::<LifecycleConfig>()
        .map_err(|e| SessionError::Config {
            path: config_path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(Some(table))
}
