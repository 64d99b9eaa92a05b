//! Path builders for the data directory and the config files layered over it.

use std::path::{Path, PathBuf};

use crate::internal::session::error::{Result, SessionError};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "VEGA_DATA_DIR";

const APP_DIR: &str = "vega";
const PROJECT_DIR: &str = ".vega";
const CONFIG_FILE: &str = "config.toml";

/// Root directory for persisted sessions.
///
/// `VEGA_DATA_DIR` if set and non-empty, else `<platform data dir>/vega`.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| SessionError::DataDir("no platform data directory".to_string()))
}

/// `{working_dir}/.vega/config.toml`
pub fn project_config(working_dir: &Path) -> PathBuf {
    working_dir.join(PROJECT_DIR).join(CONFIG_FILE)
}

/// `<platform config dir>/vega/config.toml`, if the platform has one.
pub fn user_config() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}
