//! Environment-driven configuration
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file by `dotenvy` before `AppConfig::from_env` runs. Blank variables count
//! as unset.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::aggregate::{LookbackWindow, TrackedMedication};

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

pub const APP_NAME: &str = "wellness-log";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ENV_DB_PATH: &str = "WELLNESS_DB_PATH";
pub const ENV_WINDOW: &str = "WELLNESS_WINDOW";
pub const ENV_TRACKED_MEDICATION: &str = "WELLNESS_TRACKED_MEDICATION";
pub const ENV_TRACKED_MEDICATION_ID: &str = "WELLNESS_TRACKED_MEDICATION_ID";
pub const ENV_LOG: &str = "WELLNESS_LOG";

const DEFAULT_LOG_FILTER: &str = "info";

/// ---------------------------------------------------------------------------
/// Errors
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ConfigError {
  #[error("No local data directory available; set WELLNESS_DB_PATH")]
  NoDataDir,

  #[error("Invalid lookback window '{0}' (expected 7d, 30d or 90d)")]
  InvalidWindow(String),
}

/// ---------------------------------------------------------------------------
/// App Config
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
  pub db_path: PathBuf,
  pub window: LookbackWindow,
  pub tracked_medication: TrackedMedication,
  pub log_filter: String,
}

impl AppConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let db_path = match read_var(ENV_DB_PATH) {
      Some(path) => PathBuf::from(path),
      None => default_db_path()?,
    };

    let window = match read_var(ENV_WINDOW) {
      Some(raw) => raw
        .parse::<LookbackWindow>()
        .map_err(|_| ConfigError::InvalidWindow(raw))?,
      None => LookbackWindow::default(),
    };

    let defaults = TrackedMedication::default();
    let tracked_medication = TrackedMedication {
      name_contains: read_var(ENV_TRACKED_MEDICATION).unwrap_or(defaults.name_contains),
      id: read_var(ENV_TRACKED_MEDICATION_ID),
    };

    Ok(Self {
      db_path,
      window,
      tracked_medication,
      log_filter: read_var(ENV_LOG).unwrap_or_else(default_log_filter),
    })
  }
}

pub fn default_log_filter() -> String {
  DEFAULT_LOG_FILTER.to_string()
}

/// ~/.local/share/wellness-log/wellness-log.db on Linux,
/// ~/Library/Application Support/wellness-log/wellness-log.db on macOS
pub fn default_db_path() -> Result<PathBuf, ConfigError> {
  let data_dir = dirs::data_local_dir().ok_or(ConfigError::NoDataDir)?;
  Ok(data_dir.join(APP_NAME).join(format!("{APP_NAME}.db")))
}

fn read_var(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
