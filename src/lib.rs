pub mod aggregate;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod db;
pub mod insights;
pub mod models;
pub mod store;

#[cfg(test)]
mod test_utils;

use config::AppConfig;
use db::AppState;
use tracing_subscriber::EnvFilter;

pub use aggregate::{aggregate, LookbackWindow, TrackedMedication};
pub use catalog::{MetricId, MetricSpec, Reducer, CATALOG};
pub use commands::{AnalyticsReport, CommandError};
pub use insights::{correlation, generate_insights, generate_insights_with, InsightSettings};
pub use store::{RecordRepository, RecordSnapshot, SqliteRecordStore, StoreError};

/// Top-level failure of the command-line entry point
#[derive(Debug, thiserror::Error)]
pub enum RunError {
  #[error("Configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Command(#[from] CommandError),

  #[error("Runtime error: {0}")]
  Runtime(#[from] std::io::Error),

  #[error("Output error: {0}")]
  Output(#[from] serde_json::Error),
}

/// Load configuration, open the journal and print the analytics report for
/// the configured window as JSON
pub fn run() -> Result<(), RunError> {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  let config = AppConfig::from_env()?;

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
    )
    .with_writer(std::io::stderr)
    .init();

  tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

  let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

  let report = runtime.block_on(async move {
    let pool = db::initialize_db(&config.db_path).await?;
    let state = AppState::new(pool, config);
    let report = commands::get_analytics_report(&state.store(), &state.config, None).await;
    state.db.close().await;
    Ok::<_, RunError>(report?)
  })?;

  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(())
}
