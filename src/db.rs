use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::Path;

use crate::config::AppConfig;
use crate::store::{SqliteRecordStore, StoreError};

pub type DbPool = SqlitePool;

/// Application state shared by the service operations
pub struct AppState {
  pub db: DbPool,
  pub config: AppConfig,
}

impl AppState {
  pub fn new(db: DbPool, config: AppConfig) -> Self {
    Self { db, config }
  }

  /// Record store over the shared pool
  pub fn store(&self) -> SqliteRecordStore {
    SqliteRecordStore::new(self.db.clone())
  }
}

/// Open (creating if needed) the journal database and run migrations
pub async fn initialize_db(db_path: &Path) -> Result<DbPool, StoreError> {
  if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent)
      .map_err(|e| StoreError::Database(format!("Failed to create {}: {}", parent.display(), e)))?;
  }

  let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
  tracing::info!(path = %db_path.display(), "Initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  tracing::info!("Database initialized successfully");

  Ok(pool)
}
