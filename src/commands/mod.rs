//! Service operations over the record store and the analytics core
//!
//! Analytics operations are generic over `RecordRepository`; record
//! operations need the SQLite store since they write.

pub mod analytics;
pub mod records;

use serde::{Deserialize, Serialize};

use crate::store::StoreError;

pub use analytics::{
  correlate, get_analytics_report, get_daily_series, get_insights, get_metric_catalog,
  get_metric_series, AnalyticsReport,
};
pub use records::{add_medication, add_record, delete_record, list_records};

/// Default page size for `list_records`
pub const DEFAULT_LIST_LIMIT: i64 = 50;

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CommandError {
  #[error(transparent)]
  Store(#[from] StoreError),

  #[error("Invalid input: {0}")]
  InvalidInput(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Computation failed: {0}")]
  Compute(String),
}
