use super::{CommandError, DEFAULT_LIST_LIMIT};
use crate::models::{Medication, RawRecord, RecordCategory};
use crate::store::{SqliteRecordStore, StoredRecord};

/// ---------------------------------------------------------------------------
/// Record Commands
/// ---------------------------------------------------------------------------

/// Validate and append one log entry; returns the new record id
pub async fn add_record(
  store: &SqliteRecordStore,
  category: &str,
  payload: serde_json::Value,
) -> Result<i64, CommandError> {
  let category = parse_category(category)?;
  let record = RawRecord::from_value(category, payload).map_err(CommandError::InvalidInput)?;
  Ok(store.append(&record).await?)
}

pub async fn delete_record(store: &SqliteRecordStore, id: i64) -> Result<(), CommandError> {
  if store.delete(id).await? {
    tracing::debug!(id, "Deleted record");
    Ok(())
  } else {
    Err(CommandError::NotFound(format!("record {}", id)))
  }
}

/// Most recent entries of one category, newest first
pub async fn list_records(
  store: &SqliteRecordStore,
  category: &str,
  limit: Option<i64>,
) -> Result<Vec<StoredRecord>, CommandError> {
  let category = parse_category(category)?;
  let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
  if limit <= 0 {
    return Err(CommandError::InvalidInput(format!("limit must be positive: {}", limit)));
  }
  Ok(store.list(category, limit).await?)
}

pub async fn add_medication(store: &SqliteRecordStore, medication: Medication) -> Result<Medication, CommandError> {
  if medication.id.trim().is_empty() || medication.name.trim().is_empty() {
    return Err(CommandError::InvalidInput("medication id and name are required".into()));
  }
  store.upsert_medication(&medication).await?;
  Ok(medication)
}

fn parse_category(category: &str) -> Result<RecordCategory, CommandError> {
  category.parse::<RecordCategory>().map_err(CommandError::InvalidInput)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
