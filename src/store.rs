//! Raw log repository
//!
//! The analytics core only sees an immutable `RecordSnapshot`. Snapshots come
//! from a `RecordRepository`: the SQLite-backed store in production, or a
//! snapshot itself for in-memory callers and tests. Malformed records are
//! skipped (and logged) while loading, never surfaced as errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::models::{
  DosageEntry, ExerciseEntry, FoodEntry, HealthMetric, Medication, MedicationDose, MoodEntry,
  RawRecord, RecordCategory, SideEffectEntry, WorkEntry,
};

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(String),

  #[error("Migration error: {0}")]
  Migration(String),

  #[error("Invalid record: {0}")]
  InvalidRecord(String),

  #[error("Serialization error: {0}")]
  Serialization(String),
}

impl From<sqlx::Error> for StoreError {
  fn from(e: sqlx::Error) -> Self {
    StoreError::Database(e.to_string())
  }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
  fn from(e: sqlx::migrate::MigrateError) -> Self {
    StoreError::Migration(e.to_string())
  }
}

impl From<serde_json::Error> for StoreError {
  fn from(e: serde_json::Error) -> Self {
    StoreError::Serialization(e.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Snapshot
/// ---------------------------------------------------------------------------

/// Immutable view of every raw log collection, in source order.
/// Missing collections deserialize as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordSnapshot {
  pub medications: Vec<Medication>,
  pub medication_doses: Vec<MedicationDose>,
  pub dosage_entries: Vec<DosageEntry>,
  pub moods: Vec<MoodEntry>,
  pub health_metrics: Vec<HealthMetric>,
  pub exercises: Vec<ExerciseEntry>,
  pub work: Vec<WorkEntry>,
  pub food: Vec<FoodEntry>,
  pub side_effects: Vec<SideEffectEntry>,
}

impl RecordSnapshot {
  pub fn from_records(records: impl IntoIterator<Item = RawRecord>) -> Self {
    let mut snapshot = Self::default();
    for record in records {
      snapshot.push(record);
    }
    snapshot
  }

  pub fn push(&mut self, record: RawRecord) {
    match record {
      RawRecord::MedicationDose(r) => self.medication_doses.push(r),
      RawRecord::DosageEntry(r) => self.dosage_entries.push(r),
      RawRecord::Mood(r) => self.moods.push(r),
      RawRecord::HealthMetric(r) => self.health_metrics.push(r),
      RawRecord::Exercise(r) => self.exercises.push(r),
      RawRecord::Work(r) => self.work.push(r),
      RawRecord::Food(r) => self.food.push(r),
      RawRecord::SideEffect(r) => self.side_effects.push(r),
    }
  }

  /// Number of timestamped records (medications excluded)
  pub fn record_count(&self) -> usize {
    self.medication_doses.len()
      + self.dosage_entries.len()
      + self.moods.len()
      + self.health_metrics.len()
      + self.exercises.len()
      + self.work.len()
      + self.food.len()
      + self.side_effects.len()
  }

  /// Copy holding only records at or after `since`
  pub fn since(&self, since: DateTime<Utc>) -> Self {
    fn keep<T: Clone>(items: &[T], since: DateTime<Utc>, ts: fn(&T) -> DateTime<Utc>) -> Vec<T> {
      items.iter().filter(|r| ts(r) >= since).cloned().collect()
    }

    Self {
      medications: self.medications.clone(),
      medication_doses: keep(&self.medication_doses, since, |r| r.timestamp),
      dosage_entries: keep(&self.dosage_entries, since, |r| r.timestamp),
      moods: keep(&self.moods, since, |r| r.timestamp),
      health_metrics: keep(&self.health_metrics, since, |r| r.timestamp),
      exercises: keep(&self.exercises, since, |r| r.timestamp),
      work: keep(&self.work, since, |r| r.timestamp),
      food: keep(&self.food, since, |r| r.timestamp),
      side_effects: keep(&self.side_effects, since, |r| r.timestamp),
    }
  }

  /// Build a snapshot from key-value blobs, one JSON array per category key
  /// (plus `medications`). Unknown keys are ignored; elements that fail to
  /// parse are skipped individually.
  pub fn from_blobs<'a>(blobs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
    let mut snapshot = Self::default();

    for (key, blob) in blobs {
      let elements = match serde_json::from_str::<Vec<serde_json::Value>>(blob) {
        Ok(elements) => elements,
        Err(e) => {
          tracing::warn!(key, error = %e, "Skipping blob that is not a JSON array");
          continue;
        }
      };

      if key == "medications" {
        for element in elements {
          match serde_json::from_value::<Medication>(element) {
            Ok(m) => snapshot.medications.push(m),
            Err(e) => tracing::warn!(error = %e, "Skipping malformed medication"),
          }
        }
        continue;
      }

      let category = match key.parse::<RecordCategory>() {
        Ok(category) => category,
        Err(_) => {
          tracing::debug!(key, "Ignoring unknown blob key");
          continue;
        }
      };

      for element in elements {
        match RawRecord::from_value(category, element) {
          Ok(record) => snapshot.push(record),
          Err(e) => tracing::warn!(%category, error = %e, "Skipping malformed record"),
        }
      }
    }

    snapshot
  }
}

/// ---------------------------------------------------------------------------
/// Repository Interface
/// ---------------------------------------------------------------------------

/// Source of immutable record snapshots for the analytics core
#[allow(async_fn_in_trait)]
pub trait RecordRepository {
  /// Load every record at or after `since` (all records when `None`)
  async fn load_snapshot(&self, since: Option<DateTime<Utc>>) -> Result<RecordSnapshot, StoreError>;
}

impl RecordRepository for RecordSnapshot {
  async fn load_snapshot(&self, since: Option<DateTime<Utc>>) -> Result<RecordSnapshot, StoreError> {
    Ok(match since {
      Some(since) => self.since(since),
      None => self.clone(),
    })
  }
}

/// ---------------------------------------------------------------------------
/// SQLite Store
/// ---------------------------------------------------------------------------

/// A record as stored, with its row id
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
  pub id: i64,
  #[serde(flatten)]
  pub record: RawRecord,
}

#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
  pool: SqlitePool,
}

impl SqliteRecordStore {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Append a record; returns its id. Records are never updated.
  pub async fn append(&self, record: &RawRecord) -> Result<i64, StoreError> {
    record.validate().map_err(StoreError::InvalidRecord)?;
    let payload = record.to_payload()?;

    let result = sqlx::query(
      r#"
      INSERT INTO records (category, recorded_at_ms, payload)
      VALUES (?1, ?2, ?3)
      "#,
    )
    .bind(record.category().as_str())
    .bind(record.timestamp().timestamp_millis())
    .bind(payload)
    .execute(&self.pool)
    .await?;

    let id = result.last_insert_rowid();
    tracing::debug!(id, category = %record.category(), "Appended record");
    Ok(id)
  }

  /// Delete a record by id; returns whether anything was removed
  pub async fn delete(&self, id: i64) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM records WHERE id = ?1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  /// Most recent records of one category, newest first
  pub async fn list(&self, category: RecordCategory, limit: i64) -> Result<Vec<StoredRecord>, StoreError> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
      r#"
      SELECT id, payload
      FROM records
      WHERE category = ?1
      ORDER BY recorded_at_ms DESC, id DESC
      LIMIT ?2
      "#,
    )
    .bind(category.as_str())
    .bind(limit)
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .into_iter()
        .filter_map(|(id, payload)| match RawRecord::from_payload(category, &payload) {
          Ok(record) => Some(StoredRecord { id, record }),
          Err(e) => {
            tracing::warn!(id, error = %e, "Skipping malformed record");
            None
          }
        })
        .collect(),
    )
  }

  pub async fn upsert_medication(&self, medication: &Medication) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO medications (id, name, dosage, unit)
      VALUES (?1, ?2, ?3, ?4)
      ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        dosage = excluded.dosage,
        unit = excluded.unit
      "#,
    )
    .bind(&medication.id)
    .bind(&medication.name)
    .bind(medication.dosage)
    .bind(&medication.unit)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  pub async fn load_medications(&self) -> Result<Vec<Medication>, StoreError> {
    let rows: Vec<(String, String, Option<f64>, Option<String>)> =
      sqlx::query_as("SELECT id, name, dosage, unit FROM medications ORDER BY id")
        .fetch_all(&self.pool)
        .await?;

    Ok(
      rows
        .into_iter()
        .map(|(id, name, dosage, unit)| Medication { id, name, dosage, unit })
        .collect(),
    )
  }
}

impl RecordRepository for SqliteRecordStore {
  async fn load_snapshot(&self, since: Option<DateTime<Utc>>) -> Result<RecordSnapshot, StoreError> {
    let since_ms = since.map(|s| s.timestamp_millis()).unwrap_or(i64::MIN);

    // Insertion order is the source order first-wins lookups depend on
    let rows: Vec<(i64, String, String)> = sqlx::query_as(
      r#"
      SELECT id, category, payload
      FROM records
      WHERE recorded_at_ms >= ?1
      ORDER BY id ASC
      "#,
    )
    .bind(since_ms)
    .fetch_all(&self.pool)
    .await?;

    let mut snapshot = RecordSnapshot {
      medications: self.load_medications().await?,
      ..RecordSnapshot::default()
    };
    let mut skipped = 0usize;

    for (id, category, payload) in rows {
      let parsed = category
        .parse::<RecordCategory>()
        .and_then(|c| RawRecord::from_payload(c, &payload));

      match parsed {
        Ok(record) => snapshot.push(record),
        Err(e) => {
          skipped += 1;
          tracing::warn!(id, error = %e, "Skipping malformed record");
        }
      }
    }

    tracing::debug!(
      loaded = snapshot.record_count(),
      skipped,
      since = ?since,
      "Loaded record snapshot"
    );

    Ok(snapshot)
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::*;
  use chrono::Duration;

  #[test]
  fn test_missing_collections_deserialize_empty() {
    let snapshot: RecordSnapshot = serde_json::from_str(r#"{"moods": []}"#).unwrap();
    assert_eq!(snapshot, RecordSnapshot::default());
  }

  #[test]
  fn test_from_blobs_skips_bad_elements_only() {
    let moods = r#"[
      {"timestamp": "2024-03-10T09:00:00Z", "moodLevel": 6},
      {"timestamp": "2024-03-10T12:00:00Z", "moodLevel": "great"},
      {"timestamp": "2024-03-10T18:00:00Z", "moodLevel": 8, "legacyTag": "x"}
    ]"#;
    let meds = r#"[{"id": "med-1", "name": "Seroquel"}]"#;

    let snapshot = RecordSnapshot::from_blobs([
      ("mood", moods),
      ("medications", meds),
      ("exercise", "not json"),
      ("journal_v1", "[]"),
    ]);

    assert_eq!(snapshot.moods.len(), 2);
    assert_eq!(snapshot.moods[1].mood_level, 8);
    assert_eq!(snapshot.medications.len(), 1);
    assert!(snapshot.exercises.is_empty());
  }

  #[test]
  fn test_from_blobs_keeps_readings_with_text_extras() {
    let health = r#"[
      {"timestamp": "2024-03-10T08:00:00Z", "type": "blood-pressure", "value": 0, "unit": "mmHg",
       "additionalData": {"systolic": 128, "diastolic": 84, "position": "sitting"}},
      {"timestamp": "2024-03-10T07:00:00Z", "type": "sleep", "value": 7.5, "unit": "hours",
       "additionalData": {"quality": "good"}}
    ]"#;

    let snapshot = RecordSnapshot::from_blobs([("health_metric", health)]);
    assert_eq!(snapshot.health_metrics.len(), 2);

    let days = crate::aggregate::aggregate(
      &snapshot,
      crate::aggregate::LookbackWindow::Week,
      &fixed_now(),
      &crate::aggregate::TrackedMedication::default(),
    );
    let today = days.last().unwrap();
    assert_eq!(today.blood_pressure, Some(128.0));
    assert_eq!(today.sleep, Some(7.5));
  }

  #[test]
  fn test_since_filters_records_but_keeps_medications() {
    let now = fixed_now();
    let mut snapshot = RecordSnapshot::default();
    snapshot.medications.push(mock_medication("med-1", "Seroquel"));
    snapshot.moods.push(mock_mood(now - Duration::days(40), 5));
    snapshot.moods.push(mock_mood(now - Duration::days(2), 7));

    let recent = snapshot.since(now - Duration::days(30));
    assert_eq!(recent.moods.len(), 1);
    assert_eq!(recent.moods[0].mood_level, 7);
    assert_eq!(recent.medications.len(), 1);
  }

  #[tokio::test]
  async fn test_append_and_load_snapshot_preserves_order() {
    let pool = setup_test_db().await;
    let store = SqliteRecordStore::new(pool.clone());
    let now = fixed_now();

    store
      .append(&RawRecord::HealthMetric(mock_health(now, crate::models::HealthMetricType::Weight, 182.0)))
      .await
      .unwrap();
    store
      .append(&RawRecord::HealthMetric(mock_health(
        now - Duration::hours(3),
        crate::models::HealthMetricType::Weight,
        180.0,
      )))
      .await
      .unwrap();
    store.upsert_medication(&mock_medication("med-1", "Seroquel")).await.unwrap();

    let snapshot = store.load_snapshot(None).await.unwrap();
    assert_eq!(snapshot.health_metrics.len(), 2);
    assert_eq!(snapshot.health_metrics[0].value, 182.0);
    assert_eq!(snapshot.medications.len(), 1);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_malformed_rows_are_skipped() {
    let pool = setup_test_db().await;
    let store = SqliteRecordStore::new(pool.clone());
    let now = fixed_now();

    store.append(&RawRecord::Mood(mock_mood(now, 6))).await.unwrap();
    sqlx::query("INSERT INTO records (category, recorded_at_ms, payload) VALUES (?1, ?2, ?3)")
      .bind("mood")
      .bind(now.timestamp_millis())
      .bind(r#"{"timestamp": "2024-03-10T09:00:00Z"}"#)
      .execute(&pool)
      .await
      .unwrap();
    sqlx::query("INSERT INTO records (category, recorded_at_ms, payload) VALUES (?1, ?2, ?3)")
      .bind("legacy_entry")
      .bind(now.timestamp_millis())
      .bind("{}")
      .execute(&pool)
      .await
      .unwrap();

    let snapshot = store.load_snapshot(None).await.unwrap();
    assert_eq!(snapshot.moods.len(), 1);
    assert_eq!(snapshot.record_count(), 1);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_load_snapshot_since() {
    let pool = setup_test_db().await;
    let store = SqliteRecordStore::new(pool.clone());
    let now = fixed_now();

    store.append(&RawRecord::Mood(mock_mood(now - Duration::days(100), 2))).await.unwrap();
    store.append(&RawRecord::Mood(mock_mood(now - Duration::days(1), 8))).await.unwrap();

    let snapshot = store.load_snapshot(Some(now - Duration::days(31))).await.unwrap();
    assert_eq!(snapshot.moods.len(), 1);
    assert_eq!(snapshot.moods[0].mood_level, 8);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_append_rejects_invalid_record() {
    let pool = setup_test_db().await;
    let store = SqliteRecordStore::new(pool.clone());

    let err = store.append(&RawRecord::Mood(mock_mood(fixed_now(), 0))).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidRecord(_)));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_delete_and_list() {
    let pool = setup_test_db().await;
    let store = SqliteRecordStore::new(pool.clone());
    let now = fixed_now();

    let first = store.append(&RawRecord::Exercise(mock_exercise(now - Duration::days(1), 30))).await.unwrap();
    let second = store.append(&RawRecord::Exercise(mock_exercise(now, 45))).await.unwrap();

    let listed = store.list(RecordCategory::Exercise, 10).await.unwrap();
    assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second, first]);

    assert!(store.delete(first).await.unwrap());
    assert!(!store.delete(first).await.unwrap());
    assert_eq!(store.list(RecordCategory::Exercise, 10).await.unwrap().len(), 1);

    teardown_test_db(pool).await;
  }
}
