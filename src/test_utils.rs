//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock record factories
//! - A realistic multi-week snapshot fixture
//! - Helper assertions

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use sqlx::SqlitePool;

use crate::models::{
  DailyAggregate, DosageEntry, EpisodeType, ExerciseEntry, FoodEntry, HealthMetric,
  HealthMetricType, Medication, MedicationDose, MoodEntry, SideEffectEntry, WorkEntry,
};
use crate::store::RecordSnapshot;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Fixed "now" so calendar-day assertions do not depend on the wall clock
pub fn fixed_now() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

/// A UTC instant on the calendar day `days_ago` before `now`, at `hour`:00
pub fn at_hour(now: &DateTime<Utc>, days_ago: i64, hour: u32) -> DateTime<Utc> {
  (now.date_naive() - Duration::days(days_ago))
    .and_hms_opt(hour, 0, 0)
    .unwrap()
    .and_utc()
}

/// A daily row `index` days after a fixed start date, customised by `f`
pub fn day_with(index: i64, f: impl FnOnce(&mut DailyAggregate)) -> DailyAggregate {
  let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
  let mut day = DailyAggregate::empty(start + Duration::days(index));
  f(&mut day);
  day
}

/// ---------------------------------------------------------------------------
/// Mock Record Factories
/// ---------------------------------------------------------------------------

pub fn mock_medication(id: &str, name: &str) -> Medication {
  Medication {
    id: id.to_string(),
    name: name.to_string(),
    dosage: None,
    unit: Some("mg".to_string()),
  }
}

pub fn mock_dose(timestamp: DateTime<Utc>, medication_id: &str, taken: bool) -> MedicationDose {
  MedicationDose {
    timestamp,
    medication_id: medication_id.to_string(),
    taken,
  }
}

pub fn mock_dosage(
  timestamp: DateTime<Utc>,
  medication_id: &str,
  medication_name: &str,
  dosage: f64,
) -> DosageEntry {
  DosageEntry {
    timestamp,
    medication_id: medication_id.to_string(),
    medication_name: medication_name.to_string(),
    dosage,
    unit: "mg".to_string(),
  }
}

pub fn mock_mood(timestamp: DateTime<Utc>, mood_level: i64) -> MoodEntry {
  MoodEntry {
    timestamp,
    mood_level,
    episode_type: EpisodeType::Normal,
    triggers: Vec::new(),
    severity: None,
  }
}

pub fn mock_health(timestamp: DateTime<Utc>, metric_type: HealthMetricType, value: f64) -> HealthMetric {
  let unit = match metric_type {
    HealthMetricType::Sleep => "hours",
    HealthMetricType::Weight => "lbs",
    HealthMetricType::BloodSugar => "mg/dL",
    HealthMetricType::BloodPressure => "mmHg",
    HealthMetricType::HeartRateVariability => "ms",
  };
  HealthMetric {
    timestamp,
    metric_type,
    value,
    unit: unit.to_string(),
    additional_data: None,
  }
}

pub fn mock_exercise(timestamp: DateTime<Utc>, duration_minutes: i64) -> ExerciseEntry {
  ExerciseEntry {
    timestamp,
    exercise_type: "walk".to_string(),
    duration_minutes,
    intensity: "moderate".to_string(),
  }
}

pub fn mock_work(timestamp: DateTime<Utc>, productivity: i64, focus: i64, energy: i64) -> WorkEntry {
  WorkEntry {
    timestamp,
    productivity_level: productivity,
    focus_level: focus,
    energy_level: energy,
    tasks_completed: productivity / 2,
    hours_worked: 6.0,
  }
}

pub fn mock_food(timestamp: DateTime<Utc>, calories: f64) -> FoodEntry {
  FoodEntry {
    timestamp,
    meal: "lunch".to_string(),
    calories,
    carbs: 60.0,
    protein: 30.0,
    fat: 20.0,
  }
}

pub fn mock_side_effect(timestamp: DateTime<Utc>, severity: i64) -> SideEffectEntry {
  SideEffectEntry {
    timestamp,
    medication_name: Some("Seroquel".to_string()),
    effects: vec!["drowsiness".to_string()],
    severity,
  }
}

/// Four weeks of journal data with a clear sleep/productivity pattern:
/// even days sleep 8h and score 8-9, odd days sleep 5h and score 5.
/// Exercise on even days, Seroquel every evening.
pub fn mock_snapshot(now: &DateTime<Utc>) -> RecordSnapshot {
  let mut snapshot = RecordSnapshot::default();
  snapshot.medications.push(mock_medication("med-1", "Seroquel"));
  snapshot.medications.push(mock_medication("med-2", "Lamotrigine"));

  for days_ago in 0..28 {
    let rested = days_ago % 2 == 0;

    snapshot.health_metrics.push(mock_health(
      at_hour(now, days_ago, 7),
      HealthMetricType::Sleep,
      if rested { 8.0 } else { 5.0 },
    ));
    snapshot.moods.push(mock_mood(at_hour(now, days_ago, 9), if rested { 7 } else { 5 }));
    snapshot.work.push(if rested {
      mock_work(at_hour(now, days_ago, 17), 8, 8, 7)
    } else {
      mock_work(at_hour(now, days_ago, 17), 5, 5, 4)
    });
    if rested {
      snapshot.exercises.push(mock_exercise(at_hour(now, days_ago, 18), 40));
    }
    snapshot.food.push(mock_food(at_hour(now, days_ago, 12), 650.0));

    snapshot.medication_doses.push(mock_dose(at_hour(now, days_ago, 21), "med-1", true));
    snapshot
      .dosage_entries
      .push(mock_dosage(at_hour(now, days_ago, 21), "med-1", "Seroquel", 50.0));
    snapshot
      .dosage_entries
      .push(mock_dosage(at_hour(now, days_ago, 8), "med-2", "Lamotrigine", 100.0));
  }

  snapshot
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

pub(crate) use assert_approx_eq;

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('records', 'medications')",
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 2, "Expected 2 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_at_hour_lands_on_requested_day() {
    let now = fixed_now();
    let ts = at_hour(&now, 3, 21);
    assert_eq!(ts.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
  }

  #[test]
  fn test_mock_snapshot_shape() {
    let snapshot = mock_snapshot(&fixed_now());
    assert_eq!(snapshot.moods.len(), 28);
    assert_eq!(snapshot.exercises.len(), 14);
    assert_eq!(snapshot.dosage_entries.len(), 56);
    assert_eq!(snapshot.medications.len(), 2);
  }
}
