//! Daily Aggregator
//!
//! Reshapes the sparse, irregular raw logs into a dense calendar-day grid.
//! Every record's local calendar date is derived once, bucketed by
//! `NaiveDate` equality, and each bucket is reduced per metric using the
//! strategy from the Metric Catalog.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::catalog::{self, MetricId, Source, CATALOG};
use crate::models::{
  DailyAggregate, DosageEntry, ExerciseEntry, FoodEntry, HealthMetric, HealthMetricType,
  Medication, MedicationDose, MoodEntry, SeriesPoint, SideEffectEntry, WorkEntry,
};
use crate::store::RecordSnapshot;

/// ---------------------------------------------------------------------------
/// Lookback Window
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LookbackWindow {
  #[serde(rename = "7d")]
  Week,
  #[default]
  #[serde(rename = "30d")]
  Month,
  #[serde(rename = "90d")]
  Quarter,
}

impl LookbackWindow {
  pub fn days(&self) -> i64 {
    match self {
      LookbackWindow::Week => 7,
      LookbackWindow::Month => 30,
      LookbackWindow::Quarter => 90,
    }
  }

  pub fn from_days(days: i64) -> Option<Self> {
    match days {
      7 => Some(LookbackWindow::Week),
      30 => Some(LookbackWindow::Month),
      90 => Some(LookbackWindow::Quarter),
      _ => None,
    }
  }

  /// Calendar dates covered by the window, oldest first, ending at `today`
  pub fn dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
    (0..self.days())
      .rev()
      .map(|i| today - Duration::days(i))
      .collect()
  }
}

impl std::fmt::Display for LookbackWindow {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}d", self.days())
  }
}

impl std::str::FromStr for LookbackWindow {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.trim();
    let digits = trimmed.strip_suffix('d').unwrap_or(trimmed);
    digits
      .parse::<i64>()
      .ok()
      .and_then(LookbackWindow::from_days)
      .ok_or_else(|| format!("Unknown lookback window: {} (expected 7d, 30d or 90d)", s))
  }
}

/// ---------------------------------------------------------------------------
/// Tracked Medication
/// ---------------------------------------------------------------------------

/// The medication whose daily intake and dosage get their own series.
/// Matches by id, or by case-insensitive substring of the name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedMedication {
  pub name_contains: String,
  pub id: Option<String>,
}

impl Default for TrackedMedication {
  fn default() -> Self {
    Self {
      name_contains: "seroquel".to_string(),
      id: None,
    }
  }
}

impl TrackedMedication {
  fn name_matches(&self, name: &str) -> bool {
    let needle = self.name_contains.trim().to_lowercase();
    !needle.is_empty() && name.to_lowercase().contains(&needle)
  }

  pub fn matches_medication(&self, medication: &Medication) -> bool {
    self.id.as_deref() == Some(medication.id.as_str()) || self.name_matches(&medication.name)
  }

  /// Ids from the medication list that refer to the tracked medication
  pub fn resolve_ids<'a>(&'a self, medications: &'a [Medication]) -> HashSet<&'a str> {
    let mut ids: HashSet<&str> = medications
      .iter()
      .filter(|m| self.matches_medication(m))
      .map(|m| m.id.as_str())
      .collect();
    if let Some(id) = &self.id {
      ids.insert(id.as_str());
    }
    ids
  }

  fn matches_dosage(&self, entry: &DosageEntry, ids: &HashSet<&str>) -> bool {
    ids.contains(entry.medication_id.as_str()) || self.name_matches(&entry.medication_name)
  }

  /// Display name for insight text
  pub fn label(&self) -> String {
    let mut chars = self.name_contains.trim().chars();
    match chars.next() {
      Some(first) => first.to_uppercase().chain(chars).collect(),
      None => "Tracked medication".to_string(),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Day Buckets
/// ---------------------------------------------------------------------------

/// Records that fall on one calendar date, in source order
#[derive(Debug, Default)]
struct DayBucket<'a> {
  doses: Vec<&'a MedicationDose>,
  dosages: Vec<&'a DosageEntry>,
  moods: Vec<&'a MoodEntry>,
  health: Vec<&'a HealthMetric>,
  exercises: Vec<&'a ExerciseEntry>,
  work: Vec<&'a WorkEntry>,
  food: Vec<&'a FoodEntry>,
  side_effects: Vec<&'a SideEffectEntry>,
}

/// Context needed to pick the tracked medication out of a bucket
struct TrackedLookup<'a> {
  medication: &'a TrackedMedication,
  ids: HashSet<&'a str>,
}

impl<'a> DayBucket<'a> {
  fn health_values(&self, metric_type: HealthMetricType) -> Vec<f64> {
    self
      .health
      .iter()
      .filter(|h| h.metric_type == metric_type)
      .map(|h| h.value)
      .collect()
  }

  /// Raw samples feeding one metric's reducer
  fn samples(&self, source: Source, tracked: &TrackedLookup<'_>) -> Vec<f64> {
    match source {
      Source::MoodLevel => self.moods.iter().map(|m| m.mood_level as f64).collect(),
      Source::Health(metric_type) => self.health_values(metric_type),
      Source::Systolic => self
        .health
        .iter()
        .filter(|h| h.metric_type == HealthMetricType::BloodPressure)
        .map(|h| h.systolic())
        .collect(),
      Source::ExerciseMinutes => self.exercises.iter().map(|e| e.duration_minutes as f64).collect(),
      Source::Work(read) => self.work.iter().map(|w| read(w)).collect(),
      Source::Food(read) => self.food.iter().map(|f| read(f)).collect(),
      Source::TrackedDoseTaken => self
        .doses
        .iter()
        .filter(|d| d.taken && tracked.ids.contains(d.medication_id.as_str()))
        .map(|_| 1.0)
        .collect(),
      Source::TrackedDosage => self
        .dosages
        .iter()
        .filter(|d| tracked.medication.matches_dosage(d, &tracked.ids))
        .map(|d| d.dosage)
        .collect(),
      Source::Dosage => self.dosages.iter().map(|d| d.dosage).collect(),
      Source::DoseTaken => self.doses.iter().filter(|d| d.taken).map(|_| 1.0).collect(),
      Source::SideEffectSeverity => self.side_effects.iter().map(|s| s.severity as f64).collect(),
    }
  }

  fn reduce(&self, date: NaiveDate, tracked: &TrackedLookup<'_>) -> DailyAggregate {
    let mut day = DailyAggregate::empty(date);
    for entry in CATALOG {
      let samples = self.samples(entry.source, tracked);
      (entry.field.set)(&mut day, entry.reducer.reduce(&samples));
    }
    day
  }
}

/// Group every record by its local calendar date, keeping only dates in range
fn bucket_by_date<'a, Tz: TimeZone>(
  snapshot: &'a RecordSnapshot,
  tz: &Tz,
  first: NaiveDate,
  last: NaiveDate,
) -> BTreeMap<NaiveDate, DayBucket<'a>> {
  let mut buckets: BTreeMap<NaiveDate, DayBucket<'a>> = BTreeMap::new();
  let local_date = |ts: &DateTime<Utc>| ts.with_timezone(tz).date_naive();
  let in_range = |d: &NaiveDate| *d >= first && *d <= last;

  macro_rules! bucket {
    ($records:expr, $field:ident) => {
      for record in $records.iter() {
        let date = local_date(&record.timestamp);
        if in_range(&date) {
          buckets.entry(date).or_default().$field.push(record);
        }
      }
    };
  }

  bucket!(snapshot.medication_doses, doses);
  bucket!(snapshot.dosage_entries, dosages);
  bucket!(snapshot.moods, moods);
  bucket!(snapshot.health_metrics, health);
  bucket!(snapshot.exercises, exercises);
  bucket!(snapshot.work, work);
  bucket!(snapshot.food, food);
  bucket!(snapshot.side_effects, side_effects);

  buckets
}

/// ---------------------------------------------------------------------------
/// Aggregation
/// ---------------------------------------------------------------------------

/// Build the dense daily series for `window` ending on `now`'s calendar date.
///
/// Always returns exactly `window.days()` rows, oldest first. Days are
/// determined in `now`'s time zone.
pub fn aggregate<Tz: TimeZone>(
  snapshot: &RecordSnapshot,
  window: LookbackWindow,
  now: &DateTime<Tz>,
  tracked: &TrackedMedication,
) -> Vec<DailyAggregate> {
  let today = now.date_naive();
  let dates = window.dates(today);
  let first = dates.first().copied().unwrap_or(today);

  let buckets = bucket_by_date(snapshot, &now.timezone(), first, today);
  let lookup = TrackedLookup {
    medication: tracked,
    ids: tracked.resolve_ids(&snapshot.medications),
  };
  let empty = DayBucket::default();

  let days: Vec<DailyAggregate> = dates
    .into_iter()
    .map(|date| buckets.get(&date).unwrap_or(&empty).reduce(date, &lookup))
    .collect();

  tracing::debug!(
    window = %window,
    active_days = buckets.len(),
    "Aggregated daily series"
  );

  days
}

/// One metric pulled out of the daily series
pub fn metric_series(days: &[DailyAggregate], metric: MetricId) -> Vec<SeriesPoint> {
  days
    .iter()
    .map(|d| SeriesPoint {
      date: d.date,
      value: d.get(metric),
    })
    .collect()
}

/// One metric multiplied by its catalog scale factor for charting
pub fn chart_series(days: &[DailyAggregate], metric: MetricId) -> Vec<SeriesPoint> {
  let scale = catalog::spec(metric).scale_factor;
  days
    .iter()
    .map(|d| SeriesPoint {
      date: d.date,
      value: d.get(metric).map(|v| v * scale),
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
