//! Metric Catalog
//!
//! Static table of every trackable daily metric: where its samples come
//! from, how a day's samples reduce to one value, which `DailyAggregate`
//! field holds the result, and how charts label and scale it. Adding a
//! metric means one `MetricId` variant, one `DailyAggregate` field and one
//! table row; the aggregator and the row accessors read everything else
//! from the table.

use serde::{Deserialize, Serialize};

use crate::models::{DailyAggregate, FoodEntry, HealthMetricType, RecordCategory, WorkEntry};

/// ---------------------------------------------------------------------------
/// Reducer Strategies
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
  /// Arithmetic mean rounded to one decimal; `None` for an empty day
  Mean,
  /// Arithmetic sum; `0.0` for an empty day
  Sum,
  /// First sample in source order; `None` for an empty day
  Lookup,
  /// 1.0 if any sample is positive, else 0.0
  Presence,
}

impl Reducer {
  pub fn reduce(&self, samples: &[f64]) -> Option<f64> {
    match self {
      Reducer::Mean => {
        if samples.is_empty() {
          None
        } else {
          let mean = samples.iter().sum::<f64>() / samples.len() as f64;
          Some(round_one_decimal(mean))
        }
      }
      Reducer::Sum => Some(samples.iter().sum()),
      Reducer::Lookup => samples.first().copied(),
      Reducer::Presence => Some(if samples.iter().any(|v| *v > 0.0) { 1.0 } else { 0.0 }),
    }
  }
}

pub fn round_one_decimal(value: f64) -> f64 {
  (value * 10.0).round() / 10.0
}

/// ---------------------------------------------------------------------------
/// Metric Identifiers
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricId {
  Mood,
  Sleep,
  BloodSugar,
  BloodPressure,
  HeartRateVariability,
  Weight,
  Exercise,
  Productivity,
  Focus,
  Energy,
  TasksCompleted,
  HoursWorked,
  Calories,
  Carbs,
  Protein,
  Fat,
  TrackedMedTaken,
  TrackedMedDosage,
  TotalDosage,
  DosesTaken,
  SideEffectsSeverity,
}

impl MetricId {
  pub fn as_str(&self) -> &'static str {
    spec(*self).key
  }

  pub fn all() -> impl Iterator<Item = MetricId> {
    CATALOG.iter().map(|m| m.id)
  }
}

impl std::fmt::Display for MetricId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for MetricId {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    CATALOG
      .iter()
      .find(|m| m.key == s)
      .map(|m| m.id)
      .ok_or_else(|| format!("Unknown metric: {}", s))
  }
}

/// ---------------------------------------------------------------------------
/// Sample Sources
/// ---------------------------------------------------------------------------

/// Where a metric's raw samples come from within one day's records
#[derive(Clone, Copy)]
pub enum Source {
  MoodLevel,
  /// `value` of health readings of one type
  Health(HealthMetricType),
  /// Systolic of blood pressure readings, falling back to `value`
  Systolic,
  ExerciseMinutes,
  Work(fn(&WorkEntry) -> f64),
  Food(fn(&FoodEntry) -> f64),
  /// 1.0 per taken dose of the tracked medication
  TrackedDoseTaken,
  /// Dosage entries of the tracked medication
  TrackedDosage,
  /// Every dosage entry
  Dosage,
  /// 1.0 per taken dose of any medication
  DoseTaken,
  SideEffectSeverity,
}

impl std::fmt::Debug for Source {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Source::MoodLevel => f.write_str("MoodLevel"),
      Source::Health(t) => f.debug_tuple("Health").field(t).finish(),
      Source::Systolic => f.write_str("Systolic"),
      Source::ExerciseMinutes => f.write_str("ExerciseMinutes"),
      Source::Work(_) => f.write_str("Work"),
      Source::Food(_) => f.write_str("Food"),
      Source::TrackedDoseTaken => f.write_str("TrackedDoseTaken"),
      Source::TrackedDosage => f.write_str("TrackedDosage"),
      Source::Dosage => f.write_str("Dosage"),
      Source::DoseTaken => f.write_str("DoseTaken"),
      Source::SideEffectSeverity => f.write_str("SideEffectSeverity"),
    }
  }
}

/// Accessor pair for the `DailyAggregate` field that holds a metric
#[derive(Clone, Copy)]
pub struct Field {
  pub get: fn(&DailyAggregate) -> Option<f64>,
  pub set: fn(&mut DailyAggregate, Option<f64>),
}

impl std::fmt::Debug for Field {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("Field")
  }
}

/// `Option<f64>` field: absent stays absent
macro_rules! optional {
  ($field:ident) => {
    Field {
      get: |d: &DailyAggregate| d.$field,
      set: |d: &mut DailyAggregate, v: Option<f64>| d.$field = v,
    }
  };
}

/// `f64` field: absent reads back as 0.0
macro_rules! summed {
  ($field:ident) => {
    Field {
      get: |d: &DailyAggregate| Some(d.$field),
      set: |d: &mut DailyAggregate, v: Option<f64>| d.$field = v.unwrap_or(0.0),
    }
  };
}

/// `bool` field: reads as 1.0 / 0.0, any positive value sets it
const PRESENCE_FIELD: Field = Field {
  get: |d: &DailyAggregate| Some(if d.tracked_med_taken { 1.0 } else { 0.0 }),
  set: |d: &mut DailyAggregate, v: Option<f64>| d.tracked_med_taken = v.unwrap_or(0.0) > 0.0,
};

/// ---------------------------------------------------------------------------
/// Catalog Table
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricSpec {
  pub id: MetricId,
  pub key: &'static str,
  pub label: &'static str,
  pub category: RecordCategory,
  pub reducer: Reducer,
  pub unit: &'static str,
  /// Multiplier applied to chart series so lines share the 0-10 axis
  pub scale_factor: f64,
  #[serde(skip)]
  pub source: Source,
  #[serde(skip)]
  pub field: Field,
}

#[allow(clippy::too_many_arguments)]
const fn metric(
  id: MetricId,
  key: &'static str,
  label: &'static str,
  category: RecordCategory,
  reducer: Reducer,
  unit: &'static str,
  scale_factor: f64,
  source: Source,
  field: Field,
) -> MetricSpec {
  MetricSpec { id, key, label, category, reducer, unit, scale_factor, source, field }
}

use HealthMetricType as H;
use MetricId as M;
use RecordCategory as C;
use Reducer as R;
use Source as S;

/// Ordered the same as `MetricId`; `spec()` relies on it
pub static CATALOG: &[MetricSpec] = &[
  metric(M::Mood, "mood", "Mood", C::Mood, R::Mean, "/10", 1.0, S::MoodLevel, optional!(mood)),
  metric(M::Sleep, "sleep", "Sleep", C::HealthMetric, R::Mean, "hrs", 1.0, S::Health(H::Sleep), optional!(sleep)),
  metric(M::BloodSugar, "blood-sugar", "Blood Sugar", C::HealthMetric, R::Lookup, "mg/dL", 0.05, S::Health(H::BloodSugar), optional!(blood_sugar)),
  metric(M::BloodPressure, "blood-pressure", "Blood Pressure (systolic)", C::HealthMetric, R::Lookup, "mmHg", 0.05, S::Systolic, optional!(blood_pressure)),
  metric(M::HeartRateVariability, "heart-rate-variability", "HRV", C::HealthMetric, R::Mean, "ms", 0.1, S::Health(H::HeartRateVariability), optional!(heart_rate_variability)),
  metric(M::Weight, "weight", "Weight", C::HealthMetric, R::Lookup, "lbs", 0.05, S::Health(H::Weight), optional!(weight)),
  metric(M::Exercise, "exercise", "Exercise", C::Exercise, R::Sum, "min", 0.1, S::ExerciseMinutes, summed!(exercise)),
  metric(M::Productivity, "productivity", "Productivity", C::Work, R::Mean, "/10", 1.0, S::Work(|w: &WorkEntry| w.productivity_level as f64), optional!(productivity)),
  metric(M::Focus, "focus", "Focus", C::Work, R::Mean, "/10", 1.0, S::Work(|w: &WorkEntry| w.focus_level as f64), optional!(focus)),
  metric(M::Energy, "energy", "Energy", C::Work, R::Mean, "/10", 1.0, S::Work(|w: &WorkEntry| w.energy_level as f64), optional!(energy)),
  metric(M::TasksCompleted, "tasks-completed", "Tasks Completed", C::Work, R::Sum, "tasks", 1.0, S::Work(|w: &WorkEntry| w.tasks_completed as f64), summed!(tasks_completed)),
  metric(M::HoursWorked, "hours-worked", "Hours Worked", C::Work, R::Sum, "hrs", 1.0, S::Work(|w: &WorkEntry| w.hours_worked), summed!(hours_worked)),
  metric(M::Calories, "calories", "Calories", C::Food, R::Sum, "kcal", 0.005, S::Food(|f: &FoodEntry| f.calories), summed!(calories)),
  metric(M::Carbs, "carbs", "Carbs", C::Food, R::Sum, "g", 0.05, S::Food(|f: &FoodEntry| f.carbs), summed!(carbs)),
  metric(M::Protein, "protein", "Protein", C::Food, R::Sum, "g", 0.05, S::Food(|f: &FoodEntry| f.protein), summed!(protein)),
  metric(M::Fat, "fat", "Fat", C::Food, R::Sum, "g", 0.05, S::Food(|f: &FoodEntry| f.fat), summed!(fat)),
  metric(M::TrackedMedTaken, "tracked-med-taken", "Tracked Medication Taken", C::MedicationDose, R::Presence, "", 10.0, S::TrackedDoseTaken, PRESENCE_FIELD),
  metric(M::TrackedMedDosage, "tracked-med-dosage", "Tracked Medication Dosage", C::DosageEntry, R::Lookup, "mg", 0.02, S::TrackedDosage, optional!(tracked_med_dosage)),
  metric(M::TotalDosage, "total-dosage", "Total Dosage", C::DosageEntry, R::Sum, "mg", 0.02, S::Dosage, summed!(total_dosage)),
  metric(M::DosesTaken, "doses-taken", "Doses Taken", C::MedicationDose, R::Sum, "doses", 1.0, S::DoseTaken, summed!(doses_taken)),
  metric(M::SideEffectsSeverity, "side-effects-severity", "Side Effect Severity", C::SideEffect, R::Mean, "/10", 1.0, S::SideEffectSeverity, optional!(side_effects_severity)),
];

/// Catalog entry for a metric
pub fn spec(id: MetricId) -> &'static MetricSpec {
  &CATALOG[id as usize]
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_catalog_order_matches_metric_ids() {
    for (idx, entry) in CATALOG.iter().enumerate() {
      assert_eq!(entry.id as usize, idx, "{} is out of order", entry.key);
      assert_eq!(spec(entry.id).key, entry.key);
    }
  }

  #[test]
  fn test_metric_keys_parse_back() {
    for id in MetricId::all() {
      assert_eq!(id.as_str().parse::<MetricId>(), Ok(id));
    }
    assert!("heart-rate".parse::<MetricId>().is_err());
  }

  #[test]
  fn test_metric_key_matches_serde_name() {
    for id in MetricId::all() {
      let json = serde_json::to_string(&id).unwrap();
      assert_eq!(json, format!("\"{}\"", id.as_str()));
    }
  }

  #[test]
  fn test_mean_rounds_to_one_decimal() {
    assert_eq!(Reducer::Mean.reduce(&[7.0, 8.0, 8.0]), Some(7.7));
    assert_eq!(Reducer::Mean.reduce(&[4.0, 6.0, 8.0]), Some(6.0));
    assert_eq!(Reducer::Mean.reduce(&[]), None);
  }

  #[test]
  fn test_sum_defaults_to_zero() {
    assert_eq!(Reducer::Sum.reduce(&[]), Some(0.0));
    assert_eq!(Reducer::Sum.reduce(&[30.0, 15.0]), Some(45.0));
  }

  #[test]
  fn test_lookup_takes_first_sample() {
    assert_eq!(Reducer::Lookup.reduce(&[180.0, 175.0]), Some(180.0));
    assert_eq!(Reducer::Lookup.reduce(&[]), None);
  }

  #[test]
  fn test_presence_flag() {
    assert_eq!(Reducer::Presence.reduce(&[]), Some(0.0));
    assert_eq!(Reducer::Presence.reduce(&[0.0, 1.0]), Some(1.0));
  }

  #[test]
  fn test_exercise_scaled_by_ten() {
    let exercise = spec(MetricId::Exercise);
    assert_eq!(exercise.reducer, Reducer::Sum);
    assert_eq!(exercise.scale_factor, 0.1);
    assert_eq!(exercise.unit, "min");
  }

  #[test]
  fn test_field_accessors_round_trip_every_metric() {
    let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    for entry in CATALOG {
      let mut day = DailyAggregate::empty(date);
      (entry.field.set)(&mut day, Some(1.0));
      assert_eq!((entry.field.get)(&day), Some(1.0), "{}", entry.key);

      // Every other metric is untouched
      let empty = DailyAggregate::empty(date);
      for other in CATALOG.iter().filter(|o| o.id != entry.id) {
        assert_eq!((other.field.get)(&day), (other.field.get)(&empty), "{} leaked into {}", entry.key, other.key);
      }
    }
  }

  #[test]
  fn test_absent_values_by_reducer() {
    let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    for entry in CATALOG {
      let mut day = DailyAggregate::empty(date);
      (entry.field.set)(&mut day, Some(1.0));
      (entry.field.set)(&mut day, None);
      let expected = match entry.reducer {
        Reducer::Mean | Reducer::Lookup => None,
        Reducer::Sum | Reducer::Presence => Some(0.0),
      };
      assert_eq!((entry.field.get)(&day), expected, "{}", entry.key);
    }
  }

  #[test]
  fn test_catalog_serializes_without_accessors() {
    let json = serde_json::to_value(spec(MetricId::Productivity)).unwrap();
    assert_eq!(json["key"], "productivity");
    assert!(json.get("source").is_none());
    assert!(json.get("field").is_none());
  }

  #[test]
  fn test_reducer_assignments() {
    assert_eq!(spec(MetricId::Mood).reducer, Reducer::Mean);
    assert_eq!(spec(MetricId::BloodSugar).reducer, Reducer::Lookup);
    assert_eq!(spec(MetricId::Weight).reducer, Reducer::Lookup);
    assert_eq!(spec(MetricId::BloodPressure).reducer, Reducer::Lookup);
    assert_eq!(spec(MetricId::TotalDosage).reducer, Reducer::Sum);
    assert_eq!(spec(MetricId::TrackedMedTaken).reducer, Reducer::Presence);
    assert_eq!(spec(MetricId::SideEffectsSeverity).reducer, Reducer::Mean);
  }
}
