use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// ---------------------------------------------------------------------------
/// Record Categories
/// ---------------------------------------------------------------------------

/// Storage key for each raw log collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordCategory {
  MedicationDose,
  DosageEntry,
  Mood,
  HealthMetric,
  Exercise,
  Work,
  Food,
  SideEffect,
}

impl RecordCategory {
  pub const ALL: [RecordCategory; 8] = [
    RecordCategory::MedicationDose,
    RecordCategory::DosageEntry,
    RecordCategory::Mood,
    RecordCategory::HealthMetric,
    RecordCategory::Exercise,
    RecordCategory::Work,
    RecordCategory::Food,
    RecordCategory::SideEffect,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      RecordCategory::MedicationDose => "medication_dose",
      RecordCategory::DosageEntry => "dosage_entry",
      RecordCategory::Mood => "mood",
      RecordCategory::HealthMetric => "health_metric",
      RecordCategory::Exercise => "exercise",
      RecordCategory::Work => "work",
      RecordCategory::Food => "food",
      RecordCategory::SideEffect => "side_effect",
    }
  }
}

impl std::fmt::Display for RecordCategory {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for RecordCategory {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    RecordCategory::ALL
      .into_iter()
      .find(|c| c.as_str() == s)
      .ok_or_else(|| format!("Unknown record category: {}", s))
  }
}

/// ---------------------------------------------------------------------------
/// Enumerated Fields
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EpisodeType {
  #[default]
  Normal,
  RapidCycling,
  PanicAttack,
  MixedEpisode,
  Depression,
  Hypomania,
  Mania,
  Anxiety,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Mild,
  Moderate,
  Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthMetricType {
  HeartRateVariability,
  Sleep,
  BloodPressure,
  Weight,
  BloodSugar,
}

/// ---------------------------------------------------------------------------
/// Raw Log Records
/// ---------------------------------------------------------------------------

/// Integer fields also accept integral floats (`7.0`); fractions and
/// non-numbers are rejected
fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Number {
    Int(i64),
    Float(f64),
  }

  match Number::deserialize(deserializer) {
    Ok(Number::Int(v)) => Ok(v),
    Ok(Number::Float(v)) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(v as i64),
    Ok(Number::Float(v)) => Err(D::Error::custom(format!("expected a whole number, got {}", v))),
    Err(_) => Err(D::Error::custom("expected a whole number")),
  }
}

/// A medication the user tracks; dose logs reference it by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dosage: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationDose {
  pub timestamp: DateTime<Utc>,
  pub medication_id: String,
  pub taken: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DosageEntry {
  pub timestamp: DateTime<Utc>,
  pub medication_id: String,
  pub medication_name: String,
  pub dosage: f64,
  pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
  pub timestamp: DateTime<Utc>,
  #[serde(deserialize_with = "whole_number")]
  pub mood_level: i64,
  #[serde(default)]
  pub episode_type: EpisodeType,
  #[serde(default)]
  pub triggers: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub severity: Option<Severity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetric {
  pub timestamp: DateTime<Utc>,
  #[serde(rename = "type")]
  pub metric_type: HealthMetricType,
  pub value: f64,
  pub unit: String,
  /// Free-form extras such as systolic/diastolic; only numeric entries are read
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub additional_data: Option<BTreeMap<String, serde_json::Value>>,
}

impl HealthMetric {
  /// Numeric extra by key; text and other non-numeric entries read as absent
  pub fn extra(&self, key: &str) -> Option<f64> {
    self.additional_data.as_ref()?.get(key)?.as_f64()
  }

  /// Systolic reading for blood pressure entries, falling back to `value`
  pub fn systolic(&self) -> f64 {
    self.extra("systolic").unwrap_or(self.value)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseEntry {
  pub timestamp: DateTime<Utc>,
  #[serde(rename = "type")]
  pub exercise_type: String,
  #[serde(deserialize_with = "whole_number")]
  pub duration_minutes: i64,
  pub intensity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkEntry {
  pub timestamp: DateTime<Utc>,
  #[serde(deserialize_with = "whole_number")]
  pub productivity_level: i64,
  #[serde(deserialize_with = "whole_number")]
  pub focus_level: i64,
  #[serde(deserialize_with = "whole_number")]
  pub energy_level: i64,
  #[serde(deserialize_with = "whole_number")]
  pub tasks_completed: i64,
  pub hours_worked: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodEntry {
  pub timestamp: DateTime<Utc>,
  pub meal: String,
  pub calories: f64,
  pub carbs: f64,
  pub protein: f64,
  pub fat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideEffectEntry {
  pub timestamp: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub medication_name: Option<String>,
  #[serde(default)]
  pub effects: Vec<String>,
  #[serde(deserialize_with = "whole_number")]
  pub severity: i64,
}

/// One entry from any raw log collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", content = "record", rename_all = "snake_case")]
pub enum RawRecord {
  MedicationDose(MedicationDose),
  DosageEntry(DosageEntry),
  Mood(MoodEntry),
  HealthMetric(HealthMetric),
  Exercise(ExerciseEntry),
  Work(WorkEntry),
  Food(FoodEntry),
  SideEffect(SideEffectEntry),
}

impl RawRecord {
  pub fn category(&self) -> RecordCategory {
    match self {
      RawRecord::MedicationDose(_) => RecordCategory::MedicationDose,
      RawRecord::DosageEntry(_) => RecordCategory::DosageEntry,
      RawRecord::Mood(_) => RecordCategory::Mood,
      RawRecord::HealthMetric(_) => RecordCategory::HealthMetric,
      RawRecord::Exercise(_) => RecordCategory::Exercise,
      RawRecord::Work(_) => RecordCategory::Work,
      RawRecord::Food(_) => RecordCategory::Food,
      RawRecord::SideEffect(_) => RecordCategory::SideEffect,
    }
  }

  pub fn timestamp(&self) -> DateTime<Utc> {
    match self {
      RawRecord::MedicationDose(r) => r.timestamp,
      RawRecord::DosageEntry(r) => r.timestamp,
      RawRecord::Mood(r) => r.timestamp,
      RawRecord::HealthMetric(r) => r.timestamp,
      RawRecord::Exercise(r) => r.timestamp,
      RawRecord::Work(r) => r.timestamp,
      RawRecord::Food(r) => r.timestamp,
      RawRecord::SideEffect(r) => r.timestamp,
    }
  }

  /// Parse a stored payload for a known category
  pub fn from_payload(category: RecordCategory, payload: &str) -> Result<Self, String> {
    let value: serde_json::Value = serde_json::from_str(payload)
      .map_err(|e| format!("Invalid JSON in {} record: {}", category, e))?;
    Self::from_value(category, value)
  }

  /// Parse one element of a category's log collection
  pub fn from_value(category: RecordCategory, value: serde_json::Value) -> Result<Self, String> {
    use serde_json::from_value;

    let parsed = match category {
      RecordCategory::MedicationDose => from_value(value).map(RawRecord::MedicationDose),
      RecordCategory::DosageEntry => from_value(value).map(RawRecord::DosageEntry),
      RecordCategory::Mood => from_value(value).map(RawRecord::Mood),
      RecordCategory::HealthMetric => from_value(value).map(RawRecord::HealthMetric),
      RecordCategory::Exercise => from_value(value).map(RawRecord::Exercise),
      RecordCategory::Work => from_value(value).map(RawRecord::Work),
      RecordCategory::Food => from_value(value).map(RawRecord::Food),
      RecordCategory::SideEffect => from_value(value).map(RawRecord::SideEffect),
    };

    let record = parsed.map_err(|e| format!("Failed to parse {} record: {}", category, e))?;
    record.validate()?;
    Ok(record)
  }

  /// Serialize the category-specific fields (without the category tag)
  pub fn to_payload(&self) -> Result<String, serde_json::Error> {
    match self {
      RawRecord::MedicationDose(r) => serde_json::to_string(r),
      RawRecord::DosageEntry(r) => serde_json::to_string(r),
      RawRecord::Mood(r) => serde_json::to_string(r),
      RawRecord::HealthMetric(r) => serde_json::to_string(r),
      RawRecord::Exercise(r) => serde_json::to_string(r),
      RawRecord::Work(r) => serde_json::to_string(r),
      RawRecord::Food(r) => serde_json::to_string(r),
      RawRecord::SideEffect(r) => serde_json::to_string(r),
    }
  }

  /// Reject values that would poison an aggregate: non-finite numbers
  /// and 1-10 scales outside their range
  pub fn validate(&self) -> Result<(), String> {
    let scale = |name: &str, v: i64| -> Result<(), String> {
      if (1..=10).contains(&v) {
        Ok(())
      } else {
        Err(format!("{} out of range 1-10: {}", name, v))
      }
    };
    let finite = |name: &str, v: f64| -> Result<(), String> {
      if v.is_finite() {
        Ok(())
      } else {
        Err(format!("{} is not a finite number", name))
      }
    };

    match self {
      RawRecord::MedicationDose(_) => Ok(()),
      RawRecord::DosageEntry(r) => finite("dosage", r.dosage),
      RawRecord::Mood(r) => scale("moodLevel", r.mood_level),
      RawRecord::HealthMetric(r) => {
        finite("value", r.value)
      }
      RawRecord::Exercise(r) => {
        if r.duration_minutes < 0 {
          return Err(format!("durationMinutes is negative: {}", r.duration_minutes));
        }
        Ok(())
      }
      RawRecord::Work(r) => {
        scale("productivityLevel", r.productivity_level)?;
        scale("focusLevel", r.focus_level)?;
        scale("energyLevel", r.energy_level)?;
        finite("hoursWorked", r.hours_worked)
      }
      RawRecord::Food(r) => {
        finite("calories", r.calories)?;
        finite("carbs", r.carbs)?;
        finite("protein", r.protein)?;
        finite("fat", r.fat)
      }
      RawRecord::SideEffect(r) => scale("severity", r.severity),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
