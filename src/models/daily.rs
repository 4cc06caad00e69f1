use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::{self, MetricId};

/// One calendar day's reduced values across every tracked metric.
///
/// Mean and lookup metrics are `None` when nothing was logged that day;
/// sum metrics are `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAggregate {
  pub date: NaiveDate,

  // Mood and health
  pub mood: Option<f64>,
  pub sleep: Option<f64>,
  pub blood_sugar: Option<f64>,
  pub blood_pressure: Option<f64>,
  pub heart_rate_variability: Option<f64>,
  pub weight: Option<f64>,

  // Activity and work
  pub exercise: f64,
  pub productivity: Option<f64>,
  pub focus: Option<f64>,
  pub energy: Option<f64>,
  pub tasks_completed: f64,
  pub hours_worked: f64,

  // Diet
  pub calories: f64,
  pub carbs: f64,
  pub protein: f64,
  pub fat: f64,

  // Medication
  #[serde(rename = "seroquelTaken")]
  pub tracked_med_taken: bool,
  #[serde(rename = "seroquelDosage")]
  pub tracked_med_dosage: Option<f64>,
  pub total_dosage: f64,
  pub doses_taken: f64,
  pub side_effects_severity: Option<f64>,
}

impl DailyAggregate {
  /// A day with nothing logged
  pub fn empty(date: NaiveDate) -> Self {
    Self {
      date,
      mood: None,
      sleep: None,
      blood_sugar: None,
      blood_pressure: None,
      heart_rate_variability: None,
      weight: None,
      exercise: 0.0,
      productivity: None,
      focus: None,
      energy: None,
      tasks_completed: 0.0,
      hours_worked: 0.0,
      calories: 0.0,
      carbs: 0.0,
      protein: 0.0,
      fat: 0.0,
      tracked_med_taken: false,
      tracked_med_dosage: None,
      total_dosage: 0.0,
      doses_taken: 0.0,
      side_effects_severity: None,
    }
  }

  /// Read a metric as a number; presence flags read as 1.0 / 0.0
  pub fn get(&self, metric: MetricId) -> Option<f64> {
    (catalog::spec(metric).field.get)(self)
  }

  /// Store a reduced value. Sum metrics treat `None` as 0.0 and the
  /// presence flag treats any positive value as true.
  pub fn set(&mut self, metric: MetricId, value: Option<f64>) {
    (catalog::spec(metric).field.set)(self, value)
  }
}

/// A single point of a date-indexed metric series (for charts)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
  pub date: NaiveDate,
  pub value: Option<f64>,
}
