//! Correlation and insight engine
//!
//! A fixed battery of threshold-split comparisons over the daily series,
//! plus a Pearson helper. Every rule is evaluated independently; any subset
//! may fire. This is heuristic pattern flagging, not inferential statistics:
//! the thresholds below are the whole rule set.

use serde::{Deserialize, Serialize};

use crate::aggregate::TrackedMedication;
use crate::catalog::MetricId;
use crate::models::{DailyAggregate, Insight, InsightPriority, InsightType};

/// ---------------------------------------------------------------------------
/// Rule Thresholds
/// ---------------------------------------------------------------------------

pub const GOOD_SLEEP_HOURS: f64 = 7.0;
pub const POOR_SLEEP_HOURS: f64 = 6.0;
pub const SLEEP_MIN_VALID_DAYS: usize = 3;
pub const SLEEP_PRODUCTIVITY_GAP: f64 = 1.0;

pub const HIGH_DOSE_MG: f64 = 50.0;
pub const DOSE_MIN_DAYS_PER_GROUP: usize = 2;
pub const DOSE_BLOOD_SUGAR_GAP: f64 = 15.0;

/// Floor added on top of the correlation rule, which itself has no minimum.
/// Two dosed days always correlate at exactly +1 or -1.
pub const SIDE_EFFECT_MIN_DAYS: usize = 3;
pub const SIDE_EFFECT_CORRELATION: f64 = 0.5;

pub const EXERCISE_MOOD_GAP: f64 = 0.5;
pub const EXERCISE_PRODUCTIVITY_GAP: f64 = 0.5;

pub const WEIGHT_MIN_DAYS: usize = 5;
pub const WEIGHT_CHANGE_LBS: f64 = 2.0;

pub const HIGH_BLOOD_SUGAR: f64 = 140.0;
pub const BLOOD_SUGAR_MIN_DAYS_PER_GROUP: usize = 2;
pub const BLOOD_SUGAR_FOCUS_GAP: f64 = 1.0;

/// ---------------------------------------------------------------------------
/// Statistics Helpers
/// ---------------------------------------------------------------------------

/// Pearson correlation coefficient of two index-aligned series.
///
/// Returns 0.0 for empty or mismatched input and for constant series
/// (zero denominator); never NaN or infinite.
pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
  let n = x.len();
  if n == 0 || n != y.len() {
    return 0.0;
  }

  let n = n as f64;
  let sum_x: f64 = x.iter().sum();
  let sum_y: f64 = y.iter().sum();
  let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
  let sum_x2: f64 = x.iter().map(|a| a * a).sum();
  let sum_y2: f64 = y.iter().map(|b| b * b).sum();

  let numerator = n * sum_xy - sum_x * sum_y;
  let denominator = ((n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y)).sqrt();

  if denominator == 0.0 || !denominator.is_finite() {
    return 0.0;
  }

  let r = numerator / denominator;
  if r.is_finite() {
    r.clamp(-1.0, 1.0)
  } else {
    0.0
  }
}

fn mean(values: &[f64]) -> Option<f64> {
  if values.is_empty() {
    None
  } else {
    Some(values.iter().sum::<f64>() / values.len() as f64)
  }
}

/// Correlation between two catalog metrics over days where both are present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricCorrelation {
  pub x: MetricId,
  pub y: MetricId,
  pub r: f64,
  pub samples: usize,
}

pub fn correlate_metrics(days: &[DailyAggregate], x: MetricId, y: MetricId) -> MetricCorrelation {
  let (xs, ys): (Vec<f64>, Vec<f64>) = days
    .iter()
    .filter_map(|d| Some((d.get(x)?, d.get(y)?)))
    .unzip();

  MetricCorrelation {
    x,
    y,
    r: correlation(&xs, &ys),
    samples: xs.len(),
  }
}

/// ---------------------------------------------------------------------------
/// Insight Generation
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSettings {
  /// Name of the tracked medication as it appears in insight text
  pub medication_label: String,
}

impl Default for InsightSettings {
  fn default() -> Self {
    Self {
      medication_label: TrackedMedication::default().label(),
    }
  }
}

impl From<&TrackedMedication> for InsightSettings {
  fn from(tracked: &TrackedMedication) -> Self {
    Self {
      medication_label: tracked.label(),
    }
  }
}

/// Run every rule with default settings
pub fn generate_insights(days: &[DailyAggregate]) -> Vec<Insight> {
  generate_insights_with(days, &InsightSettings::default())
}

/// Run every rule over the daily series; high priority insights come first,
/// otherwise rule order is kept.
pub fn generate_insights_with(days: &[DailyAggregate], settings: &InsightSettings) -> Vec<Insight> {
  let rules: [Option<Insight>; 6] = [
    sleep_productivity(days),
    dose_blood_sugar(days, settings),
    dosage_side_effects(days),
    exercise_mood_productivity(days),
    weight_trend(days),
    blood_sugar_focus(days),
  ];

  let insights = rank(rules.into_iter().flatten().collect());
  tracing::debug!(count = insights.len(), days = days.len(), "Generated insights");
  insights
}

/// Stable partition: high priority first, relative order kept within groups
pub fn rank(mut insights: Vec<Insight>) -> Vec<Insight> {
  insights.sort_by_key(|i| !i.is_high_priority());
  insights
}

fn sleep_productivity(days: &[DailyAggregate]) -> Option<Insight> {
  let valid: Vec<(f64, f64)> = days
    .iter()
    .filter_map(|d| Some((d.sleep?, d.productivity?)))
    .collect();
  if valid.len() < SLEEP_MIN_VALID_DAYS {
    return None;
  }

  let good: Vec<f64> = valid.iter().filter(|(s, _)| *s >= GOOD_SLEEP_HOURS).map(|(_, p)| *p).collect();
  let poor: Vec<f64> = valid.iter().filter(|(s, _)| *s < POOR_SLEEP_HOURS).map(|(_, p)| *p).collect();

  let gap = mean(&good)? - mean(&poor)?;
  if gap <= SLEEP_PRODUCTIVITY_GAP {
    return None;
  }

  Some(Insight::new(
    InsightType::Positive,
    InsightPriority::High,
    "Sleep Impacts Work Performance",
    format!(
      "Your productivity is {:.1} points higher on days after 7+ hours of sleep compared to nights under 6 hours.",
      gap
    ),
  ))
}

fn dose_blood_sugar(days: &[DailyAggregate], settings: &InsightSettings) -> Option<Insight> {
  let valid: Vec<(f64, f64)> = days
    .iter()
    .filter_map(|d| Some((d.tracked_med_dosage?, d.blood_sugar?)))
    .collect();

  let high: Vec<f64> = valid.iter().filter(|(dose, _)| *dose > HIGH_DOSE_MG).map(|(_, bs)| *bs).collect();
  let low: Vec<f64> = valid.iter().filter(|(dose, _)| *dose <= HIGH_DOSE_MG).map(|(_, bs)| *bs).collect();
  if high.len() < DOSE_MIN_DAYS_PER_GROUP || low.len() < DOSE_MIN_DAYS_PER_GROUP {
    return None;
  }

  let gap = mean(&high)? - mean(&low)?;
  if gap <= DOSE_BLOOD_SUGAR_GAP {
    return None;
  }

  Some(Insight::new(
    InsightType::Warning,
    InsightPriority::High,
    format!("Higher {} Doses Linked to Blood Sugar", settings.medication_label),
    format!(
      "Blood sugar averages {:.1} mg/dL higher on days with more than {:.0}mg of {}. Consider discussing this with your doctor.",
      gap, HIGH_DOSE_MG, settings.medication_label
    ),
  ))
}

fn dosage_side_effects(days: &[DailyAggregate]) -> Option<Insight> {
  let (dosages, severities): (Vec<f64>, Vec<f64>) = days
    .iter()
    .filter(|d| d.total_dosage > 0.0)
    .filter_map(|d| Some((d.total_dosage, d.side_effects_severity?)))
    .unzip();
  if dosages.len() < SIDE_EFFECT_MIN_DAYS {
    return None;
  }

  let r = correlation(&dosages, &severities);
  if r <= SIDE_EFFECT_CORRELATION {
    return None;
  }

  Some(Insight::new(
    InsightType::Warning,
    InsightPriority::Medium,
    "Side Effects Track Total Dosage",
    format!(
      "Side effect severity shows a {:.0}% correlation with your total daily dosage.",
      r * 100.0
    ),
  ))
}

fn exercise_mood_productivity(days: &[DailyAggregate]) -> Option<Insight> {
  let valid: Vec<&DailyAggregate> = days
    .iter()
    .filter(|d| d.mood.is_some() && d.productivity.is_some())
    .collect();

  let split = |active: bool, metric: fn(&DailyAggregate) -> Option<f64>| -> Vec<f64> {
    valid
      .iter()
      .filter(|d| (d.exercise > 0.0) == active)
      .filter_map(|d| metric(d))
      .collect()
  };

  let mood_gap = mean(&split(true, |d| d.mood))? - mean(&split(false, |d| d.mood))?;
  let productivity_gap =
    mean(&split(true, |d| d.productivity))? - mean(&split(false, |d| d.productivity))?;

  if mood_gap <= EXERCISE_MOOD_GAP || productivity_gap <= EXERCISE_PRODUCTIVITY_GAP {
    return None;
  }

  Some(Insight::new(
    InsightType::Positive,
    InsightPriority::Medium,
    "Exercise Boosts Mood and Productivity",
    format!(
      "On days you exercise, mood is {:.1} points higher and productivity is {:.1} points higher.",
      mood_gap, productivity_gap
    ),
  ))
}

fn weight_trend(days: &[DailyAggregate]) -> Option<Insight> {
  let mut valid: Vec<&DailyAggregate> = days
    .iter()
    .filter(|d| d.weight.is_some() && d.total_dosage > 0.0)
    .collect();
  if valid.len() < WEIGHT_MIN_DAYS {
    return None;
  }
  valid.sort_by_key(|d| d.date);

  let delta = valid.last()?.weight? - valid.first()?.weight?;
  if delta.abs() <= WEIGHT_CHANGE_LBS {
    return None;
  }

  let dosages: Vec<f64> = valid.iter().map(|d| d.total_dosage).collect();
  let avg_dosage = mean(&dosages)?;

  let (insight_type, priority, title, direction) = if delta > 0.0 {
    (InsightType::Warning, InsightPriority::Medium, "Weight Gain Detected", "gained")
  } else {
    (InsightType::Info, InsightPriority::Low, "Weight Loss Detected", "lost")
  };

  Some(Insight::new(
    insight_type,
    priority,
    title,
    format!(
      "You've {} {:.1} lbs over this period while averaging {:.0}mg total daily dosage.",
      direction,
      delta.abs(),
      avg_dosage
    ),
  ))
}

fn blood_sugar_focus(days: &[DailyAggregate]) -> Option<Insight> {
  let valid: Vec<(f64, f64)> = days
    .iter()
    .filter_map(|d| Some((d.blood_sugar?, d.focus?)))
    .collect();

  let high: Vec<f64> = valid.iter().filter(|(bs, _)| *bs > HIGH_BLOOD_SUGAR).map(|(_, f)| *f).collect();
  let normal: Vec<f64> = valid
    .iter()
    .filter(|(bs, _)| *bs > 0.0 && *bs <= HIGH_BLOOD_SUGAR)
    .map(|(_, f)| *f)
    .collect();
  if high.len() < BLOOD_SUGAR_MIN_DAYS_PER_GROUP || normal.len() < BLOOD_SUGAR_MIN_DAYS_PER_GROUP {
    return None;
  }

  let gap = mean(&normal)? - mean(&high)?;
  if gap <= BLOOD_SUGAR_FOCUS_GAP {
    return None;
  }

  Some(Insight::new(
    InsightType::Warning,
    InsightPriority::Medium,
    "High Blood Sugar Affects Focus",
    format!(
      "Your focus drops by {:.1} points on days when blood sugar is above {:.0} mg/dL.",
      gap, HIGH_BLOOD_SUGAR
    ),
  ))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
