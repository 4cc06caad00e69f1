use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightType {
  Positive,
  Warning,
  Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightPriority {
  High,
  Medium,
  Low,
}

/// A human-readable observation about a pattern across daily metrics.
/// Derived on every request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
  #[serde(rename = "type")]
  pub insight_type: InsightType,
  pub title: String,
  pub description: String,
  pub priority: InsightPriority,
}

impl Insight {
  pub fn new(
    insight_type: InsightType,
    priority: InsightPriority,
    title: impl Into<String>,
    description: impl Into<String>,
  ) -> Self {
    Self {
      insight_type,
      title: title.into(),
      description: description.into(),
      priority,
    }
  }

  pub fn is_high_priority(&self) -> bool {
    self.priority == InsightPriority::High
  }
}
