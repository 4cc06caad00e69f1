pub mod daily;
pub mod insight;
pub mod records;

pub use daily::{DailyAggregate, SeriesPoint};
pub use insight::{Insight, InsightPriority, InsightType};
pub use records::{
  DosageEntry, EpisodeType, ExerciseEntry, FoodEntry, HealthMetric, HealthMetricType, Medication,
  MedicationDose, MoodEntry, RawRecord, RecordCategory, Severity, SideEffectEntry, WorkEntry,
};
