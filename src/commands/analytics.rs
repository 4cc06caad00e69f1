use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use serde::Serialize;

use super::CommandError;
use crate::aggregate::{self, LookbackWindow};
use crate::catalog::{MetricId, MetricSpec, CATALOG};
use crate::config::AppConfig;
use crate::insights::{self, InsightSettings, MetricCorrelation};
use crate::models::{DailyAggregate, Insight, SeriesPoint};
use crate::store::{RecordRepository, RecordSnapshot};

/// ---------------------------------------------------------------------------
/// Report Types
/// ---------------------------------------------------------------------------

/// Everything a dashboard needs for one window
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
  pub window: LookbackWindow,
  pub generated_at: DateTime<Utc>,
  pub days: Vec<DailyAggregate>,
  pub insights: Vec<Insight>,
  pub catalog: Vec<MetricSpec>,
}

/// ---------------------------------------------------------------------------
/// Snapshot Loading
/// ---------------------------------------------------------------------------

/// Load the records that can land in `window` ending at `now`.
/// One extra day covers time zones ahead of UTC; `aggregate` drops the rest.
async fn load_window<R, Tz>(
  repo: &R,
  window: LookbackWindow,
  now: &DateTime<Tz>,
) -> Result<RecordSnapshot, CommandError>
where
  R: RecordRepository,
  Tz: TimeZone,
{
  let since = now.with_timezone(&Utc) - Duration::days(window.days() + 1);
  Ok(repo.load_snapshot(Some(since)).await?)
}

/// ---------------------------------------------------------------------------
/// Daily Series
/// ---------------------------------------------------------------------------

/// Dense daily series for `window` (the configured window when `None`),
/// ending today in local time
pub async fn get_daily_series<R: RecordRepository>(
  repo: &R,
  config: &AppConfig,
  window: Option<LookbackWindow>,
) -> Result<Vec<DailyAggregate>, CommandError> {
  daily_series_at(repo, config, window.unwrap_or(config.window), &Local::now()).await
}

pub async fn daily_series_at<R, Tz>(
  repo: &R,
  config: &AppConfig,
  window: LookbackWindow,
  now: &DateTime<Tz>,
) -> Result<Vec<DailyAggregate>, CommandError>
where
  R: RecordRepository,
  Tz: TimeZone,
{
  let snapshot = load_window(repo, window, now).await?;
  Ok(aggregate::aggregate(&snapshot, window, now, &config.tracked_medication))
}

/// ---------------------------------------------------------------------------
/// Insights
/// ---------------------------------------------------------------------------

pub async fn get_insights<R: RecordRepository>(
  repo: &R,
  config: &AppConfig,
  window: Option<LookbackWindow>,
) -> Result<Vec<Insight>, CommandError> {
  let days = get_daily_series(repo, config, window).await?;
  let settings = InsightSettings::from(&config.tracked_medication);
  Ok(insights::generate_insights_with(&days, &settings))
}

/// Daily series plus insights, computed off the async runtime
pub async fn get_analytics_report<R: RecordRepository>(
  repo: &R,
  config: &AppConfig,
  window: Option<LookbackWindow>,
) -> Result<AnalyticsReport, CommandError> {
  analytics_report_at(repo, config, window.unwrap_or(config.window), Local::now()).await
}

pub async fn analytics_report_at<R, Tz>(
  repo: &R,
  config: &AppConfig,
  window: LookbackWindow,
  now: DateTime<Tz>,
) -> Result<AnalyticsReport, CommandError>
where
  R: RecordRepository,
  Tz: TimeZone + Send + 'static,
  Tz::Offset: Send,
{
  let snapshot = load_window(repo, window, &now).await?;
  let tracked = config.tracked_medication.clone();

  let report = tokio::task::spawn_blocking(move || {
    let days = aggregate::aggregate(&snapshot, window, &now, &tracked);
    let insights = insights::generate_insights_with(&days, &InsightSettings::from(&tracked));
    AnalyticsReport {
      window,
      generated_at: now.with_timezone(&Utc),
      days,
      insights,
      catalog: CATALOG.to_vec(),
    }
  })
  .await
  .map_err(|e| CommandError::Compute(e.to_string()))?;

  tracing::info!(
    window = %report.window,
    days = report.days.len(),
    insights = report.insights.len(),
    "Built analytics report"
  );

  Ok(report)
}

/// ---------------------------------------------------------------------------
/// Flexible Analytics
/// ---------------------------------------------------------------------------

pub fn get_metric_catalog() -> Vec<MetricSpec> {
  CATALOG.to_vec()
}

/// One metric's series; `scaled` applies the catalog chart scale factor
pub async fn get_metric_series<R: RecordRepository>(
  repo: &R,
  config: &AppConfig,
  window: Option<LookbackWindow>,
  metric: &str,
  scaled: bool,
) -> Result<Vec<SeriesPoint>, CommandError> {
  let metric = parse_metric(metric)?;
  let days = get_daily_series(repo, config, window).await?;
  Ok(if scaled {
    aggregate::chart_series(&days, metric)
  } else {
    aggregate::metric_series(&days, metric)
  })
}

/// Pearson correlation between two metrics over days where both are present
pub async fn correlate<R: RecordRepository>(
  repo: &R,
  config: &AppConfig,
  window: Option<LookbackWindow>,
  x: &str,
  y: &str,
) -> Result<MetricCorrelation, CommandError> {
  let (x, y) = (parse_metric(x)?, parse_metric(y)?);
  let days = get_daily_series(repo, config, window).await?;
  Ok(insights::correlate_metrics(&days, x, y))
}

fn parse_metric(key: &str) -> Result<MetricId, CommandError> {
  key.parse::<MetricId>().map_err(CommandError::InvalidInput)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
