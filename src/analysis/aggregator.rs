//! Record aggregation and ranking.
//!
//! Pure functions over a slice of [`PerformanceRecord`]s and the ordered maps
//! of a [`SatisfactionSnapshot`](crate::models::SatisfactionSnapshot). Every
//! ranking is a stable sort, so ties keep the original record order.

use crate::error::AnalysisError;
use crate::models::{PerformanceRecord, ServiceStats};
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use tracing::warn;

/// Which record field a ranking is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Satisfaction,
    Duration,
    AppointmentsPerDay,
    SuccessRate,
    Retention,
    Efficiency,
}

impl Metric {
    /// The metric's value for a record, `None` when it is undefined
    /// (efficiency with a non-positive duration).
    pub fn value(self, record: &PerformanceRecord) -> Option<f64> {
        match self {
            Metric::Satisfaction => Some(record.satisfaction()),
            Metric::Duration => Some(record.duration_minutes() as f64),
            Metric::AppointmentsPerDay => Some(record.appointments_per_day()),
            Metric::SuccessRate => Some(record.success_rate_pct()),
            Metric::Retention => Some(record.retention_pct()),
            Metric::Efficiency => efficiency_score(record),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Satisfaction => write!(f, "satisfaction"),
            Metric::Duration => write!(f, "duration_minutes"),
            Metric::AppointmentsPerDay => write!(f, "appointments_per_day"),
            Metric::SuccessRate => write!(f, "success_rate_pct"),
            Metric::Retention => write!(f, "retention_pct"),
            Metric::Efficiency => write!(f, "efficiency_score"),
        }
    }
}

/// Means across all records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverallSummary {
    pub record_count: usize,
    pub average_satisfaction: f64,
    pub average_duration_minutes: f64,
    pub average_appointments_per_day: f64,
    pub average_success_rate: f64,
    pub average_retention: f64,
}

impl OverallSummary {
    /// Sentinel returned for an empty record set.
    pub fn empty() -> Self {
        Self {
            record_count: 0,
            average_satisfaction: 0.0,
            average_duration_minutes: 0.0,
            average_appointments_per_day: 0.0,
            average_success_rate: 0.0,
            average_retention: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }
}

/// Arithmetic means of the core metrics. Never fails: an empty slice yields
/// [`OverallSummary::empty`].
pub fn summarize(records: &[PerformanceRecord]) -> OverallSummary {
    if records.is_empty() {
        return OverallSummary::empty();
    }

    let n = records.len() as f64;
    let mean = |f: fn(&PerformanceRecord) -> f64| records.iter().map(f).sum::<f64>() / n;

    OverallSummary {
        record_count: records.len(),
        average_satisfaction: mean(|r| r.satisfaction()),
        average_duration_minutes: mean(|r| r.duration_minutes() as f64),
        average_appointments_per_day: mean(|r| r.appointments_per_day()),
        average_success_rate: mean(|r| r.success_rate_pct()),
        average_retention: mean(|r| r.retention_pct()),
    }
}

/// Convert a caller-supplied limit, rejecting negatives.
pub fn checked_limit(limit: i64) -> Result<usize, AnalysisError> {
    usize::try_from(limit)
        .map_err(|_| AnalysisError::InvalidMetric(format!("limit must be >= 0, got {}", limit)))
}

/// The first `limit` records, descending by `metric`.
///
/// Records for which the metric is undefined are left out.
pub fn top_performers(
    records: &[PerformanceRecord],
    limit: usize,
    metric: Metric,
) -> Vec<&PerformanceRecord> {
    let mut scored: Vec<(&PerformanceRecord, f64)> = records
        .iter()
        .filter_map(|r| metric.value(r).map(|v| (r, v)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(limit);

    scored.into_iter().map(|(r, _)| r).collect()
}

/// Records whose `metric` is strictly below `threshold`, worst first.
pub fn below_threshold(
    records: &[PerformanceRecord],
    metric: Metric,
    threshold: f64,
) -> Result<Vec<&PerformanceRecord>, AnalysisError> {
    if !threshold.is_finite() {
        return Err(AnalysisError::InvalidMetric(format!(
            "threshold for {} must be a finite number, got {}",
            metric, threshold
        )));
    }

    let mut below: Vec<(&PerformanceRecord, f64)> = records
        .iter()
        .filter_map(|r| metric.value(r).map(|v| (r, v)))
        .filter(|(_, v)| *v < threshold)
        .collect();

    below.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    Ok(below.into_iter().map(|(r, _)| r).collect())
}

/// `satisfaction / duration_minutes * 100`, undefined for non-positive durations.
pub fn efficiency_score(record: &PerformanceRecord) -> Option<f64> {
    if record.duration_minutes() <= 0 {
        return None;
    }
    Some(record.satisfaction() / record.duration_minutes() as f64 * 100.0)
}

/// A record paired with the score it was ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredRecord<'a> {
    pub record: &'a PerformanceRecord,
    pub score: f64,
}

/// Efficiency ranking plus the records that could not be scored.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EfficiencyRanking<'a> {
    pub ranked: Vec<ScoredRecord<'a>>,
    pub flagged: Vec<&'a PerformanceRecord>,
}

impl<'a> EfficiencyRanking<'a> {
    pub fn most_efficient(&self) -> Option<&ScoredRecord<'a>> {
        self.ranked.first()
    }

    pub fn least_efficient(&self) -> Option<&ScoredRecord<'a>> {
        self.ranked.last()
    }

    /// 1-based position of a record in the ranking.
    pub fn rank_of(&self, id: &str) -> Option<usize> {
        self.ranked
            .iter()
            .position(|s| s.record.id() == id)
            .map(|i| i + 1)
    }
}

/// Rank all records by efficiency score, highest first.
pub fn efficiency_ranking(records: &[PerformanceRecord]) -> EfficiencyRanking<'_> {
    let mut ranking = EfficiencyRanking::default();

    for record in records {
        match efficiency_score(record) {
            Some(score) => ranking.ranked.push(ScoredRecord { record, score }),
            None => {
                warn!(
                    "Excluding {} from efficiency ranking: duration {} min is not positive",
                    record.id(),
                    record.duration_minutes()
                );
                ranking.flagged.push(record);
            }
        }
    }

    ranking
        .ranked
        .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    ranking
}

/// Change of a period against the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendDelta {
    pub absolute: f64,
    pub percentage: f64,
}

pub type DeltaOutcome = Result<TrendDelta, AnalysisError>;

/// Period-over-period deltas. The first period has no entry; a zero
/// previous value yields [`AnalysisError::UndefinedDelta`].
pub fn trend_deltas(trend: &IndexMap<String, f64>) -> IndexMap<String, DeltaOutcome> {
    let mut deltas = IndexMap::new();

    for ((previous_period, previous), (period, current)) in trend.iter().zip(trend.iter().skip(1)) {
        deltas.insert(period.clone(), delta(previous_period, *previous, period, *current));
    }

    deltas
}

fn delta(previous_period: &str, previous: f64, period: &str, current: f64) -> DeltaOutcome {
    if previous == 0.0 {
        return Err(AnalysisError::UndefinedDelta {
            period: period.to_string(),
            previous: previous_period.to_string(),
        });
    }
    let absolute = current - previous;
    Ok(TrendDelta {
        absolute,
        percentage: absolute / previous * 100.0,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Up => write!(f, "up"),
            TrendDirection::Down => write!(f, "down"),
            TrendDirection::Stable => write!(f, "stable"),
        }
    }
}

/// The last two periods of a trend series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentTrend {
    pub previous_period: String,
    pub current_period: String,
    pub previous_value: f64,
    pub current_value: f64,
    pub change: f64,
    /// `None` when the previous value is zero.
    pub percentage_change: Option<f64>,
    pub direction: TrendDirection,
}

pub fn recent_trend(trend: &IndexMap<String, f64>) -> Option<RecentTrend> {
    let n = trend.len();
    if n < 2 {
        return None;
    }
    let (previous_period, previous_value) = trend.get_index(n - 2)?;
    let (current_period, current_value) = trend.get_index(n - 1)?;

    let change = current_value - previous_value;
    let direction = if change > 0.0 {
        TrendDirection::Up
    } else if change < 0.0 {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    };

    Some(RecentTrend {
        previous_period: previous_period.clone(),
        current_period: current_period.clone(),
        previous_value: *previous_value,
        current_value: *current_value,
        change,
        percentage_change: delta(previous_period, *previous_value, current_period, *current_value)
            .ok()
            .map(|d| d.percentage),
        direction,
    })
}

/// Winning key of a grouped metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Best {
    pub key: String,
    pub value: f64,
}

/// Highest value; ties resolve to the first key in insertion order.
pub fn best_by<V>(map: &IndexMap<String, V>, value: impl Fn(&V) -> f64) -> Option<Best> {
    extreme_by(map, value, |candidate, current| candidate > current)
}

/// Lowest value; ties resolve to the first key in insertion order.
pub fn worst_by<V>(map: &IndexMap<String, V>, value: impl Fn(&V) -> f64) -> Option<Best> {
    extreme_by(map, value, |candidate, current| candidate < current)
}

fn extreme_by<V>(
    map: &IndexMap<String, V>,
    value: impl Fn(&V) -> f64,
    beats: impl Fn(f64, f64) -> bool,
) -> Option<Best> {
    let mut best: Option<Best> = None;

    for (key, v) in map {
        let v = value(v);
        match &best {
            Some(current) if !beats(v, current.value) => {}
            _ => {
                best = Some(Best {
                    key: key.clone(),
                    value: v,
                })
            }
        }
    }

    best
}

/// One service line with its survey numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedService {
    pub service: String,
    pub count: u32,
    pub avg_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRanking {
    pub by_rating: Vec<RankedService>,
    pub by_count: Vec<RankedService>,
}

impl ServiceRanking {
    pub fn highest_rated(&self) -> Option<&RankedService> {
        self.by_rating.first()
    }

    pub fn lowest_rated(&self) -> Option<&RankedService> {
        self.by_rating.last()
    }

    pub fn most_popular(&self) -> Option<&RankedService> {
        self.by_count.first()
    }
}

/// Services sorted by rating and by volume; `None` for an empty breakdown.
pub fn rank_services(breakdown: &IndexMap<String, ServiceStats>) -> Option<ServiceRanking> {
    if breakdown.is_empty() {
        return None;
    }

    let services: Vec<RankedService> = breakdown
        .iter()
        .map(|(service, stats)| RankedService {
            service: service.clone(),
            count: stats.count,
            avg_rating: stats.avg_rating,
        })
        .collect();

    let mut by_rating = services.clone();
    by_rating.sort_by(|a, b| {
        b.avg_rating
            .partial_cmp(&a.avg_rating)
            .unwrap_or(Ordering::Equal)
    });

    let mut by_count = services;
    by_count.sort_by_key(|s| std::cmp::Reverse(s.count));

    Some(ServiceRanking { by_rating, by_count })
}

/// Difference between one agent and the practice average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComparedToAverage {
    pub satisfaction: f64,
    pub duration_minutes: f64,
    pub appointments_per_day: f64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentProfile<'a> {
    pub record: &'a PerformanceRecord,
    pub satisfaction_rank: usize,
    /// `None` when the agent is excluded from the efficiency ranking.
    pub efficiency_rank: Option<usize>,
    pub efficiency_score: Option<f64>,
    pub compared_to_average: ComparedToAverage,
}

/// Ranks and deltas-vs-average for one agent; `None` for an unknown id.
pub fn agent_profile<'a>(records: &'a [PerformanceRecord], id: &str) -> Option<AgentProfile<'a>> {
    let record = records.iter().find(|r| r.id() == id)?;
    let summary = summarize(records);

    let satisfaction_rank = top_performers(records, records.len(), Metric::Satisfaction)
        .iter()
        .position(|r| r.id() == id)
        .map(|i| i + 1)?;

    let efficiency_rank = efficiency_ranking(records).rank_of(id);

    Some(AgentProfile {
        record,
        satisfaction_rank,
        efficiency_rank,
        efficiency_score: efficiency_score(record),
        compared_to_average: ComparedToAverage {
            satisfaction: record.satisfaction() - summary.average_satisfaction,
            duration_minutes: record.duration_minutes() as f64 - summary.average_duration_minutes,
            appointments_per_day: record.appointments_per_day()
                - summary.average_appointments_per_day,
            success_rate: record.success_rate_pct() - summary.average_success_rate,
        },
    })
}
