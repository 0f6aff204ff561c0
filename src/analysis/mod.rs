//! Analysis modules.
//!
//! [`PracticeAnalysis::run`] is the per-request entry point: it runs every
//! aggregator pass over a [`Dataset`] and hands the result to the insight and
//! recommendation composers. Nothing here is cached; each question gets a
//! fresh analysis of the same immutable dataset.

pub mod aggregator;
pub mod insights;
pub mod recommendations;
pub mod sentiment;

pub use aggregator::*;
pub use insights::{compose, Insight};
pub use recommendations::{recommend, Recommendation};
pub use sentiment::{bucket_comments, SentimentBreakdown, SentimentPolicy};

use crate::dataset::Dataset;
use crate::error::AnalysisError;
use crate::models::{PerformanceRecord, ProcedureStats, SlotStats};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

/// Tunables for one analysis pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    /// How many agents to list in each top ranking.
    pub top_limit: usize,
    /// Satisfaction below this marks an agent for improvement.
    pub improvement_threshold: f64,
    pub sentiment: SentimentPolicy,
    /// Narrow the prompt to the data the question is about.
    pub scope_by_query: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            top_limit: 3,
            improvement_threshold: 4.5,
            sentiment: SentimentPolicy::default(),
            scope_by_query: true,
        }
    }
}

/// Rankings over the agent records.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Rankings<'a> {
    /// Every agent, satisfaction descending.
    pub by_satisfaction: Vec<&'a PerformanceRecord>,
    /// Top agents by treatment success rate.
    pub by_success_rate: Vec<&'a PerformanceRecord>,
    pub efficiency: EfficiencyRanking<'a>,
    /// Agents under the improvement threshold, worst first.
    pub below_threshold: Vec<&'a PerformanceRecord>,
}

/// Everything derived from a dataset for one request.
#[derive(Debug, Clone, Serialize)]
pub struct PracticeAnalysis<'a> {
    pub summary: OverallSummary,
    pub rankings: Rankings<'a>,
    pub top_limit: usize,
    pub improvement_threshold: f64,
    #[serde(skip)]
    pub trend_deltas: IndexMap<String, DeltaOutcome>,
    pub recent_trend: Option<RecentTrend>,
    pub services: Option<ServiceRanking>,
    pub best_category: Option<Best>,
    pub worst_category: Option<Best>,
    pub best_time_slot: Option<Best>,
    pub best_procedure: Option<Best>,
    pub sentiment: Option<SentimentBreakdown<'a>>,
    pub total_responses: Option<u32>,
    #[serde(skip)]
    pub category_ratings: Option<&'a IndexMap<String, f64>>,
    #[serde(skip)]
    pub time_slots: &'a IndexMap<String, SlotStats>,
    #[serde(skip)]
    pub procedures: &'a IndexMap<String, ProcedureStats>,
}

impl<'a> PracticeAnalysis<'a> {
    pub fn run(dataset: &'a Dataset, settings: &AnalysisSettings) -> Result<Self, AnalysisError> {
        let agents = dataset.agents.as_slice();

        let rankings = Rankings {
            by_satisfaction: top_performers(agents, agents.len(), Metric::Satisfaction),
            by_success_rate: top_performers(agents, settings.top_limit, Metric::SuccessRate),
            efficiency: efficiency_ranking(agents),
            below_threshold: below_threshold(
                agents,
                Metric::Satisfaction,
                settings.improvement_threshold,
            )?,
        };

        let snapshot = dataset.satisfaction.as_ref();
        let analysis = Self {
            summary: summarize(agents),
            rankings,
            top_limit: settings.top_limit,
            improvement_threshold: settings.improvement_threshold,
            trend_deltas: snapshot
                .map(|s| trend_deltas(s.monthly_trend()))
                .unwrap_or_default(),
            recent_trend: snapshot.and_then(|s| recent_trend(s.monthly_trend())),
            services: snapshot.and_then(|s| rank_services(s.service_breakdown())),
            best_category: snapshot.and_then(|s| best_by(s.category_ratings(), |v| *v)),
            worst_category: snapshot.and_then(|s| worst_by(s.category_ratings(), |v| *v)),
            best_time_slot: best_by(&dataset.time_slots, |s| s.average_satisfaction),
            best_procedure: best_by(&dataset.procedures, |s| s.average_satisfaction),
            sentiment: snapshot.map(|s| bucket_comments(s.comments(), &settings.sentiment)),
            total_responses: snapshot.map(|s| s.total_responses()),
            category_ratings: snapshot.map(|s| s.category_ratings()),
            time_slots: &dataset.time_slots,
            procedures: &dataset.procedures,
        };

        debug!(
            "Analysis: {} agents, {} below threshold, {} flagged for efficiency",
            analysis.summary.record_count,
            analysis.rankings.below_threshold.len(),
            analysis.rankings.efficiency.flagged.len()
        );

        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_on_sample() {
        let dataset = Dataset::sample().unwrap();
        let analysis = PracticeAnalysis::run(&dataset, &AnalysisSettings::default()).unwrap();

        assert_eq!(analysis.summary.record_count, 5);
        assert_eq!(analysis.rankings.by_success_rate.len(), 3);
        assert_eq!(analysis.rankings.by_satisfaction[0].id(), "A001");
        assert_eq!(analysis.rankings.below_threshold.len(), 2);
        assert_eq!(analysis.trend_deltas.len(), 5);
        assert_eq!(analysis.best_time_slot.as_ref().unwrap().key, "morning");
        assert_eq!(analysis.worst_category.as_ref().unwrap().key, "wait_times");
        assert_eq!(analysis.best_category.as_ref().unwrap().key, "staff_friendliness");
        assert_eq!(analysis.total_responses, Some(156));
    }

    #[test]
    fn test_run_rejects_nan_threshold() {
        let dataset = Dataset::sample().unwrap();
        let settings = AnalysisSettings {
            improvement_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(PracticeAnalysis::run(&dataset, &settings).is_err());
    }

    #[test]
    fn test_run_without_satisfaction() {
        let mut dataset = Dataset::sample().unwrap();
        dataset.satisfaction = None;
        let analysis = PracticeAnalysis::run(&dataset, &AnalysisSettings::default()).unwrap();
        assert!(analysis.recent_trend.is_none());
        assert!(analysis.services.is_none());
        assert!(analysis.sentiment.is_none());
        assert!(analysis.trend_deltas.is_empty());
    }
}
