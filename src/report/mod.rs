//! Insight reports for the `--insights` and `--agent` commands.

pub mod generator;

pub use generator::*;

use crate::analysis::{
    compose, recommend, Insight, PracticeAnalysis, Recommendation, TrendDelta,
};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Data file the report was built from, or `"sample"`.
    pub data_source: String,
    pub generated_at: DateTime<Utc>,
    pub agents_analyzed: usize,
    pub survey_responses: Option<u32>,
}

/// Everything the insights report shows.
#[derive(Debug, Clone, Serialize)]
pub struct InsightReport<'a> {
    pub metadata: ReportMetadata,
    pub analysis: &'a PracticeAnalysis<'a>,
    /// Period-over-period change; `null` where the previous period is zero.
    pub trend_deltas: IndexMap<String, Option<TrendDelta>>,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
}

impl<'a> InsightReport<'a> {
    pub fn new(analysis: &'a PracticeAnalysis<'a>, data_source: &str) -> Self {
        Self {
            metadata: ReportMetadata {
                data_source: data_source.to_string(),
                generated_at: Utc::now(),
                agents_analyzed: analysis.summary.record_count,
                survey_responses: analysis.total_responses,
            },
            trend_deltas: analysis
                .trend_deltas
                .iter()
                .map(|(period, delta)| (period.clone(), delta.as_ref().ok().copied()))
                .collect(),
            insights: compose(analysis),
            recommendations: recommend(analysis),
            analysis,
        }
    }
}
