//! Practice dataset loading.
//!
//! Reads the practice JSON document (`agent_performance` +
//! `customer_satisfaction` blocks) and converts it into validated models.
//! Precomputed aggregates in the document (`overall_metrics`) are ignored;
//! the aggregator always recomputes them.

use crate::error::AnalysisError;
use crate::models::{
    PerformanceRecord, ProcedureStats, RecordFields, SatisfactionSnapshot, ServiceStats,
    SlotStats, SnapshotFields, SurveyComment,
};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

const SAMPLE_PRACTICE: &str = include_str!("../data/sample_practice.json");

/// Everything the assistant knows about one practice.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub agents: Vec<PerformanceRecord>,
    pub satisfaction: Option<SatisfactionSnapshot>,
    /// Satisfaction by time of day, in document order.
    pub time_slots: IndexMap<String, SlotStats>,
    /// Satisfaction by procedure, in document order.
    pub procedures: IndexMap<String, ProcedureStats>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    agent_performance: Option<RawAgentPerformance>,
    #[serde(default)]
    customer_satisfaction: Option<RawSatisfaction>,
}

#[derive(Debug, Deserialize)]
struct RawAgentPerformance {
    #[serde(default)]
    agents: Vec<RawAgent>,
    #[serde(default)]
    performance_by_time: IndexMap<String, SlotStats>,
    #[serde(default)]
    performance_by_procedure: IndexMap<String, ProcedureStats>,
}

#[derive(Debug, Deserialize)]
struct RawAgent {
    id: String,
    name: String,
    #[serde(default)]
    role: String,
    metrics: RawAgentMetrics,
    #[serde(default)]
    specialties: Vec<String>,
    #[serde(default)]
    comments: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawAgentMetrics {
    satisfaction_rating: f64,
    appointment_duration: i64,
    appointments_per_day: f64,
    treatment_success_rate: f64,
    patient_retention: f64,
}

#[derive(Debug, Deserialize)]
struct RawSatisfaction {
    overall_rating: f64,
    #[serde(default)]
    time_period: String,
    #[serde(default)]
    total_responses: u32,
    #[serde(default)]
    categories: IndexMap<String, f64>,
    #[serde(default)]
    trend: IndexMap<String, f64>,
    #[serde(default)]
    service_breakdown: IndexMap<String, ServiceStats>,
    #[serde(default)]
    comments: Vec<RawComment>,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    rating: u8,
    comment: String,
    date: String,
}

impl TryFrom<RawAgent> for PerformanceRecord {
    type Error = AnalysisError;

    fn try_from(raw: RawAgent) -> Result<Self, Self::Error> {
        PerformanceRecord::new(RecordFields {
            id: raw.id,
            name: raw.name,
            role: raw.role,
            satisfaction: raw.metrics.satisfaction_rating,
            duration_minutes: raw.metrics.appointment_duration,
            appointments_per_day: raw.metrics.appointments_per_day,
            success_rate_pct: raw.metrics.treatment_success_rate,
            retention_pct: raw.metrics.patient_retention,
            specialties: raw.specialties,
            comments: raw.comments,
        })
    }
}

impl TryFrom<RawSatisfaction> for SatisfactionSnapshot {
    type Error = AnalysisError;

    fn try_from(raw: RawSatisfaction) -> Result<Self, Self::Error> {
        let comments = raw
            .comments
            .into_iter()
            .map(|c| SurveyComment::new(c.rating, c.comment, &c.date))
            .collect::<Result<Vec<_>, _>>()?;

        SatisfactionSnapshot::new(SnapshotFields {
            overall_rating: raw.overall_rating,
            time_period: raw.time_period,
            total_responses: raw.total_responses,
            category_ratings: raw.categories,
            monthly_trend: raw.trend,
            service_breakdown: raw.service_breakdown,
            comments,
        })
    }
}

impl Dataset {
    /// The built-in demo practice.
    pub fn sample() -> Result<Self> {
        Self::from_json_str(SAMPLE_PRACTICE).context("Built-in sample data is invalid")
    }

    /// Load a practice document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read data file: {}", path.display()))?;

        let dataset = Self::from_json_str(&content)
            .with_context(|| format!("Failed to load data file: {}", path.display()))?;

        info!(
            "Loaded {} agents from {}",
            dataset.agents.len(),
            path.display()
        );
        Ok(dataset)
    }

    /// Parse and validate a practice document.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawDocument =
            serde_json::from_str(content).context("Data file is not valid practice JSON")?;

        let (agents, time_slots, procedures) = match raw.agent_performance {
            Some(perf) => {
                let agents = perf
                    .agents
                    .into_iter()
                    .map(PerformanceRecord::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                check_unique_ids(&agents)?;
                (agents, perf.performance_by_time, perf.performance_by_procedure)
            }
            None => (Vec::new(), IndexMap::new(), IndexMap::new()),
        };

        let satisfaction = raw
            .customer_satisfaction
            .map(SatisfactionSnapshot::try_from)
            .transpose()?;

        if agents.is_empty() && satisfaction.is_none() {
            return Err(AnalysisError::EmptyInput(
                "document has neither agents nor customer satisfaction data".to_string(),
            )
            .into());
        }

        debug!(
            "Dataset: {} agents, {} time slots, {} procedures, satisfaction: {}",
            agents.len(),
            time_slots.len(),
            procedures.len(),
            satisfaction.is_some()
        );

        Ok(Self {
            agents,
            satisfaction,
            time_slots,
            procedures,
        })
    }

    /// Find an agent by id (case-insensitive).
    pub fn agent(&self, id: &str) -> Option<&PerformanceRecord> {
        self.agents.iter().find(|a| a.id().eq_ignore_ascii_case(id))
    }
}

/// Ids are compared case-insensitively, matching [`Dataset::agent`].
fn check_unique_ids(agents: &[PerformanceRecord]) -> Result<(), AnalysisError> {
    let mut seen = HashSet::new();
    for agent in agents {
        if !seen.insert(agent.id().to_lowercase()) {
            return Err(AnalysisError::InvalidRecord {
                id: agent.id().to_string(),
                reason: "duplicate id".to_string(),
            });
        }
    }
    Ok(())
}
