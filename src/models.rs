//! Data models for practice analytics.
//!
//! Records are validated when they are constructed and are read-only
//! afterwards; everything derived from them lives in `analysis`.

use crate::error::AnalysisError;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of every rating scale in the dataset.
pub const MAX_RATING: f64 = 5.0;

/// One dentist's or staff member's performance data point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceRecord {
    id: String,
    name: String,
    role: String,
    satisfaction: f64,
    duration_minutes: i64,
    appointments_per_day: f64,
    success_rate_pct: f64,
    retention_pct: f64,
    specialties: Vec<String>,
    comments: Vec<String>,
}

/// Builder-style input for [`PerformanceRecord::new`].
#[derive(Debug, Clone, Default)]
pub struct RecordFields {
    pub id: String,
    pub name: String,
    pub role: String,
    pub satisfaction: f64,
    pub duration_minutes: i64,
    pub appointments_per_day: f64,
    pub success_rate_pct: f64,
    pub retention_pct: f64,
    pub specialties: Vec<String>,
    pub comments: Vec<String>,
}

impl PerformanceRecord {
    /// Validates the fields and builds an immutable record.
    ///
    /// `duration_minutes` is not range-checked: a non-positive duration is
    /// legal data that the efficiency ranking excludes and flags.
    pub fn new(fields: RecordFields) -> Result<Self, AnalysisError> {
        let id = fields.id.trim().to_string();
        if id.is_empty() {
            return Err(invalid(&fields.name, "id must not be empty"));
        }
        let name = fields.name.trim().to_string();
        if name.is_empty() {
            return Err(invalid(&id, "name must not be empty"));
        }

        check_range(&id, "satisfaction", fields.satisfaction, 0.0, MAX_RATING)?;
        check_range(&id, "success_rate_pct", fields.success_rate_pct, 0.0, 100.0)?;
        check_range(&id, "retention_pct", fields.retention_pct, 0.0, 100.0)?;
        if !fields.appointments_per_day.is_finite() || fields.appointments_per_day < 0.0 {
            return Err(invalid(&id, "appointments_per_day must be a non-negative number"));
        }

        Ok(Self {
            id,
            name,
            role: fields.role,
            satisfaction: fields.satisfaction,
            duration_minutes: fields.duration_minutes,
            appointments_per_day: fields.appointments_per_day,
            success_rate_pct: fields.success_rate_pct,
            retention_pct: fields.retention_pct,
            specialties: fields.specialties,
            comments: fields.comments,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// Patient satisfaction on the 0–5 scale.
    pub fn satisfaction(&self) -> f64 {
        self.satisfaction
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration_minutes
    }

    pub fn appointments_per_day(&self) -> f64 {
        self.appointments_per_day
    }

    pub fn success_rate_pct(&self) -> f64 {
        self.success_rate_pct
    }

    pub fn retention_pct(&self) -> f64 {
        self.retention_pct
    }

    pub fn specialties(&self) -> &[String] {
        &self.specialties
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }
}

/// Average rating and volume for one service type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceStats {
    pub count: u32,
    #[serde(rename = "average_rating")]
    pub avg_rating: f64,
}

/// Satisfaction and volume for one time-of-day slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotStats {
    pub average_satisfaction: f64,
    #[serde(default)]
    pub appointments: u32,
}

/// Satisfaction and volume for one procedure type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcedureStats {
    pub average_satisfaction: f64,
    #[serde(default, alias = "appointments")]
    pub count: u32,
}

/// A single free-text survey comment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyComment {
    pub rating: u8,
    pub text: String,
    pub date: NaiveDate,
}

impl SurveyComment {
    pub fn new(rating: u8, text: String, date: &str) -> Result<Self, AnalysisError> {
        if !(1..=5).contains(&rating) {
            return Err(invalid("comment", &format!("rating {} is outside 1..=5", rating)));
        }
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| invalid("comment", &format!("bad date '{}': {}", date, e)))?;
        Ok(Self { rating, text, date })
    }
}

/// Survey results for one reporting period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatisfactionSnapshot {
    overall_rating: f64,
    time_period: String,
    total_responses: u32,
    category_ratings: IndexMap<String, f64>,
    monthly_trend: IndexMap<String, f64>,
    service_breakdown: IndexMap<String, ServiceStats>,
    comments: Vec<SurveyComment>,
}

/// Input for [`SatisfactionSnapshot::new`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotFields {
    pub overall_rating: f64,
    pub time_period: String,
    pub total_responses: u32,
    pub category_ratings: IndexMap<String, f64>,
    pub monthly_trend: IndexMap<String, f64>,
    pub service_breakdown: IndexMap<String, ServiceStats>,
    pub comments: Vec<SurveyComment>,
}

impl SatisfactionSnapshot {
    pub fn new(fields: SnapshotFields) -> Result<Self, AnalysisError> {
        let scope = "customer_satisfaction";
        check_range(scope, "overall_rating", fields.overall_rating, 0.0, MAX_RATING)?;
        for (category, rating) in &fields.category_ratings {
            check_range(scope, category, *rating, 0.0, MAX_RATING)?;
        }
        for (period, rating) in &fields.monthly_trend {
            check_range(scope, period, *rating, 0.0, MAX_RATING)?;
        }
        for (service, stats) in &fields.service_breakdown {
            check_range(scope, service, stats.avg_rating, 0.0, MAX_RATING)?;
        }

        Ok(Self {
            overall_rating: fields.overall_rating,
            time_period: fields.time_period,
            total_responses: fields.total_responses,
            category_ratings: fields.category_ratings,
            monthly_trend: fields.monthly_trend,
            service_breakdown: fields.service_breakdown,
            comments: fields.comments,
        })
    }

    pub fn overall_rating(&self) -> f64 {
        self.overall_rating
    }

    pub fn time_period(&self) -> &str {
        &self.time_period
    }

    pub fn total_responses(&self) -> u32 {
        self.total_responses
    }

    pub fn category_ratings(&self) -> &IndexMap<String, f64> {
        &self.category_ratings
    }

    /// Monthly ratings in chronological (insertion) order.
    pub fn monthly_trend(&self) -> &IndexMap<String, f64> {
        &self.monthly_trend
    }

    pub fn service_breakdown(&self) -> &IndexMap<String, ServiceStats> {
        &self.service_breakdown
    }

    pub fn comments(&self) -> &[SurveyComment] {
        &self.comments
    }
}

/// Which part of the dataset a question is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataScope {
    Satisfaction,
    Performance,
    Combined,
}

impl fmt::Display for DataScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataScope::Satisfaction => write!(f, "satisfaction"),
            DataScope::Performance => write!(f, "performance"),
            DataScope::Combined => write!(f, "combined"),
        }
    }
}

impl DataScope {
    pub fn includes_performance(self) -> bool {
        matches!(self, DataScope::Performance | DataScope::Combined)
    }

    pub fn includes_satisfaction(self) -> bool {
        matches!(self, DataScope::Satisfaction | DataScope::Combined)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Replace snake_case separators with spaces for display.
pub fn humanize(key: &str) -> String {
    key.replace('_', " ")
}

fn check_range(id: &str, field: &str, value: f64, min: f64, max: f64) -> Result<(), AnalysisError> {
    if !value.is_finite() || value < min || value > max {
        return Err(invalid(
            id,
            &format!("{} = {} is outside [{}, {}]", field, value, min, max),
        ));
    }
    Ok(())
}

fn invalid(id: &str, reason: &str) -> AnalysisError {
    AnalysisError::InvalidRecord {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn record(id: &str, satisfaction: f64, duration_minutes: i64) -> PerformanceRecord {
        PerformanceRecord::new(RecordFields {
            id: id.to_string(),
            name: format!("Dr. {}", id),
            role: "Dentist".to_string(),
            satisfaction,
            duration_minutes,
            appointments_per_day: 8.0,
            success_rate_pct: 95.0,
            retention_pct: 90.0,
            specialties: vec!["General Dentistry".to_string()],
            comments: vec![],
        })
        .unwrap()
    }

    pub fn snapshot(trend: &[(&str, f64)]) -> SatisfactionSnapshot {
        let mut fields = SnapshotFields {
            overall_rating: 4.2,
            time_period: "March 2025".to_string(),
            total_responses: 156,
            ..Default::default()
        };
        fields.category_ratings.insert("staff_friendliness".to_string(), 4.8);
        fields.category_ratings.insert("wait_times".to_string(), 3.6);
        fields.category_ratings.insert("value_for_money".to_string(), 3.9);
        for (period, value) in trend {
            fields.monthly_trend.insert(period.to_string(), *value);
        }
        fields.service_breakdown.insert(
            "routine_checkup".to_string(),
            ServiceStats { count: 78, avg_rating: 4.4 },
        );
        fields.service_breakdown.insert(
            "root_canal".to_string(),
            ServiceStats { count: 12, avg_rating: 3.8 },
        );
        fields.service_breakdown.insert(
            "cosmetic_procedures".to_string(),
            ServiceStats { count: 15, avg_rating: 4.6 },
        );
        fields.comments = vec![
            SurveyComment::new(5, "Excellent care".to_string(), "2025-03-15").unwrap(),
            SurveyComment::new(3, "Prices went up".to_string(), "2025-03-05").unwrap(),
            SurveyComment::new(2, "Waited 45 minutes".to_string(), "2025-03-18").unwrap(),
            SurveyComment::new(4, "Good but late".to_string(), "2025-03-10").unwrap(),
        ];
        SatisfactionSnapshot::new(fields).unwrap()
    }
}
