//! Insight composition.
//!
//! Turns a [`PracticeAnalysis`] into display-ready insights. Every number
//! quoted in an insight's text is also stored in its `supporting_facts`, and
//! both come from values the aggregator already computed.

use super::PracticeAnalysis;
use crate::models::{humanize, DataScope};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

/// Insight kinds, in display priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    TopPerformer,
    Efficiency,
    Trend,
    ServiceStrength,
    Improvement,
    Weakness,
    CategoryStrength,
    BestTimeSlot,
    Sentiment,
}

impl InsightKind {
    /// Which part of the dataset the insight is drawn from.
    pub fn scope(self) -> DataScope {
        match self {
            InsightKind::TopPerformer
            | InsightKind::Efficiency
            | InsightKind::Improvement
            | InsightKind::BestTimeSlot => DataScope::Performance,
            InsightKind::Trend
            | InsightKind::ServiceStrength
            | InsightKind::Weakness
            | InsightKind::CategoryStrength
            | InsightKind::Sentiment => DataScope::Satisfaction,
        }
    }
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InsightKind::TopPerformer => "top_performer",
            InsightKind::Efficiency => "efficiency",
            InsightKind::Trend => "trend",
            InsightKind::ServiceStrength => "service_strength",
            InsightKind::Improvement => "improvement",
            InsightKind::Weakness => "weakness",
            InsightKind::CategoryStrength => "category_strength",
            InsightKind::BestTimeSlot => "best_time_slot",
            InsightKind::Sentiment => "sentiment",
        };
        write!(f, "{}", name)
    }
}

/// A derived, human-readable fact with the data it was built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub summary_text: String,
    pub supporting_facts: IndexMap<String, Value>,
}

impl Insight {
    fn new(kind: InsightKind, title: &str, summary_text: String) -> Self {
        Self {
            kind,
            title: title.to_string(),
            summary_text,
            supporting_facts: IndexMap::new(),
        }
    }

    fn fact(mut self, key: &str, value: Value) -> Self {
        self.supporting_facts.insert(key.to_string(), value);
        self
    }
}

/// Compose all insights the analysis supports, in [`InsightKind`] order.
/// Kinds whose inputs are missing are omitted.
pub fn compose(analysis: &PracticeAnalysis<'_>) -> Vec<Insight> {
    [
        top_performer(analysis),
        efficiency(analysis),
        trend(analysis),
        service_strength(analysis),
        improvement(analysis),
        weakness(analysis),
        category_strength(analysis),
        best_time_slot(analysis),
        sentiment(analysis),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn top_performer(analysis: &PracticeAnalysis<'_>) -> Option<Insight> {
    let top = analysis.rankings.by_satisfaction.first()?;

    let mut text = format!(
        "{} has the highest satisfaction rating at {:.1}/5.0 with a {:.1}% treatment success rate.",
        top.name(),
        top.satisfaction(),
        top.success_rate_pct()
    );
    if !top.specialties().is_empty() {
        text.push_str(&format!(" Specialties: {}.", top.specialties().join(", ")));
    }

    Some(
        Insight::new(InsightKind::TopPerformer, "Top Performer", text)
            .fact("id", json!(top.id()))
            .fact("name", json!(top.name()))
            .fact("satisfaction", json!(top.satisfaction()))
            .fact("success_rate_pct", json!(top.success_rate_pct()))
            .fact("specialties", json!(top.specialties())),
    )
}

fn efficiency(analysis: &PracticeAnalysis<'_>) -> Option<Insight> {
    let ranking = &analysis.rankings.efficiency;
    let best = ranking.most_efficient()?;
    let record = best.record;

    let flagged: Vec<&str> = ranking.flagged.iter().map(|r| r.id()).collect();

    Some(
        Insight::new(
            InsightKind::Efficiency,
            "Most Efficient",
            format!(
                "{} achieves a {:.1}/5.0 rating with {} minute appointments (efficiency score {:.2}), handling {} appointments per day.",
                record.name(),
                record.satisfaction(),
                record.duration_minutes(),
                best.score,
                record.appointments_per_day()
            ),
        )
        .fact("id", json!(record.id()))
        .fact("name", json!(record.name()))
        .fact("satisfaction", json!(record.satisfaction()))
        .fact("duration_minutes", json!(record.duration_minutes()))
        .fact("efficiency_score", json!(best.score))
        .fact("appointments_per_day", json!(record.appointments_per_day()))
        .fact("excluded_ids", json!(flagged)),
    )
}

fn trend(analysis: &PracticeAnalysis<'_>) -> Option<Insight> {
    let recent = analysis.recent_trend.as_ref()?;

    let text = match recent.percentage_change {
        Some(pct) => {
            let verb = match recent.direction {
                super::TrendDirection::Up => "increased",
                super::TrendDirection::Down => "decreased",
                super::TrendDirection::Stable => "held steady, changing",
            };
            format!(
                "Overall satisfaction {} by {:.1}% from {} to {} (now {:.1}/5.0).",
                verb,
                pct.abs(),
                recent.previous_period,
                recent.current_period,
                recent.current_value
            )
        }
        None => format!(
            "Overall satisfaction moved from {:.1} in {} to {:.1} in {}; the percentage change is undefined against a zero baseline.",
            recent.previous_value, recent.previous_period, recent.current_value, recent.current_period
        ),
    };

    let mut insight = Insight::new(InsightKind::Trend, "Satisfaction Trend", text)
        .fact("previous_period", json!(recent.previous_period))
        .fact("current_period", json!(recent.current_period))
        .fact("previous_value", json!(recent.previous_value))
        .fact("current_value", json!(recent.current_value))
        .fact("change", json!(recent.change))
        .fact("percentage_change", json!(recent.percentage_change))
        .fact("direction", json!(recent.direction));
    if let Some(responses) = analysis.total_responses {
        insight = insight.fact("total_responses", json!(responses));
    }
    Some(insight)
}

fn service_strength(analysis: &PracticeAnalysis<'_>) -> Option<Insight> {
    let services = analysis.services.as_ref()?;
    let best = services.highest_rated()?;

    let mut insight = Insight::new(
        InsightKind::ServiceStrength,
        "Service Performance",
        String::new(),
    )
    .fact("service", json!(best.service))
    .fact("avg_rating", json!(best.avg_rating))
    .fact("count", json!(best.count));

    let mut text = format!(
        "{} has the highest service rating ({:.1}/5.0).",
        humanize(&best.service),
        best.avg_rating
    );
    if let Some(popular) = services.most_popular() {
        text.push_str(&format!(
            " {} is the most common service with {} visits.",
            humanize(&popular.service),
            popular.count
        ));
        insight = insight
            .fact("most_popular_service", json!(popular.service))
            .fact("most_popular_count", json!(popular.count));
    }

    insight.summary_text = text;
    Some(insight)
}

fn improvement(analysis: &PracticeAnalysis<'_>) -> Option<Insight> {
    let below = &analysis.rankings.below_threshold;
    let worst = below.first()?;

    let mut text = format!(
        "{} team member(s) have satisfaction ratings below {:.1}/5.0; {} is lowest at {:.1}.",
        below.len(),
        analysis.improvement_threshold,
        worst.name(),
        worst.satisfaction()
    );

    let ids: Vec<&str> = below.iter().map(|r| r.id()).collect();
    let mut insight = Insight::new(InsightKind::Improvement, "Areas for Improvement", String::new())
        .fact("threshold", json!(analysis.improvement_threshold))
        .fact("count", json!(below.len()))
        .fact("ids", json!(ids))
        .fact("lowest_id", json!(worst.id()))
        .fact("lowest_satisfaction", json!(worst.satisfaction()));

    if let Some(mentor) = analysis
        .rankings
        .by_satisfaction
        .first()
        .filter(|m| m.id() != worst.id())
    {
        text.push_str(&format!(
            " {} could benefit from mentoring by {}.",
            worst.name(),
            mentor.name()
        ));
        insight = insight.fact("mentor_id", json!(mentor.id()));
    }

    insight.summary_text = text;
    Some(insight)
}

fn weakness(analysis: &PracticeAnalysis<'_>) -> Option<Insight> {
    let worst = analysis.worst_category.as_ref()?;
    Some(
        Insight::new(
            InsightKind::Weakness,
            "Improvement Opportunity",
            format!(
                "{} is the lowest rated aspect at {:.1}/5.0.",
                humanize(&worst.key),
                worst.value
            ),
        )
        .fact("category", json!(worst.key))
        .fact("rating", json!(worst.value)),
    )
}

fn category_strength(analysis: &PracticeAnalysis<'_>) -> Option<Insight> {
    let best = analysis.best_category.as_ref()?;
    Some(
        Insight::new(
            InsightKind::CategoryStrength,
            "Key Strength",
            format!(
                "{} is the highest rated aspect at {:.1}/5.0.",
                humanize(&best.key),
                best.value
            ),
        )
        .fact("category", json!(best.key))
        .fact("rating", json!(best.value)),
    )
}

fn best_time_slot(analysis: &PracticeAnalysis<'_>) -> Option<Insight> {
    let best = analysis.best_time_slot.as_ref()?;
    Some(
        Insight::new(
            InsightKind::BestTimeSlot,
            "Optimal Appointment Time",
            format!(
                "{} appointments have the highest satisfaction ({:.1}/5.0).",
                capitalize(&humanize(&best.key)),
                best.value
            ),
        )
        .fact("time_slot", json!(best.key))
        .fact("average_satisfaction", json!(best.value)),
    )
}

fn sentiment(analysis: &PracticeAnalysis<'_>) -> Option<Insight> {
    let breakdown = analysis.sentiment.as_ref().filter(|b| b.total > 0)?;
    Some(
        Insight::new(
            InsightKind::Sentiment,
            "Customer Sentiment",
            format!(
                "{:.1}% of {} comments are positive, {:.1}% neutral and {:.1}% negative.",
                breakdown.positive_pct(),
                breakdown.total,
                breakdown.neutral_pct(),
                breakdown.negative_pct()
            ),
        )
        .fact("total_comments", json!(breakdown.total))
        .fact("positive_pct", json!(breakdown.positive_pct()))
        .fact("neutral_pct", json!(breakdown.neutral_pct()))
        .fact("negative_pct", json!(breakdown.negative_pct())),
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisSettings, PracticeAnalysis};
    use crate::dataset::Dataset;
    use crate::models::fixtures::record;

    fn kinds(insights: &[Insight]) -> Vec<InsightKind> {
        insights.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_compose_sample_order() {
        let dataset = Dataset::sample().unwrap();
        let analysis = PracticeAnalysis::run(&dataset, &AnalysisSettings::default()).unwrap();
        let insights = compose(&analysis);

        assert_eq!(
            kinds(&insights),
            vec![
                InsightKind::TopPerformer,
                InsightKind::Efficiency,
                InsightKind::Trend,
                InsightKind::ServiceStrength,
                InsightKind::Improvement,
                InsightKind::Weakness,
                InsightKind::CategoryStrength,
                InsightKind::BestTimeSlot,
                InsightKind::Sentiment,
            ]
        );
        let ordered = insights.windows(2).all(|w| w[0].kind < w[1].kind);
        assert!(ordered);
    }

    #[test]
    fn test_compose_empty_dataset_omits_agent_kinds() {
        let dataset = Dataset {
            agents: vec![],
            satisfaction: None,
            time_slots: Default::default(),
            procedures: Default::default(),
        };
        let analysis = PracticeAnalysis::run(&dataset, &AnalysisSettings::default()).unwrap();
        assert!(analysis.summary.is_empty());

        let insights = compose(&analysis);
        assert!(insights.is_empty());
    }

    #[test]
    fn test_compose_satisfaction_only() {
        let mut dataset = Dataset::sample().unwrap();
        dataset.agents.clear();
        let analysis = PracticeAnalysis::run(&dataset, &AnalysisSettings::default()).unwrap();
        let insights = compose(&analysis);

        assert!(!kinds(&insights).contains(&InsightKind::TopPerformer));
        assert!(!kinds(&insights).contains(&InsightKind::Efficiency));
        assert!(!kinds(&insights).contains(&InsightKind::Improvement));
        assert_eq!(insights[0].kind, InsightKind::Trend);
    }

    #[test]
    fn test_improvement_omitted_when_nobody_below() {
        let mut dataset = Dataset::sample().unwrap();
        dataset.agents = vec![record("A001", 4.9, 42), record("A002", 4.8, 40)];
        let analysis = PracticeAnalysis::run(&dataset, &AnalysisSettings::default()).unwrap();
        assert!(!kinds(&compose(&analysis)).contains(&InsightKind::Improvement));
    }

    #[test]
    fn test_efficiency_insight_skips_zero_duration() {
        let mut dataset = Dataset::sample().unwrap();
        dataset.agents = vec![record("A001", 4.9, 0), record("A002", 4.8, 40)];
        let analysis = PracticeAnalysis::run(&dataset, &AnalysisSettings::default()).unwrap();
        let insights = compose(&analysis);
        let efficiency = insights
            .iter()
            .find(|i| i.kind == InsightKind::Efficiency)
            .unwrap();
        assert_eq!(efficiency.supporting_facts["id"], json!("A002"));
        assert_eq!(efficiency.supporting_facts["excluded_ids"], json!(["A001"]));
    }

    #[test]
    fn test_numbers_trace_to_facts() {
        let dataset = Dataset::sample().unwrap();
        let analysis = PracticeAnalysis::run(&dataset, &AnalysisSettings::default()).unwrap();
        let insights = compose(&analysis);

        let top = &insights[0];
        assert_eq!(top.supporting_facts["satisfaction"], json!(4.9));
        assert!(top.summary_text.contains("4.9/5.0"));
        assert!(top.summary_text.contains("Dr. Sarah Johnson"));

        let weakness = insights
            .iter()
            .find(|i| i.kind == InsightKind::Weakness)
            .unwrap();
        assert_eq!(weakness.supporting_facts["rating"], json!(3.6));
        assert!(weakness.summary_text.contains("wait times"));
    }

    #[test]
    fn test_trend_insight_zero_baseline() {
        let mut dataset = Dataset::sample().unwrap();
        dataset.satisfaction = Some(crate::models::fixtures::snapshot(&[("A", 0.0), ("B", 5.0)]));
        let analysis = PracticeAnalysis::run(&dataset, &AnalysisSettings::default()).unwrap();
        let insights = compose(&analysis);
        let trend = insights.iter().find(|i| i.kind == InsightKind::Trend).unwrap();
        assert!(trend.summary_text.contains("undefined"));
        assert_eq!(trend.supporting_facts["percentage_change"], Value::Null);
    }

    #[test]
    fn test_kind_scopes() {
        assert_eq!(InsightKind::TopPerformer.scope(), DataScope::Performance);
        assert_eq!(InsightKind::Sentiment.scope(), DataScope::Satisfaction);
    }
}
