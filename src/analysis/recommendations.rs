//! Actionable recommendations derived from an analysis.

use super::PracticeAnalysis;
use crate::models::{humanize, DataScope};
use serde::Serialize;
use std::fmt;

/// Categories rated below this are called out as a value-perception problem.
const VALUE_FOR_MONEY_FLOOR: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Scheduling,
    Mentoring,
    Efficiency,
    Specialization,
    Operational,
    Pricing,
    PromoteService,
    Training,
}

impl RecommendationKind {
    pub fn scope(self) -> DataScope {
        match self {
            RecommendationKind::Scheduling
            | RecommendationKind::Mentoring
            | RecommendationKind::Efficiency
            | RecommendationKind::Specialization => DataScope::Performance,
            RecommendationKind::Operational
            | RecommendationKind::Pricing
            | RecommendationKind::PromoteService
            | RecommendationKind::Training => DataScope::Satisfaction,
        }
    }
}

impl fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecommendationKind::Scheduling => "scheduling",
            RecommendationKind::Mentoring => "mentoring",
            RecommendationKind::Efficiency => "efficiency",
            RecommendationKind::Specialization => "specialization",
            RecommendationKind::Operational => "operational",
            RecommendationKind::Pricing => "pricing",
            RecommendationKind::PromoteService => "promote_service",
            RecommendationKind::Training => "training",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub title: String,
    pub description: String,
}

impl Recommendation {
    fn new(kind: RecommendationKind, title: impl Into<String>, description: String) -> Self {
        Self {
            kind,
            title: title.into(),
            description,
        }
    }
}

/// Recommendations supported by the analysis, performance first.
pub fn recommend(analysis: &PracticeAnalysis<'_>) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if let Some(slot) = &analysis.best_time_slot {
        out.push(Recommendation::new(
            RecommendationKind::Scheduling,
            "Optimize Appointment Scheduling",
            format!(
                "Schedule complex procedures during {} hours, when satisfaction is highest ({:.1}/5.0).",
                humanize(&slot.key),
                slot.value
            ),
        ));
    }

    let top = analysis.rankings.by_satisfaction.first();
    if let (Some(top), Some(worst)) = (top, analysis.rankings.below_threshold.first()) {
        if top.id() != worst.id() {
            out.push(Recommendation::new(
                RecommendationKind::Mentoring,
                "Implement Mentoring Program",
                format!(
                    "Pair {} ({:.1}/5.0) with {} ({:.1}/5.0) to improve patient satisfaction.",
                    worst.name(),
                    worst.satisfaction(),
                    top.name(),
                    top.satisfaction()
                ),
            ));
        }
    }

    let efficiency = &analysis.rankings.efficiency;
    if efficiency.ranked.len() > 1 {
        if let Some(least) = efficiency.least_efficient() {
            out.push(Recommendation::new(
                RecommendationKind::Efficiency,
                "Improve Appointment Efficiency",
                format!(
                    "Help {} reduce {} minute appointments (efficiency score {:.2}) while maintaining quality of care.",
                    least.record.name(),
                    least.record.duration_minutes(),
                    least.score
                ),
            ));
        }
    }

    if let Some(procedure) = &analysis.best_procedure {
        out.push(Recommendation::new(
            RecommendationKind::Specialization,
            "Leverage Procedural Strengths",
            format!(
                "Assign more {} procedures ({:.1}/5.0) to the specialists rated highest for them.",
                humanize(&procedure.key),
                procedure.value
            ),
        ));
    }

    if let Some(worst) = analysis.worst_category.as_ref().filter(|c| c.key.contains("wait")) {
        out.push(Recommendation::new(
            RecommendationKind::Operational,
            "Reduce Wait Times",
            format!(
                "{} is rated {:.1}/5.0; add buffer time between appointments and notify patients of delays.",
                humanize(&worst.key),
                worst.value
            ),
        ));
    }

    if let Some(value) = analysis
        .category_ratings
        .and_then(|c| c.get("value_for_money"))
        .filter(|v| **v < VALUE_FOR_MONEY_FLOOR)
    {
        out.push(Recommendation::new(
            RecommendationKind::Pricing,
            "Improve Value Perception",
            format!(
                "Value for money is rated {:.1}/5.0; explain the technology and long-term benefits behind pricing.",
                value
            ),
        ));
    }

    if let Some(services) = &analysis.services {
        if let Some(best) = services.highest_rated() {
            out.push(Recommendation::new(
                RecommendationKind::PromoteService,
                format!("Promote {}", humanize(&best.service)),
                format!(
                    "Leverage high satisfaction with {} ({:.1}/5.0) in patient communications.",
                    humanize(&best.service),
                    best.avg_rating
                ),
            ));
        }
        if let (Some(best), Some(worst)) = (services.highest_rated(), services.lowest_rated()) {
            if best.service != worst.service {
                out.push(Recommendation::new(
                    RecommendationKind::Training,
                    format!("Improve {} Experience", humanize(&worst.service)),
                    format!(
                        "{} is the lowest rated service ({:.1}/5.0); consider additional training and better pre/post procedure communication.",
                        humanize(&worst.service),
                        worst.avg_rating
                    ),
                ));
            }
        }
    }

    out
}
