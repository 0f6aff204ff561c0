//! Prompt assembly for the text-generation service.
//!
//! [`PromptContext::assemble`] gathers everything a question needs (analysis,
//! insights, recommendations, mentioned agents, conversation so far) and
//! [`build`] serializes it into a single deterministic text block.

pub mod builder;
pub mod templates;

pub use builder::build;
pub use templates::{Locale, Scaffolding};

use crate::analysis::{
    agent_profile, compose, recommend, AgentProfile, AnalysisSettings, Insight, PracticeAnalysis,
    Recommendation,
};
use crate::dataset::Dataset;
use crate::error::AnalysisError;
use crate::models::{ChatTurn, DataScope, PerformanceRecord, SatisfactionSnapshot};
use tracing::debug;

/// Word limit asked of the model unless configured otherwise.
pub const DEFAULT_MAX_WORDS: usize = 150;

const SATISFACTION_KEYWORDS: &[&str] = &[
    "satisfaction",
    "customer",
    "patient",
    "survey",
    "comment",
    "review",
    "service",
    "memnuniyet",
    "müşteri",
    "hasta",
    "anket",
    "yorum",
    "hizmet",
];

const PERFORMANCE_KEYWORDS: &[&str] = &[
    "agent",
    "performance",
    "staff",
    "dentist",
    "doctor",
    "hygienist",
    "efficien",
    "appointment",
    "performans",
    "personel",
    "hekim",
    "doktor",
    "temsilci",
    "verimli",
    "randevu",
];

/// The data handed to the text-generation collaborator for one question.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub scope: DataScope,
    pub analysis: PracticeAnalysis<'a>,
    /// Agent records, when the question is in performance scope.
    pub agents: Option<&'a [PerformanceRecord]>,
    /// Survey snapshot, when the question is in satisfaction scope.
    pub satisfaction: Option<&'a SatisfactionSnapshot>,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
    /// Agents the question mentions by id or name.
    pub profiles: Vec<AgentProfile<'a>>,
    pub history: Vec<ChatTurn>,
    pub max_words: usize,
}

impl<'a> PromptContext<'a> {
    pub fn assemble(
        dataset: &'a Dataset,
        query: &str,
        settings: &AnalysisSettings,
        history: &[ChatTurn],
    ) -> Result<Self, AnalysisError> {
        let analysis = PracticeAnalysis::run(dataset, settings)?;

        let profiles: Vec<AgentProfile<'a>> = mentioned_agents(&dataset.agents, query)
            .into_iter()
            .filter_map(|id| agent_profile(&dataset.agents, id))
            .collect();

        let mut scope = if settings.scope_by_query {
            route_query(query)
        } else {
            DataScope::Combined
        };
        if !profiles.is_empty() && !scope.includes_performance() {
            scope = DataScope::Combined;
        }

        let in_scope = |s: DataScope| scope == DataScope::Combined || s == scope;
        let insights = compose(&analysis)
            .into_iter()
            .filter(|i| in_scope(i.kind.scope()))
            .collect();
        let recommendations = recommend(&analysis)
            .into_iter()
            .filter(|r| in_scope(r.kind.scope()))
            .collect();

        debug!(
            "Prompt context: scope {}, {} profiles, {} history turns",
            scope,
            profiles.len(),
            history.len()
        );

        Ok(Self {
            scope,
            agents: scope
                .includes_performance()
                .then_some(dataset.agents.as_slice()),
            satisfaction: dataset
                .satisfaction
                .as_ref()
                .filter(|_| scope.includes_satisfaction()),
            analysis,
            insights,
            recommendations,
            profiles,
            history: history.to_vec(),
            max_words: DEFAULT_MAX_WORDS,
        })
    }

    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = max_words;
        self
    }
}

/// Pick the part of the dataset a question is about by keyword.
pub fn route_query(query: &str) -> DataScope {
    let query = query.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| query.contains(k));

    match (mentions(SATISFACTION_KEYWORDS), mentions(PERFORMANCE_KEYWORDS)) {
        (true, false) => DataScope::Satisfaction,
        (false, true) => DataScope::Performance,
        _ => DataScope::Combined,
    }
}

/// Ids of agents referenced in the query by id, full name or surname,
/// in dataset order.
fn mentioned_agents<'r>(agents: &'r [PerformanceRecord], query: &str) -> Vec<&'r str> {
    let query = query.to_lowercase();
    let words: Vec<&str> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    agents
        .iter()
        .filter(|agent| {
            let id = agent.id().to_lowercase();
            let name = agent.name().to_lowercase();
            let surname = name.split_whitespace().last().unwrap_or_default();

            words.contains(&id.as_str())
                || (!name.is_empty() && query.contains(&name))
                || (surname.chars().count() >= 3 && words.contains(&surname))
        })
        .map(|agent| agent.id())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::insights::InsightKind;

    fn context<'a>(dataset: &'a Dataset, query: &str) -> PromptContext<'a> {
        PromptContext::assemble(dataset, query, &AnalysisSettings::default(), &[]).unwrap()
    }

    #[test]
    fn test_route_query() {
        assert_eq!(
            route_query("How is customer satisfaction trending?"),
            DataScope::Satisfaction
        );
        assert_eq!(route_query("Which agent performs best?"), DataScope::Performance);
        assert_eq!(route_query("Give me an overview"), DataScope::Combined);
        assert_eq!(
            route_query("Compare staff performance with patient satisfaction"),
            DataScope::Combined
        );
        assert_eq!(route_query("Hasta memnuniyeti nasıl?"), DataScope::Satisfaction);
        assert_eq!(route_query("En iyi hekim kim?"), DataScope::Performance);
    }

    #[test]
    fn test_scope_filters_sections() {
        let dataset = Dataset::sample().unwrap();

        let ctx = context(&dataset, "How is customer satisfaction trending?");
        assert_eq!(ctx.scope, DataScope::Satisfaction);
        assert!(ctx.agents.is_none());
        assert!(ctx.satisfaction.is_some());
        assert!(ctx
            .insights
            .iter()
            .all(|i| i.kind.scope() == DataScope::Satisfaction));

        let ctx = context(&dataset, "Which agent is most efficient?");
        assert!(ctx.agents.is_some());
        assert!(ctx.satisfaction.is_none());
        assert_eq!(ctx.insights[0].kind, InsightKind::TopPerformer);
    }

    #[test]
    fn test_scope_by_query_disabled() {
        let dataset = Dataset::sample().unwrap();
        let settings = AnalysisSettings {
            scope_by_query: false,
            ..Default::default()
        };
        let ctx =
            PromptContext::assemble(&dataset, "customer satisfaction?", &settings, &[]).unwrap();
        assert_eq!(ctx.scope, DataScope::Combined);
        assert!(ctx.agents.is_some());
    }

    #[test]
    fn test_unrelated_query_attaches_no_profiles() {
        let dataset = Dataset::sample().unwrap();
        let ctx = context(&dataset, "How is customer satisfaction trending?");
        assert!(ctx.profiles.is_empty());
        assert_eq!(ctx.scope, DataScope::Satisfaction);

        let agents = vec![
            crate::models::fixtures::record("A001", 4.9, 40),
            crate::models::fixtures::record("A002", 4.1, 40),
        ];
        assert!(mentioned_agents(&agents, "How are wait times?").is_empty());
        assert_eq!(mentioned_agents(&agents, "and a002?"), vec!["A002"]);
    }

    #[test]
    fn test_mentioned_agents_by_id_and_surname() {
        let dataset = Dataset::sample().unwrap();

        let ctx = context(&dataset, "How does a004 compare?");
        let ids: Vec<_> = ctx.profiles.iter().map(|p| p.record.id()).collect();
        assert_eq!(ids, vec!["A004"]);

        let ctx = context(&dataset, "What do patients say about Dr. Johnson and Chen?");
        let ids: Vec<_> = ctx.profiles.iter().map(|p| p.record.id()).collect();
        assert_eq!(ids, vec!["A001", "A002"]);
        assert_eq!(ctx.scope, DataScope::Combined);
    }
}
