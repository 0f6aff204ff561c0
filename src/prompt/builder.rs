//! Prompt text generation.
//!
//! The output is a pure function of its inputs: maps are walked in insertion
//! order and nothing time-dependent is written.

use super::templates::{Locale, Scaffolding};
use super::PromptContext;
use crate::analysis::{AgentProfile, Insight, PracticeAnalysis, Recommendation};
use crate::models::{ChatTurn, PerformanceRecord, SatisfactionSnapshot};

/// Build the complete prompt for one question.
pub fn build(user_message: &str, context: &PromptContext<'_>, locale: Locale) -> String {
    let text = Scaffolding::for_locale(locale);
    let mut prompt = String::new();

    prompt.push_str(&generate_preamble(text));
    prompt.push_str(&generate_data_section(context, text));
    prompt.push_str(&generate_format_section(context.max_words, text));

    prompt.push_str(text.question_header);
    prompt.push('\n');
    prompt.push_str(user_message.trim());
    prompt.push('\n');

    prompt
}

fn generate_preamble(text: &Scaffolding) -> String {
    let mut section = String::new();

    section.push_str(text.role);
    section.push('\n');
    for instruction in text.instructions {
        section.push_str(&format!("- {}\n", instruction));
    }
    section.push('\n');

    section
}

fn generate_data_section(context: &PromptContext<'_>, text: &Scaffolding) -> String {
    let mut section = String::new();

    section.push_str(text.data_header);
    section.push('\n');
    section.push_str(&format!("{}: {}\n\n", text.scope_label, context.scope));

    if let Some(agents) = context.agents {
        section.push_str(&generate_performance_section(agents, &context.analysis, text));
    }
    if let Some(snapshot) = context.satisfaction {
        section.push_str(&generate_satisfaction_section(snapshot, &context.analysis, text));
    }
    if !context.profiles.is_empty() {
        section.push_str(&generate_profiles_section(
            &context.profiles,
            context.analysis.summary.record_count,
            text,
        ));
    }
    if !context.insights.is_empty() {
        section.push_str(&generate_insights_section(&context.insights, text));
    }
    if !context.recommendations.is_empty() {
        section.push_str(&generate_recommendations_section(
            &context.recommendations,
            text,
        ));
    }
    if !context.history.is_empty() {
        section.push_str(&generate_history_section(&context.history, text));
    }

    section
}

fn generate_performance_section(
    agents: &[PerformanceRecord],
    analysis: &PracticeAnalysis<'_>,
    text: &Scaffolding,
) -> String {
    let mut section = String::new();
    let summary = &analysis.summary;

    section.push_str(text.summary_header);
    section.push('\n');
    section.push_str(&format!("record_count: {}\n", summary.record_count));
    section.push_str(&format!(
        "average_satisfaction: {:.2}\n",
        summary.average_satisfaction
    ));
    section.push_str(&format!(
        "average_duration_minutes: {:.2}\n",
        summary.average_duration_minutes
    ));
    section.push_str(&format!(
        "average_appointments_per_day: {:.2}\n",
        summary.average_appointments_per_day
    ));
    section.push_str(&format!(
        "average_success_rate_pct: {:.2}\n",
        summary.average_success_rate
    ));
    section.push_str(&format!(
        "average_retention_pct: {:.2}\n\n",
        summary.average_retention
    ));

    section.push_str(text.records_header);
    section.push('\n');
    if agents.is_empty() {
        section.push_str(text.no_records);
        section.push('\n');
    }
    for agent in agents {
        section.push_str(&record_line(agent));
        for comment in agent.comments() {
            section.push_str(&format!("  comment: \"{}\"\n", comment));
        }
    }
    section.push('\n');

    if agents.is_empty() {
        return section;
    }

    let rankings = &analysis.rankings;
    section.push_str(text.rankings_header);
    section.push('\n');
    section.push_str(&format!(
        "satisfaction_ranking: {}\n",
        ranked_list(&rankings.by_satisfaction, |r| r.satisfaction())
    ));
    section.push_str(&format!(
        "success_rate_top_{}: {}\n",
        analysis.top_limit,
        ranked_list(&rankings.by_success_rate, |r| r.success_rate_pct())
    ));
    section.push_str(&format!(
        "improvement_threshold: {}\n",
        analysis.improvement_threshold
    ));
    section.push_str(&format!(
        "below_threshold: {}\n\n",
        ranked_list(&rankings.below_threshold, |r| r.satisfaction())
    ));

    section.push_str(text.efficiency_header);
    section.push('\n');
    for (i, scored) in rankings.efficiency.ranked.iter().enumerate() {
        section.push_str(&format!(
            "{}. {} {}: efficiency_score={:.2}\n",
            i + 1,
            scored.record.id(),
            scored.record.name(),
            scored.score
        ));
    }
    if !rankings.efficiency.flagged.is_empty() {
        let flagged: Vec<String> = rankings
            .efficiency
            .flagged
            .iter()
            .map(|r| format!("{} {}", r.id(), r.name()))
            .collect();
        section.push_str(&format!(
            "{}: {}\n",
            text.efficiency_excluded,
            flagged.join(", ")
        ));
    }
    section.push('\n');

    if !analysis.time_slots.is_empty() || !analysis.procedures.is_empty() {
        section.push_str(text.schedule_header);
        section.push('\n');
        for (slot, stats) in analysis.time_slots {
            section.push_str(&format!(
                "time_slot.{}: average_satisfaction={}, appointments={}\n",
                slot, stats.average_satisfaction, stats.appointments
            ));
        }
        for (procedure, stats) in analysis.procedures {
            section.push_str(&format!(
                "procedure.{}: average_satisfaction={}, count={}\n",
                procedure, stats.average_satisfaction, stats.count
            ));
        }
        section.push('\n');
    }

    section
}

fn record_line(record: &PerformanceRecord) -> String {
    let specialties = if record.specialties().is_empty() {
        "-".to_string()
    } else {
        record.specialties().join(", ")
    };

    format!(
        "- id: {} | name: {} | role: {} | satisfaction: {} | duration_minutes: {} | appointments_per_day: {} | success_rate_pct: {} | retention_pct: {} | specialties: {}\n",
        record.id(),
        record.name(),
        record.role(),
        record.satisfaction(),
        record.duration_minutes(),
        record.appointments_per_day(),
        record.success_rate_pct(),
        record.retention_pct(),
        specialties
    )
}

fn ranked_list(
    records: &[&PerformanceRecord],
    value: impl Fn(&PerformanceRecord) -> f64,
) -> String {
    if records.is_empty() {
        return "-".to_string();
    }
    records
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {} {} ({})", i + 1, r.id(), r.name(), value(r)))
        .collect::<Vec<_>>()
        .join("; ")
}

fn generate_satisfaction_section(
    snapshot: &SatisfactionSnapshot,
    analysis: &PracticeAnalysis<'_>,
    text: &Scaffolding,
) -> String {
    let mut section = String::new();

    section.push_str(text.satisfaction_header);
    section.push('\n');
    section.push_str(&format!("time_period: {}\n", snapshot.time_period()));
    section.push_str(&format!("overall_rating: {}\n", snapshot.overall_rating()));
    section.push_str(&format!(
        "total_responses: {}\n\n",
        snapshot.total_responses()
    ));

    if !snapshot.category_ratings().is_empty() {
        section.push_str(text.categories_header);
        section.push('\n');
        for (category, rating) in snapshot.category_ratings() {
            section.push_str(&format!("{}: {}\n", category, rating));
        }
        section.push('\n');
    }

    if !snapshot.monthly_trend().is_empty() {
        section.push_str(text.trend_header);
        section.push('\n');
        for (period, value) in snapshot.monthly_trend() {
            let line = match analysis.trend_deltas.get(period) {
                None => format!("{}: {}\n", period, value),
                Some(Ok(delta)) => format!(
                    "{}: {} (absolute: {:+.2}, percentage: {:+.2}%)\n",
                    period, value, delta.absolute, delta.percentage
                ),
                Some(Err(_)) => format!("{}: {} ({})\n", period, value, text.undefined_delta),
            };
            section.push_str(&line);
        }
        section.push('\n');
    }

    if !snapshot.service_breakdown().is_empty() {
        section.push_str(text.services_header);
        section.push('\n');
        for (service, stats) in snapshot.service_breakdown() {
            section.push_str(&format!(
                "{}: count={}, average_rating={}\n",
                service, stats.count, stats.avg_rating
            ));
        }
        section.push('\n');
    }

    if !snapshot.comments().is_empty() {
        section.push_str(text.comments_header);
        section.push('\n');
        for comment in snapshot.comments() {
            section.push_str(&format!(
                "- rating: {} | date: {} | text: \"{}\"\n",
                comment.rating,
                comment.date.format("%Y-%m-%d"),
                comment.text
            ));
        }
        if let Some(sentiment) = &analysis.sentiment {
            section.push_str(&format!(
                "sentiment: positive={} ({:.1}%), neutral={} ({:.1}%), negative={} ({:.1}%)\n",
                sentiment.positive.len(),
                sentiment.positive_pct(),
                sentiment.neutral.len(),
                sentiment.neutral_pct(),
                sentiment.negative.len(),
                sentiment.negative_pct()
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_profiles_section(
    profiles: &[AgentProfile<'_>],
    record_count: usize,
    text: &Scaffolding,
) -> String {
    let mut section = String::new();

    section.push_str(text.profiles_header);
    section.push('\n');
    for profile in profiles {
        let delta = &profile.compared_to_average;
        let efficiency_rank = profile
            .efficiency_rank
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        let efficiency_score = profile
            .efficiency_score
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "-".to_string());

        section.push_str(&format!(
            "- id: {} | name: {} | satisfaction_rank: {}/{} | efficiency_rank: {} | efficiency_score: {}\n",
            profile.record.id(),
            profile.record.name(),
            profile.satisfaction_rank,
            record_count,
            efficiency_rank,
            efficiency_score
        ));
        section.push_str(&format!(
            "  satisfaction_vs_average: {:+.2} | duration_minutes_vs_average: {:+.2} | appointments_per_day_vs_average: {:+.2} | success_rate_pct_vs_average: {:+.2}\n",
            delta.satisfaction,
            delta.duration_minutes,
            delta.appointments_per_day,
            delta.success_rate
        ));
    }
    section.push('\n');

    section
}

fn generate_insights_section(insights: &[Insight], text: &Scaffolding) -> String {
    let mut section = String::new();

    section.push_str(text.insights_header);
    section.push('\n');
    for insight in insights {
        section.push_str(&format!(
            "- [{}] {}: {}\n",
            insight.kind, insight.title, insight.summary_text
        ));
        if !insight.supporting_facts.is_empty() {
            let facts: Vec<String> = insight
                .supporting_facts
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect();
            section.push_str(&format!("  facts: {}\n", facts.join(", ")));
        }
    }
    section.push('\n');

    section
}

fn generate_recommendations_section(
    recommendations: &[Recommendation],
    text: &Scaffolding,
) -> String {
    let mut section = String::new();

    section.push_str(text.recommendations_header);
    section.push('\n');
    for rec in recommendations {
        section.push_str(&format!(
            "- [{}] {}: {}\n",
            rec.kind, rec.title, rec.description
        ));
    }
    section.push('\n');

    section
}

fn generate_history_section(history: &[ChatTurn], text: &Scaffolding) -> String {
    let mut section = String::new();

    section.push_str(text.history_header);
    section.push('\n');
    for turn in history {
        section.push_str(&format!("{}: {}\n", turn.role, turn.content));
    }
    section.push('\n');

    section
}

fn generate_format_section(max_words: usize, text: &Scaffolding) -> String {
    let mut section = String::new();

    section.push_str(text.format_header);
    section.push('\n');
    section.push_str(&format!("1. {}\n", text.word_limit(max_words)));
    for (i, rule) in text.format_rules.iter().enumerate() {
        section.push_str(&format!("{}. {}\n", i + 2, rule));
    }
    section.push('\n');

    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisSettings;
    use crate::dataset::Dataset;
    use crate::models::fixtures::record;

    fn sample_prompt(query: &str, locale: Locale) -> String {
        let dataset = Dataset::sample().unwrap();
        let history = vec![
            ChatTurn::user("Who is the top performer?"),
            ChatTurn::assistant("Dr. Sarah Johnson, rated 4.9."),
        ];
        let context =
            PromptContext::assemble(&dataset, query, &AnalysisSettings::default(), &history)
                .unwrap();
        build(query, &context, locale)
    }

    #[test]
    fn test_build_contains_all_sections() {
        let prompt = sample_prompt("Give me an overview of the practice", Locale::En);
        let en = Scaffolding::for_locale(Locale::En);

        assert!(prompt.starts_with(en.role));
        for header in [
            en.data_header,
            en.summary_header,
            en.records_header,
            en.rankings_header,
            en.efficiency_header,
            en.satisfaction_header,
            en.trend_header,
            en.services_header,
            en.comments_header,
            en.insights_header,
            en.recommendations_header,
            en.history_header,
            en.format_header,
            en.question_header,
        ] {
            assert!(prompt.contains(header), "missing {}", header);
        }
        assert!(prompt.contains("Answer in at most 150 words."));
        assert!(prompt.ends_with("Give me an overview of the practice\n"));
    }

    #[test]
    fn test_build_serializes_every_record() {
        let prompt = sample_prompt("overview", Locale::En);

        for id in ["A001", "A002", "A003", "A004", "A005"] {
            assert!(prompt.contains(&format!("- id: {} |", id)));
        }
        assert!(prompt.contains("duration_minutes: 42"));
        assert!(prompt.contains("comment: \"Explains every step clearly\""));
        assert!(prompt.contains("staff_friendliness: "));
        assert!(prompt.contains("Nov_2024: 4 (absolute: +0.10, percentage: +2.56%)"));
        assert!(prompt.contains("Oct_2024: 3.9\n"));
        assert!(prompt.contains("time_slot.morning: average_satisfaction=4.7"));
        assert!(prompt.contains("user: Who is the top performer?"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let first = sample_prompt("How are we doing?", Locale::Tr);
        let second = sample_prompt("How are we doing?", Locale::Tr);
        assert_eq!(first, second);
    }

    #[test]
    fn test_turkish_prompt_has_no_english_scaffolding() {
        let prompt = sample_prompt("Klinik genel olarak nasıl?", Locale::Tr);

        for phrase in Scaffolding::for_locale(Locale::En).phrases() {
            assert!(!prompt.contains(phrase), "english phrase leaked: {}", phrase);
        }
        assert!(!prompt.contains("Answer in at most"));
        assert!(prompt.contains("En fazla 150 kelimeyle yanıt ver."));
    }

    #[test]
    fn test_locales_share_data_lines() {
        let en = sample_prompt("overview", Locale::En);
        let tr = sample_prompt("overview", Locale::Tr);

        let data_lines = |prompt: &str| -> Vec<String> {
            prompt
                .lines()
                .filter(|l| l.starts_with("- id: ") || l.contains("average_satisfaction"))
                .map(str::to_string)
                .collect()
        };
        assert!(!data_lines(&en).is_empty());
        assert_eq!(data_lines(&en), data_lines(&tr));
    }

    #[test]
    fn test_build_scoped_to_satisfaction() {
        let prompt = sample_prompt("What do patients say in the survey?", Locale::En);
        let en = Scaffolding::for_locale(Locale::En);

        assert!(prompt.contains(en.satisfaction_header));
        assert!(!prompt.contains(en.records_header));
        assert!(!prompt.contains("- id: A001 |"));
    }

    #[test]
    fn test_build_flags_excluded_records() {
        let dataset = Dataset {
            agents: vec![record("A001", 4.9, 42), record("A009", 4.5, 0)],
            satisfaction: None,
            time_slots: Default::default(),
            procedures: Default::default(),
        };
        let context = PromptContext::assemble(
            &dataset,
            "Which agent is most efficient?",
            &AnalysisSettings::default(),
            &[],
        )
        .unwrap();
        let prompt = build("Which agent is most efficient?", &context, Locale::En);

        let en = Scaffolding::for_locale(Locale::En);
        assert!(prompt.contains(&format!("{}: A009", en.efficiency_excluded)));
        assert!(prompt.contains("1. A001"));
        assert!(!prompt.contains("A009 Dr. A009: efficiency_score"));
    }

    #[test]
    fn test_build_without_records() {
        let dataset = Dataset {
            agents: vec![],
            satisfaction: None,
            time_slots: Default::default(),
            procedures: Default::default(),
        };
        let context =
            PromptContext::assemble(&dataset, "staff?", &AnalysisSettings::default(), &[])
                .unwrap()
                .with_max_words(60);
        let prompt = build("staff?", &context, Locale::En);

        let en = Scaffolding::for_locale(Locale::En);
        assert!(prompt.contains(en.no_records));
        assert!(prompt.contains("record_count: 0"));
        assert!(prompt.contains("Answer in at most 60 words."));
        assert!(!prompt.contains(en.rankings_header));
    }
}
