//! Markdown and JSON report generation.

use super::InsightReport;
use crate::analysis::{AgentProfile, OverallSummary, PracticeAnalysis, TrendDirection};
use crate::models::humanize;
use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &InsightReport<'_>) -> String {
    let mut output = String::new();

    output.push_str("# Dental Insights Report\n\n");

    output.push_str(&generate_metadata_section(report));

    if !report.analysis.summary.is_empty() {
        output.push_str(&generate_summary_section(&report.analysis.summary));
        output.push_str(&generate_rankings_section(report.analysis));
    }

    output.push_str(&generate_satisfaction_section(report));

    output.push_str(&generate_insights_section(report));

    output.push_str(&generate_recommendations_section(report));

    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(report: &InsightReport<'_>) -> String {
    let metadata = &report.metadata;
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Data Source:** `{}`\n", metadata.data_source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Agents Analyzed:** {}\n",
        metadata.agents_analyzed
    ));
    if let Some(responses) = metadata.survey_responses {
        section.push_str(&format!("- **Survey Responses:** {}\n", responses));
    }
    section.push('\n');

    section
}

fn generate_summary_section(summary: &OverallSummary) -> String {
    let mut section = String::new();

    section.push_str("## Practice Summary\n\n");
    section.push_str("| Satisfaction | Duration (min) | Appointments/Day | Success Rate | Retention |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {:.2} | {:.1} | {:.1} | {:.1}% | {:.1}% |\n\n",
        summary.average_satisfaction,
        summary.average_duration_minutes,
        summary.average_appointments_per_day,
        summary.average_success_rate,
        summary.average_retention
    ));

    section
}

fn generate_rankings_section(analysis: &PracticeAnalysis<'_>) -> String {
    let mut section = String::new();
    let rankings = &analysis.rankings;

    section.push_str("## Agent Rankings\n\n");
    section.push_str("| Rank | Agent | Role | Satisfaction | Success Rate | Efficiency |\n");
    section.push_str("|:---:|:---|:---|:---:|:---:|:---:|\n");
    for (i, record) in rankings.by_satisfaction.iter().enumerate() {
        let efficiency = rankings
            .efficiency
            .ranked
            .iter()
            .find(|s| s.record.id() == record.id())
            .map(|s| format!("{:.2}", s.score))
            .unwrap_or_else(|| "n/a".to_string());
        section.push_str(&format!(
            "| {} | {} (`{}`) | {} | {:.1} | {:.1}% | {} |\n",
            i + 1,
            record.name(),
            record.id(),
            record.role(),
            record.satisfaction(),
            record.success_rate_pct(),
            efficiency
        ));
    }
    section.push('\n');

    if !rankings.below_threshold.is_empty() {
        section.push_str(&format!(
            "### Below {:.1} Satisfaction\n\n",
            analysis.improvement_threshold
        ));
        for record in &rankings.below_threshold {
            section.push_str(&format!(
                "- {} ({:.1})\n",
                record.name(),
                record.satisfaction()
            ));
        }
        section.push('\n');
    }

    if !rankings.efficiency.flagged.is_empty() {
        section.push_str("### Excluded From Efficiency Ranking\n\n");
        for record in &rankings.efficiency.flagged {
            section.push_str(&format!(
                "- {} (`{}`): appointment duration {} min\n",
                record.name(),
                record.id(),
                record.duration_minutes()
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_satisfaction_section(report: &InsightReport<'_>) -> String {
    let analysis = report.analysis;
    let Some(categories) = analysis.category_ratings else {
        return String::new();
    };

    let mut section = String::new();
    section.push_str("## Patient Satisfaction\n\n");

    if !categories.is_empty() {
        section.push_str("### Categories\n\n");
        section.push_str("| Category | Rating |\n");
        section.push_str("|:---|:---:|\n");
        for (category, rating) in categories {
            section.push_str(&format!("| {} | {:.1} |\n", humanize(category), rating));
        }
        section.push('\n');
    }

    if let Some(trend) = &analysis.recent_trend {
        let arrow = match trend.direction {
            TrendDirection::Up => "↑",
            TrendDirection::Down => "↓",
            TrendDirection::Stable => "→",
        };
        section.push_str("### Trend\n\n");
        section.push_str(&format!(
            "{} {} → {}: {:.1} → {:.1} ({:+.2})\n\n",
            arrow,
            humanize(&trend.previous_period),
            humanize(&trend.current_period),
            trend.previous_value,
            trend.current_value,
            trend.change
        ));

        section.push_str("| Period | Change | Change % |\n");
        section.push_str("|:---|:---:|:---:|\n");
        for (period, delta) in &report.trend_deltas {
            match delta {
                Some(d) => section.push_str(&format!(
                    "| {} | {:+.2} | {:+.2}% |\n",
                    humanize(period),
                    d.absolute,
                    d.percentage
                )),
                None => section.push_str(&format!("| {} | n/a | n/a |\n", humanize(period))),
            }
        }
        section.push('\n');
    }

    if let Some(services) = &analysis.services {
        section.push_str("### Services\n\n");
        section.push_str("| Service | Responses | Rating |\n");
        section.push_str("|:---|:---:|:---:|\n");
        for service in &services.by_rating {
            section.push_str(&format!(
                "| {} | {} | {:.1} |\n",
                humanize(&service.service),
                service.count,
                service.avg_rating
            ));
        }
        section.push('\n');
    }

    if let Some(sentiment) = &analysis.sentiment {
        if sentiment.total > 0 {
            section.push_str(&format!(
                "**Comment sentiment:** {:.0}% positive, {:.0}% neutral, {:.0}% negative ({} comments)\n\n",
                sentiment.positive_pct(),
                sentiment.neutral_pct(),
                sentiment.negative_pct(),
                sentiment.total
            ));
        }
    }

    section
}

fn generate_insights_section(report: &InsightReport<'_>) -> String {
    let mut section = String::new();

    section.push_str("## Key Insights\n\n");

    if report.insights.is_empty() {
        section.push_str("Not enough data to derive insights.\n\n");
        return section;
    }

    for insight in &report.insights {
        section.push_str(&format!("### {}\n\n", insight.title));
        section.push_str(&format!("{}\n\n", insight.summary_text));
    }

    section
}

fn generate_recommendations_section(report: &InsightReport<'_>) -> String {
    if report.recommendations.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Recommendations\n\n");
    for (i, rec) in report.recommendations.iter().enumerate() {
        section.push_str(&format!(
            "{}. **{}**: {}\n",
            i + 1,
            rec.title,
            rec.description
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by dental-insights v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &InsightReport<'_>) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Markdown card for one agent.
pub fn generate_agent_markdown(profile: &AgentProfile<'_>, summary: &OverallSummary) -> String {
    let record = profile.record;
    let delta = &profile.compared_to_average;
    let mut card = String::new();

    card.push_str(&format!("# {} (`{}`)\n\n", record.name(), record.id()));
    if !record.role().is_empty() {
        card.push_str(&format!("*{}*\n\n", record.role()));
    }

    card.push_str(&format!(
        "- **Satisfaction rank:** {} of {}\n",
        profile.satisfaction_rank, summary.record_count
    ));
    match (profile.efficiency_rank, profile.efficiency_score) {
        (Some(rank), Some(score)) => card.push_str(&format!(
            "- **Efficiency rank:** {} (score {:.2})\n",
            rank, score
        )),
        _ => card.push_str("- **Efficiency rank:** excluded (non-positive appointment duration)\n"),
    }
    if !record.specialties().is_empty() {
        card.push_str(&format!(
            "- **Specialties:** {}\n",
            record.specialties().join(", ")
        ));
    }
    card.push('\n');

    card.push_str("| Metric | Value | vs. Practice Average |\n");
    card.push_str("|:---|:---:|:---:|\n");
    card.push_str(&format!(
        "| Satisfaction | {:.1} | {:+.2} |\n",
        record.satisfaction(),
        delta.satisfaction
    ));
    card.push_str(&format!(
        "| Appointment duration (min) | {} | {:+.1} |\n",
        record.duration_minutes(),
        delta.duration_minutes
    ));
    card.push_str(&format!(
        "| Appointments per day | {:.1} | {:+.1} |\n",
        record.appointments_per_day(),
        delta.appointments_per_day
    ));
    card.push_str(&format!(
        "| Treatment success rate | {:.1}% | {:+.1} |\n",
        record.success_rate_pct(),
        delta.success_rate
    ));
    card.push_str(&format!(
        "| Patient retention | {:.1}% | |\n\n",
        record.retention_pct()
    ));

    if !record.comments().is_empty() {
        card.push_str("## Patient Comments\n\n");
        for comment in record.comments() {
            card.push_str(&format!("> {}\n\n", comment));
        }
    }

    card
}

/// JSON document for one agent.
pub fn generate_agent_json(profile: &AgentProfile<'_>, summary: &OverallSummary) -> Result<String> {
    let value = json!({
        "profile": profile,
        "practice_average": summary,
    });
    serde_json::to_string_pretty(&value).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{agent_profile, summarize, AnalysisSettings};
    use crate::dataset::Dataset;
    use crate::models::fixtures::record;

    #[test]
    fn test_generate_markdown_report() {
        let dataset = Dataset::sample().unwrap();
        let analysis = PracticeAnalysis::run(&dataset, &AnalysisSettings::default()).unwrap();
        let report = InsightReport::new(&analysis, "sample");
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Dental Insights Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Agent Rankings"));
        assert!(markdown.contains("| 1 | Dr. Sarah Johnson (`A001`)"));
        assert!(markdown.contains("### Below 4.5 Satisfaction"));
        assert!(markdown.contains("## Patient Satisfaction"));
        assert!(markdown.contains("| wait times |"));
        assert!(markdown.contains("## Key Insights"));
        assert!(markdown.contains("## Recommendations"));
    }

    #[test]
    fn test_markdown_without_data() {
        let dataset = Dataset {
            agents: vec![],
            satisfaction: None,
            time_slots: Default::default(),
            procedures: Default::default(),
        };
        let analysis = PracticeAnalysis::run(&dataset, &AnalysisSettings::default()).unwrap();
        let report = InsightReport::new(&analysis, "empty.json");
        let markdown = generate_markdown_report(&report);

        assert!(!markdown.contains("## Agent Rankings"));
        assert!(!markdown.contains("## Patient Satisfaction"));
        assert!(markdown.contains("Not enough data to derive insights."));
    }

    #[test]
    fn test_generate_json_report() {
        let dataset = Dataset::sample().unwrap();
        let analysis = PracticeAnalysis::run(&dataset, &AnalysisSettings::default()).unwrap();
        let report = InsightReport::new(&analysis, "sample");
        let json = generate_json_report(&report).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["agents_analyzed"], 5);
        assert_eq!(value["insights"][0]["kind"], "top_performer");
        assert!(value["trend_deltas"]["Nov_2024"]["absolute"].is_number());
        assert!(value["recommendations"].as_array().unwrap().len() > 1);
    }

    #[test]
    fn test_agent_markdown_excluded_from_efficiency() {
        let records = vec![record("A001", 4.9, 42), record("A002", 4.6, 0)];
        let profile = agent_profile(&records, "A002").unwrap();
        let card = generate_agent_markdown(&profile, &summarize(&records));

        assert!(card.contains("# Dr. A002 (`A002`)"));
        assert!(card.contains("- **Satisfaction rank:** 2 of 2"));
        assert!(card.contains("excluded"));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        write_report("# Title\n", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Title\n");
    }
}
