//! Output formatting for subcommand reports.
//!
//! Supports both human-readable terminal output and JSON for scripting.
//! Progress bars draw on stderr so `--json` output on stdout stays clean.

use crate::commands::{ComparisonGroup, FailureCase, MetricsReport};
use crate::dataset::ImportSummary;
use indicatif::{ProgressBar, ProgressStyle};
use ranksight_core::evaluation::RetrievalSummary;
use ranksight_core::pipeline::{
    JudgingRunReport, PreferenceRunReport, RetrievalRunReport, RunProgress,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Maximum characters of query text shown in tables
const QUERY_MAX_LEN: usize = 80;

/// Groups listed per breakdown in the metrics report
const MAX_GROUPS_SHOWN: usize = 10;

const RULE_WIDTH: usize = 50;

// =============================================================================
// Progress
// =============================================================================

/// Creates a progress bar; hidden when output is JSON.
pub fn progress_bar(label: &'static str, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{msg} [{bar:40}] {pos}/{len} ({eta}) {prefix}")
    {
        pb.set_style(style);
    }
    pb.set_message(label);
    pb
}

/// Applies a pipeline progress update to a bar.
pub fn update_progress(pb: &ProgressBar, progress: &RunProgress) {
    pb.set_length(progress.total as u64);
    pb.set_position(progress.completed as u64);
    if progress.errors > 0 {
        pb.set_prefix(format!("{} errors", progress.errors));
    }
}

// =============================================================================
// JSON
// =============================================================================

/// Serializes any report as pretty JSON.
pub fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// JSON shape of a retrieval run.
#[derive(Serialize)]
pub struct EvaluateOutput {
    pub queries: usize,
    pub evaluated: usize,
    pub errors: usize,
    pub elapsed_ms: u64,
    pub summary: RetrievalSummary,
}

impl From<&RetrievalRunReport> for EvaluateOutput {
    fn from(report: &RetrievalRunReport) -> Self {
        Self {
            queries: report.queries,
            evaluated: report.tally.evaluated(),
            errors: report.tally.errors(),
            elapsed_ms: report.elapsed_ms,
            summary: report.summary(),
        }
    }
}

// =============================================================================
// Human-readable
// =============================================================================

pub fn format_import(summary: &ImportSummary) -> String {
    let mut output = format!(
        "Imported {} project{} and {} quer{}",
        summary.projects,
        plural(summary.projects),
        summary.queries,
        if summary.queries == 1 { "y" } else { "ies" }
    );
    if summary.dangling_ground_truth > 0 {
        output.push_str(&format!(
            "\nWarning: {} quer{} reference an unknown ground-truth project",
            summary.dangling_ground_truth,
            if summary.dangling_ground_truth == 1 { "y" } else { "ies" }
        ));
    }
    output
}

pub fn format_evaluate(report: &RetrievalRunReport) -> String {
    if report.queries == 0 {
        return "No unevaluated queries. Use --all to re-run every query.".to_string();
    }
    format!(
        "Evaluated {} of {} queries ({} error{}) in {:.1}s\n  {}",
        report.tally.evaluated(),
        report.queries,
        report.tally.errors(),
        plural(report.tally.errors()),
        report.elapsed_ms as f64 / 1000.0,
        report.summary().format_line()
    )
}

pub fn format_metrics(report: &MetricsReport) -> String {
    let Some(mrr) = report.overall.mrr else {
        return "No evaluation data found.".to_string();
    };

    let rule = "=".repeat(RULE_WIDTH);
    let mut output = String::new();
    output.push_str(&format!("{}\nOverall Metrics:\n", rule));
    output.push_str(&format!("  MRR: {:.4}", mrr));
    if let Some(ci) = &report.mrr_ci {
        output.push_str(&format!("  (95% CI {:.4}-{:.4})", ci.lower, ci.upper));
    }
    output.push('\n');
    output.push_str(&format!(
        "  Hit Rate: {}\n",
        percent(report.overall.hits as f64 / report.overall.evaluated as f64)
    ));
    output.push_str(&format!("  Total Queries: {}\n", report.overall.evaluated));

    output.push_str("\nHit Rate by K:\n");
    for (k, rate) in &report.overall.hit_rate_at_k {
        output.push_str(&format!("  @{:<3} {}\n", format!("{}:", k), percent(*rate)));
    }

    output.push_str(&format_groups("MRR by Query Type", &report.by_query_type));
    output.push_str(&format_groups("MRR by Category", &report.by_category));
    output.push_str(&rule);
    output
}

fn format_groups(title: &str, groups: &BTreeMap<String, RetrievalSummary>) -> String {
    if groups.is_empty() {
        return String::new();
    }

    // Largest groups first
    let mut sorted: Vec<(&String, &RetrievalSummary)> = groups.iter().collect();
    sorted.sort_by(|a, b| b.1.evaluated.cmp(&a.1.evaluated).then_with(|| a.0.cmp(b.0)));

    let mut output = format!("\n{}:\n", title);
    for (label, summary) in sorted.into_iter().take(MAX_GROUPS_SHOWN) {
        output.push_str(&format!(
            "  {}: MRR={:.4}, hit_rate={}, n={}\n",
            label,
            summary.mrr.unwrap_or(0.0),
            percent(summary.hits as f64 / summary.evaluated.max(1) as f64),
            summary.evaluated
        ));
    }
    output
}

pub fn format_failures(cases: &[FailureCase], cutoff: usize) -> String {
    if cases.is_empty() {
        return "No failure cases found.".to_string();
    }

    let mut output = format!("Failure Cases (ground truth not in top-{}):\n\n", cutoff);
    for case in cases {
        output.push_str(&format!(
            "Query {}: {}\n",
            case.query_id,
            truncate_text(&case.query_text, QUERY_MAX_LEN)
        ));
        output.push_str(&format!("  Type: {}\n", case.query_type));
        if let Some(category) = &case.category {
            output.push_str(&format!("  Category: {}\n", category));
        }
        if let Some(truth) = case.ground_truth_id {
            output.push_str(&format!("  Ground truth: {}\n", truth));
        }
        let rank = case
            .rank
            .map(|r| r.to_string())
            .unwrap_or_else(|| "NOT FOUND".to_string());
        output.push_str(&format!("  Rank: {}\n\n", rank));
    }
    output.trim_end().to_string()
}

pub fn format_judging(report: &JudgingRunReport) -> String {
    if report.queries == 0 {
        return "No evaluated queries waiting for judgment.".to_string();
    }

    let mut output = format!(
        "Judged {} of {} queries in {:.1}s\n",
        report.queries_judged,
        report.queries,
        report.elapsed_ms as f64 / 1000.0
    );
    output.push_str(&format!(
        "  Judgments: {} ({} judge calls)\n",
        report.judgments_stored, report.judge_calls
    ));
    output.push_str(&format!(
        "  Position-bias ties: {}",
        report.position_bias_ties
    ));
    if let Some(rate) = report.position_bias_rate() {
        output.push_str(&format!(" ({})", percent(rate)));
    }
    output.push('\n');
    if report.failed_pairs > 0 {
        output.push_str(&format!("  Failed pairs: {}\n", report.failed_pairs));
    }
    if report.queries_skipped > 0 {
        output.push_str(&format!(
            "  Skipped (fewer than 2 known projects): {}\n",
            report.queries_skipped
        ));
    }
    if report.missing_projects > 0 {
        output.push_str(&format!(
            "  Missing project profiles: {}\n",
            report.missing_projects
        ));
    }
    output.trim_end().to_string()
}

pub fn format_rankings(report: &PreferenceRunReport) -> String {
    if report.queries == 0 {
        return "No judgments found. Run `ranksight judge` first.".to_string();
    }
    let mut output = format!(
        "Computed preference rankings for {} quer{} ({} scores)",
        report.queries,
        if report.queries == 1 { "y" } else { "ies" },
        report.scores_written
    );
    if let Some(rho) = report.mean_rank_agreement() {
        output.push_str(&format!(
            "\n  Mean rank agreement (Spearman): {:.3}",
            rho
        ));
    }
    output
}

pub fn format_comparison(groups: &[ComparisonGroup]) -> String {
    if groups.is_empty() {
        return "No ranking data found. Run `ranksight judge` and `ranksight rankings` first."
            .to_string();
    }

    let mut output = String::from("Ranking Comparisons (LLM preference vs index rank):\n\n");
    for group in groups {
        output.push_str(&format!(
            "Query {}: {}\n",
            group.query_id,
            truncate_text(&group.query_text, QUERY_MAX_LEN)
        ));
        output.push_str(&format!(
            "  {:<12} {:>10} {:>12}\n",
            "Project ID", "LLM Pref", "Index Rank"
        ));
        output.push_str(&format!("  {}\n", "-".repeat(36)));
        for row in &group.rows {
            let rank = row
                .retrieval_rank
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            output.push_str(&format!(
                "  {:<12} {:>10.2} {:>12}\n",
                row.item_id.to_string(),
                row.score,
                rank
            ));
        }
        output.push('\n');
    }
    output.trim_end().to_string()
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

/// Truncates text to a maximum number of characters, adding ellipsis if needed.
fn truncate_text(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    match truncated.rfind(' ') {
        Some(last_space) => format!("{}...", &truncated[..last_space]),
        None => format!("{}...", truncated),
    }
}
