//! Prompt rendering and response parsing for the LLM judge.
//!
//! The judge is asked for a JSON object:
//!
//! ```text
//! {"winner": "A" | "B" | "TIE", "reasoning": "brief explanation"}
//! ```
//!
//! Anything that does not yield a recognizable winner is read as a tie.

use super::types::{Comparison, ProjectProfile, Verdict};
use serde::Deserialize;
use tracing::warn;

/// Skills listed per project before the rest are dropped.
pub const MAX_PROMPT_SKILLS: usize = 8;

/// Description length (in characters) before truncation.
pub const MAX_DESCRIPTION_CHARS: usize = 400;

const NOT_SPECIFIED: &str = "not specified";

/// Renders a project as the judge sees it.
pub fn format_project(project: &ProjectProfile) -> String {
    let skills = if project.skills.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        project
            .skills
            .iter()
            .take(MAX_PROMPT_SKILLS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let description = match project.description.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => truncate_chars(text, MAX_DESCRIPTION_CHARS),
        _ => NOT_SPECIFIED.to_string(),
    };

    format!(
        "Industry: {}\nPosition: {}\nSkills: {}\nContribution: {}",
        or_not_specified(project.industry.as_deref()),
        or_not_specified(project.role.as_deref()),
        skills,
        description
    )
}

/// Builds the pairwise comparison prompt. `left` is shown as PROJECT A.
pub fn build_prompt(query_text: &str, left: &ProjectProfile, right: &ProjectProfile) -> String {
    format!(
        r#"You are evaluating which project is more relevant to a search query.

QUERY: "{query}"

PROJECT A:
{a}

PROJECT B:
{b}

Which project is MORE RELEVANT to the query? Consider:
- Does the project match the skills/technologies mentioned?
- Does the industry align with what's being searched for?
- Does the contribution describe relevant work?

Respond in JSON format:
{{"winner": "A" or "B" or "TIE", "reasoning": "brief explanation"}}"#,
        query = query_text,
        a = format_project(left),
        b = format_project(right),
    )
}

#[derive(Deserialize)]
struct VerdictResponse {
    #[serde(default)]
    winner: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Parses a judge response into a [`Comparison`].
///
/// Unparseable JSON, a missing `winner`, or an unknown winner label all
/// produce [`Verdict::Tie`] and a warning. This never fails.
pub fn parse_verdict(raw: &str) -> Comparison {
    let Some(response) = extract_response(raw) else {
        warn!("Unparseable judge response, treating as tie: {}", preview(raw));
        return Comparison::new(Verdict::Tie, "");
    };

    let reasoning = response.reasoning.unwrap_or_default();
    let Some(winner) = response.winner else {
        warn!("Judge response missing winner, treating as tie");
        return Comparison::new(Verdict::Tie, reasoning);
    };

    let verdict = match winner.trim().to_ascii_uppercase().as_str() {
        "A" => Verdict::Left,
        "B" => Verdict::Right,
        "TIE" => Verdict::Tie,
        other => {
            warn!("Unknown judge winner '{}', treating as tie", other);
            Verdict::Tie
        }
    };

    Comparison::new(verdict, reasoning)
}

fn extract_response(raw: &str) -> Option<VerdictResponse> {
    if let Ok(v) = serde_json::from_str::<VerdictResponse>(raw) {
        return Some(v);
    }

    // Models sometimes wrap the object in prose or code fences
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<VerdictResponse>(&raw[start..=end]).ok()
}

fn or_not_specified(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => NOT_SPECIFIED,
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

fn preview(raw: &str) -> String {
    truncate_chars(raw, 80)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::types::ProjectId;

    fn project() -> ProjectProfile {
        ProjectProfile {
            id: ProjectId::from_u64(1),
            industry: Some("Fintech".to_string()),
            role: Some("Backend Engineer".to_string()),
            skills: (1..=10).map(|i| format!("skill{}", i)).collect(),
            description: Some("Built a payments ledger".to_string()),
        }
    }

    #[test]
    fn test_format_project_limits_skills() {
        let text = format_project(&project());
        assert!(text.contains("Industry: Fintech"));
        assert!(text.contains("Position: Backend Engineer"));
        assert!(text.contains("skill8"));
        assert!(!text.contains("skill9"));
        assert!(text.contains("Contribution: Built a payments ledger"));
    }

    #[test]
    fn test_format_project_missing_fields() {
        let text = format_project(&ProjectProfile::new(ProjectId::from_u64(2)));
        assert_eq!(
            text,
            "Industry: not specified\nPosition: not specified\nSkills: not specified\nContribution: not specified"
        );
    }

    #[test]
    fn test_long_description_truncated() {
        let mut p = project();
        p.description = Some("é".repeat(500));
        let text = format_project(&p);
        let contribution = text.lines().last().unwrap();
        assert!(contribution.ends_with("..."));
        assert_eq!(
            contribution.trim_start_matches("Contribution: ").chars().count(),
            MAX_DESCRIPTION_CHARS + 3
        );
    }

    #[test]
    fn test_prompt_places_left_as_a() {
        let left = project();
        let mut right = project();
        right.industry = Some("Healthcare".to_string());

        let prompt = build_prompt("payments engineer", &left, &right);
        let a = prompt.find("Fintech").unwrap();
        let b = prompt.find("Healthcare").unwrap();
        assert!(a < b);
        assert!(prompt.contains("QUERY: \"payments engineer\""));
        assert!(prompt.contains(r#"{"winner": "A" or "B" or "TIE""#));
    }

    #[test]
    fn test_parse_verdicts() {
        let c = parse_verdict(r#"{"winner": "A", "reasoning": "closer match"}"#);
        assert_eq!(c, Comparison::new(Verdict::Left, "closer match"));

        assert_eq!(parse_verdict(r#"{"winner": "b"}"#).verdict, Verdict::Right);
        assert_eq!(parse_verdict(r#"{"winner": "TIE"}"#).verdict, Verdict::Tie);
    }

    #[test]
    fn test_parse_wrapped_json() {
        let c = parse_verdict("```json\n{\"winner\": \"B\", \"reasoning\": \"x\"}\n```");
        assert_eq!(c.verdict, Verdict::Right);
    }

    #[test]
    fn test_malformed_is_tie() {
        assert_eq!(parse_verdict("not json").verdict, Verdict::Tie);
        assert_eq!(parse_verdict(r#"{"reasoning": "hmm"}"#).verdict, Verdict::Tie);
        assert_eq!(parse_verdict(r#"{"winner": "C"}"#).verdict, Verdict::Tie);
        assert_eq!(parse_verdict("").verdict, Verdict::Tie);
    }
}
