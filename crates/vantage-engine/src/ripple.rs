//! Ripple engine: rule-based downstream-consequence scores per issue type.
//!
//! A static lookup table maps each issue type to a baseline ripple score in
//! [0,1] and the consequences it tends to cascade into. Aggregation over a
//! company's issues sorts by individual score descending and sums with
//! exponential decay `0.5^rank`, capped at 1.0 — two medium issues never
//! outrank one severe one.

use serde::{Deserialize, Serialize};

use crate::issues::{Issue, IssueType};

/// Baseline ripple score and consequence strings for an issue type.
pub fn ripple_profile(issue_type: IssueType) -> (f64, &'static [&'static str]) {
    match issue_type {
        IssueType::RunwayCritical => (
            0.9,
            &[
                "forced bridge round or down round",
                "hiring freeze and attrition risk",
                "weakened negotiating position with investors",
            ],
        ),
        IssueType::NoPipeline => (
            0.85,
            &[
                "raise timeline slips past runway",
                "no competitive tension on terms",
            ],
        ),
        IssueType::RunwayWarning => (
            0.6,
            &["raise must start earlier than planned", "less room for experiments"],
        ),
        IssueType::PipelineGap => (
            0.6,
            &["round may close under target", "valuation pressure"],
        ),
        IssueType::GoalMissed => (
            0.55,
            &["credibility hit with board and investors", "dependent goals slip"],
        ),
        IssueType::GoalBehind => (0.45, &["milestone narrative weakens before the raise"]),
        IssueType::GoalStalled => (0.5, &["team focus question: effort without movement"]),
        IssueType::DealAtRisk => (0.35, &["pipeline coverage overstated"]),
        IssueType::DealStale => (0.3, &["investor interest decays while untouched"]),
        IssueType::DataMissing => (0.4, &["every downstream metric is blind"]),
        IssueType::DataNoTimestamp => (0.3, &["freshness cannot be assessed"]),
        IssueType::DataStale => (0.25, &["decisions run on old numbers"]),
        IssueType::NoGoals => (0.3, &["no measurable direction to track"]),
        IssueType::GoalNoHistory => (0.1, &["trajectory cannot be projected"]),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RippleAssessment {
    /// Aggregate downstream-consequence score, [0,1].
    pub score: f64,
    /// Consequences from issues scoring ≥ 0.3 individually, deduplicated.
    pub explanations: Vec<String>,
}

/// Minimum individual score for an issue's consequences to be surfaced.
const EXPLAIN_THRESHOLD: f64 = 0.3;

/// Aggregate ripple over a set of issues with diminishing weight per rank.
pub fn aggregate_ripple(issues: &[Issue]) -> RippleAssessment {
    let mut scored: Vec<(f64, IssueType)> = issues
        .iter()
        .map(|i| (ripple_profile(i.issue_type).0, i.issue_type))
        .collect();
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.as_str().cmp(b.1.as_str()))
    });

    let mut score = 0.0;
    let mut explanations = Vec::new();
    for (rank, (individual, issue_type)) in scored.iter().enumerate() {
        score += individual * 0.5_f64.powi(rank as i32);
        if *individual >= EXPLAIN_THRESHOLD {
            for consequence in ripple_profile(*issue_type).1 {
                let consequence = consequence.to_string();
                if !explanations.contains(&consequence) {
                    explanations.push(consequence);
                }
            }
        }
    }

    RippleAssessment { score: score.min(1.0), explanations }
}
