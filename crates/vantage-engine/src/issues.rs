//! Issue detector: classifies *current-state* gaps into canonical records.
//!
//! Stateless function of (company facts, goal trajectories, runway, now).
//! Every issue id is a content hash of stable business fields
//! ([`vantage_model::ids`]) so repeated detection on unchanged input yields
//! identical ids — downstream deduplication depends on it. A process-local
//! counter here would be a defect.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use vantage_model::{ids, Company, EntityRef};

use crate::goal_trajectory::GoalTrajectory;
use crate::runway::Runway;
use crate::trajectory::days_between;
use crate::weights::EngineConfig;

// ============================================================================
// Types
// ============================================================================

/// Severity, ordered LOW < MEDIUM < HIGH < CRITICAL.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Numeric level: LOW 0 … CRITICAL 3.
    pub fn level(self) -> u8 {
        match self {
            Severity::Low => 0,
            Severity::Medium => 1,
            Severity::High => 2,
            Severity::Critical => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    DataMissing,
    RunwayCritical,
    RunwayWarning,
    NoGoals,
    GoalMissed,
    GoalStalled,
    GoalBehind,
    GoalNoHistory,
    NoPipeline,
    PipelineGap,
    DealStale,
    DealAtRisk,
    DataNoTimestamp,
    DataStale,
}

impl IssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::DataMissing => "DATA_MISSING",
            IssueType::RunwayCritical => "RUNWAY_CRITICAL",
            IssueType::RunwayWarning => "RUNWAY_WARNING",
            IssueType::NoGoals => "NO_GOALS",
            IssueType::GoalMissed => "GOAL_MISSED",
            IssueType::GoalStalled => "GOAL_STALLED",
            IssueType::GoalBehind => "GOAL_BEHIND",
            IssueType::GoalNoHistory => "GOAL_NO_HISTORY",
            IssueType::NoPipeline => "NO_PIPELINE",
            IssueType::PipelineGap => "PIPELINE_GAP",
            IssueType::DealStale => "DEAL_STALE",
            IssueType::DealAtRisk => "DEAL_AT_RISK",
            IssueType::DataNoTimestamp => "DATA_NO_TIMESTAMP",
            IssueType::DataStale => "DATA_STALE",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub issue_id: String,
    pub issue_type: IssueType,
    pub entity: EntityRef,
    pub severity: Severity,
    pub evidence: serde_json::Value,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueReport {
    /// Sorted by severity descending, issue id ascending within a severity.
    pub issues: Vec<Issue>,
    pub counts: SeverityCounts,
}

impl IssueReport {
    pub fn of_type(&self, issue_type: IssueType) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.issue_type == issue_type)
    }
}

// ============================================================================
// Detection
// ============================================================================

fn issue(
    issue_type: IssueType,
    entity: EntityRef,
    stable_key: &str,
    severity: Severity,
    evidence: serde_json::Value,
    now: DateTime<Utc>,
) -> Issue {
    let issue_id = ids::issue_id_v1(
        issue_type.as_str(),
        entity.kind.as_str(),
        &entity.id,
        stable_key,
    );
    Issue { issue_id, issue_type, entity, severity, evidence, detected_at: now }
}

/// Detect all current-state issues for one company.
///
/// `trajectories` is keyed by goal id and must cover every active goal (the
/// DAG wires the goal-trajectory node output in).
pub fn detect_issues(
    company: &Company,
    runway: &Runway,
    trajectories: &AHashMap<String, GoalTrajectory>,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> IssueReport {
    let mut issues = Vec::new();
    let company_ref = EntityRef::company(&company.id);

    detect_runway_issues(company, runway, now, config, &mut issues);
    detect_goal_issues(company, trajectories, now, &mut issues);
    detect_pipeline_issues(company, now, config, &mut issues);
    detect_freshness_issues(company, now, config, &mut issues);

    // Deterministic presentation order: severity desc, then id.
    issues.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.issue_id.cmp(&b.issue_id))
    });

    let mut counts = SeverityCounts::default();
    for i in &issues {
        match i.severity {
            Severity::Critical => counts.critical += 1,
            Severity::High => counts.high += 1,
            Severity::Medium => counts.medium += 1,
            Severity::Low => counts.low += 1,
        }
    }

    tracing::debug!(
        company = %company_ref.id,
        total = issues.len(),
        critical = counts.critical,
        "issue detection complete"
    );

    IssueReport { issues, counts }
}

fn detect_runway_issues(
    company: &Company,
    runway: &Runway,
    now: DateTime<Utc>,
    config: &EngineConfig,
    out: &mut Vec<Issue>,
) {
    let entity = EntityRef::company(&company.id);
    if company.cash.is_none() || company.burn.is_none() {
        out.push(issue(
            IssueType::DataMissing,
            entity,
            "runway-inputs",
            Severity::High,
            json!({ "cash": company.cash, "burn": company.burn }),
            now,
        ));
        return;
    }
    // Infinite runway (burn ≤ 0) triggers neither threshold.
    let Some(months) = runway.months else { return };
    if months < config.runway.critical_months {
        out.push(issue(
            IssueType::RunwayCritical,
            entity,
            "runway",
            Severity::Critical,
            json!({ "months": months, "threshold": config.runway.critical_months }),
            now,
        ));
    } else if months < config.runway.warning_months {
        out.push(issue(
            IssueType::RunwayWarning,
            entity,
            "runway",
            Severity::High,
            json!({ "months": months, "threshold": config.runway.warning_months }),
            now,
        ));
    }
}

fn detect_goal_issues(
    company: &Company,
    trajectories: &AHashMap<String, GoalTrajectory>,
    now: DateTime<Utc>,
    out: &mut Vec<Issue>,
) {
    let mut active = company.active_goals().peekable();
    if active.peek().is_none() {
        out.push(issue(
            IssueType::NoGoals,
            EntityRef::company(&company.id),
            "goals",
            Severity::Medium,
            json!({ "activeGoals": 0 }),
            now,
        ));
        return;
    }

    for goal in active {
        let entity = EntityRef::goal(&goal.id);

        let past_due_unmet = match (goal.due, goal.current, goal.target) {
            (Some(due), Some(current), Some(target)) => due < now && current < target,
            _ => false,
        };
        if past_due_unmet {
            out.push(issue(
                IssueType::GoalMissed,
                entity,
                &goal.id,
                Severity::High,
                json!({ "due": goal.due, "current": goal.current, "target": goal.target }),
                now,
            ));
            continue;
        }

        let Some(gt) = trajectories.get(&goal.id) else { continue };
        // Trajectory states are mutually exclusive: exactly one of
        // missed/stalled/behind/no-history fires per goal per run.
        match gt.trajectory.on_track {
            Some(true) => {}
            Some(false) => {
                if gt.trajectory.projected_date.is_none() {
                    out.push(issue(
                        IssueType::GoalStalled,
                        entity,
                        &goal.id,
                        Severity::High,
                        json!({ "explain": gt.trajectory.explain }),
                        now,
                    ));
                } else {
                    let days_left = gt.days_left.unwrap_or(0.0);
                    let severity = if days_left < 7.0 { Severity::Critical } else { Severity::High };
                    out.push(issue(
                        IssueType::GoalBehind,
                        entity,
                        &goal.id,
                        severity,
                        json!({
                            "projectedDate": gt.trajectory.projected_date,
                            "daysLeft": days_left,
                        }),
                        now,
                    ));
                }
            }
            None => {
                out.push(issue(
                    IssueType::GoalNoHistory,
                    entity,
                    &goal.id,
                    Severity::Low,
                    json!({ "historyPoints": goal.history.len() }),
                    now,
                ));
            }
        }
    }
}

fn detect_pipeline_issues(
    company: &Company,
    now: DateTime<Utc>,
    config: &EngineConfig,
    out: &mut Vec<Issue>,
) {
    if company.raising {
        let entity = EntityRef::company(&company.id);
        if company.deals.is_empty() {
            out.push(issue(
                IssueType::NoPipeline,
                entity,
                "pipeline",
                Severity::Critical,
                json!({ "roundTarget": company.round_target }),
                now,
            ));
        } else if let Some(target) = company.round_target {
            let weighted: f64 = company
                .deals
                .iter()
                .filter_map(|d| d.weighted_amount())
                .sum();
            if target > 0.0 && weighted < target * config.pipeline.coverage_ratio {
                out.push(issue(
                    IssueType::PipelineGap,
                    entity,
                    "pipeline",
                    Severity::High,
                    json!({ "weightedPipeline": weighted, "roundTarget": target }),
                    now,
                ));
            }
        }
    }

    for deal in &company.deals {
        if deal.status.is_closed() {
            continue;
        }
        let entity = EntityRef::deal(&deal.id);
        let stale_days = deal.as_of.map(|as_of| days_between(as_of, now));
        let is_stale = match stale_days {
            Some(days) => days > config.freshness.deal_stale_days,
            None => true, // never updated
        };
        if is_stale {
            out.push(issue(
                IssueType::DealStale,
                entity.clone(),
                &deal.id,
                Severity::Medium,
                json!({ "staleDays": stale_days, "status": deal.status }),
                now,
            ));
        }
        if deal.status == vantage_model::DealStatus::DueDiligence
            && deal.probability < config.pipeline.at_risk_probability
        {
            out.push(issue(
                IssueType::DealAtRisk,
                entity,
                &deal.id,
                Severity::Medium,
                json!({ "probability": deal.probability }),
                now,
            ));
        }
    }
}

fn detect_freshness_issues(
    company: &Company,
    now: DateTime<Utc>,
    config: &EngineConfig,
    out: &mut Vec<Issue>,
) {
    let entity = EntityRef::company(&company.id);
    match company.as_of {
        None => out.push(issue(
            IssueType::DataNoTimestamp,
            entity,
            "freshness",
            Severity::High,
            json!({}),
            now,
        )),
        Some(as_of) => {
            let age = days_between(as_of, now);
            if age > config.freshness.data_stale_days {
                out.push(issue(
                    IssueType::DataStale,
                    entity,
                    "freshness",
                    Severity::Medium,
                    json!({ "ageDays": age }),
                    now,
                ));
            }
        }
    }
}
