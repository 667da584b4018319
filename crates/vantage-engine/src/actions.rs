//! Action-candidate generation: issues, pre-issues, introduction
//! opportunities and at-risk goals mapped through a resolution library into
//! uniquely-identified candidate actions.
//!
//! Every action carries exactly one canonical [`ActionSource`] — a sum type,
//! so the impact-derivation and ranking-penalty code match exhaustively and
//! a new source variant fails to compile until it is handled everywhere.
//!
//! Action ids are content hashes of entity ref + resolution id + sorted
//! source keys ([`vantage_model::ids::action_id_v1`]), so regenerating from
//! identical sources yields identical ids across runs.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vantage_model::{ids, Company, EntityRef};

use crate::goal_trajectory::GoalTrajectory;
use crate::impact::ImpactModel;
use crate::intro::{IntroductionOpportunity, Timing};
use crate::issues::{Issue, IssueType, Severity};
use crate::preissues::{PreIssue, PreIssueType};
use crate::weights::EngineConfig;

// ============================================================================
// Sources
// ============================================================================

/// The single canonical source of an action candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionSource {
    Issue {
        issue_id: String,
        issue_type: IssueType,
        severity: Severity,
        ripple_score: f64,
    },
    #[serde(rename = "PREISSUE")]
    PreIssue {
        pre_issue_id: String,
        pre_issue_type: PreIssueType,
        likelihood: f64,
        days_until_escalation: f64,
        cost_multiplier: f64,
    },
    Goal {
        goal_id: String,
        probability_of_hit: f64,
        days_left: Option<f64>,
        confidence: f64,
    },
    Introduction {
        opportunity_id: String,
        probability: f64,
        trust_score: f64,
        timing: Timing,
        path_length: usize,
    },
    Manual {
        note: String,
    },
}

impl ActionSource {
    /// The stable key hashed into the action id.
    pub fn source_key(&self) -> &str {
        match self {
            ActionSource::Issue { issue_id, .. } => issue_id,
            ActionSource::PreIssue { pre_issue_id, .. } => pre_issue_id,
            ActionSource::Goal { goal_id, .. } => goal_id,
            ActionSource::Introduction { opportunity_id, .. } => opportunity_id,
            ActionSource::Manual { note } => note,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            ActionSource::Issue { .. } => "ISSUE",
            ActionSource::PreIssue { .. } => "PREISSUE",
            ActionSource::Goal { .. } => "GOAL",
            ActionSource::Introduction { .. } => "INTRODUCTION",
            ActionSource::Manual { .. } => "MANUAL",
        }
    }
}

// ============================================================================
// Resolution library
// ============================================================================

/// A concrete playbook for resolving one class of problem.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub steps: &'static [&'static str],
    /// Optional execution-complexity hint in [0,1], fed into the ranking
    /// friction penalty.
    pub complexity: Option<f64>,
}

pub fn resolution_for_issue(issue_type: IssueType) -> ResolutionTemplate {
    match issue_type {
        IssueType::RunwayCritical => ResolutionTemplate {
            id: "start-bridge-or-cut",
            title: "Start bridge conversations and cut burn",
            steps: &[
                "model three burn scenarios",
                "shortlist insiders for a bridge",
                "set a go/no-go date for cuts",
            ],
            complexity: Some(0.8),
        },
        IssueType::RunwayWarning => ResolutionTemplate {
            id: "plan-raise-timeline",
            title: "Plan the raise timeline against runway",
            steps: &["back-solve raise start from runway", "refresh the deck"],
            complexity: Some(0.5),
        },
        IssueType::NoPipeline => ResolutionTemplate {
            id: "build-investor-pipeline",
            title: "Build an investor pipeline from scratch",
            steps: &[
                "list 30 stage-fit funds",
                "map warm paths to each",
                "sequence first outreach wave",
            ],
            complexity: Some(0.6),
        },
        IssueType::PipelineGap => ResolutionTemplate {
            id: "widen-pipeline",
            title: "Widen the pipeline to cover the round",
            steps: &["add 10 backfill targets", "re-qualify stalled conversations"],
            complexity: Some(0.5),
        },
        IssueType::GoalMissed => ResolutionTemplate {
            id: "reset-missed-goal",
            title: "Reset or retire the missed goal",
            steps: &["hold a post-mortem", "re-baseline target and date"],
            complexity: Some(0.3),
        },
        IssueType::GoalStalled => ResolutionTemplate {
            id: "unblock-stalled-goal",
            title: "Find and remove the stall",
            steps: &["identify the binding constraint", "assign a single owner"],
            complexity: Some(0.4),
        },
        IssueType::GoalBehind => ResolutionTemplate {
            id: "accelerate-goal",
            title: "Accelerate the behind goal",
            steps: &["cut scope to the critical path", "add weekly checkpoint"],
            complexity: Some(0.4),
        },
        IssueType::GoalNoHistory => ResolutionTemplate {
            id: "instrument-goal",
            title: "Start tracking progress on the goal",
            steps: &["define the metric", "log a first snapshot"],
            complexity: None,
        },
        IssueType::DealStale => ResolutionTemplate {
            id: "reengage-deal",
            title: "Re-engage the stale deal",
            steps: &["send a substantive update", "propose a concrete next step"],
            complexity: None,
        },
        IssueType::DealAtRisk => ResolutionTemplate {
            id: "derisk-deal",
            title: "De-risk the wobbling deal",
            steps: &["surface the open objection", "offer a reference call"],
            complexity: Some(0.3),
        },
        IssueType::DataMissing => ResolutionTemplate {
            id: "collect-financials",
            title: "Collect missing cash/burn figures",
            steps: &["request current figures", "record them with a timestamp"],
            complexity: None,
        },
        IssueType::DataNoTimestamp | IssueType::DataStale => ResolutionTemplate {
            id: "refresh-data",
            title: "Refresh stale company data",
            steps: &["ping the founder for an update", "stamp the refresh date"],
            complexity: None,
        },
        IssueType::NoGoals => ResolutionTemplate {
            id: "set-goals",
            title: "Agree on measurable goals",
            steps: &["pick 1-3 goals with dates", "record baselines"],
            complexity: None,
        },
    }
}

pub fn resolution_for_preissue(kind: PreIssueType) -> ResolutionTemplate {
    match kind {
        PreIssueType::RunwayBreach => ResolutionTemplate {
            id: "preempt-runway-breach",
            title: "Start the raise before runway forces it",
            steps: &[
                "lock the raise narrative",
                "open with tier-1 targets",
                "set weekly pipeline review",
            ],
            complexity: Some(0.7),
        },
        PreIssueType::GoalMiss => ResolutionTemplate {
            id: "course-correct-goal",
            title: "Course-correct before the goal slips",
            steps: &["re-forecast with current velocity", "decide scope vs date"],
            complexity: Some(0.4),
        },
        PreIssueType::DealStall => ResolutionTemplate {
            id: "revive-cooling-deal",
            title: "Revive the cooling deal",
            steps: &["share new traction data", "ask for explicit timeline"],
            complexity: None,
        },
    }
}

pub fn resolution_for_intro() -> ResolutionTemplate {
    ResolutionTemplate {
        id: "request-warm-intro",
        title: "Ask for a warm introduction",
        steps: &[
            "write a forwardable blurb",
            "confirm introducer is comfortable",
            "follow up within 48h of the connect",
        ],
        complexity: None,
    }
}

pub fn resolution_for_goal_review() -> ResolutionTemplate {
    ResolutionTemplate {
        id: "tighten-goal-execution",
        title: "Tighten execution on the at-risk goal",
        steps: &["review the plan against velocity", "remove one blocker this week"],
        complexity: None,
    }
}

// ============================================================================
// Action
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub action_id: String,
    pub title: String,
    pub entity: EntityRef,
    pub resolution_id: String,
    pub source: ActionSource,
    pub steps: Vec<String>,
    pub complexity: Option<f64>,
    /// Attached by the impact stage; None until then.
    pub impact: Option<ImpactModel>,
    pub created_at: DateTime<Utc>,
}

fn action(
    template: ResolutionTemplate,
    title: String,
    entity: EntityRef,
    source: ActionSource,
    now: DateTime<Utc>,
) -> Action {
    let action_id = ids::action_id_v1(
        entity.kind.as_str(),
        &entity.id,
        template.id,
        &[source.source_key()],
    );
    Action {
        action_id,
        title,
        entity,
        resolution_id: template.id.to_string(),
        source,
        steps: template.steps.iter().map(|s| s.to_string()).collect(),
        complexity: template.complexity,
        impact: None,
        created_at: now,
    }
}

/// Goal-review actions fire in this probability band: below it a GOAL_MISS
/// pre-issue already covers the goal, above it the goal needs no action.
const GOAL_REVIEW_BAND: (f64, f64) = (0.6, 0.85);

/// Generate candidate actions from every upstream signal.
///
/// Output is deduplicated by action id and sorted by id for determinism; the
/// ranking stage owns presentation order.
pub fn generate_candidates(
    company: &Company,
    issues: &[Issue],
    preissues: &[PreIssue],
    opportunities: &[IntroductionOpportunity],
    trajectories: &AHashMap<String, GoalTrajectory>,
    now: DateTime<Utc>,
    _config: &EngineConfig,
) -> Vec<Action> {
    let label = company.name.clone().unwrap_or_else(|| company.id.clone());
    let mut out: Vec<Action> = Vec::new();

    for issue in issues {
        let template = resolution_for_issue(issue.issue_type);
        let title = format!("{} — {label}", template.title);
        out.push(action(
            template,
            title,
            issue.entity.clone(),
            ActionSource::Issue {
                issue_id: issue.issue_id.clone(),
                issue_type: issue.issue_type,
                severity: issue.severity,
                ripple_score: crate::ripple::ripple_profile(issue.issue_type).0,
            },
            now,
        ));
    }

    for pre in preissues {
        let template = resolution_for_preissue(pre.pre_issue_type);
        let title = format!("{} — {label}", template.title);
        out.push(action(
            template,
            title,
            pre.entity.clone(),
            ActionSource::PreIssue {
                pre_issue_id: pre.pre_issue_id.clone(),
                pre_issue_type: pre.pre_issue_type,
                likelihood: pre.likelihood,
                days_until_escalation: pre.escalation.days_until_escalation,
                cost_multiplier: pre.cost_of_delay.cost_multiplier,
            },
            now,
        ));
    }

    for opp in opportunities {
        // Blocked opportunities were filtered upstream; assert the contract.
        debug_assert!(opp.timing != Timing::Never);
        let template = resolution_for_intro();
        let introducer = opp.path.first().map(String::as_str).unwrap_or("?");
        let target = opp.path.last().map(String::as_str).unwrap_or("?");
        let title = format!("Ask {introducer} for an intro to {target} — {label}");
        out.push(action(
            template,
            title,
            EntityRef::goal(&opp.goal_id),
            ActionSource::Introduction {
                opportunity_id: opp.id.clone(),
                probability: opp.probability,
                trust_score: opp.trust_risk.score,
                timing: opp.timing,
                path_length: opp.path_length,
            },
            now,
        ));
    }

    for goal in company.active_goals() {
        let Some(gt) = trajectories.get(&goal.id) else { continue };
        let p = gt.probability_of_hit;
        let in_band = p >= GOAL_REVIEW_BAND.0 && p < GOAL_REVIEW_BAND.1;
        let live = gt.days_left.is_none_or(|d| d >= 0.0);
        if in_band && live && gt.trajectory.on_track != Some(true) {
            let template = resolution_for_goal_review();
            let goal_label = goal.name.clone().unwrap_or_else(|| goal.id.clone());
            let title = format!("{} — {goal_label}", template.title);
            out.push(action(
                template,
                title,
                EntityRef::goal(&goal.id),
                ActionSource::Goal {
                    goal_id: goal.id.clone(),
                    probability_of_hit: p,
                    days_left: gt.days_left,
                    confidence: gt.trajectory.confidence,
                },
                now,
            ));
        }
    }

    out.sort_by(|a, b| a.action_id.cmp(&b.action_id));
    out.dedup_by(|a, b| a.action_id == b.action_id);
    out
}
