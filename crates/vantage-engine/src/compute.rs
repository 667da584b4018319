//! Top-level `compute`: the full derivation pipeline over one fact snapshot.
//!
//! Every derivation stage is a named DAG node with an explicit dependency
//! list; the executor runs them in deterministic topological order, once per
//! company. Companies are independent, so the portfolio is evaluated in
//! parallel with rayon — the only shared reads are the immutable global
//! collections (people, relationships, team).
//!
//! Error taxonomy:
//! - structural graph errors abort the whole computation (`Err`),
//! - validation failures are collected into `errors[]` and the computation
//!   continues (a non-empty `errors[]` means "do not trust this result"),
//! - missing data never fails; it surfaces as typed absence and issues,
//! - warnings (e.g. low-confidence runway) are collected separately and never
//!   affect ranking.

use std::collections::BTreeMap;

use ahash::AHashMap;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use vantage_model::{Company, Dataset};

use crate::actions::{generate_candidates, Action};
use crate::dag::{Engine, EngineError, GraphError, NodeView};
use crate::goal_trajectory::{assess_goal, GoalTrajectory};
use crate::impact::attach_impacts;
use crate::intro::{find_opportunities, IntroGlobals, IntroductionOpportunity};
use crate::issues::{detect_issues, IssueReport, SeverityCounts};
use crate::preissues::{detect_preissues, validate_preissue, PreIssue};
use crate::ranking::{rank_actions, RankedAction};
use crate::ripple::{aggregate_ripple, RippleAssessment};
use crate::runway::{compute_runway, Runway};
use crate::weights::EngineConfig;

// ============================================================================
// Node plumbing
// ============================================================================

/// Everything a node may read besides its declared dependencies.
pub struct CompanyInput<'a> {
    pub company: &'a Company,
    pub globals: IntroGlobals<'a>,
    pub now: DateTime<Utc>,
    pub config: &'a EngineConfig,
}

/// Sum type over stage outputs; the context map holds one per node.
pub enum NodeOutput {
    Runway(Runway),
    GoalTrajectories(AHashMap<String, GoalTrajectory>),
    Issues(IssueReport),
    PreIssues(Vec<PreIssue>),
    Ripple(RippleAssessment),
    IntroOpportunities(Vec<IntroductionOpportunity>),
    ActionCandidates(Vec<Action>),
    /// Actions with impacts attached, plus collected validation failures.
    Impact(Vec<Action>, Vec<String>),
    Ranking(Vec<RankedAction>),
}

impl NodeOutput {
    fn runway(&self) -> Result<&Runway> {
        match self {
            NodeOutput::Runway(r) => Ok(r),
            _ => Err(anyhow!("context entry is not a runway output")),
        }
    }

    fn trajectories(&self) -> Result<&AHashMap<String, GoalTrajectory>> {
        match self {
            NodeOutput::GoalTrajectories(t) => Ok(t),
            _ => Err(anyhow!("context entry is not a goal-trajectory output")),
        }
    }

    fn issues(&self) -> Result<&IssueReport> {
        match self {
            NodeOutput::Issues(i) => Ok(i),
            _ => Err(anyhow!("context entry is not an issue output")),
        }
    }

    fn preissues(&self) -> Result<&[PreIssue]> {
        match self {
            NodeOutput::PreIssues(p) => Ok(p),
            _ => Err(anyhow!("context entry is not a pre-issue output")),
        }
    }

    fn ripple(&self) -> Result<&RippleAssessment> {
        match self {
            NodeOutput::Ripple(r) => Ok(r),
            _ => Err(anyhow!("context entry is not a ripple output")),
        }
    }

    fn opportunities(&self) -> Result<&[IntroductionOpportunity]> {
        match self {
            NodeOutput::IntroOpportunities(o) => Ok(o),
            _ => Err(anyhow!("context entry is not an intro-opportunity output")),
        }
    }

    fn candidates(&self) -> Result<&[Action]> {
        match self {
            NodeOutput::ActionCandidates(a) => Ok(a),
            _ => Err(anyhow!("context entry is not an action-candidate output")),
        }
    }

    fn impact(&self) -> Result<(&[Action], &[String])> {
        match self {
            NodeOutput::Impact(a, e) => Ok((a, e)),
            _ => Err(anyhow!("context entry is not an impact output")),
        }
    }
}

type View<'v> = NodeView<'v, NodeOutput>;

/// Declare the derivation graph. The dependency lists are the contract: the
/// firewall in [`NodeView`] rejects any read a node did not declare.
fn build_engine<'a>() -> Engine<CompanyInput<'a>, NodeOutput> {
    let mut engine: Engine<CompanyInput<'a>, NodeOutput> = Engine::new();

    engine.register("runway", &[], |_ctx: &View<'_>, input| {
        Ok(NodeOutput::Runway(compute_runway(input.company, input.now, input.config)))
    });

    engine.register("goal_trajectories", &[], |_ctx: &View<'_>, input| {
        let trajectories = input
            .company
            .active_goals()
            .map(|g| (g.id.clone(), assess_goal(g, input.now)))
            .collect();
        Ok(NodeOutput::GoalTrajectories(trajectories))
    });

    engine.register(
        "issues",
        &["runway", "goal_trajectories"],
        |ctx: &View<'_>, input| {
            let runway = ctx.get("runway")?.runway()?;
            let trajectories = ctx.get("goal_trajectories")?.trajectories()?;
            Ok(NodeOutput::Issues(detect_issues(
                input.company,
                runway,
                trajectories,
                input.now,
                input.config,
            )))
        },
    );

    engine.register(
        "preissues",
        &["runway", "goal_trajectories"],
        |ctx: &View<'_>, input| {
            let runway = ctx.get("runway")?.runway()?;
            let trajectories = ctx.get("goal_trajectories")?.trajectories()?;
            Ok(NodeOutput::PreIssues(detect_preissues(
                input.company,
                runway,
                trajectories,
                input.now,
                input.config,
            )))
        },
    );

    engine.register("ripple", &["issues"], |ctx: &View<'_>, _input| {
        let report = ctx.get("issues")?.issues()?;
        Ok(NodeOutput::Ripple(aggregate_ripple(&report.issues)))
    });

    // Issues are a declared upstream of intro discovery even though blocked-
    // goal detection currently reads trajectories only.
    engine.register(
        "intro_opportunities",
        &["goal_trajectories", "issues"],
        |ctx: &View<'_>, input| {
            let trajectories = ctx.get("goal_trajectories")?.trajectories()?;
            Ok(NodeOutput::IntroOpportunities(find_opportunities(
                input.company,
                trajectories,
                &input.globals,
                input.now,
                input.config,
            )))
        },
    );

    engine.register(
        "action_candidates",
        &["issues", "preissues", "intro_opportunities", "goal_trajectories"],
        |ctx: &View<'_>, input| {
            let report = ctx.get("issues")?.issues()?;
            let preissues = ctx.get("preissues")?.preissues()?;
            let opportunities = ctx.get("intro_opportunities")?.opportunities()?;
            let trajectories = ctx.get("goal_trajectories")?.trajectories()?;
            Ok(NodeOutput::ActionCandidates(generate_candidates(
                input.company,
                &report.issues,
                preissues,
                opportunities,
                trajectories,
                input.now,
                input.config,
            )))
        },
    );

    engine.register(
        "impact",
        &["action_candidates", "ripple"],
        |ctx: &View<'_>, _input| {
            let candidates = ctx.get("action_candidates")?.candidates()?.to_vec();
            let ripple = ctx.get("ripple")?.ripple()?;
            let (actions, errors) = attach_impacts(candidates, ripple);
            let errors = errors.into_iter().map(|e| e.to_string()).collect();
            Ok(NodeOutput::Impact(actions, errors))
        },
    );

    engine.register("ranking", &["impact"], |ctx: &View<'_>, input| {
        let (actions, _) = ctx.get("impact")?.impact()?;
        Ok(NodeOutput::Ranking(rank_actions(actions, &input.config.ranking)))
    });

    engine
}

// ============================================================================
// Result surface
// ============================================================================

/// Flattened compatibility view of one ranked action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Priority {
    pub company_id: String,
    pub rank: usize,
    pub action_id: String,
    pub title: String,
    pub rank_score: f64,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyResult {
    pub company_id: String,
    pub company_name: Option<String>,
    pub runway: Runway,
    pub issues: IssueReport,
    pub pre_issues: Vec<PreIssue>,
    pub ripple: RippleAssessment,
    pub opportunities: Vec<IntroductionOpportunity>,
    /// The single canonical ordering; every other view derives from it.
    pub ranked_actions: Vec<RankedAction>,
    /// Top five by rank.
    pub today_actions: Vec<RankedAction>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeMeta {
    pub execution_order: Vec<String>,
    /// Issue counts by severity, aggregated across the portfolio.
    pub health: SeverityCounts,
    /// Ranked-action counts keyed by source kind.
    pub actions_by_source: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeResult {
    pub companies: Vec<CompanyResult>,
    pub priorities: Vec<Priority>,
    /// Non-empty means "do not trust this result"; the computation still ran.
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub meta: ComputeMeta,
}

struct Evaluation {
    result: CompanyResult,
    errors: Vec<String>,
    warnings: Vec<String>,
}

fn evaluate_company<'a>(
    engine: &Engine<CompanyInput<'a>, NodeOutput>,
    company: &'a Company,
    globals: IntroGlobals<'a>,
    now: DateTime<Utc>,
    config: &'a EngineConfig,
) -> Result<Evaluation, String> {
    let input = CompanyInput { company, globals, now, config };
    let outputs = engine.run(&input).map_err(|e| match e {
        EngineError::Node { node, source } => {
            format!("company {}: node `{node}` failed: {source}", company.id)
        }
        EngineError::Graph(g) => format!("company {}: {g}", company.id),
    })?;

    let take = |name: &str| -> Result<&NodeOutput, String> {
        outputs
            .get(name)
            .ok_or_else(|| format!("company {}: node `{name}` produced no output", company.id))
    };
    let as_err = |e: anyhow::Error| format!("company {}: {e}", company.id);

    let runway = take("runway")?.runway().map_err(as_err)?.clone();
    let issues = take("issues")?.issues().map_err(as_err)?.clone();
    let pre_issues = take("preissues")?.preissues().map_err(as_err)?.to_vec();
    let ripple = take("ripple")?.ripple().map_err(as_err)?.clone();
    let opportunities = take("intro_opportunities")?
        .opportunities()
        .map_err(as_err)?
        .to_vec();
    let (_, impact_errors) = take("impact")?.impact().map_err(as_err)?;
    let ranked_actions = match take("ranking")? {
        NodeOutput::Ranking(r) => r.clone(),
        _ => return Err(format!("company {}: ranking output has wrong type", company.id)),
    };

    let mut errors: Vec<String> = impact_errors
        .iter()
        .map(|e| format!("company {}: {e}", company.id))
        .collect();
    for pre in &pre_issues {
        if let Err(e) = validate_preissue(pre) {
            errors.push(format!("company {}: {e}", company.id));
        }
    }

    let mut warnings = Vec::new();
    if runway.low_confidence {
        warnings.push(format!(
            "company {}: runway computed from stale or undated financials",
            company.id
        ));
    }

    let today_actions: Vec<RankedAction> = ranked_actions.iter().take(5).cloned().collect();

    Ok(Evaluation {
        result: CompanyResult {
            company_id: company.id.clone(),
            company_name: company.name.clone(),
            runway,
            issues,
            pre_issues,
            ripple,
            opportunities,
            ranked_actions,
            today_actions,
        },
        errors,
        warnings,
    })
}

/// Run the full derivation pipeline over a fact snapshot.
///
/// `now` is the reference timestamp for every derived record; nothing in the
/// pipeline reads a system clock, so identical `(dataset, now, config)` yields
/// byte-identical output.
///
/// Returns `Err` only for structural graph errors. Everything else — node
/// failures, validation failures, missing data — lands in the result object.
pub fn compute(
    dataset: &Dataset,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<ComputeResult, GraphError> {
    let engine = build_engine();
    let execution_order = engine.execution_order()?;

    let globals = IntroGlobals {
        people: &dataset.people,
        relationships: &dataset.relationships,
        team: &dataset.team,
    };

    let evaluations: Vec<Result<Evaluation, String>> = dataset
        .companies
        .par_iter()
        .map(|company| evaluate_company(&engine, company, globals, now, config))
        .collect();

    let mut companies = Vec::with_capacity(evaluations.len());
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut health = SeverityCounts::default();
    let mut actions_by_source: BTreeMap<String, usize> = BTreeMap::new();
    let mut priorities = Vec::new();

    for evaluation in evaluations {
        match evaluation {
            Ok(eval) => {
                errors.extend(eval.errors);
                warnings.extend(eval.warnings);
                let result = eval.result;
                health.critical += result.issues.counts.critical;
                health.high += result.issues.counts.high;
                health.medium += result.issues.counts.medium;
                health.low += result.issues.counts.low;
                for ranked in &result.ranked_actions {
                    *actions_by_source
                        .entry(ranked.action.source.kind_str().to_string())
                        .or_insert(0) += 1;
                    priorities.push(Priority {
                        company_id: result.company_id.clone(),
                        rank: ranked.rank,
                        action_id: ranked.action.action_id.clone(),
                        title: ranked.action.title.clone(),
                        rank_score: ranked.rank_score,
                        source: ranked.action.source.kind_str().to_string(),
                    });
                }
                companies.push(result);
            }
            Err(message) => errors.push(message),
        }
    }

    tracing::info!(
        companies = companies.len(),
        errors = errors.len(),
        warnings = warnings.len(),
        "compute finished"
    );

    Ok(ComputeResult {
        companies,
        priorities,
        errors,
        warnings,
        meta: ComputeMeta { execution_order, health, actions_by_source },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn dataset(value: serde_json::Value) -> Dataset {
        serde_json::from_value(value).unwrap()
    }

    fn critical_company() -> serde_json::Value {
        json!({
            "id": "c1",
            "name": "Acme",
            "cash": 600_000.0,
            "burn": 150_000.0,
            "asOf": now()
        })
    }

    #[test]
    fn execution_order_respects_every_declared_dependency() {
        let engine = build_engine();
        let order = engine.execution_order().unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("runway") < pos("issues"));
        assert!(pos("goal_trajectories") < pos("issues"));
        assert!(pos("issues") < pos("ripple"));
        assert!(pos("issues") < pos("intro_opportunities"));
        assert!(pos("intro_opportunities") < pos("action_candidates"));
        assert!(pos("ripple") < pos("impact"));
        assert!(pos("action_candidates") < pos("impact"));
        assert!(pos("impact") < pos("ranking"));
    }

    #[test]
    fn runway_critical_flows_through_to_ranked_actions() {
        let data = dataset(json!({ "companies": [critical_company()] }));
        let result = compute(&data, now(), &EngineConfig::default()).unwrap();
        assert!(result.errors.is_empty());
        let company = &result.companies[0];
        assert_eq!(company.runway.months, Some(4.0));
        assert!(company.issues.counts.critical >= 1);
        assert!(!company.ranked_actions.is_empty());
        // Dense 1-indexed ranks.
        for (i, a) in company.ranked_actions.iter().enumerate() {
            assert_eq!(a.rank, i + 1);
        }
    }

    #[test]
    fn compute_is_deterministic() {
        let data = dataset(json!({
            "companies": [critical_company(), { "id": "c2", "name": "Beta" }]
        }));
        let config = EngineConfig::default();
        let a = serde_json::to_string(&compute(&data, now(), &config).unwrap()).unwrap();
        let b = serde_json::to_string(&compute(&data, now(), &config).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn today_actions_is_a_top_five_prefix() {
        let data = dataset(json!({ "companies": [critical_company()] }));
        let result = compute(&data, now(), &EngineConfig::default()).unwrap();
        let company = &result.companies[0];
        let expect = company.ranked_actions.len().min(5);
        assert_eq!(company.today_actions.len(), expect);
        for (t, r) in company.today_actions.iter().zip(&company.ranked_actions) {
            assert_eq!(t.action.action_id, r.action.action_id);
        }
    }

    #[test]
    fn stale_financials_produce_a_warning_not_an_error() {
        let data = dataset(json!({
            "companies": [{
                "id": "c1",
                "cash": 600_000.0,
                "burn": 150_000.0
                // no asOf
            }]
        }));
        let result = compute(&data, now(), &EngineConfig::default()).unwrap();
        assert!(result.errors.is_empty());
        assert!(result.warnings.iter().any(|w| w.contains("runway")));
    }

    #[test]
    fn missing_cash_is_an_issue_not_a_crash() {
        let data = dataset(json!({ "companies": [{ "id": "c1" }] }));
        let result = compute(&data, now(), &EngineConfig::default()).unwrap();
        let company = &result.companies[0];
        assert!(company.runway.months.is_none());
        assert!(company
            .issues
            .issues
            .iter()
            .any(|i| i.issue_type == crate::issues::IssueType::DataMissing));
    }

    #[test]
    fn meta_counts_actions_by_source() {
        let data = dataset(json!({ "companies": [critical_company()] }));
        let result = compute(&data, now(), &EngineConfig::default()).unwrap();
        let total: usize = result.meta.actions_by_source.values().sum();
        let ranked: usize = result.companies.iter().map(|c| c.ranked_actions.len()).sum();
        assert_eq!(total, ranked);
        assert!(result.meta.actions_by_source.contains_key("ISSUE"));
    }

    #[test]
    fn priorities_flatten_the_ranked_actions() {
        let data = dataset(json!({ "companies": [critical_company()] }));
        let result = compute(&data, now(), &EngineConfig::default()).unwrap();
        let ranked: usize = result.companies.iter().map(|c| c.ranked_actions.len()).sum();
        assert_eq!(result.priorities.len(), ranked);
        assert!(result.priorities.iter().all(|p| p.company_id == "c1"));
    }

    #[test]
    fn empty_dataset_computes_cleanly() {
        let result = compute(&Dataset::default(), now(), &EngineConfig::default()).unwrap();
        assert!(result.companies.is_empty());
        assert!(result.errors.is_empty());
        assert_eq!(result.meta.health, SeverityCounts::default());
    }
}
