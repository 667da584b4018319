//! Impact-model attachment: seven independent dimensions per action, derived
//! by source type, plus a bounded, non-empty explanation array.
//!
//! Bounds are hard-validated: an out-of-range dimension or an explain array
//! outside 2..=6 non-empty entries is a [`ValidationError`], collected into
//! the compute result. An action whose impact fails validation keeps
//! `impact: None` and therefore never reaches the ranking surface.

use serde::{Deserialize, Serialize};

use crate::actions::{Action, ActionSource};
use crate::intro::Timing;
use crate::issues::IssueType;
use crate::ripple::RippleAssessment;
use crate::validate::{check_bounds, check_explain, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactModel {
    /// Value created if the action works, [0,100].
    pub upside_magnitude: f64,
    /// Probability the action achieves its aim once executed, [0,1].
    pub probability_of_success: f64,
    /// Probability the action actually gets executed, [0,1].
    pub execution_probability: f64,
    /// Value destroyed if it backfires, [0,100].
    pub downside_magnitude: f64,
    /// Days until the effect lands, [0,∞).
    pub time_to_impact_days: f64,
    /// Operator effort consumed, [0,100].
    pub effort_cost: f64,
    /// Compounding second-order value (network effects, option value), [0,100].
    pub second_order_leverage: f64,
    /// 2–6 non-empty human-readable reasons.
    pub explain: Vec<String>,
}

/// Hard-validate every dimension and the explain array.
pub fn validate_impact(record: &str, m: &ImpactModel) -> Result<(), ValidationError> {
    check_bounds(record, "upsideMagnitude", m.upside_magnitude, 0.0, 100.0)?;
    check_bounds(record, "probabilityOfSuccess", m.probability_of_success, 0.0, 1.0)?;
    check_bounds(record, "executionProbability", m.execution_probability, 0.0, 1.0)?;
    check_bounds(record, "downsideMagnitude", m.downside_magnitude, 0.0, 100.0)?;
    check_bounds(record, "timeToImpactDays", m.time_to_impact_days, 0.0, f64::INFINITY)?;
    check_bounds(record, "effortCost", m.effort_cost, 0.0, 100.0)?;
    check_bounds(record, "secondOrderLeverage", m.second_order_leverage, 0.0, 100.0)?;
    check_explain(record, &m.explain, 2, 6)?;
    Ok(())
}

fn effort_cost(steps: usize, complexity: Option<f64>) -> f64 {
    (steps as f64 * 8.0 + complexity.unwrap_or(0.0) * 30.0).min(100.0)
}

fn issue_time_to_impact(issue_type: IssueType) -> f64 {
    match issue_type {
        IssueType::DataMissing | IssueType::DataNoTimestamp | IssueType::DataStale => 2.0,
        IssueType::GoalNoHistory | IssueType::NoGoals => 5.0,
        IssueType::DealStale | IssueType::DealAtRisk => 7.0,
        IssueType::GoalBehind | IssueType::GoalStalled | IssueType::GoalMissed => 21.0,
        IssueType::PipelineGap | IssueType::NoPipeline => 45.0,
        IssueType::RunwayWarning | IssueType::RunwayCritical => 60.0,
    }
}

fn issue_success(issue_type: IssueType) -> (f64, f64) {
    // (probability of success, execution probability)
    match issue_type {
        IssueType::DataMissing | IssueType::DataNoTimestamp | IssueType::DataStale => (0.9, 0.95),
        IssueType::GoalNoHistory | IssueType::NoGoals => (0.85, 0.9),
        IssueType::DealStale | IssueType::DealAtRisk => (0.6, 0.8),
        IssueType::GoalBehind | IssueType::GoalStalled | IssueType::GoalMissed => (0.55, 0.7),
        IssueType::PipelineGap | IssueType::NoPipeline => (0.5, 0.65),
        IssueType::RunwayWarning | IssueType::RunwayCritical => (0.5, 0.55),
    }
}

/// Derive the impact model for one action from its source. Exhaustive over
/// [`ActionSource`]: adding a variant forces a derivation rule here.
pub fn derive_impact(action: &Action, ripple: &RippleAssessment) -> ImpactModel {
    let steps = action.steps.len();
    match &action.source {
        ActionSource::Issue { issue_type, severity, ripple_score, .. } => {
            let level = severity.level() as f64;
            let (success, execution) = issue_success(*issue_type);
            let mut explain = vec![
                format!(
                    "resolves a severity-{level:.0} {} issue",
                    issue_type.as_str()
                ),
                format!("downstream ripple {ripple_score:.2} if left open"),
            ];
            explain.extend(ripple.explanations.iter().take(2).cloned());
            ImpactModel {
                upside_magnitude: (30.0 + level * 15.0 + ripple_score * 10.0).min(100.0),
                probability_of_success: success,
                execution_probability: execution,
                downside_magnitude: (5.0 + level * 5.0 + ripple.score * 10.0).min(100.0),
                time_to_impact_days: issue_time_to_impact(*issue_type),
                effort_cost: effort_cost(steps, action.complexity),
                second_order_leverage: (ripple_score * 60.0).min(100.0),
                explain,
            }
        }
        ActionSource::PreIssue {
            pre_issue_type,
            likelihood,
            days_until_escalation,
            cost_multiplier,
            ..
        } => ImpactModel {
            upside_magnitude: (35.0 + likelihood * 40.0 + (cost_multiplier - 1.0) * 10.0)
                .clamp(0.0, 100.0),
            // Acting before the breach is easier than acting after it.
            probability_of_success: (0.8 - 0.3 * likelihood).clamp(0.0, 1.0),
            execution_probability: 0.7,
            downside_magnitude: (10.0 + likelihood * 20.0).min(100.0),
            time_to_impact_days: (days_until_escalation * 0.5).max(1.0),
            effort_cost: effort_cost(steps, action.complexity),
            second_order_leverage: (20.0 + (cost_multiplier - 1.0) * 15.0).clamp(0.0, 100.0),
            explain: vec![
                format!(
                    "preempts a {} forecast at {likelihood:.2} likelihood",
                    pre_issue_type.as_str()
                ),
                format!("{days_until_escalation:.0} days before intervention stops working"),
                format!("waiting multiplies cost {cost_multiplier:.1}x"),
            ],
        },
        ActionSource::Goal { probability_of_hit, days_left, confidence, .. } => ImpactModel {
            upside_magnitude: (25.0 + (1.0 - probability_of_hit) * 40.0).min(100.0),
            probability_of_success: (0.4 + 0.4 * confidence).clamp(0.0, 1.0),
            execution_probability: 0.75,
            downside_magnitude: 8.0,
            time_to_impact_days: days_left.map_or(30.0, |d| (d * 0.5).max(1.0)),
            effort_cost: effort_cost(steps, action.complexity),
            second_order_leverage: 15.0,
            explain: vec![
                format!("goal sits at {probability_of_hit:.2} probability of hit"),
                "small course corrections now avoid a rescue later".to_string(),
            ],
        },
        ActionSource::Introduction {
            probability,
            trust_score,
            timing,
            path_length,
            ..
        } => ImpactModel {
            upside_magnitude: (40.0 + probability * 50.0).min(100.0),
            probability_of_success: probability.clamp(0.0, 1.0),
            execution_probability: (0.9 - trust_score / 200.0).clamp(0.3, 0.95),
            downside_magnitude: (trust_score * 0.4).min(100.0),
            time_to_impact_days: match timing {
                Timing::Now => 3.0,
                Timing::Soon => 10.0,
                Timing::Later => 30.0,
                Timing::Never => f64::INFINITY, // filtered upstream
            },
            effort_cost: (10.0 + *path_length as f64 * 5.0).min(100.0),
            second_order_leverage: (50.0 + *path_length as f64 * 10.0).min(100.0),
            explain: vec![
                format!("warm path converts at ~{probability:.2} vs cold outreach"),
                format!("spends {trust_score:.0}/100 social capital"),
                "a successful intro compounds future network reach".to_string(),
            ],
        },
        ActionSource::Manual { note } => ImpactModel {
            upside_magnitude: 40.0,
            probability_of_success: 0.5,
            execution_probability: 0.8,
            downside_magnitude: 10.0,
            time_to_impact_days: 14.0,
            effort_cost: effort_cost(steps, action.complexity),
            second_order_leverage: 10.0,
            explain: vec![
                format!("manually queued: {note}"),
                "operator judgement call".to_string(),
            ],
        },
    }
}

/// Attach impacts to every candidate. Validation failures are collected and
/// the offending action keeps `impact: None`.
pub fn attach_impacts(
    mut actions: Vec<Action>,
    ripple: &RippleAssessment,
) -> (Vec<Action>, Vec<ValidationError>) {
    let mut errors = Vec::new();
    for action in &mut actions {
        let impact = derive_impact(action, ripple);
        let record = format!("action {}", action.action_id);
        match validate_impact(&record, &impact) {
            Ok(()) => action.impact = Some(impact),
            Err(e) => errors.push(e),
        }
    }
    (actions, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{resolution_for_intro, resolution_for_issue};
    use crate::issues::Severity;
    use chrono::{TimeZone, Utc};
    use vantage_model::EntityRef;

    fn ripple() -> RippleAssessment {
        RippleAssessment { score: 0.9, explanations: vec!["raise slips".to_string()] }
    }

    fn action_with(source: ActionSource) -> Action {
        let template = match source {
            ActionSource::Introduction { .. } => resolution_for_intro(),
            _ => resolution_for_issue(IssueType::RunwayCritical),
        };
        Action {
            action_id: "actfnv1a64:0000000000000000".to_string(),
            title: "t".to_string(),
            entity: EntityRef::company("c1"),
            resolution_id: template.id.to_string(),
            source,
            steps: template.steps.iter().map(|s| s.to_string()).collect(),
            complexity: template.complexity,
            impact: None,
            created_at: Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap(),
        }
    }

    fn issue_source() -> ActionSource {
        ActionSource::Issue {
            issue_id: "issuefnv1a64:1".to_string(),
            issue_type: IssueType::RunwayCritical,
            severity: Severity::Critical,
            ripple_score: 0.9,
        }
    }

    #[test]
    fn all_dimensions_are_in_bounds_for_every_source() {
        let sources = vec![
            issue_source(),
            ActionSource::PreIssue {
                pre_issue_id: "prefnv1a64:1".to_string(),
                pre_issue_type: crate::preissues::PreIssueType::RunwayBreach,
                likelihood: 0.8,
                days_until_escalation: 12.0,
                cost_multiplier: 2.7,
            },
            ActionSource::Goal {
                goal_id: "g1".to_string(),
                probability_of_hit: 0.7,
                days_left: Some(40.0),
                confidence: 0.6,
            },
            ActionSource::Introduction {
                opportunity_id: "introfnv1a64:1".to_string(),
                probability: 0.6,
                trust_score: 25.0,
                timing: Timing::Now,
                path_length: 2,
            },
            ActionSource::Manual { note: "call the founder".to_string() },
        ];
        for source in sources {
            let a = action_with(source);
            let m = derive_impact(&a, &ripple());
            validate_impact("test", &m).unwrap();
            assert!((2..=6).contains(&m.explain.len()));
        }
    }

    #[test]
    fn critical_issue_has_bigger_upside_than_low() {
        let mut low = issue_source();
        if let ActionSource::Issue { severity, ripple_score, .. } = &mut low {
            *severity = Severity::Low;
            *ripple_score = 0.1;
        }
        let high = derive_impact(&action_with(issue_source()), &ripple());
        let small = derive_impact(&action_with(low), &ripple());
        assert!(high.upside_magnitude > small.upside_magnitude);
    }

    #[test]
    fn trust_cost_shows_up_as_intro_downside() {
        let cheap = ActionSource::Introduction {
            opportunity_id: "i".to_string(),
            probability: 0.5,
            trust_score: 10.0,
            timing: Timing::Now,
            path_length: 1,
        };
        let pricey = ActionSource::Introduction {
            opportunity_id: "i".to_string(),
            probability: 0.5,
            trust_score: 70.0,
            timing: Timing::Now,
            path_length: 1,
        };
        let a = derive_impact(&action_with(cheap), &ripple());
        let b = derive_impact(&action_with(pricey), &ripple());
        assert!(b.downside_magnitude > a.downside_magnitude);
        assert!(b.execution_probability < a.execution_probability);
    }

    #[test]
    fn empty_explain_fails_validation_hard() {
        let mut m = derive_impact(&action_with(issue_source()), &ripple());
        m.explain.clear();
        assert!(validate_impact("test", &m).is_err());
    }

    #[test]
    fn out_of_bounds_dimension_is_collected_not_defaulted() {
        let a = action_with(issue_source());
        let mut m = derive_impact(&a, &ripple());
        m.probability_of_success = 1.7;
        let err = validate_impact("test", &m).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfBounds { .. }));
    }

    #[test]
    fn attach_impacts_fills_every_valid_action() {
        let actions = vec![action_with(issue_source())];
        let (actions, errors) = attach_impacts(actions, &ripple());
        assert!(errors.is_empty());
        assert!(actions.iter().all(|a| a.impact.is_some()));
    }
}
