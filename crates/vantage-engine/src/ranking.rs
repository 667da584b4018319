//! The single canonical ranking surface.
//!
//! `rank_actions` is the only function permitted to order actions anywhere in
//! the system. Any other derived number (expected net impact alone, raw
//! impact dimensions) may be displayed but must never independently drive
//! presentation order.
//!
//! The score decomposes into four components, all surfaced in
//! [`RankComponents`]:
//!
//! - expected net impact: probability-weighted upside plus second-order
//!   leverage, minus probability-weighted downside, effort and a capped
//!   time-to-impact penalty
//! - trust penalty: social-capital cost of introduction-sourced actions
//! - execution-friction penalty: step count plus optional complexity
//! - time-criticality boost: exponential bump inside a 28-day deadline window

use serde::{Deserialize, Serialize};

use crate::actions::{Action, ActionSource};
use crate::impact::ImpactModel;
use crate::weights::RankingWeights;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankComponents {
    pub expected_net_impact: f64,
    pub trust_penalty: f64,
    pub execution_friction_penalty: f64,
    pub time_criticality_boost: f64,
}

/// An action that survived impact attachment, with its canonical score and a
/// dense 1-indexed rank.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedAction {
    #[serde(flatten)]
    pub action: Action,
    pub rank_score: f64,
    pub rank_components: RankComponents,
    pub rank: usize,
}

/// Trust risk in [0,1] for the penalty term: introduction-sourced actions
/// carry their trust score scaled down, every other source costs nothing.
fn trust_risk_fraction(source: &ActionSource) -> f64 {
    match source {
        ActionSource::Introduction { trust_score, .. } => (trust_score / 100.0).clamp(0.0, 1.0),
        ActionSource::Issue { .. }
        | ActionSource::PreIssue { .. }
        | ActionSource::Goal { .. }
        | ActionSource::Manual { .. } => 0.0,
    }
}

/// Days until the source's deadline, where one exists.
fn days_until_deadline(source: &ActionSource) -> Option<f64> {
    match source {
        ActionSource::PreIssue { days_until_escalation, .. } => Some(*days_until_escalation),
        ActionSource::Goal { days_left, .. } => *days_left,
        ActionSource::Issue { .. }
        | ActionSource::Introduction { .. }
        | ActionSource::Manual { .. } => None,
    }
}

/// Score one action. The caller guarantees `impact` is attached.
pub fn score_action(
    action: &Action,
    impact: &ImpactModel,
    weights: &RankingWeights,
) -> (f64, RankComponents) {
    let combined = impact.execution_probability * impact.probability_of_success;
    let expected_upside = impact.upside_magnitude * combined;
    let expected_downside = impact.downside_magnitude * (1.0 - combined);
    let time_penalty = (impact.time_to_impact_days / weights.time_penalty_divisor)
        .min(weights.time_penalty_cap);
    let expected_net_impact = expected_upside + impact.second_order_leverage
        - expected_downside
        - impact.effort_cost
        - time_penalty;

    let trust = trust_risk_fraction(&action.source);
    let trust_penalty = (trust - weights.trust_floor).max(0.0) * weights.trust_scale;

    let mut execution_friction_penalty =
        action.steps.len().min(weights.max_steps) as f64 * weights.step_penalty;
    if let Some(complexity) = action.complexity {
        execution_friction_penalty += complexity * weights.complexity_scale;
    }

    let time_criticality_boost = match days_until_deadline(&action.source) {
        Some(days) if days > 0.0 && days <= weights.boost_window_days => {
            weights.boost_scale * (-days / weights.boost_tau).exp()
        }
        _ => 0.0,
    };

    let rank_score =
        expected_net_impact - trust_penalty - execution_friction_penalty + time_criticality_boost;
    (
        rank_score,
        RankComponents {
            expected_net_impact,
            trust_penalty,
            execution_friction_penalty,
            time_criticality_boost,
        },
    )
}

/// Rank every action that carries an impact model. Actions without one never
/// reach the surface (their validation failure was already collected).
///
/// Sort is descending by score, with scores quantized to the tie epsilon;
/// within a tie bucket order is ascending lexical action id. Ranks are dense
/// and 1-indexed.
pub fn rank_actions(actions: &[Action], weights: &RankingWeights) -> Vec<RankedAction> {
    let mut ranked: Vec<RankedAction> = actions
        .iter()
        .filter_map(|action| {
            let impact = action.impact.as_ref()?;
            let (rank_score, rank_components) = score_action(action, impact, weights);
            Some(RankedAction {
                action: action.clone(),
                rank_score,
                rank_components,
                rank: 0,
            })
        })
        .collect();

    // Scores are bucketed by the tie epsilon before comparing, so the
    // comparator is a strict weak ordering even across a chain of near-ties;
    // within a bucket the action id decides.
    let epsilon = weights.tie_epsilon;
    let bucket = |score: f64| (score / epsilon).round() as i64;
    ranked.sort_by(|a, b| {
        bucket(b.rank_score)
            .cmp(&bucket(a.rank_score))
            .then_with(|| a.action.action_id.cmp(&b.action.action_id))
    });
    for (i, entry) in ranked.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    ranked
}
