//! Pre-issue forecaster: *future* gaps that have not yet materialized.
//!
//! Three classes: runway breach, goal miss, deal stall. Each pre-issue
//! carries an **escalation window** (when intervention stops being effective,
//! computed as breach time minus a type-specific lead buffer) and a
//! **cost-of-delay curve** (piecewise multiplier that grows as the escalation
//! date approaches, unbounded past it).
//!
//! Invariants:
//! - `escalation.days_until_escalation ≤ time_to_breach_days` (the
//!   intervention buffer precedes the breach)
//! - the cost multiplier is monotonically non-decreasing as
//!   days-until-escalation decreases (property-tested)

use ahash::AHashMap;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use vantage_model::{ids, Company, EntityRef};

use crate::goal_trajectory::GoalTrajectory;
use crate::runway::Runway;
use crate::trajectory::days_between;
use crate::validate::{check_bounds, check_explain, ValidationError};
use crate::weights::{CostOfDelayTable, EngineConfig, DAYS_PER_MONTH};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreIssueType {
    RunwayBreach,
    GoalMiss,
    DealStall,
}

impl PreIssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            PreIssueType::RunwayBreach => "RUNWAY_BREACH",
            PreIssueType::GoalMiss => "GOAL_MISS",
            PreIssueType::DealStall => "DEAL_STALL",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Escalation {
    pub escalation_date: DateTime<Utc>,
    pub days_until_escalation: f64,
    /// Within the imminence window (default ≤ 7 days).
    pub is_imminent: bool,
}

/// Label for the band the current delay cost falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostCurveBand {
    Flat,
    Elevated,
    Urgent,
    Critical,
    Overdue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostOfDelay {
    pub cost_multiplier: f64,
    pub cost_curve: CostCurveBand,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreIssue {
    pub pre_issue_id: String,
    pub pre_issue_type: PreIssueType,
    pub entity: EntityRef,
    /// Probability the gap materializes if nothing is done, [0,1].
    pub likelihood: f64,
    pub time_to_breach_days: f64,
    pub escalation: Escalation,
    pub cost_of_delay: CostOfDelay,
    pub explain: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

/// Validate a pre-issue. Both escalation and cost-of-delay are mandatory by
/// construction in Rust; what remains checkable is the likelihood range and
/// the explain array.
pub fn validate_preissue(p: &PreIssue) -> Result<(), ValidationError> {
    let record = format!("preissue {}", p.pre_issue_id);
    check_bounds(&record, "likelihood", p.likelihood, 0.0, 1.0)?;
    check_bounds(&record, "timeToBreachDays", p.time_to_breach_days, 0.0, f64::INFINITY)?;
    check_explain(&record, &p.explain, 1, 6)?;
    Ok(())
}

// ============================================================================
// Cost-of-delay curve
// ============================================================================

/// Piecewise cost multiplier as a function of days until escalation:
/// flat 1.0 beyond `flat_days`, then rising band by band to `peak` at the
/// escalation date, then growing without bound past it. Scaled by the
/// per-type multiplier last.
pub fn cost_multiplier(days_until_escalation: f64, table: &CostOfDelayTable, kind: PreIssueType) -> f64 {
    let d = days_until_escalation;
    let base = if d >= table.flat_days {
        1.0
    } else if d >= table.mid_days {
        let t = (table.flat_days - d) / (table.flat_days - table.mid_days);
        1.0 + t * (table.mid_max - 1.0)
    } else if d >= table.near_days {
        let t = (table.mid_days - d) / (table.mid_days - table.near_days);
        table.mid_max + t * (table.near_max - table.mid_max)
    } else if d >= 0.0 {
        let t = (table.near_days - d) / table.near_days;
        table.near_max + t * (table.peak - table.near_max)
    } else {
        table.peak + (-d) * table.overdue_slope
    };
    base * type_multiplier(table, kind)
}

fn type_multiplier(table: &CostOfDelayTable, kind: PreIssueType) -> f64 {
    match kind {
        PreIssueType::RunwayBreach => table.runway_multiplier,
        PreIssueType::GoalMiss => table.goal_multiplier,
        PreIssueType::DealStall => table.deal_multiplier,
    }
}

fn cost_band(days_until_escalation: f64, table: &CostOfDelayTable) -> CostCurveBand {
    let d = days_until_escalation;
    if d >= table.flat_days {
        CostCurveBand::Flat
    } else if d >= table.mid_days {
        CostCurveBand::Elevated
    } else if d >= table.near_days {
        CostCurveBand::Urgent
    } else if d >= 0.0 {
        CostCurveBand::Critical
    } else {
        CostCurveBand::Overdue
    }
}

fn escalation(
    time_to_breach_days: f64,
    buffer_days: f64,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Escalation {
    let delta_days = (time_to_breach_days - buffer_days).max(0.0);
    Escalation {
        escalation_date: now + Duration::seconds((delta_days * 86_400.0) as i64),
        days_until_escalation: delta_days,
        is_imminent: delta_days <= config.preissue.imminent_days,
    }
}

// ============================================================================
// Detection
// ============================================================================

fn preissue(
    kind: PreIssueType,
    entity: EntityRef,
    stable_key: &str,
    likelihood: f64,
    time_to_breach_days: f64,
    buffer_days: f64,
    explain: Vec<String>,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> PreIssue {
    let escalation = escalation(time_to_breach_days, buffer_days, now, config);
    let cost_of_delay = CostOfDelay {
        cost_multiplier: cost_multiplier(
            escalation.days_until_escalation,
            &config.cost_of_delay,
            kind,
        ),
        cost_curve: cost_band(escalation.days_until_escalation, &config.cost_of_delay),
    };
    let pre_issue_id =
        ids::preissue_id_v1(kind.as_str(), entity.kind.as_str(), &entity.id, stable_key);
    PreIssue {
        pre_issue_id,
        pre_issue_type: kind,
        entity,
        likelihood: likelihood.clamp(0.0, 1.0),
        time_to_breach_days,
        escalation,
        cost_of_delay,
        explain,
        detected_at: now,
    }
}

/// Forecast pre-issues for one company.
pub fn detect_preissues(
    company: &Company,
    runway: &Runway,
    trajectories: &AHashMap<String, GoalTrajectory>,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Vec<PreIssue> {
    let mut out = Vec::new();

    // Runway breach: finite runway under the raise-lead threshold.
    if let Some(months) = runway.months {
        if months < config.runway.breach_months {
            let likelihood = if months < config.runway.critical_months { 0.8 } else { 0.5 };
            let time_to_breach = (months * DAYS_PER_MONTH).max(0.0);
            out.push(preissue(
                PreIssueType::RunwayBreach,
                EntityRef::company(&company.id),
                "runway",
                likelihood,
                time_to_breach,
                config.preissue.runway_buffer_days,
                vec![
                    format!("{months:.1} months of runway left"),
                    format!(
                        "a raise takes ~{:.0} days of lead time",
                        config.preissue.runway_buffer_days
                    ),
                ],
                now,
                config,
            ));
        }
    }

    // Goal miss: hit probability has decayed but the goal is still live.
    for goal in company.active_goals() {
        let Some(gt) = trajectories.get(&goal.id) else { continue };
        let p = gt.probability_of_hit;
        let days_left = gt.days_left.unwrap_or(-1.0);
        if p > 0.0
            && p < config.preissue.goal_miss_probability
            && gt.trajectory.on_track != Some(true)
            && days_left >= 0.0
        {
            out.push(preissue(
                PreIssueType::GoalMiss,
                EntityRef::goal(&goal.id),
                &goal.id,
                1.0 - p,
                days_left,
                config.preissue.goal_buffer_days,
                vec![
                    format!("probability of hit has fallen to {p:.2}"),
                    format!("{days_left:.0} days left to the due date"),
                ],
                now,
                config,
            ));
        }
    }

    // Deal stall: untouched past the stall window, breach when it goes cold.
    for deal in &company.deals {
        if deal.status.is_closed() {
            continue;
        }
        let Some(as_of) = deal.as_of else { continue };
        let staleness = days_between(as_of, now);
        if staleness > config.freshness.deal_stall_days {
            let likelihood = (0.3
                + 0.6 * ((staleness - config.freshness.deal_stall_days) / 60.0))
                .min(0.9);
            let time_to_breach = (config.freshness.deal_cold_days - staleness).max(0.0);
            out.push(preissue(
                PreIssueType::DealStall,
                EntityRef::deal(&deal.id),
                &deal.id,
                likelihood,
                time_to_breach,
                config.preissue.deal_buffer_days,
                vec![
                    format!("no update in {staleness:.0} days"),
                    format!(
                        "deal likely cold at {:.0} days untouched",
                        config.freshness.deal_cold_days
                    ),
                ],
                now,
                config,
            ));
        }
    }

    // Likelihood desc, id asc for determinism.
    out.sort_by(|a, b| {
        b.likelihood
            .partial_cmp(&a.likelihood)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.pre_issue_id.cmp(&b.pre_issue_id))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal_trajectory::assess_goal;
    use crate::runway::compute_runway;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn detect(company: &Company) -> Vec<PreIssue> {
        let config = EngineConfig::default();
        let runway = compute_runway(company, now(), &config);
        let trajectories: AHashMap<String, GoalTrajectory> = company
            .goals
            .iter()
            .map(|g| (g.id.clone(), assess_goal(g, now())))
            .collect();
        detect_preissues(company, &runway, &trajectories, now(), &config)
    }

    fn company(value: serde_json::Value) -> Company {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn short_runway_forecasts_breach_with_high_likelihood() {
        let c = company(json!({
            "id": "c1", "cash": 600_000.0, "burn": 150_000.0, "asOf": now()
        }));
        let pre = detect(&c);
        let breach = pre
            .iter()
            .find(|p| p.pre_issue_type == PreIssueType::RunwayBreach)
            .unwrap();
        assert_relative_eq!(breach.likelihood, 0.8);
        // 4 months ≈ 121.8 days to breach, 90-day raise buffer.
        assert!(breach.escalation.days_until_escalation <= breach.time_to_breach_days);
        assert!(!breach.escalation.is_imminent);
        assert!(validate_preissue(breach).is_ok());
    }

    #[test]
    fn eight_month_runway_has_moderate_likelihood() {
        let c = company(json!({
            "id": "c1", "cash": 800_000.0, "burn": 100_000.0, "asOf": now()
        }));
        let pre = detect(&c);
        let breach = pre
            .iter()
            .find(|p| p.pre_issue_type == PreIssueType::RunwayBreach)
            .unwrap();
        assert_relative_eq!(breach.likelihood, 0.5);
        // 8 months out, the 90-day buffer is nearly consumed.
        assert!(breach.escalation.days_until_escalation < breach.time_to_breach_days);
    }

    #[test]
    fn healthy_runway_forecasts_nothing() {
        let c = company(json!({
            "id": "c1", "cash": 2_400_000.0, "burn": 100_000.0, "asOf": now()
        }));
        assert!(detect(&c).is_empty());
    }

    #[test]
    fn behind_goal_forecasts_goal_miss() {
        let c = company(json!({
            "id": "c1", "cash": 2_400_000.0, "burn": 100_000.0, "asOf": now(),
            "goals": [{
                "id": "g1", "type": "revenue",
                "current": 20.0, "target": 100.0,
                "due": now() + chrono::Duration::days(20),
                "history": [
                    { "value": 10.0, "asOf": now() - chrono::Duration::days(30) },
                    { "value": 20.0, "asOf": now() - chrono::Duration::days(1) }
                ]
            }]
        }));
        let pre = detect(&c);
        let miss = pre
            .iter()
            .find(|p| p.pre_issue_type == PreIssueType::GoalMiss)
            .unwrap();
        assert!(miss.likelihood > 0.4);
        assert!(miss.escalation.days_until_escalation <= miss.time_to_breach_days);
        assert!(validate_preissue(miss).is_ok());
    }

    #[test]
    fn stalling_deal_likelihood_scales_with_staleness() {
        let make = |days: i64| {
            company(json!({
                "id": "c1", "cash": 2_400_000.0, "burn": 100_000.0, "asOf": now(),
                "deals": [{
                    "id": "d1", "status": "meeting", "probability": 50.0,
                    "amount": 1_000_000.0,
                    "asOf": now() - chrono::Duration::days(days)
                }]
            }))
        };
        let fresh = detect(&make(10));
        assert!(fresh.iter().all(|p| p.pre_issue_type != PreIssueType::DealStall));

        let fifteen = detect(&make(15));
        let sixty = detect(&make(60));
        let cold = detect(&make(120));
        let l15 = fifteen[0].likelihood;
        let l60 = sixty[0].likelihood;
        assert!(l15 < l60);
        // 0.3 + 0.6 × (46/60)
        assert_relative_eq!(l60, 0.76, epsilon = 1e-9);
        // The ramp caps at 0.9 once the deal is thoroughly cold.
        assert_relative_eq!(cold[0].likelihood, 0.9, epsilon = 1e-9);
    }

    #[test]
    fn escalation_never_exceeds_breach() {
        let c = company(json!({
            "id": "c1", "cash": 100_000.0, "burn": 100_000.0, "asOf": now(),
            "deals": [{
                "id": "d1", "status": "contacted", "probability": 40.0,
                "amount": 500_000.0, "asOf": now() - chrono::Duration::days(44)
            }]
        }));
        for p in detect(&c) {
            assert!(
                p.escalation.days_until_escalation <= p.time_to_breach_days,
                "{:?}",
                p.pre_issue_type
            );
        }
    }

    #[test]
    fn one_month_runway_is_imminent_and_overdue_priced() {
        let c = company(json!({
            "id": "c1", "cash": 100_000.0, "burn": 100_000.0, "asOf": now()
        }));
        let pre = detect(&c);
        let breach = &pre[0];
        // ~30 days to breach with a 90-day buffer: escalation already passed.
        assert_relative_eq!(breach.escalation.days_until_escalation, 0.0);
        assert!(breach.escalation.is_imminent);
        assert!(breach.cost_of_delay.cost_multiplier >= 5.0);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Monotonic invariant: less time until escalation never costs less.
            #[test]
            fn cost_is_non_decreasing_as_escalation_nears(
                a in -60.0f64..120.0,
                b in -60.0f64..120.0,
            ) {
                let table = CostOfDelayTable::default();
                for kind in [
                    PreIssueType::RunwayBreach,
                    PreIssueType::GoalMiss,
                    PreIssueType::DealStall,
                ] {
                    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                    let cost_hi_days = cost_multiplier(hi, &table, kind);
                    let cost_lo_days = cost_multiplier(lo, &table, kind);
                    prop_assert!(cost_lo_days >= cost_hi_days - 1e-12);
                }
            }

            #[test]
            fn cost_is_at_least_the_type_multiplier(d in -30.0f64..200.0) {
                let table = CostOfDelayTable::default();
                prop_assert!(cost_multiplier(d, &table, PreIssueType::GoalMiss) >= 1.0 - 1e-12);
                prop_assert!(
                    cost_multiplier(d, &table, PreIssueType::RunwayBreach)
                        >= table.runway_multiplier - 1e-12
                );
            }
        }
    }

    #[test]
    fn validation_rejects_empty_explain() {
        let c = company(json!({
            "id": "c1", "cash": 600_000.0, "burn": 150_000.0, "asOf": now()
        }));
        let mut p = detect(&c).remove(0);
        p.explain.clear();
        assert!(validate_preissue(&p).is_err());
    }
}
