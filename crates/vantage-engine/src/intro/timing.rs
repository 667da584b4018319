//! Timing recommendation for an introduction: NOW / SOON / LATER / NEVER.
//!
//! A weighted heuristic over goal distance, time pressure, trajectory
//! velocity, fundraise seasonality, trust risk and success probability.
//! LATER is the default under uncertainty. NEVER is a hard block applied
//! when trust risk alone exceeds the block threshold, regardless of every
//! other factor.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use vantage_model::GoalType;

use crate::goal_trajectory::GoalTrajectory;
use crate::intro::trust::TrustRisk;
use crate::weights::{TimingWeights, TrustWeights};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Timing {
    Now,
    Soon,
    Later,
    Never,
}

/// Recommend when (if ever) to make the ask.
pub fn recommend_timing(
    goal_type: GoalType,
    goal: &GoalTrajectory,
    trust: &TrustRisk,
    probability: f64,
    now: DateTime<Utc>,
    weights: &TimingWeights,
    trust_weights: &TrustWeights,
) -> (Timing, Vec<String>) {
    let mut rationale = Vec::new();

    if trust.is_blocking(trust_weights) {
        rationale.push(format!(
            "trust risk {:.0} exceeds block threshold {:.0}",
            trust.score, trust_weights.block_threshold
        ));
        return (Timing::Never, rationale);
    }

    let days_left = goal.days_left.unwrap_or(f64::INFINITY);

    // Goal distance: close deadlines push toward asking now.
    let goal_distance = if days_left <= weights.urgent_days {
        1.0
    } else {
        (weights.urgent_days / days_left).clamp(0.0, 1.0)
    };
    if days_left.is_finite() && days_left <= weights.urgent_days {
        rationale.push(format!("{days_left:.0} days left on the goal"));
    }

    // Time pressure: overall closeness to the due date on a 120-day scale.
    let time_pressure = if days_left.is_finite() {
        1.0 - (days_left / 120.0).clamp(0.0, 1.0)
    } else {
        0.0
    };

    // Velocity: a goal falling behind needs outside help sooner.
    let velocity = match goal.trajectory.on_track {
        Some(false) => {
            rationale.push("goal trajectory is behind".to_string());
            1.0
        }
        None => 0.5,
        Some(true) => 0.3,
    };

    // Fundraise seasonality: investor attention clusters in spring/fall.
    let seasonality = if goal_type == GoalType::Fundraise {
        match now.month() {
            1..=3 | 9..=11 => {
                rationale.push("fundraise season is active".to_string());
                1.0
            }
            8 | 12 => {
                rationale.push("fundraise season is quiet".to_string());
                0.0
            }
            _ => 0.5,
        }
    } else {
        0.5
    };

    let trust_factor = 1.0 - (trust.score / 100.0).clamp(0.0, 1.0);
    let probability_factor = probability.clamp(0.0, 1.0);

    let score = weights.goal_distance_weight * goal_distance
        + weights.time_pressure_weight * time_pressure
        + weights.velocity_weight * velocity
        + weights.seasonality_weight * seasonality
        + weights.trust_weight * trust_factor
        + weights.probability_weight * probability_factor;

    let timing = if score >= weights.now_threshold {
        Timing::Now
    } else if score >= weights.soon_threshold {
        Timing::Soon
    } else {
        Timing::Later
    };
    if rationale.is_empty() {
        rationale.push(format!("composite timing score {score:.2}"));
    }
    (timing, rationale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intro::trust::TrustBand;
    use crate::trajectory::Trajectory;
    use chrono::TimeZone;

    fn gt(on_track: Option<bool>, days_left: Option<f64>) -> GoalTrajectory {
        GoalTrajectory {
            goal_id: "g1".into(),
            trajectory: Trajectory {
                on_track,
                projected_date: None,
                confidence: 0.7,
                explain: "test".into(),
            },
            progress: 0.4,
            days_left,
            velocity: Some(1.0),
            required_velocity: Some(2.0),
            probability_of_hit: 0.4,
        }
    }

    fn trust(score: f64) -> TrustRisk {
        TrustRisk {
            score,
            band: if score > 60.0 { TrustBand::High } else { TrustBand::Low },
            factors: vec![],
        }
    }

    fn october() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn trust_over_eighty_forces_never() {
        let (timing, rationale) = recommend_timing(
            GoalType::Fundraise,
            &gt(Some(false), Some(5.0)),
            &trust(85.0),
            0.9,
            october(),
            &TimingWeights::default(),
            &TrustWeights::default(),
        );
        assert_eq!(timing, Timing::Never);
        assert!(rationale[0].contains("block threshold"));
    }

    #[test]
    fn urgent_behind_goal_with_low_trust_is_now() {
        let (timing, _) = recommend_timing(
            GoalType::Fundraise,
            &gt(Some(false), Some(10.0)),
            &trust(10.0),
            0.7,
            october(),
            &TimingWeights::default(),
            &TrustWeights::default(),
        );
        assert_eq!(timing, Timing::Now);
    }

    #[test]
    fn distant_on_track_goal_defaults_to_later() {
        let (timing, _) = recommend_timing(
            GoalType::Partnership,
            &gt(Some(true), Some(300.0)),
            &trust(55.0),
            0.2,
            october(),
            &TimingWeights::default(),
            &TrustWeights::default(),
        );
        assert_eq!(timing, Timing::Later);
    }

    #[test]
    fn quiet_season_damps_fundraise_timing() {
        let december = Utc.with_ymd_and_hms(2026, 12, 15, 0, 0, 0).unwrap();
        let args = (gt(Some(false), Some(40.0)), trust(20.0), 0.5);
        let (in_season, _) = recommend_timing(
            GoalType::Fundraise,
            &args.0,
            &args.1,
            args.2,
            october(),
            &TimingWeights::default(),
            &TrustWeights::default(),
        );
        let (off_season, _) = recommend_timing(
            GoalType::Fundraise,
            &args.0,
            &args.1,
            args.2,
            december,
            &TimingWeights::default(),
            &TrustWeights::default(),
        );
        // Off-season must never be recommended sooner than in-season.
        let order = |t: &Timing| match t {
            Timing::Now => 0,
            Timing::Soon => 1,
            Timing::Later => 2,
            Timing::Never => 3,
        };
        assert!(order(&off_season) >= order(&in_season));
    }
}
