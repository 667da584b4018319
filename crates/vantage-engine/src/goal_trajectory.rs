//! Goal trajectory: the projection from [`crate::trajectory`] plus progress,
//! velocity demand and a probability-of-hit score in [0,1].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vantage_model::Goal;

use crate::trajectory::{days_between, project_goal, Trajectory};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalTrajectory {
    pub goal_id: String,
    pub trajectory: Trajectory,
    /// Fraction of target reached, clamped to [0,1].
    pub progress: f64,
    /// Days until the due date; negative when past due, None when undated.
    pub days_left: Option<f64>,
    /// Observed velocity per day; None with fewer than 2 history points.
    pub velocity: Option<f64>,
    /// Velocity needed from now to hit the target by the due date.
    pub required_velocity: Option<f64>,
    /// Probability of hitting the target, [0,1].
    pub probability_of_hit: f64,
}

/// Assess one goal: projection plus probability-of-hit.
pub fn assess_goal(goal: &Goal, now: DateTime<Utc>) -> GoalTrajectory {
    let trajectory = project_goal(goal, now);

    let progress = match (goal.current, goal.target) {
        (Some(current), Some(target)) if target > 0.0 => (current / target).clamp(0.0, 1.0),
        _ => 0.0,
    };

    let days_left = goal.due.map(|due| days_between(now, due));

    let velocity = observed_velocity(goal);
    let required_velocity = match (goal.current, goal.target, days_left) {
        (Some(current), Some(target), Some(days)) if days > 0.0 && target > current => {
            Some((target - current) / days)
        }
        _ => None,
    };

    let probability_of_hit = probability_of_hit(
        progress,
        days_left,
        velocity,
        required_velocity,
        &trajectory,
    );

    GoalTrajectory {
        goal_id: goal.id.clone(),
        trajectory,
        progress,
        days_left,
        velocity,
        required_velocity,
        probability_of_hit,
    }
}

fn observed_velocity(goal: &Goal) -> Option<f64> {
    let mut history: Vec<_> = goal.history.iter().collect();
    if history.len() < 2 {
        return None;
    }
    history.sort_by_key(|s| s.as_of);
    let first = history[0];
    let last = history[history.len() - 1];
    let span = days_between(first.as_of, last.as_of);
    if span <= 0.0 {
        return None;
    }
    Some((last.value - first.value) / span)
}

/// Probability of hitting the target:
///
/// - progress ≥ 1 forces 1.0; past due and unmet forces 0.0
/// - base: progress × 0.3
/// - trajectory term: 0.4 × confidence when on track; a velocity-ratio-scaled
///   0.2 × confidence when behind; a time-buffer-scaled 0.2 when unknown
/// - tiered time-pressure bonus, up to +0.2 above 60 days left, zero below 7
fn probability_of_hit(
    progress: f64,
    days_left: Option<f64>,
    velocity: Option<f64>,
    required_velocity: Option<f64>,
    trajectory: &Trajectory,
) -> f64 {
    if progress >= 1.0 {
        return 1.0;
    }
    if matches!(days_left, Some(d) if d < 0.0) {
        return 0.0;
    }

    let mut p = progress * 0.3;

    match trajectory.on_track {
        Some(true) => p += 0.4 * trajectory.confidence,
        Some(false) => {
            let ratio = match (velocity, required_velocity) {
                (Some(v), Some(req)) if req > 0.0 && v > 0.0 => (v / req).min(1.0),
                _ => 0.0,
            };
            p += 0.2 * trajectory.confidence * ratio;
        }
        None => {
            let buffer = days_left.map_or(0.0, |d| (d / 90.0).clamp(0.0, 1.0));
            p += 0.2 * buffer;
        }
    }

    p += match days_left {
        Some(d) if d > 60.0 => 0.2,
        Some(d) if d > 30.0 => 0.15,
        Some(d) if d > 14.0 => 0.1,
        Some(d) if d > 7.0 => 0.05,
        _ => 0.0,
    };

    p.clamp(0.0, 1.0)
}
