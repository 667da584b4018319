//! Trajectory forecaster: projects goal completion from historical velocity.
//!
//! `on_track` is a tri-state: `Some(true)` / `Some(false)` / `None`, where
//! `None` means *insufficient history* (fewer than two snapshots). That is an
//! "unknown", not a "failing" — downstream detectors branch on it explicitly
//! (GOAL_NO_HISTORY, severity LOW) instead of treating it as behind.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use vantage_model::{Goal, GoalSnapshot};

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trajectory {
    /// Some(true) on track, Some(false) behind/stalled/missed, None unknown.
    pub on_track: Option<bool>,
    pub projected_date: Option<DateTime<Utc>>,
    /// Confidence in the projection, [0,1].
    pub confidence: f64,
    pub explain: String,
}

pub(crate) fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_seconds() as f64 / SECONDS_PER_DAY
}

/// History sorted chronologically by `asOf`. The wire order is not trusted.
fn sorted_history(goal: &Goal) -> Vec<&GoalSnapshot> {
    let mut history: Vec<&GoalSnapshot> = goal.history.iter().collect();
    history.sort_by_key(|s| s.as_of);
    history
}

/// Project a goal's completion from (facts, now). Rules, in order:
///
/// 1. missing target/due/current → not on track, no projection, confidence 0
/// 2. achieved (current ≥ target) → on track, projected now, confidence 1
/// 3. due already passed → missed, confidence 1
/// 4. fewer than 2 history points → unknown (`on_track: None`), confidence 0.2
/// 5. non-positive velocity with a gap remaining → stalled
/// 6. else project `now + gap/velocity` and compare against the due date
pub fn project_goal(goal: &Goal, now: DateTime<Utc>) -> Trajectory {
    let (current, target, due) = match (goal.current, goal.target, goal.due) {
        (Some(c), Some(t), Some(d)) => (c, t, d),
        _ => {
            return Trajectory {
                on_track: Some(false),
                projected_date: None,
                confidence: 0.0,
                explain: "goal is missing current, target or due date".to_string(),
            }
        }
    };

    if current >= target {
        return Trajectory {
            on_track: Some(true),
            projected_date: Some(now),
            confidence: 1.0,
            explain: "goal already achieved".to_string(),
        };
    }

    if due < now {
        return Trajectory {
            on_track: Some(false),
            projected_date: None,
            confidence: 1.0,
            explain: "due date passed without reaching target".to_string(),
        };
    }

    let history = sorted_history(goal);
    let gap = target - current;
    let remaining_days = days_between(now, due);

    let span_days = match (history.first(), history.last()) {
        (Some(first), Some(last)) if history.len() >= 2 => days_between(first.as_of, last.as_of),
        _ => 0.0,
    };

    if history.len() < 2 || span_days <= 0.0 {
        let required = if remaining_days > 0.0 { gap / remaining_days } else { gap };
        return Trajectory {
            on_track: None,
            projected_date: None,
            confidence: 0.2,
            explain: format!(
                "insufficient history to project; need {required:.2}/day to hit target"
            ),
        };
    }

    let first = history[0];
    let last = history[history.len() - 1];
    let velocity = (last.value - first.value) / span_days;

    if velocity <= 0.0 && gap > 0.0 {
        return Trajectory {
            on_track: Some(false),
            projected_date: None,
            confidence: confidence(history.len(), span_days, remaining_days),
            explain: format!("stalled: velocity {velocity:.2}/day with {gap:.0} remaining"),
        };
    }

    let days_to_target = gap / velocity;
    let projected = now + Duration::seconds((days_to_target * SECONDS_PER_DAY) as i64);
    let on_track = projected <= due;
    Trajectory {
        on_track: Some(on_track),
        projected_date: Some(projected),
        confidence: confidence(history.len(), span_days, remaining_days),
        explain: format!(
            "projected completion in {days_to_target:.0} days at {velocity:.2}/day ({})",
            if on_track { "before due" } else { "after due" }
        ),
    }
}

/// Projection confidence:
///
/// - base 0.5
/// - up to +0.2 from data-point count (saturating at 10 points)
/// - up to +0.2 from historical span relative to remaining days (capped at 1)
/// - up to +0.1 from velocity consistency — **currently a fixed 0.0
///   placeholder**: no variance is computed from history. Kept as-is because
///   downstream ranking is tuned against these confidence values; computing
///   real variance would silently shift every goal's score.
fn confidence(points: usize, span_days: f64, remaining_days: f64) -> f64 {
    let point_term = 0.2 * (points as f64 / 10.0).min(1.0);
    let span_term = if remaining_days > 0.0 {
        0.2 * (span_days / remaining_days).min(1.0)
    } else {
        0.2
    };
    let consistency_term = 0.0;
    (0.5 + point_term + span_term + consistency_term).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use vantage_model::{GoalStatus, GoalType};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, d, 0, 0, 0).unwrap()
    }

    fn goal(current: f64, target: f64, due: DateTime<Utc>, history: Vec<(u32, f64)>) -> Goal {
        Goal {
            id: "g1".into(),
            goal_type: GoalType::Revenue,
            name: None,
            current: Some(current),
            target: Some(target),
            due: Some(due),
            status: GoalStatus::Active,
            history: history
                .into_iter()
                .map(|(d, value)| GoalSnapshot { value, as_of: day(d) })
                .collect(),
        }
    }

    #[test]
    fn missing_fields_mean_not_on_track_confidence_zero() {
        let mut g = goal(10.0, 100.0, now(), vec![]);
        g.target = None;
        let t = project_goal(&g, now());
        assert_eq!(t.on_track, Some(false));
        assert_eq!(t.projected_date, None);
        assert_relative_eq!(t.confidence, 0.0);
    }

    #[test]
    fn achieved_goal_is_on_track_with_full_confidence() {
        let g = goal(100.0, 100.0, now() + Duration::days(30), vec![]);
        let t = project_goal(&g, now());
        assert_eq!(t.on_track, Some(true));
        assert_eq!(t.projected_date, Some(now()));
        assert_relative_eq!(t.confidence, 1.0);
    }

    #[test]
    fn past_due_unmet_goal_is_missed() {
        let g = goal(50.0, 100.0, now() - Duration::days(1), vec![(1, 10.0), (20, 50.0)]);
        let t = project_goal(&g, now());
        assert_eq!(t.on_track, Some(false));
        assert_eq!(t.projected_date, None);
        assert_relative_eq!(t.confidence, 1.0);
    }

    #[test]
    fn single_history_point_is_unknown_not_failing() {
        let g = goal(10.0, 100.0, now() + Duration::days(30), vec![(20, 10.0)]);
        let t = project_goal(&g, now());
        assert_eq!(t.on_track, None);
        assert_relative_eq!(t.confidence, 0.2);
        assert!(t.explain.contains("/day"));
    }

    #[test]
    fn positive_velocity_projects_completion() {
        // 1.0/day over 19 days of history, 90 remaining for a 90 gap.
        let g = goal(29.0, 119.0, now() + Duration::days(120), vec![(1, 10.0), (20, 29.0)]);
        let t = project_goal(&g, now());
        assert_eq!(t.on_track, Some(true));
        let projected = t.projected_date.unwrap();
        assert_relative_eq!(days_between(now(), projected), 90.0, epsilon = 0.1);
    }

    #[test]
    fn behind_when_projection_lands_after_due() {
        let g = goal(29.0, 119.0, now() + Duration::days(30), vec![(1, 10.0), (20, 29.0)]);
        let t = project_goal(&g, now());
        assert_eq!(t.on_track, Some(false));
        assert!(t.projected_date.is_some());
    }

    #[test]
    fn negative_velocity_with_gap_is_stalled() {
        let g = goal(20.0, 100.0, now() + Duration::days(60), vec![(1, 40.0), (20, 20.0)]);
        let t = project_goal(&g, now());
        assert_eq!(t.on_track, Some(false));
        assert_eq!(t.projected_date, None);
        assert!(t.explain.contains("stalled"));
    }

    #[test]
    fn confidence_grows_with_history_and_span() {
        let sparse = goal(29.0, 119.0, now() + Duration::days(120), vec![(19, 28.0), (20, 29.0)]);
        let rich = goal(
            29.0,
            119.0,
            now() + Duration::days(120),
            (1..=20).map(|d| (d, 9.0 + d as f64)).collect(),
        );
        let sparse_conf = project_goal(&sparse, now()).confidence;
        let rich_conf = project_goal(&rich, now()).confidence;
        assert!(rich_conf > sparse_conf);
        assert!(rich_conf <= 1.0);
    }
}
