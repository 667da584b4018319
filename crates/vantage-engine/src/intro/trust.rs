//! Trust-risk scoring: the social-capital cost of asking for an intro.
//!
//! Six weighted contributions, summed and clamped to [0,100]:
//!
//! 1. inverse relationship strength (weak edges are expensive to use)
//! 2. recency bucket of the introducer edge's last touch
//! 3. ask-frequency penalty (escalating with recent intros via this edge)
//! 4. path-length penalty (every extra hop dilutes accountability)
//! 5. fit mismatch between introducer and target (tags/sectors)
//! 6. reputational asymmetry: a senior introducer on a weak edge, or an
//!    introducer whose intro success rate is below 50%
//!
//! Bands: low ≤ 30, medium ≤ 60, high above. Scores over the block threshold
//! force timing to NEVER upstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vantage_model::{Person, Relationship};

use crate::trajectory::days_between;
use crate::weights::TrustWeights;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustBand {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustRisk {
    /// Total risk, [0,100].
    pub score: f64,
    pub band: TrustBand,
    /// One entry per non-zero contribution, for explainability.
    pub factors: Vec<String>,
}

impl TrustRisk {
    pub fn is_blocking(&self, weights: &TrustWeights) -> bool {
        self.score > weights.block_threshold
    }
}

fn overlaps(a: &[String], b: &[String]) -> bool {
    a.iter().any(|x| b.iter().any(|y| x.eq_ignore_ascii_case(y)))
}

/// Score one introduction path.
///
/// `edges` are the relationships along the path in order; `edges[0]` is the
/// introducer's own edge and carries the recency/ask-frequency/asymmetry
/// terms. `introducer` and `target` are the path endpoints.
pub fn score_path(
    edges: &[&Relationship],
    introducer: &Person,
    target: &Person,
    now: DateTime<Utc>,
    weights: &TrustWeights,
) -> TrustRisk {
    let mut score = 0.0;
    let mut factors = Vec::new();

    // 1. Inverse average strength along the path.
    let avg_strength = if edges.is_empty() {
        0.0
    } else {
        edges.iter().map(|r| r.strength.clamp(0.0, 100.0)).sum::<f64>() / edges.len() as f64
    };
    let strength_term = (100.0 - avg_strength) * weights.strength_weight;
    if strength_term > 0.0 {
        score += strength_term;
        factors.push(format!("average path strength {avg_strength:.0}/100"));
    }

    // 2. Recency of the introducer edge.
    if let Some(first) = edges.first() {
        let bucket = match first.last_touch_at {
            Some(touch) => {
                let days = days_between(touch, now);
                if days <= 7.0 {
                    0
                } else if days <= 30.0 {
                    1
                } else if days <= 90.0 {
                    2
                } else {
                    3
                }
            }
            None => 3,
        };
        let penalty = weights.recency_penalties[bucket];
        if penalty > 0.0 {
            score += penalty;
            factors.push(format!("introducer edge not touched recently (bucket {bucket})"));
        }

        // 3. Ask frequency on the introducer edge.
        let asks = (first.intro_count as usize).min(weights.ask_penalties.len() - 1);
        let penalty = weights.ask_penalties[asks];
        if penalty > 0.0 {
            score += penalty;
            factors.push(format!("{} recent intro asks through this edge", first.intro_count));
        }

        // 6. Reputational asymmetry.
        let weak_edge = first.strength < weights.weak_edge_strength;
        let poor_record = first
            .success_rate()
            .is_some_and(|rate| rate < weights.asymmetry_success_rate);
        if (introducer.is_senior && weak_edge) || poor_record {
            score += weights.asymmetry_penalty;
            factors.push("reputational asymmetry on the introducer edge".to_string());
        }
    }

    // 4. Path length.
    let hops = edges.len();
    let bucket = hops.saturating_sub(1).min(weights.path_penalties.len() - 1);
    let penalty = weights.path_penalties[bucket];
    if penalty > 0.0 {
        score += penalty;
        factors.push(format!("{hops}-hop path dilutes accountability"));
    }

    // 5. Fit mismatch.
    let fits = overlaps(&introducer.tags, &target.tags)
        || overlaps(&introducer.sectors, &target.sectors);
    if !fits {
        score += weights.fit_mismatch_penalty;
        factors.push("introducer and target share no tags or sectors".to_string());
    }

    let score = score.clamp(0.0, 100.0);
    let band = if score <= weights.band_low {
        TrustBand::Low
    } else if score <= weights.band_medium {
        TrustBand::Medium
    } else {
        TrustBand::High
    };

    TrustRisk { score, band, factors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn person(value: serde_json::Value) -> Person {
        serde_json::from_value(value).unwrap()
    }

    fn edge(strength: f64, touched_days_ago: i64, intro_count: u32, successes: u32) -> Relationship {
        Relationship {
            from_person_id: "a".into(),
            to_person_id: "b".into(),
            strength,
            last_touch_at: Some(now() - Duration::days(touched_days_ago)),
            intro_count,
            intro_success_count: successes,
        }
    }

    fn fit_people() -> (Person, Person) {
        let intro = person(json!({ "id": "a", "tags": ["saas"], "sectors": ["fintech"] }));
        let target = person(json!({ "id": "t", "tags": ["saas"], "sectors": ["fintech"] }));
        (intro, target)
    }

    #[test]
    fn strong_recent_direct_edge_is_low_risk() {
        let (intro, target) = fit_people();
        let e = edge(90.0, 3, 0, 0);
        let risk = score_path(&[&e], &intro, &target, now(), &TrustWeights::default());
        assert!(risk.score <= 30.0, "score {}", risk.score);
        assert_eq!(risk.band, TrustBand::Low);
    }

    #[test]
    fn weak_cold_overasked_edge_is_high_risk() {
        let (intro, target) = fit_people();
        let e = edge(20.0, 200, 4, 0);
        let risk = score_path(&[&e], &intro, &target, now(), &TrustWeights::default());
        assert!(risk.score > 60.0);
        assert_eq!(risk.band, TrustBand::High);
        assert!(risk.is_blocking(&TrustWeights::default()));
    }

    #[test]
    fn extra_hops_add_penalty() {
        let (intro, target) = fit_people();
        let e1 = edge(80.0, 3, 0, 0);
        let e2 = edge(80.0, 3, 0, 0);
        let direct = score_path(&[&e1], &intro, &target, now(), &TrustWeights::default());
        let two_hop = score_path(&[&e1, &e2], &intro, &target, now(), &TrustWeights::default());
        assert!(two_hop.score > direct.score);
    }

    #[test]
    fn senior_introducer_on_weak_edge_pays_asymmetry() {
        let target = person(json!({ "id": "t", "tags": ["saas"] }));
        let junior = person(json!({ "id": "a", "tags": ["saas"] }));
        let senior = person(json!({ "id": "a", "tags": ["saas"], "isSenior": true }));
        let e = edge(30.0, 3, 0, 0);
        let w = TrustWeights::default();
        let junior_risk = score_path(&[&e], &junior, &target, now(), &w);
        let senior_risk = score_path(&[&e], &senior, &target, now(), &w);
        assert!(senior_risk.score > junior_risk.score);
    }

    #[test]
    fn poor_success_rate_pays_asymmetry() {
        let (intro, target) = fit_people();
        let good = edge(80.0, 3, 4, 3);
        let bad = edge(80.0, 3, 4, 1);
        let w = TrustWeights::default();
        let good_risk = score_path(&[&good], &intro, &target, now(), &w);
        let bad_risk = score_path(&[&bad], &intro, &target, now(), &w);
        assert!(bad_risk.score > good_risk.score);
    }

    #[test]
    fn fit_mismatch_adds_penalty() {
        let intro = person(json!({ "id": "a", "tags": ["hardware"], "sectors": ["space"] }));
        let target = person(json!({ "id": "t", "tags": ["saas"], "sectors": ["fintech"] }));
        let e = edge(90.0, 3, 0, 0);
        let risk = score_path(&[&e], &intro, &target, now(), &TrustWeights::default());
        assert!(risk
            .factors
            .iter()
            .any(|f| f.contains("no tags or sectors")));
    }

    #[test]
    fn score_is_clamped_to_one_hundred() {
        let intro = person(json!({ "id": "a", "isSenior": true }));
        let target = person(json!({ "id": "t", "tags": ["x"] }));
        let e1 = edge(0.0, 400, 9, 0);
        let e2 = edge(0.0, 400, 9, 0);
        let e3 = edge(0.0, 400, 9, 0);
        let e4 = edge(0.0, 400, 9, 0);
        let risk = score_path(&[&e1, &e2, &e3, &e4], &intro, &target, now(), &TrustWeights::default());
        assert!(risk.score <= 100.0);
        assert_eq!(risk.band, TrustBand::High);
    }
}
