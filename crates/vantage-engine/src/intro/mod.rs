//! Introduction-opportunity engine.
//!
//! Builds a bidirectional relationship graph (person ids interned to `u32`,
//! adjacency lists indexed by integer), then for each *blocked* goal of an
//! intro-addressable type (fundraise, partnership, hiring) runs a bounded
//! breadth-first search — hard cap 2 hops — from the introducer set (team +
//! founders) to goal-relevant target people.
//!
//! Second-order (multi-hop) paths are admitted only above a conversion-lift
//! threshold, and only when tied to a real goal; if fewer than 20% of the
//! discovered second-order paths pass the threshold the whole second-order
//! feature is suppressed for that traversal (noise-floor circuit breaker).
//! Direct paths are always retained.
//!
//! Opportunities with timing NEVER or a blocking trust score never leave this
//! module, so they can never become action candidates.

pub mod timing;
pub mod trust;

use std::collections::VecDeque;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vantage_model::{ids, Company, Goal, GoalType, Person, PersonId, Relationship, TeamMember};

use crate::goal_trajectory::GoalTrajectory;
use crate::weights::EngineConfig;

pub use timing::Timing;
pub use trust::{TrustBand, TrustRisk};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroductionOpportunity {
    pub id: String,
    pub company_id: String,
    pub goal_id: String,
    /// Person ids along the path, introducer first, target last.
    pub path: Vec<PersonId>,
    /// Hop count (`path.len() - 1`).
    pub path_length: usize,
    /// Expected conversion probability of the ask, [0,1].
    pub probability: f64,
    pub trust_risk: TrustRisk,
    /// Lift over baseline cold-outreach conversion.
    pub conversion_lift: f64,
    pub timing: Timing,
    pub timing_rationale: Vec<String>,
}

/// Read-only cross-company collections the traversal runs over.
#[derive(Debug, Clone, Copy)]
pub struct IntroGlobals<'a> {
    pub people: &'a [Person],
    pub relationships: &'a [Relationship],
    pub team: &'a [TeamMember],
}

// ============================================================================
// Relationship graph (interned, integer-indexed adjacency)
// ============================================================================

struct Edge {
    to: u32,
    rel: u32,
}

/// Bidirectional adjacency over interned person ids. String keys are resolved
/// once at build time; traversal touches only integers.
struct RelationshipGraph<'a> {
    ids: Vec<&'a str>,
    lookup: AHashMap<&'a str, u32>,
    adjacency: Vec<Vec<Edge>>,
    relationships: &'a [Relationship],
}

impl<'a> RelationshipGraph<'a> {
    fn build(relationships: &'a [Relationship]) -> Self {
        fn intern<'b>(
            id: &'b str,
            ids: &mut Vec<&'b str>,
            lookup: &mut AHashMap<&'b str, u32>,
        ) -> u32 {
            *lookup.entry(id).or_insert_with(|| {
                ids.push(id);
                (ids.len() - 1) as u32
            })
        }

        let mut ids: Vec<&'a str> = Vec::new();
        let mut lookup: AHashMap<&'a str, u32> = AHashMap::new();
        let mut pairs = Vec::with_capacity(relationships.len());
        for rel in relationships {
            let from = intern(&rel.from_person_id, &mut ids, &mut lookup);
            let to = intern(&rel.to_person_id, &mut ids, &mut lookup);
            pairs.push((from, to));
        }

        let mut adjacency: Vec<Vec<Edge>> = (0..ids.len()).map(|_| Vec::new()).collect();
        for (i, (from, to)) in pairs.into_iter().enumerate() {
            adjacency[from as usize].push(Edge { to, rel: i as u32 });
            adjacency[to as usize].push(Edge { to: from, rel: i as u32 });
        }

        Self { ids, lookup, adjacency, relationships }
    }

    fn index_of(&self, person_id: &str) -> Option<u32> {
        self.lookup.get(person_id).copied()
    }

    fn id_of(&self, index: u32) -> &'a str {
        self.ids[index as usize]
    }

    fn relationship(&self, rel: u32) -> &'a Relationship {
        &self.relationships[rel as usize]
    }
}

/// One queue entry of the path-accumulating BFS. Depth is capped at 2 hops so
/// the accumulated vectors stay tiny; no arena needed.
#[derive(Clone)]
struct PathState {
    persons: Vec<u32>,
    edges: Vec<u32>,
}

/// All simple paths from `start` to `target` within `max_hops`.
fn search_paths(graph: &RelationshipGraph<'_>, start: u32, target: u32, max_hops: usize) -> Vec<PathState> {
    let mut results = Vec::new();
    let mut queue: VecDeque<PathState> = VecDeque::new();
    queue.push_back(PathState { persons: vec![start], edges: vec![] });

    while let Some(state) = queue.pop_front() {
        if state.edges.len() >= max_hops {
            continue;
        }
        let current = *state.persons.last().expect("path state has a tail");
        for edge in &graph.adjacency[current as usize] {
            if state.persons.contains(&edge.to) {
                continue;
            }
            let mut next = state.clone();
            next.persons.push(edge.to);
            next.edges.push(edge.rel);
            if edge.to == target {
                results.push(next);
            } else {
                queue.push_back(next);
            }
        }
    }

    results
}

// ============================================================================
// Goal blocking and target matching
// ============================================================================

fn expected_pace(goal: &Goal, gt: &GoalTrajectory, now: DateTime<Utc>) -> Option<f64> {
    let first = goal.history.iter().map(|s| s.as_of).min()?;
    let days_left = gt.days_left?;
    let elapsed = crate::trajectory::days_between(first, now).max(0.0);
    let total = elapsed + days_left.max(0.0);
    if total <= 0.0 {
        return None;
    }
    Some((elapsed / total).clamp(0.0, 1.0))
}

/// Type-specific "is this goal blocked enough to spend social capital on".
fn goal_is_blocked(goal: &Goal, gt: &GoalTrajectory, now: DateTime<Utc>) -> bool {
    let days_left = gt.days_left.unwrap_or(f64::INFINITY);
    match goal.goal_type {
        GoalType::Fundraise => gt.progress < 1.0 && days_left < 60.0,
        GoalType::Partnership => gt.progress < 0.5 && days_left < 45.0,
        GoalType::Hiring => match expected_pace(goal, gt, now) {
            Some(expected) => gt.progress < expected,
            None => gt.trajectory.on_track == Some(false),
        },
        // Generic fallback: behind 60% of the expected linear pace.
        _ => match expected_pace(goal, gt, now) {
            Some(expected) => gt.progress < 0.6 * expected,
            None => false,
        },
    }
}

fn sector_fits(person: &Person, company: &Company) -> bool {
    if person.sectors.is_empty() || company.sectors.is_empty() {
        return true;
    }
    person
        .sectors
        .iter()
        .any(|s| company.sectors.iter().any(|c| c.eq_ignore_ascii_case(s)))
}

fn stage_fits(person: &Person, company: &Company) -> bool {
    match (&person.stage, &company.stage) {
        (Some(p), Some(c)) => p.eq_ignore_ascii_case(c),
        _ => true,
    }
}

fn org_type_is(person: &Person, any_of: &[&str]) -> bool {
    person
        .org_type
        .as_deref()
        .is_some_and(|o| any_of.iter().any(|t| o.eq_ignore_ascii_case(t)))
}

/// Goal-relevant target people, matched by org type, sector and stage.
fn match_targets<'a>(goal_type: GoalType, company: &Company, people: &'a [Person]) -> Vec<&'a Person> {
    let mut targets: Vec<&Person> = people
        .iter()
        .filter(|p| match goal_type {
            GoalType::Fundraise => {
                org_type_is(p, &["investor", "fund"]) && sector_fits(p, company) && stage_fits(p, company)
            }
            GoalType::Partnership => {
                org_type_is(p, &["corporate", "company"]) && sector_fits(p, company)
            }
            GoalType::Hiring => {
                org_type_is(p, &["operator", "talent"])
                    || p.tags.iter().any(|t| t.eq_ignore_ascii_case("candidate"))
            }
            _ => false,
        })
        .collect();
    targets.sort_by(|a, b| a.id.cmp(&b.id));
    targets
}

/// The introducer set: team members plus anyone marked a founder.
fn introducer_ids<'a>(globals: &IntroGlobals<'a>) -> Vec<&'a str> {
    let mut out: Vec<&str> = globals.team.iter().map(|m| m.person_id.as_str()).collect();
    out.extend(
        globals
            .people
            .iter()
            .filter(|p| org_type_is(p, &["founder"]))
            .map(|p| p.id.as_str()),
    );
    out.sort_unstable();
    out.dedup();
    out
}

// ============================================================================
// Conversion lift
// ============================================================================

/// Expected-conversion lift of a path over baseline cold outreach: chain
/// product of strength ratios × hop-decay penalty × average-strength
/// normalization, divided by the baseline conversion.
fn conversion_lift(strengths: &[f64], config: &EngineConfig) -> f64 {
    if strengths.is_empty() {
        return 0.0;
    }
    let chain: f64 = strengths.iter().map(|s| (s / 100.0).clamp(0.0, 1.0)).product();
    let avg = strengths.iter().sum::<f64>() / strengths.len() as f64 / 100.0;
    let decay = config.intro.hop_decay.powi(strengths.len() as i32 - 1);
    chain * decay * avg / config.intro.baseline_conversion
}

// ============================================================================
// Engine
// ============================================================================

/// Discover admissible introduction opportunities for one company.
///
/// Every traversal is tied to a concrete blocked goal; with no goal there is
/// no traversal, so no second-order path can ever be admitted goal-less.
pub fn find_opportunities(
    company: &Company,
    trajectories: &AHashMap<String, GoalTrajectory>,
    globals: &IntroGlobals<'_>,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Vec<IntroductionOpportunity> {
    let graph = RelationshipGraph::build(globals.relationships);
    let people_by_id: AHashMap<&str, &Person> =
        globals.people.iter().map(|p| (p.id.as_str(), p)).collect();

    let introducers: Vec<u32> = introducer_ids(globals)
        .into_iter()
        .filter_map(|id| graph.index_of(id))
        .collect();

    let mut opportunities = Vec::new();

    for goal in company.active_goals() {
        if !matches!(
            goal.goal_type,
            GoalType::Fundraise | GoalType::Partnership | GoalType::Hiring
        ) {
            continue;
        }
        let Some(gt) = trajectories.get(&goal.id) else { continue };
        if !goal_is_blocked(goal, gt, now) {
            continue;
        }

        let targets = match_targets(goal.goal_type, company, globals.people);

        // Gather every path for this traversal before filtering, so the
        // noise floor sees the full second-order population.
        let mut direct = Vec::new();
        let mut second_order = Vec::new();
        for target in &targets {
            let Some(target_idx) = graph.index_of(&target.id) else { continue };
            for &start in &introducers {
                if start == target_idx {
                    continue;
                }
                for path in search_paths(&graph, start, target_idx, config.intro.max_hops) {
                    if path.edges.len() <= 1 {
                        direct.push(path);
                    } else {
                        second_order.push(path);
                    }
                }
            }
        }

        // Second-order filtering: lift threshold plus noise-floor breaker.
        let discovered = second_order.len();
        let admitted: Vec<PathState> = second_order
            .into_iter()
            .filter(|path| {
                let strengths: Vec<f64> = path
                    .edges
                    .iter()
                    .map(|&e| graph.relationship(e).strength)
                    .collect();
                conversion_lift(&strengths, config) > config.intro.lift_threshold
            })
            .collect();
        let admitted = if discovered > 0
            && (admitted.len() as f64 / discovered as f64) < config.intro.noise_floor
        {
            tracing::debug!(
                goal = %goal.id,
                discovered,
                admitted = admitted.len(),
                "second-order paths below noise floor; suppressing"
            );
            Vec::new()
        } else {
            admitted
        };

        for path in direct.into_iter().chain(admitted) {
            let strengths: Vec<f64> = path
                .edges
                .iter()
                .map(|&e| graph.relationship(e).strength)
                .collect();
            let lift = conversion_lift(&strengths, config);
            let probability = (config.intro.baseline_conversion * lift).clamp(0.0, 0.95);

            let person_ids: Vec<PersonId> = path
                .persons
                .iter()
                .map(|&i| graph.id_of(i).to_string())
                .collect();
            let (Some(introducer), Some(target)) = (
                people_by_id.get(person_ids[0].as_str()),
                people_by_id.get(person_ids[person_ids.len() - 1].as_str()),
            ) else {
                continue;
            };

            let edges: Vec<&Relationship> =
                path.edges.iter().map(|&e| graph.relationship(e)).collect();
            let trust_risk = trust::score_path(&edges, introducer, target, now, &config.trust);
            let (timing, timing_rationale) = timing::recommend_timing(
                goal.goal_type,
                gt,
                &trust_risk,
                probability,
                now,
                &config.timing,
                &config.trust,
            );

            // Hard gate: blocked opportunities never become candidates.
            if timing == Timing::Never || trust_risk.is_blocking(&config.trust) {
                continue;
            }

            let path_refs: Vec<&str> = person_ids.iter().map(|s| s.as_str()).collect();
            opportunities.push(IntroductionOpportunity {
                id: ids::intro_id_v1(&goal.id, &path_refs),
                company_id: company.id.clone(),
                goal_id: goal.id.clone(),
                path_length: person_ids.len() - 1,
                path: person_ids,
                probability,
                trust_risk,
                conversion_lift: lift,
                timing,
                timing_rationale,
            });
        }
    }

    opportunities.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    opportunities
}
