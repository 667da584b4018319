//! Portfolio decision-support engine.
//!
//! A pure, deterministic derivation pipeline over an in-memory fact snapshot:
//!
//! - **Runway & trajectories**: cash/burn runway and per-goal velocity
//!   projections with probability-of-hit.
//! - **Issues**: currently-existing gaps (absence, staleness, deviation),
//!   content-addressed for cross-run deduplication.
//! - **Pre-issues**: forecasted risks with escalation windows and a monotone
//!   cost-of-delay curve.
//! - **Ripple**: rule-based downstream-consequence scores per issue.
//! - **Introductions**: bounded relationship-graph search for warm paths,
//!   with trust-risk scoring and timing recommendation.
//! - **Actions & impact**: candidates from every signal, each carrying a
//!   seven-dimension impact model.
//! - **Ranking**: the single canonical scalar that orders actions.
//! - **DAG executor**: stages declared as nodes with explicit dependencies,
//!   executed in deterministic topological order behind a read firewall.
//!
//! The reference timestamp is threaded explicitly everywhere; nothing reads a
//! system clock, so `compute(dataset, now, config)` is reproducible
//! byte-for-byte.

pub mod actions;
pub mod compute;
pub mod dag;
pub mod goal_trajectory;
pub mod impact;
pub mod intro;
pub mod issues;
pub mod preissues;
pub mod ranking;
pub mod ripple;
pub mod runway;
pub mod trajectory;
pub mod validate;
pub mod weights;

pub use actions::{Action, ActionSource};
pub use compute::{compute, ComputeMeta, ComputeResult, CompanyResult, Priority};
pub use dag::{topo_sort, Engine, EngineError, GraphError};
pub use goal_trajectory::{assess_goal, GoalTrajectory};
pub use impact::ImpactModel;
pub use intro::{IntroductionOpportunity, Timing, TrustBand, TrustRisk};
pub use issues::{detect_issues, Issue, IssueReport, IssueType, Severity, SeverityCounts};
pub use preissues::{detect_preissues, CostOfDelay, Escalation, PreIssue, PreIssueType};
pub use ranking::{rank_actions, RankComponents, RankedAction};
pub use ripple::{aggregate_ripple, RippleAssessment};
pub use runway::{compute_runway, Runway};
pub use trajectory::{project_goal, Trajectory};
pub use validate::ValidationError;
pub use weights::EngineConfig;
