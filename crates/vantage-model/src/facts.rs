//! Raw fact records supplied by the external dataset.
//!
//! Facts are **immutable per computation**: the core never writes anything
//! back. Every record carries an `asOf` timestamp (pre-parsed to
//! `DateTime<Utc>` by the loading gate) and optional fields stay `Option` so
//! that missing data flows downstream as a typed absence, never a default.
//!
//! Wire names are camelCase to match the external JSON contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type PersonId = String;

// ============================================================================
// Entity references
// ============================================================================

/// Kind discriminator for [`EntityRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Company,
    Goal,
    Deal,
    Person,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Company => "company",
            EntityKind::Goal => "goal",
            EntityKind::Deal => "deal",
            EntityKind::Person => "person",
        }
    }
}

/// A typed pointer from a derived record back to the fact it is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn company(id: impl Into<String>) -> Self {
        Self { kind: EntityKind::Company, id: id.into() }
    }

    pub fn goal(id: impl Into<String>) -> Self {
        Self { kind: EntityKind::Goal, id: id.into() }
    }

    pub fn deal(id: impl Into<String>) -> Self {
        Self { kind: EntityKind::Deal, id: id.into() }
    }

    pub fn person(id: impl Into<String>) -> Self {
        Self { kind: EntityKind::Person, id: id.into() }
    }
}

// ============================================================================
// Company
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Cash on hand, USD. Missing cash is a DATA_MISSING issue downstream.
    #[serde(default)]
    pub cash: Option<f64>,
    /// Monthly net burn, USD. Zero or negative burn means infinite runway.
    #[serde(default)]
    pub burn: Option<f64>,
    /// Freshness timestamp for the company-level financials.
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub deals: Vec<Deal>,
    /// Whether the company is actively raising a round.
    #[serde(default)]
    pub raising: bool,
    /// Target size of the round being raised, USD.
    #[serde(default)]
    pub round_target: Option<f64>,
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub stage: Option<String>,
}

impl Company {
    /// Goals still being worked (not completed, not abandoned).
    pub fn active_goals(&self) -> impl Iterator<Item = &Goal> {
        self.goals.iter().filter(|g| g.status == GoalStatus::Active)
    }
}

// ============================================================================
// Goal
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Fundraise,
    Partnership,
    Hiring,
    Revenue,
    Product,
    #[serde(other)]
    Other,
}

impl GoalType {
    pub fn as_str(self) -> &'static str {
        match self {
            GoalType::Fundraise => "fundraise",
            GoalType::Partnership => "partnership",
            GoalType::Hiring => "hiring",
            GoalType::Revenue => "revenue",
            GoalType::Product => "product",
            GoalType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Abandoned,
    #[serde(other)]
    Unknown,
}

/// One historical observation of a goal's metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSnapshot {
    pub value: f64,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub current: Option<f64>,
    #[serde(default)]
    pub target: Option<f64>,
    #[serde(default)]
    pub due: Option<DateTime<Utc>>,
    #[serde(default = "default_goal_status")]
    pub status: GoalStatus,
    /// Chronology is not guaranteed on the wire; consumers sort by `asOf`.
    #[serde(default)]
    pub history: Vec<GoalSnapshot>,
}

fn default_goal_status() -> GoalStatus {
    GoalStatus::Active
}

// ============================================================================
// Deal
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DealStatus {
    Lead,
    Contacted,
    Meeting,
    DueDiligence,
    TermSheet,
    Closed,
    Passed,
    #[serde(other)]
    Unknown,
}

impl DealStatus {
    /// Terminal states: the deal no longer needs attention.
    pub fn is_closed(self) -> bool {
        matches!(self, DealStatus::Closed | DealStatus::Passed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    #[serde(default)]
    pub investor: Option<String>,
    pub status: DealStatus,
    /// Close probability in percent, 0–100.
    #[serde(default)]
    pub probability: f64,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

impl Deal {
    /// Probability-weighted value, USD. None when the amount is unknown.
    pub fn weighted_amount(&self) -> Option<f64> {
        self.amount.map(|a| a * (self.probability.clamp(0.0, 100.0) / 100.0))
    }
}

// ============================================================================
// People and relationships (shared, read-only globals)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    #[serde(default)]
    pub name: Option<String>,
    /// e.g. "investor", "corporate", "operator", "founder".
    #[serde(default)]
    pub org_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub stage: Option<String>,
    /// Senior people carry more reputational exposure when asked for intros.
    #[serde(default)]
    pub is_senior: bool,
}

/// A directed edge in the relationship graph (traversal treats it as
/// bidirectional).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub from_person_id: PersonId,
    pub to_person_id: PersonId,
    /// Relationship strength, 0–100.
    pub strength: f64,
    #[serde(default)]
    pub last_touch_at: Option<DateTime<Utc>>,
    /// Intros requested through this edge in the recent window.
    #[serde(default)]
    pub intro_count: u32,
    #[serde(default)]
    pub intro_success_count: u32,
}

impl Relationship {
    /// Historical intro conversion on this edge. None until at least one ask.
    pub fn success_rate(&self) -> Option<f64> {
        if self.intro_count == 0 {
            None
        } else {
            Some(self.intro_success_count as f64 / self.intro_count as f64)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investor {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub person_id: Option<PersonId>,
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub stages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub person_id: PersonId,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_founder: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_type_deserializes_unknown_as_other() {
        let g: GoalType = serde_json::from_str("\"biz-dev\"").unwrap();
        assert_eq!(g, GoalType::Other);
    }

    #[test]
    fn deal_weighted_amount() {
        let deal = Deal {
            id: "d1".into(),
            investor: None,
            status: DealStatus::Meeting,
            probability: 40.0,
            amount: Some(1_000_000.0),
            as_of: None,
        };
        assert_eq!(deal.weighted_amount(), Some(400_000.0));
    }

    #[test]
    fn closed_and_passed_are_terminal() {
        assert!(DealStatus::Closed.is_closed());
        assert!(DealStatus::Passed.is_closed());
        assert!(!DealStatus::DueDiligence.is_closed());
    }

    #[test]
    fn company_wire_names_are_camel_case() {
        let json = r#"{
            "id": "c1",
            "cash": 600000,
            "burn": 150000,
            "asOf": "2026-01-01T00:00:00Z",
            "roundTarget": 10000000,
            "raising": true
        }"#;
        let c: Company = serde_json::from_str(json).unwrap();
        assert_eq!(c.round_target, Some(10_000_000.0));
        assert!(c.as_of.is_some());
    }
}
