//! Vantage fact model
//!
//! This crate defines the raw fact records the decision core consumes
//! (companies, goals, deals, people, relationships), the dataset contract
//! with its forbidden-field gate, and the versioned content-addressed id
//! scheme for derived records.
//!
//! Facts are immutable per computation. Everything derived from them lives
//! in `vantage-engine` and is recomputed from scratch on every invocation.

pub mod dataset;
pub mod facts;
pub mod ids;

pub use dataset::{forbidden_field_violations, parse_dataset, Dataset, DatasetError};
pub use facts::{
    Company, Deal, DealStatus, EntityKind, EntityRef, Goal, GoalSnapshot, GoalStatus, GoalType,
    Investor, Person, PersonId, Relationship, TeamMember,
};
