//! Assignment domain models.
//!
//! Provides the core data types for representing multi-instance task
//! assignment problems and their solutions.
//!
//! # Domain Mappings
//!
//! | u-assign | Procurement | Hospital | Banking |
//! |----------|-------------|----------|---------|
//! | TaskType | Approval Step | Procedure Step | Payment Step |
//! | Person | Officer | Clinician | Clerk |
//! | Role | Grade | Specialty | Authority Level |
//! | AssignmentTable | Duty Roster | Shift Plan | Four-eyes Plan |

mod config;
mod person;
mod role;
mod rules;
mod table;
mod task;

pub use config::{ConfigBundle, ProcessConfig};
pub use person::Person;
pub use role::{Dominance, Role, RoleHierarchy};
pub use rules::{BindingRule, ExclusivityRule, FairnessTarget, PairBalance, RuleSet, SodPair};
pub use table::{Assignment, AssignmentTable, InstanceRow, UNASSIGNED_SENTINEL};
pub use task::TaskType;
