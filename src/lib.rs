//! Multi-instance task assignment for the U-Engine ecosystem.
//!
//! Assigns persons to the steps of a recurring process across many
//! instances, enforcing role-hierarchy eligibility, separation of duty,
//! binding rules and role exclusivity, with a workload-fairness objective.
//! Finished tables are re-checked by an independent compliance validator.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Person`, `RoleHierarchy`, `TaskType`,
//!   `RuleSet`, `ProcessConfig`, `ConfigBundle`, `AssignmentTable`
//! - **`validation`**: Input integrity checks (duplicate IDs, unknown
//!   references, dominance cycles)
//! - **`eligibility`**: Dominance expansion and exclusivity narrowing
//!   (`ResolvedConfig`)
//! - **`cp`**: Optimization engine boundary: `AssignmentModel`,
//!   `AssignmentSolver`, `BoundedSearchSolver`
//! - **`allocation`**: Batch and sequential strategies, workload KPIs
//! - **`compliance`**: Table validator producing tagged diagnostics
//! - **`io`**: CSV tables and JSON configuration
//! - **`error`**: `ConfigError`, `AllocationError`
//! - **`telemetry`**: Subscriber setup for the binary
//!
//! # Data Flow
//!
//! ```text
//! ProcessConfig ─▶ ResolvedConfig ─▶ Batch | Sequential ─▶ AssignmentTable ─▶ ComplianceValidator ─▶ diagnostics
//! ```
//!
//! # References
//!
//! - Sandhu et al. (1996), "Role-Based Access Control Models"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Ahuja, Magnanti & Orlin (1993), "Network Flows"

pub mod allocation;
pub mod compliance;
pub mod cp;
pub mod eligibility;
pub mod error;
pub mod io;
pub mod models;
pub mod telemetry;
pub mod validation;
