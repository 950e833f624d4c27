//! Assignment optimization engine.
//!
//! A domain-agnostic model for replicated-instance assignment problems:
//! integer slots with finite domains, per-instance constraints, and a
//! convex fairness objective over value counts across all instances.
//!
//! # Key Components
//!
//! - **Model**: [`AssignmentModel`] with [`Constraint`] and [`Objective`],
//!   built once per solve and never mutated by the solver
//! - **Solver**: [`AssignmentSolver`] trait, [`BoundedSearchSolver`]
//!   implementation, [`SolverConfig`] (deadline, limits, seed, cancel)
//! - **Improvement**: instance neighborhoods driven by the ALNS runner of
//!   `u-metaheur`
//! - **Result**: [`Solution`] with a [`SolverStatus`]
//!
//! # Design
//!
//! Allocation strategies build a model from the resolved configuration
//! and hand it to a solver; they never depend on how the search works.
//! Any type implementing [`AssignmentSolver`] can be plugged in.
//!
//! # References
//!
//! Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

mod bound;
mod cost;
mod model;
mod neighborhood;
mod search;
mod solver;

pub use model::{AssignmentModel, BalanceTerm, Constraint, Objective};
pub use solver::{
    AssignmentSolver, BoundedSearchSolver, CancelToken, Solution, SolverConfig, SolverStatus,
};
