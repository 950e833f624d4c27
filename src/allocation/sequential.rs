//! Sequential allocation: instances solved one at a time.
//!
//! Each instance is a pure feasibility problem over the hard rules plus
//! an exclusion history: every (person, task) pair used by an earlier
//! instance is banned, except for exempted pairs. The history spreads
//! workload without an explicit objective. It is a greedy heuristic and
//! balances less tightly than the batch strategy when pools are small.
//!
//! Steps are inherently ordered: each one depends on the history of all
//! previous steps.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::model::AllocationModelBuilder;
use crate::cp::{AssignmentSolver, BoundedSearchSolver, SolverConfig, SolverStatus};
use crate::eligibility::ResolvedConfig;
use crate::error::{AllocationError, ConfigError};
use crate::models::AssignmentTable;

/// A (person, task) pair already used by a prior instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExclusionEntry {
    pub person: String,
    pub task: String,
}

/// Ordered record of used (person, task) pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExclusionHistory {
    entries: Vec<ExclusionEntry>,
}

impl ExclusionHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair. Duplicates are kept, so the history mirrors the
    /// assignment sequence.
    pub fn record(&mut self, person: impl Into<String>, task: impl Into<String>) {
        self.entries.push(ExclusionEntry {
            person: person.into(),
            task: task.into(),
        });
    }

    /// Whether the pair was used before.
    pub fn contains(&self, person: &str, task: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.person == person && e.task == task)
    }

    /// Entries in recording order.
    pub fn entries(&self) -> &[ExclusionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// (person, task) pairs allowed to repeat across instances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExemptionSet {
    pairs: HashSet<(String, String)>,
}

impl ExemptionSet {
    /// Creates an empty exemption set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exempt pair (builder style).
    pub fn with(mut self, person: impl Into<String>, task: impl Into<String>) -> Self {
        self.insert(person, task);
        self
    }

    /// Adds an exempt pair.
    pub fn insert(&mut self, person: impl Into<String>, task: impl Into<String>) {
        self.pairs.insert((person.into(), task.into()));
    }

    /// Whether the pair may repeat.
    pub fn contains(&self, person: &str, task: &str) -> bool {
        self.pairs
            .iter()
            .any(|(p, t)| p == person && t == task)
    }

    /// Every (person, task) whose effective pool is that one person.
    ///
    /// Without these, the pool's only member is excluded after the first
    /// instance and the second instance is infeasible.
    pub fn singleton_pools(resolved: &ResolvedConfig) -> Self {
        let mut set = Self::new();
        for (t, task) in resolved.tasks.iter().enumerate() {
            if let [only] = resolved.eligible(t) {
                set.insert(resolved.persons[*only].id.clone(), task.id.clone());
            }
        }
        set
    }

    /// Checks that every pair names a configured person and task.
    ///
    /// Pairs are checked in sorted order, so the reported id is stable.
    pub fn check(&self, resolved: &ResolvedConfig) -> Result<(), ConfigError> {
        let mut pairs: Vec<&(String, String)> = self.pairs.iter().collect();
        pairs.sort();
        for (person, task) in pairs {
            if resolved.person_idx(person).is_none() {
                return Err(ConfigError::UnknownPerson(person.clone()));
            }
            if resolved.task_idx(task).is_none() {
                return Err(ConfigError::UnknownTask(task.clone()));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Result of a sequential run.
#[derive(Debug, Clone, PartialEq)]
pub struct SequentialOutcome {
    /// One row per instance.
    pub table: AssignmentTable,
    /// Final exclusion history (including exempt pairs).
    pub history: ExclusionHistory,
}

/// Solves instances `0..N` strictly in order as feasibility problems.
///
/// Fully deterministic: the engine's feasibility search tries persons in
/// configuration declaration order, so identical configuration and
/// exemptions reproduce the identical table and history.
#[derive(Debug, Clone, Default)]
pub struct SequentialAllocator<S = BoundedSearchSolver> {
    solver: S,
    config: SolverConfig,
    exemptions: ExemptionSet,
}

impl SequentialAllocator {
    /// Creates an allocator with no exemptions.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: AssignmentSolver> SequentialAllocator<S> {
    /// Creates an allocator with a custom engine.
    pub fn with_solver(solver: S) -> Self {
        Self {
            solver,
            config: SolverConfig::default(),
            exemptions: ExemptionSet::new(),
        }
    }

    /// Sets the exemption set.
    pub fn with_exemptions(mut self, exemptions: ExemptionSet) -> Self {
        self.exemptions = exemptions;
        self
    }

    /// Sets the engine configuration used per instance.
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the sequential strategy.
    ///
    /// # Errors
    /// - [`AllocationError::Infeasible`] with the 0-based index of the first
    ///   instance that has no assignment under the current history. Fatal:
    ///   the history is a deterministic function of prior instances, so a
    ///   retry fails identically.
    /// - [`AllocationError::Config`] if an exemption names an unknown
    ///   person or task
    /// - [`AllocationError::Internal`] for engine failures
    pub fn allocate(&self, resolved: &ResolvedConfig) -> Result<SequentialOutcome, AllocationError> {
        self.exemptions.check(resolved)?;

        let mut table = AssignmentTable::new(resolved.task_ids());
        let mut history = ExclusionHistory::new();

        for instance in 0..resolved.instance_count() {
            let forbidden = self.forbidden_pairs(resolved, &history);
            let builder = AllocationModelBuilder::new(resolved)
                .with_instance_count(1)
                .with_forbidden(forbidden.clone());
            let (step, solution) = builder.solve(&self.solver, &self.config);

            match solution.status {
                SolverStatus::Optimal | SolverStatus::Feasible => {}
                SolverStatus::Infeasible => {
                    return Err(AllocationError::Infeasible {
                        instance: Some(instance),
                        reason: starved_reason(resolved, &forbidden),
                    });
                }
                SolverStatus::Unbounded | SolverStatus::InternalError => {
                    return Err(AllocationError::Internal(format!(
                        "instance index {instance}: {}",
                        solution.detail.unwrap_or_else(|| "engine failure".into())
                    )));
                }
            }

            let Some(row) = step.rows.into_iter().next() else {
                return Err(AllocationError::Internal(format!(
                    "instance index {instance}: engine returned no row"
                )));
            };
            for (task, person) in resolved.tasks.iter().zip(&row.cells) {
                if let Some(person) = person {
                    history.record(person.clone(), task.id.clone());
                }
            }
            debug!(instance, excluded = forbidden.len(), "instance solved");
            table.push_row(row.cells);
        }

        info!(
            version = %resolved.version,
            instances = table.instance_count(),
            history = history.len(),
            "sequential allocation finished"
        );

        Ok(SequentialOutcome { table, history })
    }

    /// History pairs not covered by an exemption, as (task, person) indices.
    fn forbidden_pairs(
        &self,
        resolved: &ResolvedConfig,
        history: &ExclusionHistory,
    ) -> Vec<(usize, usize)> {
        let mut seen = HashSet::new();
        history
            .entries()
            .iter()
            .filter(|e| !self.exemptions.contains(&e.person, &e.task))
            .filter_map(|e| Some((resolved.task_idx(&e.task)?, resolved.person_idx(&e.person)?)))
            .filter(|pair| seen.insert(*pair))
            .collect()
    }
}

/// Names the first task left without candidates, if any.
fn starved_reason(resolved: &ResolvedConfig, forbidden: &[(usize, usize)]) -> String {
    for (t, task) in resolved.tasks.iter().enumerate() {
        let left = resolved
            .eligible(t)
            .iter()
            .filter(|&&p| !forbidden.contains(&(t, p)))
            .count();
        if left == 0 {
            return format!(
                "task '{}' has no candidate left after {} exclusion(s)",
                task.id,
                forbidden.len()
            );
        }
    }
    format!(
        "no combination of remaining candidates satisfies the rules ({} exclusion(s))",
        forbidden.len()
    )
}
