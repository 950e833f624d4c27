//! Batch allocation: all instances solved jointly.

use tracing::{info, warn};

use super::model::AllocationModelBuilder;
use crate::cp::{AssignmentSolver, BoundedSearchSolver, SolverConfig, SolverStatus};
use crate::eligibility::ResolvedConfig;
use crate::error::AllocationError;
use crate::models::AssignmentTable;

/// Result of a batch allocation.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// `Optimal` (objective meets the relaxation bound) or `Feasible`
    /// (time-limited, optimum not confirmed).
    pub status: SolverStatus,
    /// Complete table covering all `N × |tasks|` slots.
    pub table: AssignmentTable,
    /// Realized fairness objective.
    pub objective_value: f64,
    /// Relaxation lower bound, if computed.
    pub lower_bound: Option<f64>,
    /// Improvement iterations performed.
    pub iterations: usize,
}

impl BatchOutcome {
    /// Whether optimality was certified.
    pub fn is_optimal(&self) -> bool {
        self.status == SolverStatus::Optimal
    }
}

/// Solves all `N` instances as one constrained optimization minimizing
/// workload-fairness deviation.
///
/// Among equally fair tables the one returned depends on the solver's
/// RNG; fix [`SolverConfig::seed`] for reproducible runs.
///
/// # Example
/// ```
/// use u_assign::allocation::BatchAllocator;
/// use u_assign::cp::SolverConfig;
/// use u_assign::eligibility::ResolvedConfig;
/// use u_assign::models::{Person, ProcessConfig, RoleHierarchy, RuleSet, TaskType};
///
/// let config = ProcessConfig::new("demo")
///     .with_hierarchy(RoleHierarchy::new().with_role("A"))
///     .with_person(Person::new("p1", "A"))
///     .with_person(Person::new("p2", "A"))
///     .with_task(TaskType::new("T1", 1).with_role("A"))
///     .with_rules(RuleSet::new(4));
/// let resolved = ResolvedConfig::resolve(&config).unwrap();
/// let outcome = BatchAllocator::new()
///     .with_config(SolverConfig::default().with_seed(1))
///     .allocate(&resolved)
///     .unwrap();
/// assert_eq!(outcome.table.instance_count(), 4);
/// assert!(outcome.is_optimal());
/// ```
#[derive(Debug, Clone, Default)]
pub struct BatchAllocator<S = BoundedSearchSolver> {
    solver: S,
    config: SolverConfig,
}

impl BatchAllocator {
    /// Creates an allocator with the default engine and configuration.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: AssignmentSolver> BatchAllocator<S> {
    /// Creates an allocator with a custom engine.
    pub fn with_solver(solver: S) -> Self {
        Self {
            solver,
            config: SolverConfig::default(),
        }
    }

    /// Sets the engine configuration (deadline, limits, seed, cancel).
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the batch strategy.
    ///
    /// # Errors
    /// - [`AllocationError::Infeasible`] if the hard constraints admit no table
    /// - [`AllocationError::Internal`] for `Unbounded` or engine failures
    pub fn allocate(&self, resolved: &ResolvedConfig) -> Result<BatchOutcome, AllocationError> {
        let builder = AllocationModelBuilder::new(resolved).with_fairness();
        let (table, solution) = builder.solve(&self.solver, &self.config);

        match solution.status {
            SolverStatus::Optimal | SolverStatus::Feasible => {}
            SolverStatus::Infeasible => {
                return Err(AllocationError::Infeasible {
                    instance: None,
                    reason: solution
                        .detail
                        .unwrap_or_else(|| "hard constraints admit no assignment".into()),
                });
            }
            SolverStatus::Unbounded => {
                return Err(AllocationError::Internal(
                    "fairness objective reported unbounded".into(),
                ));
            }
            SolverStatus::InternalError => {
                return Err(AllocationError::Internal(
                    solution.detail.unwrap_or_else(|| "engine failure".into()),
                ));
            }
        }

        if table.instance_count() != resolved.instance_count() {
            return Err(AllocationError::Internal(format!(
                "engine returned {} instance(s), expected {}",
                table.instance_count(),
                resolved.instance_count()
            )));
        }

        let objective_value = solution.objective_value.unwrap_or(0.0);
        if solution.status == SolverStatus::Feasible {
            warn!(
                objective = objective_value,
                lower_bound = ?solution.lower_bound,
                "batch result is feasible but not certified optimal"
            );
        }
        info!(
            version = %resolved.version,
            instances = table.instance_count(),
            status = ?solution.status,
            objective = objective_value,
            "batch allocation finished"
        );

        Ok(BatchOutcome {
            status: solution.status,
            table,
            objective_value,
            lower_bound: solution.lower_bound,
            iterations: solution.iterations,
        })
    }
}
