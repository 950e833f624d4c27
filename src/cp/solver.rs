//! Solver interface and the bounded search implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};
use u_metaheur::alns::{AlnsConfig, AlnsProblem, AlnsRunner};

use super::bound::{lower_bound, FlowBound};
use super::cost::{objective_value, CountState};
use super::model::AssignmentModel;
use super::neighborhood::{BestResponseRepair, InstanceDestroy, ReplicatedProblem, StopSignal};
use super::search::InstanceSearch;

/// Status of the solver after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// Objective matches the relaxation bound.
    Optimal,
    /// Feasible, optimality not confirmed (time-limited).
    Feasible,
    /// No feasible solution exists.
    Infeasible,
    /// Objective is unbounded. Never produced for a fairness objective.
    Unbounded,
    /// Invalid model or a search that could not conclude.
    InternalError,
}

/// Solution from an [`AssignmentSolver`].
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solver status.
    pub status: SolverStatus,
    /// Objective value of `values` (if an objective was set).
    pub objective_value: Option<f64>,
    /// Relaxation lower bound (if computed).
    pub lower_bound: Option<f64>,
    /// Value per slot, one row per instance.
    pub values: Vec<Vec<usize>>,
    /// Improvement iterations performed.
    pub iterations: usize,
    /// Solve time in milliseconds.
    pub solve_time_ms: i64,
    /// Human-readable reason for non-solution statuses.
    pub detail: Option<String>,
}

impl Solution {
    /// Creates an empty solution with the given status.
    pub fn empty(status: SolverStatus) -> Self {
        Self {
            status,
            objective_value: None,
            lower_bound: None,
            values: Vec::new(),
            iterations: 0,
            solve_time_ms: 0,
            detail: None,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Whether a usable assignment was found.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, SolverStatus::Optimal | SolverStatus::Feasible)
    }
}

/// Cooperative cancellation flag shared with a running solve.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. The solver returns its best solution so far.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Solver configuration.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum solve time in milliseconds.
    pub time_limit_ms: i64,
    /// Maximum single-instance re-optimizations.
    pub max_iterations: usize,
    /// Search node limit per single-instance search.
    pub node_limit: usize,
    /// Stop after the first complete solution.
    pub stop_after_first: bool,
    /// RNG seed for tie-breaking. `None` = OS entropy.
    pub seed: Option<u64>,
    /// Absolute deadline; overrides `time_limit_ms` when earlier.
    pub deadline: Option<Instant>,
    /// Cancellation flag.
    pub cancel: Option<CancelToken>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 30_000,
            max_iterations: 20_000,
            node_limit: 2_000_000,
            stop_after_first: false,
            seed: None,
            deadline: None,
            cancel: None,
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit_ms(mut self, ms: i64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn with_node_limit(mut self, nodes: usize) -> Self {
        self.node_limit = nodes;
        self
    }

    pub fn with_stop_after_first(mut self, stop: bool) -> Self {
        self.stop_after_first = stop;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Effective deadline for a solve started at `start`.
    fn effective_deadline(&self, start: Instant) -> Instant {
        let limit = start + Duration::from_millis(self.time_limit_ms.max(0) as u64);
        match self.deadline {
            Some(d) if d < limit => d,
            _ => limit,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// Trait for assignment solver implementations.
///
/// Implementors receive an immutable model and return a solution; the
/// caller never sees the search itself.
pub trait AssignmentSolver {
    /// Solves the model and returns a solution.
    fn solve(&self, model: &AssignmentModel, config: &SolverConfig) -> Solution;
}

/// Exact per-instance search with large-neighborhood improvement.
///
/// 1. Checks single-instance feasibility with a deterministic DFS.
/// 2. Without an objective, replicates the first feasible instance.
/// 3. With a fairness objective, builds instances greedily (each one a
///    best response to those before it), then improves the plan with
///    adaptive large neighborhood search: reopen a few instances, re-solve
///    each as a best response to the rest.
/// 4. Certifies `Optimal` when the objective meets the convex-flow
///    relaxation bound. The deadline, iteration limit or cancellation
///    ends the search with `Feasible`; instances not yet solved by then
///    repeat the first feasible pattern.
///
/// Ties between equal-cost choices are broken by the RNG; runs are
/// reproducible only with a fixed seed.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundedSearchSolver;

impl BoundedSearchSolver {
    pub fn new() -> Self {
        Self
    }
}

impl AssignmentSolver for BoundedSearchSolver {
    fn solve(&self, model: &AssignmentModel, config: &SolverConfig) -> Solution {
        let start = Instant::now();
        let mut solution = self.run(model, config, start);
        solution.solve_time_ms = start.elapsed().as_millis() as i64;
        solution
    }
}

impl BoundedSearchSolver {
    fn run(&self, model: &AssignmentModel, config: &SolverConfig, start: Instant) -> Solution {
        if let Err(e) = model.validate() {
            return Solution::empty(SolverStatus::InternalError)
                .with_detail(format!("invalid model: {e}"));
        }

        let deadline = config.effective_deadline(start);
        let search = InstanceSearch::compile(model, config.node_limit).with_deadline(deadline);
        if let Some(slot) = search.empty_slot() {
            return Solution::empty(SolverStatus::Infeasible)
                .with_detail(format!("slot {slot} has no admissible value"));
        }

        let n = model.instance_count;
        if n == 0 {
            let empty = CountState::new(model);
            let value = model.objective.as_ref().map(|o| objective_value(o, &empty));
            return Solution {
                objective_value: value,
                lower_bound: value,
                ..Solution::empty(SolverStatus::Optimal)
            };
        }

        let first = search.first_feasible();
        let Some(first) = first.found else {
            return if first.truncated {
                Solution::empty(SolverStatus::InternalError)
                    .with_detail("node limit or deadline reached before a feasible instance was found")
            } else {
                Solution::empty(SolverStatus::Infeasible)
                    .with_detail("no instance satisfies the constraints")
            };
        };

        let Some(objective) = model.objective.as_ref() else {
            debug!(model = %model.name, instances = n, "feasibility only");
            return Solution {
                values: vec![first.values; n],
                ..Solution::empty(SolverStatus::Optimal)
            };
        };

        let bound = if Instant::now() >= deadline || config.is_cancelled() {
            None
        } else {
            match lower_bound(model, search.domains()) {
                FlowBound::Bound(b) => Some(b),
                FlowBound::Infeasible => {
                    return Solution::empty(SolverStatus::Infeasible)
                        .with_detail("slot demand exceeds value capacity");
                }
                FlowBound::Unavailable => {
                    warn!(model = %model.name, "lower bound unavailable");
                    None
                }
            }
        };

        let stop = StopSignal::new(deadline, config.cancel.clone(), bound);
        let problem = ReplicatedProblem::new(model, objective, &search, &first.values, &stop);

        let (plan, value, iterations) = if config.stop_after_first || config.max_iterations == 0 {
            let mut rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            let plan = problem.initial_solution(&mut rng);
            let value = problem.cost(&plan);
            (plan, value, 0)
        } else {
            let destroy = [
                InstanceDestroy::Random,
                InstanceDestroy::Overloaded(&problem),
            ];
            let repair = [BestResponseRepair::new(&problem)];
            let result = AlnsRunner::run_with_cancel(
                &problem,
                &destroy,
                &repair,
                &alns_config(config),
                Some(stop.flag()),
            )
            .expect("invalid AlnsConfig");
            debug!(
                model = %model.name,
                improvements = result.improvements,
                destroy_weights = ?result.destroy_weights,
                "alns finished"
            );
            (result.best, result.best_cost, result.iterations)
        };

        let status = if stop.certifies(value) {
            SolverStatus::Optimal
        } else {
            warn!(
                model = %model.name,
                objective = value,
                ?bound,
                iterations,
                "optimality not certified"
            );
            SolverStatus::Feasible
        };
        info!(
            model = %model.name,
            ?status,
            objective = value,
            iterations,
            "solve finished"
        );

        Solution {
            status,
            objective_value: Some(value),
            lower_bound: bound,
            values: plan.patterns,
            iterations,
            solve_time_ms: 0,
            detail: None,
        }
    }
}

/// Maps solver limits onto the ALNS runner.
fn alns_config(config: &SolverConfig) -> AlnsConfig {
    let alns = AlnsConfig::default()
        .with_max_iterations(config.max_iterations)
        .with_segment_length(50)
        .with_destroy_degree(0.05, 0.25)
        .with_temperature(1.0, 0.995, 0.01);
    match config.seed {
        Some(seed) => alns.with_seed(seed),
        None => alns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::model::{BalanceTerm, Objective};

    fn fairness_model(n: usize) -> AssignmentModel {
        // Three slots over four values; value 3 is only admissible on slot 2.
        let mut m = AssignmentModel::new("fair", n, 4);
        m.add_slot(vec![0, 1, 2]);
        m.add_slot(vec![0, 1, 2]);
        m.add_slot(vec![0, 1, 2, 3]);
        m.add_all_different(vec![0, 1, 2]);
        m.set_objective(Objective::Fairness {
            target: (n * 3) as f64 / 4.0,
            balance: vec![],
        });
        m
    }

    fn check_feasible(model: &AssignmentModel, values: &[Vec<usize>]) {
        assert_eq!(values.len(), model.instance_count);
        for row in values {
            assert_eq!(row.len(), model.slot_count());
            for (slot, v) in row.iter().enumerate() {
                assert!(model.domains[slot].contains(v));
            }
            let mut sorted = row.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), row.len());
        }
    }

    #[test]
    fn test_solves_to_certified_optimum() {
        let model = fairness_model(8);
        let config = SolverConfig::default().with_seed(1);
        let sol = BoundedSearchSolver::new().solve(&model, &config);

        assert_eq!(sol.status, SolverStatus::Optimal);
        assert!(sol.is_solution_found());
        check_feasible(&model, &sol.values);
        // 24 slots over 4 values: 6 each is reachable.
        assert!(sol.objective_value.unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_feasibility_only_replicates() {
        let mut model = fairness_model(5);
        model.objective = None;
        let sol = BoundedSearchSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(sol.status, SolverStatus::Optimal);
        assert_eq!(sol.values.len(), 5);
        assert!(sol.values.iter().all(|row| row == &sol.values[0]));
        assert_eq!(sol.objective_value, None);
    }

    #[test]
    fn test_infeasible_model() {
        let mut model = AssignmentModel::new("pigeon", 3, 2);
        for _ in 0..3 {
            model.add_slot(vec![0, 1]);
        }
        model.add_all_different(vec![0, 1, 2]);
        let sol = BoundedSearchSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(sol.status, SolverStatus::Infeasible);
        assert!(!sol.is_solution_found());
        assert!(sol.detail.is_some());
    }

    #[test]
    fn test_empty_domain_is_infeasible() {
        let mut model = AssignmentModel::new("forbidden", 2, 2);
        model.add_slot(vec![1]);
        model.forbid(0, 1);
        let sol = BoundedSearchSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(sol.status, SolverStatus::Infeasible);
    }

    #[test]
    fn test_invalid_model_is_internal_error() {
        let mut model = AssignmentModel::new("bad", 1, 1);
        model.add_slot(vec![4]);
        let sol = BoundedSearchSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(sol.status, SolverStatus::InternalError);
    }

    #[test]
    fn test_zero_instances() {
        let model = fairness_model(0);
        let sol = BoundedSearchSolver::new().solve(&model, &SolverConfig::default());
        assert_eq!(sol.status, SolverStatus::Optimal);
        assert!(sol.values.is_empty());
    }

    #[test]
    fn test_cancelled_returns_feasible_incumbent() {
        // Imbalance that no assignment removes keeps the bound above zero;
        // cancellation before the loop leaves the greedy start in place.
        let mut model = fairness_model(7);
        model.set_objective(Objective::Fairness {
            target: 1.0,
            balance: vec![BalanceTerm {
                slot: 2,
                value: 3,
                target: 100.0,
                weight: 1.0,
            }],
        });
        let token = CancelToken::new();
        token.cancel();
        let config = SolverConfig::default().with_seed(3).with_cancel(token);
        let sol = BoundedSearchSolver::new().solve(&model, &config);

        assert_eq!(sol.status, SolverStatus::Feasible);
        assert_eq!(sol.iterations, 0);
        assert_eq!(sol.lower_bound, None);
        check_feasible(&model, &sol.values);
    }

    fn wide_model(n: usize) -> AssignmentModel {
        // Twelve distinct slots over sixteen overlapping values.
        let mut model = AssignmentModel::new("wide", n, 16);
        for s in 0..12 {
            model.add_slot((0..10).map(|k| (s + k) % 16).collect());
        }
        model.add_all_different((0..12).collect());
        model.set_objective(Objective::Fairness {
            target: (n * 12) as f64 / 16.0,
            balance: vec![],
        });
        model
    }

    #[test]
    fn test_time_limit_bounds_large_model() {
        let model = wide_model(2000);
        let config = SolverConfig::default().with_seed(11).with_time_limit_ms(20);
        let sol = BoundedSearchSolver::new().solve(&model, &config);

        assert!(sol.is_solution_found());
        assert!(sol.solve_time_ms < 2000, "took {} ms", sol.solve_time_ms);
        check_feasible(&model, &sol.values);
    }

    #[test]
    fn test_expired_deadline_returns_feasible() {
        let model = wide_model(2000);
        let config = SolverConfig::default()
            .with_seed(11)
            .with_deadline(Instant::now());
        let sol = BoundedSearchSolver::new().solve(&model, &config);

        assert_eq!(sol.status, SolverStatus::Feasible);
        assert_eq!(sol.iterations, 0);
        assert_eq!(sol.lower_bound, None);
        check_feasible(&model, &sol.values);
        // Every instance repeats the first feasible pattern.
        assert!(sol.values.iter().all(|row| row == &sol.values[0]));
    }

    #[test]
    fn test_stop_after_first_skips_improvement() {
        let model = fairness_model(4);
        let config = SolverConfig::default()
            .with_seed(5)
            .with_stop_after_first(true);
        let sol = BoundedSearchSolver::new().solve(&model, &config);
        assert!(sol.is_solution_found());
        assert_eq!(sol.iterations, 0);
        check_feasible(&model, &sol.values);
    }

    #[test]
    fn test_seed_reproducible() {
        let model = fairness_model(6);
        let config = SolverConfig::default().with_seed(42);
        let a = BoundedSearchSolver::new().solve(&model, &config);
        let b = BoundedSearchSolver::new().solve(&model, &config);
        assert_eq!(a.values, b.values);
    }

    #[test]
    fn test_config_builders() {
        let config = SolverConfig::default()
            .with_time_limit_ms(500)
            .with_max_iterations(10)
            .with_node_limit(99)
            .with_stop_after_first(true)
            .with_seed(7);
        assert_eq!(config.time_limit_ms, 500);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.node_limit, 99);
        assert!(config.stop_after_first);
        assert_eq!(config.seed, Some(7));
    }
}
