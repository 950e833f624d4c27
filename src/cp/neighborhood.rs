//! Instance neighborhoods for the improvement phase.
//!
//! A plan holds one pattern per instance. Destroy operators reopen a few
//! instances; the repair operator re-solves every open instance as a best
//! response to all the others. [`AlnsRunner`](u_metaheur::alns::AlnsRunner)
//! picks operators adaptively and accepts worse plans by simulated
//! annealing.
//!
//! All hard constraints live inside a single instance, so any mix of
//! feasible patterns is a feasible plan.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::seq::{index, SliceRandom};
use rand::Rng;
use u_metaheur::alns::{AlnsProblem, DestroyOperator, RepairOperator};

use super::cost::{objective_value, CountState};
use super::model::{AssignmentModel, Objective};
use super::search::InstanceSearch;
use super::solver::CancelToken;

/// Gap under which an objective counts as equal to the lower bound.
pub(crate) const CERTIFY_EPS: f64 = 1e-6;

/// One pattern per instance, plus the instances a destroy step reopened.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InstancePlan {
    pub patterns: Vec<Vec<usize>>,
    pub open: Vec<usize>,
}

/// Stop conditions of one solve call.
///
/// Raises the runner's flag once the deadline passes, the caller cancels,
/// or a plan meets the lower bound.
#[derive(Debug)]
pub(crate) struct StopSignal {
    flag: Arc<AtomicBool>,
    deadline: Instant,
    cancel: Option<CancelToken>,
    bound: Option<f64>,
}

impl StopSignal {
    pub fn new(deadline: Instant, cancel: Option<CancelToken>, bound: Option<f64>) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline,
            cancel,
            bound,
        }
    }

    /// Flag handed to the runner.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Whether time ran out or the caller cancelled.
    pub fn expired(&self) -> bool {
        let expired = Instant::now() >= self.deadline
            || self.cancel.as_ref().is_some_and(CancelToken::is_cancelled);
        if expired {
            self.flag.store(true, Ordering::Relaxed);
        }
        expired
    }

    /// Whether `value` meets the lower bound.
    pub fn certifies(&self, value: f64) -> bool {
        self.bound.is_some_and(|b| value <= b + CERTIFY_EPS)
    }

    fn observe(&self, value: f64) {
        if self.certifies(value) {
            self.flag.store(true, Ordering::Relaxed);
        } else {
            self.expired();
        }
    }
}

/// The replicated-instance model seen as an ALNS problem.
pub(crate) struct ReplicatedProblem<'a> {
    model: &'a AssignmentModel,
    objective: &'a Objective,
    search: &'a InstanceSearch,
    fallback: &'a [usize],
    stop: &'a StopSignal,
}

impl<'a> ReplicatedProblem<'a> {
    /// `fallback` is a feasible pattern used for every instance the
    /// search could not re-solve in time.
    pub fn new(
        model: &'a AssignmentModel,
        objective: &'a Objective,
        search: &'a InstanceSearch,
        fallback: &'a [usize],
        stop: &'a StopSignal,
    ) -> Self {
        Self {
            model,
            objective,
            search,
            fallback,
            stop,
        }
    }

    /// Counts over every instance except `skip`.
    fn counts(&self, patterns: &[Vec<usize>], skip: &[usize]) -> CountState {
        let mut counts = CountState::new(self.model);
        for (instance, pattern) in patterns.iter().enumerate() {
            if !skip.contains(&instance) {
                counts.apply(Some(self.objective), pattern, 1);
            }
        }
        counts
    }

    /// Best response to `counts`, or `None` once time is up.
    fn respond<R: Rng>(&self, counts: &CountState, rng: &mut R) -> Option<Vec<usize>> {
        if self.stop.expired() {
            return None;
        }
        self.search
            .best_response(self.objective, counts, Some(rng))
            .found
            .map(|f| f.values)
    }
}

impl AlnsProblem for ReplicatedProblem<'_> {
    type Solution = InstancePlan;

    /// Greedy start: every instance is a best response to those before it.
    fn initial_solution<R: Rng>(&self, rng: &mut R) -> InstancePlan {
        let mut counts = CountState::new(self.model);
        let mut patterns = Vec::with_capacity(self.model.instance_count);
        for _ in 0..self.model.instance_count {
            let pattern = self
                .respond(&counts, rng)
                .unwrap_or_else(|| self.fallback.to_vec());
            counts.apply(Some(self.objective), &pattern, 1);
            patterns.push(pattern);
        }
        InstancePlan {
            patterns,
            open: Vec::new(),
        }
    }

    fn cost(&self, plan: &InstancePlan) -> f64 {
        let value = objective_value(self.objective, &self.counts(&plan.patterns, &[]));
        self.stop.observe(value);
        value
    }
}

/// Reopens a share of the instances.
pub(crate) enum InstanceDestroy<'a> {
    /// Instances chosen uniformly.
    Random,
    /// Instances holding the value furthest above its target.
    Overloaded(&'a ReplicatedProblem<'a>),
}

impl InstanceDestroy<'_> {
    fn overloaded<R: Rng>(
        problem: &ReplicatedProblem<'_>,
        plan: &InstancePlan,
        k: usize,
        rng: &mut R,
    ) -> Vec<usize> {
        let Objective::Fairness { target, .. } = problem.objective;
        let counts = problem.counts(&plan.patterns, &[]);
        let heaviest = counts
            .values
            .iter()
            .enumerate()
            .max_by(|a, b| (*a.1 as f64 - *target).total_cmp(&(*b.1 as f64 - *target)))
            .map(|(value, _)| value);

        let mut holders: Vec<usize> = match heaviest {
            Some(value) => (0..plan.patterns.len())
                .filter(|&i| plan.patterns[i].contains(&value))
                .collect(),
            None => Vec::new(),
        };
        holders.shuffle(rng);
        holders.truncate(k);
        holders
    }
}

impl DestroyOperator<InstancePlan> for InstanceDestroy<'_> {
    fn name(&self) -> &str {
        match self {
            InstanceDestroy::Random => "random-instances",
            InstanceDestroy::Overloaded(_) => "overloaded-instances",
        }
    }

    fn destroy<R: Rng>(&self, plan: &InstancePlan, degree: f64, rng: &mut R) -> InstancePlan {
        let n = plan.patterns.len();
        let k = ((n as f64 * degree).round() as usize).clamp(1, n.max(1));

        let mut open = match self {
            InstanceDestroy::Random => Vec::new(),
            InstanceDestroy::Overloaded(problem) => Self::overloaded(problem, plan, k, rng),
        };
        if open.is_empty() && n > 0 {
            open = index::sample(rng, n, k.min(n)).into_vec();
        }

        InstancePlan {
            patterns: plan.patterns.clone(),
            open,
        }
    }
}

/// Re-solves every open instance, in random order, as a best response.
pub(crate) struct BestResponseRepair<'a> {
    problem: &'a ReplicatedProblem<'a>,
}

impl<'a> BestResponseRepair<'a> {
    pub fn new(problem: &'a ReplicatedProblem<'a>) -> Self {
        Self { problem }
    }
}

impl RepairOperator<InstancePlan> for BestResponseRepair<'_> {
    fn name(&self) -> &str {
        "best-response"
    }

    fn repair<R: Rng>(&self, plan: &InstancePlan, rng: &mut R) -> InstancePlan {
        let mut patterns = plan.patterns.clone();
        let mut order = plan.open.clone();
        order.shuffle(rng);

        // Open instances keep their old pattern in the counts until re-solved.
        let mut counts = self.problem.counts(&patterns, &order);
        for instance in order {
            if let Some(pattern) = self.problem.respond(&counts, rng) {
                patterns[instance] = pattern;
            }
            counts.apply(Some(self.problem.objective), &patterns[instance], 1);
        }

        InstancePlan {
            patterns,
            open: Vec::new(),
        }
    }
}
