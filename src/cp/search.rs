//! Exact single-instance search.
//!
//! Depth-first search over the slots of one instance, smallest domain
//! first. Two modes share the consistency check:
//!
//! - **Feasibility**: the first consistent assignment in domain order.
//!   Deterministic for a given model.
//! - **Best response**: branch and bound minimizing the fairness cost of
//!   adding this instance to the counts of all other instances. Values are
//!   tried cheapest first; only strictly better leaves replace the
//!   incumbent, so the order among equal-cost values decides ties.
//!
//! Both modes stop at the node limit or the deadline, whichever comes
//! first, and report the result as truncated.
//!
//! # Reference
//! Dechter (2003), "Constraint Processing", Ch. 5 (Backtracking)

use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;

use super::cost::{marginal, CountState};
use super::model::{AssignmentModel, Constraint, Objective};

const EPS: f64 = 1e-9;

/// Nodes between two deadline checks.
const CLOCK_STRIDE: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Implication {
    slot: usize,
    value: usize,
    then_slot: usize,
    then_value: usize,
}

/// An instance assignment found by the search.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Found {
    /// Value per slot.
    pub values: Vec<usize>,
    /// Cost increment (best-response mode) or 0.0 (feasibility mode).
    pub cost: f64,
}

/// Outcome of one search call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SearchResult {
    pub found: Option<Found>,
    /// The node limit or the deadline stopped the search before it was
    /// exhaustive.
    pub truncated: bool,
}

/// Slot-level view of an [`AssignmentModel`] compiled for search.
#[derive(Debug, Clone)]
pub(crate) struct InstanceSearch {
    domains: Vec<Vec<usize>>,
    order: Vec<usize>,
    differ: Vec<Vec<bool>>,
    implications: Vec<Implication>,
    node_limit: usize,
    deadline: Option<Instant>,
}

impl InstanceSearch {
    /// Compiles a validated model.
    pub fn compile(model: &AssignmentModel, node_limit: usize) -> Self {
        let n = model.slot_count();
        let mut domains = model.domains.clone();
        let mut differ = vec![vec![false; n]; n];
        let mut implications = Vec::new();

        for constraint in &model.constraints {
            match *constraint {
                Constraint::AllDifferent { ref slots } => {
                    for &a in slots {
                        for &b in slots {
                            if a != b {
                                differ[a][b] = true;
                            }
                        }
                    }
                }
                Constraint::NotEqual { first, second } => {
                    if first != second {
                        differ[first][second] = true;
                        differ[second][first] = true;
                    }
                }
                Constraint::Implies {
                    slot,
                    value,
                    then_slot,
                    then_value,
                } => {
                    if slot == then_slot {
                        if value != then_value {
                            domains[slot].retain(|&v| v != value);
                        }
                    } else {
                        implications.push(Implication {
                            slot,
                            value,
                            then_slot,
                            then_value,
                        });
                    }
                }
                Constraint::Forbid { slot, value } => {
                    domains[slot].retain(|&v| v != value);
                }
            }
        }

        for domain in &mut domains {
            let mut seen = std::collections::HashSet::new();
            domain.retain(|v| seen.insert(*v));
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&s| domains[s].len());

        Self {
            domains,
            order,
            differ,
            implications,
            node_limit: node_limit.max(1),
            deadline: None,
        }
    }

    /// Stops every later search call at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// First slot whose domain became empty, if any.
    pub fn empty_slot(&self) -> Option<usize> {
        self.domains.iter().position(Vec::is_empty)
    }

    /// Effective domain of a slot after forbids.
    pub fn domain(&self, slot: usize) -> &[usize] {
        &self.domains[slot]
    }

    /// Effective domains of all slots.
    pub fn domains(&self) -> &[Vec<usize>] {
        &self.domains
    }

    /// First consistent assignment, values tried in domain order.
    pub fn first_feasible(&self) -> SearchResult {
        let mut dfs = Dfs::new(self, self.domains.clone());
        let ok = dfs.feasible(0);
        SearchResult {
            found: ok.then(|| Found {
                values: dfs.values(),
                cost: 0.0,
            }),
            truncated: dfs.truncated,
        }
    }

    /// Cheapest consistent assignment given the counts of all other instances.
    ///
    /// With an RNG, equal-cost values are tried in random order.
    pub fn best_response<R: Rng>(
        &self,
        objective: &Objective,
        base: &CountState,
        rng: Option<&mut R>,
    ) -> SearchResult {
        let mut domains = self.domains.clone();
        if let Some(rng) = rng {
            for domain in &mut domains {
                domain.shuffle(rng);
            }
        }

        // Cheapest first; the sort is stable so shuffled ties stay shuffled.
        let mut floor = vec![0.0; self.domains.len()];
        for (slot, domain) in domains.iter_mut().enumerate() {
            let cost = |v: usize| marginal(objective, base, slot, v, 0);
            domain.sort_by(|&a, &b| cost(a).total_cmp(&cost(b)));
            floor[slot] = domain.first().map_or(0.0, |&v| cost(v));
        }

        // Convexity: marginals only grow as the instance fills, so the
        // base-level minimum is a valid lower bound for every open slot.
        let mut remaining = vec![0.0; self.order.len() + 1];
        for depth in (0..self.order.len()).rev() {
            remaining[depth] = remaining[depth + 1] + floor[self.order[depth]];
        }

        let mut dfs = Dfs::new(self, domains);
        let mut bnb = BranchAndBound {
            objective,
            base,
            remaining,
            pending: vec![0; base.values.len()],
            best: None,
            best_cost: f64::INFINITY,
        };
        dfs.best(0, 0.0, &mut bnb);

        SearchResult {
            found: bnb.best.map(|values| Found {
                values,
                cost: bnb.best_cost,
            }),
            truncated: dfs.truncated,
        }
    }
}

struct BranchAndBound<'a> {
    objective: &'a Objective,
    base: &'a CountState,
    remaining: Vec<f64>,
    pending: Vec<i64>,
    best: Option<Vec<usize>>,
    best_cost: f64,
}

struct Dfs<'a> {
    search: &'a InstanceSearch,
    domains: Vec<Vec<usize>>,
    assign: Vec<Option<usize>>,
    nodes: usize,
    truncated: bool,
}

impl<'a> Dfs<'a> {
    fn new(search: &'a InstanceSearch, domains: Vec<Vec<usize>>) -> Self {
        let n = domains.len();
        Self {
            search,
            domains,
            assign: vec![None; n],
            nodes: 0,
            truncated: false,
        }
    }

    fn values(&self) -> Vec<usize> {
        self.assign.iter().map(|v| v.unwrap_or(0)).collect()
    }

    fn tick(&mut self) -> bool {
        self.nodes += 1;
        if self.nodes > self.search.node_limit {
            self.truncated = true;
        } else if self.nodes % CLOCK_STRIDE == 0 {
            if let Some(deadline) = self.search.deadline {
                if Instant::now() >= deadline {
                    self.truncated = true;
                }
            }
        }
        !self.truncated
    }

    fn consistent(&self, slot: usize, value: usize) -> bool {
        for (other, assigned) in self.assign.iter().enumerate() {
            if *assigned == Some(value) && self.search.differ[slot][other] {
                return false;
            }
        }
        for imp in &self.search.implications {
            if imp.slot == slot && imp.value == value {
                if let Some(held) = self.assign[imp.then_slot] {
                    if held != imp.then_value {
                        return false;
                    }
                }
            }
            if imp.then_slot == slot
                && value != imp.then_value
                && self.assign[imp.slot] == Some(imp.value)
            {
                return false;
            }
        }
        true
    }

    fn feasible(&mut self, depth: usize) -> bool {
        if depth == self.search.order.len() {
            return true;
        }
        let slot = self.search.order[depth];
        for i in 0..self.domains[slot].len() {
            if !self.tick() {
                return false;
            }
            let value = self.domains[slot][i];
            if self.consistent(slot, value) {
                self.assign[slot] = Some(value);
                if self.feasible(depth + 1) {
                    return true;
                }
                self.assign[slot] = None;
            }
        }
        false
    }

    fn best(&mut self, depth: usize, cost: f64, bnb: &mut BranchAndBound<'_>) {
        if cost + bnb.remaining[depth] >= bnb.best_cost - EPS {
            return;
        }
        if depth == self.search.order.len() {
            bnb.best_cost = cost;
            bnb.best = Some(self.values());
            return;
        }
        let slot = self.search.order[depth];
        for i in 0..self.domains[slot].len() {
            if !self.tick() {
                return;
            }
            let value = self.domains[slot][i];
            if !self.consistent(slot, value) {
                continue;
            }
            let step = marginal(bnb.objective, bnb.base, slot, value, bnb.pending[value]);
            self.assign[slot] = Some(value);
            bnb.pending[value] += 1;
            self.best(depth + 1, cost + step, bnb);
            bnb.pending[value] -= 1;
            self.assign[slot] = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::model::BalanceTerm;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_slot_model() -> AssignmentModel {
        let mut m = AssignmentModel::new("search", 4, 3);
        let a = m.add_slot(vec![0, 1]);
        let b = m.add_slot(vec![0, 1, 2]);
        m.add_all_different(vec![a, b]);
        m
    }

    #[test]
    fn test_first_feasible_is_deterministic() {
        let m = two_slot_model();
        let s = InstanceSearch::compile(&m, 1_000);
        let r1 = s.first_feasible();
        let r2 = s.first_feasible();
        assert_eq!(r1, r2);
        assert_eq!(r1.found.unwrap().values, vec![0, 1]);
    }

    #[test]
    fn test_forbid_and_implication() {
        let mut m = two_slot_model();
        m.forbid(0, 0);
        m.add_implies(0, 1, 1, 2);
        let s = InstanceSearch::compile(&m, 1_000);
        assert_eq!(s.domain(0), &[1]);
        assert_eq!(s.first_feasible().found.unwrap().values, vec![1, 2]);
    }

    #[test]
    fn test_infeasible_instance() {
        let mut m = AssignmentModel::new("tight", 1, 1);
        m.add_slot(vec![0]);
        m.add_slot(vec![0]);
        m.add_all_different(vec![0, 1]);
        let s = InstanceSearch::compile(&m, 1_000);
        let r = s.first_feasible();
        assert!(r.found.is_none());
        assert!(!r.truncated);
    }

    #[test]
    fn test_empty_slot_after_forbid() {
        let mut m = AssignmentModel::new("empty", 1, 2);
        m.add_slot(vec![1]);
        m.forbid(0, 1);
        let s = InstanceSearch::compile(&m, 10);
        assert_eq!(s.empty_slot(), Some(0));
    }

    #[test]
    fn test_best_response_prefers_underused_values() {
        let mut m = two_slot_model();
        m.set_objective(Objective::Fairness {
            target: 8.0 / 3.0,
            balance: vec![],
        });
        let obj = m.objective.clone().unwrap();
        let mut base = CountState::new(&m);
        base.values = vec![4, 4, 0];

        let s = InstanceSearch::compile(&m, 10_000);
        let r = s.best_response::<StdRng>(&obj, &base, None);
        let found = r.found.unwrap();
        // Value 2 is far below target; it must be used.
        assert!(found.values.contains(&2));
    }

    #[test]
    fn test_best_response_honours_balance_term() {
        let mut m = AssignmentModel::new("balance", 10, 2);
        m.add_slot(vec![0, 1]);
        m.set_objective(Objective::Fairness {
            target: 5.0,
            balance: vec![BalanceTerm {
                slot: 0,
                value: 0,
                target: 2.0,
                weight: 10.0,
            }],
        });
        let obj = m.objective.clone().unwrap();
        let mut base = CountState::new(&m);
        base.values = vec![2, 7];
        base.balance = vec![2];

        let s = InstanceSearch::compile(&m, 10_000);
        let mut rng = StdRng::seed_from_u64(7);
        let r = s.best_response(&obj, &base, Some(&mut rng));
        assert_eq!(r.found.unwrap().values, vec![1]);
    }

    #[test]
    fn test_node_limit_truncates() {
        let mut m = AssignmentModel::new("wide", 1, 8);
        for _ in 0..8 {
            m.add_slot((0..8).collect());
        }
        m.add_all_different((0..8).collect());
        let s = InstanceSearch::compile(&m, 3);
        let r = s.first_feasible();
        assert!(r.truncated);
        assert!(r.found.is_none());
    }

    #[test]
    fn test_deadline_truncates() {
        let mut m = AssignmentModel::new("late", 1, 12);
        for _ in 0..12 {
            m.add_slot((0..11).collect());
        }
        m.add_all_different((0..12).collect());
        // Twelve slots over eleven values: exhausting the tree takes far
        // longer than an already expired deadline allows.
        let s = InstanceSearch::compile(&m, usize::MAX).with_deadline(Instant::now());
        let r = s.first_feasible();
        assert!(r.truncated);
        assert!(r.found.is_none());
    }
}
