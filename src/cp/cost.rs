//! Fairness objective evaluation.
//!
//! Every term of the fairness objective is a convex function of a single
//! count, so the cost of adding one more unit never decreases as the count
//! grows. The search relies on that to bound partial assignments.

use super::model::{AssignmentModel, Objective};

/// Accumulated counts over a set of instance patterns.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CountState {
    /// Slots held per value.
    pub values: Vec<i64>,
    /// Count per balance term.
    pub balance: Vec<i64>,
}

impl CountState {
    pub fn new(model: &AssignmentModel) -> Self {
        let terms = match &model.objective {
            Some(Objective::Fairness { balance, .. }) => balance.len(),
            None => 0,
        };
        Self {
            values: vec![0; model.value_count],
            balance: vec![0; terms],
        }
    }

    /// Adds (`sign = 1`) or removes (`sign = -1`) one instance pattern.
    pub fn apply(&mut self, objective: Option<&Objective>, pattern: &[usize], sign: i64) {
        for &value in pattern {
            self.values[value] += sign;
        }
        if let Some(Objective::Fairness { balance, .. }) = objective {
            for (i, term) in balance.iter().enumerate() {
                if pattern.get(term.slot) == Some(&term.value) {
                    self.balance[i] += sign;
                }
            }
        }
    }
}

#[inline]
fn dev(count: i64, target: f64) -> f64 {
    (count as f64 - target).abs()
}

/// Objective value of the given counts.
pub(crate) fn objective_value(objective: &Objective, state: &CountState) -> f64 {
    match objective {
        Objective::Fairness { target, balance } => {
            let spread: f64 = state.values.iter().map(|&c| dev(c, *target)).sum();
            let terms: f64 = balance
                .iter()
                .zip(&state.balance)
                .map(|(term, &c)| term.weight * dev(c, term.target))
                .sum();
            spread + terms
        }
    }
}

/// Cost of placing `value` on `slot` once more.
///
/// `pending` is how many times `value` already appears in the partial
/// instance being built (not yet folded into `state`).
pub(crate) fn marginal(
    objective: &Objective,
    state: &CountState,
    slot: usize,
    value: usize,
    pending: i64,
) -> f64 {
    match objective {
        Objective::Fairness { target, balance } => {
            let c = state.values[value] + pending;
            let mut delta = dev(c + 1, *target) - dev(c, *target);
            for (term, &bc) in balance.iter().zip(&state.balance) {
                if term.slot == slot && term.value == value {
                    delta += term.weight * (dev(bc + 1, term.target) - dev(bc, term.target));
                }
            }
            delta
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::model::BalanceTerm;

    fn model() -> AssignmentModel {
        let mut m = AssignmentModel::new("cost", 2, 3);
        m.add_slot(vec![0, 1]);
        m.add_slot(vec![1, 2]);
        m.set_objective(Objective::Fairness {
            target: 4.0 / 3.0,
            balance: vec![BalanceTerm {
                slot: 0,
                value: 0,
                target: 1.0,
                weight: 2.0,
            }],
        });
        m
    }

    #[test]
    fn test_apply_and_value() {
        let m = model();
        let obj = m.objective.as_ref().unwrap();
        let mut state = CountState::new(&m);
        state.apply(Some(obj), &[0, 1], 1);
        state.apply(Some(obj), &[1, 2], 1);

        assert_eq!(state.values, vec![1, 2, 1]);
        assert_eq!(state.balance, vec![1]);
        // |1-4/3| + |2-4/3| + |1-4/3| + 2·|1-1|
        let expected = 1.0 / 3.0 + 2.0 / 3.0 + 1.0 / 3.0;
        assert!((objective_value(obj, &state) - expected).abs() < 1e-9);

        state.apply(Some(obj), &[1, 2], -1);
        assert_eq!(state.values, vec![1, 1, 0]);
    }

    #[test]
    fn test_marginal_matches_difference() {
        let m = model();
        let obj = m.objective.as_ref().unwrap();
        let mut state = CountState::new(&m);
        let before = objective_value(obj, &state);
        let delta = marginal(obj, &state, 0, 0, 0);

        // Pattern covering slot 0 only: value 0 on the balanced slot.
        state.apply(Some(obj), &[0], 1);
        assert!((objective_value(obj, &state) - before - delta).abs() < 1e-9);
    }

    #[test]
    fn test_marginal_is_non_decreasing() {
        let m = model();
        let obj = m.objective.as_ref().unwrap();
        let state = CountState::new(&m);
        let mut last = f64::NEG_INFINITY;
        for pending in 0..5 {
            let d = marginal(obj, &state, 1, 1, pending);
            assert!(d >= last - 1e-12);
            last = d;
        }
    }
}
