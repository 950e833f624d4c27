//! Assignment model definition.
//!
//! An [`AssignmentModel`] describes one *instance template*: a list of
//! slots, each with a domain of candidate values, and constraints between
//! slots. The template is replicated `instance_count` times; every
//! constraint holds inside each instance. The objective couples instances
//! through value counts accumulated over all of them.
//!
//! The model is built once per solve call and never mutated by a solver.

/// A constraint of the instance template.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// No value appears in two of these slots within one instance.
    AllDifferent {
        /// Slots that must hold pairwise distinct values.
        slots: Vec<usize>,
    },

    /// The two slots never hold the same value within one instance.
    NotEqual { first: usize, second: usize },

    /// `slot = value` implies `then_slot = then_value` within one instance.
    Implies {
        slot: usize,
        value: usize,
        then_slot: usize,
        then_value: usize,
    },

    /// `value` may never occupy `slot`.
    Forbid { slot: usize, value: usize },
}

/// A weighted balance term: `weight · |count(slot = value) − target|`.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceTerm {
    pub slot: usize,
    pub value: usize,
    pub target: f64,
    pub weight: f64,
}

/// Objective function for the assignment model.
#[derive(Debug, Clone, PartialEq)]
pub enum Objective {
    /// Minimize `Σ_v |count(v) − target| + Σ balance terms`.
    ///
    /// `count(v)` is the number of slots holding `v` across all instances.
    Fairness {
        /// Desired count per value.
        target: f64,
        /// Additional per-(slot, value) balance terms.
        balance: Vec<BalanceTerm>,
    },
}

/// A replicated-instance assignment model.
///
/// # Examples
///
/// ```
/// use u_assign::cp::{AssignmentModel, Objective};
///
/// let mut model = AssignmentModel::new("example", 4, 3);
/// let a = model.add_slot(vec![0, 1]);
/// let b = model.add_slot(vec![1, 2]);
/// model.add_all_different(vec![a, b]);
/// model.set_objective(Objective::Fairness { target: 8.0 / 3.0, balance: vec![] });
/// assert!(model.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentModel {
    /// Model name.
    pub name: String,
    /// Number of replicated instances.
    pub instance_count: usize,
    /// Values are `0..value_count`.
    pub value_count: usize,
    /// Candidate values per slot.
    pub domains: Vec<Vec<usize>>,
    /// Constraints applied inside every instance.
    pub constraints: Vec<Constraint>,
    /// Objective function. `None` = pure feasibility.
    pub objective: Option<Objective>,
}

impl AssignmentModel {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>, instance_count: usize, value_count: usize) -> Self {
        Self {
            name: name.into(),
            instance_count,
            value_count,
            domains: Vec::new(),
            constraints: Vec::new(),
            objective: None,
        }
    }

    /// Adds a slot with the given domain and returns its index.
    pub fn add_slot(&mut self, domain: Vec<usize>) -> usize {
        self.domains.push(domain);
        self.domains.len() - 1
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Convenience: add an all-different constraint.
    pub fn add_all_different(&mut self, slots: Vec<usize>) {
        self.constraints.push(Constraint::AllDifferent { slots });
    }

    /// Convenience: add a not-equal constraint.
    pub fn add_not_equal(&mut self, first: usize, second: usize) {
        self.constraints.push(Constraint::NotEqual { first, second });
    }

    /// Convenience: add an implication.
    pub fn add_implies(&mut self, slot: usize, value: usize, then_slot: usize, then_value: usize) {
        self.constraints.push(Constraint::Implies {
            slot,
            value,
            then_slot,
            then_value,
        });
    }

    /// Convenience: forbid a value on a slot.
    pub fn forbid(&mut self, slot: usize, value: usize) {
        self.constraints.push(Constraint::Forbid { slot, value });
    }

    /// Sets the objective function.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    /// Number of slots per instance.
    pub fn slot_count(&self) -> usize {
        self.domains.len()
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Whether an all-different constraint spans every slot.
    pub fn is_fully_distinct(&self) -> bool {
        let n = self.slot_count();
        self.constraints.iter().any(|c| match c {
            Constraint::AllDifferent { slots } => (0..n).all(|s| slots.contains(&s)),
            _ => false,
        })
    }

    /// Validates the model for consistency.
    ///
    /// Checks that all referenced slots and values are in range and that
    /// objective parameters are finite.
    pub fn validate(&self) -> Result<(), String> {
        let slots = self.slot_count();
        let check_slot = |slot: usize| {
            if slot < slots {
                Ok(())
            } else {
                Err(format!("undefined slot: {slot}"))
            }
        };
        let check_value = |value: usize| {
            if value < self.value_count {
                Ok(())
            } else {
                Err(format!("value out of range: {value}"))
            }
        };

        for domain in &self.domains {
            for &value in domain {
                check_value(value)?;
            }
        }

        for constraint in &self.constraints {
            match constraint {
                Constraint::AllDifferent { slots } => {
                    for &slot in slots {
                        check_slot(slot)?;
                    }
                }
                Constraint::NotEqual { first, second } => {
                    check_slot(*first)?;
                    check_slot(*second)?;
                }
                Constraint::Implies {
                    slot,
                    value,
                    then_slot,
                    then_value,
                } => {
                    check_slot(*slot)?;
                    check_slot(*then_slot)?;
                    check_value(*value)?;
                    check_value(*then_value)?;
                }
                Constraint::Forbid { slot, value } => {
                    check_slot(*slot)?;
                    check_value(*value)?;
                }
            }
        }

        if let Some(Objective::Fairness { target, balance }) = &self.objective {
            if !target.is_finite() {
                return Err("fairness target is not finite".into());
            }
            for term in balance {
                check_slot(term.slot)?;
                check_value(term.value)?;
                if !term.target.is_finite() || !term.weight.is_finite() || term.weight < 0.0 {
                    return Err("balance term has an invalid target or weight".into());
                }
            }
        }

        Ok(())
    }
}
