//! Allocation model formulation.
//!
//! Bridges the resolved configuration to the [`cp`](crate::cp) engine.
//! Builds an [`AssignmentModel`] from task types, persons and rules, then
//! decodes the engine's [`Solution`] back into an [`AssignmentTable`].

use crate::cp::{
    AssignmentModel, AssignmentSolver, BalanceTerm, Objective, Solution, SolverConfig,
};
use crate::eligibility::ResolvedConfig;
use crate::models::AssignmentTable;

/// Builds an assignment model from a resolved configuration.
///
/// Slots are task types in template order, values are person indices.
///
/// # Example
/// ```
/// use u_assign::allocation::AllocationModelBuilder;
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
/// let model = AllocationModelBuilder::new(&resolved).with_fairness().build();
/// assert_eq!(model.slot_count(), 1);
/// ```
pub struct AllocationModelBuilder<'a> {
    resolved: &'a ResolvedConfig,
    instance_count: usize,
    forbidden: Vec<(usize, usize)>,
    fairness: bool,
}

impl<'a> AllocationModelBuilder<'a> {
    /// Creates a builder for all `N` configured instances, without objective.
    pub fn new(resolved: &'a ResolvedConfig) -> Self {
        Self {
            resolved,
            instance_count: resolved.instance_count(),
            forbidden: Vec::new(),
            fairness: false,
        }
    }

    /// Overrides the number of replicated instances.
    pub fn with_instance_count(mut self, instance_count: usize) -> Self {
        self.instance_count = instance_count;
        self
    }

    /// Additional `(task index, person index)` pairs to forbid.
    pub fn with_forbidden(mut self, pairs: Vec<(usize, usize)>) -> Self {
        self.forbidden = pairs;
        self
    }

    /// Adds the workload-fairness objective.
    pub fn with_fairness(mut self) -> Self {
        self.fairness = true;
        self
    }

    /// Builds the model.
    ///
    /// Creates:
    /// - A slot per task type with its nominal (dominance-derived) pool
    /// - `AllDifferent` over all slots (one task per person per instance)
    /// - `NotEqual` per separation-of-duty pair
    /// - `Implies` per binding rule
    /// - `Forbid` per exclusivity-revoked pair and per extra forbidden pair
    /// - The fairness objective, if requested
    pub fn build(&self) -> AssignmentModel {
        let r = self.resolved;
        let mut model = AssignmentModel::new(
            format!("allocation:{}", r.version),
            self.instance_count,
            r.person_count(),
        );

        for task in 0..r.task_count() {
            model.add_slot(r.nominal(task).to_vec());
        }
        model.add_all_different((0..r.task_count()).collect());

        for &(first, second) in &r.sod {
            model.add_not_equal(first, second);
        }

        for b in &r.bindings {
            model.add_implies(
                b.trigger_task,
                b.trigger_person,
                b.required_task,
                b.required_person,
            );
        }

        // Exclusivity: hard zero on every revoked pair, whatever dominance grants.
        for task in 0..r.task_count() {
            for &person in r.nominal(task) {
                if r.is_exclusivity_forbidden(person, task) {
                    model.forbid(task, person);
                }
            }
        }

        for &(task, person) in &self.forbidden {
            model.forbid(task, person);
        }

        if self.fairness {
            model.set_objective(self.fairness_objective());
        }

        model
    }

    fn fairness_objective(&self) -> Objective {
        let r = self.resolved;
        let balance = r
            .rules
            .fairness
            .balance
            .as_ref()
            .and_then(|b| {
                Some(BalanceTerm {
                    slot: r.task_idx(&b.task)?,
                    value: r.person_idx(&b.person)?,
                    target: b.target_for(self.instance_count),
                    weight: b.weight,
                })
            })
            .into_iter()
            .collect();

        Objective::Fairness {
            target: participation_target(r, self.instance_count),
            balance,
        }
    }

    /// Builds, solves, and decodes.
    pub fn solve<S: AssignmentSolver>(
        &self,
        solver: &S,
        config: &SolverConfig,
    ) -> (AssignmentTable, Solution) {
        let model = self.build();
        let solution = solver.solve(&model, config);
        let table = self.decode_solution(&solution);
        (table, solution)
    }

    /// Decodes an engine solution into an assignment table.
    ///
    /// Returns a table without rows if no solution was found.
    pub fn decode_solution(&self, solution: &Solution) -> AssignmentTable {
        let r = self.resolved;
        let mut table = AssignmentTable::new(r.task_ids());
        if !solution.is_solution_found() {
            return table;
        }
        for row in &solution.values {
            table.push_row(
                row.iter()
                    .map(|&p| r.persons.get(p).map(|person| person.id.clone()))
                    .collect(),
            );
        }
        table
    }
}

/// Participation target for `instance_count` instances.
fn participation_target(r: &ResolvedConfig, instance_count: usize) -> f64 {
    if instance_count == r.instance_count() {
        return r.participation_target();
    }
    match r.rules.fairness.participation {
        Some(target) => target,
        None if r.person_count() == 0 => 0.0,
        None => (instance_count * r.task_count()) as f64 / r.person_count() as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{BoundedSearchSolver, Constraint};
    use crate::models::{
        BindingRule, ExclusivityRule, PairBalance, Person, ProcessConfig, RoleHierarchy, RuleSet,
        TaskType,
    };

    fn resolved() -> ResolvedConfig {
        let config = ProcessConfig::new("t")
            .with_hierarchy(
                RoleHierarchy::new()
                    .with_role("BOSS")
                    .with_role("W")
                    .with_dominance("BOSS", "W"),
            )
            .with_person(Person::new("boss", "BOSS"))
            .with_person(Person::new("a", "W"))
            .with_person(Person::new("b", "W"))
            .with_person(Person::new("c", "W"))
            .with_task(TaskType::new("lead", 1).with_role("BOSS"))
            .with_task(TaskType::new("x", 2).with_role("W"))
            .with_task(TaskType::new("y", 3).with_role("W"))
            .with_rules(
                RuleSet::new(6)
                    .with_sod("x", "y")
                    .with_binding(BindingRule::new("x", "a", "y", "b"))
                    .with_exclusivity(ExclusivityRule::new("BOSS", vec!["lead".into()]))
                    .with_balance(PairBalance::new("x", "a").with_weight(2.0)),
            );
        ResolvedConfig::resolve(&config).unwrap()
    }

    #[test]
    fn test_build_model() {
        let r = resolved();
        let model = AllocationModelBuilder::new(&r).build();

        assert_eq!(model.slot_count(), 3);
        assert_eq!(model.instance_count, 6);
        assert!(model.is_fully_distinct());
        // all-different + sod + binding + 2 exclusivity forbids (boss on x, y)
        assert_eq!(model.constraint_count(), 5);
        assert!(model.objective.is_none());
        assert!(model
            .constraints
            .contains(&Constraint::Forbid { slot: 1, value: 0 }));
    }

    #[test]
    fn test_fairness_objective() {
        let r = resolved();
        let model = AllocationModelBuilder::new(&r).with_fairness().build();
        match model.objective {
            Some(Objective::Fairness { target, balance }) => {
                // 6 × 3 / 4
                assert!((target - 4.5).abs() < 1e-10);
                assert_eq!(balance.len(), 1);
                assert_eq!((balance[0].slot, balance[0].value), (1, 1));
                assert!((balance[0].target - 3.0).abs() < 1e-10);
                assert!((balance[0].weight - 2.0).abs() < 1e-10);
            }
            None => panic!("objective missing"),
        }
    }

    #[test]
    fn test_extra_forbidden_pairs() {
        let r = resolved();
        let model = AllocationModelBuilder::new(&r)
            .with_instance_count(1)
            .with_forbidden(vec![(2, 3)])
            .build();
        assert_eq!(model.instance_count, 1);
        assert!(model
            .constraints
            .contains(&Constraint::Forbid { slot: 2, value: 3 }));
    }

    #[test]
    fn test_solve_and_decode() {
        let r = resolved();
        let builder = AllocationModelBuilder::new(&r).with_fairness();
        let config = SolverConfig::default().with_seed(5);
        let (table, solution) = builder.solve(&BoundedSearchSolver::new(), &config);

        assert!(solution.is_solution_found());
        assert_eq!(table.instance_count(), 6);
        assert_eq!(table.tasks, vec!["lead", "x", "y"]);
        for row in &table.rows {
            assert!(row.is_complete());
            assert_eq!(row.cells[0].as_deref(), Some("boss"));
            assert_ne!(row.cells[1], row.cells[2]);
        }
    }
}
