//! Assignment rules.
//!
//! Defines the declarative rules that a valid assignment table must satisfy:
//! separation of duty, conditional binding, role exclusivity, plus the
//! fairness targets the batch strategy optimizes for.

use serde::{Deserialize, Serialize};

/// Separation of duty: the two tasks never share a person within one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SodPair {
    pub first: String,
    pub second: String,
}

/// Binding: `trigger_person` on `trigger_task` requires `required_person`
/// on `required_task` in the same instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingRule {
    pub trigger_task: String,
    pub trigger_person: String,
    pub required_task: String,
    pub required_person: String,
}

/// Exclusivity override: persons whose primary role is `role` may only
/// ever occupy `allowed_tasks`, whatever dominance grants them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusivityRule {
    pub role: String,
    pub allowed_tasks: Vec<String>,
}

/// Balance target for one person on one task type, typically against an
/// interchangeable counterpart (e.g., an even split of the approval step).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairBalance {
    /// Task type being balanced.
    pub task: String,
    /// Person whose count on `task` is steered toward `target`.
    pub person: String,
    /// Interchangeable counterpart taking the remainder (reporting only).
    #[serde(default)]
    pub counterpart: Option<String>,
    /// Desired count. `None` = half of the instance count.
    #[serde(default)]
    pub target: Option<f64>,
    /// Objective weight of the absolute deviation from `target`.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Workload fairness targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FairnessTarget {
    /// Desired participation count per person over the whole run.
    /// `None` = theoretical mean `N × |tasks| / |persons|`.
    #[serde(default)]
    pub participation: Option<f64>,
    /// Optional pairwise balance term.
    #[serde(default)]
    pub balance: Option<PairBalance>,
}

/// The complete rule set of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Number of process instances `N`.
    pub instance_count: usize,
    #[serde(default)]
    pub sod: Vec<SodPair>,
    #[serde(default)]
    pub bindings: Vec<BindingRule>,
    #[serde(default)]
    pub exclusivity: Vec<ExclusivityRule>,
    #[serde(default)]
    pub fairness: FairnessTarget,
}

impl SodPair {
    /// Creates a separation-of-duty pair.
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }
}

impl BindingRule {
    /// Creates a binding rule `(trigger_task = trigger_person) ⇒ (required_task = required_person)`.
    pub fn new(
        trigger_task: impl Into<String>,
        trigger_person: impl Into<String>,
        required_task: impl Into<String>,
        required_person: impl Into<String>,
    ) -> Self {
        Self {
            trigger_task: trigger_task.into(),
            trigger_person: trigger_person.into(),
            required_task: required_task.into(),
            required_person: required_person.into(),
        }
    }
}

impl ExclusivityRule {
    /// Creates an exclusivity rule for `role`.
    pub fn new(role: impl Into<String>, allowed_tasks: Vec<String>) -> Self {
        Self {
            role: role.into(),
            allowed_tasks,
        }
    }

    /// Whether the restricted role may occupy `task`.
    pub fn allows(&self, task: &str) -> bool {
        self.allowed_tasks.iter().any(|t| t == task)
    }
}

impl PairBalance {
    /// Creates a balance term with weight 1.0 and the default (N/2) target.
    pub fn new(task: impl Into<String>, person: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            person: person.into(),
            counterpart: None,
            target: None,
            weight: default_weight(),
        }
    }

    /// Names the counterpart person.
    pub fn with_counterpart(mut self, counterpart: impl Into<String>) -> Self {
        self.counterpart = Some(counterpart.into());
        self
    }

    /// Sets an explicit target count.
    pub fn with_target(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }

    /// Sets the objective weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Target count for a run of `instance_count` instances.
    pub fn target_for(&self, instance_count: usize) -> f64 {
        self.target.unwrap_or(instance_count as f64 / 2.0)
    }
}

impl RuleSet {
    /// Creates an empty rule set for `instance_count` instances.
    pub fn new(instance_count: usize) -> Self {
        Self {
            instance_count,
            ..Self::default()
        }
    }

    /// Builder: adds a separation-of-duty pair.
    pub fn with_sod(mut self, first: impl Into<String>, second: impl Into<String>) -> Self {
        self.sod.push(SodPair::new(first, second));
        self
    }

    /// Builder: adds a binding rule.
    pub fn with_binding(mut self, rule: BindingRule) -> Self {
        self.bindings.push(rule);
        self
    }

    /// Builder: adds an exclusivity override.
    pub fn with_exclusivity(mut self, rule: ExclusivityRule) -> Self {
        self.exclusivity.push(rule);
        self
    }

    /// Builder: sets the per-person participation target.
    pub fn with_participation_target(mut self, target: f64) -> Self {
        self.fairness.participation = Some(target);
        self
    }

    /// Builder: sets the pairwise balance term.
    pub fn with_balance(mut self, balance: PairBalance) -> Self {
        self.fairness.balance = Some(balance);
        self
    }

    /// Builder: overrides the instance count.
    pub fn with_instance_count(mut self, instance_count: usize) -> Self {
        self.instance_count = instance_count;
        self
    }

    /// Allowed task list for `role`, if an exclusivity override names it.
    pub fn exclusivity_for(&self, role: &str) -> Option<&ExclusivityRule> {
        self.exclusivity.iter().find(|r| r.role == role)
    }
}
