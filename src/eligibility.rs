//! Eligibility expansion.
//!
//! Turns "eligible roles for a task" into "eligible persons for a task"
//! in two explicit layers:
//!
//! 1. **Nominal**: every person holding a listed role, or holding a role
//!    that dominates a listed role transitively.
//! 2. **Effective**: the nominal set minus persons an exclusivity override
//!    forbids for this task.
//!
//! Both layers are kept. A senior role is nominally eligible almost
//! everywhere and then narrowed by a business rule; that layering is
//! policy, and the compliance validator reports the two layers separately.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::ConfigError;
use crate::models::{Person, ProcessConfig, RuleSet, TaskType};
use crate::validation::validate_config;

/// Persons nominally eligible for `task` through role membership or dominance.
///
/// Returned in person declaration order.
pub fn nominal_persons<'a>(config: &'a ProcessConfig, task: &TaskType) -> Vec<&'a Person> {
    let mut dominated: HashMap<&str, HashSet<String>> = HashMap::new();

    config
        .persons
        .iter()
        .filter(|&person| {
            person.roles().any(|held| {
                let below = dominated
                    .entry(held)
                    .or_insert_with(|| config.hierarchy.dominated_by(held));
                task.eligible_roles
                    .iter()
                    .any(|wanted| wanted == held || below.contains(wanted))
            })
        })
        .collect()
}

/// Whether an exclusivity override forbids `person` on `task`.
pub fn forbidden_by_exclusivity(rules: &RuleSet, person: &Person, task: &str) -> bool {
    rules
        .exclusivity
        .iter()
        .any(|rule| rule.role == person.role && !rule.allows(task))
}

/// Persons effectively eligible for `task`: nominal set minus exclusivity.
///
/// # Errors
/// [`ConfigError::EmptyEligibility`] if no person remains.
pub fn eligible_persons<'a>(
    config: &'a ProcessConfig,
    task: &TaskType,
) -> Result<Vec<&'a Person>, ConfigError> {
    let persons: Vec<&Person> = nominal_persons(config, task)
        .into_iter()
        .filter(|p| !forbidden_by_exclusivity(&config.rules, p, &task.id))
        .collect();

    if persons.is_empty() {
        return Err(ConfigError::EmptyEligibility {
            task: task.id.clone(),
        });
    }
    Ok(persons)
}

/// A binding rule with ids resolved to indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedBinding {
    pub trigger_task: usize,
    pub trigger_person: usize,
    pub required_task: usize,
    pub required_person: usize,
}

/// An exclusivity override resolved to indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExclusivity {
    /// Restricted role tag.
    pub role: String,
    /// Persons whose primary role is `role`.
    pub persons: Vec<usize>,
    /// Per task (template order): whether the role may occupy it.
    pub allowed: Vec<bool>,
}

/// A validated configuration snapshot with eligibility expanded.
///
/// Read-only after construction; shared by both allocators and the validator.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Snapshot name.
    pub version: String,
    /// Persons in declaration order.
    pub persons: Vec<Person>,
    /// Task types in template order.
    pub tasks: Vec<TaskType>,
    /// Rule set as configured.
    pub rules: RuleSet,
    /// Separation-of-duty pairs as task indices.
    pub sod: Vec<(usize, usize)>,
    /// Binding rules as indices.
    pub bindings: Vec<ResolvedBinding>,
    /// Exclusivity overrides as indices.
    pub exclusivity: Vec<ResolvedExclusivity>,
    nominal: Vec<Vec<usize>>,
    eligible: Vec<Vec<usize>>,
    person_index: HashMap<String, usize>,
    task_index: HashMap<String, usize>,
}

impl ResolvedConfig {
    /// Validates `config` and expands eligibility for every task type.
    ///
    /// # Errors
    /// - [`ConfigError::Invalid`] for structural problems (see [`validate_config`])
    /// - [`ConfigError::EmptyEligibility`] for a task nobody may perform
    pub fn resolve(config: &ProcessConfig) -> Result<Self, ConfigError> {
        validate_config(config).map_err(|errors| ConfigError::Invalid { errors })?;

        let persons = config.persons.clone();
        let tasks: Vec<TaskType> = config.ordered_tasks().into_iter().cloned().collect();

        let person_index: HashMap<String, usize> = persons
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        let task_index: HashMap<String, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        let mut nominal = Vec::with_capacity(tasks.len());
        let mut eligible = Vec::with_capacity(tasks.len());
        for task in &tasks {
            nominal.push(
                nominal_persons(config, task)
                    .iter()
                    .map(|p| person_index[&p.id])
                    .collect::<Vec<_>>(),
            );
            let effective: Vec<usize> = eligible_persons(config, task)?
                .iter()
                .map(|p| person_index[&p.id])
                .collect();
            debug!(
                task = %task.id,
                nominal = nominal.last().map_or(0, Vec::len),
                effective = effective.len(),
                "expanded eligibility"
            );
            eligible.push(effective);
        }

        let rules = &config.rules;
        let sod = rules
            .sod
            .iter()
            .map(|p| (task_index[&p.first], task_index[&p.second]))
            .collect();
        let bindings = rules
            .bindings
            .iter()
            .map(|b| ResolvedBinding {
                trigger_task: task_index[&b.trigger_task],
                trigger_person: person_index[&b.trigger_person],
                required_task: task_index[&b.required_task],
                required_person: person_index[&b.required_person],
            })
            .collect();
        let exclusivity = rules
            .exclusivity
            .iter()
            .map(|rule| ResolvedExclusivity {
                role: rule.role.clone(),
                persons: persons
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.role == rule.role)
                    .map(|(i, _)| i)
                    .collect(),
                allowed: tasks.iter().map(|t| rule.allows(&t.id)).collect(),
            })
            .collect();

        Ok(Self {
            version: config.version.clone(),
            persons,
            tasks,
            rules: rules.clone(),
            sod,
            bindings,
            exclusivity,
            nominal,
            eligible,
            person_index,
            task_index,
        })
    }

    /// Number of process instances `N`.
    pub fn instance_count(&self) -> usize {
        self.rules.instance_count
    }

    /// Number of persons.
    pub fn person_count(&self) -> usize {
        self.persons.len()
    }

    /// Number of task types per instance.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Index of a person id.
    pub fn person_idx(&self, id: &str) -> Option<usize> {
        self.person_index.get(id).copied()
    }

    /// Index of a task id.
    pub fn task_idx(&self, id: &str) -> Option<usize> {
        self.task_index.get(id).copied()
    }

    /// Task ids in template order.
    pub fn task_ids(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.id.clone()).collect()
    }

    /// Effective eligible person indices for a task index.
    pub fn eligible(&self, task: usize) -> &[usize] {
        &self.eligible[task]
    }

    /// Nominal (dominance-derived, pre-exclusivity) person indices for a task index.
    pub fn nominal(&self, task: usize) -> &[usize] {
        &self.nominal[task]
    }

    /// Effective eligible persons for a task id.
    ///
    /// # Errors
    /// [`ConfigError::UnknownTask`] if the task is not configured.
    pub fn eligible_persons(&self, task: &str) -> Result<Vec<&Person>, ConfigError> {
        let idx = self
            .task_idx(task)
            .ok_or_else(|| ConfigError::UnknownTask(task.to_string()))?;
        Ok(self.eligible[idx].iter().map(|&p| &self.persons[p]).collect())
    }

    /// Whether an exclusivity override forbids person index `person` on task index `task`.
    pub fn is_exclusivity_forbidden(&self, person: usize, task: usize) -> bool {
        self.exclusivity
            .iter()
            .any(|rule| !rule.allowed[task] && rule.persons.contains(&person))
    }

    /// Theoretical per-person participation `N × |tasks| / |persons|`,
    /// or the configured participation target.
    pub fn participation_target(&self) -> f64 {
        if let Some(target) = self.rules.fairness.participation {
            return target;
        }
        if self.persons.is_empty() {
            return 0.0;
        }
        (self.instance_count() * self.task_count()) as f64 / self.person_count() as f64
    }
}
