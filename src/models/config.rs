//! Process configuration snapshots.
//!
//! A [`ProcessConfig`] is everything loaded once per run: the role
//! hierarchy, persons, the task template and the rule set. Evolving
//! eligibility tables are kept as named snapshots in a [`ConfigBundle`];
//! all snapshots go through the same expansion code.

use serde::{Deserialize, Serialize};

use super::{Person, RoleHierarchy, RuleSet, TaskType};
use crate::error::ConfigError;

/// One versioned configuration snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Snapshot name (e.g., "flat", "hierarchical").
    pub version: String,
    /// Roles and dominance edges.
    pub hierarchy: RoleHierarchy,
    /// Persons in declaration order.
    pub persons: Vec<Person>,
    /// Task template.
    pub tasks: Vec<TaskType>,
    /// Rules and fairness targets.
    pub rules: RuleSet,
}

/// A set of named snapshots with an optional active selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigBundle {
    /// Name of the snapshot used when none is requested explicitly.
    #[serde(default)]
    pub active: Option<String>,
    pub snapshots: Vec<ProcessConfig>,
}

impl ProcessConfig {
    /// Creates an empty snapshot.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }

    /// Sets the role hierarchy.
    pub fn with_hierarchy(mut self, hierarchy: RoleHierarchy) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    /// Adds a person.
    pub fn with_person(mut self, person: Person) -> Self {
        self.persons.push(person);
        self
    }

    /// Adds a task type.
    pub fn with_task(mut self, task: TaskType) -> Self {
        self.tasks.push(task);
        self
    }

    /// Sets the rule set.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Task types sorted by template position (stable on ties).
    pub fn ordered_tasks(&self) -> Vec<&TaskType> {
        let mut tasks: Vec<&TaskType> = self.tasks.iter().collect();
        tasks.sort_by_key(|t| t.position);
        tasks
    }

    /// Finds a person by id.
    pub fn person(&self, id: &str) -> Option<&Person> {
        self.persons.iter().find(|p| p.id == id)
    }

    /// Finds a task type by id.
    pub fn task(&self, id: &str) -> Option<&TaskType> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

impl ConfigBundle {
    /// Creates a bundle holding a single snapshot, marked active.
    pub fn single(config: ProcessConfig) -> Self {
        Self {
            active: Some(config.version.clone()),
            snapshots: vec![config],
        }
    }

    /// Selects a snapshot.
    ///
    /// Resolution order: `name` if given, then `active`, then the last
    /// snapshot in the file (the most recent revision).
    pub fn select(&self, name: Option<&str>) -> Result<&ProcessConfig, ConfigError> {
        match name.or(self.active.as_deref()) {
            Some(wanted) => self
                .snapshots
                .iter()
                .find(|s| s.version == wanted)
                .ok_or_else(|| ConfigError::SnapshotNotFound(wanted.to_string())),
            None => self
                .snapshots
                .last()
                .ok_or_else(|| ConfigError::SnapshotNotFound("<none>".to_string())),
        }
    }

    /// Snapshot names in declaration order.
    pub fn versions(&self) -> Vec<&str> {
        self.snapshots.iter().map(|s| s.version.as_str()).collect()
    }
}
