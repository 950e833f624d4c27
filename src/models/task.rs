//! Task type model.
//!
//! A task type is one step of the per-instance process template. Every
//! process instance holds exactly one slot per task type, ordered by
//! `position`.

use serde::{Deserialize, Serialize};

/// A step of the recurring process.
///
/// Eligibility is expressed in roles; it is expanded into persons by
/// [`crate::eligibility::ResolvedConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskType {
    /// Unique task identifier (also the table column name).
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Ordered position in the instance template.
    pub position: usize,
    /// Roles eligible to perform this task.
    pub eligible_roles: Vec<String>,
}

impl TaskType {
    /// Creates a task type at the given template position.
    pub fn new(id: impl Into<String>, position: usize) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            position,
            eligible_roles: Vec::new(),
        }
    }

    /// Sets the task name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds an eligible role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.eligible_roles.push(role.into());
        self
    }
}
