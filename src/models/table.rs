//! Assignment table (solution) model.
//!
//! One row per process instance, one column per task type. Tables are
//! produced by an allocator and consumed by the compliance validator;
//! they are never mutated after being returned.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Marker written for a slot that could not be filled.
///
/// Never a valid person id; the validator rejects it as a configuration error.
pub const UNASSIGNED_SENTINEL: &str = "ERROR_NO_ASIGNADO";

/// A complete assignment table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentTable {
    /// Task ids in column order.
    pub tasks: Vec<String>,
    /// Instance rows in ordinal order.
    pub rows: Vec<InstanceRow>,
}

/// One process instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRow {
    /// 1-based instance ordinal.
    pub ordinal: usize,
    /// Assigned person per column (`None` = empty slot).
    pub cells: Vec<Option<String>>,
}

/// An (instance, task, person) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    /// 0-based instance index.
    pub instance: usize,
    pub task: String,
    pub person: String,
}

impl Assignment {
    /// Creates an assignment triple.
    pub fn new(instance: usize, task: impl Into<String>, person: impl Into<String>) -> Self {
        Self {
            instance,
            task: task.into(),
            person: person.into(),
        }
    }
}

impl InstanceRow {
    /// Creates a row with the given cells.
    pub fn new(ordinal: usize, cells: Vec<Option<String>>) -> Self {
        Self { ordinal, cells }
    }

    /// Whether every slot holds a value.
    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }
}

impl AssignmentTable {
    /// Creates an empty table with the given columns.
    pub fn new(tasks: Vec<String>) -> Self {
        Self {
            tasks,
            rows: Vec::new(),
        }
    }

    /// Appends a row. The ordinal is assigned from the current row count.
    pub fn push_row(&mut self, cells: Vec<Option<String>>) {
        let ordinal = self.rows.len() + 1;
        self.rows.push(InstanceRow::new(ordinal, cells));
    }

    /// Number of instances.
    pub fn instance_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column index of a task.
    pub fn column(&self, task: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t == task)
    }

    /// Person in `(instance, task)`, if filled. `instance` is 0-based.
    pub fn get(&self, instance: usize, task: &str) -> Option<&str> {
        let col = self.column(task)?;
        self.rows
            .get(instance)?
            .cells
            .get(col)?
            .as_deref()
    }

    /// All filled slots as assignment triples, row-major.
    pub fn assignments(&self) -> Vec<Assignment> {
        let mut out = Vec::new();
        for (idx, row) in self.rows.iter().enumerate() {
            for (task, cell) in self.tasks.iter().zip(&row.cells) {
                if let Some(person) = cell {
                    out.push(Assignment::new(idx, task, person));
                }
            }
        }
        out
    }

    /// Participation count per person across all filled slots.
    pub fn participation(&self) -> HashMap<String, usize> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for row in &self.rows {
            for person in row.cells.iter().flatten() {
                *counts.entry(person.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// How often `person` occupies `task`.
    pub fn count_on_task(&self, person: &str, task: &str) -> usize {
        match self.column(task) {
            Some(col) => self
                .rows
                .iter()
                .filter(|r| r.cells.get(col).and_then(|c| c.as_deref()) == Some(person))
                .count(),
            None => 0,
        }
    }
}
