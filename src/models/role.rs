//! Organizational roles and the dominance partial order.
//!
//! A role that dominates another inherits every task eligibility of the
//! dominated role. Dominance is transitive: if `DG > DR` and `DR > TR`,
//! a `DG` holder is eligible wherever `TR` is.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// An organizational role tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique role tag (e.g., "DG", "TR").
    pub id: String,
    /// Human-readable description.
    #[serde(default)]
    pub name: String,
}

/// A dominance edge: `senior` may substitute for `junior`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dominance {
    pub senior: String,
    pub junior: String,
}

/// Role set plus the (direct) dominance edges between roles.
///
/// The transitive closure is computed on demand. Cycles are rejected by
/// [`crate::validation::validate_config`] before any expansion runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleHierarchy {
    /// Declared roles.
    pub roles: Vec<Role>,
    /// Direct dominance edges.
    #[serde(default)]
    pub dominance: Vec<Dominance>,
}

impl Role {
    /// Creates a role tag.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
        }
    }

    /// Sets the description.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl RoleHierarchy {
    /// Creates an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: declares a role.
    pub fn with_role(mut self, id: impl Into<String>) -> Self {
        self.roles.push(Role::new(id));
        self
    }

    /// Builder: declares that `senior` dominates `junior`.
    pub fn with_dominance(mut self, senior: impl Into<String>, junior: impl Into<String>) -> Self {
        self.dominance.push(Dominance {
            senior: senior.into(),
            junior: junior.into(),
        });
        self
    }

    /// Whether a role with this tag is declared.
    pub fn contains(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.id == role)
    }

    /// Direct juniors of each role.
    pub fn adjacency(&self) -> HashMap<&str, Vec<&str>> {
        let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.dominance {
            adj.entry(edge.senior.as_str())
                .or_default()
                .push(edge.junior.as_str());
        }
        adj
    }

    /// Every role transitively dominated by `role` (excluding `role` itself
    /// unless reachable through a cycle).
    pub fn dominated_by(&self, role: &str) -> HashSet<String> {
        let adj = self.adjacency();
        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = adj.get(role).cloned().unwrap_or_default();

        while let Some(next) = stack.pop() {
            if seen.insert(next.to_string()) {
                if let Some(juniors) = adj.get(next) {
                    stack.extend(juniors.iter().copied());
                }
            }
        }

        seen
    }
}
