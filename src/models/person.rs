//! Person model.
//!
//! Persons are the entities that perform tasks. Each person holds one
//! primary organizational role and optionally further role tags
//! (e.g., a team lead who is also a reviewer).

use serde::{Deserialize, Serialize};

/// A person who can be assigned to task slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Unique person identifier (also the name written into assignment tables).
    pub id: String,
    /// Human-readable display name.
    #[serde(default)]
    pub name: String,
    /// Primary organizational role.
    pub role: String,
    /// Additional role tags held besides the primary role.
    #[serde(default)]
    pub additional_roles: Vec<String>,
}

impl Person {
    /// Creates a person with the given primary role.
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            role: role.into(),
            additional_roles: Vec::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a secondary role tag.
    pub fn with_additional_role(mut self, role: impl Into<String>) -> Self {
        self.additional_roles.push(role.into());
        self
    }

    /// All roles held by this person, primary first.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.role.as_str()).chain(self.additional_roles.iter().map(|r| r.as_str()))
    }
}
