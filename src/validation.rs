//! Input validation for process configurations.
//!
//! Checks structural integrity of roles, persons, task types, and rules
//! before eligibility expansion. Detects:
//! - Duplicate IDs and template positions
//! - References to undeclared roles, persons, or tasks
//! - Circular dominance (the hierarchy must be a strict partial order)
//! - Degenerate rules (SoD pair on a single task, negative weights)
//!
//! Empty eligibility is not checked here; it depends on the expansion and
//! is reported by [`crate::eligibility::ResolvedConfig`].
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use crate::models::{ProcessConfig, RoleHierarchy};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// Two task types share the same template position.
    DuplicatePosition,
    /// A person, task, rule or dominance edge names an undeclared role.
    InvalidRoleReference,
    /// A rule names an undeclared task type.
    InvalidTaskReference,
    /// A rule names an undeclared person.
    InvalidPersonReference,
    /// Dominance graph contains a cycle.
    CyclicDominance,
    /// The task template has no task types.
    EmptyTemplate,
    /// A rule is self-contradictory or out of range.
    InvalidRule,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a configuration snapshot.
///
/// Checks:
/// 1. No duplicate role, person, or task IDs
/// 2. No duplicate task template positions
/// 3. The template has at least one task type
/// 4. Every role reference (persons, tasks, dominance, exclusivity) is declared
/// 5. Every task and person named by a rule exists
/// 6. Rules are well-formed (distinct SoD tasks, non-negative finite weights)
/// 7. No circular dominance
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_config(config: &ProcessConfig) -> ValidationResult {
    let mut errors = Vec::new();

    let mut role_ids = HashSet::new();
    for role in &config.hierarchy.roles {
        if !role_ids.insert(role.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate role ID: {}", role.id),
            ));
        }
    }

    let mut person_ids = HashSet::new();
    for person in &config.persons {
        if !person_ids.insert(person.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate person ID: {}", person.id),
            ));
        }
        for role in person.roles() {
            if !role_ids.contains(role) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidRoleReference,
                    format!("Person '{}' references unknown role '{}'", person.id, role),
                ));
            }
        }
    }

    if config.tasks.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyTemplate,
            "Task template has no task types",
        ));
    }

    let mut task_ids = HashSet::new();
    let mut positions: HashMap<usize, &str> = HashMap::new();
    for task in &config.tasks {
        if !task_ids.insert(task.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate task ID: {}", task.id),
            ));
        }
        if let Some(other) = positions.insert(task.position, task.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicatePosition,
                format!(
                    "Tasks '{}' and '{}' share template position {}",
                    other, task.id, task.position
                ),
            ));
        }
        for role in &task.eligible_roles {
            if !role_ids.contains(role.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidRoleReference,
                    format!("Task '{}' references unknown role '{}'", task.id, role),
                ));
            }
        }
    }

    for edge in &config.hierarchy.dominance {
        for role in [&edge.senior, &edge.junior] {
            if !role_ids.contains(role.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidRoleReference,
                    format!(
                        "Dominance '{} > {}' references unknown role '{}'",
                        edge.senior, edge.junior, role
                    ),
                ));
            }
        }
    }

    let rules = &config.rules;
    let check_task = |task: &str, context: &str, errors: &mut Vec<ValidationError>| {
        if !task_ids.contains(task) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidTaskReference,
                format!("{context} references unknown task '{task}'"),
            ));
        }
    };

    for pair in &rules.sod {
        let context = format!("SoD pair ({}, {})", pair.first, pair.second);
        check_task(&pair.first, &context, &mut errors);
        check_task(&pair.second, &context, &mut errors);
        if pair.first == pair.second {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidRule,
                format!("{context} names the same task twice"),
            ));
        }
    }

    for rule in &rules.bindings {
        let context = format!(
            "Binding ({}={}) => ({}={})",
            rule.trigger_task, rule.trigger_person, rule.required_task, rule.required_person
        );
        check_task(&rule.trigger_task, &context, &mut errors);
        check_task(&rule.required_task, &context, &mut errors);
        for person in [&rule.trigger_person, &rule.required_person] {
            if !person_ids.contains(person.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidPersonReference,
                    format!("{context} references unknown person '{person}'"),
                ));
            }
        }
        if rule.trigger_task == rule.required_task {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidRule,
                format!("{context} binds a task to itself"),
            ));
        }
    }

    for rule in &rules.exclusivity {
        if !role_ids.contains(rule.role.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidRoleReference,
                format!("Exclusivity rule references unknown role '{}'", rule.role),
            ));
        }
        let context = format!("Exclusivity rule for role '{}'", rule.role);
        for task in &rule.allowed_tasks {
            check_task(task, &context, &mut errors);
        }
    }

    if let Some(target) = rules.fairness.participation {
        if !target.is_finite() || target < 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidRule,
                format!("Participation target must be a non-negative number, got {target}"),
            ));
        }
    }

    if let Some(balance) = &rules.fairness.balance {
        check_task(&balance.task, "Balance target", &mut errors);
        let named = std::iter::once(&balance.person).chain(balance.counterpart.iter());
        for person in named {
            if !person_ids.contains(person.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidPersonReference,
                    format!("Balance target references unknown person '{person}'"),
                ));
            }
        }
        if !balance.weight.is_finite() || balance.weight < 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidRule,
                format!("Balance weight must be a non-negative number, got {}", balance.weight),
            ));
        }
        if let Some(target) = balance.target {
            if !target.is_finite() || target < 0.0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidRule,
                    format!("Balance target must be a non-negative number, got {target}"),
                ));
            }
        }
    }

    if let Some(cycle_err) = detect_cycles(&config.hierarchy) {
        errors.push(cycle_err);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Detects cycles in the dominance graph using DFS.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists.
///
/// # Reference
/// Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4
fn detect_cycles(hierarchy: &RoleHierarchy) -> Option<ValidationError> {
    let adj = hierarchy.adjacency();

    // Declared order keeps the reported role stable across runs.
    let mut all_ids: Vec<&str> = hierarchy.roles.iter().map(|r| r.id.as_str()).collect();
    for edge in &hierarchy.dominance {
        all_ids.push(edge.senior.as_str());
    }

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    for node in all_ids {
        if !visited.contains(node) && has_cycle_dfs(node, &adj, &mut visited, &mut in_stack) {
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicDominance,
                format!("Circular dominance detected involving role '{node}'"),
            ));
        }
    }

    None
}

fn has_cycle_dfs<'a>(
    node: &'a str,
    adj: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    in_stack: &mut HashSet<&'a str>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(node) {
        for &next in neighbors {
            if in_stack.contains(next) {
                return true; // Back edge → cycle
            }
            if !visited.contains(next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(node);
    false
}
