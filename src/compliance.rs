//! Compliance validation of finished assignment tables.
//!
//! Re-checks a table against the same configuration the allocators use,
//! independently of how the table was produced. Findings are data, not
//! errors: the caller gets an ordered list of [`Diagnostic`]s, and an
//! empty list means full compliance.
//!
//! # Checks
//!
//! Configuration checks run first and abort with a [`ConfigError`]:
//! empty table, unknown or missing columns, row width, the unassigned
//! marker, unknown persons.
//!
//! Compliance checks then run instance by instance, in this order within
//! each instance, accumulating every finding. Fairness runs last, once
//! over the whole table:
//!
//! | Rule | Severity | Finding |
//! |------|----------|---------|
//! | SoD | error | both tasks of a pair hold the same person |
//! | Binding | error | trigger person on trigger task, required person absent |
//! | Exclusivity | error | restricted role outside its whitelist |
//! | Coverage | error | empty slot |
//! | Eligibility | error | person outside the task's dominance-derived pool |
//! | Capacity | error | person in two slots of one instance |
//! | Fairness | warning | participation deviates from the mean by more than the tolerance |

use std::fmt;

use serde::Serialize;

use crate::allocation::WorkloadKpi;
use crate::eligibility::ResolvedConfig;
use crate::error::ConfigError;
use crate::models::{AssignmentTable, InstanceRow, UNASSIGNED_SENTINEL};

/// Allowed deviation of a person's participation from the table-wide mean.
pub const FAIRNESS_TOLERANCE: f64 = 3.0;

/// Rule a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RuleTag {
    SoD,
    Binding,
    Exclusivity,
    Coverage,
    Eligibility,
    Capacity,
    Fairness,
}

impl fmt::Display for RuleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            RuleTag::SoD => "SoD",
            RuleTag::Binding => "Binding",
            RuleTag::Exclusivity => "Exclusivity",
            RuleTag::Coverage => "Coverage",
            RuleTag::Eligibility => "Eligibility",
            RuleTag::Capacity => "Capacity",
            RuleTag::Fairness => "Fairness",
        };
        f.write_str(tag)
    }
}

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    /// Hard-rule violation.
    Error,
    /// Fairness deviation; the caller decides.
    Warning,
}

/// One validator finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub rule: RuleTag,
    pub severity: Severity,
    /// 1-based instance ordinal, if the finding is instance-specific.
    pub instance: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    fn error(rule: RuleTag, row: &InstanceRow, message: String) -> Self {
        Self {
            rule,
            severity: Severity::Error,
            instance: Some(row.ordinal),
            message,
        }
    }

    /// Whether this is a hard-rule violation.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance {
            Some(ordinal) => write!(f, "[{}] instance {}: {}", self.rule, ordinal, self.message),
            None => write!(f, "[{}] {}", self.rule, self.message),
        }
    }
}

/// Number of error-severity diagnostics.
pub fn error_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}

/// Validates assignment tables against a resolved configuration.
///
/// # Example
/// ```
/// use u_assign::compliance::ComplianceValidator;
/// use u_assign::eligibility::ResolvedConfig;
/// use u_assign::models::{AssignmentTable, Person, ProcessConfig, RoleHierarchy, RuleSet, TaskType};
///
/// let config = ProcessConfig::new("demo")
///     .with_hierarchy(RoleHierarchy::new().with_role("A"))
///     .with_person(Person::new("p1", "A"))
///     .with_person(Person::new("p2", "A"))
///     .with_task(TaskType::new("T1", 1).with_role("A"))
///     .with_task(TaskType::new("T2", 2).with_role("A"))
///     .with_rules(RuleSet::new(1).with_sod("T1", "T2"));
/// let resolved = ResolvedConfig::resolve(&config).unwrap();
///
/// let mut table = AssignmentTable::new(vec!["T1".into(), "T2".into()]);
/// table.push_row(vec![Some("p1".into()), Some("p1".into())]);
///
/// let diagnostics = ComplianceValidator::new(&resolved).validate(&table).unwrap();
/// assert!(diagnostics[0].to_string().starts_with("[SoD] instance 1"));
/// ```
#[derive(Debug, Clone)]
pub struct ComplianceValidator<'a> {
    resolved: &'a ResolvedConfig,
    tolerance: f64,
}

impl<'a> ComplianceValidator<'a> {
    /// Creates a validator with [`FAIRNESS_TOLERANCE`].
    pub fn new(resolved: &'a ResolvedConfig) -> Self {
        Self {
            resolved,
            tolerance: FAIRNESS_TOLERANCE,
        }
    }

    /// Overrides the fairness tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Validates `table`.
    ///
    /// # Errors
    /// A [`ConfigError`] when the table itself does not fit the
    /// configuration; see [`check_configuration`](Self::check_configuration).
    pub fn validate(&self, table: &AssignmentTable) -> Result<Vec<Diagnostic>, ConfigError> {
        if table.is_empty() && self.resolved.instance_count() == 0 {
            return Ok(Vec::new());
        }
        self.check_configuration(table)?;

        let columns = self.columns(table)?;
        let mut out = Vec::new();
        for row in &table.rows {
            self.check_sod(row, &columns, &mut out);
            self.check_bindings(row, &columns, &mut out);
            self.check_exclusivity(row, &columns, &mut out);
            self.check_coverage(row, &columns, &mut out);
            self.check_eligibility(row, &columns, &mut out);
            Self::check_capacity(row, &mut out);
        }
        self.check_fairness(table, &mut out);
        Ok(out)
    }

    /// Checks that `table` fits the configuration.
    ///
    /// # Errors
    /// - [`ConfigError::EmptyTable`] for a table without rows
    /// - [`ConfigError::UnknownTask`] / [`ConfigError::MissingColumn`] for column mismatches
    /// - [`ConfigError::RowWidth`] for a row with the wrong number of cells
    /// - [`ConfigError::Sentinel`] for the unassigned marker
    /// - [`ConfigError::UnknownPerson`] for a person not in the configuration
    pub fn check_configuration(&self, table: &AssignmentTable) -> Result<(), ConfigError> {
        if table.is_empty() {
            return Err(ConfigError::EmptyTable);
        }
        self.columns(table)?;

        for row in &table.rows {
            if row.cells.len() != table.tasks.len() {
                return Err(ConfigError::RowWidth {
                    ordinal: row.ordinal,
                    found: row.cells.len(),
                    expected: table.tasks.len(),
                });
            }
            for (task, cell) in table.tasks.iter().zip(&row.cells) {
                let Some(person) = cell else { continue };
                if person == UNASSIGNED_SENTINEL {
                    return Err(ConfigError::Sentinel {
                        ordinal: row.ordinal,
                        task: task.clone(),
                    });
                }
                if self.resolved.person_idx(person).is_none() {
                    return Err(ConfigError::UnknownPerson(person.clone()));
                }
            }
        }
        Ok(())
    }

    /// Table column of every configured task, in template order.
    fn columns(&self, table: &AssignmentTable) -> Result<Vec<usize>, ConfigError> {
        if let Some(unknown) = table
            .tasks
            .iter()
            .find(|t| self.resolved.task_idx(t).is_none())
        {
            return Err(ConfigError::UnknownTask(unknown.clone()));
        }
        self.resolved
            .tasks
            .iter()
            .map(|t| {
                table
                    .column(&t.id)
                    .ok_or_else(|| ConfigError::MissingColumn(t.id.clone()))
            })
            .collect()
    }

    fn cell<'t>(row: &'t InstanceRow, column: usize) -> Option<&'t str> {
        row.cells.get(column).and_then(|c| c.as_deref())
    }

    fn check_sod(&self, row: &InstanceRow, columns: &[usize], out: &mut Vec<Diagnostic>) {
        let tasks = &self.resolved.tasks;
        for &(a, b) in &self.resolved.sod {
            let (Some(pa), Some(pb)) = (Self::cell(row, columns[a]), Self::cell(row, columns[b]))
            else {
                continue;
            };
            if pa == pb {
                out.push(Diagnostic::error(
                    RuleTag::SoD,
                    row,
                    format!("{} and {} are both held by {}", tasks[a].id, tasks[b].id, pa),
                ));
            }
        }
    }

    fn check_bindings(&self, row: &InstanceRow, columns: &[usize], out: &mut Vec<Diagnostic>) {
        let r = self.resolved;
        for b in &r.bindings {
            let trigger = &r.persons[b.trigger_person].id;
            let required = &r.persons[b.required_person].id;
            if Self::cell(row, columns[b.trigger_task]) != Some(trigger.as_str()) {
                continue;
            }
            let actual = Self::cell(row, columns[b.required_task]);
            if actual != Some(required.as_str()) {
                out.push(Diagnostic::error(
                    RuleTag::Binding,
                    row,
                    format!(
                        "{} on {} requires {} on {}, found {}",
                        trigger,
                        r.tasks[b.trigger_task].id,
                        required,
                        r.tasks[b.required_task].id,
                        actual.unwrap_or("nobody")
                    ),
                ));
            }
        }
    }

    fn check_exclusivity(&self, row: &InstanceRow, columns: &[usize], out: &mut Vec<Diagnostic>) {
        let r = self.resolved;
        for rule in &r.exclusivity {
            for (t, task) in r.tasks.iter().enumerate() {
                if rule.allowed[t] {
                    continue;
                }
                let Some(person) = Self::cell(row, columns[t]) else {
                    continue;
                };
                let restricted = r
                    .person_idx(person)
                    .is_some_and(|p| rule.persons.contains(&p));
                if restricted {
                    out.push(Diagnostic::error(
                        RuleTag::Exclusivity,
                        row,
                        format!("{} (role {}) is not allowed on {}", person, rule.role, task.id),
                    ));
                }
            }
        }
    }

    fn check_coverage(&self, row: &InstanceRow, columns: &[usize], out: &mut Vec<Diagnostic>) {
        for (t, task) in self.resolved.tasks.iter().enumerate() {
            if Self::cell(row, columns[t]).is_none() {
                out.push(Diagnostic::error(
                    RuleTag::Coverage,
                    row,
                    format!("{} is not assigned", task.id),
                ));
            }
        }
    }

    fn check_eligibility(&self, row: &InstanceRow, columns: &[usize], out: &mut Vec<Diagnostic>) {
        let r = self.resolved;
        for (t, task) in r.tasks.iter().enumerate() {
            let Some(person) = Self::cell(row, columns[t]) else {
                continue;
            };
            let eligible = r
                .person_idx(person)
                .is_some_and(|p| r.nominal(t).contains(&p));
            if !eligible {
                out.push(Diagnostic::error(
                    RuleTag::Eligibility,
                    row,
                    format!("{} holds no role eligible for {}", person, task.id),
                ));
            }
        }
    }

    fn check_capacity(row: &InstanceRow, out: &mut Vec<Diagnostic>) {
        let mut seen: Vec<&str> = Vec::new();
        let mut reported: Vec<&str> = Vec::new();
        for person in row.cells.iter().flatten() {
            let person = person.as_str();
            if seen.contains(&person) {
                if !reported.contains(&person) {
                    reported.push(person);
                    out.push(Diagnostic::error(
                        RuleTag::Capacity,
                        row,
                        format!("{person} holds more than one task"),
                    ));
                }
            } else {
                seen.push(person);
            }
        }
    }

    fn check_fairness(&self, table: &AssignmentTable, out: &mut Vec<Diagnostic>) {
        let r = self.resolved;
        if r.person_count() == 0 {
            return;
        }
        let kpi = WorkloadKpi::calculate(table, r);
        let total: usize = r.persons.iter().map(|p| kpi.count(&p.id)).sum();
        let mean = total as f64 / r.person_count() as f64;

        for person in &r.persons {
            let count = kpi.count(&person.id);
            let deviation = (count as f64 - mean).abs();
            if deviation > self.tolerance {
                out.push(Diagnostic {
                    rule: RuleTag::Fairness,
                    severity: Severity::Warning,
                    instance: None,
                    message: format!(
                        "{} has {} task(s), {:.2} away from the mean {:.2} (tolerance {})",
                        person.id, count, deviation, mean, self.tolerance
                    ),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BindingRule, ExclusivityRule, Person, ProcessConfig, RoleHierarchy, RuleSet, TaskType,
    };

    fn resolved(n: usize) -> ResolvedConfig {
        let config = ProcessConfig::new("v")
            .with_hierarchy(
                RoleHierarchy::new()
                    .with_role("BOSS")
                    .with_role("W")
                    .with_role("X")
                    .with_dominance("BOSS", "W"),
            )
            .with_person(Person::new("boss", "BOSS"))
            .with_person(Person::new("a", "W"))
            .with_person(Person::new("b", "W"))
            .with_person(Person::new("x", "X"))
            .with_task(TaskType::new("lead", 1).with_role("BOSS"))
            .with_task(TaskType::new("p", 2).with_role("W"))
            .with_task(TaskType::new("q", 3).with_role("W").with_role("X"))
            .with_rules(
                RuleSet::new(n)
                    .with_sod("p", "q")
                    .with_binding(BindingRule::new("p", "a", "q", "x"))
                    .with_exclusivity(ExclusivityRule::new("BOSS", vec!["lead".into()])),
            );
        ResolvedConfig::resolve(&config).unwrap()
    }

    fn table(rows: &[[Option<&str>; 3]]) -> AssignmentTable {
        let mut t = AssignmentTable::new(vec!["lead".into(), "p".into(), "q".into()]);
        for row in rows {
            t.push_row(row.iter().map(|c| c.map(str::to_string)).collect());
        }
        t
    }

    fn rules(diags: &[Diagnostic]) -> Vec<RuleTag> {
        diags.iter().map(|d| d.rule).collect()
    }

    #[test]
    fn test_compliant_table() {
        let r = resolved(2);
        let t = table(&[
            [Some("boss"), Some("a"), Some("x")],
            [Some("boss"), Some("b"), Some("x")],
        ]);
        let diags = ComplianceValidator::new(&r).validate(&t).unwrap();
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn test_hard_rule_violations_instance_by_instance() {
        let r = resolved(2);
        let t = table(&[
            [Some("boss"), Some("b"), Some("b")],
            [Some("a"), Some("a"), Some("boss")],
        ]);
        let diags = ComplianceValidator::new(&r).validate(&t).unwrap();

        assert_eq!(
            rules(&diags),
            vec![
                RuleTag::SoD,
                RuleTag::Capacity,
                RuleTag::Binding,
                RuleTag::Exclusivity,
                RuleTag::Eligibility,
                RuleTag::Capacity,
            ]
        );
        let instances: Vec<Option<usize>> = diags.iter().map(|d| d.instance).collect();
        assert_eq!(
            instances,
            vec![Some(1), Some(1), Some(2), Some(2), Some(2), Some(2)]
        );
        assert_eq!(
            diags[2].to_string(),
            "[Binding] instance 2: a on p requires x on q, found boss"
        );
        assert_eq!(error_count(&diags), 6);
    }

    #[test]
    fn test_fairness_follows_instance_findings() {
        let r = resolved(5);
        let mut rows = [[Some("boss"), Some("a"), Some("x")]; 5];
        rows[4] = [Some("boss"), Some("x"), Some("x")];
        let diags = ComplianceValidator::new(&r).validate(&table(&rows)).unwrap();

        let tags = rules(&diags);
        assert_eq!(tags.first(), Some(&RuleTag::SoD));
        assert_eq!(diags[0].instance, Some(5));
        assert_eq!(tags.last(), Some(&RuleTag::Fairness));
        assert!(diags.iter().filter(|d| d.rule == RuleTag::Fairness).all(|d| d.instance.is_none()));
    }

    #[test]
    fn test_coverage() {
        let r = resolved(1);
        let t = table(&[[Some("boss"), None, Some("x")]]);
        let diags = ComplianceValidator::new(&r).validate(&t).unwrap();
        assert_eq!(rules(&diags), vec![RuleTag::Coverage]);
    }

    #[test]
    fn test_fairness_warning() {
        let r = resolved(5);
        let rows = [[Some("boss"), Some("a"), Some("x")]; 5];
        let t = table(&rows);
        let diags = ComplianceValidator::new(&r).validate(&t).unwrap();

        // mean 3.75: boss, a, x at 5, b at 0
        assert_eq!(rules(&diags), vec![RuleTag::Fairness]);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert!(diags[0].message.starts_with("b has 0"));
        assert_eq!(error_count(&diags), 0);

        let strict = ComplianceValidator::new(&r).with_tolerance(0.5);
        assert_eq!(strict.validate(&t).unwrap().len(), 4);
    }

    #[test]
    fn test_configuration_errors() {
        let r = resolved(1);
        let v = ComplianceValidator::new(&r);

        assert!(matches!(
            v.validate(&table(&[])),
            Err(ConfigError::EmptyTable)
        ));
        assert!(matches!(
            v.validate(&table(&[[Some("boss"), Some("ghost"), Some("x")]])),
            Err(ConfigError::UnknownPerson(p)) if p == "ghost"
        ));
        assert!(matches!(
            v.validate(&table(&[[Some("boss"), Some(UNASSIGNED_SENTINEL), Some("x")]])),
            Err(ConfigError::Sentinel { ordinal: 1, .. })
        ));

        let mut extra = AssignmentTable::new(vec!["lead".into(), "p".into(), "zz".into()]);
        extra.push_row(vec![None, None, None]);
        assert!(matches!(v.validate(&extra), Err(ConfigError::UnknownTask(t)) if t == "zz"));

        let mut missing = AssignmentTable::new(vec!["lead".into(), "p".into()]);
        missing.push_row(vec![None, None]);
        assert!(matches!(v.validate(&missing), Err(ConfigError::MissingColumn(t)) if t == "q"));

        let mut short = table(&[]);
        short.push_row(vec![None]);
        assert!(matches!(v.validate(&short), Err(ConfigError::RowWidth { found: 1, .. })));
    }

    #[test]
    fn test_zero_instances_is_clean() {
        let r = resolved(0);
        let diags = ComplianceValidator::new(&r).validate(&table(&[])).unwrap();
        assert!(diags.is_empty());
    }

    #[test]
    fn test_column_order_independent() {
        let r = resolved(1);
        let mut t = AssignmentTable::new(vec!["q".into(), "lead".into(), "p".into()]);
        t.push_row(vec![Some("x".into()), Some("boss".into()), Some("b".into())]);
        let diags = ComplianceValidator::new(&r).validate(&t).unwrap();
        assert!(diags.is_empty(), "{diags:?}");
    }
}
