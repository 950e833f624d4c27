//! Workload metrics (KPIs).
//!
//! Computes participation and fairness indicators from a completed
//! assignment table and the configuration it was produced for.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Participation | Filled slots per person over the whole table |
//! | Mean | Configured target, or `N × |tasks| / |persons|` |
//! | Spread | Sum of `|participation − mean|` over all persons |
//! | Balance deviation | `|count(person on task) − target|` for the balance pair |
//! | Objective | `spread + weight × balance deviation` |
//! | Max deviation | Largest single `|participation − mean|` |

use std::collections::HashMap;

use crate::eligibility::ResolvedConfig;
use crate::models::AssignmentTable;

/// Workload indicators of an assignment table.
#[derive(Debug, Clone)]
pub struct WorkloadKpi {
    /// Participation per configured person (zero counts included).
    pub participation: HashMap<String, usize>,
    /// Count per (person, task).
    pub per_task: HashMap<(String, String), usize>,
    /// Target participation per person.
    pub mean: f64,
    /// Sum of absolute deviations from `mean`.
    pub spread: f64,
    /// Absolute deviation of the balance pair from its target (0 if none).
    pub balance_deviation: f64,
    /// Fairness objective as the batch strategy minimizes it.
    pub objective: f64,
    /// Largest absolute deviation of one person from `mean`.
    pub max_deviation: f64,
}

impl WorkloadKpi {
    /// Computes KPIs for `table` under `resolved`.
    ///
    /// The mean and balance target use the table's own row count, so a
    /// partial table is measured against its own size.
    pub fn calculate(table: &AssignmentTable, resolved: &ResolvedConfig) -> Self {
        let n = table.instance_count();

        let mut participation: HashMap<String, usize> = resolved
            .persons
            .iter()
            .map(|p| (p.id.clone(), 0))
            .collect();
        let mut per_task: HashMap<(String, String), usize> = HashMap::new();
        for a in table.assignments() {
            *participation.entry(a.person.clone()).or_insert(0) += 1;
            *per_task.entry((a.person, a.task)).or_insert(0) += 1;
        }

        let mean = match resolved.rules.fairness.participation {
            Some(target) => target,
            None if resolved.person_count() == 0 => 0.0,
            None => (n * resolved.task_count()) as f64 / resolved.person_count() as f64,
        };

        let mut spread = 0.0;
        let mut max_deviation: f64 = 0.0;
        for person in &resolved.persons {
            let count = participation.get(&person.id).copied().unwrap_or(0);
            let dev = (count as f64 - mean).abs();
            spread += dev;
            max_deviation = max_deviation.max(dev);
        }

        let (balance_deviation, weight) = match &resolved.rules.fairness.balance {
            Some(b) => {
                let count = per_task
                    .get(&(b.person.clone(), b.task.clone()))
                    .copied()
                    .unwrap_or(0);
                ((count as f64 - b.target_for(n)).abs(), b.weight)
            }
            None => (0.0, 0.0),
        };

        Self {
            participation,
            per_task,
            mean,
            spread,
            balance_deviation,
            objective: spread + weight * balance_deviation,
            max_deviation,
        }
    }

    /// Participation of one person (0 if unknown).
    pub fn count(&self, person: &str) -> usize {
        self.participation.get(person).copied().unwrap_or(0)
    }

    /// How often `person` performed `task`.
    pub fn count_on_task(&self, person: &str, task: &str) -> usize {
        self.per_task
            .get(&(person.to_string(), task.to_string()))
            .copied()
            .unwrap_or(0)
    }
}
