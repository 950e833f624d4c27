//! Allocator output re-checked by the independent validator.

mod common;

use proptest::prelude::*;

use u_assign::allocation::{BatchAllocator, ExemptionSet, SequentialAllocator};
use u_assign::compliance::{error_count, ComplianceValidator, RuleTag};
use u_assign::cp::SolverConfig;
use u_assign::io;
use u_assign::models::{AssignmentTable, UNASSIGNED_SENTINEL};

use common::{reference, seeded};

const PERSONS: [&str; 12] = [
    "JVG", "HYV", "GTR", "LPG", "RGB", "BJC", "MDS", "PGR", "MFE", "HJR", "PTS", "IHP",
];

#[test]
fn test_batch_table_survives_csv() {
    let resolved = reference(10);
    let outcome = BatchAllocator::new()
        .with_config(seeded(5))
        .allocate(&resolved)
        .unwrap();

    let mut buf = Vec::new();
    io::write_table(&outcome.table, &mut buf).unwrap();
    let reloaded = io::read_table(buf.as_slice()).unwrap();
    assert_eq!(reloaded, outcome.table);

    let validator = ComplianceValidator::new(&resolved);
    assert_eq!(
        validator.validate(&reloaded).unwrap(),
        validator.validate(&outcome.table).unwrap()
    );
}

#[test]
fn test_validator_is_idempotent() {
    let resolved = reference(2);
    let mut table = AssignmentTable::new(resolved.task_ids());
    table.push_row(vec![
        Some("JVG".into()),
        Some("GTR".into()),
        Some("LPG".into()),
        Some("PGR".into()),
        Some("MFE".into()),
    ]);
    table.push_row(vec![
        Some("HYV".into()),
        Some("LPG".into()),
        Some("LPG".into()),
        Some("PGR".into()),
        None,
    ]);

    let validator = ComplianceValidator::new(&resolved);
    let first = validator.validate(&table).unwrap();
    let second = validator.validate(&table).unwrap();
    assert_eq!(first, second);

    let rules: Vec<RuleTag> = first.iter().filter(|d| d.is_error()).map(|d| d.rule).collect();
    assert!(rules.contains(&RuleTag::Binding));
    assert!(rules.contains(&RuleTag::SoD));
    assert!(rules.contains(&RuleTag::Coverage));
}

#[test]
fn test_sequential_table_has_no_errors() {
    let resolved = reference(2);
    let outcome = SequentialAllocator::new()
        .with_exemptions(ExemptionSet::singleton_pools(&resolved))
        .allocate(&resolved)
        .unwrap();
    let diagnostics = ComplianceValidator::new(&resolved)
        .validate(&outcome.table)
        .unwrap();
    assert_eq!(error_count(&diagnostics), 0);
}

#[test]
fn test_zero_instances() {
    let resolved = reference(0);

    let batch = BatchAllocator::new().allocate(&resolved).unwrap();
    assert!(batch.table.is_empty());
    assert!(batch.is_optimal());

    let sequential = SequentialAllocator::new().allocate(&resolved).unwrap();
    assert!(sequential.table.is_empty());
    assert!(sequential.history.is_empty());

    let validator = ComplianceValidator::new(&resolved);
    assert!(validator.validate(&batch.table).unwrap().is_empty());
    assert!(validator.validate(&sequential.table).unwrap().is_empty());
}

#[test]
fn test_sentinel_in_table_is_configuration_error() {
    let resolved = reference(1);
    let text = format!("Instance,T1,T2.1,T2.2,T3,T4\n1,JVG,GTR,MDS,PGR,{UNASSIGNED_SENTINEL}\n");
    let table = io::read_table(text.as_bytes()).unwrap();
    assert!(ComplianceValidator::new(&resolved).validate(&table).is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_batch_tables_have_no_errors(n in 1usize..9, seed in any::<u64>()) {
        let resolved = reference(n);
        let config = SolverConfig::default().with_seed(seed).with_max_iterations(500);
        let outcome = BatchAllocator::new().with_config(config).allocate(&resolved).unwrap();

        prop_assert_eq!(outcome.table.instance_count(), n);
        let diagnostics = ComplianceValidator::new(&resolved).validate(&outcome.table).unwrap();
        prop_assert_eq!(error_count(&diagnostics), 0);
    }

    #[test]
    fn prop_validator_is_deterministic(
        cells in prop::collection::vec(prop::option::of(0usize..PERSONS.len()), 5..=20)
    ) {
        let resolved = reference(cells.len() / 5);
        let mut table = AssignmentTable::new(resolved.task_ids());
        for chunk in cells.chunks_exact(5) {
            table.push_row(chunk.iter().map(|c| c.map(|p| PERSONS[p].to_string())).collect());
        }

        let validator = ComplianceValidator::new(&resolved);
        let first = validator.validate(&table).unwrap();
        prop_assert_eq!(&first, &validator.validate(&table).unwrap());
        let used = cells.len() / 5 * 5;
        let empty = cells[..used].iter().filter(|c| c.is_none()).count();
        let coverage = first.iter().filter(|d| d.rule == RuleTag::Coverage).count();
        prop_assert_eq!(coverage, empty);
    }
}
