//! Sequential strategy with exclusion history.

mod common;

use u_assign::allocation::{ExemptionSet, SequentialAllocator};
use u_assign::compliance::{error_count, ComplianceValidator};
use u_assign::error::{AllocationError, ConfigError};

use common::{reference, reference_with_second_manager};

#[test]
fn test_sequential_is_deterministic() {
    let resolved = reference(2);
    let exemptions = ExemptionSet::singleton_pools(&resolved);
    assert!(exemptions.contains("PGR", "T3"));

    let allocator = SequentialAllocator::new().with_exemptions(exemptions);
    let first = allocator.allocate(&resolved).unwrap();
    let second = allocator.allocate(&resolved).unwrap();

    assert_eq!(first.table, second.table);
    assert_eq!(first.history, second.history);
    assert_eq!(first.table.instance_count(), 2);
    assert_eq!(first.history.len(), 10);

    // First candidate in declaration order takes the approval step.
    assert_eq!(first.table.get(0, "T1"), Some("JVG"));
    assert_eq!(first.table.get(1, "T1"), Some("HYV"));
    assert_eq!(first.table.count_on_task("PGR", "T3"), 2);

    let diagnostics = ComplianceValidator::new(&resolved)
        .validate(&first.table)
        .unwrap();
    assert_eq!(error_count(&diagnostics), 0, "{diagnostics:?}");
}

#[test]
fn test_history_never_repeats_a_pair() {
    let resolved = reference(2);
    let outcome = SequentialAllocator::new()
        .with_exemptions(ExemptionSet::singleton_pools(&resolved))
        .allocate(&resolved)
        .unwrap();

    for task in ["T1", "T2.1", "T2.2", "T4"] {
        let first = outcome.table.get(0, task);
        let second = outcome.table.get(1, task);
        assert!(first.is_some());
        assert_ne!(first, second, "{task} repeated");
    }
}

#[test]
fn test_two_member_pool_exhausts_at_third_instance() {
    let resolved = reference_with_second_manager(20);
    let err = SequentialAllocator::new()
        .allocate(&resolved)
        .unwrap_err();

    match err {
        AllocationError::Infeasible { instance, reason } => {
            assert_eq!(instance, Some(2));
            assert!(reason.contains("T1"), "{reason}");
        }
        other => panic!("expected infeasible, got {other:?}"),
    }
}

#[test]
fn test_singleton_without_exemption_fails_second_instance() {
    let resolved = reference(20);
    let err = SequentialAllocator::new()
        .allocate(&resolved)
        .unwrap_err();
    assert!(matches!(
        err,
        AllocationError::Infeasible {
            instance: Some(1),
            ..
        }
    ));
    assert!(err.to_string().contains("instance index 1"));
}

#[test]
fn test_misspelled_exemption_is_a_config_error() {
    let resolved = reference(3);
    let err = SequentialAllocator::new()
        .with_exemptions(ExemptionSet::new().with("PRG", "T3"))
        .allocate(&resolved)
        .unwrap_err();
    assert!(matches!(
        err,
        AllocationError::Config(ConfigError::UnknownPerson(ref id)) if id == "PRG"
    ));
}
