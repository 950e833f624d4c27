//! Error types.
//!
//! Configuration problems are always fatal and never retried. Compliance
//! findings are not errors: the validator returns them as data.

use thiserror::Error;

use crate::validation::ValidationError;

/// Malformed or inconsistent static input.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration ({} issue(s)): {}", .errors.len(), summarize(.errors))]
    Invalid { errors: Vec<ValidationError> },

    #[error("task '{task}' has no eligible person")]
    EmptyEligibility { task: String },

    #[error("unknown person '{0}'")]
    UnknownPerson(String),

    #[error("unknown task '{0}'")]
    UnknownTask(String),

    #[error("assignment table is empty")]
    EmptyTable,

    #[error("instance {ordinal} task '{task}' holds the unassigned marker")]
    Sentinel { ordinal: usize, task: String },

    #[error("assignment table is missing column '{0}'")]
    MissingColumn(String),

    #[error("instance {ordinal} has {found} cell(s), expected {expected}")]
    RowWidth {
        ordinal: usize,
        found: usize,
        expected: usize,
    },

    #[error("configuration snapshot not found: {0}")]
    SnapshotNotFound(String),
}

/// Failure of an allocation run.
#[derive(Debug, Error)]
pub enum AllocationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("infeasible{}: {reason}", .instance.map(|i| format!(" at instance index {i}")).unwrap_or_default())]
    Infeasible {
        /// 0-based index of the failing instance (sequential strategy).
        instance: Option<usize>,
        reason: String,
    },

    #[error("internal solver error: {0}")]
    Internal(String),
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_infeasible_display() {
        let err = AllocationError::Infeasible {
            instance: Some(2),
            reason: "no candidate left".into(),
        };
        assert_eq!(
            err.to_string(),
            "infeasible at instance index 2: no candidate left"
        );

        let err = AllocationError::Infeasible {
            instance: None,
            reason: "global".into(),
        };
        assert_eq!(err.to_string(), "infeasible: global");
    }

    #[test]
    fn test_invalid_display() {
        let err = ConfigError::Invalid {
            errors: vec![ValidationError {
                kind: ValidationErrorKind::DuplicateId,
                message: "Duplicate person ID: A".into(),
            }],
        };
        assert!(err.to_string().contains("1 issue(s)"));
        assert!(err.to_string().contains("Duplicate person ID: A"));
    }

    #[test]
    fn test_config_converts() {
        let err: AllocationError = ConfigError::UnknownTask("T9".into()).into();
        assert_eq!(err.to_string(), "unknown task 'T9'");
    }
}
