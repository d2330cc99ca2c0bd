//! Core error types shared across the crate

use thiserror::Error;

use crate::db::store::StoreError;

/// One secondary write that failed after the primary state change was
/// already committed.
#[derive(Debug)]
pub struct FailedStep {
    pub step: &'static str,
    pub error: StoreError,
}

#[derive(Error, Debug)]
pub enum CarrelError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The primary state change committed but one or more downstream writes
    /// did not. The new state is kept; the caller sees which steps failed.
    #[error("'{action}' applied, but {} downstream write(s) failed", .failed.len())]
    PartialFailure {
        action: String,
        failed: Vec<FailedStep>,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for CarrelError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Missing { collection, id } => {
                CarrelError::NotFound(format!("{}/{}", collection, id))
            }
            other => CarrelError::StoreUnavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CarrelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_document_maps_to_not_found() {
        let err: CarrelError = StoreError::Missing {
            collection: "notes".to_string(),
            id: "n1".to_string(),
        }
        .into();
        assert!(matches!(err, CarrelError::NotFound(_)));
        assert_eq!(err.to_string(), "not found: notes/n1");
    }

    #[test]
    fn backend_failure_maps_to_store_unavailable() {
        let err: CarrelError = StoreError::Backend("socket closed".to_string()).into();
        assert!(matches!(err, CarrelError::StoreUnavailable(_)));
    }

    #[test]
    fn partial_failure_reports_failed_step_count() {
        let err = CarrelError::PartialFailure {
            action: "Approved Material".to_string(),
            failed: vec![
                FailedStep {
                    step: "point award",
                    error: StoreError::Backend("down".to_string()),
                },
                FailedStep {
                    step: "audit append",
                    error: StoreError::Backend("down".to_string()),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "'Approved Material' applied, but 2 downstream write(s) failed"
        );
    }
}
