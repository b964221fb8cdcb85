//! Query pipeline error types
//!
//! Each variant names the stage that failed, so callers can tell a
//! transport failure from bad input, and "no answer found" (which is a
//! successful query whose answer is the fixed fallback sentence) never
//! appears here at all.

use docuchat_common::errors::{AppError, FailureClass};
use thiserror::Error;

/// Stage of the query pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Rewrite,
    Retrieval,
    Synthesis,
    Persistence,
}

impl QueryStage {
    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStage::Rewrite => "rewrite",
            QueryStage::Retrieval => "retrieval",
            QueryStage::Synthesis => "synthesis",
            QueryStage::Persistence => "persistence",
        }
    }
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Missing API key")]
    MissingApiKey,

    #[error("Failed to build service clients: {0}")]
    ClientSetup(#[source] AppError),

    #[error("Question rewrite failed: {0}")]
    Rewrite(#[source] AppError),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[source] AppError),

    #[error("Answer synthesis failed: {0}")]
    Synthesis(#[source] AppError),

    #[error("Failed to persist chat turn: {0}")]
    Persistence(#[source] AppError),
}

impl QueryError {
    /// The stage at which the pipeline failed
    pub fn failed_stage(&self) -> QueryStage {
        match self {
            QueryError::MissingApiKey
            | QueryError::ClientSetup(_)
            | QueryError::Rewrite(_) => QueryStage::Rewrite,
            QueryError::Retrieval(_) => QueryStage::Retrieval,
            QueryError::Synthesis(_) => QueryStage::Synthesis,
            QueryError::Persistence(_) => QueryStage::Persistence,
        }
    }

    /// Failure class for the user-facing notification
    pub fn failure_class(&self) -> FailureClass {
        match self {
            QueryError::MissingApiKey => FailureClass::UnauthorizedConfiguration,
            QueryError::ClientSetup(e)
            | QueryError::Rewrite(e)
            | QueryError::Retrieval(e)
            | QueryError::Synthesis(e)
            | QueryError::Persistence(e) => e.failure_class(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failure_classification() {
        let err = QueryError::Rewrite(AppError::ChatModelError {
            message: "timed out".into(),
        });
        assert_eq!(err.failed_stage(), QueryStage::Rewrite);
        assert_eq!(err.failure_class(), FailureClass::Transport);
    }

    #[test]
    fn test_empty_question_is_invalid_input() {
        let err = QueryError::Rewrite(AppError::Validation {
            message: "empty".into(),
        });
        assert_eq!(err.failure_class(), FailureClass::InvalidInput);
    }

    #[test]
    fn test_client_setup_failure_maps_to_first_stage() {
        let err = QueryError::ClientSetup(AppError::Configuration {
            message: "bad endpoint".into(),
        });
        assert_eq!(err.failed_stage(), QueryStage::Rewrite);
        assert_eq!(err.failure_class(), FailureClass::Internal);
    }

    #[test]
    fn test_isolation_violation_keeps_its_class() {
        let err = QueryError::Retrieval(AppError::IsolationViolation {
            expected: uuid::Uuid::new_v4(),
            found: uuid::Uuid::new_v4(),
        });
        assert_eq!(err.failure_class(), FailureClass::Isolation);
        assert_eq!(err.failed_stage(), QueryStage::Retrieval);
    }
}
