//! Ingestion pipeline error types

use docuchat_common::errors::{AppError, FailureClass};
use thiserror::Error;

use crate::pipeline::IngestionStage;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Missing API key")]
    MissingApiKey,

    #[error("Document text is empty or could not be extracted")]
    EmptyDocument,

    #[error("Failed to build the embedding client: {0}")]
    ClientSetup(#[source] AppError),

    #[error("Conversation store error: {0}")]
    Conversation(#[source] AppError),

    #[error("Embedding or indexing failed: {0}")]
    Indexing(#[source] AppError),
}

impl IngestionError {
    /// The state-machine stage at which ingestion failed
    pub fn failed_stage(&self) -> IngestionStage {
        match self {
            IngestionError::MissingApiKey
            | IngestionError::ClientSetup(_)
            | IngestionError::Conversation(_) => IngestionStage::Created,
            IngestionError::EmptyDocument => IngestionStage::TextValidated,
            IngestionError::Indexing(_) => IngestionStage::Embedded,
        }
    }

    /// Failure class for the user-facing notification: a missing
    /// credential asks for an API key, everything else is a generic
    /// "upload failed, try again"
    pub fn failure_class(&self) -> FailureClass {
        match self {
            IngestionError::MissingApiKey => FailureClass::UnauthorizedConfiguration,
            IngestionError::EmptyDocument => FailureClass::InvalidInput,
            IngestionError::ClientSetup(e)
            | IngestionError::Conversation(e)
            | IngestionError::Indexing(e) => e.failure_class(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_classification() {
        let err = IngestionError::MissingApiKey;
        assert_eq!(err.failure_class(), FailureClass::UnauthorizedConfiguration);
        assert_eq!(err.failed_stage(), IngestionStage::Created);
    }

    #[test]
    fn test_empty_document_classification() {
        let err = IngestionError::EmptyDocument;
        assert_eq!(err.failure_class(), FailureClass::InvalidInput);
        assert_eq!(err.failed_stage(), IngestionStage::TextValidated);
    }

    #[test]
    fn test_client_setup_failure_happens_before_any_stage() {
        let err = IngestionError::ClientSetup(AppError::Configuration {
            message: "bad endpoint".into(),
        });
        assert_eq!(err.failed_stage(), IngestionStage::Created);
        assert_eq!(err.failure_class(), FailureClass::Internal);
    }

    #[test]
    fn test_indexing_inherits_inner_class() {
        let err = IngestionError::Indexing(AppError::EmbeddingError {
            message: "timed out".into(),
        });
        assert_eq!(err.failure_class(), FailureClass::Transport);

        let err = IngestionError::Indexing(AppError::Unauthorized {
            message: "bad key".into(),
        });
        assert_eq!(err.failure_class(), FailureClass::UnauthorizedConfiguration);
    }
}
