//! Error types for the DocuChat pipelines
//!
//! Provides:
//! - Distinct error types for different failure modes
//! - Machine-readable error codes
//! - A coarse failure class used to pick the user-facing notification

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    EmptyDocument,

    // Credential errors (2xxx)
    MissingApiKey,
    Unauthorized,

    // Isolation errors (3xxx)
    IsolationViolation,

    // Resource errors (4xxx)
    ConversationNotFound,

    // External service errors (8xxx)
    EmbeddingError,
    VectorStoreError,
    ChatModelError,
    ConversationStoreError,
    UpstreamError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::EmptyDocument => 1002,

            // Credentials (2xxx)
            ErrorCode::MissingApiKey => 2001,
            ErrorCode::Unauthorized => 2002,

            // Isolation (3xxx)
            ErrorCode::IsolationViolation => 3001,

            // Resources (4xxx)
            ErrorCode::ConversationNotFound => 4001,

            // External (8xxx)
            ErrorCode::EmbeddingError => 8001,
            ErrorCode::VectorStoreError => 8002,
            ErrorCode::ChatModelError => 8003,
            ErrorCode::ConversationStoreError => 8004,
            ErrorCode::UpstreamError => 8005,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Coarse failure classification used by callers to choose a user-facing
/// notification (e.g. "add your API key" vs "upload failed, try again").
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// The input itself was unusable; nothing external was touched.
    InvalidInput,
    /// A required credential is missing or rejected.
    UnauthorizedConfiguration,
    /// An external service call failed or timed out.
    Transport,
    /// A retrieval result crossed a conversation boundary.
    Isolation,
    /// Everything else.
    Internal,
}

impl FailureClass {
    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::InvalidInput => "invalid_input",
            FailureClass::UnauthorizedConfiguration => "unauthorized_configuration",
            FailureClass::Transport => "transport",
            FailureClass::Isolation => "isolation",
            FailureClass::Internal => "internal",
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Document text is empty or could not be extracted")]
    EmptyDocument,

    // Credential errors
    #[error("Missing API key")]
    MissingApiKey,

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    // Isolation errors
    #[error("Isolation violation: expected conversation {expected}, got {found}")]
    IsolationViolation { expected: Uuid, found: Uuid },

    // Resource errors
    #[error("Conversation not found: {id}")]
    ConversationNotFound { id: Uuid },

    // External service errors
    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("Vector store error: {message}")]
    VectorStoreError { message: String },

    #[error("Chat model error: {message}")]
    ChatModelError { message: String },

    #[error("Conversation store error: {message}")]
    ConversationStoreError { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::EmptyDocument => ErrorCode::EmptyDocument,
            AppError::MissingApiKey => ErrorCode::MissingApiKey,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::IsolationViolation { .. } => ErrorCode::IsolationViolation,
            AppError::ConversationNotFound { .. } => ErrorCode::ConversationNotFound,
            AppError::EmbeddingError { .. } => ErrorCode::EmbeddingError,
            AppError::VectorStoreError { .. } => ErrorCode::VectorStoreError,
            AppError::ChatModelError { .. } => ErrorCode::ChatModelError,
            AppError::ConversationStoreError { .. } => ErrorCode::ConversationStoreError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the failure class for this error
    pub fn failure_class(&self) -> FailureClass {
        match self {
            AppError::Validation { .. } | AppError::EmptyDocument => FailureClass::InvalidInput,

            AppError::MissingApiKey | AppError::Unauthorized { .. } => {
                FailureClass::UnauthorizedConfiguration
            }

            AppError::IsolationViolation { .. } => FailureClass::Isolation,

            AppError::EmbeddingError { .. }
            | AppError::VectorStoreError { .. }
            | AppError::ChatModelError { .. }
            | AppError::ConversationStoreError { .. }
            | AppError::HttpClient(_) => FailureClass::Transport,

            AppError::ConversationNotFound { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => FailureClass::Internal,
        }
    }

    /// True when the failure came from an external service call
    pub fn is_transport(&self) -> bool {
        self.failure_class() == FailureClass::Transport
    }

    /// True when the caller should be asked for a (valid) API key
    pub fn is_unauthorized_configuration(&self) -> bool {
        self.failure_class() == FailureClass::UnauthorizedConfiguration
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::EmptyDocument;
        assert_eq!(err.code(), ErrorCode::EmptyDocument);
        assert_eq!(err.failure_class(), FailureClass::InvalidInput);
    }

    #[test]
    fn test_missing_key_is_unauthorized_configuration() {
        let err = AppError::MissingApiKey;
        assert_eq!(err.code(), ErrorCode::MissingApiKey);
        assert!(err.is_unauthorized_configuration());
        assert!(!err.is_transport());
    }

    #[test]
    fn test_transport_class() {
        let err = AppError::EmbeddingError {
            message: "connection reset".into(),
        };
        assert!(err.is_transport());

        let err = AppError::VectorStoreError {
            message: "timed out".into(),
        };
        assert_eq!(err.failure_class(), FailureClass::Transport);
    }

    #[test]
    fn test_isolation_is_fatal_class() {
        let err = AppError::IsolationViolation {
            expected: Uuid::new_v4(),
            found: Uuid::new_v4(),
        };
        assert_eq!(err.failure_class(), FailureClass::Isolation);
        assert_eq!(err.code().as_code(), 3001);
    }
}
