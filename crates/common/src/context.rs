//! Per-request user context
//!
//! The per-user API key is an explicit value threaded through every
//! pipeline call, never ambient state. Both orchestrators take a
//! [`UserContext`] and reject requests without a usable credential
//! before touching any external service.

use crate::errors::{AppError, Result};
use uuid::Uuid;

/// Identity and credential of the caller, valid for one pipeline call
#[derive(Debug, Clone)]
pub struct UserContext {
    /// Authenticated user id
    pub user_id: Uuid,

    /// Per-user embedding/chat API key
    pub api_key: Option<String>,
}

impl UserContext {
    pub fn new(user_id: Uuid, api_key: impl Into<String>) -> Self {
        Self {
            user_id,
            api_key: Some(api_key.into()),
        }
    }

    /// A context without a credential; pipelines will reject it
    pub fn without_api_key(user_id: Uuid) -> Self {
        Self {
            user_id,
            api_key: None,
        }
    }

    /// Get the API key, failing with the unauthorized-configuration
    /// class when it is absent or blank
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(AppError::MissingApiKey),
        }
    }
}
