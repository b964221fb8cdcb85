//! Configuration management for DocuChat
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Document chunking configuration
    #[serde(default)]
    pub chunking: ChunkingSettings,

    /// Scoped retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalSettings,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingSettings,

    /// Chat model configuration
    #[serde(default)]
    pub chat: ChatSettings,

    /// Vector store configuration
    #[serde(default)]
    pub vector_store: VectorStoreSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilitySettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingSettings {
    /// Maximum chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalSettings {
    /// Number of chunks returned per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingSettings {
    /// Embedding provider: openai, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum in-flight embedding calls during ingestion
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatSettings {
    /// Chat completions endpoint
    #[serde(default = "default_chat_endpoint")]
    pub endpoint: String,

    /// Model to use
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,

    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Sampling temperature (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Support contact offered when the model cannot answer from context
    #[serde(default = "default_support_email")]
    pub support_email: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorStoreSettings {
    /// Vector index base URL
    #[serde(default)]
    pub index_url: String,

    /// Service API key for the vector store (distinct from the per-user
    /// embedding/chat credential)
    pub api_key: Option<String>,

    /// Optional namespace within the index
    pub namespace: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_vector_store_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilitySettings {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_chunk_size() -> usize { crate::DEFAULT_CHUNK_SIZE }
fn default_chunk_overlap() -> usize { crate::DEFAULT_CHUNK_OVERLAP }
fn default_top_k() -> usize { crate::DEFAULT_TOP_K }
fn default_embedding_provider() -> String { "openai".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { 1536 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_max_concurrency() -> usize { 5 }
fn default_chat_endpoint() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_chat_model() -> String { "gpt-4o-mini".to_string() }
fn default_chat_timeout() -> u64 { 30 }
fn default_max_tokens() -> usize { 1000 }
fn default_temperature() -> f32 { 0.7 }
fn default_support_email() -> String { "support@docuchat.io".to_string() }
fn default_vector_store_timeout() -> u64 { 30 }
fn default_log_level() -> String { "info".to_string() }
fn default_service_name() -> String { "docuchat".to_string() }

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: default_top_k() }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            endpoint: default_chat_endpoint(),
            model: default_chat_model(),
            timeout_secs: default_chat_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            support_email: default_support_email(),
        }
    }
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            index_url: String::new(),
            api_key: None,
            namespace: None,
            timeout_secs: default_vector_store_timeout(),
        }
    }
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            service_name: default_service_name(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingSettings::default(),
            retrieval: RetrievalSettings::default(),
            embedding: EmbeddingSettings::default(),
            chat: ChatSettings::default(),
            vector_store: VectorStoreSettings::default(),
            observability: ObservabilitySettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__RETRIEVAL__TOP_K=5
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get embedding request timeout as Duration
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding.timeout_secs)
    }

    /// Get chat request timeout as Duration
    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.embedding.max_concurrency, 5);
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
    }

    #[test]
    fn test_support_email_default() {
        let config = AppConfig::default();
        assert!(config.chat.support_email.contains('@'));
    }
}
