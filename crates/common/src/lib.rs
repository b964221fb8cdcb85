//! DocuChat Common Library
//!
//! Shared code for the ingestion and query pipelines including:
//! - Error types and failure classification
//! - Configuration management
//! - Per-request user context (explicit credential threading)
//! - Embedding and chat model client abstractions
//! - Vector store and conversation store abstractions
//! - Metrics and telemetry helpers

pub mod config;
pub mod context;
pub mod conversations;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod telemetry;
pub mod vector_store;

// Re-export commonly used types
pub use config::AppConfig;
pub use context::UserContext;
pub use conversations::{ChatRole, ChatTurn, Conversation, ConversationStore};
pub use embeddings::{Embedder, EmbedderFactory};
pub use errors::{AppError, FailureClass, Result};
pub use llm::{ChatModel, ChatModelFactory};
pub use vector_store::{VectorMatch, VectorRecord, VectorStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default maximum chunk size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default overlap between consecutive chunks in characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Default number of chunks retrieved per query
pub const DEFAULT_TOP_K: usize = 10;

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
