//! Ingestion pipeline
//!
//! Orchestrates one document upload end to end:
//! `Created → TextValidated → Chunked → Embedded → Indexed | Failed`.
//!
//! The conversation record is created first so a conversation id exists;
//! every later failure runs an explicit compensation step that deletes
//! the conversation's vectors and the record itself, so a failed upload
//! never leaves an empty, indexless conversation visible to the user.

use crate::chunker::chunk_text;
use crate::errors::IngestionError;
use crate::indexer::VectorIndexer;
use docuchat_common::config::AppConfig;
use docuchat_common::context::UserContext;
use docuchat_common::conversations::{Conversation, ConversationStore};
use docuchat_common::embeddings::{Embedder, EmbedderFactory};
use docuchat_common::metrics::METRICS_PREFIX;
use docuchat_common::vector_store::VectorStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Stages of the ingestion state machine
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStage {
    Created,
    TextValidated,
    Chunked,
    Embedded,
    Indexed,
    Failed,
}

/// One ingestion call: who is uploading, what file, and the extracted text
///
/// `extracted_text` is `None` when upstream text extraction failed; the
/// pipeline rejects that before indexing anything.
#[derive(Debug, Clone)]
pub struct IngestionRequest {
    pub user: UserContext,
    pub file_name: String,
    pub extracted_text: Option<String>,
}

/// Successful ingestion outcome; the conversation is now queryable
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReceipt {
    pub conversation_id: Uuid,
    pub chunk_count: usize,
}

/// Ingestion orchestrator
///
/// The embedding client is built per request from the caller's API key;
/// the pipeline itself holds no credential.
pub struct IngestionPipeline {
    conversations: Arc<dyn ConversationStore>,
    vectors: Arc<dyn VectorStore>,
    embedders: Arc<dyn EmbedderFactory>,
    config: AppConfig,
}

impl IngestionPipeline {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        vectors: Arc<dyn VectorStore>,
        embedders: Arc<dyn EmbedderFactory>,
        config: AppConfig,
    ) -> Self {
        Self {
            conversations,
            vectors,
            embedders,
            config,
        }
    }

    /// Ingest one uploaded document
    ///
    /// On success the conversation is queryable; on failure the
    /// pre-ingestion state is restored via compensating deletion and the
    /// error's failure class tells the caller which notification to show.
    #[instrument(skip(self, request), fields(user_id = %request.user.user_id, file_name = %request.file_name))]
    pub async fn ingest(
        &self,
        request: IngestionRequest,
    ) -> Result<IngestionReceipt, IngestionError> {
        // Credential check comes before any external write
        let api_key = match request.user.require_api_key() {
            Ok(key) => key,
            Err(_) => {
                let err = IngestionError::MissingApiKey;
                self.record_failure(&err, None);
                return Err(err);
            }
        };

        // Embedding calls run under this caller's key, not a pipeline-wide one
        let embedder = match self.embedders.embedder_for(api_key) {
            Ok(embedder) => embedder,
            Err(e) => {
                let err = IngestionError::ClientSetup(e);
                self.record_failure(&err, None);
                return Err(err);
            }
        };

        let conversation = self
            .conversations
            .create(request.user.user_id, &request.file_name)
            .await
            .map_err(IngestionError::Conversation)?;
        info!(
            conversation_id = %conversation.id,
            stage = ?IngestionStage::Created,
            "Conversation created"
        );

        match self
            .run(&conversation, request.extracted_text.as_deref(), embedder)
            .await
        {
            Ok(chunk_count) => {
                info!(
                    conversation_id = %conversation.id,
                    chunk_count,
                    stage = ?IngestionStage::Indexed,
                    "Document ingested"
                );
                metrics::counter!(format!("{}_ingestions_total", METRICS_PREFIX)).increment(1);
                metrics::counter!(format!("{}_chunks_indexed_total", METRICS_PREFIX))
                    .increment(chunk_count as u64);

                Ok(IngestionReceipt {
                    conversation_id: conversation.id,
                    chunk_count,
                })
            }
            Err(err) => {
                self.record_failure(&err, Some(conversation.id));
                self.compensate(conversation.id).await;
                Err(err)
            }
        }
    }

    /// The stages after the conversation record exists
    async fn run(
        &self,
        conversation: &Conversation,
        extracted_text: Option<&str>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<usize, IngestionError> {
        let text = extracted_text
            .filter(|t| !t.trim().is_empty())
            .ok_or(IngestionError::EmptyDocument)?;
        info!(
            conversation_id = %conversation.id,
            text_len = text.chars().count(),
            stage = ?IngestionStage::TextValidated,
            "Extracted text validated"
        );

        let chunks = chunk_text(text, &self.config.chunking);
        if chunks.is_empty() {
            return Err(IngestionError::EmptyDocument);
        }
        info!(
            conversation_id = %conversation.id,
            chunk_count = chunks.len(),
            stage = ?IngestionStage::Chunked,
            "Document chunked"
        );

        let indexer = VectorIndexer::new(
            embedder,
            Arc::clone(&self.vectors),
            self.config.embedding.max_concurrency,
        );
        let count = indexer
            .index(conversation.id, &chunks)
            .await
            .map_err(IngestionError::Indexing)?;

        Ok(count)
    }

    /// Compensating deletion: explicit saga step, not exception unwinding
    ///
    /// Vectors go first, then the conversation record. Compensation
    /// failures are logged but never mask the original error.
    async fn compensate(&self, conversation_id: Uuid) {
        if let Err(e) = self.vectors.delete_conversation(conversation_id).await {
            warn!(
                conversation_id = %conversation_id,
                error = %e,
                "Failed to delete vectors during compensation"
            );
        }
        if let Err(e) = self.conversations.delete(conversation_id).await {
            warn!(
                conversation_id = %conversation_id,
                error = %e,
                "Failed to delete conversation during compensation"
            );
        }
    }

    fn record_failure(&self, err: &IngestionError, conversation_id: Option<Uuid>) {
        warn!(
            conversation_id = ?conversation_id,
            error = %err,
            failed_stage = ?err.failed_stage(),
            class = err.failure_class().as_str(),
            stage = ?IngestionStage::Failed,
            "Ingestion failed"
        );
        metrics::counter!(
            format!("{}_ingestion_failures_total", METRICS_PREFIX),
            "class" => err.failure_class().as_str()
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docuchat_common::conversations::InMemoryConversationStore;
    use docuchat_common::embeddings::{MockEmbedder, SharedEmbedder};
    use docuchat_common::errors::{AppError, FailureClass, Result};
    use docuchat_common::vector_store::InMemoryVectorStore;
    use std::sync::Mutex;

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(AppError::EmbeddingError {
                message: "connection reset".into(),
            })
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(AppError::EmbeddingError {
                message: "connection reset".into(),
            })
        }

        fn model_name(&self) -> &str {
            "failing"
        }

        fn dimension(&self) -> usize {
            0
        }
    }

    struct Harness {
        conversations: Arc<InMemoryConversationStore>,
        vectors: Arc<InMemoryVectorStore>,
        pipeline: IngestionPipeline,
    }

    fn harness_with(embedder: Arc<dyn Embedder>) -> Harness {
        let conversations = Arc::new(InMemoryConversationStore::new());
        let vectors = Arc::new(InMemoryVectorStore::new());
        let pipeline = IngestionPipeline::new(
            Arc::clone(&conversations) as Arc<dyn ConversationStore>,
            Arc::clone(&vectors) as Arc<dyn VectorStore>,
            Arc::new(SharedEmbedder::new(embedder)),
            AppConfig::default(),
        );
        Harness {
            conversations,
            vectors,
            pipeline,
        }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(MockEmbedder::default()))
    }

    fn request(text: Option<&str>) -> IngestionRequest {
        IngestionRequest {
            user: UserContext::new(Uuid::new_v4(), "sk-test"),
            file_name: "report.pdf".to_string(),
            extracted_text: text.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_successful_ingestion_makes_conversation_queryable() {
        let h = harness();
        let text = "A".repeat(1200);

        let receipt = h.pipeline.ingest(request(Some(&text))).await.unwrap();

        assert_eq!(receipt.chunk_count, 3);
        assert_eq!(h.vectors.len().await, 3);
        let stored = h
            .conversations
            .get(receipt.conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.file_name, "report.pdf");
        assert!(stored.chat.is_empty());
    }

    #[tokio::test]
    async fn test_empty_text_fails_validation_and_compensates() {
        let h = harness();

        let err = h.pipeline.ingest(request(Some(""))).await.unwrap_err();

        assert!(matches!(err, IngestionError::EmptyDocument));
        assert_eq!(err.failure_class(), FailureClass::InvalidInput);
        // No orphaned conversation or vectors remain
        assert!(h.conversations.is_empty().await);
        assert!(h.vectors.is_empty().await);
    }

    #[tokio::test]
    async fn test_unextractable_text_fails_validation() {
        let h = harness();

        let err = h.pipeline.ingest(request(None)).await.unwrap_err();

        assert!(matches!(err, IngestionError::EmptyDocument));
        assert!(h.conversations.is_empty().await);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_any_external_write() {
        let h = harness();
        let req = IngestionRequest {
            user: UserContext::without_api_key(Uuid::new_v4()),
            file_name: "report.pdf".to_string(),
            extracted_text: Some("some document text".to_string()),
        };

        let err = h.pipeline.ingest(req).await.unwrap_err();

        assert!(matches!(err, IngestionError::MissingApiKey));
        assert_eq!(
            err.failure_class(),
            FailureClass::UnauthorizedConfiguration
        );
        // Nothing was created, so nothing needed compensation
        assert!(h.conversations.is_empty().await);
        assert!(h.vectors.is_empty().await);
    }

    #[derive(Default)]
    struct KeyRecordingEmbedders {
        keys: Mutex<Vec<String>>,
    }

    impl EmbedderFactory for KeyRecordingEmbedders {
        fn embedder_for(&self, api_key: &str) -> Result<Arc<dyn Embedder>> {
            self.keys.lock().unwrap().push(api_key.to_string());
            Ok(Arc::new(MockEmbedder::default()))
        }
    }

    #[tokio::test]
    async fn test_each_request_builds_its_embedder_from_its_own_key() {
        let factory = Arc::new(KeyRecordingEmbedders::default());
        let conversations = Arc::new(InMemoryConversationStore::new());
        let vectors = Arc::new(InMemoryVectorStore::new());
        let pipeline = IngestionPipeline::new(
            conversations as Arc<dyn ConversationStore>,
            vectors as Arc<dyn VectorStore>,
            Arc::clone(&factory) as Arc<dyn EmbedderFactory>,
            AppConfig::default(),
        );

        for key in ["sk-alice", "sk-bob"] {
            let req = IngestionRequest {
                user: UserContext::new(Uuid::new_v4(), key),
                file_name: "report.pdf".to_string(),
                extracted_text: Some("some document text".to_string()),
            };
            pipeline.ingest(req).await.unwrap();
        }

        assert_eq!(
            *factory.keys.lock().unwrap(),
            vec!["sk-alice".to_string(), "sk-bob".to_string()]
        );
    }

    #[tokio::test]
    async fn test_embedding_failure_compensates_fully() {
        let h = harness_with(Arc::new(FailingEmbedder));

        let err = h
            .pipeline
            .ingest(request(Some("a perfectly fine document")))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestionError::Indexing(_)));
        assert_eq!(err.failure_class(), FailureClass::Transport);
        assert_eq!(err.failed_stage(), IngestionStage::Embedded);
        assert!(h.conversations.is_empty().await);
        assert!(h.vectors.is_empty().await);
    }
}
