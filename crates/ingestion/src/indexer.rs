//! Vector indexer
//!
//! Embeds a batch of chunks and upserts the vectors into the store under
//! the owning conversation id. Embedding calls fan out with bounded
//! concurrency; the upsert is a single batch call so the store sees all
//! vectors or (on embedding failure) none.

use docuchat_common::embeddings::Embedder;
use docuchat_common::errors::{AppError, Result};
use docuchat_common::vector_store::{VectorRecord, VectorStore};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Embeds chunks and writes them to the vector store
pub struct VectorIndexer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    max_concurrency: usize,
}

impl VectorIndexer {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Embed every chunk and upsert the batch under `conversation_id`
    ///
    /// At most `max_concurrency` embedding calls are in flight at once;
    /// completion order does not matter since chunks are independent.
    /// Any embedding or upsert error propagates to the caller, which
    /// owns compensation.
    #[instrument(skip(self, chunks), fields(conversation_id = %conversation_id, chunk_count = chunks.len()))]
    pub async fn index(&self, conversation_id: Uuid, chunks: &[String]) -> Result<usize> {
        let embedded: Vec<(usize, String, Vec<f32>)> = stream::iter(
            chunks.iter().cloned().enumerate().map(|(index, chunk)| {
                let embedder = Arc::clone(&self.embedder);
                async move {
                    let values = embedder.embed(&chunk).await?;
                    Ok::<_, AppError>((index, chunk, values))
                }
            }),
        )
        .buffer_unordered(self.max_concurrency)
        .try_collect()
        .await?;

        let records: Vec<VectorRecord> = embedded
            .into_iter()
            .map(|(index, text, values)| VectorRecord {
                id: format!("{}-{}", conversation_id, index),
                values,
                conversation_id,
                text,
            })
            .collect();

        let count = records.len();
        self.store.upsert(records).await?;

        debug!(indexed = count, "Chunks embedded and upserted");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docuchat_common::embeddings::MockEmbedder;
    use docuchat_common::vector_store::InMemoryVectorStore;

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

    #[tokio::test]
    async fn test_indexes_one_vector_per_chunk() {
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = VectorIndexer::new(
            Arc::new(MockEmbedder::default()),
            Arc::clone(&store) as Arc<dyn VectorStore>,
            5,
        );

        let conversation_id = Uuid::new_v4();
        let chunks = vec![
            "first chunk".to_string(),
            "second chunk".to_string(),
            "third chunk".to_string(),
        ];

        let count = indexer.index(conversation_id, &chunks).await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(store.len().await, 3);

        // Every stored vector carries the owning conversation
        let embedder = MockEmbedder::default();
        let probe = embedder.embed("first chunk").await.unwrap();
        let matches = store.query(&probe, conversation_id, 10).await.unwrap();
        assert!(matches.iter().all(|m| m.conversation_id == conversation_id));
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates_and_stores_nothing() {
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = VectorIndexer::new(
            Arc::new(FailingEmbedder),
            Arc::clone(&store) as Arc<dyn VectorStore>,
            5,
        );

        let err = indexer
            .index(Uuid::new_v4(), &["chunk".to_string()])
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_chunk_list_is_a_noop() {
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = VectorIndexer::new(
            Arc::new(MockEmbedder::default()),
            Arc::clone(&store) as Arc<dyn VectorStore>,
            5,
        );

        let count = indexer.index(Uuid::new_v4(), &[]).await.unwrap();
        assert_eq!(count, 0);
        assert!(store.is_empty().await);
    }
}
