//! Scoped retriever
//!
//! Embeds the rewritten question and runs a similarity search restricted
//! to one conversation's vectors. The conversation filter is part of the
//! store query itself; on top of that, every returned match is checked
//! defensively and a single foreign match discards the whole result set.

use docuchat_common::embeddings::Embedder;
use docuchat_common::errors::{AppError, Result};
use docuchat_common::vector_store::VectorStore;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

/// Retrieves the chunks most relevant to a question within one conversation
pub struct ScopedRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl ScopedRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, top_k: usize) -> Self {
        Self {
            embedder,
            store,
            top_k,
        }
    }

    /// Return up to `top_k` chunk texts for the conversation, ordered by
    /// descending similarity
    ///
    /// A conversation with no vectors yields an empty sequence, not an
    /// error; downstream synthesis handles empty context.
    pub async fn retrieve(&self, question: &str, conversation_id: Uuid) -> Result<Vec<String>> {
        let embedding = self.embedder.embed(question).await?;
        let matches = self
            .store
            .query(&embedding, conversation_id, self.top_k)
            .await?;

        // A foreign match means the store-side filter failed; the whole
        // result set is untrusted at that point.
        if let Some(foreign) = matches
            .iter()
            .find(|m| m.conversation_id != conversation_id)
        {
            error!(
                expected = %conversation_id,
                found = %foreign.conversation_id,
                "Retrieval returned a vector from another conversation"
            );
            return Err(AppError::IsolationViolation {
                expected: conversation_id,
                found: foreign.conversation_id,
            });
        }

        debug!(
            conversation_id = %conversation_id,
            matches = matches.len(),
            "Scoped retrieval complete"
        );

        Ok(matches.into_iter().map(|m| m.text).collect())
    }
}
