//! Query pipeline
//!
//! Linear, stateless orchestration of one question: rewrite → scoped
//! retrieval → synthesis → persist the chat turn. There is no
//! intermediate persistence: on any failure before the final append, no
//! chat turn exists and the caller gets an explicit failure signal,
//! never a partial answer.

use crate::errors::QueryError;
use crate::retriever::ScopedRetriever;
use crate::rewriter::QueryRewriter;
use crate::synthesizer::AnswerSynthesizer;
use docuchat_common::config::AppConfig;
use docuchat_common::context::UserContext;
use docuchat_common::conversations::ConversationStore;
use docuchat_common::embeddings::EmbedderFactory;
use docuchat_common::llm::ChatModelFactory;
use docuchat_common::metrics::METRICS_PREFIX;
use docuchat_common::vector_store::VectorStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// One question against an already-ingested conversation
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub user: UserContext,
    pub conversation_id: Uuid,
    pub question: String,
}

/// Final answer; the chat turn has already been persisted
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub conversation_id: Uuid,
    pub question: String,
    pub rewritten_question: String,
    pub answer: String,
    /// Chunks the answer was grounded on, in retrieval order
    pub context_chunks: Vec<String>,
}

/// Query orchestrator
///
/// The embedding and chat clients are built per request from the
/// caller's API key; the pipeline itself holds no credential.
pub struct QueryPipeline {
    conversations: Arc<dyn ConversationStore>,
    vectors: Arc<dyn VectorStore>,
    embedders: Arc<dyn EmbedderFactory>,
    models: Arc<dyn ChatModelFactory>,
    top_k: usize,
    support_email: String,
}

impl QueryPipeline {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        vectors: Arc<dyn VectorStore>,
        embedders: Arc<dyn EmbedderFactory>,
        models: Arc<dyn ChatModelFactory>,
        config: &AppConfig,
    ) -> Self {
        Self {
            conversations,
            vectors,
            embedders,
            models,
            top_k: config.retrieval.top_k,
            support_email: config.chat.support_email.clone(),
        }
    }

    /// Answer one question
    #[instrument(skip(self, request), fields(conversation_id = %request.conversation_id, user_id = %request.user.user_id))]
    pub async fn answer(&self, request: QueryRequest) -> Result<Answer, QueryError> {
        match self.run(&request).await {
            Ok(answer) => {
                info!(
                    context_chunks = answer.context_chunks.len(),
                    "Question answered"
                );
                metrics::counter!(format!("{}_queries_total", METRICS_PREFIX)).increment(1);
                Ok(answer)
            }
            Err(err) => {
                warn!(
                    error = %err,
                    failed_stage = err.failed_stage().as_str(),
                    class = err.failure_class().as_str(),
                    "Query failed"
                );
                metrics::counter!(
                    format!("{}_query_failures_total", METRICS_PREFIX),
                    "stage" => err.failed_stage().as_str()
                )
                .increment(1);
                Err(err)
            }
        }
    }

    async fn run(&self, request: &QueryRequest) -> Result<Answer, QueryError> {
        let api_key = request
            .user
            .require_api_key()
            .map_err(|_| QueryError::MissingApiKey)?;

        // Both model calls and the question embedding run under this
        // caller's key, not a pipeline-wide one
        let embedder = self
            .embedders
            .embedder_for(api_key)
            .map_err(QueryError::ClientSetup)?;
        let model = self
            .models
            .model_for(api_key)
            .map_err(QueryError::ClientSetup)?;

        let rewritten = QueryRewriter::new(Arc::clone(&model))
            .rewrite(&request.question)
            .await
            .map_err(QueryError::Rewrite)?;

        let context_chunks =
            ScopedRetriever::new(embedder, Arc::clone(&self.vectors), self.top_k)
                .retrieve(&rewritten, request.conversation_id)
                .await
                .map_err(QueryError::Retrieval)?;

        let answer = AnswerSynthesizer::new(model, self.support_email.clone())
            .synthesize(&context_chunks, &rewritten)
            .await
            .map_err(QueryError::Synthesis)?;

        self.conversations
            .append_turn(request.conversation_id, &request.question, &answer)
            .await
            .map_err(QueryError::Persistence)?;

        Ok(Answer {
            conversation_id: request.conversation_id,
            question: request.question.clone(),
            rewritten_question: rewritten,
            answer,
            context_chunks,
        })
    }
}
