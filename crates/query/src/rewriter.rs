//! Query rewriter
//!
//! Turns a raw user question into a standalone question that does not
//! depend on implicit conversational context, using a fixed instruction
//! template and a single model call. No retries here; a failed call is a
//! pipeline failure.

use docuchat_common::errors::{AppError, Result};
use docuchat_common::llm::ChatModel;
use std::sync::Arc;
use tracing::debug;

/// Fixed standalone-question instruction template
pub const STANDALONE_QUESTION_TEMPLATE: &str =
    "Given a question, convert it into a standalone question. question: {question} standalone question";

/// Rewrites questions into standalone form
pub struct QueryRewriter {
    model: Arc<dyn ChatModel>,
}

impl QueryRewriter {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Render the rewrite prompt for a question
    pub fn build_prompt(question: &str) -> String {
        STANDALONE_QUESTION_TEMPLATE.replace("{question}", question)
    }

    /// Rewrite a raw question into a standalone question
    ///
    /// An empty question is a validation error. An empty model output
    /// falls back to the raw question; the rewrite is an improvement,
    /// not a gate.
    pub async fn rewrite(&self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Validation {
                message: "Question must not be empty".to_string(),
            });
        }

        let prompt = Self::build_prompt(question);
        let rewritten = self.model.complete(&prompt).await?;
        let rewritten = rewritten.trim();

        if rewritten.is_empty() {
            debug!("Rewrite produced empty output, keeping the raw question");
            return Ok(question.to_string());
        }

        debug!(original = question, rewritten, "Question rewritten");
        Ok(rewritten.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docuchat_common::llm::MockChatModel;

    struct BlankChatModel;

    #[async_trait]
    impl ChatModel for BlankChatModel {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok("   ".to_string())
        }

        fn model_name(&self) -> &str {
            "blank"
        }
    }

    #[test]
    fn test_prompt_embeds_the_question() {
        let prompt = QueryRewriter::build_prompt("what about chapter two?");
        assert!(prompt.starts_with("Given a question, convert it into a standalone question."));
        assert!(prompt.contains("question: what about chapter two?"));
        assert!(prompt.ends_with("standalone question"));
    }

    #[tokio::test]
    async fn test_rewrite_returns_model_output() {
        let rewriter = QueryRewriter::new(Arc::new(MockChatModel));
        let out = rewriter.rewrite("what does it say about safety?").await.unwrap();
        assert_eq!(out, "what does it say about safety?");
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let rewriter = QueryRewriter::new(Arc::new(MockChatModel));
        let err = rewriter.rewrite("   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_blank_model_output_falls_back_to_raw_question() {
        let rewriter = QueryRewriter::new(Arc::new(BlankChatModel));
        let out = rewriter.rewrite("original question?").await.unwrap();
        assert_eq!(out, "original question?");
    }
}
