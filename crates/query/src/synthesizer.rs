//! Answer synthesizer
//!
//! Joins the retrieved chunks into a context block, renders the fixed
//! answer template, and invokes the model once. A transport failure is
//! reported upward as-is; this module never fabricates an answer.

use docuchat_common::errors::Result;
use docuchat_common::llm::ChatModel;
use std::sync::Arc;
use tracing::debug;

/// Fixed answer template
///
/// The fallback sentence must match [`docuchat_common::llm::DONT_KNOW_ANSWER`]
/// verbatim; the stub model keys off it and callers compare against it.
pub const ANSWER_TEMPLATE: &str = "\
You are answering questions about an uploaded document. Answer the question \
using only the context below, keeping a conversational tone. If the answer \
cannot be found in the context, reply with \"I am sorry, I don't know the \
answer to that\" and suggest writing to {support_email} for further help. Do \
not make up an answer.

context: {context}

question: {question}
answer";

/// Separator between retrieved chunks in the context block
const CONTEXT_SEPARATOR: &str = "\n\n";

/// Produces the final answer from retrieved context and the question
pub struct AnswerSynthesizer {
    model: Arc<dyn ChatModel>,
    support_email: String,
}

impl AnswerSynthesizer {
    pub fn new(model: Arc<dyn ChatModel>, support_email: impl Into<String>) -> Self {
        Self {
            model,
            support_email: support_email.into(),
        }
    }

    /// Render the answer prompt, preserving retrieval order of the chunks
    pub fn build_prompt(&self, context_chunks: &[String], question: &str) -> String {
        let context = context_chunks.join(CONTEXT_SEPARATOR);
        ANSWER_TEMPLATE
            .replace("{support_email}", &self.support_email)
            .replace("{context}", &context)
            .replace("{question}", question)
    }

    /// Invoke the model once and return its raw (trimmed) output
    pub async fn synthesize(&self, context_chunks: &[String], question: &str) -> Result<String> {
        let prompt = self.build_prompt(context_chunks, question);
        let answer = self.model.complete(&prompt).await?;

        debug!(
            context_chunks = context_chunks.len(),
            answer_len = answer.len(),
            "Answer synthesized"
        );

        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docuchat_common::llm::{MockChatModel, DONT_KNOW_ANSWER};

    fn synthesizer() -> AnswerSynthesizer {
        AnswerSynthesizer::new(Arc::new(MockChatModel), "support@docuchat.io")
    }

    #[test]
    fn test_template_carries_the_fixed_fallback_sentence() {
        assert!(ANSWER_TEMPLATE.contains(DONT_KNOW_ANSWER));
    }

    #[test]
    fn test_prompt_joins_chunks_in_retrieval_order() {
        let s = synthesizer();
        let chunks = vec!["first chunk".to_string(), "second chunk".to_string()];
        let prompt = s.build_prompt(&chunks, "what is this?");

        assert!(prompt.contains("first chunk\n\nsecond chunk"));
        assert!(prompt.contains("question: what is this?"));
        assert!(prompt.contains("support@docuchat.io"));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{question}"));
        assert!(!prompt.contains("{support_email}"));
    }

    #[tokio::test]
    async fn test_empty_context_produces_the_fallback_sentence() {
        let s = synthesizer();
        let answer = s.synthesize(&[], "what is this about?").await.unwrap();
        assert_eq!(answer, DONT_KNOW_ANSWER);
    }

    #[tokio::test]
    async fn test_answer_draws_on_the_context() {
        let s = synthesizer();
        let chunks = vec!["The warranty lasts two years.".to_string()];
        let answer = s
            .synthesize(&chunks, "how long is the warranty?")
            .await
            .unwrap();
        assert!(answer.contains("The warranty lasts two years."));
        assert_ne!(answer, DONT_KNOW_ANSWER);
    }
}
