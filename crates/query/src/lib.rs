//! DocuChat query pipeline
//!
//! Answers a natural-language question against one ingested
//! conversation:
//! - Query Rewriter: raw question → standalone question
//! - Scoped Retriever: similarity search restricted to the conversation
//! - Answer Synthesizer: fixed template + one model call
//! - Query pipeline: the linear orchestration plus chat-turn persistence

pub mod errors;
pub mod pipeline;
pub mod retriever;
pub mod rewriter;
pub mod synthesizer;

pub use errors::{QueryError, QueryStage};
pub use pipeline::{Answer, QueryPipeline, QueryRequest};
pub use retriever::ScopedRetriever;
pub use rewriter::QueryRewriter;
pub use synthesizer::AnswerSynthesizer;
