//! DocuChat ingestion pipeline
//!
//! Turns one uploaded document into a queryable conversation:
//! - Chunker: overlapping, bounded-size, boundary-aware text chunks
//! - Vector Indexer: bounded-concurrency embedding plus batch upsert
//! - Ingestion pipeline: the `Created → ... → Indexed | Failed` state
//!   machine with compensating deletion on failure

pub mod chunker;
pub mod errors;
pub mod indexer;
pub mod pipeline;

pub use chunker::chunk_text;
pub use errors::IngestionError;
pub use indexer::VectorIndexer;
pub use pipeline::{IngestionPipeline, IngestionReceipt, IngestionRequest, IngestionStage};
