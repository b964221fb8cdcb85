//! Vector store abstraction
//!
//! Stores chunk embeddings tagged with the owning conversation and serves
//! similarity queries scoped to one conversation. The conversation filter
//! is part of the search request itself, never applied after ranking, so
//! a query can never surface another conversation's vectors.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One embedding plus the metadata it is stored with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Record id within the index
    pub id: String,

    /// Embedding values
    pub values: Vec<f32>,

    /// Owning conversation
    pub conversation_id: Uuid,

    /// Source chunk text
    pub text: String,
}

/// A scored match from a similarity query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMatch {
    /// Record id within the index
    pub id: String,

    /// Similarity score, higher is closer
    pub score: f32,

    /// Conversation the matched vector belongs to
    pub conversation_id: Uuid,

    /// Source chunk text
    pub text: String,
}

/// Trait for conversation-scoped vector storage
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upsert a batch of records
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Similarity search restricted to one conversation, returning up to
    /// `top_k` matches ordered by descending score
    async fn query(
        &self,
        embedding: &[f32],
        conversation_id: Uuid,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>>;

    /// Delete every vector belonging to a conversation
    async fn delete_conversation(&self, conversation_id: Uuid) -> Result<()>;
}

/// REST client for a Pinecone-style vector index
///
/// Wire shape: `POST /vectors/upsert`, `POST /query` with a metadata
/// equality filter on `conversationId`, `POST /vectors/delete` by the
/// same filter.
pub struct HttpVectorStore {
    client: reqwest::Client,
    index_url: String,
    api_key: Option<String>,
    namespace: Option<String>,
}

#[derive(Serialize)]
struct UpsertRequest {
    vectors: Vec<UpsertVector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
}

#[derive(Serialize)]
struct UpsertVector {
    id: String,
    values: Vec<f32>,
    metadata: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    vector: Vec<f32>,
    top_k: usize,
    include_metadata: bool,
    filter: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: serde_json::Value,
}

impl HttpVectorStore {
    /// Create a new client against the given index URL
    pub fn new(
        index_url: impl Into<String>,
        api_key: Option<String>,
        namespace: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            index_url: index_url.into().trim_end_matches('/').to_string(),
            api_key,
            namespace,
        })
    }

    fn conversation_filter(conversation_id: Uuid) -> serde_json::Value {
        json!({ "conversationId": { "$eq": conversation_id.to_string() } })
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.index_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header("Api-Key", key);
        }

        let response = request.send().await.map_err(|e| AppError::VectorStoreError {
            message: format!("Request to {} failed: {}", path, e),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStoreError {
                message: format!("{} returned {}: {}", path, status, body),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        let vectors = records
            .into_iter()
            .map(|r| UpsertVector {
                id: r.id,
                values: r.values,
                metadata: json!({
                    "conversationId": r.conversation_id.to_string(),
                    "text": r.text,
                }),
            })
            .collect();

        let request = UpsertRequest {
            vectors,
            namespace: self.namespace.clone(),
        };

        self.post("/vectors/upsert", &request).await?;
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        conversation_id: Uuid,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>> {
        let request = QueryRequest {
            vector: embedding.to_vec(),
            top_k,
            include_metadata: true,
            filter: Self::conversation_filter(conversation_id),
            namespace: self.namespace.clone(),
        };

        let response = self.post("/query", &request).await?;
        let body: QueryResponse =
            response
                .json()
                .await
                .map_err(|e| AppError::VectorStoreError {
                    message: format!("Failed to parse query response: {}", e),
                })?;
        tracing::debug!(
            matches = body.matches.len(),
            %conversation_id,
            "Vector query returned"
        );

        body.matches
            .into_iter()
            .map(|m| {
                let conversation = m
                    .metadata
                    .get("conversationId")
                    .and_then(|v| v.as_str())
                    .and_then(|s| Uuid::parse_str(s).ok())
                    .ok_or_else(|| AppError::VectorStoreError {
                        message: format!("Match {} has no conversationId metadata", m.id),
                    })?;
                let text = m
                    .metadata
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();

                Ok(VectorMatch {
                    id: m.id,
                    score: m.score,
                    conversation_id: conversation,
                    text,
                })
            })
            .collect()
    }

    async fn delete_conversation(&self, conversation_id: Uuid) -> Result<()> {
        let request = json!({
            "filter": Self::conversation_filter(conversation_id),
            "namespace": self.namespace,
        });

        self.post("/vectors/delete", &request).await?;
        Ok(())
    }
}

/// In-memory vector store for testing
///
/// Applies the conversation filter before ranking, mirroring the
/// server-side metadata filter of the real index.
#[derive(Default)]
pub struct InMemoryVectorStore {
    records: RwLock<Vec<VectorRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored vectors across all conversations
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        let mut store = self.records.write().await;
        for record in records {
            if let Some(existing) = store.iter_mut().find(|r| r.id == record.id) {
                *existing = record;
            } else {
                store.push(record);
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        conversation_id: Uuid,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>> {
        let store = self.records.read().await;

        let mut matches: Vec<VectorMatch> = store
            .iter()
            .filter(|r| r.conversation_id == conversation_id)
            .map(|r| VectorMatch {
                id: r.id.clone(),
                score: cosine_similarity(embedding, &r.values),
                conversation_id: r.conversation_id,
                text: r.text.clone(),
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);

        Ok(matches)
    }

    async fn delete_conversation(&self, conversation_id: Uuid) -> Result<()> {
        let mut store = self.records.write().await;
        store.retain(|r| r.conversation_id != conversation_id);
        Ok(())
    }
}
