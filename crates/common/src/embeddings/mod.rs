//! Embedding service abstraction
//!
//! Converts chunk/question text into similarity vectors. The real client
//! speaks the OpenAI embeddings API with the caller's per-user key; the
//! mock produces deterministic vectors so retrieval behavior is testable
//! without a network.
//!
//! Failures are never retried here: a failed call surfaces once and the
//! owning orchestrator decides what to compensate.

use crate::config::EmbeddingSettings;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// OpenAI embedding client
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimension: usize,
    base_url: String,
}

#[derive(Serialize)]
struct OpenAiRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Create a new OpenAI embedder with the caller's API key
    pub fn new(api_key: impl Into<String>, settings: &EmbeddingSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: settings.model.clone(),
            dimension: settings.dimension,
            base_url: settings
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
        })
    }

    async fn make_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);

        let request = OpenAiRequest {
            input: texts.to_vec(),
            model: self.model.clone(),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::EmbeddingError {
                message: format!("Request failed: {}", e),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized {
                message: "Embedding service rejected the API key".to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmbeddingError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: OpenAiResponse =
            response
                .json()
                .await
                .map_err(|e| AppError::EmbeddingError {
                    message: format!("Failed to parse response: {}", e),
                })?;

        Ok(result.data.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.make_request(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AppError::EmbeddingError {
                message: "Empty response".to_string(),
            })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // OpenAI caps the number of inputs per request
        const BATCH_SIZE: usize = 100;

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            tracing::debug!(batch_size = chunk.len(), model = %self.model, "Embedding batch");
            let embeddings = self.make_request(chunk).await?;
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic embedder for testing
///
/// Hashes each whitespace-separated token into a fixed-size bag-of-words
/// vector and normalizes it, so identical texts map to identical vectors
/// and texts sharing vocabulary score higher under cosine similarity.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];

        for token in text.split_whitespace() {
            let token: String = token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if token.is_empty() {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let slot = (hasher.finish() % self.dimension as u64) as usize;
            vector[slot] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }

        vector
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Builds an embedder bound to one caller's credential
///
/// The pipelines construct their embedding client per request from the
/// caller's API key, so the credential stays an explicit input and is
/// never baked into long-lived state.
pub trait EmbedderFactory: Send + Sync {
    fn embedder_for(&self, api_key: &str) -> Result<Arc<dyn Embedder>>;
}

impl std::fmt::Debug for dyn EmbedderFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EmbedderFactory")
    }
}

/// Factory for [`OpenAiEmbedder`] clients
pub struct OpenAiEmbedderFactory {
    settings: EmbeddingSettings,
}

impl OpenAiEmbedderFactory {
    pub fn new(settings: EmbeddingSettings) -> Self {
        Self { settings }
    }
}

impl EmbedderFactory for OpenAiEmbedderFactory {
    fn embedder_for(&self, api_key: &str) -> Result<Arc<dyn Embedder>> {
        Ok(Arc::new(OpenAiEmbedder::new(api_key, &self.settings)?))
    }
}

/// Factory that hands out one pre-built embedder regardless of the
/// credential; backs the mock provider and test doubles
pub struct SharedEmbedder {
    inner: Arc<dyn Embedder>,
}

impl SharedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>) -> Self {
        Self { inner }
    }
}

impl EmbedderFactory for SharedEmbedder {
    fn embedder_for(&self, _api_key: &str) -> Result<Arc<dyn Embedder>> {
        Ok(Arc::clone(&self.inner))
    }
}

/// Create an embedder factory for the configured provider
pub fn build_embedder_factory(
    settings: &EmbeddingSettings,
) -> Result<Arc<dyn EmbedderFactory>> {
    match settings.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiEmbedderFactory::new(settings.clone()))),
        "mock" => Ok(Arc::new(SharedEmbedder::new(Arc::new(MockEmbedder::new(
            settings.dimension,
        ))))),
        other => Err(AppError::Configuration {
            message: format!("Unknown embedding provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedder_dimension() {
        let embedder = MockEmbedder::new(256);
        let embedding = embedder.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 256);
    }

    #[tokio::test]
    async fn test_mock_embedder_deterministic() {
        let embedder = MockEmbedder::default();
        let a = embedder.embed("the quick brown fox").await.unwrap();
        let b = embedder.embed("the quick brown fox").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_mock_embedder_similarity_tracks_vocabulary() {
        let embedder = MockEmbedder::default();
        let base = embedder.embed("rust memory safety").await.unwrap();
        let close = embedder.embed("memory safety in rust").await.unwrap();
        let far = embedder.embed("banana bread recipe").await.unwrap();

        let dot = |a: &[f32], b: &[f32]| -> f32 {
            a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
        };
        assert!(dot(&base, &close) > dot(&base, &far));
    }

    #[tokio::test]
    async fn test_mock_batch() {
        let embedder = MockEmbedder::default();
        let texts = vec!["text1".to_string(), "text2".to_string()];
        let embeddings = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), 256);
    }

    #[test]
    fn test_openai_factory_builds_per_key_clients() {
        let factory = OpenAiEmbedderFactory::new(EmbeddingSettings::default());
        let embedder = factory.embedder_for("sk-test").unwrap();
        assert_eq!(embedder.model_name(), "text-embedding-ada-002");
    }

    #[tokio::test]
    async fn test_shared_factory_ignores_the_key() {
        let factory = SharedEmbedder::new(Arc::new(MockEmbedder::default()));
        let a = factory.embedder_for("sk-a").unwrap();
        let b = factory.embedder_for("sk-b").unwrap();
        assert_eq!(
            a.embed("same text").await.unwrap(),
            b.embed("same text").await.unwrap()
        );
    }

    #[test]
    fn test_build_factory_unknown_provider() {
        let settings = EmbeddingSettings {
            provider: "carrier-pigeon".to_string(),
            ..EmbeddingSettings::default()
        };
        let err = build_embedder_factory(&settings).unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
    }
}
