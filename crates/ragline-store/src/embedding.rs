//! Embedding Models for Text Vectorization
//!
//! Text-to-vector conversion for similarity search.
//!
//! # Architecture
//!
//! - **HashingEmbeddingModel**: deterministic bag-of-words feature hashing.
//!   Texts that share words get similar vectors, which is enough to drive the
//!   pipeline end to end without model files or a network.
//! - **OllamaEmbeddingModel**: `POST /api/embeddings` against a local Ollama.
//!
//! # Examples
//!
//! ```rust
//! use ragline_store::embedding::{EmbeddingModel, HashingEmbeddingModel};
//!
//! let model = HashingEmbeddingModel::new(256);
//! let embedding = model.embed_sync("The sky is blue").unwrap();
//! assert_eq!(embedding.len(), model.dimension());
//!
//! // Same text always produces same embedding
//! assert_eq!(embedding, model.embed_sync("The sky is blue").unwrap());
//! ```

use async_trait::async_trait;
use ragline_domain::Retryable;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Model not loaded or not pulled on the server
    #[error("Embedding model not available: {0}")]
    ModelNotAvailable(String),

    /// Invalid input text
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The provider answered with something unusable
    #[error("Model inference failed: {0}")]
    InferenceFailed(String),

    /// Network or server failure
    #[error("Embedding provider communication failed: {0}")]
    Communication(String),
}

impl Retryable for EmbeddingError {
    fn is_transient(&self) -> bool {
        matches!(self, EmbeddingError::Communication(_))
    }
}

/// Trait for embedding models
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Generate an embedding vector for the given text
    ///
    /// Empty or whitespace-only text is rejected with
    /// [`EmbeddingError::InvalidInput`].
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Get the dimension of embeddings produced by this model
    fn dimension(&self) -> usize;

    /// Model identifier, for logs and readiness output
    fn model_name(&self) -> &str;
}

fn reject_empty(text: &str) -> Result<(), EmbeddingError> {
    if text.trim().is_empty() {
        return Err(EmbeddingError::InvalidInput(
            "Empty text cannot be embedded".to_string(),
        ));
    }
    Ok(())
}

/// Deterministic feature-hashing embedder
///
/// Each lowercased alphanumeric token is hashed to a bucket and a sign; the
/// bucket counts are L2-normalised. The vectors are:
///
/// - **Deterministic**: same text always produces same embedding
/// - **Normalized**: unit length whenever the text has at least one token
/// - **Lexical**: cosine similarity tracks word overlap
#[derive(Debug, Clone)]
pub struct HashingEmbeddingModel {
    dimension: usize,
}

impl HashingEmbeddingModel {
    /// Create a new hashing model
    ///
    /// A dimension of 0 is raised to 1.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(token: &str, dimension: usize) -> (usize, f32) {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let hash = hasher.finish();
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        ((hash % dimension as u64) as usize, sign)
    }

    /// Embed synchronously
    pub fn embed_sync(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        reject_empty(text)?;

        let mut embedding = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let (index, sign) = Self::bucket(&token, self.dimension);
            embedding[index] += sign;
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut embedding {
                *value /= magnitude;
            }
        }
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingModel for HashingEmbeddingModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_sync(text)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hashing"
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Default timeout for embedding requests
pub const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embeddings from a local Ollama server
pub struct OllamaEmbeddingModel {
    endpoint: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

impl OllamaEmbeddingModel {
    /// Create a new Ollama embedding model
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Embedding model (e.g., "nomic-embed-text")
    /// - `dimension`: Expected vector length; responses of any other length
    ///   are rejected
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_EMBEDDING_TIMEOUT_SECS))
            .build()
            .map_err(|e| EmbeddingError::Communication(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimension,
            client,
        })
    }
}

#[async_trait]
impl EmbeddingModel for OllamaEmbeddingModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        reject_empty(text)?;

        let url = format!("{}/api/embeddings", self.endpoint);
        let body = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(EmbeddingError::ModelNotAvailable(self.model.clone()));
        }
        if !status.is_success() {
            return Err(EmbeddingError::Communication(format!("HTTP {}", status)));
        }

        let parsed: OllamaEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InferenceFailed(format!("Failed to parse response: {}", e)))?;

        if parsed.embedding.len() != self.dimension {
            return Err(EmbeddingError::InferenceFailed(format!(
                "Expected {} dimensions, got {}",
                self.dimension,
                parsed.embedding.len()
            )));
        }
        Ok(parsed.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Calculate cosine similarity between two embedding vectors
///
/// Returns a value in [-1, 1]. Vectors of different length, or with zero
/// magnitude, have similarity 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
