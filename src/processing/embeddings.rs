//! Embedding backends: text to fixed-dimension vectors.
//!
//! `HashEmbedder` is the offline default: MD5 feature hashing of unigrams and
//! bigrams, L2-normalized. It carries no semantics beyond shared vocabulary,
//! which is enough for chat threads that reuse the same terms.
//! `HttpEmbedder` talks to any OpenAI-compatible `/embeddings` endpoint.

use std::time::Duration;

use md5::{Digest, Md5};
use serde::Deserialize;

use crate::config::{EmbedderBackend, EmbedderConfig};
use crate::{TopicsError, TopicsResult};

/// Text → vector capability. Empty input yields empty output.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> TopicsResult<Vec<Vec<f32>>>;
}

/// Build the embedder selected in config.
pub fn from_config(cfg: &EmbedderConfig) -> Box<dyn Embedder> {
    match cfg.backend {
        EmbedderBackend::Hash => Box::new(HashEmbedder::new(cfg.dimension)),
        EmbedderBackend::Http => Box::new(HttpEmbedder::from_config(cfg)),
    }
}

// ============================================================================
// HASH
// ============================================================================

pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Hash each n-gram into the vector, then L2-normalize.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .collect();

        if words.is_empty() {
            return vector;
        }

        // Unigrams
        for word in &words {
            if word.chars().count() < 2 {
                continue;
            }
            hash_term_into(&mut vector, word, 1.0);
        }

        // Bigrams
        for pair in words.windows(2) {
            let bigram = format!("{}_{}", pair[0], pair[1]);
            hash_term_into(&mut vector, &bigram, 0.7);
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }

        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(crate::constants::EMBEDDING_DIM)
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, texts: &[String]) -> TopicsResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Hash a term into two signed positions of the vector.
fn hash_term_into(vector: &mut [f32], term: &str, weight: f32) {
    let mut hasher = Md5::new();
    hasher.update(term.as_bytes());
    let hash = hasher.finalize();

    // First 4 bytes: index, byte 4: sign
    let idx = u32::from_le_bytes([hash[0], hash[1], hash[2], hash[3]]) as usize % vector.len();
    let sign = if hash[4] & 1 == 0 { 1.0f32 } else { -1.0f32 };
    vector[idx] += sign * weight;

    let idx2 = u32::from_le_bytes([hash[5], hash[6], hash[7], hash[8]]) as usize % vector.len();
    let sign2 = if hash[9] & 1 == 0 { 1.0f32 } else { -1.0f32 };
    vector[idx2] += sign2 * weight * 0.5;
}

// ============================================================================
// HTTP
// ============================================================================

pub struct HttpEmbedder {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn from_config(cfg: &EmbedderConfig) -> Self {
        Self {
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: super::api_key(cfg.api_key_env.as_deref()),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }
}

impl Embedder for HttpEmbedder {
    fn embed(&self, texts: &[String]) -> TopicsResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!(endpoint = %self.endpoint, count = texts.len(), "Embedding request");
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut request = ureq::post(&self.endpoint).header("content-type", "application/json");
        if let Some(ref key) = self.api_key {
            request = request.header("Authorization", &format!("Bearer {}", key));
        }

        let mut response = request
            .config()
            .timeout_global(Some(self.timeout))
            .build()
            .send_json(&body)
            .map_err(|e| TopicsError::Provider(format!("Embedding request failed: {}", e)))?;

        let parsed: EmbeddingResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| TopicsError::Provider(format!("Invalid embedding response: {}", e)))?;

        let mut items = parsed.data;
        if items.len() != texts.len() {
            return Err(TopicsError::Provider(format!(
                "Embedding count mismatch: sent {}, got {}",
                texts.len(),
                items.len()
            )));
        }
        items.sort_by_key(|item| item.index);
        Ok(items.into_iter().map(|item| item.embedding).collect())
    }
}
