// 🧠 Embedding Providers - identity text → fixed-length vector
//
// OllamaEmbeddingProvider: blocking HTTP call with an enforced timeout
// HashingEmbeddingProvider: deterministic offline vectors (demos, tests)

use crate::config::EntitySenseConfig;
use crate::error::{EntitySenseError, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Send a prompt, get a vector (or fail). No retries.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, prompt: &str) -> Result<Vec<f32>>;
}

/// Canonical prompt: name, address, country joined by the configured delimiter.
/// Missing address/country become empty strings so positions stay stable.
pub fn build_prompt(
    name: &str,
    address: Option<&str>,
    country: Option<&str>,
    delimiter: &str,
) -> String {
    [name, address.unwrap_or(""), country.unwrap_or("")].join(delimiter)
}

/// Ask the provider for an embedding and reject anything unusable:
/// empty, wrong dimension, or containing NaN/inf.
pub fn embed_checked(
    provider: &dyn EmbeddingProvider,
    prompt: &str,
    expected_dimension: usize,
) -> Result<Vec<f32>> {
    let embedding = provider.embed(prompt)?;

    if embedding.is_empty() {
        return Err(no_embedding());
    }
    if embedding.len() != expected_dimension {
        return Err(EntitySenseError::EmbeddingUnavailable(format!(
            "provider returned {} dimensions, expected {}",
            embedding.len(),
            expected_dimension
        )));
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(EntitySenseError::EmbeddingUnavailable(
            "provider returned non-finite values".to_string(),
        ));
    }

    Ok(embedding)
}

fn no_embedding() -> EntitySenseError {
    EntitySenseError::EmbeddingUnavailable("provider returned no embedding".to_string())
}

// ============================================================================
// OLLAMA (HTTP) PROVIDER
// ============================================================================

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

impl EmbeddingResponse {
    /// `null`, absent, or empty embedding is a failure, never a zero vector
    fn into_vector(self) -> Result<Vec<f32>> {
        match self.embedding {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(no_embedding()),
        }
    }
}

pub struct OllamaEmbeddingProvider {
    client: Client,
    url: String,
    model: String,
}

impl OllamaEmbeddingProvider {
    pub fn new(config: &EntitySenseConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(OllamaEmbeddingProvider {
            client,
            url: config.embeddings_url(),
            model: config.model.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn embed(&self, prompt: &str) -> Result<Vec<f32>> {
        debug!(url = %self.url, model = %self.model, prompt_len = prompt.len(), "Requesting embedding");

        let response = self
            .client
            .post(&self.url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt,
            })
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(EntitySenseError::EmbeddingUnavailable(format!(
                "provider error {}: {}",
                status,
                truncate(&body, 320)
            )));
        }

        let body: EmbeddingResponse = response.json()?;
        body.into_vector()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

// ============================================================================
// HASHING (OFFLINE) PROVIDER
// ============================================================================

/// Bag of hashed words + character trigrams, L2-normalized.
/// Deterministic: the same prompt always yields the same vector.
pub struct HashingEmbeddingProvider {
    dimension: usize,
}

impl HashingEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        HashingEmbeddingProvider { dimension }
    }

    fn add_feature(&self, embedding: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        embedding[bucket] += sign * weight;
    }
}

impl EmbeddingProvider for HashingEmbeddingProvider {
    fn embed(&self, prompt: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.dimension];
        if self.dimension == 0 {
            return Ok(embedding);
        }

        let lower = prompt.to_lowercase();
        for word in lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            self.add_feature(&mut embedding, &format!("w:{}", word), 1.0);

            let padded: Vec<char> = format!("#{}#", word).chars().collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                self.add_feature(&mut embedding, &format!("g:{}", gram), 0.5);
            }
        }

        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut embedding {
                *val /= norm;
            }
        }

        Ok(embedding)
    }
}
