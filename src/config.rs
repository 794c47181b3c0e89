// ⚙️ Configuration - explicit value object passed to constructors
// Loaded from an optional TOML file, then overridden by ENTITYSENSE_* env vars

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PROVIDER_URL: &str = "http://localhost:11434";
pub const DEFAULT_EMBEDDINGS_PATH: &str = "/api/embeddings";
pub const DEFAULT_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_PROMPT_DELIMITER: &str = " ‖ ";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 0.3;
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitySenseConfig {
    /// Embedding service base URL
    pub provider_url: String,

    /// Path appended to `provider_url` for embedding requests
    pub embeddings_path: String,

    /// `model` field sent with every prompt
    pub model: String,

    /// Joins name, address and country into the prompt text
    pub prompt_delimiter: String,

    /// Per-call embedding timeout; the request is cancelled when it elapses
    pub timeout_secs: u64,

    /// Candidates strictly below this cosine distance are similarity matches.
    /// Lower = fewer false positives, more false negatives.
    pub distance_threshold: f64,

    /// Every embedding (stored or screened) must have exactly this length
    pub embedding_dimension: usize,

    /// SQLite watchlist database
    pub database_path: PathBuf,

    /// HTTP listen address for the API server
    pub bind_addr: String,
}

impl Default for EntitySenseConfig {
    fn default() -> Self {
        EntitySenseConfig {
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            embeddings_path: DEFAULT_EMBEDDINGS_PATH.to_string(),
            model: DEFAULT_MODEL.to_string(),
            prompt_delimiter: DEFAULT_PROMPT_DELIMITER.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            database_path: PathBuf::from("entitysense.db"),
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl EntitySenseConfig {
    /// Load from file (defaults when the file doesn't exist), apply env overrides, validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => Self::from_toml_file(p)?,
            _ => EntitySenseConfig::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config file {:?}", path))
    }

    /// Override fields from environment-style lookups
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ENTITYSENSE_PROVIDER_URL") {
            self.provider_url = url;
        }
        if let Some(model) = lookup("ENTITYSENSE_MODEL") {
            self.model = model;
        }
        if let Some(timeout) = lookup("ENTITYSENSE_TIMEOUT_SECS") {
            self.timeout_secs = timeout
                .parse()
                .with_context(|| format!("ENTITYSENSE_TIMEOUT_SECS is not a number: {}", timeout))?;
        }
        if let Some(threshold) = lookup("ENTITYSENSE_DISTANCE_THRESHOLD") {
            self.distance_threshold = threshold.parse().with_context(|| {
                format!("ENTITYSENSE_DISTANCE_THRESHOLD is not a number: {}", threshold)
            })?;
        }
        if let Some(dimension) = lookup("ENTITYSENSE_EMBEDDING_DIMENSION") {
            self.embedding_dimension = dimension.parse().with_context(|| {
                format!("ENTITYSENSE_EMBEDDING_DIMENSION is not a number: {}", dimension)
            })?;
        }
        if let Some(path) = lookup("ENTITYSENSE_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(addr) = lookup("ENTITYSENSE_BIND_ADDR") {
            self.bind_addr = addr;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider_url.trim().is_empty() {
            return Err(anyhow!("provider_url must not be blank"));
        }
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must not be blank"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be greater than 0"));
        }
        if self.embedding_dimension == 0 {
            return Err(anyhow!("embedding_dimension must be greater than 0"));
        }
        if !(self.distance_threshold > 0.0 && self.distance_threshold <= 2.0) {
            return Err(anyhow!(
                "distance_threshold must be in (0, 2], got {}",
                self.distance_threshold
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full embedding endpoint URL
    pub fn embeddings_url(&self) -> String {
        format!(
            "{}/{}",
            self.provider_url.trim_end_matches('/'),
            self.embeddings_path.trim_start_matches('/')
        )
    }
}
