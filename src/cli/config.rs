//! Configuration management for ragterm
//!
//! Provides TOML-based configuration with defaults, environment overrides
//! and validation.
//! Location: ~/.ragterm/config.toml

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Args;
use crate::embedding::DEFAULT_MODEL_ID;
use crate::errors::{RagError, Result};
use crate::ingest::DEFAULT_CHUNK_SIZE;
use crate::rag::retrieval::DEFAULT_TOP_K;
use crate::streaming::{ResponseMode, DEFAULT_API_KEY, DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Environment variable overrides
pub const ENV_DOCS: &str = "RAGTERM_DOCS";
pub const ENV_EMBED_MODEL: &str = "RAGTERM_EMBED_MODEL";
pub const ENV_BASE_URL: &str = "RAGTERM_BASE_URL";
pub const ENV_API_KEY: &str = "RAGTERM_API_KEY";
pub const ENV_MODEL: &str = "RAGTERM_MODEL";

/// Complete configuration for ragterm
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub documents: DocumentsConfig,
    pub embedding: EmbeddingConfig,
    pub completion: CompletionConfig,
    pub retrieval: RetrievalConfig,
    pub cache: CacheConfig,
}

/// Document folder and chunking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    pub folder: PathBuf,
    pub chunk_size: usize,
}

/// Embedding model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// HuggingFace model id or a local model directory
    pub model: String,
    /// Texts per model invocation during ingestion
    pub batch_size: usize,
}

/// Completion service connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub stream: bool,
    pub timeout_secs: u64,
}

/// Retrieval parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

/// Embedding cache location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("documents"),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL_ID.to_string(),
            batch_size: 16,
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            model: DEFAULT_MODEL.to_string(),
            stream: true,
            timeout_secs: 120,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RagError::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| RagError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".ragterm").join("config.toml"))
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
    }

    /// Apply overrides from any key lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(folder) = lookup(ENV_DOCS) {
            self.documents.folder = PathBuf::from(folder);
        }
        if let Some(model) = lookup(ENV_EMBED_MODEL) {
            self.embedding.model = model;
        }
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.completion.base_url = base_url;
        }
        if let Some(api_key) = lookup(ENV_API_KEY) {
            self.completion.api_key = api_key;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.completion.model = model;
        }
    }

    /// Apply command-line overrides
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(docs) = &args.docs {
            self.documents.folder = docs.clone();
        }
        if let Some(top_k) = args.top_k {
            self.retrieval.top_k = top_k;
        }
        if let Some(chunk_size) = args.chunk_size {
            self.documents.chunk_size = chunk_size;
        }
        if let Some(model) = &args.model {
            self.completion.model = model.clone();
        }
        if let Some(base_url) = &args.base_url {
            self.completion.base_url = base_url.clone();
        }
        if args.no_stream {
            self.completion.stream = false;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.documents.chunk_size == 0 {
            return Err(RagError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than 0".to_string()));
        }

        if self.embedding.batch_size == 0 {
            return Err(RagError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.embedding.model.trim().is_empty() {
            return Err(RagError::Config("embedding model must be set".to_string()));
        }

        if self.completion.base_url.trim().is_empty() {
            return Err(RagError::Config("base_url must be set".to_string()));
        }

        Ok(())
    }

    /// Chunk size as a non-zero window
    pub fn chunk_size(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.documents.chunk_size)
            .ok_or_else(|| RagError::Config("chunk_size must be greater than 0".to_string()))
    }

    pub fn response_mode(&self) -> ResponseMode {
        ResponseMode::from_stream_flag(self.completion.stream)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.completion.timeout_secs)
    }

    /// Render as TOML with the API key masked
    pub fn to_display_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if !shown.completion.api_key.is_empty() {
            shown.completion.api_key = "********".to_string();
        }
        toml::to_string_pretty(&shown)
            .map_err(|e| RagError::Config(format!("Failed to serialize config: {}", e)))
    }
}
