//! Configuration management for concept-rag
//!
//! TOML file with defaults, then environment overrides, then validation.
//! Location: ~/.concept-rag/config.toml unless a path is given.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::{CachePolicy, CorpusCache};
use crate::embedding::{gemini, Embedder, GeminiEmbedder, LocalEmbedder};
use crate::errors::{RagError, Result};
use crate::rag::{ContextConfig, PipelineConfig, RagPipeline, RetrievalConfig};
use crate::source::{
    DeploymentMode, DocumentResolver, EnvironmentSignals, FilesystemSource, RemoteSource,
    DEFAULT_BATCH_SIZE,
};
use crate::types::SearchOptions;
use crate::vector_db::{qdrant, AnnService, PineconeIndex, QdrantIndex, VectorStore};

/// Complete configuration for concept-rag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub cache: CacheConfig,
    pub vector: VectorConfig,
    pub embedding: EmbeddingConfig,
    pub context: ContextSettings,
}

/// Where documents come from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// `auto`, `embedded`, `local` or `remote`
    pub mode: String,
    /// Root for the local candidate paths
    pub base_dir: String,
    /// HTTP fallback in local mode
    pub dev_base_url: String,
    /// Production server, required in remote mode
    pub base_url: Option<String>,
    pub timeout_ms: u64,
    /// JSONL lines parsed per concurrent batch
    pub batch_size: usize,
}

/// TTLs in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub manifest_ttl_secs: u64,
    pub documents_ttl_secs: u64,
    /// Age after which a hit triggers a background refresh
    pub stale_after_secs: Option<u64>,
}

/// ANN backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// `auto`, `local`, `pinecone` or `qdrant`
    pub backend: String,
    pub pinecone_api_key: Option<String>,
    pub pinecone_index_host: Option<String>,
    pub pinecone_namespace: String,
    pub qdrant_url: Option<String>,
    pub qdrant_api_key: Option<String>,
    pub qdrant_collection: String,
    pub timeout_ms: u64,
}

/// Embedding provider selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `auto`, `gemini`, `local` or `none`
    pub provider: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    /// Hugging Face model id for the local provider
    pub local_model: String,
    pub timeout_ms: u64,
}

/// Search and context defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    pub max_length: usize,
    pub top_k: usize,
    pub vector_weight: f32,
    /// Embed the corpus on the first search
    pub auto_index: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: "auto".to_string(),
            base_dir: ".".to_string(),
            dev_base_url: "http://localhost:3000/rag".to_string(),
            base_url: None,
            timeout_ms: 10_000,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let policy = CachePolicy::default();
        Self {
            manifest_ttl_secs: policy.manifest_ttl.as_secs(),
            documents_ttl_secs: policy.documents_ttl.as_secs(),
            stale_after_secs: policy.stale_after.map(|d| d.as_secs()),
        }
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            backend: "auto".to_string(),
            pinecone_api_key: None,
            pinecone_index_host: None,
            pinecone_namespace: String::new(),
            qdrant_url: None,
            qdrant_api_key: None,
            qdrant_collection: qdrant::DEFAULT_COLLECTION.to_string(),
            timeout_ms: 15_000,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "auto".to_string(),
            gemini_api_key: None,
            gemini_model: gemini::DEFAULT_MODEL.to_string(),
            local_model: crate::embedding::engine::DEFAULT_MODEL_ID.to_string(),
            timeout_ms: 15_000,
        }
    }
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            max_length: ContextConfig::default().max_length,
            top_k: SearchOptions::default().top_k,
            vector_weight: RetrievalConfig::default().vector_weight,
            auto_index: true,
        }
    }
}

/// Resolved ANN backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorBackend {
    Local,
    Pinecone,
    Qdrant,
}

/// Resolved embedding provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    None,
    Gemini,
    Local,
}

impl Config {
    /// Load configuration from file (explicit or default location), apply
    /// environment overrides, then validate
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(config_path) => Self::load_from_file(&config_path)?,
            None => Self::load_default()?,
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without overrides
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RagError::ConfigError(format!("Failed to read config {}: {}", path.display(), e)))?;

        toml::from_str(&contents)
            .map_err(|e| RagError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Standard location if present, otherwise built-in defaults
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(config_path) if config_path.exists() => Self::load_from_file(&config_path),
            _ => Ok(Config::default()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".concept-rag").join("config.toml"))
    }

    /// Overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()));
    }

    /// Overrides from any key lookup
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup("RAG_DEPLOYMENT") {
            self.source.mode = mode;
        }
        if let Some(dir) = lookup("RAG_BASE_DIR") {
            self.source.base_dir = dir;
        }
        if let Some(url) = lookup("RAG_DEV_BASE_URL") {
            self.source.dev_base_url = url;
        }
        if let Some(url) = lookup("RAG_BASE_URL") {
            self.source.base_url = Some(url);
        }
        if let Some(key) = lookup("PINECONE_API_KEY") {
            self.vector.pinecone_api_key = Some(key);
        }
        if let Some(host) = lookup("PINECONE_INDEX_HOST") {
            self.vector.pinecone_index_host = Some(host);
        }
        if let Some(url) = lookup("QDRANT_URL") {
            self.vector.qdrant_url = Some(url);
        }
        if let Some(key) = lookup("QDRANT_API_KEY") {
            self.vector.qdrant_api_key = Some(key);
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.embedding.gemini_api_key = Some(key);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.source.mode.trim().to_lowercase() != "auto" {
            let mode: DeploymentMode = self.source.mode.parse()?;
            if mode == DeploymentMode::Remote && self.source.base_url.is_none() {
                return Err(RagError::ConfigError(
                    "remote mode requires source.base_url (or RAG_BASE_URL)".to_string(),
                ));
            }
        }

        if self.source.batch_size == 0 {
            return Err(RagError::ConfigError("batch_size must be greater than 0".to_string()));
        }

        if self.source.timeout_ms == 0 || self.vector.timeout_ms == 0 || self.embedding.timeout_ms == 0 {
            return Err(RagError::ConfigError("timeouts must be greater than 0".to_string()));
        }

        if self.cache.manifest_ttl_secs == 0 || self.cache.documents_ttl_secs == 0 {
            return Err(RagError::ConfigError("cache TTLs must be greater than 0".to_string()));
        }

        if self.context.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than 0".to_string()));
        }

        if self.context.vector_weight < 0.0 {
            return Err(RagError::ConfigError("vector_weight must not be negative".to_string()));
        }

        self.vector_backend()?;
        self.embedding_provider()?;
        Ok(())
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    pub fn base_dir(&self) -> PathBuf {
        Self::expand_path(&self.source.base_dir)
    }

    pub fn filesystem_source(&self) -> FilesystemSource {
        FilesystemSource::new(self.base_dir(), self.source.batch_size)
    }

    /// Configured mode, with `auto` resolved from the environment once
    pub fn deployment_mode(&self) -> Result<DeploymentMode> {
        if self.source.mode.trim().eq_ignore_ascii_case("auto") {
            let signals = EnvironmentSignals::collect(self.filesystem_source().has_local_corpus());
            let mode = signals.detect();
            info!(%mode, ?signals, "Detected deployment mode");
            return Ok(mode);
        }
        self.source.mode.parse()
    }

    /// `auto` picks Pinecone, then Qdrant, when their settings are present
    pub fn vector_backend(&self) -> Result<VectorBackend> {
        let v = &self.vector;
        let pinecone_ready = v.pinecone_api_key.is_some() && v.pinecone_index_host.is_some();
        match v.backend.trim().to_lowercase().as_str() {
            "auto" if pinecone_ready => Ok(VectorBackend::Pinecone),
            "auto" if v.qdrant_url.is_some() => Ok(VectorBackend::Qdrant),
            "auto" | "local" => Ok(VectorBackend::Local),
            "pinecone" if pinecone_ready => Ok(VectorBackend::Pinecone),
            "pinecone" => Err(RagError::ConfigError(
                "pinecone backend requires PINECONE_API_KEY and PINECONE_INDEX_HOST".to_string(),
            )),
            "qdrant" if v.qdrant_url.is_some() => Ok(VectorBackend::Qdrant),
            "qdrant" => Err(RagError::ConfigError("qdrant backend requires QDRANT_URL".to_string())),
            other => Err(RagError::ConfigError(format!("Invalid vector backend: {}", other))),
        }
    }

    /// `auto` picks Gemini when an API key is present; `local` opts into the
    /// on-device model
    pub fn embedding_provider(&self) -> Result<EmbeddingProvider> {
        let has_key = self.embedding.gemini_api_key.is_some();
        match self.embedding.provider.trim().to_lowercase().as_str() {
            "auto" if has_key => Ok(EmbeddingProvider::Gemini),
            "auto" | "none" => Ok(EmbeddingProvider::None),
            "gemini" if has_key => Ok(EmbeddingProvider::Gemini),
            "gemini" => Err(RagError::ConfigError("gemini provider requires GEMINI_API_KEY".to_string())),
            "local" => Ok(EmbeddingProvider::Local),
            other => Err(RagError::ConfigError(format!("Invalid embedding provider: {}", other))),
        }
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            manifest_ttl: Duration::from_secs(self.cache.manifest_ttl_secs),
            documents_ttl: Duration::from_secs(self.cache.documents_ttl_secs),
            stale_after: self.cache.stale_after_secs.map(Duration::from_secs),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            search: SearchOptions::top_k(self.context.top_k),
            retrieval: RetrievalConfig {
                vector_weight: self.context.vector_weight,
            },
            context: ContextConfig {
                max_length: self.context.max_length,
                ..Default::default()
            },
            auto_index: self.context.auto_index,
            ..Default::default()
        }
    }

    /// Resolver for the given mode over a shared cache
    pub fn resolver(&self, mode: DeploymentMode, cache: Arc<CorpusCache>) -> Result<DocumentResolver> {
        let base_url = match mode {
            DeploymentMode::Remote => self.source.base_url.clone().ok_or_else(|| {
                RagError::ConfigError("remote mode requires source.base_url".to_string())
            })?,
            _ => self.source.dev_base_url.clone(),
        };
        let remote = RemoteSource::new(
            base_url,
            Duration::from_millis(self.source.timeout_ms),
            self.source.batch_size,
        )?;
        Ok(DocumentResolver::new(mode, self.filesystem_source(), remote, cache))
    }

    pub fn embedder(&self) -> Result<Option<Arc<dyn Embedder>>> {
        let timeout = Duration::from_millis(self.embedding.timeout_ms);
        let embedder: Arc<dyn Embedder> = match self.embedding_provider()? {
            EmbeddingProvider::None => return Ok(None),
            EmbeddingProvider::Gemini => {
                let key = self.embedding.gemini_api_key.clone().unwrap_or_default();
                Arc::new(
                    GeminiEmbedder::new(key, timeout)?
                        .with_model(self.embedding.gemini_model.clone(), gemini::DEFAULT_DIMENSION),
                )
            }
            EmbeddingProvider::Local => Arc::new(LocalEmbedder::new(&self.embedding.local_model)?),
        };
        info!(embedder = embedder.name(), dimension = embedder.dimension(), "Embedding provider ready");
        Ok(Some(embedder))
    }

    /// Vector store for the configured backend. Without an embedder an
    /// external backend has nothing to store, so the store stays local.
    pub async fn vector_store(&self) -> Result<VectorStore> {
        let embedder = self.embedder()?;
        let backend = self.vector_backend()?;
        let Some(embedder) = embedder else {
            if backend != VectorBackend::Local {
                warn!(?backend, "No embedding provider, external vector backend disabled");
            }
            return Ok(VectorStore::local(None));
        };

        let v = &self.vector;
        let ann: Arc<dyn AnnService> = match backend {
            VectorBackend::Local => return Ok(VectorStore::local(Some(embedder))),
            VectorBackend::Pinecone => Arc::new(PineconeIndex::new(
                v.pinecone_index_host.clone().unwrap_or_default(),
                v.pinecone_api_key.clone().unwrap_or_default(),
                v.pinecone_namespace.clone(),
                Duration::from_millis(v.timeout_ms),
            )?),
            VectorBackend::Qdrant => Arc::new(
                QdrantIndex::connect(
                    v.qdrant_url.as_deref().unwrap_or_default(),
                    v.qdrant_api_key.clone(),
                    v.qdrant_collection.clone(),
                    embedder.dimension(),
                    Duration::from_millis(v.timeout_ms),
                )
                .await?,
            ),
        };
        Ok(VectorStore::external(embedder, ann))
    }

    /// Wire the whole pipeline: mode, cache, resolver and vector store
    pub async fn build_pipeline(&self, mode_override: Option<DeploymentMode>) -> Result<RagPipeline> {
        let mode = match mode_override {
            Some(mode) => mode,
            None => self.deployment_mode()?,
        };
        let cache = Arc::new(CorpusCache::new(self.cache_policy()));
        let resolver = self.resolver(mode, cache)?;
        let store = Arc::new(self.vector_store().await?);
        Ok(RagPipeline::with_config(resolver, store, self.pipeline_config()))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RagError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RagError::ConfigError(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| RagError::ConfigError(format!("Failed to write config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source.mode, "auto");
        assert_eq!(config.source.batch_size, 10);
        assert_eq!(config.cache.documents_ttl_secs, 300);
        assert_eq!(config.context.max_length, 4000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_with(env(&[
            ("RAG_DEPLOYMENT", "remote"),
            ("RAG_BASE_URL", "https://rag.example.com/rag"),
            ("GEMINI_API_KEY", "key"),
            ("QDRANT_URL", "http://localhost:6334"),
        ]));

        assert_eq!(config.source.mode, "remote");
        assert!(config.validate().is_ok());
        assert_eq!(config.deployment_mode().unwrap(), DeploymentMode::Remote);
        assert_eq!(config.embedding_provider().unwrap(), EmbeddingProvider::Gemini);
        assert_eq!(config.vector_backend().unwrap(), VectorBackend::Qdrant);
    }

    #[test]
    fn test_remote_requires_base_url() {
        let mut config = Config::default();
        config.source.mode = "remote".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::default();
        config.source.mode = "cloud".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.vector.backend = "pinecone".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.embedding.provider = "openai".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.source.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_auto_selection() {
        let mut config = Config::default();
        assert_eq!(config.vector_backend().unwrap(), VectorBackend::Local);
        assert_eq!(config.embedding_provider().unwrap(), EmbeddingProvider::None);

        config.vector.pinecone_api_key = Some("k".to_string());
        config.vector.pinecone_index_host = Some("idx.pinecone.io".to_string());
        config.vector.qdrant_url = Some("http://localhost:6334".to_string());
        assert_eq!(config.vector_backend().unwrap(), VectorBackend::Pinecone);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[source]\nmode = \"embedded\"\n\n[context]\nmax_length = 800\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.source.mode, "embedded");
        assert_eq!(config.source.dev_base_url, "http://localhost:3000/rag");
        assert_eq!(config.context.max_length, 800);
        assert_eq!(config.context.top_k, 10);
        assert_eq!(config.pipeline_config().context.max_length, 800);
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.source.mode = "local".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.source.mode, "local");
    }

    #[test]
    fn test_expand_path() {
        assert!(!Config::expand_path("~/.concept-rag").to_string_lossy().contains('~'));
        assert_eq!(Config::expand_path("/abs/path"), PathBuf::from("/abs/path"));
    }

    #[tokio::test]
    async fn test_build_embedded_pipeline() {
        let mut config = Config::default();
        config.source.mode = "embedded".to_string();
        let pipeline = config.build_pipeline(None).await.unwrap();
        assert_eq!(pipeline.mode(), DeploymentMode::Embedded);
        assert_eq!(pipeline.vector_stats().await.backend, "local");
    }
}
