//! Configuration management for Agri Advisor.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - The workspace config file (`.agri/config.yaml`)
//! - Environment variables (`AGRI_*`)
//! - Command-line flags
//!
//! The configuration is workspace-centric: the corpus snapshot, the dense
//! index and prompt overrides all live under `.agri/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers accepted for answer synthesis.
pub const KNOWN_LLM_PROVIDERS: [&str; 2] = ["ollama", "gemini"];

/// Providers accepted for dense embeddings.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["trigram", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .agri/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider ("ollama", "gemini")
    pub provider: String,

    /// Model identifier for the active provider
    pub model: String,

    /// Explicit API key (overrides provider env lookups)
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log format ("pretty" or "json")
    pub log_format: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Corpus and artifact locations
    pub corpus: CorpusConfig,

    /// Embedding provider used for the dense index
    pub embedding: EmbeddingSettings,

    /// Retrieval and grounding tuning
    pub retrieval: RetrievalConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    Gemini {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        match self {
            Self::Gemini { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Gemini { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint),
        }
    }
}

/// Where the corpus shards and the built artifacts live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusConfig {
    /// Directory holding `*.jsonl` shards (relative paths resolve against the workspace)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding `corpus.jsonl` and `index.sqlite`
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from(".agri/artifacts")
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            artifacts_dir: default_artifacts_dir(),
        }
    }
}

/// Embedding provider settings for building and querying the dense index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider name: "trigram" or "ollama"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding vector dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Documents embedded per provider call during index builds
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Provider endpoint (ollama only)
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_embedding_provider() -> String {
    "trigram".to_string()
}

fn default_embedding_model() -> String {
    "trigram-v1".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_batch_size() -> usize {
    256
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
            endpoint: None,
        }
    }
}

/// Retrieval and grounding parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalConfig {
    /// RRF smoothing constant
    pub rrf_k: u32,

    /// Candidates per ranker fed into fusion, and fused candidates sent to the reranker
    pub fusion_width: usize,

    /// Candidates kept after reranking
    pub rerank_keep: usize,

    /// Dense search fetches `fusion_width * dense_overfetch` before pool filtering
    pub dense_overfetch: usize,

    /// Maximum evidence snippets shown to the model
    pub evidence_cap: usize,

    /// Minimum evidence snippets required for a grounded answer
    pub evidence_min: usize,

    /// Ranked candidates inspected for the majority crop
    pub mismatch_window: usize,

    /// Maximum characters per evidence snippet
    pub snippet_max_chars: usize,

    /// Snippet prefix length used as the deduplication key
    pub dedup_prefix_chars: usize,

    /// Time budget for each ranking stage
    pub stage_timeout_secs: u64,

    /// Time budget for the synthesis call
    pub synthesis_timeout_secs: u64,

    /// Sampling temperature for synthesis
    pub temperature: f32,

    /// Maximum tokens generated by synthesis
    pub max_tokens: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_k: 60,
            fusion_width: 50,
            rerank_keep: 12,
            dense_overfetch: 2,
            evidence_cap: 6,
            evidence_min: 2,
            mismatch_window: 10,
            snippet_max_chars: 800,
            dedup_prefix_chars: 100,
            stage_timeout_secs: 10,
            synthesis_timeout_secs: 60,
            temperature: 0.3,
            max_tokens: 1024,
        }
    }
}

impl RetrievalConfig {
    fn validate(&self) -> AppResult<()> {
        if self.fusion_width == 0 || self.rerank_keep == 0 || self.evidence_cap == 0 {
            return Err(AppError::Config(
                "retrieval widths (fusionWidth, rerankKeep, evidenceCap) must be positive"
                    .to_string(),
            ));
        }
        if self.evidence_min > self.evidence_cap {
            return Err(AppError::Config(format!(
                "evidenceMin ({}) cannot exceed evidenceCap ({})",
                self.evidence_min, self.evidence_cap
            )));
        }
        if self.dense_overfetch == 0 {
            return Err(AppError::Config(
                "denseOverfetch must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    corpus: Option<CorpusConfig>,
    embedding: Option<EmbeddingSettings>,
    retrieval: Option<RetrievalConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    format: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            log_format: None,
            verbose: false,
            no_color: false,
            llm: None,
            corpus: CorpusConfig::default(),
            embedding: EmbeddingSettings::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and environment variables.
    ///
    /// Environment variables:
    /// - `AGRI_WORKSPACE`: Override workspace path
    /// - `AGRI_CONFIG`: Path to config file
    /// - `AGRI_PROVIDER`: LLM provider
    /// - `AGRI_MODEL`: Model identifier
    /// - `AGRI_API_KEY`: API key
    /// - `AGRI_DATA_DIR`: Corpus shard directory
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use agri_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("AGRI_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("AGRI_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.workspace.join(".agri/config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("AGRI_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("AGRI_MODEL") {
            config.model = model;
        }

        if let Ok(data_dir) = std::env::var("AGRI_DATA_DIR") {
            config.corpus.data_dir = PathBuf::from(data_dir);
        }

        config.api_key = std::env::var("AGRI_API_KEY").ok();
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(format) = logging.format {
                result.log_format = Some(format);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }
            result.llm = Some(llm);
        }

        if let Some(corpus) = config_file.corpus {
            result.corpus = corpus;
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        log_format: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if let Some(log_format) = log_format {
            self.log_format = Some(log_format);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .agri directory.
    pub fn agri_dir(&self) -> PathBuf {
        self.workspace.join(".agri")
    }

    /// Ensure the .agri directory exists.
    pub fn ensure_agri_dir(&self) -> AppResult<()> {
        let agri_dir = self.agri_dir();
        if !agri_dir.exists() {
            std::fs::create_dir_all(&agri_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .agri directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Directory holding the corpus shards.
    pub fn data_dir(&self) -> PathBuf {
        self.resolve(&self.corpus.data_dir)
    }

    /// Directory holding the built snapshot and index.
    pub fn artifacts_dir(&self) -> PathBuf {
        self.resolve(&self.corpus.artifacts_dir)
    }

    /// Merged corpus snapshot written by the index builder.
    pub fn snapshot_path(&self) -> PathBuf {
        self.artifacts_dir().join("corpus.jsonl")
    }

    /// SQLite dense index written by the index builder.
    pub fn index_path(&self) -> PathBuf {
        self.artifacts_dir().join("index.sqlite")
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Get a provider configuration by name.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Endpoint configured for a provider, if any.
    pub fn provider_endpoint(&self, provider: &str) -> Option<String> {
        self.get_provider_config(provider)
            .and_then(|pc| pc.endpoint().map(str::to_string))
    }

    /// Resolve the API key for a provider.
    ///
    /// Order: explicit `AGRI_API_KEY`, the provider's `apiKeyEnv`, then
    /// `GEMINI_API_KEY` / `GOOGLE_API_KEY` for gemini.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        if let Some(ProviderConfig::Gemini { api_key_env, .. }) = self.get_provider_config(provider)
        {
            if let Ok(key) = std::env::var(&api_key_env) {
                return Some(key);
            }
        }

        if provider == "gemini" {
            return std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("GOOGLE_API_KEY"))
                .ok();
        }

        None
    }

    /// Validate the configuration before serving queries.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.as_str();
        if !KNOWN_LLM_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        if provider == "gemini" && self.resolve_api_key(provider).is_none() {
            return Err(AppError::Config(
                "Gemini provider requires an API key (GEMINI_API_KEY, GOOGLE_API_KEY or apiKeyEnv)"
                    .to_string(),
            ));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be positive".to_string(),
            ));
        }

        self.retrieval.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.retrieval.rrf_k, 60);
        assert_eq!(config.retrieval.evidence_min, 2);
        assert_eq!(config.embedding.provider, "trigram");
        assert!(!config.verbose);
    }

    #[test]
    fn test_artifact_paths() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/agri");
        assert_eq!(
            config.snapshot_path(),
            PathBuf::from("/srv/agri/.agri/artifacts/corpus.jsonl")
        );
        assert_eq!(config.data_dir(), PathBuf::from("/srv/agri/data"));

        config.corpus.data_dir = PathBuf::from("/mnt/shards");
        assert_eq!(config.data_dir(), PathBuf::from("/mnt/shards"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("gemini".to_string()),
            Some("gemini-2.5-flash-lite".to_string()),
            None,
            Some("json".to_string()),
            true,
            false,
        );

        assert_eq!(overridden.provider, "gemini");
        assert_eq!(overridden.model, "gemini-2.5-flash-lite");
        assert_eq!(overridden.log_format.as_deref(), Some("json"));
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  activeProvider: gemini
  providers:
    gemini:
      apiKeyEnv: MY_GEMINI_KEY
      model: gemini-2.5-flash-lite
    ollama:
      endpoint: http://localhost:11434
      model: llama3.2
retrieval:
  rrfK: 30
  evidenceCap: 4
logging:
  level: debug
  color: false
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.provider, "gemini");
        assert_eq!(merged.model, "gemini-2.5-flash-lite");
        assert_eq!(merged.retrieval.rrf_k, 30);
        assert_eq!(merged.retrieval.evidence_cap, 4);
        // Unspecified retrieval keys keep their defaults
        assert_eq!(merged.retrieval.fusion_width, 50);
        assert!(merged.no_color);
        assert!(matches!(
            merged.get_provider_config("ollama"),
            Some(ProviderConfig::Ollama { .. })
        ));
        assert_eq!(
            merged.provider_endpoint("ollama").as_deref(),
            Some("http://localhost:11434")
        );
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inconsistent_evidence_bounds() {
        let mut config = AppConfig::default();
        config.retrieval.evidence_min = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let mut config = AppConfig::default();
        config.api_key = Some("explicit".to_string());
        assert_eq!(config.resolve_api_key("gemini").as_deref(), Some("explicit"));
    }
}
