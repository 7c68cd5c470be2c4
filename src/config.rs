//! Pipeline configuration: every tuned constant is overridable.
//!
//! Sections mirror the pipeline stages:
//!   - analysis: gates, periods, fetch retries
//!   - preprocessing / clustering / synthesis: stage heuristics
//!   - generator / embedder: model backends
//!   - gate, storage, logging: ambient concerns
//!
//! Loaded from `{config_dir}/chat-topics/config.toml`. A missing file yields
//! defaults; `MIN_MESSAGES`, `DEFAULT_PERIOD` and `MAX_PERIOD` environment
//! variables override the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::{TopicsError, TopicsResult};

// ============================================================================
// ANALYSIS (orchestrator gates)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Below this many fetched messages the run stops with `insufficient_data`.
    pub min_messages: usize,
    /// Below this many unique texts the run yields zero topics.
    pub min_unique_texts: usize,
    pub default_period: String,
    pub max_period: String,
    /// Identity checked by the admin gate (the bot account).
    pub principal_id: i64,
    /// Total fetch attempts when the transport keeps rate-limiting.
    pub max_fetch_attempts: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_messages: constants::MIN_MESSAGES,
            min_unique_texts: constants::MIN_UNIQUE_TEXTS,
            default_period: constants::DEFAULT_PERIOD.to_string(),
            max_period: constants::MAX_PERIOD.to_string(),
            principal_id: 0,
            max_fetch_attempts: constants::MAX_FETCH_ATTEMPTS,
        }
    }
}

// ============================================================================
// PREPROCESSING
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    pub min_chars: usize,
    pub min_words: usize,
    pub min_token_chars: usize,
    /// Jaccard similarity above which a text counts as a near-duplicate.
    pub dedup_threshold: f64,
    pub extra_stop_words: Vec<String>,
    /// Optional `form<TAB>lemma` dictionary for the morphological step.
    pub lemma_dictionary: Option<PathBuf>,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            min_chars: constants::MIN_TEXT_CHARS,
            min_words: constants::MIN_WORDS,
            min_token_chars: constants::MIN_TOKEN_CHARS,
            dedup_threshold: constants::DEDUP_THRESHOLD,
            extra_stop_words: vec![],
            lemma_dictionary: None,
        }
    }
}

// ============================================================================
// CLUSTERING
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClusteringMethod {
    /// HDBSCAN: density hierarchy, noise points excluded.
    #[default]
    Density,
    /// Seeded k-means with an auto-scaled k.
    Centroid,
}

impl ClusteringMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Density => "density",
            Self::Centroid => "centroid",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub method: ClusteringMethod,
    /// Upper bound for the auto-scaled HDBSCAN minimum cluster size.
    pub min_cluster_size: usize,
    pub min_samples: usize,
    /// Clusters smaller than this are dropped in post-processing.
    pub min_members: usize,
    pub max_keywords: usize,
    pub max_representatives: usize,
    pub standardize: bool,
    pub kmeans_seed: u64,
    pub kmeans_restarts: usize,
    pub kmeans_max_iterations: usize,
    pub kmeans_tolerance: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            method: ClusteringMethod::Density,
            min_cluster_size: constants::MIN_CLUSTER_SIZE_FLOOR,
            min_samples: constants::MIN_SAMPLES,
            min_members: constants::MIN_CLUSTER_MEMBERS,
            max_keywords: constants::CLUSTER_KEYWORDS,
            max_representatives: constants::CLUSTER_REPRESENTATIVES,
            standardize: true,
            kmeans_seed: constants::KMEANS_SEED,
            kmeans_restarts: constants::KMEANS_RESTARTS,
            kmeans_max_iterations: constants::KMEANS_MAX_ITERATIONS,
            kmeans_tolerance: constants::KMEANS_TOLERANCE,
        }
    }
}

// ============================================================================
// SYNTHESIS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub max_prompt_clusters: usize,
    pub prompt_keywords: usize,
    pub prompt_examples: usize,
    pub example_chars: usize,
    pub max_topics: usize,
    pub max_title_words: usize,
    pub min_summary_chars: usize,
    pub max_summary_chars: usize,
    pub fallback_clusters: usize,
    /// Language requested for titles and summaries.
    pub language: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_prompt_clusters: constants::PROMPT_MAX_CLUSTERS,
            prompt_keywords: constants::PROMPT_KEYWORDS,
            prompt_examples: constants::PROMPT_EXAMPLES,
            example_chars: constants::PROMPT_EXAMPLE_CHARS,
            max_topics: constants::MAX_TOPICS,
            max_title_words: constants::MAX_TITLE_WORDS,
            min_summary_chars: constants::MIN_SUMMARY_CHARS,
            max_summary_chars: constants::MAX_SUMMARY_CHARS,
            fallback_clusters: constants::FALLBACK_CLUSTERS,
            language: "English".to_string(),
        }
    }
}

// ============================================================================
// MODEL BACKENDS
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorBackend {
    /// OpenAI-compatible chat completions endpoint (llama.cpp, vLLM, Ollama...).
    #[default]
    Http,
    /// Local CLI receiving the prompt as its last argument.
    Command,
    /// Never call a model: keyword fallback topics only.
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub backend: GeneratorBackend,
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the bearer token, if any.
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
    pub max_new_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    /// Program + leading arguments for the `command` backend.
    pub command: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            backend: GeneratorBackend::Http,
            endpoint: "http://127.0.0.1:8080/v1/chat/completions".to_string(),
            model: "meta-llama/Llama-3.1-8B-Instruct".to_string(),
            api_key_env: None,
            timeout_secs: constants::LLM_TIMEOUT_SECS,
            max_new_tokens: constants::LLM_MAX_NEW_TOKENS,
            temperature: constants::LLM_TEMPERATURE,
            top_p: constants::LLM_TOP_P,
            command: vec!["llm".to_string(), "-p".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderBackend {
    /// Offline MD5 feature-hashing vectors.
    #[default]
    Hash,
    /// OpenAI-compatible `/embeddings` endpoint.
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub backend: EmbedderBackend,
    pub dimension: usize,
    pub endpoint: String,
    pub model: String,
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            backend: EmbedderBackend::Hash,
            dimension: constants::EMBEDDING_DIM,
            endpoint: "http://127.0.0.1:8081/v1/embeddings".to_string(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            api_key_env: None,
            timeout_secs: constants::EMBEDDING_TIMEOUT_SECS,
        }
    }
}

// ============================================================================
// GATE / STORAGE / LOGGING
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    #[default]
    AllowAll,
    AllowList,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GateConfig {
    pub mode: GateMode,
    pub privileged_principals: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file holding both the message archive and the analysis cache.
    pub database: PathBuf,
    pub cache_retention_days: u32,
    pub message_retention_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: crate::storage::path_utils::database_path(),
            cache_retention_days: constants::CACHE_RETENTION_DAYS,
            message_retention_days: constants::MESSAGE_RETENTION_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

// ============================================================================
// ROOT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub preprocessing: PreprocessingConfig,
    pub clustering: ClusteringConfig,
    pub synthesis: SynthesisConfig,
    pub generator: GeneratorConfig,
    pub embedder: EmbedderConfig,
    pub gate: GateConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from an explicit path, or from the default location.
    /// A missing default file is not an error; a missing explicit one is.
    pub fn load(path: Option<&Path>) -> TopicsResult<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = crate::storage::path_utils::config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    tracing::debug!(path = %default_path.display(), "No config file, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> TopicsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TopicsError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> TopicsResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> TopicsResult<String> {
        toml::to_string_pretty(self).map_err(|e| TopicsError::Config(e.to_string()))
    }

    /// Apply `MIN_MESSAGES`, `DEFAULT_PERIOD`, `MAX_PERIOD` overrides.
    /// Unparsable numeric values are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MIN_MESSAGES") {
            match v.trim().parse::<usize>() {
                Ok(n) => self.analysis.min_messages = n,
                Err(_) => tracing::warn!(value = %v, "Ignoring invalid MIN_MESSAGES"),
            }
        }
        if let Some(v) = lookup("DEFAULT_PERIOD") {
            self.analysis.default_period = v;
        }
        if let Some(v) = lookup("MAX_PERIOD") {
            self.analysis.max_period = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_policy() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.analysis.min_messages, 50);
        assert_eq!(cfg.analysis.default_period, "7d");
        assert_eq!(cfg.analysis.max_period, "14d");
        assert_eq!(cfg.preprocessing.min_chars, 10);
        assert!((cfg.preprocessing.dedup_threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(cfg.clustering.method, ClusteringMethod::Density);
        assert_eq!(cfg.clustering.min_cluster_size, 8);
        assert_eq!(cfg.synthesis.max_topics, 7);
        assert_eq!(cfg.synthesis.max_summary_chars, 199);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
[analysis]
min_messages = 20

[clustering]
method = "centroid"

[generator]
backend = "disabled"
"#,
        )
        .unwrap();
        assert_eq!(cfg.analysis.min_messages, 20);
        assert_eq!(cfg.analysis.max_period, "14d");
        assert_eq!(cfg.clustering.method, ClusteringMethod::Centroid);
        assert_eq!(cfg.clustering.min_samples, 2);
        assert_eq!(cfg.generator.backend, GeneratorBackend::Disabled);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(AppConfig::from_toml("[analysis\nmin_messages = ").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = AppConfig::default();
        cfg.apply_env_overrides(|key| match key {
            "MIN_MESSAGES" => Some("75".to_string()),
            "MAX_PERIOD" => Some("30d".to_string()),
            _ => None,
        });
        assert_eq!(cfg.analysis.min_messages, 75);
        assert_eq!(cfg.analysis.max_period, "30d");
        assert_eq!(cfg.analysis.default_period, "7d");
    }

    #[test]
    fn test_env_override_ignores_garbage() {
        let mut cfg = AppConfig::default();
        cfg.apply_env_overrides(|key| (key == "MIN_MESSAGES").then(|| "many".to_string()));
        assert_eq!(cfg.analysis.min_messages, 50);
    }

    #[test]
    fn test_toml_roundtrip() {
        let cfg = AppConfig::default();
        let text = cfg.to_toml().unwrap();
        let back = AppConfig::from_toml(&text).unwrap();
        assert_eq!(back.synthesis.language, cfg.synthesis.language);
        assert_eq!(back.storage.database, cfg.storage.database);
    }
}
