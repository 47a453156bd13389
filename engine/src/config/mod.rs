//! Configuration management
//!
//! This module handles loading, validation, and management of the Kisum configuration.
//! Configuration is stored in TOML format at ~/.kisum/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: log level
//! - **llm**: provider selection and per-provider model settings
//! - **pipeline**: chunking tiers, retrieval depth, worker pool bounds, call timeout,
//!   and an optional section plan override
//!
//! API keys are never stored here; see [`crate::secrets`].
//!
//! # Examples
//!
//! ```no_run
//! use kisum_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Provider: {}", config.llm.default_provider);
//! println!("Chunk tiers: {:?}", config.pipeline.chunk_size_tiers);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Providers that can back the pipeline
pub const VALID_PROVIDERS: [&str; 2] = ["openai", "ollama"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Summary pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Provider used for embeddings, retrieval answers and synthesis (openai, ollama)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// OpenAI provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            openai: OpenAIConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for OpenAI API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Chat model name
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Embedding model name
    #[serde(default = "default_openai_embedding_model")]
    pub embedding_model: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Nucleus sampling mass
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    // Note: API key comes from OPENAI_API_KEY or the OS keychain, not from config
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Chat model name
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Embedding model name
    #[serde(default = "default_ollama_embedding_model")]
    pub embedding_model: String,
}

/// Summary pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Hierarchical chunk sizes in tokens, coarsest first
    #[serde(default = "default_chunk_size_tiers")]
    pub chunk_size_tiers: Vec<usize>,

    /// Token overlap between neighbouring chunks of the same tier
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Candidates taken from the vector index per question
    #[serde(default = "default_similarity_top_k")]
    pub similarity_top_k: usize,

    /// Candidates kept after LLM rerank
    #[serde(default = "default_rerank_top_n")]
    pub rerank_top_n: usize,

    /// Texts per embedding request
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,

    /// Cap on concurrently running sections (0 = one worker per section)
    #[serde(default)]
    pub max_section_workers: usize,

    /// Concurrent context-gathering questions per section
    #[serde(default = "default_max_subquery_workers")]
    pub max_subquery_workers: usize,

    /// Per-call timeout for retrieval and synthesis calls
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Section plan file replacing the built-in Key Information plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_path: Option<PathBuf>,
}

impl PipelineConfig {
    /// Per-call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size_tiers: default_chunk_size_tiers(),
            chunk_overlap: default_chunk_overlap(),
            similarity_top_k: default_similarity_top_k(),
            rerank_top_n: default_rerank_top_n(),
            embed_batch_size: default_embed_batch_size(),
            max_section_workers: 0,
            max_subquery_workers: default_max_subquery_workers(),
            call_timeout_secs: default_call_timeout_secs(),
            plan_path: None,
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4-0125-preview".to_string()
}

fn default_openai_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_top_p() -> f32 {
    0.1
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_ollama_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_chunk_size_tiers() -> Vec<usize> {
    vec![512, 256, 128]
}

fn default_chunk_overlap() -> usize {
    20
}

fn default_similarity_top_k() -> usize {
    8
}

fn default_rerank_top_n() -> usize {
    4
}

fn default_embed_batch_size() -> usize {
    64
}

fn default_max_subquery_workers() -> usize {
    8
}

fn default_call_timeout_secs() -> u64 {
    180
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            embedding_model: default_openai_embedding_model(),
            temperature: 0.0,
            top_p: default_top_p(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
            embedding_model: default_ollama_embedding_model(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.kisum/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if the file cannot be read, parsed, or
    /// fails validation.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default_config();
        config.validate_and_process()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Wrote default configuration to {}", path.display());

        Ok(config)
    }

    /// Get the default configuration file path (~/.kisum/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".kisum").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LLMConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }

    /// Validate and process configuration
    ///
    /// Checks value ranges and expands `~` in the plan path.
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if !VALID_PROVIDERS.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                VALID_PROVIDERS.join(", ")
            )));
        }

        let openai = &self.llm.openai;
        if !(0.0..=2.0).contains(&openai.temperature) {
            return Err(EngineError::Config(
                "openai.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        if openai.top_p <= 0.0 || openai.top_p > 1.0 {
            return Err(EngineError::Config(
                "openai.top_p must be greater than 0.0 and at most 1.0".to_string(),
            ));
        }

        let pipeline = &self.pipeline;
        if pipeline.chunk_size_tiers.is_empty() {
            return Err(EngineError::Config(
                "chunk_size_tiers must contain at least one size".to_string(),
            ));
        }
        if pipeline.chunk_size_tiers.contains(&0) {
            return Err(EngineError::Config(
                "chunk_size_tiers must not contain 0".to_string(),
            ));
        }
        if pipeline.chunk_size_tiers.windows(2).any(|w| w[0] <= w[1]) {
            return Err(EngineError::Config(
                "chunk_size_tiers must be strictly decreasing (coarsest first)".to_string(),
            ));
        }
        if pipeline.similarity_top_k == 0 {
            return Err(EngineError::Config(
                "similarity_top_k must be at least 1".to_string(),
            ));
        }
        if pipeline.rerank_top_n == 0 || pipeline.rerank_top_n > pipeline.similarity_top_k {
            return Err(EngineError::Config(format!(
                "rerank_top_n must be between 1 and similarity_top_k ({})",
                pipeline.similarity_top_k
            )));
        }
        if pipeline.embed_batch_size == 0 {
            return Err(EngineError::Config(
                "embed_batch_size must be at least 1".to_string(),
            ));
        }
        if pipeline.max_subquery_workers == 0 {
            return Err(EngineError::Config(
                "max_subquery_workers must be at least 1".to_string(),
            ));
        }
        if pipeline.call_timeout_secs == 0 {
            return Err(EngineError::Config(
                "call_timeout_secs must be at least 1".to_string(),
            ));
        }

        if let Some(plan_path) = &self.pipeline.plan_path {
            self.pipeline.plan_path = Some(expand_path(plan_path)?);
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
pub fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.default_provider, "openai");
        assert_eq!(config.llm.openai.embedding_model, "text-embedding-3-large");
        assert_eq!(config.pipeline.chunk_size_tiers, vec![512, 256, 128]);
        assert_eq!(config.pipeline.similarity_top_k, 8);
        assert_eq!(config.pipeline.rerank_top_n, 4);
        assert!(config.pipeline.plan_path.is_none());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
[llm]
default_provider = "ollama"
"#,
        )
        .unwrap();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.pipeline.call_timeout(), Duration::from_secs(180));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();

        assert_eq!(config.llm.default_provider, "openai");
        assert_eq!(config.llm.openai.model, "gpt-4-0125-preview");
        assert_eq!(config.pipeline.chunk_size_tiers, vec![512, 256, 128]);
    }

    #[test]
    fn test_pipeline_only_config_keeps_llm_defaults() {
        let config = Config::from_toml_str("[pipeline]\nmax_section_workers = 3\n").unwrap();

        assert_eq!(config.llm.default_provider, "openai");
        assert_eq!(config.llm.ollama.model, "llama3.1:8b");
        assert_eq!(config.pipeline.max_section_workers, 3);
    }

    #[test]
    fn test_invalid_log_level_reaches_validation() {
        let err = Config::from_toml_str("[core]\nlog_level = \"loud\"\n").unwrap_err();

        assert!(err.to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = Config::from_toml_str(
            r#"
[llm]
default_provider = "gemini"
"#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("Invalid default provider"));
    }

    #[test]
    fn test_rejects_increasing_chunk_tiers() {
        let err = Config::from_toml_str(
            r#"
[llm]
default_provider = "openai"

[pipeline]
chunk_size_tiers = [128, 256]
"#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("strictly decreasing"));
    }

    #[test]
    fn test_rejects_rerank_larger_than_top_k() {
        let err = Config::from_toml_str(
            r#"
[llm]
default_provider = "openai"

[pipeline]
similarity_top_k = 3
rerank_top_n = 5
"#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("rerank_top_n"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/plans/custom.toml");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("plans/custom.toml"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(
            config.llm.default_provider,
            deserialized.llm.default_provider
        );
        assert_eq!(
            config.pipeline.chunk_size_tiers,
            deserialized.pipeline.chunk_size_tiers
        );
    }
}
