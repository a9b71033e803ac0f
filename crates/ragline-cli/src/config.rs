//! Configuration management for the CLI.
//!
//! One TOML file holds the CLI's own `[providers]` and `[settings]`
//! sections next to the pipeline sections of [`RaglineConfig`]:
//!
//! ```toml
//! [providers]
//! ollama_url = "http://localhost:11434"
//! model = "llama3.2"
//!
//! [settings]
//! log_level = "info"
//!
//! [retrieval]
//! default_k = 4
//! ```

use crate::error::{CliError, Result};
use ragline_orchestrator::RaglineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Overrides the Ollama endpoint
pub const ENV_OLLAMA_URL: &str = "RAGLINE_OLLAMA_URL";
/// Overrides the generation model
pub const ENV_MODEL: &str = "RAGLINE_MODEL";
/// Overrides the index path
pub const ENV_INDEX: &str = "RAGLINE_INDEX";

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Model endpoints and the index location
    #[serde(default)]
    pub providers: Providers,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Pipeline sections
    #[serde(flatten)]
    pub pipeline: RaglineConfig,
}

/// How questions are embedded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Ollama embeddings endpoint
    Ollama,
    /// Local feature hashing, no server needed
    Hashing,
}

/// Model endpoints and the index location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Providers {
    /// Ollama API endpoint
    pub ollama_url: String,

    /// Generation model
    pub model: String,

    /// Judge model; the generation model when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judge_model: Option<String>,

    /// Sampling temperature for generation
    pub temperature: f32,

    /// Embedding backend
    pub embedder: EmbedderKind,

    /// Embedding model served by Ollama
    pub embedding_model: String,

    /// Length of every embedding vector
    pub embedding_dimension: usize,

    /// SQLite index file; `~/.ragline/index.db` when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_path: Option<PathBuf>,
}

impl Default for Providers {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            judge_model: None,
            temperature: 0.0,
            embedder: EmbedderKind::Ollama,
            embedding_model: "nomic-embed-text".to_string(),
            embedding_dimension: 768,
            index_path: None,
        }
    }
}

impl Providers {
    /// Model used to grade answers
    pub fn judge_model(&self) -> &str {
        self.judge_model.as_deref().unwrap_or(&self.model)
    }
}

/// Global CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Enable colored output
    pub color: bool,

    /// Default output format
    pub format: OutputFormat,

    /// REPL history size
    pub history_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            color: true,
            format: OutputFormat::Table,
            history_size: 1000,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (answer text only)
    Quiet,
}

impl Config {
    /// The `~/.ragline` directory.
    pub fn home() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".ragline"))
    }

    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        Ok(Self::home()?.join("config.toml"))
    }

    /// Load `path` (or the default file), falling back to defaults when it
    /// does not exist, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::path()?,
        };

        let mut config = if path.exists() {
            Self::from_toml(&fs::read_to_string(&path)?)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse and validate a configuration document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path` (or the default file).
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::path()?,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, self.to_toml()?)?;
        Ok(path)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Apply `RAGLINE_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_OLLAMA_URL) {
            self.providers.ollama_url = url;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.providers.model = model;
        }
        if let Some(index) = lookup(ENV_INDEX) {
            self.providers.index_path = Some(PathBuf::from(index));
        }
    }

    /// Check the provider section and every pipeline section.
    pub fn validate(&self) -> Result<()> {
        if self.providers.ollama_url.trim().is_empty() {
            return Err(CliError::Config("providers.ollama_url cannot be empty".into()));
        }
        if self.providers.embedding_dimension == 0 {
            return Err(CliError::Config(
                "providers.embedding_dimension must be greater than 0".into(),
            ));
        }
        self.pipeline.validate()?;
        Ok(())
    }

    /// Resolved index location.
    pub fn index_path(&self) -> Result<PathBuf> {
        match &self.providers.index_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::home()?.join("index.db")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.providers.judge_model(), "llama3.2");
        assert_eq!(config.settings.log_level, "info");
        assert_eq!(config.pipeline.retrieval.default_k, 4);
    }

    #[test]
    fn test_sections_share_one_document() {
        let config = Config::from_toml(
            r#"
            [providers]
            model = "mistral"
            judge_model = "llama3.1"
            embedder = "hashing"

            [settings]
            format = "json"

            [retrieval]
            default_k = 8

            [orchestrator]
            request_timeout_ms = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.providers.model, "mistral");
        assert_eq!(config.providers.judge_model(), "llama3.1");
        assert_eq!(config.providers.embedder, EmbedderKind::Hashing);
        assert_eq!(config.settings.format, OutputFormat::Json);
        assert_eq!(config.pipeline.retrieval.default_k, 8);
        assert_eq!(config.pipeline.orchestrator.request_timeout_ms, 1000);
        assert_eq!(config.pipeline.generation.timeout_ms, 30_000);
    }

    #[test]
    fn test_invalid_pipeline_section() {
        let result = Config::from_toml("[retrieval]\ndefault_k = 0");
        assert!(matches!(result, Err(CliError::Pipeline(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            ENV_OLLAMA_URL => Some("http://gpu-box:11434".to_string()),
            ENV_INDEX => Some("/data/index.db".to_string()),
            _ => None,
        });
        assert_eq!(config.providers.ollama_url, "http://gpu-box:11434");
        assert_eq!(config.providers.model, "llama3.2");
        assert_eq!(config.index_path().unwrap(), PathBuf::from("/data/index.db"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.providers.model = "phi3".to_string();
        config.pipeline.assembly.token_budget = 1500;
        config.save(Some(&path)).unwrap();

        let loaded = Config::from_toml(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, config);
    }
}
