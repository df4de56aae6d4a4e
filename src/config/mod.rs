//! Configuration management for rihla
//!
//! Handles loading and validating configuration from a TOML file, with every
//! default overridable through the environment.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection and pooling
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chat completions configuration
    #[serde(default)]
    pub chat: ChatConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            embedding: EmbeddingConfig::default(),
            chat: ChatConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Minimum pooled connections
    #[serde(default = "default_pool_min_connections")]
    pub min_connections: u32,

    /// Maximum pooled connections
    #[serde(default = "default_pool_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            min_connections: default_pool_min_connections(),
            max_connections: default_pool_max_connections(),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Primary model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Secondary model tried when the primary fails to load
    #[serde(default = "default_embedding_fallback_model")]
    pub fallback_model: String,

    /// Embedding dimension (must match the store's vector column)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            fallback_model: default_embedding_fallback_model(),
            dimension: default_embedding_dimension(),
        }
    }
}

/// Chat completions configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// OpenAI-compatible chat completions endpoint
    #[serde(default = "default_chat_api_url")]
    pub api_url: String,

    /// Model identifier sent with each request
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Bearer token; empty means unconfigured (fallback responder only)
    #[serde(default = "default_chat_api_key", skip_serializing)]
    pub api_key: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_chat_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature
    #[serde(default = "default_chat_temperature")]
    pub temperature: f32,

    /// Completion token budget
    #[serde(default = "default_chat_max_tokens")]
    pub max_tokens: u32,

    /// Recent messages handed to the model per turn
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Default number of context chunks retrieved per query
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,

    /// Rewritten search queries longer than this are discarded
    #[serde(default = "default_rewrite_max_chars")]
    pub rewrite_max_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_url: default_chat_api_url(),
            model: default_chat_model(),
            api_key: default_chat_api_key(),
            timeout_secs: default_chat_timeout_secs(),
            temperature: default_chat_temperature(),
            max_tokens: default_chat_max_tokens(),
            history_window: default_history_window(),
            retrieval_k: default_retrieval_k(),
            rewrite_max_chars: default_rewrite_max_chars(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, e.g. 0.0.0.0:8000
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Config {
    /// Default base directory (~/.config/rihla)
    pub fn default_base_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rihla")
    }

    /// Default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Load configuration from a TOML file, falling back to defaults (and
    /// therefore the environment) when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(Error::Config("database.url must not be empty".to_string()));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(Error::Config(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::Config(
                "embedding.dimension must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// True when a chat completions key is configured
    pub fn chat_configured(&self) -> bool {
        !self.chat.api_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chat.retrieval_k, 5);
        assert_eq!(config.chat.history_window, 10);
        assert_eq!(config.chat.rewrite_max_chars, 200);
        assert_eq!(config.embedding.dimension, 768);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.database.min_connections, 2);
        assert_eq!(config.database.max_connections, 20);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[chat]\nmodel = \"llama-3.1-8b-instant\"").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.chat.model, "llama-3.1-8b-instant");
        assert_eq!(config.chat.timeout_secs, 30);
    }

    #[test]
    fn test_pool_bounds_validated() {
        let mut config = Config::default();
        config.database.min_connections = 50;
        config.database.max_connections = 10;
        assert!(config.validate().is_err());
    }
}
