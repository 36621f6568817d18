use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TulipConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub model: ModelConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier sent to the completion server.
    pub name: String,
    /// Base URL of the local OpenAI-compatible completion server.
    pub endpoint: String,
    /// Where the GGUF weights are fetched from by `tulip model download`.
    pub weights_url: String,
    pub cache_dir: String,
    /// Context window the server was started with; prompt and answer share it.
    pub context_size: u32,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Longest silence tolerated between reads from the server.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    /// How many recent entries feed a single insight.
    pub insight_entries: usize,
    /// How many recent entries feed the suggestions generator.
    pub suggestion_entries: usize,
}

impl Default for TulipConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            model: ModelConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_tulip_dir()
            .join("tulip.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        let cache_dir = default_tulip_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            name: "qwen3-0.6".into(),
            endpoint: "http://127.0.0.1:8080".into(),
            weights_url:
                "https://huggingface.co/Qwen/Qwen3-0.6B-GGUF/resolve/main/Qwen3-0.6B-Q8_0.gguf"
                    .into(),
            cache_dir,
            context_size: 2048,
            // Leaves room for a thinking block ahead of the visible answer.
            max_tokens: 2000,
            temperature: 0.7,
            request_timeout_secs: 300,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            insight_entries: 5,
            suggestion_entries: 3,
        }
    }
}

/// Returns `~/.tulip/`
pub fn default_tulip_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tulip")
}

/// Returns the default config file path: `~/.tulip/config.toml`
pub fn default_config_path() -> PathBuf {
    default_tulip_dir().join("config.toml")
}

impl TulipConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            TulipConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (TULIP_DB, TULIP_LOG_LEVEL, TULIP_MODEL_ENDPOINT, TULIP_MODEL_DIR).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TULIP_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("TULIP_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("TULIP_MODEL_ENDPOINT") {
            self.model.endpoint = val;
        }
        if let Ok(val) = std::env::var("TULIP_MODEL_DIR") {
            self.model.cache_dir = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

impl ModelConfig {
    /// File name of the weights inside `cache_dir`, taken from the URL.
    pub fn weights_file_name(&self) -> &str {
        self.weights_url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("model.gguf")
    }

    /// Full path of the downloaded weights, expanding `~` if needed.
    pub fn weights_path(&self) -> PathBuf {
        expand_tilde(&self.cache_dir).join(self.weights_file_name())
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
