//! Configuration loading, validation, and management for Ledgerwise.
//!
//! Loads configuration from `~/.ledgerwise/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Vectorizer strategies understood by the knowledge crate.
pub const VECTORIZERS: &[&str] = &["hash", "provider"];

/// The root configuration structure.
///
/// Maps directly to `~/.ledgerwise/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default generation provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per generated answer
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Timeouts and retry policy for external calls
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Knowledge store and index settings
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Session store settings
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("generation", &self.generation)
            .field("knowledge", &self.knowledge)
            .field("sessions", &self.sessions)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Upper bound on every generation or embedding call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts for retryable failures (0 = fail on first error)
    #[serde(default)]
    pub max_retries: u32,

    /// Base delay for exponential backoff between attempts
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

fn default_timeout_secs() -> u64 {
    60
}
fn default_backoff_base_ms() -> u64 {
    500
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// JSON object of term → definition
    #[serde(default = "default_knowledge_file")]
    pub knowledge_file: PathBuf,

    /// Where the vector index is cached
    #[serde(default = "default_index_file")]
    pub index_file: PathBuf,

    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// How many terms are retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// "hash" (deterministic placeholder) or "provider" (hosted embeddings)
    #[serde(default = "default_vectorizer")]
    pub vectorizer: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_knowledge_file() -> PathBuf {
    PathBuf::from("financial_knowledge.json")
}
fn default_index_file() -> PathBuf {
    PathBuf::from("embeddings.json")
}
fn default_dimension() -> usize {
    128
}
fn default_top_k() -> usize {
    3
}
fn default_vectorizer() -> String {
    "hash".into()
}
fn default_embedding_model() -> String {
    "text-embedding-004".into()
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            knowledge_file: default_knowledge_file(),
            index_file: default_index_file(),
            dimension: default_dimension(),
            top_k: default_top_k(),
            vectorizer: default_vectorizer(),
            embedding_model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Live-session cap; exceeding it triggers eviction
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// How many of the oldest sessions one eviction pass removes
    #[serde(default = "default_evict_batch")]
    pub evict_batch: usize,

    /// Turns of history included in each prompt
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Keep the user's turn when the request fails instead of rolling it back
    #[serde(default)]
    pub retain_failed_turns: bool,
}

fn default_max_sessions() -> usize {
    1000
}
fn default_evict_batch() -> usize {
    100
}
fn default_history_window() -> usize {
    5
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            evict_batch: default_evict_batch(),
            history_window: default_history_window(),
            retain_failed_turns: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Allow any origin (browser front-ends served from elsewhere)
    #[serde(default = "default_true")]
    pub cors_allow_any: bool,
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_body_bytes() -> usize {
    64 * 1024
}
fn default_true() -> bool {
    true
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_body_bytes: default_max_body_bytes(),
            cors_allow_any: true,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.ledgerwise/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply environment overrides.
    ///
    /// API key lookup order:
    /// - `LEDGERWISE_API_KEY` (highest priority)
    /// - `GEMINI_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("LEDGERWISE_API_KEY")
                .ok()
                .or_else(|| std::env::var("GEMINI_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("LEDGERWISE_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("LEDGERWISE_MODEL") {
            if let Some(entry) = config.providers.get_mut(&config.default_provider) {
                entry.default_model = Some(model.clone());
            }
            config.default_model = model;
        }

        if let Ok(port) = std::env::var("LEDGERWISE_PORT") {
            config.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("LEDGERWISE_PORT is not a port: {port}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Model used for generation: the active provider's own `default_model`
    /// when its table sets one, otherwise the top-level `default_model`.
    pub fn generation_model(&self) -> &str {
        self.providers
            .get(&self.default_provider)
            .and_then(|p| p.default_model.as_deref())
            .unwrap_or(&self.default_model)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ledgerwise")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.knowledge.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.dimension must be > 0".into(),
            ));
        }

        if self.knowledge.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.top_k must be > 0".into(),
            ));
        }

        if !VECTORIZERS.contains(&self.knowledge.vectorizer.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "knowledge.vectorizer must be one of {:?}, got '{}'",
                VECTORIZERS, self.knowledge.vectorizer
            )));
        }

        if self.sessions.evict_batch == 0 || self.sessions.evict_batch > self.sessions.max_sessions
        {
            return Err(ConfigError::ValidationError(
                "sessions.evict_batch must be between 1 and sessions.max_sessions".into(),
            ));
        }

        if self.sessions.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "sessions.history_window must be > 0".into(),
            ));
        }

        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "generation.timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            generation: GenerationConfig::default(),
            knowledge: KnowledgeConfig::default(),
            sessions: SessionConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
