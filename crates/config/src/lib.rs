//! Configuration loading, validation, and management for innkeep.
//!
//! Loads configuration from `~/.innkeep/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.innkeep/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// sqlx connection URL for the SQLite database
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Language model settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Host Tools (booking platform) API settings
    #[serde(default)]
    pub hosttools: HostToolsConfig,

    /// Template scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Auto-reply graduation settings (bookkeeping only)
    #[serde(default)]
    pub auto_reply: AutoReplyConfig,
}

fn default_database_url() -> String {
    "sqlite://innkeep.db".into()
}
fn default_true() -> bool {
    true
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Endpoint preset: "gemini", "openai", "openrouter", "ollama"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override the preset's base URL (any OpenAI-compatible endpoint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Replace the built-in host persona entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_llm_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_temperature() -> f32 {
    0.4
}
fn default_max_tokens() -> u32 {
    1024
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            api_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt_override: None,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt_override", &self.system_prompt_override.is_some())
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct HostToolsConfig {
    #[serde(default = "default_hosttools_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_hosttools_url() -> String {
    "https://app.hosttools.com/api".into()
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for HostToolsConfig {
    fn default() -> Self {
        Self {
            api_url: default_hosttools_url(),
            auth_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for HostToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostToolsConfig")
            .field("api_url", &self.api_url)
            .field("auth_token", &redact(&self.auth_token))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Grace period before the first scan after startup
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,

    /// Offset of the property's local time from UTC, used for "today" and
    /// the send-hour gate
    #[serde(default)]
    pub utc_offset_hours: i32,
}

fn default_interval_secs() -> u64 {
    60
}
fn default_startup_delay_secs() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            startup_delay_secs: default_startup_delay_secs(),
            utc_offset_hours: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoReplyConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Minimum draft confidence before a reply could be auto-sent
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

fn default_confidence_threshold() -> f32 {
    0.95
}

impl Default for AutoReplyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.innkeep/config.toml).
    ///
    /// Environment variables override the file:
    /// - `INNKEEP_DATABASE_URL`
    /// - `INNKEEP_LLM_API_KEY`, then `GEMINI_API_KEY`, then `OPENAI_API_KEY`
    /// - `INNKEEP_LLM_MODEL`
    /// - `HOSTTOOLS_AUTH_TOKEN`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
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

    /// Apply environment overrides, reading variables through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("INNKEEP_DATABASE_URL") {
            self.database_url = url;
        }

        if let Some(key) = lookup("INNKEEP_LLM_API_KEY")
            .or_else(|| lookup("GEMINI_API_KEY"))
            .or_else(|| lookup("OPENAI_API_KEY"))
        {
            self.llm.api_key = Some(key);
        }

        if let Some(model) = lookup("INNKEEP_LLM_MODEL") {
            self.llm.model = model;
        }

        if let Some(token) = lookup("HOSTTOOLS_AUTH_TOKEN") {
            self.hosttools.auth_token = Some(token);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".innkeep")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "llm.max_tokens must be > 0".into(),
            ));
        }

        if self.scheduler.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler.interval_secs must be > 0".into(),
            ));
        }

        if !(-12..=14).contains(&self.scheduler.utc_offset_hours) {
            return Err(ConfigError::ValidationError(
                "scheduler.utc_offset_hours must be between -12 and 14".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.auto_reply.confidence_threshold) {
            return Err(ConfigError::ValidationError(
                "auto_reply.confidence_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an LLM API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.llm.api_key.is_some()
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
            database_url: default_database_url(),
            llm: LlmConfig::default(),
            hosttools: HostToolsConfig::default(),
            scheduler: SchedulerConfig::default(),
            auto_reply: AutoReplyConfig::default(),
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

impl From<ConfigError> for innkeep_core::Error {
    fn from(err: ConfigError) -> Self {
        innkeep_core::Error::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.scheduler.interval_secs, 60);
        assert!(!config.auto_reply.enabled);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.llm.model, config.llm.model);
        assert_eq!(parsed.hosttools.api_url, config.hosttools.api_url);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.llm.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_scheduler_settings_rejected() {
        let mut config = AppConfig::default();
        config.scheduler.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.scheduler.utc_offset_hours = 15;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().database_url, "sqlite://innkeep.db");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
database_url = "sqlite:///var/lib/innkeep/innkeep.db"

[scheduler]
utc_offset_hours = 1
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.database_url, "sqlite:///var/lib/innkeep/innkeep.db");
        assert_eq!(config.scheduler.utc_offset_hours, 1);
        assert_eq!(config.scheduler.interval_secs, 60);
        assert_eq!(config.llm.temperature, 0.4);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "llm = [not valid").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_take_priority() {
        let env: HashMap<&str, &str> = [
            ("INNKEEP_DATABASE_URL", "sqlite::memory:"),
            ("GEMINI_API_KEY", "gem-key"),
            ("OPENAI_API_KEY", "oai-key"),
            ("HOSTTOOLS_AUTH_TOKEN", "ht-token"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.llm.api_key.as_deref(), Some("gem-key"));
        assert_eq!(config.hosttools.auth_token.as_deref(), Some("ht-token"));
        assert_eq!(config.llm.model, "gemini-2.0-flash");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-secret".into());
        config.hosttools.auth_token = Some("ht-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("ht-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gemini-2.0-flash"));
        assert!(toml_str.contains("app.hosttools.com"));
    }

    #[test]
    fn config_error_converts_to_core_error() {
        let err: innkeep_core::Error = ConfigError::ValidationError("bad".into()).into();
        assert!(err.to_string().contains("bad"));
    }
}
