//! Configuration management
//!
//! This module handles loading, validation, and management of the Valebot configuration.
//! Configuration is stored in TOML format at ~/.valebot/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **ai**: Backend selection, fallback policy, language, history window
//! - **ai.local** / **ai.online**: Per-backend connection settings
//! - **valetudo**: Robot REST API location
//! - **api**: HTTP/WebSocket server binding and CORS
//! - **follow**: Follow-me poll interval, staleness window and distance
//!
//! API keys may be written into the `[ai.online.*]` sections, but the usual
//! place for them is the environment or the OS keychain (see [`crate::secrets`]).
//!
//! # Examples
//!
//! ```no_run
//! use valebot_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Valetudo: {}", config.valetudo.base_url());
//! println!("Default model: {}", config.ai.default_model);
//! # Ok(())
//! # }
//! ```

use crate::interpreter::Language;
use crate::llm::BackendId;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Chat backend configuration
    #[serde(default)]
    pub ai: AiConfig,

    /// Valetudo connection
    #[serde(default)]
    pub valetudo: ValetudoConfig,

    /// HTTP/WebSocket server
    #[serde(default)]
    pub api: ApiConfig,

    /// Follow-me tracking
    #[serde(default)]
    pub follow: FollowConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Chat backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Backend that is active at startup
    #[serde(default = "default_model")]
    pub default_model: BackendId,

    /// Switch to an alternate backend once per chat call on failure
    #[serde(default = "default_true")]
    pub auto_fallback: bool,

    /// Language of the system prompt and context labels
    #[serde(default)]
    pub language: Language,

    /// Number of history entries sent with each request
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Minimum confidence (exclusive) before a classified command is executed
    #[serde(default = "default_command_threshold")]
    pub command_threshold: f64,

    /// Local OpenAI-compatible server
    #[serde(default)]
    pub local: LocalConfig,

    /// Online providers
    #[serde(default)]
    pub online: OnlineConfig,
}

/// Local (LM Studio style) backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL including the `/v1` prefix
    #[serde(default = "default_local_base_url")]
    pub base_url: String,

    #[serde(default = "default_local_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_local_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// Online providers configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineConfig {
    /// Fallback target when the local backend fails
    #[serde(default = "default_online_provider")]
    pub default_provider: BackendId,

    #[serde(default = "OnlineProviderConfig::openai")]
    pub openai: OnlineProviderConfig,

    #[serde(default = "OnlineProviderConfig::anthropic")]
    pub anthropic: OnlineProviderConfig,

    #[serde(default = "OnlineProviderConfig::google")]
    pub google: OnlineProviderConfig,
}

/// Settings shared by every online provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineProviderConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Inline API key; prefer the environment or keychain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub base_url: String,

    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_online_timeout")]
    pub timeout_secs: u64,
}

/// Valetudo REST API location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValetudoConfig {
    #[serde(default = "default_valetudo_host")]
    pub host: String,

    #[serde(default = "default_valetudo_port")]
    pub port: u16,

    #[serde(default = "default_valetudo_protocol")]
    pub protocol: String,

    #[serde(default = "default_valetudo_api_base")]
    pub api_base: String,

    /// Request timeout in seconds
    #[serde(default = "default_valetudo_timeout")]
    pub timeout_secs: u64,
}

/// HTTP/WebSocket server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,

    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Allowed CORS origins; `"*"` allows any
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Built web UI to serve at `/` (supports ~ expansion)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

/// Follow-me tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowConfig {
    /// Delay between poll ticks in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long a user position stays valid, in seconds
    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: u64,

    /// Minimum robot-to-user distance that triggers a move (map units)
    #[serde(default = "default_follow_distance")]
    pub follow_distance: f64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_model() -> BackendId {
    BackendId::Local
}

fn default_online_provider() -> BackendId {
    BackendId::OpenAI
}

fn default_history_window() -> usize {
    20
}

fn default_command_threshold() -> f64 {
    0.7
}

fn default_local_base_url() -> String {
    "http://localhost:1234/v1".to_string()
}

fn default_local_model() -> String {
    "local-model".to_string()
}

fn default_local_timeout() -> u64 {
    30
}

fn default_online_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_valetudo_host() -> String {
    "192.168.1.100".to_string()
}

fn default_valetudo_port() -> u16 {
    80
}

fn default_valetudo_protocol() -> String {
    "http".to_string()
}

fn default_valetudo_api_base() -> String {
    "/api/v2".to_string()
}

fn default_valetudo_timeout() -> u64 {
    10
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_staleness_secs() -> u64 {
    10
}

fn default_follow_distance() -> f64 {
    500.0
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            auto_fallback: true,
            language: Language::default(),
            history_window: default_history_window(),
            command_threshold: default_command_threshold(),
            local: LocalConfig::default(),
            online: OnlineConfig::default(),
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_local_base_url(),
            model: default_local_model(),
            timeout_secs: default_local_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl LocalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OnlineConfig {
    fn default() -> Self {
        Self {
            default_provider: default_online_provider(),
            openai: OnlineProviderConfig::openai(),
            anthropic: OnlineProviderConfig::anthropic(),
            google: OnlineProviderConfig::google(),
        }
    }
}

impl OnlineConfig {
    /// Settings for an online backend; `None` for [`BackendId::Local`]
    pub fn provider(&self, id: BackendId) -> Option<&OnlineProviderConfig> {
        match id {
            BackendId::Local => None,
            BackendId::OpenAI => Some(&self.openai),
            BackendId::Anthropic => Some(&self.anthropic),
            BackendId::Google => Some(&self.google),
        }
    }
}

impl OnlineProviderConfig {
    fn with(enabled: bool, base_url: &str, model: &str) -> Self {
        Self {
            enabled,
            api_key: None,
            base_url: base_url.to_string(),
            model: model.to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_online_timeout(),
        }
    }

    pub fn openai() -> Self {
        Self::with(true, "https://api.openai.com/v1", "gpt-4o-mini")
    }

    pub fn anthropic() -> Self {
        Self::with(
            false,
            "https://api.anthropic.com/v1",
            "claude-3-5-sonnet-20241022",
        )
    }

    pub fn google() -> Self {
        Self::with(
            false,
            "https://generativelanguage.googleapis.com/v1beta",
            "gemini-1.5-pro",
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ValetudoConfig {
    fn default() -> Self {
        Self {
            host: default_valetudo_host(),
            port: default_valetudo_port(),
            protocol: default_valetudo_protocol(),
            api_base: default_valetudo_api_base(),
            timeout_secs: default_valetudo_timeout(),
        }
    }
}

impl ValetudoConfig {
    /// Full API root, e.g. `http://192.168.1.100:80/api/v2`
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.protocol, self.host, self.port, self.api_base
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            cors_origins: default_cors_origins(),
            static_dir: None,
        }
    }
}

impl ApiConfig {
    /// `host:port` string suitable for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            staleness_secs: default_staleness_secs(),
            follow_distance: default_follow_distance(),
        }
    }
}

impl FollowConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn staleness(&self) -> Duration {
        Duration::from_secs(self.staleness_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    /// Load configuration from the default location (~/.valebot/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from a TOML string
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

    /// Get the default configuration file path (~/.valebot/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".valebot").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            ai: AiConfig::default(),
            valetudo: ValetudoConfig::default(),
            api: ApiConfig::default(),
            follow: FollowConfig::default(),
        }
    }

    /// Validate and process configuration
    ///
    /// Checks value ranges and expands `~` in the static directory.
    pub fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.ai.online.default_provider == BackendId::Local {
            return Err(EngineError::Config(
                "ai.online.default_provider must be an online backend (openai, anthropic, google)"
                    .to_string(),
            ));
        }

        if self.ai.history_window == 0 {
            return Err(EngineError::Config(
                "ai.history_window must be at least 1".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.ai.command_threshold) {
            return Err(EngineError::Config(
                "ai.command_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.follow.poll_interval_ms == 0 {
            return Err(EngineError::Config(
                "follow.poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.follow.follow_distance < 0.0 {
            return Err(EngineError::Config(
                "follow.follow_distance must not be negative".to_string(),
            ));
        }

        if let Some(dir) = &self.api.static_dir {
            let dir = expand_path(dir)?;
            if !dir.is_dir() {
                return Err(EngineError::Config(format!(
                    "api.static_dir is not a directory: {:?}",
                    dir
                )));
            }
            self.api.static_dir = Some(dir);
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
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
        assert_eq!(config.ai.default_model, BackendId::Local);
        assert_eq!(config.ai.online.default_provider, BackendId::OpenAI);
        assert_eq!(config.ai.history_window, 20);
        assert!(config.ai.auto_fallback);
        assert_eq!(config.ai.language, Language::Polish);
        assert!(config.ai.online.openai.enabled);
        assert!(!config.ai.online.anthropic.enabled);
        assert_eq!(config.follow.follow_distance, 500.0);
    }

    #[test]
    fn test_valetudo_base_url() {
        let config = ValetudoConfig::default();
        assert_eq!(config.base_url(), "http://192.168.1.100:80/api/v2");
    }

    #[test]
    fn test_online_provider_lookup() {
        let online = OnlineConfig::default();
        assert!(online.provider(BackendId::Local).is_none());
        assert_eq!(
            online.provider(BackendId::Google).map(|p| p.model.as_str()),
            Some("gemini-1.5-pro")
        );
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
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
        assert_eq!(config.ai.default_model, deserialized.ai.default_model);
        assert_eq!(config.ai.language, deserialized.ai.language);
    }
}
