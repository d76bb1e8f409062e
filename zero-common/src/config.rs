//! Configuration management for the Zero chat bot.
//!
//! The bot reads a single configuration file at `~/.codecoder/chat.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `ZERO_CHAT_API_KEY` / `OPENAI_API_KEY` → completion.api_key
//! - `ZERO_CHAT_API_URL` → completion.api_url
//! - `ZERO_CHAT_MODEL` → completion.model
//! - `ZERO_CHAT_PROXY` → proxy.url
//! - `ZERO_LOG_LEVEL` → observability.log_level

use crate::error::{Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".codecoder"),
        |dirs| dirs.home_dir().join(".codecoder"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("chat.json")
}

// ============================================================================
// Completion API
// ============================================================================

/// Completion endpoint configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Bearer credential for the completion endpoint (required)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Full URL of the chat completions endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature (0-2)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum output tokens (>= 50)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Total request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".into()
}

fn default_model() -> String {
    "gpt-3.5-turbo".into()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    10
}

// ============================================================================
// Session
// ============================================================================

/// Conversation history configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum transcript length, system message included (>= 1)
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// System prompt seeded at index 0 of every transcript
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_max_messages() -> usize {
    20
}

fn default_system_prompt() -> String {
    "你是一个友好的AI助手，请用简短、礼貌的方式回答问题。".into()
}

// ============================================================================
// Reply triggers
// ============================================================================

/// Command and reply-shape configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Command that asks the bot for a reply (`/chat hello`)
    #[serde(default = "default_command_name")]
    pub command_name: String,

    /// Prefixes that mark command text
    #[serde(default = "default_command_prefixes")]
    pub command_prefixes: Vec<String>,

    /// Command that clears the conversation (`/new`)
    #[serde(default = "default_reset_command")]
    pub reset_command: String,

    /// Quote the triggering message in replies
    #[serde(default = "default_true")]
    pub quote_reply: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            command_name: default_command_name(),
            command_prefixes: default_command_prefixes(),
            reset_command: default_reset_command(),
            quote_reply: true,
        }
    }
}

fn default_command_name() -> String {
    "chat".into()
}

fn default_command_prefixes() -> Vec<String> {
    vec!["/".into()]
}

fn default_reset_command() -> String {
    "new".into()
}

fn default_true() -> bool {
    true
}

/// Probabilistic reply configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomReplyConfig {
    /// Whether random replies are enabled
    #[serde(default)]
    pub enabled: bool,

    /// Reply probability per eligible message (0-1)
    #[serde(default = "default_frequency")]
    pub frequency: f64,

    /// Channel ids eligible for random replies
    #[serde(default)]
    pub channels: Vec<String>,
}

impl Default for RandomReplyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            frequency: default_frequency(),
            channels: Vec::new(),
        }
    }
}

fn default_frequency() -> f64 {
    0.1
}

// ============================================================================
// Transport / observability
// ============================================================================

/// Outbound HTTP proxy for the completion endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy URL (`http://host:port`)
    pub url: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format: "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Verbose logging; forces `debug`
    #[serde(default)]
    pub verbose: bool,
}

impl ObservabilityConfig {
    /// Log level after applying the verbose flag.
    pub fn effective_log_level(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            verbose: false,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration for the chat bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub trigger: TriggerConfig,

    #[serde(default)]
    pub random_reply: RandomReplyConfig,

    #[serde(default)]
    pub proxy: Option<ProxyConfig>,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    ///
    /// An explicit path must exist; the default path may be absent.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("ZERO_CHAT_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            if !key.trim().is_empty() {
                self.completion.api_key = Some(key);
            }
        }

        if let Some(url) = lookup("ZERO_CHAT_API_URL") {
            self.completion.api_url = url;
        }

        if let Some(model) = lookup("ZERO_CHAT_MODEL") {
            self.completion.model = model;
        }

        if let Some(url) = lookup("ZERO_CHAT_PROXY") {
            match self.proxy.as_mut() {
                Some(proxy) => proxy.url = url,
                None => {
                    self.proxy = Some(ProxyConfig {
                        url,
                        username: None,
                        password: None,
                    })
                }
            }
        }

        if let Some(level) = lookup("ZERO_LOG_LEVEL") {
            self.observability.log_level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_match_plugin_schema() {
        let config = Config::default();
        assert_eq!(
            config.completion.api_url,
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(config.completion.model, "gpt-3.5-turbo");
        assert!((config.completion.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.completion.max_tokens, 2000);
        assert_eq!(config.session.max_messages, 20);
        assert!(!config.random_reply.enabled);
        assert!(config.trigger.quote_reply);
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{
            "completion": { "api_key": "sk-test", "model": "gpt-4o" },
            "random_reply": { "enabled": true, "channels": ["123"] }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.completion.model, "gpt-4o");
        assert_eq!(config.completion.max_tokens, 2000);
        assert!(config.random_reply.enabled);
        assert_eq!(config.random_reply.channels, vec!["123".to_string()]);
        assert!((config.random_reply.frequency - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "session": {{ "max_messages": 5, "system_prompt": "S" }} }}"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.session.max_messages, 5);
        assert_eq!(config.session.system_prompt, "S");
    }

    #[test]
    fn test_load_from_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-env"),
            ("ZERO_CHAT_MODEL", "gpt-4o-mini"),
            ("ZERO_CHAT_PROXY", "http://127.0.0.1:7890"),
            ("ZERO_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.completion.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.completion.model, "gpt-4o-mini");
        assert_eq!(config.proxy.unwrap().url, "http://127.0.0.1:7890");
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_specific_api_key_wins_over_openai_key() {
        let mut config = Config::default();
        config.apply_overrides(|k| match k {
            "ZERO_CHAT_API_KEY" => Some("sk-chat".into()),
            "OPENAI_API_KEY" => Some("sk-openai".into()),
            _ => None,
        });
        assert_eq!(config.completion.api_key.as_deref(), Some("sk-chat"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = Config::default();
        config.completion.api_key = Some("sk-very-secret".into());
        config.proxy = Some(ProxyConfig {
            url: "http://proxy:8080".into(),
            username: Some("me".into()),
            password: Some("hunter2".into()),
        });
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("proxy:8080"));
    }

    #[test]
    fn test_verbose_forces_debug() {
        let mut obs = ObservabilityConfig::default();
        assert_eq!(obs.effective_log_level(), "info");
        obs.verbose = true;
        assert_eq!(obs.effective_log_level(), "debug");
    }
}
