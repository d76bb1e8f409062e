//! Configuration validation for the Zero chat bot.
//!
//! Ensures required values are present and every numeric setting is
//! within the range the completion API accepts.

use thiserror::Error;

use crate::config::{
    CompletionConfig, Config, ObservabilityConfig, ProxyConfig, RandomReplyConfig, SessionConfig,
    TriggerConfig,
};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        reason: reason.into(),
    }
}

fn check_url(field: &str, value: &str) -> ValidationResult<()> {
    match url::Url::parse(value) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(()),
        Ok(u) => Err(invalid(field, format!("unsupported scheme '{}'", u.scheme()))),
        Err(e) => Err(invalid(field, e.to_string())),
    }
}

impl Validate for Config {
    /// Validate the entire configuration, collecting every failure.
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        let sections: [&dyn Validate; 5] = [
            &self.completion,
            &self.session,
            &self.trigger,
            &self.random_reply,
            &self.observability,
        ];
        for section in sections {
            if let Err(e) = section.validate() {
                errors.push(e);
            }
        }

        if let Some(ref proxy) = self.proxy {
            if let Err(e) = proxy.validate() {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }
}

impl Validate for CompletionConfig {
    fn validate(&self) -> ValidationResult<()> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => {
                return Err(ValidationError::MissingField {
                    field: "completion.api_key".into(),
                })
            }
        }

        check_url("completion.api_url", &self.api_url)?;

        if self.model.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "completion.model".into(),
            });
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(invalid(
                "completion.temperature",
                format!("{} is outside 0-2", self.temperature),
            ));
        }

        if self.max_tokens < 50 {
            return Err(invalid(
                "completion.max_tokens",
                format!("{} is below the minimum of 50", self.max_tokens),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(invalid("completion.timeout_secs", "must be greater than 0"));
        }

        Ok(())
    }
}

impl Validate for SessionConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.max_messages < 1 {
            return Err(invalid("session.max_messages", "must be at least 1"));
        }
        Ok(())
    }
}

impl Validate for TriggerConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.command_name.trim().is_empty() || self.command_name.contains(char::is_whitespace) {
            return Err(invalid(
                "trigger.command_name",
                "must be a single non-empty word",
            ));
        }
        if self.reset_command.trim().is_empty() || self.reset_command == self.command_name {
            return Err(invalid(
                "trigger.reset_command",
                "must be non-empty and differ from command_name",
            ));
        }
        Ok(())
    }
}

impl Validate for RandomReplyConfig {
    fn validate(&self) -> ValidationResult<()> {
        if !(0.0..=1.0).contains(&self.frequency) {
            return Err(invalid(
                "random_reply.frequency",
                format!("{} is outside 0-1", self.frequency),
            ));
        }
        if self.enabled && self.channels.is_empty() {
            tracing::warn!("random_reply is enabled but no channels are whitelisted");
        }
        Ok(())
    }
}

impl Validate for ProxyConfig {
    fn validate(&self) -> ValidationResult<()> {
        check_url("proxy.url", &self.url)?;
        if self.password.is_some() && self.username.is_none() {
            return Err(ValidationError::MissingField {
                field: "proxy.username".into(),
            });
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(invalid(
                "observability.log_level",
                format!("unknown level '{}'", self.log_level),
            ));
        }
        if !matches!(self.log_format.as_str(), "pretty" | "json") {
            return Err(invalid(
                "observability.log_format",
                format!("expected 'pretty' or 'json', got '{}'", self.log_format),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load (with env overrides) and validate configuration.
    pub fn load_and_validate(path: Option<&std::path::Path>) -> crate::Result<Self> {
        let config = Self::load_with_env(path)?;
        config.validate()?;
        Ok(config)
    }
}
