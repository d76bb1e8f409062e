//! Completion provider abstraction.
//!
//! The orchestrator talks to the model only through [`CompletionProvider`];
//! [`CompatibleProvider`] is the HTTP implementation for OpenAI-compatible
//! `/chat/completions` endpoints.

mod compatible;

pub use compatible::{CompatibleProvider, ProviderOptions};

use crate::session::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Provider Trait
// ============================================================================

/// Interface to a chat completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Send one completion request.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ProviderError>;
}

/// Error from a provider.
///
/// `Status` and `Timeout` are answered locally with an error reply;
/// `Transport` and `Decode` are propagated to the caller.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Endpoint answered with a non-2xx status
    #[error("API error: {status} {reason}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    /// No complete response within the configured timeout
    #[error("request timed out after {after:?}")]
    Timeout { after: Duration },

    /// Connection or protocol failure before a response arrived
    #[error("request failed: {0}")]
    Transport(String),

    /// Response body was not a valid completion payload
    #[error("failed to parse response: {0}")]
    Decode(String),

    /// Client could not be constructed from configuration
    #[error("provider misconfigured: {0}")]
    Config(String),
}

impl ProviderError {
    /// Whether this failure is answered with an error reply instead of
    /// being raised to the caller.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Status { .. } | Self::Timeout { .. })
    }

    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// The parts of a completion response the bot consumes.
#[derive(Debug, Clone, Default)]
pub struct ChatCompletion {
    /// `choices[0].message.content`; `None` when absent or null
    pub content: Option<String>,
    pub finish_reason: Option<String>,
    pub total_tokens: Option<u64>,
    pub latency_ms: u64,
}

impl ChatCompletion {
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_wire_shape() {
        let request = ChatRequest {
            model: "gpt-3.5-turbo".into(),
            messages: vec![Message::system("S"), Message::user("hi")],
            temperature: 0.7,
            max_tokens: 2000,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    {"role": "system", "content": "S"},
                    {"role": "user", "content": "hi"}
                ],
                "temperature": 0.7,
                "max_tokens": 2000
            })
        );
    }

    #[test]
    fn test_error_classes() {
        let status = ProviderError::Status {
            status: 500,
            reason: "Internal Server Error".into(),
            body: String::new(),
        };
        assert!(status.is_recoverable());
        assert_eq!(status.status_code(), Some(500));
        assert_eq!(status.to_string(), "API error: 500 Internal Server Error");

        let timeout = ProviderError::Timeout {
            after: Duration::from_secs(3),
        };
        assert!(timeout.is_recoverable());
        assert!(timeout.to_string().contains("timed out"));

        assert!(!ProviderError::Transport("reset".into()).is_recoverable());
        assert!(!ProviderError::Decode("eof".into()).is_recoverable());
    }
}
