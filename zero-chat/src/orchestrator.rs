//! Completion orchestration for one triggered message.
//!
//! Each call walks `Idle → Requesting → Succeeded | Failed` exactly once:
//! the transcript is normalized into a request, the provider is called, and
//! the transcript is either extended with the reply or cleared.

use crate::error::ChatResult;
use crate::provider::{ChatRequest, CompletionProvider, ProviderError};
use crate::session::{Message, Transcript};
use std::sync::Arc;
use zero_common::config::CompletionConfig;

/// Stage of one completion cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Idle,
    Requesting,
    Succeeded,
    Failed,
}

/// What a completion cycle produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Trimmed assistant reply, already appended to the transcript
    Replied(String),
    /// Status or timeout failure; the transcript was cleared and `message`
    /// is sent in place of a reply
    Failed {
        status: Option<u16>,
        message: String,
    },
    /// Success without usable content; nothing appended, nothing sent
    Empty,
}

impl CompletionOutcome {
    /// Text to send back to the conversation, if any.
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            Self::Replied(text) => Some(text),
            Self::Failed { message, .. } => Some(message),
            Self::Empty => None,
        }
    }

    pub const fn state(&self) -> CompletionState {
        match self {
            Self::Replied(_) | Self::Empty => CompletionState::Succeeded,
            Self::Failed { .. } => CompletionState::Failed,
        }
    }
}

/// Builds requests from transcripts and applies the results.
pub struct CompletionOrchestrator {
    provider: Arc<dyn CompletionProvider>,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl CompletionOrchestrator {
    pub fn new(provider: Arc<dyn CompletionProvider>, config: &CompletionConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Request for the normalized form of `transcript`.
    pub fn build_request(&self, transcript: &Transcript) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: transcript.normalized(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Run one completion cycle against `transcript`.
    ///
    /// Every failure clears the transcript. Status and timeout failures are
    /// answered with an error message; transport and decode failures are
    /// returned as `Err`.
    pub async fn complete(&self, transcript: &mut Transcript) -> ChatResult<CompletionOutcome> {
        let mut state = CompletionState::Idle;
        let request = self.build_request(transcript);

        advance(&mut state, CompletionState::Requesting);
        tracing::debug!(
            provider = self.provider.name(),
            model = %request.model,
            messages = request.messages.len(),
            "Requesting completion"
        );

        match self.provider.complete(&request).await {
            Ok(completion) => {
                advance(&mut state, CompletionState::Succeeded);
                let reply = completion
                    .content
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default();

                if reply.is_empty() {
                    tracing::warn!(
                        finish_reason = ?completion.finish_reason,
                        "Completion returned no content; leaving transcript unchanged"
                    );
                    return Ok(CompletionOutcome::Empty);
                }

                let reply = reply.to_string();
                transcript.append(Message::assistant(reply.clone()));
                tracing::info!(
                    latency_ms = completion.latency_ms,
                    total_tokens = ?completion.total_tokens,
                    transcript_len = transcript.len(),
                    "Completion succeeded"
                );
                Ok(CompletionOutcome::Replied(reply))
            }
            Err(err) => {
                advance(&mut state, CompletionState::Failed);
                transcript.clear();

                match err {
                    ProviderError::Status {
                        status, ref reason, ..
                    } => {
                        tracing::error!(status, reason = %reason, "Completion API error; transcript cleared");
                        Ok(CompletionOutcome::Failed {
                            status: Some(status),
                            message: format!("API调用失败: {status} {reason}"),
                        })
                    }
                    ProviderError::Timeout { after } => {
                        tracing::error!(after = ?after, "Completion timed out; transcript cleared");
                        Ok(CompletionOutcome::Failed {
                            status: None,
                            message: format!("API调用失败: request timed out after {after:?}"),
                        })
                    }
                    other => {
                        tracing::error!(error = %other, "Completion failed; transcript cleared");
                        Err(other.into())
                    }
                }
            }
        }
    }
}

fn advance(state: &mut CompletionState, next: CompletionState) {
    tracing::trace!(from = ?*state, to = ?next, "Completion state transition");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use crate::provider::ChatCompletion;
    use crate::session::Role;
    use crate::testing::ScriptedProvider;
    use std::time::Duration;

    fn config() -> CompletionConfig {
        CompletionConfig {
            api_key: Some("sk-test".into()),
            model: "gpt-test".into(),
            temperature: 0.5,
            max_tokens: 256,
            ..CompletionConfig::default()
        }
    }

    fn orchestrator(provider: Arc<ScriptedProvider>) -> CompletionOrchestrator {
        CompletionOrchestrator::new(provider, &config())
    }

    fn transcript_with_user(text: &str) -> Transcript {
        let mut t = Transcript::new("S", 20);
        t.append(Message::user(text));
        t
    }

    #[tokio::test]
    async fn test_success_trims_and_appends_reply() {
        let provider = Arc::new(ScriptedProvider::replying(&[" Hi there "]));
        let mut t = transcript_with_user("hello");

        let outcome = orchestrator(provider.clone())
            .complete(&mut t)
            .await
            .unwrap();

        assert_eq!(outcome, CompletionOutcome::Replied("Hi there".into()));
        assert_eq!(outcome.reply_text(), Some("Hi there"));
        assert_eq!(outcome.state(), CompletionState::Succeeded);
        assert_eq!(t.last(), Some(&Message::assistant("Hi there")));
        assert_eq!(t.len(), 3);
    }

    #[tokio::test]
    async fn test_request_uses_config_and_normalized_messages() {
        let provider = Arc::new(ScriptedProvider::replying(&["ok"]));
        let mut t = Transcript::new("S", 3);
        t.append(Message::user("1"));
        t.append(Message::assistant("2"));
        t.append(Message::user("3"));
        // trimmed to [S, assistant "2", user "3"]

        orchestrator(provider.clone())
            .complete(&mut t)
            .await
            .unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.model, "gpt-test");
        assert!((req.temperature - 0.5).abs() < f64::EPSILON);
        assert_eq!(req.max_tokens, 256);
        assert_eq!(
            req.messages,
            vec![Message::system("S"), Message::user("3")]
        );
    }

    #[tokio::test]
    async fn test_http_500_clears_and_returns_error_text() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Status {
            status: 500,
            reason: "Internal Server Error".into(),
            body: "boom".into(),
        })]));
        let mut t = transcript_with_user("hello");

        let outcome = orchestrator(provider).complete(&mut t).await.unwrap();

        assert!(t.is_empty());
        assert_eq!(outcome.state(), CompletionState::Failed);
        let text = outcome.reply_text().unwrap();
        assert!(text.contains("500"), "{text}");
        assert!(text.contains("Internal Server Error"));
    }

    #[tokio::test]
    async fn test_timeout_follows_status_path() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Timeout {
            after: Duration::from_secs(120),
        })]));
        let mut t = transcript_with_user("hello");

        let outcome = orchestrator(provider).complete(&mut t).await.unwrap();

        assert!(t.is_empty());
        assert!(matches!(outcome, CompletionOutcome::Failed { status: None, .. }));
        assert!(outcome.reply_text().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_transport_error_clears_and_propagates() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Transport(
            "connection reset".into(),
        ))]));
        let mut t = transcript_with_user("hello");

        let err = orchestrator(provider).complete(&mut t).await.unwrap_err();

        assert!(t.is_empty());
        assert!(matches!(
            err,
            ChatError::Completion(ProviderError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_decode_error_clears_and_propagates() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Decode(
            "expected value".into(),
        ))]));
        let mut t = transcript_with_user("hello");

        assert!(orchestrator(provider).complete(&mut t).await.is_err());
        assert!(t.is_empty());
    }

    #[tokio::test]
    async fn test_missing_content_is_empty_outcome() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(ChatCompletion::default()),
            Ok(ChatCompletion::with_content("   ")),
        ]));
        let orch = orchestrator(provider);
        let mut t = transcript_with_user("hello");
        let before = t.messages().to_vec();

        for _ in 0..2 {
            let outcome = orch.complete(&mut t).await.unwrap();
            assert_eq!(outcome, CompletionOutcome::Empty);
            assert_eq!(outcome.reply_text(), None);
            assert_eq!(t.messages(), before.as_slice());
        }
    }

    #[tokio::test]
    async fn test_reply_merges_into_trailing_assistant() {
        let provider = Arc::new(ScriptedProvider::replying(&["second"]));
        let mut t = transcript_with_user("hello");
        t.append(Message::assistant("first"));

        orchestrator(provider).complete(&mut t).await.unwrap();

        assert_eq!(t.len(), 3);
        assert_eq!(t.last().unwrap().role, Role::Assistant);
        assert_eq!(t.last().unwrap().content, "first\nsecond");
    }
}
