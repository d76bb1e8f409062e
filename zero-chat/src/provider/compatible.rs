//! OpenAI-compatible completion provider.
//!
//! Posts `{model, messages, temperature, max_tokens}` to the configured
//! endpoint with a bearer credential and reads `choices[0].message.content`.

use super::{ChatCompletion, ChatRequest, CompletionProvider, ProviderError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use zero_common::config::{CompletionConfig, ProxyConfig};
use zero_common::util::{scrub_secret_patterns, truncate_with_ellipsis};

const MAX_LOGGED_BODY_CHARS: usize = 200;

/// Transport settings for [`CompatibleProvider`].
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Bound on the whole request, body included
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub proxy: Option<ProxyConfig>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            proxy: None,
        }
    }
}

/// A provider that speaks the OpenAI-compatible chat completions API.
pub struct CompatibleProvider {
    client: Client,
    api_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    message: Option<CompletionMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    total_tokens: Option<u64>,
}

impl CompatibleProvider {
    /// Create a provider for `api_url` authenticated with `api_key`.
    pub fn new(
        api_url: impl Into<String>,
        api_key: &str,
        options: ProviderOptions,
    ) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| ProviderError::Config("API key contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout);

        if let Some(ref proxy) = options.proxy {
            let mut p = reqwest::Proxy::all(&proxy.url)
                .map_err(|e| ProviderError::Config(format!("invalid proxy url: {e}")))?;
            if let Some(ref username) = proxy.username {
                p = p.basic_auth(username, proxy.password.as_deref().unwrap_or_default());
            }
            builder = builder.proxy(p);
            tracing::info!(proxy = %proxy.url, "Routing completion requests through proxy");
        }

        let client = builder
            .build()
            .map_err(|e| ProviderError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            timeout: options.timeout,
        })
    }

    /// Create a provider from the bot configuration.
    pub fn from_config(
        completion: &CompletionConfig,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Self, ProviderError> {
        let api_key = completion
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Config("completion.api_key is not set".into()))?;

        Self::new(
            completion.api_url.clone(),
            api_key,
            ProviderOptions {
                timeout: Duration::from_secs(completion.timeout_secs),
                connect_timeout: Duration::from_secs(completion.connect_timeout_secs),
                proxy: proxy.cloned(),
            },
        )
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn classify(&self, e: &reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout {
                after: self.timeout,
            }
        } else {
            ProviderError::Transport(scrub_secret_patterns(&e.to_string()))
        }
    }
}

#[async_trait]
impl CompletionProvider for CompatibleProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ProviderError> {
        let start = Instant::now();

        let response = self
            .client
            .post(&self.api_url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                body = %truncate_with_ellipsis(&scrub_secret_patterns(&body), MAX_LOGGED_BODY_CHARS),
                "Completion API returned an error"
            );
            return Err(ProviderError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body,
            });
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.classify(&e)
            } else {
                ProviderError::Decode(e.to_string())
            }
        })?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let total_tokens = parsed.usage.and_then(|u| u.total_tokens);
        let (content, finish_reason) = match parsed.choices.into_iter().next() {
            Some(choice) => (
                choice.message.and_then(|m| m.content),
                choice.finish_reason,
            ),
            None => (None, None),
        };

        tracing::debug!(
            model = %request.model,
            latency_ms,
            total_tokens = ?total_tokens,
            finish_reason = ?finish_reason,
            "Completion received"
        );

        Ok(ChatCompletion {
            content,
            finish_reason,
            total_tokens,
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Message;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatRequest {
        ChatRequest {
            model: "gpt-3.5-turbo".into(),
            messages: vec![Message::system("S"), Message::user("hi")],
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    fn provider(server: &MockServer, options: ProviderOptions) -> CompatibleProvider {
        CompatibleProvider::new(
            format!("{}/v1/chat/completions", server.uri()),
            "sk-test",
            options,
        )
        .unwrap()
    }

    #[test]
    fn response_deserializes() {
        let json = r#"{
            "choices": [{
                "message": {"content": "Hello!"},
                "finish_reason": "stop"
            }],
            "usage": {"total_tokens": 15}
        }"#;
        let resp: CompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.choices[0].message.as_ref().unwrap().content.as_deref(),
            Some("Hello!")
        );
        assert_eq!(resp.usage.unwrap().total_tokens, Some(15));
    }

    #[test]
    fn response_tolerates_missing_fields() {
        let resp: CompletionResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.choices.is_empty());

        let resp: CompletionResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert!(resp.choices[0].message.as_ref().unwrap().content.is_none());
    }

    #[test]
    fn from_config_requires_api_key() {
        let config = CompletionConfig::default();
        assert!(matches!(
            CompatibleProvider::from_config(&config, None),
            Err(ProviderError::Config(_))
        ));
    }

    #[test]
    fn from_config_rejects_bad_proxy() {
        let config = CompletionConfig {
            api_key: Some("sk-test".into()),
            ..CompletionConfig::default()
        };
        let proxy = ProxyConfig {
            url: "http://[invalid".into(),
            username: None,
            password: None,
        };
        assert!(matches!(
            CompatibleProvider::from_config(&config, Some(&proxy)),
            Err(ProviderError::Config(_))
        ));
    }

    #[tokio::test]
    async fn sends_bearer_and_openai_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    {"role": "system", "content": "S"},
                    {"role": "user", "content": "hi"}
                ],
                "temperature": 0.7,
                "max_tokens": 2000
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Hello"}, "finish_reason": "stop"}],
                "usage": {"total_tokens": 12}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = provider(&server, ProviderOptions::default())
            .complete(&request())
            .await
            .unwrap();
        assert_eq!(completion.content.as_deref(), Some("Hello"));
        assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
        assert_eq!(completion.total_tokens, Some(12));
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = provider(&server, ProviderOptions::default())
            .complete(&request())
            .await
            .unwrap_err();
        match err {
            ProviderError::Status {
                status,
                reason,
                body,
            } => {
                assert_eq!(status, 429);
                assert_eq!(reason, "Too Many Requests");
                assert_eq!(body, "slow down");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_json_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = provider(&server, ProviderOptions::default())
            .complete(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"choices": []}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let options = ProviderOptions {
            timeout: Duration::from_millis(200),
            ..ProviderOptions::default()
        };
        let err = provider(&server, options)
            .complete(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { .. }));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let provider = CompatibleProvider::new(
            "http://127.0.0.1:9/v1/chat/completions",
            "sk-test",
            ProviderOptions::default(),
        )
        .unwrap();
        let err = provider.complete(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }
}
