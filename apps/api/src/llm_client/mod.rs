//! Completion Client: the single point of entry for all model calls in CoursePath.
//!
//! ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
//! Pipeline stages hand a prompt to `CompletionClient::complete` and get raw text back.
//!
//! Model: claude-sonnet-4-20250514 (hardcoded, not configurable)
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

pub mod retry;
#[cfg(test)]
pub(crate) mod testing;

pub use retry::{RetryPolicy, Sleeper, TokioSleeper};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for every stage of the pipeline.
pub const MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Fixed sampling configuration: low randomness, bounded output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub max_tokens: u32,
    pub temperature: f32,
}

pub const SAMPLING: Sampling = Sampling {
    max_tokens: 4000,
    temperature: 0.1,
};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<LlmError>,
    },
}

/// One attempt against the completion service. Implementations do not retry.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str, sampling: Sampling) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic Messages API backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

pub struct AnthropicBackend {
    client: Client,
    api_key: String,
    url: String,
}

impl AnthropicBackend {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, LlmError> {
        Self::with_url(api_key, timeout, ANTHROPIC_API_URL)
    }

    /// Points the backend at a different Messages endpoint (proxies, test servers).
    pub fn with_url(
        api_key: String,
        timeout: Duration,
        url: impl Into<String>,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            url: url.into(),
        })
    }
}

#[async_trait]
impl CompletionBackend for AnthropicBackend {
    async fn complete(&self, prompt: &str, sampling: Sampling) -> Result<String, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: sampling.max_tokens,
            temperature: sampling.temperature,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: LlmResponse = response.json().await?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        llm_response
            .text()
            .map(str::to_owned)
            .ok_or(LlmError::EmptyContent)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Retrying client
// ────────────────────────────────────────────────────────────────────────────

/// Wraps a backend with a retry policy and a per-attempt deadline.
///
/// Every error is treated as retryable, including 4xx responses. A call
/// never panics: exhaustion comes back as `LlmError::Exhausted`.
#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    timeout: Duration,
}

impl CompletionClient {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Production client talking to the Anthropic Messages API.
    pub fn anthropic(api_key: String, timeout: Duration) -> Result<Self, LlmError> {
        let backend = AnthropicBackend::new(api_key, timeout)?;
        Ok(Self::new(Arc::new(backend)).with_timeout(timeout))
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete_with_attempts(prompt, self.policy.max_attempts).await
    }

    pub async fn complete_with_attempts(
        &self,
        prompt: &str,
        max_attempts: u32,
    ) -> Result<String, LlmError> {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let result = match tokio::time::timeout(
                self.timeout,
                self.backend.complete(prompt, SAMPLING),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(LlmError::Timeout(self.timeout)),
            };

            let err = match result {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };

            match self.policy.next_delay(attempt, max_attempts) {
                Some(delay) => {
                    warn!(
                        "LLM call attempt {} failed: {}; retrying after {}ms...",
                        attempt + 1,
                        err,
                        delay.as_millis()
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    error!("All {} LLM call attempts failed: {}", max_attempts, err);
                    return Err(LlmError::Exhausted {
                        attempts: max_attempts,
                        last: Box::new(err),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{RecordingSleeper, ScriptedBackend};
    use super::*;

    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_with(backend: Arc<ScriptedBackend>, sleeper: Arc<RecordingSleeper>) -> CompletionClient {
        CompletionClient::new(backend).with_sleeper(sleeper)
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let backend = Arc::new(ScriptedBackend::failing_then("[\"Physics\"]", 2));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client_with(backend.clone(), sleeper.clone());

        let text = client.complete("pick departments").await.unwrap();

        assert_eq!(text, "[\"Physics\"]");
        assert_eq!(backend.calls(), 3);
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_always_failing_backend_exhausts_attempts() {
        let backend = Arc::new(ScriptedBackend::always_failing());
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client_with(backend.clone(), sleeper.clone());

        let err = client.complete("prompt").await.unwrap_err();

        assert!(matches!(err, LlmError::Exhausted { attempts: 3, .. }));
        assert_eq!(backend.calls(), 3);
        let delays = sleeper.delays();
        assert_eq!(delays.len(), 2);
        assert!(delays.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_explicit_attempt_count_overrides_policy() {
        let backend = Arc::new(ScriptedBackend::always_failing());
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client_with(backend.clone(), sleeper.clone());

        let err = client.complete_with_attempts("prompt", 5).await.unwrap_err();

        assert!(matches!(err, LlmError::Exhausted { attempts: 5, .. }));
        assert_eq!(backend.calls(), 5);
        assert_eq!(
            sleeper.delays(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
    }

    #[tokio::test]
    async fn test_first_success_makes_one_call_without_sleeping() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("ok".to_string())]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client_with(backend.clone(), sleeper.clone());

        assert_eq!(client.complete("prompt").await.unwrap(), "ok");
        assert_eq!(backend.calls(), 1);
        assert!(sleeper.delays().is_empty());
        assert_eq!(backend.prompts(), vec!["prompt".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_backend_times_out_each_attempt() {
        let backend = Arc::new(ScriptedBackend::hanging());
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client_with(backend.clone(), sleeper)
            .with_timeout(Duration::from_secs(5))
            .with_retry_policy(RetryPolicy::new(2, Duration::from_millis(10)));

        let err = client.complete("prompt").await.unwrap_err();

        match err {
            LlmError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last, LlmError::Timeout(_)));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_anthropic_backend_returns_first_text_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "[\"Mathematics\"]"}],
                "usage": {"input_tokens": 120, "output_tokens": 8}
            })))
            .mount(&server)
            .await;

        let backend = AnthropicBackend::with_url(
            "test-key".to_string(),
            Duration::from_secs(5),
            format!("{}/v1/messages", server.uri()),
        )
        .unwrap();

        let text = backend.complete("prompt", SAMPLING).await.unwrap();
        assert_eq!(text, "[\"Mathematics\"]");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model"], MODEL);
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "prompt");
    }

    #[tokio::test]
    async fn test_anthropic_backend_surfaces_api_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "type": "error",
                "error": {"type": "invalid_request_error", "message": "prompt is too long"}
            })))
            .mount(&server)
            .await;

        let backend = AnthropicBackend::with_url(
            "test-key".to_string(),
            Duration::from_secs(5),
            format!("{}/v1/messages", server.uri()),
        )
        .unwrap();

        match backend.complete("prompt", SAMPLING).await.unwrap_err() {
            LlmError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "prompt is too long");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_anthropic_backend_without_text_block_is_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [],
                "usage": {"input_tokens": 10, "output_tokens": 0}
            })))
            .mount(&server)
            .await;

        let backend =
            AnthropicBackend::with_url("k".to_string(), Duration::from_secs(5), server.uri())
                .unwrap();

        assert!(matches!(
            backend.complete("prompt", SAMPLING).await.unwrap_err(),
            LlmError::EmptyContent
        ));
    }
}
