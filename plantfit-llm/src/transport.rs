//! One request/response exchange with the chat-completion endpoint.

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{LlmError, duration_ms};
use crate::types::CompletionRequest;

/// Performs exactly one completion exchange and returns the parsed JSON payload
/// the model produced.
///
/// Implementations must not retry; that is [`crate::retry`]'s job.
pub trait CompletionTransport: Send + Sync {
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<Value, LlmError>> + Send;
}

/// Production transport over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    url: String,
    api_key: String,
    referer: Option<String>,
    title: Option<String>,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport for the endpoint and credential in `config`.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Create a transport reusing an existing connection pool.
    #[must_use]
    pub fn with_client(http: Client, config: &ClientConfig) -> Self {
        Self {
            http,
            url: config.completions_url(),
            api_key: config.api_key().to_string(),
            referer: config.app_referer().map(str::to_owned),
            title: config.app_title().map(str::to_owned),
            timeout: config.timeout(),
        }
    }

    async fn exchange(&self, request: &CompletionRequest) -> Result<Value, LlmError> {
        let mut builder = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request.body());
        if let Some(referer) = &self.referer {
            builder = builder.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.title {
            builder = builder.header("X-Title", title);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status.as_u16(), retry_after.as_deref(), &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LlmError::from_transport(&e, self.timeout))?;
        extract_completion(&body)
    }
}

impl CompletionTransport for HttpTransport {
    async fn complete(&self, request: &CompletionRequest) -> Result<Value, LlmError> {
        let start = Instant::now();
        // Dropping the exchange future on expiry aborts the in-flight request.
        let result = match tokio::time::timeout(self.timeout, self.exchange(request)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout {
                timeout_ms: duration_ms(self.timeout),
            }),
        };
        debug!(
            model = %request.model,
            latency_ms = duration_ms(start.elapsed()),
            ok = result.is_ok(),
            "completion exchange finished"
        );
        result
    }
}

#[derive(Debug, Deserialize)]
struct CompletionEnvelope {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the first choice's content out of a completion body and parse it as JSON.
///
/// # Errors
/// `ValidationFailed` if the envelope, the content or its JSON is malformed.
pub fn extract_completion(body: &str) -> Result<Value, LlmError> {
    let envelope: CompletionEnvelope = serde_json::from_str(body)
        .map_err(|e| LlmError::ValidationFailed(format!("malformed completion envelope: {e}")))?;

    let content = envelope
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LlmError::ValidationFailed("completion has no message content".into()))?;

    serde_json::from_str(strip_code_fence(&content)).map_err(|e| {
        LlmError::ValidationFailed(format!("model output is not valid JSON: {e}"))
    })
}

/// Some models wrap JSON in a Markdown fence even in structured-output mode.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
