//! Plant AI client: search and fit scoring over an OpenAI-compatible API.

use std::time::Instant;

use serde_json::Value;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::config::{ClientConfig, ClientSettings};
use crate::error::{ConfigError, LlmError, duration_ms};
use crate::prompt;
use crate::retry::retry_with_backoff;
use crate::schema;
use crate::transport::{CompletionTransport, HttpTransport};
use crate::types::{CompletionRequest, ConnectionStatus, FitContext, FitResult, Prompt, SearchCandidate, Task};
use crate::validate;

/// Shortest accepted search query, after trimming.
pub const MIN_QUERY_CHARS: usize = 2;

/// Query used by [`PlantAiClient::test_connection`].
pub const PROBE_QUERY: &str = "pomidor";

/// The main client. Construct once and share by reference; it holds no
/// mutable state, so concurrent calls need no coordination.
#[derive(Debug, Clone)]
pub struct PlantAiClient<T = HttpTransport> {
    config: ClientConfig,
    transport: T,
}

impl PlantAiClient<HttpTransport> {
    /// Create a client talking HTTP to the configured endpoint.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let transport = HttpTransport::new(&config);
        Self { config, transport }
    }

    /// Normalize and validate `settings`, then create the client.
    ///
    /// # Errors
    /// Returns `ConfigError` naming the first invalid setting.
    pub fn from_settings(settings: ClientSettings) -> Result<Self, ConfigError> {
        Ok(Self::new(ClientConfig::from_settings(settings)?))
    }
}

impl<T: CompletionTransport> PlantAiClient<T> {
    /// Create a client over a custom transport.
    #[must_use]
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolve a free-text plant name into 1–5 candidates, best match first.
    ///
    /// # Errors
    /// `ValidationFailed` without any network call if the sanitized query is
    /// shorter than [`MIN_QUERY_CHARS`]; otherwise any [`LlmError`] that
    /// survives the retry policy.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchCandidate>, LlmError> {
        let clean = prompt::sanitize_user_text(query);
        if clean.chars().count() < MIN_QUERY_CHARS {
            return Err(rejected(
                Task::Search,
                LlmError::ValidationFailed(format!(
                    "query must be at least {MIN_QUERY_CHARS} characters"
                )),
            ));
        }

        let model = self.config.search_model();
        self.run(Task::Search, model, prompt::search_prompt(&clean), validate::validate_search)
            .await
    }

    /// Score how well the plant in `ctx` fits its site.
    ///
    /// # Errors
    /// `ValidationFailed` without any network call if `ctx` is out of range;
    /// otherwise any [`LlmError`] that survives the retry policy.
    pub async fn check_fit(&self, ctx: &FitContext) -> Result<FitResult, LlmError> {
        check_context(ctx).map_err(|err| rejected(Task::Fit, err))?;
        let model = self.config.fit_model();
        self.run(Task::Fit, model, prompt::fit_prompt(ctx), validate::validate_fit)
            .await
    }

    /// Liveness probe: run a trivial search and report the outcome.
    ///
    /// Never fails; the error is folded into the returned status.
    pub async fn test_connection(&self) -> ConnectionStatus {
        match self.search(PROBE_QUERY).await {
            Ok(_) => ConnectionStatus {
                success: true,
                model: Some(self.config.search_model().to_string()),
                error: None,
            },
            Err(err) => ConnectionStatus {
                success: false,
                model: None,
                error: Some(err.to_string()),
            },
        }
    }

    async fn run<R>(
        &self,
        task: Task,
        model: &str,
        prompt: Prompt,
        validate: fn(&Value) -> Result<R, LlmError>,
    ) -> Result<R, LlmError> {
        let operation = task.operation();
        let request = CompletionRequest {
            model: model.to_string(),
            system: prompt.system,
            user: prompt.user,
            response_format: schema::response_format(task.schema_name(), schema::schema_for(task)),
            temperature: self.config.temperature(),
            top_p: self.config.top_p(),
            max_tokens: self.config.max_tokens(),
        };

        let span = info_span!("llm_call", call_id = %Uuid::new_v4(), operation, model);
        let start = Instant::now();
        let result = retry_with_backoff(operation, self.config.max_retries(), |attempt| {
            let request = &request;
            async move {
                tracing::debug!(attempt = attempt + 1, "sending completion request");
                let payload = self.transport.complete(request).await?;
                validate(&payload)
            }
        })
        .instrument(span.clone())
        .await;

        if result.is_ok() {
            span.in_scope(|| {
                info!(latency_ms = duration_ms(start.elapsed()), "LLM call succeeded");
            });
        }
        result
    }
}

/// Log an input error that stops a call before anything is sent.
fn rejected(task: Task, err: LlmError) -> LlmError {
    error!(
        operation = task.operation(),
        code = err.code(),
        error = ?err,
        "LLM call rejected before sending: {err}"
    );
    err
}

/// Reject contexts no model answer could make sense of.
fn check_context(ctx: &FitContext) -> Result<(), LlmError> {
    let mut problems = Vec::new();
    if ctx.plant_name.trim().is_empty() {
        problems.push("plant_name: must not be empty".to_string());
    }
    if !(-90.0..=90.0).contains(&ctx.location.latitude) {
        problems.push(format!("location.latitude: out of range ({})", ctx.location.latitude));
    }
    if !(-180.0..=180.0).contains(&ctx.location.longitude) {
        problems.push(format!("location.longitude: out of range ({})", ctx.location.longitude));
    }
    if !ctx.orientation_deg.is_finite() {
        problems.push("orientation_deg: must be a finite number".to_string());
    }
    for (i, w) in ctx.monthly_weather.iter().enumerate() {
        if !(1..=12).contains(&w.month) {
            problems.push(format!("monthly_weather[{i}].month: out of range ({})", w.month));
        }
        for (field, value) in [
            ("temperature", w.temperature),
            ("sunlight", w.sunlight),
            ("humidity", w.humidity),
            ("precipitation", w.precipitation),
        ] {
            if !(0.0..=100.0).contains(&value) {
                problems.push(format!("monthly_weather[{i}].{field}: expected 0..=100 ({value})"));
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(LlmError::ValidationFailed(format!("invalid fit context: {}", problems.join("; "))))
    }
}
