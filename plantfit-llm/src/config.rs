//! Client configuration.
//!
//! [`ClientSettings`] is what callers write down (TOML file, environment,
//! code); every field is optional. [`ClientConfig::from_settings`] fills the
//! defaults and checks every invariant once, so a `ClientConfig` that exists
//! is always valid and never changes afterwards.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, duration_ms};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_TOP_P: f32 = 0.9;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_APP_REFERER: &str = "https://plantfit.app";
pub const DEFAULT_APP_TITLE: &str = "Plantfit";

/// Partially-specified client settings, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Provider API key. Required.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API (without `/chat/completions`).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Model used for plant search.
    #[serde(default)]
    pub search_model: Option<String>,
    /// Model used for fit scoring.
    #[serde(default)]
    pub fit_model: Option<String>,
    /// Hard timeout for a single HTTP exchange, in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Retries after the first attempt for retryable failures.
    #[serde(default)]
    pub max_retries: Option<u32>,
    /// Sampling temperature, 0.0–2.0.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Nucleus sampling, 0.0–1.0.
    #[serde(default)]
    pub top_p: Option<f32>,
    /// Maximum output tokens.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Sent as `HTTP-Referer` for provider-side app attribution.
    #[serde(default)]
    pub app_referer: Option<String>,
    /// Sent as `X-Title` for provider-side app attribution.
    #[serde(default)]
    pub app_title: Option<String>,
}

impl ClientSettings {
    /// Settings with only the API key set; everything else defaults.
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Load settings from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load settings from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }
}

/// Fully-populated, validated client configuration.
#[derive(Clone, PartialEq)]
pub struct ClientConfig {
    api_key: String,
    base_url: String,
    search_model: String,
    fit_model: String,
    timeout: Duration,
    max_retries: u32,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    app_referer: Option<String>,
    app_title: Option<String>,
}

impl ClientConfig {
    /// Apply defaults to `settings` and validate the result.
    ///
    /// # Errors
    /// Returns the first violated invariant, naming the offending field.
    pub fn from_settings(settings: ClientSettings) -> Result<Self, ConfigError> {
        let api_key = required("api_key", settings.api_key)?;
        let search_model = required(
            "search_model",
            Some(settings.search_model.unwrap_or_else(|| DEFAULT_MODEL.to_string())),
        )?;
        let fit_model = required(
            "fit_model",
            Some(settings.fit_model.unwrap_or_else(|| DEFAULT_MODEL.to_string())),
        )?;
        let base_url = required(
            "base_url",
            Some(settings.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string())),
        )?
        .trim_end_matches('/')
        .to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::OutOfRange {
                field: "base_url",
                detail: format!("expected an http(s) URL, got '{base_url}'"),
            });
        }

        let timeout_ms = settings.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(ConfigError::OutOfRange {
                field: "timeout_ms",
                detail: "must be greater than 0".into(),
            });
        }

        let temperature = settings.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::OutOfRange {
                field: "temperature",
                detail: format!("expected 0.0..=2.0, got {temperature}"),
            });
        }

        let top_p = settings.top_p.unwrap_or(DEFAULT_TOP_P);
        if !(0.0..=1.0).contains(&top_p) {
            return Err(ConfigError::OutOfRange {
                field: "top_p",
                detail: format!("expected 0.0..=1.0, got {top_p}"),
            });
        }

        let max_tokens = settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_tokens",
                detail: "must be greater than 0".into(),
            });
        }

        Ok(Self {
            api_key,
            base_url,
            search_model,
            fit_model,
            timeout: Duration::from_millis(timeout_ms),
            max_retries: settings.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            temperature,
            top_p,
            max_tokens,
            app_referer: optional(settings.app_referer, DEFAULT_APP_REFERER),
            app_title: optional(settings.app_title, DEFAULT_APP_TITLE),
        })
    }

    /// Provider API key, trimmed.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// API base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of the chat-completion endpoint.
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Model used by [`crate::PlantAiClient::search`].
    #[must_use]
    pub fn search_model(&self) -> &str {
        &self.search_model
    }

    /// Model used by [`crate::PlantAiClient::check_fit`].
    #[must_use]
    pub fn fit_model(&self) -> &str {
        &self.fit_model
    }

    /// Hard limit for one HTTP exchange.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Sampling temperature sent with every request.
    #[must_use]
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Nucleus sampling value sent with every request.
    #[must_use]
    pub fn top_p(&self) -> f32 {
        self.top_p
    }

    /// Output token limit sent with every request.
    #[must_use]
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// `HTTP-Referer` header value, `None` when disabled.
    #[must_use]
    pub fn app_referer(&self) -> Option<&str> {
        self.app_referer.as_deref()
    }

    /// `X-Title` header value, `None` when disabled.
    #[must_use]
    pub fn app_title(&self) -> Option<&str> {
        self.app_title.as_deref()
    }
}

// Keeps the API key out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("search_model", &self.search_model)
            .field("fit_model", &self.fit_model)
            .field("timeout_ms", &duration_ms(self.timeout))
            .field("max_retries", &self.max_retries)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_tokens", &self.max_tokens)
            .field("app_referer", &self.app_referer)
            .field("app_title", &self.app_title)
            .finish()
    }
}

impl TryFrom<ClientSettings> for ClientConfig {
    type Error = ConfigError;

    fn try_from(settings: ClientSettings) -> Result<Self, Self::Error> {
        Self::from_settings(settings)
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Empty { field }),
    }
}

/// Unset falls back to `default`; an explicitly blank value disables the header.
fn optional(value: Option<String>, default: &str) -> Option<String> {
    match value {
        None => Some(default.to_string()),
        Some(v) if v.trim().is_empty() => None,
        Some(v) => Some(v.trim().to_string()),
    }
}
