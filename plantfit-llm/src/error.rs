//! LLM error types.
//!
//! [`LlmError`] is the closed set of per-call failures. Every variant knows
//! whether re-sending the same request may succeed, which is all the retry
//! loop consults. [`ConfigError`] covers construction-time failures and is
//! never retried.

use std::time::Duration;

use thiserror::Error;

/// Wait time assumed when a 429 response carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Upper bound on how much of an unexpected response body is kept.
const MAX_BODY_CHARS: usize = 500;

/// Errors that can occur during a single search or fit call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    /// The request did not complete within the configured timeout.
    #[error("LLM request timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout that fired.
        timeout_ms: u64,
    },

    /// The provider asked us to slow down (HTTP 429).
    #[error("LLM rate limit reached, retry after {retry_after_secs}s")]
    RateLimited {
        /// Server-suggested wait before the next request.
        retry_after_secs: u64,
    },

    /// The API key was rejected (HTTP 401).
    #[error("LLM authentication failed, check the API key")]
    AuthenticationFailed,

    /// Input or model output did not satisfy the expected contract.
    #[error("LLM output validation failed: {0}")]
    ValidationFailed(String),

    /// Connection-level failure before a response status was received.
    #[error("LLM network failure: {0}")]
    NetworkFailure(String),

    /// The provider account has run out of credits (HTTP 402).
    #[error("LLM account has insufficient credits")]
    InsufficientCredits,

    /// The provider is temporarily failing (HTTP 5xx).
    #[error("LLM provider unavailable (HTTP {status})")]
    UpstreamUnavailable {
        /// The 5xx status received.
        status: u16,
    },

    /// Any other non-success status.
    #[error("LLM provider returned HTTP {status}: {body}")]
    UnclassifiedUpstream {
        /// The status received.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
}

impl LlmError {
    /// Map a non-success HTTP status to a typed error.
    ///
    /// `retry_after` is the raw `Retry-After` header value, if any.
    #[must_use]
    pub fn from_status(status: u16, retry_after: Option<&str>, body: &str) -> Self {
        match status {
            401 => Self::AuthenticationFailed,
            402 => Self::InsufficientCredits,
            429 => Self::RateLimited {
                retry_after_secs: parse_retry_after(retry_after),
            },
            s if s >= 500 => Self::UpstreamUnavailable { status: s },
            s => Self::UnclassifiedUpstream {
                status: s,
                body: truncate_body(body),
            },
        }
    }

    /// Map a `reqwest` failure that happened before a status was received.
    #[must_use]
    pub fn from_transport(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                timeout_ms: duration_ms(timeout),
            }
        } else {
            Self::NetworkFailure(err.to_string())
        }
    }

    /// Whether re-sending the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::RateLimited { .. }
                | Self::NetworkFailure(_)
                | Self::UpstreamUnavailable { .. }
        )
    }

    /// Stable machine-readable code, used in logs and by callers picking a message.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "TIMEOUT",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::ValidationFailed(_) => "VALIDATION_FAILED",
            Self::NetworkFailure(_) => "NETWORK_FAILURE",
            Self::InsufficientCredits => "INSUFFICIENT_CREDITS",
            Self::UpstreamUnavailable { .. } => "UPSTREAM_UNAVAILABLE",
            Self::UnclassifiedUpstream { .. } => "UNCLASSIFIED_UPSTREAM",
        }
    }

    /// Server-suggested wait, only present on [`LlmError::RateLimited`].
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }
}

/// Parse a `Retry-After` header given in seconds.
///
/// HTTP dates and anything non-numeric fall back to [`DEFAULT_RETRY_AFTER_SECS`].
#[must_use]
pub fn parse_retry_after(value: Option<&str>) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn truncate_body(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= MAX_BODY_CHARS {
        body.to_string()
    } else {
        let mut cut: String = body.chars().take(MAX_BODY_CHARS).collect();
        cut.push('…');
        cut
    }
}

/// Errors raised while building a [`crate::config::ClientConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A required string setting is missing or blank.
    #[error("{field} must not be empty")]
    Empty {
        /// Offending setting.
        field: &'static str,
    },

    /// A numeric setting is outside its allowed range.
    #[error("{field} out of range: {detail}")]
    OutOfRange {
        /// Offending setting.
        field: &'static str,
        /// What was expected and what was found.
        detail: String,
    },

    /// The configuration source could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(String),
}
