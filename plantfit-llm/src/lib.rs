//! # plantfit-llm — Plant AI client for Plantfit
//!
//! A resilient client for an OpenAI-compatible chat-completion API
//! (OpenRouter by default), used for two tasks:
//!   - **Search**: resolve a free-text plant name into 1–5 candidate species
//!   - **Fit scoring**: rate how well a plant suits a garden site, 1–5 per metric
//!
//! Every call goes through the same pipeline, ensuring:
//!   - Structured output enforcement (strict JSON schema per task)
//!   - Timeout management (the in-flight request is dropped on expiry)
//!   - Retry with exponential backoff for transient failures only
//!   - Validation of everything the model returns
//!
//! # Architecture
//!
//! ```text
//! caller ─► prompt + schema ─► retry ─► transport ─┬─► error classifier (non-2xx / I/O)
//!                                                  └─► validator (2xx) ─► caller
//! ```

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod client;
pub mod config;
pub mod error;
pub mod prompt;
pub mod retry;
pub mod schema;
pub mod transport;
pub mod types;
pub mod validate;

pub use client::PlantAiClient;
pub use config::{ClientConfig, ClientSettings};
pub use error::{ConfigError, LlmError};
pub use transport::{CompletionTransport, HttpTransport};
pub use types::{ConnectionStatus, FitContext, FitResult, SearchCandidate};
