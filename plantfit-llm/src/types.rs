//! Core types for plant search and fit-scoring requests and responses.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Which of the two supported tasks a call performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Resolve a free-text plant name into candidate species.
    Search,
    /// Score how well a plant fits a site.
    Fit,
}

impl Task {
    /// Operation name used in logs and spans.
    #[must_use]
    pub fn operation(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Fit => "check_fit",
        }
    }

    /// Name attached to the structured-output schema.
    #[must_use]
    pub fn schema_name(self) -> &'static str {
        match self {
            Self::Search => "plant_search",
            Self::Fit => "plant_fit",
        }
    }
}

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateSource {
    /// Proposed by the language model, not looked up in a curated database.
    ModelGenerated,
}

/// One plant proposed for a search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    /// Common name.
    pub name: String,
    /// Scientific (Latin) name, if the model knew one.
    pub latin_name: Option<String>,
    /// Always [`CandidateSource::ModelGenerated`].
    pub source: CandidateSource,
}

impl SearchCandidate {
    #[must_use]
    pub fn new(name: impl Into<String>, latin_name: Option<String>) -> Self {
        Self {
            name: name.into(),
            latin_name,
            source: CandidateSource::ModelGenerated,
        }
    }
}

/// Geographic position of the garden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: Option<String>,
    /// E.g. a USDA hardiness zone label like "6b".
    #[serde(default)]
    pub climate_zone: Option<String>,
}

/// Annual climate summary for the location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualClimate {
    /// Mean annual temperature, °C.
    pub mean_temperature_c: f64,
    /// Annual precipitation, mm.
    pub annual_precipitation_mm: f64,
    #[serde(default)]
    pub frost_free_days: Option<u32>,
}

/// The grid cell the plant would be placed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellPosition {
    pub x: u32,
    pub y: u32,
    /// Estimated direct sunlight for this cell, hours per day.
    #[serde(default)]
    pub sunlight_hours: Option<f64>,
}

/// One month of normalized weather observations.
///
/// All values are normalized to 0–100; see [`crate::prompt`] for the
/// conversions back to physical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyWeather {
    /// Calendar month, 1–12.
    pub month: u8,
    pub temperature: f64,
    pub sunlight: f64,
    pub humidity: f64,
    pub precipitation: f64,
}

/// Everything the fit scorer needs to know about a placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitContext {
    pub plant_name: String,
    pub location: Location,
    /// Orientation of the plot, compass degrees (0 = north).
    pub orientation_deg: f64,
    pub climate: AnnualClimate,
    pub cell: CellPosition,
    /// Ordered monthly observations; may be empty.
    #[serde(default)]
    pub monthly_weather: Vec<MonthlyWeather>,
}

/// Model assessment of how well a plant fits a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitResult {
    pub sunlight_score: u8,
    pub humidity_score: u8,
    pub precipitation_score: u8,
    pub temperature_score: u8,
    pub overall_score: u8,
    pub explanation: String,
}

/// Outcome of [`crate::PlantAiClient::test_connection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// System and user instructions for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// A single chat-completion request, as handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,
    /// System prompt (persona, rules, output contract).
    pub system: String,
    /// User prompt (query or site context).
    pub user: String,
    /// `response_format` object constraining the output.
    pub response_format: Value,
    /// Temperature (0.0 = deterministic).
    pub temperature: f32,
    /// Nucleus sampling.
    pub top_p: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// JSON body for the `/chat/completions` endpoint.
    #[must_use]
    pub fn body(&self) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.system },
                { "role": "user", "content": self.user },
            ],
            "response_format": self.response_format,
            "temperature": self.temperature,
            "top_p": self.top_p,
            "max_tokens": self.max_tokens,
        })
    }
}
