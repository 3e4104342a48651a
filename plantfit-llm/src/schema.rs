//! Structured-output schemas attached to every request.
//!
//! The provider is asked to constrain generation to these shapes, but does
//! not guarantee it; [`crate::validate`] stays authoritative.

use serde_json::{Value, json};

use crate::types::Task;
use crate::validate::{MAX_CANDIDATES, MAX_SCORE, MIN_CANDIDATES, MIN_EXPLANATION_CHARS, MIN_SCORE};

/// Score fields of a fit result, in output order.
pub const SCORE_FIELDS: [&str; 5] = [
    "sunlight_score",
    "humidity_score",
    "precipitation_score",
    "temperature_score",
    "overall_score",
];

/// Free-text field accompanying the scores.
pub const EXPLANATION_FIELD: &str = "explanation";

/// Schema for the search task.
#[must_use]
pub fn search_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "candidates": {
                "type": "array",
                "minItems": MIN_CANDIDATES,
                "maxItems": MAX_CANDIDATES,
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Common name" },
                        "latin_name": {
                            "type": ["string", "null"],
                            "description": "Scientific name, or null if unknown"
                        }
                    },
                    "required": ["name", "latin_name"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["candidates"],
        "additionalProperties": false
    })
}

/// Schema for the fit-scoring task.
#[must_use]
pub fn fit_schema() -> Value {
    let mut properties = serde_json::Map::new();
    for field in SCORE_FIELDS {
        properties.insert(
            field.to_string(),
            json!({ "type": "integer", "minimum": MIN_SCORE, "maximum": MAX_SCORE }),
        );
    }
    properties.insert(
        EXPLANATION_FIELD.to_string(),
        json!({ "type": "string", "minLength": MIN_EXPLANATION_CHARS }),
    );

    let mut required: Vec<&str> = SCORE_FIELDS.to_vec();
    required.push(EXPLANATION_FIELD);

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

/// Schema for `task`.
#[must_use]
pub fn schema_for(task: Task) -> Value {
    match task {
        Task::Search => search_schema(),
        Task::Fit => fit_schema(),
    }
}

/// Wrap `schema` as a strict `response_format` request field.
#[must_use]
pub fn response_format(name: &str, schema: Value) -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": name,
            "strict": true,
            "schema": schema
        }
    })
}
