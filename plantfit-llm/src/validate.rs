//! Validation and sanitization of model output.
//!
//! The model is an untrusted producer. Payloads are walked field by field and
//! every violation is recorded by path, so one [`LlmError::ValidationFailed`]
//! lists everything wrong with a response instead of only the first problem.

use serde_json::{Map, Value};

use crate::error::LlmError;
use crate::schema::{EXPLANATION_FIELD, SCORE_FIELDS};
use crate::types::{FitResult, SearchCandidate};

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 5;
pub const MIN_EXPLANATION_CHARS: usize = 50;
pub const MIN_CANDIDATES: usize = 1;
pub const MAX_CANDIDATES: usize = 5;

/// Accumulates `path: problem` entries.
#[derive(Debug, Default)]
struct Violations(Vec<String>);

impl Violations {
    fn push(&mut self, path: impl AsRef<str>, problem: impl AsRef<str>) {
        self.0.push(format!("{}: {}", path.as_ref(), problem.as_ref()));
    }

    fn finish<T>(self, value: T) -> Result<T, LlmError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(LlmError::ValidationFailed(self.0.join("; ")))
        }
    }
}

/// Validate a fit-scoring payload.
///
/// # Errors
/// `ValidationFailed` naming every offending field.
pub fn validate_fit(payload: &Value) -> Result<FitResult, LlmError> {
    let mut violations = Violations::default();
    let Some(obj) = payload.as_object() else {
        violations.push("$", format!("expected an object, got {}", kind(payload)));
        return violations.finish(placeholder_fit());
    };

    let mut scores = [0u8; 5];
    for (slot, field) in scores.iter_mut().zip(SCORE_FIELDS) {
        if let Some(score) = score_field(obj, field, &mut violations) {
            *slot = score;
        }
    }

    let explanation = match obj.get(EXPLANATION_FIELD) {
        None => {
            violations.push(EXPLANATION_FIELD, "missing");
            String::new()
        }
        Some(Value::String(s)) => {
            let len = s.trim().chars().count();
            if len < MIN_EXPLANATION_CHARS {
                violations.push(
                    EXPLANATION_FIELD,
                    format!("must be at least {MIN_EXPLANATION_CHARS} characters (got {len})"),
                );
            }
            s.clone()
        }
        Some(other) => {
            violations.push(EXPLANATION_FIELD, format!("expected a string, got {}", kind(other)));
            String::new()
        }
    };

    let allowed: Vec<&str> = SCORE_FIELDS.into_iter().chain([EXPLANATION_FIELD]).collect();
    reject_unknown(obj, &allowed, "", &mut violations);

    let [sunlight_score, humidity_score, precipitation_score, temperature_score, overall_score] = scores;
    violations.finish(FitResult {
        sunlight_score,
        humidity_score,
        precipitation_score,
        temperature_score,
        overall_score,
        explanation,
    })
}

/// Validate and sanitize a search payload.
///
/// Names are trimmed and stripped of angle brackets; a scientific name that
/// ends up empty is treated as absent.
///
/// # Errors
/// `ValidationFailed` naming every offending field.
pub fn validate_search(payload: &Value) -> Result<Vec<SearchCandidate>, LlmError> {
    let mut violations = Violations::default();
    let Some(obj) = payload.as_object() else {
        violations.push("$", format!("expected an object, got {}", kind(payload)));
        return violations.finish(Vec::new());
    };
    reject_unknown(obj, &["candidates"], "", &mut violations);

    let items = match obj.get("candidates") {
        None => {
            violations.push("candidates", "missing");
            return violations.finish(Vec::new());
        }
        Some(Value::Array(items)) => items,
        Some(other) => {
            violations.push("candidates", format!("expected an array, got {}", kind(other)));
            return violations.finish(Vec::new());
        }
    };

    if !(MIN_CANDIDATES..=MAX_CANDIDATES).contains(&items.len()) {
        violations.push(
            "candidates",
            format!(
                "expected {MIN_CANDIDATES} to {MAX_CANDIDATES} items (got {})",
                items.len()
            ),
        );
    }

    let mut candidates = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let path = format!("candidates[{i}]");
        let Some(entry) = item.as_object() else {
            violations.push(&path, format!("expected an object, got {}", kind(item)));
            continue;
        };
        reject_unknown(entry, &["name", "latin_name"], &path, &mut violations);

        let name = match entry.get("name") {
            Some(Value::String(raw)) => {
                let clean = sanitize_name(raw);
                if clean.is_empty() {
                    violations.push(format!("{path}.name"), "empty after sanitizing");
                }
                clean
            }
            None => {
                violations.push(format!("{path}.name"), "missing");
                String::new()
            }
            Some(other) => {
                violations.push(format!("{path}.name"), format!("expected a string, got {}", kind(other)));
                String::new()
            }
        };

        let latin_name = match entry.get("latin_name") {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => Some(sanitize_name(raw)).filter(|s| !s.is_empty()),
            Some(other) => {
                violations.push(
                    format!("{path}.latin_name"),
                    format!("expected a string or null, got {}", kind(other)),
                );
                None
            }
        };

        candidates.push(SearchCandidate::new(name, latin_name));
    }

    violations.finish(candidates)
}

/// Strip angle brackets and surrounding whitespace from a model-supplied name.
#[must_use]
pub fn sanitize_name(raw: &str) -> String {
    raw.replace(['<', '>'], "").trim().to_string()
}

fn score_field(obj: &Map<String, Value>, field: &str, violations: &mut Violations) -> Option<u8> {
    let Some(value) = obj.get(field) else {
        violations.push(field, "missing");
        return None;
    };
    let Some(n) = value.as_i64() else {
        violations.push(field, format!("expected an integer, got {value}"));
        return None;
    };
    if !(MIN_SCORE..=MAX_SCORE).contains(&n) {
        violations.push(field, format!("must be between {MIN_SCORE} and {MAX_SCORE} (got {n})"));
        return None;
    }
    u8::try_from(n).ok()
}

fn reject_unknown(obj: &Map<String, Value>, allowed: &[&str], prefix: &str, violations: &mut Violations) {
    for key in obj.keys() {
        if !allowed.contains(&key.as_str()) {
            let path = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
            violations.push(path, "unexpected field");
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn placeholder_fit() -> FitResult {
    FitResult {
        sunlight_score: 0,
        humidity_score: 0,
        precipitation_score: 0,
        temperature_score: 0,
        overall_score: 0,
        explanation: String::new(),
    }
}
