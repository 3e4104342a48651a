//! Integration Tests — Client Call Flows
//!
//! Drives `PlantAiClient` end to end over a scripted transport: prompt and
//! schema construction, the retry policy, validation, and the liveness probe.
//! Time is paused so backoff sleeps complete instantly but stay measurable.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::time::Instant;

use plantfit_llm::types::{AnnualClimate, CandidateSource, CellPosition, CompletionRequest, Location};
use plantfit_llm::{
    ClientConfig, ClientSettings, CompletionTransport, FitContext, LlmError, PlantAiClient,
};

/// Replays a fixed script of outcomes and records every request it sees.
#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Value, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<Value, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> CompletionRequest {
        self.requests
            .lock()
            .expect("lock")
            .last()
            .cloned()
            .expect("at least one request")
    }
}

impl CompletionTransport for &ScriptedTransport {
    async fn complete(&self, request: &CompletionRequest) -> Result<Value, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("lock").push(request.clone());
        self.script
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::NetworkFailure("script exhausted".into())))
    }
}

fn config(max_retries: u32) -> ClientConfig {
    ClientConfig::from_settings(ClientSettings {
        max_retries: Some(max_retries),
        search_model: Some("test/search".into()),
        fit_model: Some("test/fit".into()),
        ..ClientSettings::with_api_key("sk-test")
    })
    .expect("valid config")
}

fn client(transport: &ScriptedTransport, max_retries: u32) -> PlantAiClient<&ScriptedTransport> {
    PlantAiClient::with_transport(config(max_retries), transport)
}

fn candidates() -> Value {
    json!({"candidates": [
        {"name": "Pomidor zwyczajny", "latin_name": "Solanum lycopersicum"},
        {"name": "Pomidor koktajlowy", "latin_name": null},
    ]})
}

fn fit_payload() -> Value {
    json!({
        "sunlight_score": 4,
        "humidity_score": 3,
        "precipitation_score": 3,
        "temperature_score": 5,
        "overall_score": 4,
        "explanation": "Lawenda dobrze znosi suche, słoneczne stanowisko, choć zimą wymaga osłony od wiatru.",
    })
}

fn fit_context() -> FitContext {
    FitContext {
        plant_name: "Lawenda".into(),
        location: Location { latitude: 52.4, longitude: 16.9, address: None, climate_zone: Some("6b".into()) },
        orientation_deg: 180.0,
        climate: AnnualClimate { mean_temperature_c: 8.8, annual_precipitation_mm: 520.0, frost_free_days: Some(180) },
        cell: CellPosition { x: 1, y: 1, sunlight_hours: Some(8.0) },
        monthly_weather: vec![],
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn short_query_fails_without_network_call() {
    let transport = ScriptedTransport::new(vec![Ok(candidates())]);
    let client = client(&transport, 2);

    for query in ["", "a", "  a  ", "\n"] {
        let err = client.search(query).await.expect_err("short query");
        match err {
            LlmError::ValidationFailed(detail) => assert!(detail.contains("at least 2 characters")),
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn query_empty_after_sanitizing_fails_without_network_call() {
    let transport = ScriptedTransport::new(vec![Ok(candidates())]);
    let client = client(&transport, 2);

    for query in ["<>", "{}", "\"\"", "< { } >", "a\u{7}", "\u{1b}b\u{0}"] {
        let err = client.search(query).await.expect_err("nothing left to send");
        assert!(
            matches!(err, LlmError::ValidationFailed(ref d) if d.contains("at least 2 characters")),
            "{query:?}: {err:?}"
        );
    }
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn search_sends_the_sanitized_query() {
    let transport = ScriptedTransport::new(vec![Ok(candidates())]);
    client(&transport, 2).search("<b>ró\u{7}ża</b>").await.expect("search");
    assert!(transport.last_request().user.contains("\"bróża/b\""));
}

#[tokio::test(start_paused = true)]
async fn search_returns_candidates_and_sends_strict_schema() {
    let transport = ScriptedTransport::new(vec![Ok(candidates())]);
    let client = client(&transport, 2);

    let result = client.search("  pomidor ").await.expect("search");
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].name, "Pomidor zwyczajny");
    assert_eq!(result[0].latin_name.as_deref(), Some("Solanum lycopersicum"));
    assert_eq!(result[1].latin_name, None);
    assert!(result.iter().all(|c| c.source == CandidateSource::ModelGenerated));

    let request = transport.last_request();
    assert_eq!(request.model, "test/search");
    assert!(request.user.contains("\"pomidor\""));
    assert_eq!(request.response_format["json_schema"]["name"], "plant_search");
    assert_eq!(request.response_format["json_schema"]["strict"], true);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn network_failure_then_success_makes_two_calls() {
    let transport = ScriptedTransport::new(vec![
        Err(LlmError::NetworkFailure("connection reset".into())),
        Ok(candidates()),
    ]);
    let client = client(&transport, 2);
    let start = Instant::now();

    let result = client.search("pomidor").await.expect("second attempt succeeds");
    assert_eq!(result[0].name, "Pomidor zwyczajny");
    assert_eq!(transport.calls(), 2);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_secs(2), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn authentication_failure_is_not_retried() {
    let transport = ScriptedTransport::new(vec![
        Err(LlmError::AuthenticationFailed),
        Ok(candidates()),
    ]);
    let client = client(&transport, 2);

    let err = client.search("pomidor").await.expect_err("401");
    assert_eq!(err, LlmError::AuthenticationFailed);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn terminal_errors_make_exactly_one_call() {
    let terminal = [
        LlmError::InsufficientCredits,
        LlmError::ValidationFailed("bad".into()),
        LlmError::UnclassifiedUpstream { status: 400, body: "bad request".into() },
    ];
    for error in terminal {
        let transport = ScriptedTransport::new(vec![Err(error.clone()), Ok(candidates())]);
        let err = client(&transport, 3).search("pomidor").await.expect_err("terminal");
        assert_eq!(err, error);
        assert_eq!(transport.calls(), 1, "{error:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn retryable_errors_stop_after_max_retries_plus_one() {
    let transport = ScriptedTransport::new(vec![
        Err(LlmError::RateLimited { retry_after_secs: 60 }),
        Err(LlmError::Timeout { timeout_ms: 30_000 }),
        Err(LlmError::UpstreamUnavailable { status: 503 }),
        Ok(candidates()),
    ]);
    let client = client(&transport, 2);
    let start = Instant::now();

    let err = client.search("pomidor").await.expect_err("exhausted");
    assert_eq!(err, LlmError::UpstreamUnavailable { status: 503 });
    assert_eq!(transport.calls(), 3);
    // 1s after the first attempt, 2s after the second.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn invalid_model_output_is_not_retried() {
    let six: Vec<Value> = (0..6).map(|i| json!({"name": format!("R{i}"), "latin_name": null})).collect();
    let transport = ScriptedTransport::new(vec![Ok(json!({"candidates": six})), Ok(candidates())]);
    let client = client(&transport, 2);

    let err = client.search("róża").await.expect_err("6 candidates");
    assert!(matches!(err, LlmError::ValidationFailed(ref d) if d.contains("(got 6)")));
    assert_eq!(transport.calls(), 1);
}

// ---------------------------------------------------------------------------
// Fit scoring
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn check_fit_round_trips_scores() {
    let transport = ScriptedTransport::new(vec![Ok(fit_payload())]);
    let client = client(&transport, 2);

    let result = client.check_fit(&fit_context()).await.expect("fit");
    assert_eq!(result.sunlight_score, 4);
    assert_eq!(result.humidity_score, 3);
    assert_eq!(result.precipitation_score, 3);
    assert_eq!(result.temperature_score, 5);
    assert_eq!(result.overall_score, 4);
    assert_eq!(result.explanation, fit_payload()["explanation"]);

    let request = transport.last_request();
    assert_eq!(request.model, "test/fit");
    assert!(request.system.contains("półkula północna"));
    assert!(request.user.contains("Roślina: Lawenda"));
    assert_eq!(request.response_format["json_schema"]["name"], "plant_fit");
    assert_eq!(request.max_tokens, 1000);
}

#[tokio::test(start_paused = true)]
async fn out_of_range_score_names_field() {
    let mut payload = fit_payload();
    payload["sunlight_score"] = json!(6);
    let transport = ScriptedTransport::new(vec![Ok(payload)]);

    let err = client(&transport, 2).check_fit(&fit_context()).await.expect_err("score 6");
    match err {
        LlmError::ValidationFailed(detail) => assert!(detail.contains("sunlight_score"), "{detail}"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn invalid_context_fails_before_network() {
    let transport = ScriptedTransport::new(vec![Ok(fit_payload())]);
    let mut ctx = fit_context();
    ctx.plant_name = " ".into();

    let err = client(&transport, 2).check_fit(&ctx).await.expect_err("empty name");
    assert!(matches!(err, LlmError::ValidationFailed(ref d) if d.contains("plant_name")));
    assert_eq!(transport.calls(), 0);
}

// ---------------------------------------------------------------------------
// Liveness probe
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_connection_reports_success() {
    let transport = ScriptedTransport::new(vec![Ok(candidates())]);
    let status = client(&transport, 0).test_connection().await;
    assert!(status.success);
    assert_eq!(status.model.as_deref(), Some("test/search"));
    assert!(status.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_connection_folds_errors_into_status() {
    let transport = ScriptedTransport::new(vec![Err(LlmError::AuthenticationFailed)]);
    let status = client(&transport, 2).test_connection().await;
    assert!(!status.success);
    assert!(status.model.is_none());
    assert_eq!(status.error.as_deref(), Some("LLM authentication failed, check the API key"));
    assert_eq!(transport.calls(), 1);
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("lock")).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}

#[tokio::test(start_paused = true)]
async fn rejected_query_is_logged_with_code() {
    let (logs, _guard) = capture_logs();
    let transport = ScriptedTransport::new(vec![]);

    client(&transport, 2).search("a").await.expect_err("short query");

    let output = logs.contents();
    assert!(output.contains("ERROR"), "{output}");
    assert!(output.contains("VALIDATION_FAILED"), "{output}");
    assert!(output.contains("operation=\"search\"") || output.contains("operation=search"), "{output}");
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn rejected_fit_context_is_logged_with_code() {
    let (logs, _guard) = capture_logs();
    let transport = ScriptedTransport::new(vec![]);
    let mut ctx = fit_context();
    ctx.location.latitude = 120.0;

    client(&transport, 2).check_fit(&ctx).await.expect_err("bad latitude");

    let output = logs.contents();
    assert!(output.contains("VALIDATION_FAILED"), "{output}");
    assert!(output.contains("check_fit"), "{output}");
    assert!(output.contains("location.latitude"), "{output}");
}
