use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all swipe server metrics
const PREFIX: &str = "swipe";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Catalog Metrics
    pub static ref CATALOG_CALLS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_catalog_calls_total"), "Catalog calls by operation and outcome"),
        &["operation", "outcome"]
    ).expect("Failed to create catalog_calls_total metric");

    pub static ref CATALOG_CALL_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_catalog_call_duration_seconds"),
            "Catalog call duration in seconds"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
        &["operation"]
    ).expect("Failed to create catalog_call_duration_seconds metric");

    // Pipeline Metrics
    pub static ref PIPELINE_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_pipeline_runs_total"), "Candidate pipeline runs"),
        &["mode"]
    ).expect("Failed to create pipeline_runs_total metric");

    pub static ref PIPELINE_CANDIDATES: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_pipeline_candidates"),
            "Candidates returned per pipeline run"
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 20.0, 50.0, 100.0]),
        &["mode"]
    ).expect("Failed to create pipeline_candidates metric");

    pub static ref PIPELINE_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_pipeline_duration_seconds"),
            "Candidate pipeline run duration in seconds"
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    ).expect("Failed to create pipeline_duration_seconds metric");

    pub static ref PIPELINE_BUDGET_EXCEEDED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_pipeline_budget_exceeded_total"),
            "Pipeline runs that returned partial results after exceeding their budget"
        ),
        &["mode"]
    ).expect("Failed to create pipeline_budget_exceeded_total metric");

    // Session Metrics
    pub static ref SESSIONS_CREATED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_sessions_created_total"),
        "Swipe sessions created"
    ).expect("Failed to create sessions_created_total metric");

    pub static ref SWIPES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_swipes_total"), "Recorded swipes by action"),
        &["action"]
    ).expect("Failed to create swipes_total metric");

    pub static ref SESSION_WRITE_RETRIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_session_write_retries_total"),
            "Session writes retried after losing an optimistic update"
        ),
        &["operation"]
    ).expect("Failed to create session_write_retries_total metric");

    pub static ref SESSION_CONFLICTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_session_conflicts_total"),
            "Session writes abandoned after exhausting retries"
        ),
        &["operation"]
    ).expect("Failed to create session_conflicts_total metric");

    // Error Metrics
    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_errors_total"), "Total errors by type and endpoint"),
        &["error_type", "endpoint"]
    ).expect("Failed to create errors_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(CATALOG_CALLS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CATALOG_CALL_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(PIPELINE_RUNS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PIPELINE_CANDIDATES.clone()));
    let _ = REGISTRY.register(Box::new(PIPELINE_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(PIPELINE_BUDGET_EXCEEDED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SESSIONS_CREATED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SWIPES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SESSION_WRITE_RETRIES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SESSION_CONFLICTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Collapses concrete paths into a bounded set of endpoint labels.
pub fn categorize_endpoint(path: &str) -> &'static str {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        [""] => "home",
        ["v1", "session"] => "session",
        ["v1", "session", "active"] => "session_active",
        ["v1", "sessions"] => "sessions",
        ["v1", "session", _] => "session_by_id",
        ["v1", "session", _, "complete"] => "session_complete",
        ["v1", "discovery"] => "discovery",
        ["v1", "discovery", "feed"] => "discovery_feed",
        _ => "other",
    }
}

/// Record an HTTP request
pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, endpoint])
        .observe(duration.as_secs_f64());
}

/// Record a single catalog call; `outcome` is "ok" or the error kind
pub fn record_catalog_call(operation: &str, outcome: &str, duration: Duration) {
    CATALOG_CALLS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();

    CATALOG_CALL_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

/// Record a finished pipeline run
pub fn record_pipeline_run(mode: &str, candidates: usize, duration: Duration) {
    PIPELINE_RUNS_TOTAL.with_label_values(&[mode]).inc();
    PIPELINE_CANDIDATES
        .with_label_values(&[mode])
        .observe(candidates as f64);
    PIPELINE_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn record_pipeline_budget_exceeded(mode: &str) {
    PIPELINE_BUDGET_EXCEEDED_TOTAL
        .with_label_values(&[mode])
        .inc();
}

pub fn record_session_created() {
    SESSIONS_CREATED_TOTAL.inc();
}

pub fn record_swipe(action: &str) {
    SWIPES_TOTAL.with_label_values(&[action]).inc();
}

pub fn record_session_write_retry(operation: &str) {
    SESSION_WRITE_RETRIES_TOTAL
        .with_label_values(&[operation])
        .inc();
}

pub fn record_session_conflict(operation: &str) {
    SESSION_CONFLICTS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

/// Record an error
pub fn record_error(error_type: &str, endpoint: &str) {
    ERRORS_TOTAL
        .with_label_values(&[error_type, endpoint])
        .inc();
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    // RSS in kB
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        if let Ok(kb) = kb_str.parse::<f64>() {
                            PROCESS_MEMORY_BYTES.set(kb * 1024.0);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
