//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// GET /metrics: command, policy and store counters in Prometheus text format.
pub async fn render(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}

/// Registers descriptions for the metrics the box system records.
pub fn describe() {
    metrics::describe_counter!("commands_total", "Commands accepted, by command");
    metrics::describe_counter!("events_appended_total", "Events appended to the log");
    metrics::describe_counter!(
        "policy_notifications_processed_total",
        "Notifications handled by a process policy, by process"
    );
    metrics::describe_counter!(
        "policy_retries_total",
        "Policy retries after a version conflict, by process"
    );
    metrics::describe_histogram!(
        "pipeline_sweep_seconds",
        metrics::Unit::Seconds,
        "Time spent running the pipeline until idle"
    );
}
