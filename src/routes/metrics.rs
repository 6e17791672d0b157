use axum::extract::State;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// GET /metrics: job counters and timings in Prometheus text format.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> String {
    handle.render()
}

/// Register descriptions for every metric the gateway and workers emit.
pub fn describe_metrics() {
    metrics::describe_counter!("travel_jobs_submitted_total", "Travel queries accepted by the gateway");
    metrics::describe_counter!("travel_jobs_completed_total", "Jobs that finished with SUCCESS");
    metrics::describe_counter!("travel_jobs_failed_total", "Jobs that finished with FAILURE");
    metrics::describe_histogram!(
        "travel_job_processing_seconds",
        "Time spent running the orchestration routine for one job"
    );
    metrics::describe_histogram!(
        "train_search_poll_attempts",
        "Poll attempts used per external train search"
    );
    metrics::describe_gauge!("travel_queue_depth", "Jobs waiting to be claimed");
}
