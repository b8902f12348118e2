use axum::{http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct MetricsRecorder {
    handle: PrometheusHandle,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install Prometheus recorder");

        metrics::describe_counter!(
            "chat_connections_total",
            "Total number of chat sessions accepted"
        );
        metrics::describe_gauge!(
            "chat_active_sessions",
            "Number of currently open chat sessions"
        );
        metrics::describe_counter!(
            "chat_messages_sent_total",
            "Total number of chat messages delivered"
        );
        metrics::describe_counter!(
            "chat_messages_blocked_total",
            "Total number of sends rejected by the block policy"
        );
        metrics::describe_counter!(
            "chat_send_failures_total",
            "Total number of sends that failed at the gate or store"
        );
        metrics::describe_counter!(
            "chat_sessions_pruned_total",
            "Total number of dead sessions pruned during fan-out"
        );

        Self { handle }
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }
}

/// Handler for Prometheus metrics endpoint
pub async fn metrics_handler(handle: axum::extract::State<PrometheusHandle>) -> impl IntoResponse {
    let metrics = handle.render();
    (StatusCode::OK, metrics)
}
