use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "webhook_events_total",
            "Webhook events accepted for dispatch."
        );
        describe_counter!(
            "webhook_invalid_total",
            "Webhook payloads rejected by validation."
        );
        describe_counter!(
            "webhook_skipped_total",
            "Webhook events skipped because the post is not published."
        );
        describe_counter!(
            "webhook_failed_total",
            "Webhook events that hit an internal orchestration fault."
        );
        describe_counter!(
            "notify_success_total",
            "Successful channel deliveries, labelled by platform."
        );
        describe_counter!(
            "notify_error_total",
            "Failed channel deliveries, labelled by platform."
        );
        describe_histogram!(
            "dispatch_duration_ms",
            "Fan-out settle time in milliseconds."
        );
        describe_gauge!(
            "webhook_last_event_ts",
            "Unix ts when the last event was dispatched."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and register all series.
    pub fn init() -> Self {
        // Use default buckets to avoid API differences across crate versions.
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        ensure_metrics_described();

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
