use service_core::axum::response::IntoResponse;

/// Prometheus text exposition of every recorded metric.
pub async fn metrics() -> impl IntoResponse {
    crate::services::metrics::get_metrics()
}
