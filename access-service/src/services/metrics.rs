use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use service_core::error::AppError;
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder. Call once at startup.
pub fn init_metrics() -> Result<(), AppError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Failed to install Prometheus recorder: {}", e)))?;

    if METRICS_HANDLE.set(handle).is_err() {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "Metrics recorder already initialized"
        )));
    }

    Ok(())
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Login attempts by outcome (`success`, `invalid_credentials`, `unverified`).
pub fn record_login(outcome: &'static str) {
    counter!("access_logins_total", "outcome" => outcome).increment(1);
}

/// Security token consumption by kind (`verification`, `reset`) and outcome.
pub fn record_token_consumption(kind: &'static str, outcome: &'static str) {
    counter!("access_token_consumptions_total", "kind" => kind, "outcome" => outcome).increment(1);
}

/// Authorization denials by action.
pub fn record_denial(action: &'static str) {
    counter!("access_authorization_denials_total", "action" => action).increment(1);
}
