use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder once. A second call is a no-op.
pub fn init_metrics() -> Result<(), anyhow::Error> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    if METRICS_HANDLE.set(handle).is_err() {
        tracing::warn!("Metrics handle already initialized");
    }
    Ok(())
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_payment_upserted(status: &'static str) {
    ::metrics::counter!("cablebill_payments_upserted_total", "status" => status).increment(1);
}

pub fn record_payment_request_submitted(matched: bool) {
    let matched = if matched { "true" } else { "false" };
    ::metrics::counter!("cablebill_payment_requests_submitted_total", "matched" => matched)
        .increment(1);
}

pub fn record_payment_request_decided(action: &'static str) {
    ::metrics::counter!("cablebill_payment_requests_decided_total", "action" => action)
        .increment(1);
}

/// `role` is admin or user, `outcome` is success or failure.
pub fn record_login(role: &'static str, outcome: &'static str) {
    ::metrics::counter!("cablebill_logins_total", "role" => role, "outcome" => outcome)
        .increment(1);
}
