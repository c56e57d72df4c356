//! Startup metrics for the recording bot.
//!
//! All metrics follow Prometheus naming conventions:
//! - `rb_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! The `kind` label is bounded by `BotError::kind` (4 values).

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used to
/// render `/metrics`.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Configuration load touches DNS and the filesystem
        .set_buckets_for_metric(
            Matcher::Prefix("rb_config_load".to_string()),
            &[0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000],
        )
        .map_err(|e| format!("Failed to set config load buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

/// Set the lifecycle state code.
///
/// Metric: `rb_lifecycle_state`
/// Values: 0 = not started, 1 = initializing, 2 = running, 3 = failed, 4 = stopped
pub fn set_lifecycle_state(code: u8) {
    gauge!("rb_lifecycle_state").set(f64::from(code));
}

/// Count a fatal startup failure.
///
/// Metric: `rb_startup_failures_total`
/// Labels: `kind` (config, certificate, dns, service)
pub fn record_startup_failure(kind: &'static str) {
    counter!("rb_startup_failures_total", "kind" => kind).increment(1);
}

/// Record how long configuration loading took.
///
/// Metric: `rb_config_load_duration_seconds`
/// Labels: `status` (success, error)
pub fn record_config_load_duration(status: &'static str, duration: Duration) {
    histogram!("rb_config_load_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
}

/// Publish the installed outbound connection limit.
///
/// Metric: `rb_outbound_connection_limit`
#[allow(clippy::cast_precision_loss)] // limits are small integers
pub fn set_outbound_connection_limit(limit: usize) {
    gauge!("rb_outbound_connection_limit").set(limit as f64);
}
