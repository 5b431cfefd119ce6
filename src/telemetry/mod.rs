//! Telemetry module
//!
//! Logging and metrics

mod logging;
mod metrics;

pub use self::logging::{init_logging, LogFormat};
pub use self::metrics::{
    increment_counter, install_prometheus_recorder, record_latency, set_gauge, CounterMetric,
    GaugeMetric, LatencyMetric,
};

use crate::config::TelemetryConfig;
use metrics_exporter_prometheus::PrometheusHandle;

/// Keeps the metrics handle alive for rendering
pub struct TelemetryGuard {
    metrics: Option<PrometheusHandle>,
}

impl TelemetryGuard {
    /// Prometheus text exposition of everything recorded so far
    pub fn render_metrics(&self) -> Option<String> {
        self.metrics.as_ref().map(|h| h.render())
    }
}

/// Initialize all telemetry subsystems
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<TelemetryGuard> {
    init_logging(&config.log_level, config.log_format)?;

    let metrics = if config.metrics_enabled {
        Some(install_prometheus_recorder()?)
    } else {
        None
    };

    Ok(TelemetryGuard { metrics })
}
