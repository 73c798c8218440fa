//! Self-telemetry for the monitor process
//!
//! These are the process's own counters (lines read, pushes made, monitors
//! alive), not the values republished to the Pushgateway. Each component
//! defines its metrics in a dedicated submodule so names never collide.

pub mod parser;
pub mod publisher;
pub mod registry;
pub mod supervisor;

pub use parser::ParserMetrics;
pub use publisher::PublisherMetrics;
pub use supervisor::SupervisorMetrics;

use crate::error::{MonitorError, Result};
use std::net::SocketAddr;
use std::sync::Once;
use tracing::info;

static INIT: Once = Once::new();

/// Install the Prometheus exporter for self-telemetry
///
/// Idempotent. Without an address nothing is installed and every metric macro
/// is a no-op. Must be called from inside the tokio runtime because the
/// exporter spawns its HTTP listener there.
pub fn init_metrics(addr: Option<SocketAddr>) -> Result<()> {
    let Some(addr) = addr else {
        info!("self-telemetry exporter disabled (no metrics address configured)");
        return Ok(());
    };

    let mut outcome = Ok(());
    INIT.call_once(|| {
        outcome = metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| MonitorError::Config(format!("Failed to install Prometheus exporter: {}", e)));
        if outcome.is_ok() {
            info!("Prometheus exporter serving self-telemetry at http://{}/metrics", addr);
            registry::register_all_metrics();
        }
    });
    outcome
}

/// Trait for component-specific metrics collections
///
/// Each component implements this trait to provide:
/// - Metric registration at startup
/// - Consistent naming conventions
/// - Documentation of what each metric measures
pub trait PhaseMetrics {
    /// Describe all metrics for this component
    fn register_metrics();

    /// Component name used as the metric prefix
    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

/// Documentation for a single metric
#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
    #[allow(dead_code)]
    pub labels: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub enum MetricType {
    Counter,
    Histogram,
    Gauge,
}

/// Builds metric names following `log_monitor_{phase}_{metric_name}[_total]`
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("log_monitor_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("log_monitor_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("log_monitor_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;
