//! Registers every component's metrics and detects naming conflicts early.

use crate::metrics::{MetricDoc, PhaseMetrics};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();

    register_phase_metrics::<super::parser::ParserMetrics>(&mut all_metrics);
    register_phase_metrics::<super::publisher::PublisherMetrics>(&mut all_metrics);
    register_phase_metrics::<super::supervisor::SupervisorMetrics>(&mut all_metrics);

    info!("Registered {} self-telemetry metrics", all_metrics.len());
    for doc in all_metrics.values() {
        debug!(
            phase = extract_phase_from_metric_name(doc.name),
            metric = doc.name,
            kind = ?doc.metric_type,
            "{}",
            doc.help
        );
    }
}

fn register_phase_metrics<T: PhaseMetrics>(all_metrics: &mut HashMap<&'static str, MetricDoc>) {
    T::register_metrics();
    let phase_name = T::phase_name();

    for doc in T::metrics_documentation() {
        if all_metrics.contains_key(doc.name) {
            warn!(
                "Metric name conflict detected: '{}' redefined by phase '{}'",
                doc.name, phase_name
            );
        } else {
            all_metrics.insert(doc.name, doc);
        }
    }
}

/// "log_monitor_publisher_pushes_failed_total" -> "publisher"
fn extract_phase_from_metric_name(metric_name: &str) -> &str {
    if let Some(stripped) = metric_name.strip_prefix("log_monitor_") {
        if let Some(next_underscore) = stripped.find('_') {
            return &stripped[..next_underscore];
        }
    }
    "unknown"
}
