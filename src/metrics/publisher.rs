//! Publisher metrics: outcome and latency of Pushgateway pushes.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct PublisherMetrics;

impl PublisherMetrics {
    pub fn record_push_success(source: &str, duration_secs: f64) {
        ::metrics::counter!(
            phase_metric!(counter, "publisher", "pushes_succeeded"),
            "source" => source.to_string()
        )
        .increment(1);
        ::metrics::histogram!(
            phase_metric!(histogram, "publisher", "push_duration_seconds"),
            "source" => source.to_string()
        )
        .record(duration_secs);
    }

    /// `reason` comes from `MonitorError::kind`
    pub fn record_push_failure(source: &str, reason: &'static str) {
        ::metrics::counter!(
            phase_metric!(counter, "publisher", "pushes_failed"),
            "source" => source.to_string(),
            "reason" => reason
        )
        .increment(1);
    }
}

impl PhaseMetrics for PublisherMetrics {
    fn register_metrics() {
        use metrics::{describe_counter, describe_histogram};

        describe_counter!(
            phase_metric!(counter, "publisher", "pushes_succeeded"),
            "Samples accepted by the Pushgateway"
        );
        describe_counter!(
            phase_metric!(counter, "publisher", "pushes_failed"),
            "Samples dropped because the push failed, by reason"
        );
        describe_histogram!(
            phase_metric!(histogram, "publisher", "push_duration_seconds"),
            "Duration of successful pushes in seconds"
        );
    }

    fn phase_name() -> &'static str {
        "publisher"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "publisher", "pushes_succeeded"),
                metric_type: MetricType::Counter,
                help: "Samples accepted by the Pushgateway",
                labels: vec!["source"],
            },
            MetricDoc {
                name: phase_metric!(counter, "publisher", "pushes_failed"),
                metric_type: MetricType::Counter,
                help: "Samples dropped because the push failed, by reason",
                labels: vec!["source", "reason"],
            },
            MetricDoc {
                name: phase_metric!(histogram, "publisher", "push_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Duration of successful pushes in seconds",
                labels: vec!["source"],
            },
        ]
    }
}
