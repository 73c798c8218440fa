//! Supervisor metrics: monitor lifecycle.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct SupervisorMetrics;

impl SupervisorMetrics {
    pub fn record_monitor_started(source: &str) {
        ::metrics::counter!(
            phase_metric!(counter, "supervisor", "monitors_started"),
            "source" => source.to_string()
        )
        .increment(1);
        ::metrics::gauge!(phase_metric!(gauge, "supervisor", "monitors_running")).increment(1.0);
    }

    pub fn record_monitor_ended(source: &str, failed: bool) {
        ::metrics::gauge!(phase_metric!(gauge, "supervisor", "monitors_running")).decrement(1.0);
        if failed {
            ::metrics::counter!(
                phase_metric!(counter, "supervisor", "monitors_failed"),
                "source" => source.to_string()
            )
            .increment(1);
        }
    }
}

impl PhaseMetrics for SupervisorMetrics {
    fn register_metrics() {
        use metrics::{describe_counter, describe_gauge};

        describe_counter!(
            phase_metric!(counter, "supervisor", "monitors_started"),
            "Source monitors started"
        );
        describe_counter!(
            phase_metric!(counter, "supervisor", "monitors_failed"),
            "Source monitors that ended with an error"
        );
        describe_gauge!(
            phase_metric!(gauge, "supervisor", "monitors_running"),
            "Source monitors currently running"
        );
    }

    fn phase_name() -> &'static str {
        "supervisor"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "supervisor", "monitors_started"),
                metric_type: MetricType::Counter,
                help: "Source monitors started",
                labels: vec!["source"],
            },
            MetricDoc {
                name: phase_metric!(counter, "supervisor", "monitors_failed"),
                metric_type: MetricType::Counter,
                help: "Source monitors that ended with an error",
                labels: vec!["source"],
            },
            MetricDoc {
                name: phase_metric!(gauge, "supervisor", "monitors_running"),
                metric_type: MetricType::Gauge,
                help: "Source monitors currently running",
                labels: vec![],
            },
        ]
    }
}
