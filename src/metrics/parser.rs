//! Parser metrics: how many lines each source produced and how many of them
//! carried a sample.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct ParserMetrics;

impl ParserMetrics {
    pub fn record_line_read(source: &str) {
        ::metrics::counter!(phase_metric!(counter, "parser", "lines_read"), "source" => source.to_string())
            .increment(1);
    }

    pub fn record_sample_extracted(source: &str) {
        ::metrics::counter!(
            phase_metric!(counter, "parser", "samples_extracted"),
            "source" => source.to_string()
        )
        .increment(1);
    }

    pub fn record_line_skipped(source: &str, reason: &'static str) {
        ::metrics::counter!(
            phase_metric!(counter, "parser", "lines_skipped"),
            "source" => source.to_string(),
            "reason" => reason
        )
        .increment(1);
    }
}

impl PhaseMetrics for ParserMetrics {
    fn register_metrics() {
        use metrics::describe_counter;

        describe_counter!(
            phase_metric!(counter, "parser", "lines_read"),
            "Lines read from a tailed log file"
        );
        describe_counter!(
            phase_metric!(counter, "parser", "samples_extracted"),
            "Lines that produced a numeric sample"
        );
        describe_counter!(
            phase_metric!(counter, "parser", "lines_skipped"),
            "Lines that produced no sample, by reason"
        );
    }

    fn phase_name() -> &'static str {
        "parser"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "parser", "lines_read"),
                metric_type: MetricType::Counter,
                help: "Lines read from a tailed log file",
                labels: vec!["source"],
            },
            MetricDoc {
                name: phase_metric!(counter, "parser", "samples_extracted"),
                metric_type: MetricType::Counter,
                help: "Lines that produced a numeric sample",
                labels: vec!["source"],
            },
            MetricDoc {
                name: phase_metric!(counter, "parser", "lines_skipped"),
                metric_type: MetricType::Counter,
                help: "Lines that produced no sample, by reason",
                labels: vec!["source", "reason"],
            },
        ]
    }
}
