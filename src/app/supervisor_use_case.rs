use crate::app::monitor_use_case::{
    wait_for_shutdown, MonitorOutcome, MonitorReport, MonitorStats, SourceMonitor,
};
use crate::app::ports::{LineSourceFactory, MetricPublisher};
use crate::config::GatewayConfig;
use crate::error::MonitorError;
use crate::metrics::SupervisorMetrics;
use crate::types::LogSource;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Starts one `SourceMonitor` task per configured source and collects each
/// monitor's report as it ends. A failing monitor never affects its siblings.
pub struct Supervisor {
    sources: Vec<LogSource>,
    gateway: GatewayConfig,
    factory: Arc<dyn LineSourceFactory>,
    publisher: Arc<dyn MetricPublisher>,
    keep_alive: bool,
}

impl Supervisor {
    pub fn new(
        sources: Vec<LogSource>,
        gateway: GatewayConfig,
        factory: Arc<dyn LineSourceFactory>,
        publisher: Arc<dyn MetricPublisher>,
    ) -> Self {
        Self {
            sources,
            gateway,
            factory,
            publisher,
            keep_alive: true,
        }
    }

    /// When disabled, `run` returns as soon as every monitor has ended instead
    /// of waiting for shutdown.
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Vec<MonitorReport> {
        let mut monitors = JoinSet::new();
        let mut names = HashMap::new();

        for source in self.sources {
            if source.path.as_os_str().is_empty() {
                info!(source = %source.name, "log path empty; source not configured");
                continue;
            }
            let target = self.gateway.target_for(&source);
            info!(source = %source, target = %target, "starting log monitor");
            SupervisorMetrics::record_monitor_started(&source.name);

            let name = source.name.clone();
            let monitor = SourceMonitor::new(source, target, self.publisher.clone(), self.gateway.timeout());
            let task = monitors.spawn(monitor.run(self.factory.clone(), shutdown.clone()));
            names.insert(task.id(), name);
        }

        if monitors.is_empty() {
            warn!("no log sources configured");
        } else {
            info!(count = monitors.len(), "all log monitors started");
        }

        let mut reports = Vec::new();
        let mut stopping = false;
        while !monitors.is_empty() {
            tokio::select! {
                joined = monitors.join_next_with_id() => match joined {
                    Some(Ok((id, report))) => {
                        names.remove(&id);
                        reports.push(record_report(report));
                    }
                    Some(Err(e)) => {
                        let source = names.remove(&e.id()).unwrap_or_default();
                        reports.push(record_report(MonitorReport {
                            source,
                            stats: MonitorStats::default(),
                            outcome: MonitorOutcome::Failed(MonitorError::TaskAborted(e.to_string())),
                        }));
                    }
                    None => break,
                },
                _ = wait_for_shutdown(&mut shutdown), if !stopping => {
                    info!(remaining = monitors.len(), "shutdown requested; waiting for monitors to stop");
                    stopping = true;
                }
            }
        }

        if self.keep_alive && !stopping {
            info!("no log monitors running; idling until shutdown");
            wait_for_shutdown(&mut shutdown).await;
        }

        info!(monitors = reports.len(), "supervisor stopped");
        reports
    }
}

fn record_report(report: MonitorReport) -> MonitorReport {
    SupervisorMetrics::record_monitor_ended(&report.source, report.outcome.is_failed());
    if report.outcome.is_failed() {
        error!(outcome = ?report.outcome, "log monitor ended: {}", report);
    } else {
        info!(outcome = ?report.outcome, "log monitor ended: {}", report);
    }
    report
}
