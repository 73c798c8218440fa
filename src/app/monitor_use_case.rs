use crate::app::ports::{LineSource, LineSourceFactory, MetricPublisher};
use crate::error::MonitorError;
use crate::metrics::{ParserMetrics, PublisherMetrics};
use crate::parser::{LineOutcome, LineParser};
use crate::types::{LogSource, PushTarget, Sample};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorState {
    Attaching,
    Running,
    Failed,
}

/// Counters kept by one monitor over its lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub lines_read: u64,
    pub samples_extracted: u64,
    pub publishes_succeeded: u64,
    pub publishes_failed: u64,
}

#[derive(Debug)]
pub enum MonitorOutcome {
    /// Shutdown was requested
    Stopped,
    /// The line source ended on its own
    Exhausted,
    /// Attach or read failed; terminal for this monitor only
    Failed(MonitorError),
}

impl MonitorOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, MonitorOutcome::Failed(_))
    }
}

/// What a monitor hands back to the supervisor when it ends
#[derive(Debug)]
pub struct MonitorReport {
    pub source: String,
    pub stats: MonitorStats,
    pub outcome: MonitorOutcome,
}

impl fmt::Display for MonitorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        write!(
            f,
            "{}: lines={} samples={} pushed={} dropped={}",
            self.source, s.lines_read, s.samples_extracted, s.publishes_succeeded, s.publishes_failed
        )
    }
}

/// Tails one log source, extracts samples and pushes each one.
///
/// The monitor owns its metric identity; every publish carries a freshly built
/// `Sample`, so no gauge state is shared with other monitors.
pub struct SourceMonitor {
    source: LogSource,
    target: PushTarget,
    parser: LineParser,
    publisher: Arc<dyn MetricPublisher>,
    publish_timeout: Duration,
    state: MonitorState,
    stats: MonitorStats,
}

impl SourceMonitor {
    pub fn new(
        source: LogSource,
        target: PushTarget,
        publisher: Arc<dyn MetricPublisher>,
        publish_timeout: Duration,
    ) -> Self {
        let parser = LineParser::new(source.family);
        Self {
            source,
            target,
            parser,
            publisher,
            publish_timeout,
            state: MonitorState::Attaching,
            stats: MonitorStats::default(),
        }
    }

    /// Attach to the source and process lines until shutdown, exhaustion or
    /// an I/O failure. Publish failures never end the loop.
    pub async fn run(
        mut self,
        factory: Arc<dyn LineSourceFactory>,
        mut shutdown: watch::Receiver<bool>,
    ) -> MonitorReport {
        info!(source = %self.source.name, path = %self.source.path.display(), "attaching to log file");

        let attached = tokio::select! {
            attached = factory.attach(&self.source) => Some(attached),
            _ = wait_for_shutdown(&mut shutdown) => None,
        };
        let mut lines = match attached {
            Some(Ok(lines)) => lines,
            Some(Err(e)) => return self.fail(e),
            None => return self.finish(MonitorOutcome::Stopped),
        };

        self.transition(MonitorState::Running);
        let outcome = self.follow(lines.as_mut(), &mut shutdown).await;
        match outcome {
            Ok(outcome) => self.finish(outcome),
            Err(e) => self.fail(e),
        }
    }

    async fn follow(
        &mut self,
        lines: &mut dyn LineSource,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<MonitorOutcome, MonitorError> {
        loop {
            let next = tokio::select! {
                next = lines.next_line() => next?,
                _ = wait_for_shutdown(shutdown) => return Ok(MonitorOutcome::Stopped),
            };
            let Some(line) = next else {
                return Ok(MonitorOutcome::Exhausted);
            };
            self.handle_line(&line).await;
        }
    }

    /// Parse one line and, if it carries a sample, push it synchronously
    pub async fn handle_line(&mut self, line: &str) {
        self.stats.lines_read += 1;
        ParserMetrics::record_line_read(&self.source.name);

        let value = match self.parser.classify(line) {
            LineOutcome::Sample(value) => value,
            other => {
                if let LineOutcome::BadNumber(text) = &other {
                    debug!(source = %self.source.name, text = %text, "matched line has non-numeric value");
                }
                if let Some(reason) = other.skip_reason() {
                    ParserMetrics::record_line_skipped(&self.source.name, reason);
                }
                return;
            }
        };
        self.stats.samples_extracted += 1;
        ParserMetrics::record_sample_extracted(&self.source.name);

        let sample = Sample {
            metric: self.source.metric.clone(),
            help: self.source.help.clone(),
            value,
        };

        let started = Instant::now();
        let pushed = match tokio::time::timeout(
            self.publish_timeout,
            self.publisher.publish(&sample, &self.target),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(MonitorError::PublishTimeout(self.publish_timeout)),
        };

        match pushed {
            Ok(()) => {
                self.stats.publishes_succeeded += 1;
                PublisherMetrics::record_push_success(&self.source.name, started.elapsed().as_secs_f64());
                debug!(source = %self.source.name, metric = %sample.metric, value = %sample.value, "sample pushed");
            }
            Err(e) => {
                self.stats.publishes_failed += 1;
                PublisherMetrics::record_push_failure(&self.source.name, e.kind());
                warn!(
                    source = %self.source.name,
                    metric = %sample.metric,
                    value = %sample.value,
                    target = %self.target,
                    error = %e,
                    "could not push to Pushgateway; sample dropped"
                );
            }
        }
    }

    fn transition(&mut self, next: MonitorState) {
        info!(source = %self.source.name, from = ?self.state, to = ?next, "monitor state change");
        self.state = next;
    }

    fn fail(mut self, e: MonitorError) -> MonitorReport {
        error!(source = %self.source.name, path = %self.source.path.display(), error = %e, "log monitor failed");
        self.transition(MonitorState::Failed);
        self.finish(MonitorOutcome::Failed(e))
    }

    fn finish(self, outcome: MonitorOutcome) -> MonitorReport {
        MonitorReport {
            source: self.source.name,
            stats: self.stats,
            outcome,
        }
    }
}

/// Resolves once `true` has been sent. A dropped sender never resolves it.
pub(crate) async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
