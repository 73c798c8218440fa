#![allow(dead_code)]

use async_trait::async_trait;
use log_monitor::app::ports::{LineSource, LineSourceFactory, MetricPublisher};
use log_monitor::config::GatewayConfig;
use log_monitor::error::{MonitorError, Result};
use log_monitor::parser::Family;
use log_monitor::types::{LogSource, PushTarget, Sample};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// What a scripted source does once its lines run out
#[derive(Debug, Clone, Copy)]
pub enum ScriptEnd {
    Exhausted,
    Pending,
    ReadError,
}

pub struct ScriptedLines {
    lines: VecDeque<String>,
    end: ScriptEnd,
}

impl ScriptedLines {
    pub fn new(lines: &[&str], end: ScriptEnd) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            end,
        }
    }
}

#[async_trait]
impl LineSource for ScriptedLines {
    async fn next_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.lines.pop_front() {
            // Yield so sibling tasks interleave like real followers would
            tokio::task::yield_now().await;
            return Ok(Some(line));
        }
        match self.end {
            ScriptEnd::Exhausted => Ok(None),
            ScriptEnd::Pending => std::future::pending().await,
            ScriptEnd::ReadError => Err(MonitorError::TailRead {
                path: PathBuf::from("scripted"),
                source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "read channel broke"),
            }),
        }
    }
}

/// Hands out scripted sources by source name; unknown names fail to attach
#[derive(Default)]
pub struct ScriptedFactory {
    scripts: Mutex<HashMap<String, ScriptedLines>>,
}

impl ScriptedFactory {
    pub fn with(self, source: &str, lines: &[&str], end: ScriptEnd) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(source.to_string(), ScriptedLines::new(lines, end));
        self
    }
}

#[async_trait]
impl LineSourceFactory for ScriptedFactory {
    async fn attach(&self, source: &LogSource) -> Result<Box<dyn LineSource>> {
        match self.scripts.lock().unwrap().remove(&source.name) {
            Some(script) => Ok(Box::new(script)),
            None => Err(MonitorError::TailAttach {
                path: source.path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            }),
        }
    }
}

/// Records every publish attempt; attempts whose index is in `fail_on` fail
#[derive(Default)]
pub struct RecordingPublisher {
    attempts: Mutex<Vec<(Sample, PushTarget)>>,
    fail_on: HashSet<usize>,
}

impl RecordingPublisher {
    pub fn failing_on(attempts: &[usize]) -> Self {
        Self {
            attempts: Mutex::new(Vec::new()),
            fail_on: attempts.iter().copied().collect(),
        }
    }

    pub fn attempts(&self) -> Vec<(Sample, PushTarget)> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn values_for(&self, metric: &str) -> Vec<f64> {
        self.attempts()
            .into_iter()
            .filter(|(s, _)| s.metric == metric)
            .map(|(s, _)| s.value.as_f64())
            .collect()
    }

    pub async fn wait_for(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let seen = self.attempts.lock().unwrap().len();
            if seen >= count {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {} publish attempts",
                count
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl MetricPublisher for RecordingPublisher {
    async fn publish(&self, sample: &Sample, target: &PushTarget) -> Result<()> {
        let mut attempts = self.attempts.lock().unwrap();
        let index = attempts.len();
        attempts.push((sample.clone(), target.clone()));
        if self.fail_on.contains(&index) {
            return Err(MonitorError::PushRejected {
                status: 503,
                body: "gateway unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// Panics on any push of `metric`, succeeds otherwise
pub struct PanickingPublisher {
    pub metric: &'static str,
}

#[async_trait]
impl MetricPublisher for PanickingPublisher {
    async fn publish(&self, sample: &Sample, _target: &PushTarget) -> Result<()> {
        if sample.metric == self.metric {
            panic!("publisher bug for {}", sample.metric);
        }
        Ok(())
    }
}

/// A gateway that never answers
pub struct HangingPublisher;

#[async_trait]
impl MetricPublisher for HangingPublisher {
    async fn publish(&self, _sample: &Sample, _target: &PushTarget) -> Result<()> {
        std::future::pending().await
    }
}

pub fn log_source(name: &str, family: Family, metric: &str, version: Option<&str>) -> LogSource {
    LogSource {
        name: name.to_string(),
        path: PathBuf::from(format!("/var/log/{}.log", name)),
        family,
        metric: metric.to_string(),
        help: format!("{} from {} log", metric, name),
        version: version.map(str::to_string),
    }
}

pub fn gateway() -> GatewayConfig {
    GatewayConfig {
        url: "http://localhost:9091".to_string(),
        job: "log_monitor".to_string(),
        instance: "rig-1".to_string(),
        timeout_secs: 1,
    }
}
