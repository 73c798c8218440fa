use crate::constants::{self, SourcePreset};
use crate::error::{MonitorError, Result};
use crate::parser::Family;
use crate::types::{LogSource, PushTarget};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

static METRIC_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").expect("metric name pattern compiles"));

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub tailer: TailerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GatewayConfig {
    pub url: String,
    pub job: String,
    pub instance: String,
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: constants::DEFAULT_PUSHGATEWAY_URL.to_string(),
            job: constants::DEFAULT_JOB_NAME.to_string(),
            instance: constants::DEFAULT_INSTANCE_NAME.to_string(),
            timeout_secs: constants::DEFAULT_PUBLISH_TIMEOUT_SECS,
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Grouping key for one source: `instance`, then `version` when the source has one
    pub fn target_for(&self, source: &LogSource) -> PushTarget {
        let mut grouping = vec![(constants::INSTANCE_LABEL.to_string(), self.instance.clone())];
        if let Some(version) = &source.version {
            grouping.push((constants::VERSION_LABEL.to_string(), version.clone()));
        }
        PushTarget {
            gateway_url: self.url.clone(),
            job: self.job.clone(),
            grouping,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TailerConfig {
    pub poll_interval_ms: u64,
    pub max_line_bytes: usize,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: constants::DEFAULT_POLL_INTERVAL_MS,
            max_line_bytes: constants::DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl TailerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    pub metrics_addr: Option<SocketAddr>,
}

/// A `[[sources]]` entry as written by the operator
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub name: Option<String>,
    #[serde(default)]
    pub path: String,
    pub family: Family,
    pub metric: Option<String>,
    pub help: Option<String>,
    pub version: Option<String>,
}

impl SourceConfig {
    pub fn from_preset(preset: &SourcePreset, path: impl Into<String>) -> Self {
        Self {
            name: Some(preset.name.to_string()),
            path: path.into(),
            family: preset.family,
            metric: Some(preset.metric.to_string()),
            help: Some(preset.help.to_string()),
            version: preset.version.map(str::to_string),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.path.trim().is_empty()
    }

    fn resolve(&self, index: usize) -> LogSource {
        let defaults = constants::family_default(self.family);
        let name = self
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("{}-{}", self.family, index));
        LogSource {
            name,
            path: PathBuf::from(self.path.trim()),
            family: self.family,
            metric: self.metric.clone().unwrap_or_else(|| defaults.metric.to_string()),
            help: self.help.clone().unwrap_or_else(|| defaults.help.to_string()),
            version: self.version.clone().filter(|v| !v.trim().is_empty()),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MonitorError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Set (or replace) the path of a built-in source
    pub fn set_preset_path(&mut self, preset: &SourcePreset, path: &str) {
        match self
            .sources
            .iter()
            .position(|s| s.name.as_deref() == Some(preset.name))
        {
            Some(index) => self.sources[index].path = path.to_string(),
            None => self.sources.push(SourceConfig::from_preset(preset, path)),
        }
    }

    /// Validate the whole configuration and resolve the sources that have a
    /// log path. Unconfigured sources are skipped, not rejected.
    pub fn log_sources(&self) -> Result<Vec<LogSource>> {
        self.validate_settings()?;

        let mut names = HashSet::new();
        let mut identities = HashSet::new();
        let mut sources = Vec::new();

        for (index, entry) in self.sources.iter().enumerate() {
            if !entry.is_configured() {
                info!(
                    source = entry.name.as_deref().unwrap_or(entry.family.as_str()),
                    "log path empty; source not configured"
                );
                continue;
            }
            let source = entry.resolve(index);

            if !METRIC_NAME.is_match(&source.metric) {
                return Err(MonitorError::Config(format!(
                    "source '{}': '{}' is not a valid metric name",
                    source.name, source.metric
                )));
            }
            if source.version.as_deref().is_some_and(|v| v.contains('/')) {
                return Err(MonitorError::Config(format!(
                    "source '{}': version label must not contain '/'",
                    source.name
                )));
            }
            if !names.insert(source.name.clone()) {
                return Err(MonitorError::Config(format!(
                    "source name '{}' is used more than once",
                    source.name
                )));
            }
            let (metric, version) = source.identity();
            if !identities.insert((metric.to_string(), version.map(str::to_string))) {
                return Err(MonitorError::Config(format!(
                    "source '{}': metric '{}' with version {:?} is already published by another source",
                    source.name, metric, version
                )));
            }
            sources.push(source);
        }

        Ok(sources)
    }

    fn validate_settings(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.gateway.url).map_err(|e| MonitorError::InvalidUrl {
            url: self.gateway.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MonitorError::InvalidUrl {
                url: self.gateway.url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        if self.gateway.job.trim().is_empty() {
            return Err(MonitorError::Config("job name must not be empty".to_string()));
        }
        if self.gateway.instance.trim().is_empty() {
            return Err(MonitorError::Config("instance name must not be empty".to_string()));
        }
        if self.gateway.instance.contains('/') || self.gateway.job.contains('/') {
            return Err(MonitorError::Config(
                "job and instance names must not contain '/'".to_string(),
            ));
        }
        if self.tailer.max_line_bytes == 0 {
            return Err(MonitorError::Config("max_line_bytes must be at least 1".to_string()));
        }
        if self.gateway.timeout_secs == 0 {
            return Err(MonitorError::Config("gateway timeout must be at least 1 second".to_string()));
        }
        Ok(())
    }
}
