use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot attach to log file '{}': {source}", path.display())]
    TailAttach {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reading log file '{}' failed: {source}", path.display())]
    TailRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Pushgateway rejected push with status {status}: {body}")]
    PushRejected { status: u16, body: String },

    #[error("push did not complete within {0:?}")]
    PublishTimeout(Duration),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("monitor task ended abnormally: {0}")]
    TaskAborted(String),
}

impl MonitorError {
    /// Short stable label for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorError::Config(_) => "config",
            MonitorError::Toml(_) => "toml",
            MonitorError::Io(_) => "io",
            MonitorError::TailAttach { .. } => "tail_attach",
            MonitorError::TailRead { .. } => "tail_read",
            MonitorError::Http(e) if e.is_timeout() => "timeout",
            MonitorError::Http(e) if e.is_connect() => "connect",
            MonitorError::Http(_) => "http",
            MonitorError::PushRejected { .. } => "rejected",
            MonitorError::PublishTimeout(_) => "timeout",
            MonitorError::InvalidUrl { .. } => "invalid_url",
            MonitorError::TaskAborted(_) => "aborted",
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
