use crate::parser::{Family, SampleValue};
use std::fmt;
use std::path::PathBuf;

/// One monitored log file. Built once from configuration and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSource {
    pub name: String,
    pub path: PathBuf,
    pub family: Family,
    pub metric: String,
    pub help: String,
    /// Optional discriminator pushed as the `version` grouping label
    pub version: Option<String>,
}

impl LogSource {
    /// Identity at the gateway for a fixed job and instance
    pub fn identity(&self) -> (&str, Option<&str>) {
        (self.metric.as_str(), self.version.as_deref())
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.family, self.path.display())?;
        if let Some(version) = &self.version {
            write!(f, " version={}", version)?;
        }
        Ok(())
    }
}

/// A gauge observation built fresh for every publish. Never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: String,
    pub help: String,
    pub value: SampleValue,
}

/// Where and under which grouping key a source's samples are pushed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    pub gateway_url: String,
    pub job: String,
    /// Ordered grouping labels, `instance` first
    pub grouping: Vec<(String, String)>,
}

impl fmt::Display for PushTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job={}", self.job)?;
        for (name, value) in &self.grouping {
            write!(f, " {}={}", name, value)?;
        }
        Ok(())
    }
}
