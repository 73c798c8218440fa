/// Defaults and built-in source presets. These keep the command-line flag names
/// stable for operators who run the monitor without a config file.
use crate::parser::Family;

pub const DEFAULT_PUSHGATEWAY_URL: &str = "http://localhost:9091";
pub const DEFAULT_JOB_NAME: &str = "log_monitor";
pub const DEFAULT_INSTANCE_NAME: &str = "instance1";
pub const DEFAULT_PUBLISH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;
// Longest line a tailer buffers before dropping it
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;
pub const DEFAULT_LOG_DIR: &str = "logs";

// Grouping label names at the gateway
pub const INSTANCE_LABEL: &str = "instance";
pub const VERSION_LABEL: &str = "version";

// Preset names (used as source names and in log fields)
pub const OULA_SOURCE: &str = "oula";
pub const OULA_NEW_SOURCE: &str = "oula_new";
pub const ZKWORK_SOURCE: &str = "zkwork";
pub const CYSIC_SOURCE: &str = "cysic";
pub const INSTANT_RATE_SOURCE: &str = "instant_rate";
pub const POOL_RATE_SOURCE: &str = "pool_rate";

/// A source whose family, metric identity and help text are fixed, so only
/// the log path has to be supplied.
#[derive(Debug, Clone, Copy)]
pub struct SourcePreset {
    pub name: &'static str,
    pub family: Family,
    pub metric: &'static str,
    pub help: &'static str,
    pub version: Option<&'static str>,
}

pub const PRESETS: &[SourcePreset] = &[
    SourcePreset {
        name: OULA_SOURCE,
        family: Family::KeywordColumn,
        metric: "oula_total",
        help: "Total value from oula log",
        version: Some("v1"),
    },
    SourcePreset {
        name: OULA_NEW_SOURCE,
        family: Family::KeywordColumn,
        metric: "oula_total",
        help: "Total value from new version oula log",
        version: Some("v2"),
    },
    SourcePreset {
        name: ZKWORK_SOURCE,
        family: Family::GpuRate,
        metric: "zkwork_gpu",
        help: "GPU value from zkwork log",
        version: None,
    },
    SourcePreset {
        name: CYSIC_SOURCE,
        family: Family::ProofRate,
        metric: "cysic_proof_rate",
        help: "1min-proof-rate from cysic log",
        version: None,
    },
    SourcePreset {
        name: INSTANT_RATE_SOURCE,
        family: Family::InstantRate,
        metric: "prover_instant_rate",
        help: "Instant rate from prover log",
        version: None,
    },
    SourcePreset {
        name: POOL_RATE_SOURCE,
        family: Family::PoolRate,
        metric: "pool_proof_rate",
        help: "Proof rate per second from pool worker log",
        version: None,
    },
];

/// Look up a preset by its source name
pub fn preset(name: &str) -> Option<&'static SourcePreset> {
    PRESETS.iter().find(|p| p.name == name)
}

/// The preset used when a `[[sources]]` entry only names a family
pub fn family_default(family: Family) -> &'static SourcePreset {
    // The first preset of each family carries its default identity
    PRESETS
        .iter()
        .find(|p| p.family == family)
        .unwrap_or(&PRESETS[0])
}
