//! Line rules for each supported log family.
//!
//! Every family is a row in a declarative table: how to locate the value in a
//! line and which numeric type it must parse as. The tailing and publishing
//! code never looks at line contents; it only asks the table for a value.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fmt;

static GPU_RATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"gpu\[\*\]: \(1m - (\d+)").expect("gpu-rate pattern compiles"));
static PROOF_RATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"1min-proof-rate: (\d+)").expect("proof-rate pattern compiles"));
static INSTANT_RATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"instant rate: (\d+(?:\.\d+)?)").expect("instant-rate pattern compiles")
});
static POOL_RATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"proof rate (\d+)/s").expect("pool-rate pattern compiles"));

/// Source family of a log file. Fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Family {
    KeywordColumn,
    GpuRate,
    ProofRate,
    InstantRate,
    PoolRate,
}

impl Family {
    pub const ALL: &'static [Family] = &[
        Family::KeywordColumn,
        Family::GpuRate,
        Family::ProofRate,
        Family::InstantRate,
        Family::PoolRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Family::KeywordColumn => "keyword-column",
            Family::GpuRate => "gpu-rate",
            Family::ProofRate => "proof-rate",
            Family::InstantRate => "instant-rate",
            Family::PoolRate => "pool-rate",
        }
    }

    fn rule(&self) -> &'static FamilyRule {
        match self {
            Family::KeywordColumn => &RULES[0],
            Family::GpuRate => &RULES[1],
            Family::ProofRate => &RULES[2],
            Family::InstantRate => &RULES[3],
            Family::PoolRate => &RULES[4],
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Integer,
    Float,
}

/// Where the numeric text lives inside a matching line
enum Extractor {
    /// Line contains `keyword` (ASCII case-insensitive); value is the
    /// whitespace-separated field at `column`.
    KeywordColumn { keyword: &'static str, column: usize },
    /// First capture group of a pattern.
    Capture(&'static Lazy<Regex>),
}

struct FamilyRule {
    family: Family,
    extractor: Extractor,
    kind: NumericKind,
}

// Indexed by `Family::rule`; keep in the same order as `Family::ALL`.
static RULES: [FamilyRule; 5] = [
    FamilyRule {
        family: Family::KeywordColumn,
        extractor: Extractor::KeywordColumn { keyword: "total", column: 3 },
        kind: NumericKind::Integer,
    },
    FamilyRule {
        family: Family::GpuRate,
        extractor: Extractor::Capture(&GPU_RATE_PATTERN),
        kind: NumericKind::Integer,
    },
    FamilyRule {
        family: Family::ProofRate,
        extractor: Extractor::Capture(&PROOF_RATE_PATTERN),
        kind: NumericKind::Integer,
    },
    FamilyRule {
        family: Family::InstantRate,
        extractor: Extractor::Capture(&INSTANT_RATE_PATTERN),
        kind: NumericKind::Float,
    },
    FamilyRule {
        family: Family::PoolRate,
        extractor: Extractor::Capture(&POOL_RATE_PATTERN),
        kind: NumericKind::Integer,
    },
];

/// A numeric value extracted from one line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleValue {
    Integer(i64),
    Float(f64),
}

impl SampleValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            SampleValue::Integer(v) => *v as f64,
            SampleValue::Float(v) => *v,
        }
    }
}

impl fmt::Display for SampleValue {
    /// Prometheus text exposition spelling
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleValue::Integer(v) => write!(f, "{}", v),
            SampleValue::Float(v) if v.is_nan() => f.write_str("NaN"),
            SampleValue::Float(v) if v.is_infinite() && *v > 0.0 => f.write_str("+Inf"),
            SampleValue::Float(v) if v.is_infinite() => f.write_str("-Inf"),
            SampleValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Result of applying a family rule to a line. Only `Sample` carries data;
/// the other two exist so callers can log why a line was skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Sample(SampleValue),
    NoMatch,
    BadNumber(String),
}

impl LineOutcome {
    pub fn skip_reason(&self) -> Option<&'static str> {
        match self {
            LineOutcome::Sample(_) => None,
            LineOutcome::NoMatch => Some("no_match"),
            LineOutcome::BadNumber(_) => Some("bad_number"),
        }
    }
}

/// Stateless parser for one family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineParser {
    family: Family,
}

impl LineParser {
    pub fn new(family: Family) -> Self {
        Self { family }
    }

    pub fn numeric_kind(&self) -> NumericKind {
        self.family.rule().kind
    }

    /// Extract the value from `line`, or `None` when the line carries no sample
    pub fn parse(&self, line: &str) -> Option<SampleValue> {
        match self.classify(line) {
            LineOutcome::Sample(value) => Some(value),
            _ => None,
        }
    }

    pub fn classify(&self, line: &str) -> LineOutcome {
        let rule = self.family.rule();
        debug_assert_eq!(rule.family, self.family);

        let text = match &rule.extractor {
            Extractor::KeywordColumn { keyword, column } => {
                if !line.to_ascii_lowercase().contains(keyword) {
                    return LineOutcome::NoMatch;
                }
                match line.split_whitespace().nth(*column) {
                    Some(field) => field,
                    None => return LineOutcome::NoMatch,
                }
            }
            Extractor::Capture(pattern) => match pattern.captures(line).and_then(|c| c.get(1)) {
                Some(m) => m.as_str(),
                None => return LineOutcome::NoMatch,
            },
        };

        match convert(text, rule.kind) {
            Some(value) => LineOutcome::Sample(value),
            None => LineOutcome::BadNumber(text.to_string()),
        }
    }
}

fn convert(text: &str, kind: NumericKind) -> Option<SampleValue> {
    match kind {
        NumericKind::Integer => text.parse::<i64>().ok().map(SampleValue::Integer),
        NumericKind::Float => text
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(SampleValue::Float),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(family: Family, line: &str) -> Option<SampleValue> {
        LineParser::new(family).parse(line)
    }

    #[test]
    fn test_rule_table_order_matches_families() {
        for family in Family::ALL {
            assert_eq!(family.rule().family, *family);
        }
    }

    #[test]
    fn test_keyword_column_takes_fourth_field() {
        assert_eq!(
            parse(Family::KeywordColumn, "worker total 1 3000 ok"),
            Some(SampleValue::Integer(3000))
        );
        assert_eq!(
            parse(Family::KeywordColumn, "2024-05-01 TOTAL: 7 42"),
            Some(SampleValue::Integer(42))
        );
    }

    #[test]
    fn test_keyword_column_skips_short_or_non_numeric_lines() {
        assert_eq!(parse(Family::KeywordColumn, "total 1 2"), None);
        assert_eq!(parse(Family::KeywordColumn, "worker idle 1 3000"), None);
        assert_eq!(
            LineParser::new(Family::KeywordColumn).classify("worker total 1 lots"),
            LineOutcome::BadNumber("lots".to_string())
        );
    }

    #[test]
    fn test_gpu_rate() {
        assert_eq!(
            parse(Family::GpuRate, "gpu[*]: (1m - 1234) something"),
            Some(SampleValue::Integer(1234))
        );
        assert_eq!(parse(Family::GpuRate, "gpu busy"), None);
        assert_eq!(parse(Family::GpuRate, "gpu[0]: (1m - 99)"), None);
    }

    #[test]
    fn test_proof_rate() {
        assert_eq!(
            parse(Family::ProofRate, "1min-proof-rate: 56"),
            Some(SampleValue::Integer(56))
        );
        assert_eq!(parse(Family::ProofRate, "1min-proof-rate: abc"), None);
        assert_eq!(
            LineParser::new(Family::ProofRate).classify("1min-proof-rate: abc"),
            LineOutcome::NoMatch
        );
    }

    #[test]
    fn test_instant_rate_is_float() {
        assert_eq!(
            parse(Family::InstantRate, "instant rate: 12.34 now"),
            Some(SampleValue::Float(12.34))
        );
        assert_eq!(
            parse(Family::InstantRate, "instant rate: 7"),
            Some(SampleValue::Float(7.0))
        );
        assert_eq!(LineParser::new(Family::InstantRate).numeric_kind(), NumericKind::Float);
    }

    #[test]
    fn test_pool_rate() {
        assert_eq!(
            parse(Family::PoolRate, "[pool] proof rate 78/s"),
            Some(SampleValue::Integer(78))
        );
        assert_eq!(parse(Family::PoolRate, "proof rate 78 per second"), None);
    }

    #[test]
    fn test_integer_overflow_is_not_a_sample() {
        assert_eq!(parse(Family::PoolRate, "proof rate 99999999999999999999/s"), None);
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let parser = LineParser::new(Family::GpuRate);
        let line = "gpu[*]: (1m - 512) (5m - 498)";
        assert_eq!(parser.classify(line), parser.classify(line));
        assert_eq!(parser.parse(line), Some(SampleValue::Integer(512)));
    }

    #[test]
    fn test_sample_value_exposition_format() {
        assert_eq!(SampleValue::Integer(3000).to_string(), "3000");
        assert_eq!(SampleValue::Float(12.34).to_string(), "12.34");
        assert_eq!(SampleValue::Float(f64::NAN).to_string(), "NaN");
        assert_eq!(SampleValue::Float(f64::INFINITY).to_string(), "+Inf");
    }
}
