//! Readiness extraction from the status payloads the control planes return.
//!
//! The postgres operator reports its cluster status as a map-like bracket
//! dump, while pod and job probes return a single quoted boolean. Which
//! format applies is decided by the resource kind.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::resource::ResourceKind;

const RUNNING: &str = "Running";

static BRACKETED_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m).*:(.*)]").expect("bracketed status pattern"));

/// Whether a resource has converged to a serving state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadinessStatus {
    pub ready: bool,
}

impl ReadinessStatus {
    pub const READY: Self = Self { ready: true };
    pub const NOT_READY: Self = Self { ready: false };
}

impl From<bool> for ReadinessStatus {
    fn from(ready: bool) -> Self {
        Self { ready }
    }
}

/// Shape of a status payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFormat {
    /// `map[PostgresClusterStatus:Running]`, the value of the last
    /// `key: value]` segment must be `Running`
    BracketedKeyValue,
    /// `'true'` or `'false'`
    QuotedBoolean,
}

impl StatusFormat {
    pub fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::DatabaseCluster => Self::BracketedKeyValue,
            ResourceKind::Operator
            | ResourceKind::CoordinationCluster
            | ResourceKind::StreamingCluster
            | ResourceKind::Job => Self::QuotedBoolean,
        }
    }

    /// Anything that cannot be parsed is reported as not ready
    pub fn parse(&self, raw: &str) -> ReadinessStatus {
        match self {
            Self::BracketedKeyValue => BRACKETED_VALUE
                .captures(raw)
                .and_then(|captures| captures.get(1))
                .map(|value| value.as_str().trim() == RUNNING)
                .unwrap_or(false)
                .into(),
            Self::QuotedBoolean => raw
                .trim()
                .trim_matches(|c| c == '\'' || c == '"')
                .eq_ignore_ascii_case("true")
                .into(),
        }
    }
}

pub fn parse_readiness(kind: ResourceKind, raw: &str) -> ReadinessStatus {
    StatusFormat::for_kind(kind).parse(raw)
}
