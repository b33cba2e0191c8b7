//! Orchestrator configuration — loaded from environment variables.

use std::str::FromStr;

/// Default marker that suppresses CI for a commit.
pub const DEFAULT_SKIP_MARKER: &str = "[ci skip]";

/// Default upper bound for a stored build trace (64KB).
pub const DEFAULT_MAX_TRACE_BYTES: usize = 65536;

/// Output format of the tracing subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CiConfig {
    /// Commit message marker that makes `ci_skip` report true.
    pub skip_marker: String,
    /// Maximum bytes of trace kept per build. Older output is dropped.
    pub max_trace_bytes: usize,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            skip_marker: DEFAULT_SKIP_MARKER.to_string(),
            max_trace_bytes: DEFAULT_MAX_TRACE_BYTES,
            log_format: LogFormat::Text,
        }
    }
}

impl CiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let skip_marker = lookup("CI_SKIP_MARKER")
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.skip_marker);
        let max_trace_bytes = parse_or(
            "CI_MAX_TRACE_BYTES",
            lookup("CI_MAX_TRACE_BYTES"),
            defaults.max_trace_bytes,
        );
        let log_format = parse_or("LOG_FORMAT", lookup("LOG_FORMAT"), defaults.log_format);

        if max_trace_bytes == 0 {
            tracing::warn!(
                "CI_MAX_TRACE_BYTES is 0 -- build traces will keep only the truncation marker"
            );
        }

        Self {
            skip_marker,
            max_trace_bytes,
            log_format,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        None => default,
        Some(raw) => match raw.parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!("{key}={raw:?} is not valid -- using default");
                default
            }
        },
    }
}
