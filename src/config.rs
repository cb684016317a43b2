//! Client-wide settings.

use std::env;
use std::time::Duration;

use crate::Error;

/// Overall deadline for a single generation request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Silence on the reasoning channel after which the answer phase is assumed.
pub const DEFAULT_THINKING_IDLE_THRESHOLD: Duration = Duration::from_millis(500);

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Consecutive malformed chunks tolerated before a stream is aborted.
pub const DEFAULT_MAX_PARSE_FAILURES: u32 = 3;

/// Settings shared by every provider client created from one registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub thinking_idle_threshold: Duration,
    pub max_parse_failures: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            thinking_idle_threshold: DEFAULT_THINKING_IDLE_THRESHOLD,
            max_parse_failures: DEFAULT_MAX_PARSE_FAILURES,
        }
    }
}

impl ClientConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_thinking_idle_threshold(mut self, threshold: Duration) -> Self {
        self.thinking_idle_threshold = threshold;
        self
    }

    /// Create configuration from environment variables, falling back to defaults.
    ///
    /// Recognised variables: `GENSTREAM_TIMEOUT_SECS`, `GENSTREAM_CONNECT_TIMEOUT_SECS`,
    /// `GENSTREAM_THINKING_IDLE_MS`, `GENSTREAM_MAX_PARSE_FAILURES`.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64>(&lookup, "GENSTREAM_TIMEOUT_SECS")? {
            if secs == 0 {
                return Err(Error::config("GENSTREAM_TIMEOUT_SECS must be positive"));
            }
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "GENSTREAM_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "GENSTREAM_THINKING_IDLE_MS")? {
            config.thinking_idle_threshold = Duration::from_millis(ms);
        }
        if let Some(limit) = parse_var::<u32>(&lookup, "GENSTREAM_MAX_PARSE_FAILURES")? {
            config.max_parse_failures = limit;
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, Error> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::config(format!("{key} must be a non-negative integer, got '{raw}'"))),
        _ => Ok(None),
    }
}
