//! Shared configuration for the beacon notification server and its clients.
//!
//! Values are layered by [`ortho_config`]: built-in defaults first, then an
//! optional configuration file (`--config-path` or `BEACON_CONFIG_PATH`), then
//! `BEACON_*` environment variables, and finally command-line flags.

mod defaults;
mod listen;
mod logging;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_AUDIT_QUERY_LIMIT, DEFAULT_HOST, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_LOG_FILTER,
    DEFAULT_MAX_REQUEST_BYTES, DEFAULT_PORT, default_listen_address, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use listen::{ListenAddress, ListenAddressParseError};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "BEACON")]
pub struct Config {
    /// Address the listener binds.
    #[ortho_config(default = defaults::default_listen_address())]
    pub listen: ListenAddress,
    /// Seconds to wait for a request line before dropping the connection.
    /// Zero disables the timeout.
    #[ortho_config(default = defaults::DEFAULT_IDLE_TIMEOUT_SECS)]
    pub idle_timeout_secs: u64,
    /// Largest accepted request line in bytes.
    #[ortho_config(default = defaults::DEFAULT_MAX_REQUEST_BYTES)]
    pub max_request_bytes: usize,
    /// Cap on audit entries returned per `listlog` request; zero is unlimited.
    #[ortho_config(default = defaults::DEFAULT_AUDIT_QUERY_LIMIT)]
    pub audit_query_limit: usize,
    /// Directory for the persistent record store and audit log. When unset
    /// both live in memory for the lifetime of the process.
    pub data_dir: Option<Utf8PathBuf>,
    /// `tracing_subscriber` filter expression.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log events.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen_address(),
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            audit_query_limit: DEFAULT_AUDIT_QUERY_LIMIT,
            data_dir: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Address the listener binds.
    #[must_use]
    pub fn listen(&self) -> &ListenAddress {
        &self.listen
    }

    /// Idle read timeout, or `None` when disabled.
    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    /// Largest accepted request line in bytes.
    #[must_use]
    pub const fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }

    /// Cap on audit entries per `listlog`, or `None` when unlimited.
    #[must_use]
    pub fn audit_query_limit(&self) -> Option<usize> {
        (self.audit_query_limit > 0).then_some(self.audit_query_limit)
    }

    /// Directory for persistent state, when configured.
    #[must_use]
    pub fn data_dir(&self) -> Option<&Utf8Path> {
        self.data_dir.as_deref()
    }

    /// Filter expression for the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for log events.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.listen().to_string(), "tcp://127.0.0.1:8080");
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.audit_query_limit(), Some(100));
        assert!(config.data_dir().is_none());
        assert_eq!(config.log_format(), LogFormat::Json);
    }

    #[test]
    fn zero_values_disable_limits() {
        let config = Config {
            idle_timeout_secs: 0,
            audit_query_limit: 0,
            ..Config::default()
        };
        assert_eq!(config.idle_timeout(), None);
        assert_eq!(config.audit_query_limit(), None);
    }
}
