use crate::listen::ListenAddress;

/// Default TCP port for the notification server.
pub const DEFAULT_PORT: u16 = 8080;

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Seconds a connection may stay silent before its request is abandoned.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

/// Upper bound on a single request line, newline included.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Maximum number of audit entries returned by one `listlog` request.
pub const DEFAULT_AUDIT_QUERY_LIMIT: usize = 100;

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Computes the default listen address for the server.
pub fn default_listen_address() -> ListenAddress {
    ListenAddress::new(DEFAULT_HOST, DEFAULT_PORT)
}
