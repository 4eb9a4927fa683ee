//! # Configuration Management
//!
//! Settings consumed by the tool compiler, the dispatcher and the transports.
//! Values arrive from CLI flags (each with an environment-variable twin, see
//! [`crate::cli`]) and are normalised here: comma-separated lists are split and
//! trimmed, header pairs are parsed, and the spec size limit is resolved.

use std::time::Duration;

use tracing::warn;

use crate::mcp::gateway::security::SecurityConfig;

/// Environment variable consulted for the maximum spec size when no explicit value is set
pub const MAX_SPEC_SIZE_ENV: &str = "SWAGGER_MCP_MAX_SPEC_SIZE";

/// Default maximum spec document size (10 MiB)
pub const DEFAULT_MAX_SPEC_SIZE: u64 = 10 * 1024 * 1024;

/// Default per-call upstream timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid size: {0}")]
    InvalidSize(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

/// API-facing configuration: what to compile and how to call the upstream API
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Verbatim base URL; overrides anything derived from the document
    pub base_url: Option<String>,
    /// Path regexes; empty means every path is a candidate
    pub include_paths: Vec<String>,
    /// Path regexes that always reject
    pub exclude_paths: Vec<String>,
    /// HTTP methods (case-insensitive); empty means every method is a candidate
    pub include_methods: Vec<String>,
    /// HTTP methods that always reject
    pub exclude_methods: Vec<String>,
    /// Authentication applied to every outbound call
    pub security: SecurityConfig,
    /// Headers appended to every outbound call
    pub custom_headers: Vec<(String, String)>,
    /// Inbound transport headers forwarded to the upstream API
    pub forward_headers: Vec<String>,
    /// Upstream call timeout
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            include_paths: Vec::new(),
            exclude_paths: Vec::new(),
            include_methods: Vec::new(),
            exclude_methods: Vec::new(),
            security: SecurityConfig::default(),
            custom_headers: Vec::new(),
            forward_headers: Vec::new(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    /// Build an `ApiConfig` from the raw comma-separated strings of the CLI layer
    #[allow(clippy::too_many_arguments)]
    pub fn from_raw(
        base_url: Option<String>,
        include_paths: Option<&str>,
        exclude_paths: Option<&str>,
        include_methods: Option<&str>,
        exclude_methods: Option<&str>,
        security: SecurityConfig,
        headers: Option<&str>,
        forward_headers: Option<&str>,
        request_timeout_secs: u64,
    ) -> Result<Self, ConfigError> {
        if request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout",
                message: "must be at least 1 second".to_string(),
            });
        }

        Ok(Self {
            base_url: base_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
            include_paths: split_list(include_paths.unwrap_or_default()),
            exclude_paths: split_list(exclude_paths.unwrap_or_default()),
            include_methods: split_list(include_methods.unwrap_or_default()),
            exclude_methods: split_list(exclude_methods.unwrap_or_default()),
            security,
            custom_headers: parse_header_pairs(headers.unwrap_or_default()),
            forward_headers: split_list(forward_headers.unwrap_or_default()),
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }
}

/// Which transport exposes the compiled tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    /// Line-delimited JSON-RPC over stdin/stdout
    Stdio,
    /// JSON-RPC over `POST /mcp`
    Http { bind_address: String },
}

/// Logging output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub verbose: bool,
    pub format: LogFormat,
}

/// Maximum number of bytes accepted when reading a spec document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecSizeLimit(pub u64);

impl Default for SpecSizeLimit {
    fn default() -> Self {
        Self(DEFAULT_MAX_SPEC_SIZE)
    }
}

impl SpecSizeLimit {
    /// Resolve the limit: explicit value, then environment, then the default.
    ///
    /// An invalid explicit value is an error; an invalid environment value is
    /// ignored with a warning.
    pub fn resolve(explicit: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(raw) = explicit {
            return parse_size(raw).map(Self);
        }

        match std::env::var(MAX_SPEC_SIZE_ENV) {
            Ok(raw) if !raw.trim().is_empty() => match parse_size(&raw) {
                Ok(bytes) => Ok(Self(bytes)),
                Err(e) => {
                    warn!(env = MAX_SPEC_SIZE_ENV, value = %raw, error = %e, "Ignoring invalid spec size");
                    Ok(Self::default())
                }
            },
            _ => Ok(Self::default()),
        }
    }

    pub fn bytes(&self) -> u64 {
        self.0
    }
}

/// Parse a byte size: a plain integer or one suffixed with `KB`, `MB` or `GB` (binary multiples).
pub fn parse_size(raw: &str) -> Result<u64, ConfigError> {
    let normalized = raw.trim().to_ascii_uppercase();

    let (digits, multiplier) = if let Some(n) = normalized.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = normalized.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = normalized.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else {
        (normalized.as_str(), 1)
    };

    let value: u64 =
        digits.trim().parse().map_err(|_| ConfigError::InvalidSize(raw.to_string()))?;

    match value.checked_mul(multiplier) {
        Some(0) | None => Err(ConfigError::InvalidSize(raw.to_string())),
        Some(bytes) => Ok(bytes),
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Parse `name=value` pairs separated by commas; malformed pairs and empty names are skipped
pub fn parse_header_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}
