//! # Structured Logging
//!
//! Logging always goes to stderr: in stdio mode stdout carries the MCP
//! protocol stream and must never see a log line.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Create a tracing span for a single tool invocation.
///
/// ```rust,ignore
/// let span = tool_call_span!("GET_users_id");
/// let span = tool_call_span!("GET_users_id", method = "GET");
/// ```
#[macro_export]
macro_rules! tool_call_span {
    ($tool:expr) => {
        tracing::info_span!(
            "tool_call",
            tool_name = %$tool,
            request_id = %uuid::Uuid::new_v4()
        )
    };
    ($tool:expr, $($field:tt)*) => {
        tracing::info_span!(
            "tool_call",
            tool_name = %$tool,
            request_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Create a tracing span for an inbound MCP request
#[macro_export]
macro_rules! mcp_request_span {
    ($method:expr, $transport:expr) => {
        tracing::debug_span!(
            "mcp_request",
            method = %$method,
            transport = %$transport,
            request_id = %uuid::Uuid::new_v4()
        )
    };
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if config.verbose { "swagger_mcp=debug,info" } else { "info" })
    })
}

/// Install the global subscriber. A subscriber that is already installed is
/// left in place.
pub fn init_logging(config: &LoggingConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(std::io::stderr)
        .with_target(true);

    let result = match config.format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };

    if result.is_err() {
        tracing::debug!("Global tracing subscriber already installed");
    }
}

/// Log the effective startup configuration
pub fn log_startup_info(
    source: &str,
    base_url: &str,
    tool_count: usize,
    transport: &crate::config::TransportConfig,
) {
    tracing::info!(
        spec = %source,
        base_url = %base_url,
        tools = tool_count,
        transport = ?transport,
        "swagger-mcp configuration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;

    #[test]
    fn test_macros_compile() {
        let _span = tool_call_span!("GET_users");
        let _span = tool_call_span!("GET_users", method = "GET");
        let _span = mcp_request_span!("tools/call", "stdio");
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        let config = LoggingConfig { verbose: true, format: LogFormat::Json };
        init_logging(&config);
        init_logging(&LoggingConfig::default());
    }

    #[test]
    fn test_log_startup_info() {
        log_startup_info("petstore.json", "https://petstore.example.com", 3, &TransportConfig::Stdio);
    }
}
