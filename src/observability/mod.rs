//! # Observability Infrastructure
//!
//! Structured logging for swagger-mcp: subscriber setup plus the span macros
//! used around MCP requests and tool calls.

pub mod logging;

pub use logging::{init_logging, log_startup_info};
