//! # swagger-mcp
//!
//! Turns a Swagger 2.0 / OpenAPI 3.0 JSON document into a set of MCP
//! (Model Context Protocol) tools, one per HTTP operation, and executes tool
//! calls as real HTTP requests against the described API.
//!
//! ## Architecture
//!
//! ```text
//! spec loader → tool compiler → tool registry → MCP handler → stdio / HTTP transport
//!                                                    ↓
//!                                            request dispatcher → upstream API
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use swagger_mcp::config::{ApiConfig, SpecSizeLimit};
//! use swagger_mcp::mcp::{McpHandler, McpStdioServer, ServerIdentity, ToolDispatcher, ToolRegistry};
//! use swagger_mcp::openapi::load_spec;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ApiConfig::default();
//!     let document = load_spec("petstore.json", SpecSizeLimit::default()).await?;
//!     let (registry, _) = ToolRegistry::from_document(&document, &config);
//!     let handler = McpHandler::new(
//!         Arc::new(registry),
//!         Arc::new(ToolDispatcher::from_config(&config)),
//!         ServerIdentity::from_document(&document),
//!     );
//!     McpStdioServer::new(handler).run().await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod mcp;
pub mod observability;
pub mod openapi;

// Re-export commonly used types
pub use config::{ApiConfig, SpecSizeLimit, TransportConfig};
pub use errors::{Error, Result};
pub use observability::init_logging;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
