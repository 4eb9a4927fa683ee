//! MCP (Model Context Protocol) Server Implementation
//!
//! Exposes the tools compiled from an API description over stdio or HTTP and
//! dispatches `tools/call` to the upstream API.

pub mod cancellation;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod http;
pub mod protocol;
pub mod server;
pub mod tool_registry;

pub use cancellation::{CallGuard, CancellationManager};
pub use error::McpError;
pub use gateway::{CallContext, CompiledTool, ToolCompiler, ToolDispatcher};
pub use handler::{McpHandler, ServerIdentity};
pub use http::{router, serve_http, HttpState};
pub use protocol::*;
pub use server::McpStdioServer;
pub use tool_registry::{RegistrationReport, ToolRegistry};
