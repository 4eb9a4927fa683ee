//! Gateway API Tool Generation and Execution
//!
//! Compiles API description operations into MCP tools and executes tool calls
//! as HTTP requests against the described API.

pub mod executor;
pub mod filter;
pub mod generator;
pub mod security;

pub use executor::{CallContext, DispatchError, ToolArguments, ToolDispatcher};
pub use filter::OperationFilter;
pub use generator::{CompiledTool, ToolCompiler};
pub use security::{SecurityConfig, SecurityScheme};
