//! MCP Tool Registry
//!
//! Explicit, immutable-after-startup mapping of tool names to compiled tools.
//! Built once from an API description and shared (behind an `Arc`) with every
//! transport. Identical names resolve last-registration-wins; each displacement
//! is reported rather than silently dropped.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::ApiConfig;
use crate::mcp::gateway::generator::{CompiledTool, ToolCompiler};
use crate::mcp::protocol::Tool;
use crate::openapi::document::ApiDocument;

/// Two operations that compiled to the same tool name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    pub name: String,
    /// `METHOD path` of the tool that was replaced
    pub displaced: String,
    /// `METHOD path` of the tool that now owns the name
    pub replacement: String,
}

/// Outcome of registering a batch of compiled tools
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    /// Number of registrations attempted
    pub registered: usize,
    pub collisions: Vec<NameCollision>,
}

impl RegistrationReport {
    pub fn has_collisions(&self) -> bool {
        !self.collisions.is_empty()
    }
}

fn describe(tool: &CompiledTool) -> String {
    format!("{} {}", tool.http_method(), tool.path_template)
}

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, CompiledTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, returning the tool it displaced (if any)
    pub fn register(&mut self, tool: CompiledTool) -> Option<CompiledTool> {
        self.tools.insert(tool.name.clone(), tool)
    }

    /// Register a batch, logging and reporting name collisions
    pub fn register_all(&mut self, tools: Vec<CompiledTool>) -> RegistrationReport {
        let mut report = RegistrationReport::default();

        for tool in tools {
            let name = tool.name.clone();
            let replacement = describe(&tool);
            report.registered += 1;

            if let Some(displaced) = self.register(tool) {
                let displaced = describe(&displaced);
                warn!(
                    tool_name = %name,
                    displaced = %displaced,
                    replacement = %replacement,
                    "Tool name collision, later operation wins"
                );
                report.collisions.push(NameCollision { name, displaced, replacement });
            }
        }

        report
    }

    /// Compile `document` under `config` into a fresh registry
    pub fn from_document(document: &ApiDocument, config: &ApiConfig) -> (Self, RegistrationReport) {
        let tools = ToolCompiler::new(config).compile(document);
        let mut registry = Self::new();
        let report = registry.register_all(tools);

        info!(
            tools = registry.len(),
            collisions = report.collisions.len(),
            "Registered API tools"
        );

        (registry, report)
    }

    pub fn get(&self, name: &str) -> Option<&CompiledTool> {
        self.tools.get(name)
    }

    /// Protocol definitions of every tool, ordered by name
    pub fn list(&self) -> Vec<Tool> {
        self.tools.values().map(CompiledTool::to_tool).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledTool> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
