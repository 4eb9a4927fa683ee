//! Gateway Tool Compiler
//!
//! Turns each eligible `(path, method)` operation of an [`ApiDocument`] into an
//! immutable [`CompiledTool`]: the request template a single generic dispatcher
//! needs, plus the MCP-facing name, description and input schema.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::filter::OperationFilter;
use crate::config::ApiConfig;
use crate::mcp::protocol::Tool;
use crate::openapi::document::{
    join_url, ApiDocument, Operation, ParameterLocation, ParameterSpec, PropertySpec,
};

/// Matches `{name}` placeholders in a path template
static PATH_PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([^}]+)\}").expect("PATH_PLACEHOLDER_REGEX should be a valid regex pattern")
});

/// Request template for one operation
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTool {
    /// `{method}_{path template without braces}`
    pub name: String,
    /// Method key as written in the document
    pub method: String,
    pub path_template: String,
    /// Absolute URL with `{name}` placeholders still present
    pub url_template: String,
    pub path_params: Vec<String>,
    pub query_params: Vec<String>,
    pub header_params: Vec<String>,
    /// Body field name to declared type tag
    pub body_fields: BTreeMap<String, String>,
    pub summary: String,
    pub description: String,
    pub input_schema: Value,
}

impl CompiledTool {
    /// Outbound HTTP method, upper-cased
    pub fn http_method(&self) -> String {
        self.method.to_ascii_uppercase()
    }

    /// Protocol-level tool definition for `tools/list`
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            title: (!self.summary.is_empty()).then(|| self.summary.clone()),
            description: Some(self.description.clone()),
            input_schema: self.input_schema.clone(),
        }
    }

    /// Placeholders that appear in the path template but are not declared as
    /// path parameters
    pub fn undeclared_placeholders(&self) -> Vec<String> {
        PATH_PLACEHOLDER_REGEX
            .captures_iter(&self.path_template)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
            .filter(|name| !self.path_params.contains(name))
            .collect()
    }
}

/// Tool name for an operation: `{method}_{path}` with `{` and `}` removed
pub fn tool_name(method: &str, path_template: &str) -> String {
    format!("{}_{}", method, path_template.replace(['{', '}'], ""))
}

/// Usage guidance shown to the calling agent
pub fn tool_description(summary: &str, description: &str) -> String {
    format!(
        "Use this tool only when the request exactly matches {summary} or {description}. \
         If you do not have a required parameter, always ask the user for it; \
         *never fill in a parameter on your own or leave it empty*. \
         If the result contains [Error], state only that error in your response and stop there. \
         *Never keep records from responses in memory, for example lists of users or orders*"
    )
}

/// Compiles documents into tools under a fixed filter and base URL override
#[derive(Debug, Clone, Default)]
pub struct ToolCompiler {
    filter: OperationFilter,
    base_url_override: Option<String>,
}

impl ToolCompiler {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            filter: OperationFilter::from_config(config),
            base_url_override: config.base_url.clone(),
        }
    }

    /// Base URL used for every tool of `document`
    pub fn base_url(&self, document: &ApiDocument) -> String {
        match &self.base_url_override {
            Some(base) => base.clone(),
            None => document.base_url(),
        }
    }

    /// Compile every eligible operation, in path then method order
    pub fn compile(&self, document: &ApiDocument) -> Vec<CompiledTool> {
        let base = self.base_url(document);
        let mut tools = Vec::new();

        for (path, item) in &document.paths {
            if !self.filter.include_path(path) {
                debug!(path = %path, "Path filtered out");
                continue;
            }

            for (method, operation) in &item.operations {
                if !self.filter.include_method(method) {
                    debug!(path = %path, method = %method, "Method filtered out");
                    continue;
                }

                let params = item.effective_parameters(operation);
                tools.push(self.compile_operation(document, &base, path, method, operation, &params));
            }
        }

        tools
    }

    fn compile_operation(
        &self,
        document: &ApiDocument,
        base: &str,
        path: &str,
        method: &str,
        operation: &Operation,
        params: &[ParameterSpec],
    ) -> CompiledTool {
        let mut properties = Map::new();
        let mut required: Vec<String> = Vec::new();

        let mut header_params = Vec::new();
        let mut query_params = Vec::new();
        let mut path_params = Vec::new();
        let mut body_fields = BTreeMap::new();

        for location in [ParameterLocation::Header, ParameterLocation::Query, ParameterLocation::Path] {
            for param in params.iter().filter(|p| p.location == location) {
                properties.insert(
                    param.name.clone(),
                    json!({
                        "type": "string",
                        "description": format!("The data for {}", param.name)
                    }),
                );
                if param.required && !required.contains(&param.name) {
                    required.push(param.name.clone());
                }
                match location {
                    ParameterLocation::Header => header_params.push(param.name.clone()),
                    ParameterLocation::Query => query_params.push(param.name.clone()),
                    _ => path_params.push(param.name.clone()),
                }
            }
        }

        for param in params.iter().filter(|p| p.location == ParameterLocation::Body) {
            for (prop_name, prop) in body_properties(document, param) {
                let type_tag = prop.type_tag();
                properties.insert(
                    prop_name.clone(),
                    json!({
                        "type": "string",
                        "description": format!(
                            "The data for {prop_name}, it should be in format of {type_tag}"
                        )
                    }),
                );
                if !required.contains(&prop_name) {
                    required.push(prop_name.clone());
                }
                body_fields.insert(prop_name, type_tag);
            }
        }

        let tool = CompiledTool {
            name: tool_name(method, path),
            method: method.to_string(),
            path_template: path.to_string(),
            url_template: join_url(base, path),
            path_params,
            query_params,
            header_params,
            body_fields,
            summary: operation.summary.clone(),
            description: tool_description(&operation.summary, &operation.description),
            input_schema: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        };

        let undeclared = tool.undeclared_placeholders();
        if !undeclared.is_empty() {
            debug!(tool_name = %tool.name, placeholders = ?undeclared, "Path placeholders without declared parameters");
        }

        tool
    }
}

/// First-level properties of a body parameter's schema. Inline properties win
/// over a reference; an unresolved reference yields no fields.
fn body_properties(document: &ApiDocument, param: &ParameterSpec) -> Vec<(String, PropertySpec)> {
    if let Some(inline) = param
        .schema
        .as_ref()
        .filter(|s| s.reference.is_empty())
        .and_then(|s| s.properties.as_ref())
    {
        return inline.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    }

    let schema_name = param.schema_name();
    match document.schema(&schema_name) {
        Some(definition) => {
            definition.properties.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        }
        None => {
            warn!(
                parameter = %param.name,
                schema = %schema_name,
                "Body schema not found, no body fields generated"
            );
            Vec::new()
        }
    }
}

/// Compile `document` with the filters and base URL override of `config`
pub fn compile(document: &ApiDocument, config: &ApiConfig) -> Vec<CompiledTool> {
    ToolCompiler::new(config).compile(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn petstore() -> ApiDocument {
        serde_json::from_value(json!({
            "swagger": "2.0",
            "host": "petstore.example.com",
            "basePath": "/v2",
            "paths": {
                "/pets/{petId}": {
                    "get": {
                        "summary": "Find pet by ID",
                        "description": "Returns a single pet",
                        "parameters": [
                            {"name": "petId", "in": "path", "required": true, "type": "string"},
                            {"name": "X-Trace", "in": "header", "required": false, "type": "string"},
                            {"name": "fields", "in": "query", "type": "string"}
                        ]
                    },
                    "delete": {"summary": "Delete pet"}
                },
                "/pets": {
                    "post": {
                        "summary": "Add pet",
                        "parameters": [
                            {"name": "body", "in": "body", "required": true, "schema": {"$ref": "#/definitions/Pet"}}
                        ]
                    }
                },
                "/orders": {
                    "post": {
                        "parameters": [
                            {"name": "body", "in": "body", "schema": {"$ref": "#/definitions/Missing"}}
                        ]
                    }
                }
            },
            "definitions": {
                "Pet": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "age": {"type": "int"},
                        "vaccinated": {"type": "bool"}
                    }
                }
            }
        }))
        .expect("valid document")
    }

    fn find<'a>(tools: &'a [CompiledTool], name: &str) -> &'a CompiledTool {
        tools.iter().find(|t| t.name == name).unwrap_or_else(|| panic!("tool {name} missing"))
    }

    #[test]
    fn test_tool_name_strips_braces() {
        assert_eq!(tool_name("get", "/users/{id}"), "get_/users/id");
        assert_eq!(tool_name("POST", "/a/{b}/{c}"), "POST_/a/b/c");
    }

    #[test]
    fn test_compile_all_operations() {
        let tools = compile(&petstore(), &ApiConfig::default());
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["post_/orders", "post_/pets", "delete_/pets/petId", "get_/pets/petId"]);
    }

    #[test]
    fn test_parameter_partition_and_schema() {
        let tools = compile(&petstore(), &ApiConfig::default());
        let tool = find(&tools, "get_/pets/petId");

        assert_eq!(tool.url_template, "https://petstore.example.com/v2/pets/{petId}");
        assert_eq!(tool.path_params, vec!["petId"]);
        assert_eq!(tool.header_params, vec!["X-Trace"]);
        assert_eq!(tool.query_params, vec!["fields"]);
        assert!(tool.body_fields.is_empty());
        assert_eq!(tool.http_method(), "GET");

        let schema = &tool.input_schema;
        assert_eq!(schema["properties"]["petId"]["type"], "string");
        assert_eq!(schema["properties"]["petId"]["description"], "The data for petId");
        assert_eq!(schema["required"], json!(["petId"]));
        assert!(tool.description.contains("Find pet by ID"));
        assert!(tool.description.contains("Returns a single pet"));
    }

    #[test]
    fn test_body_fields_resolved_and_required() {
        let tools = compile(&petstore(), &ApiConfig::default());
        let tool = find(&tools, "post_/pets");

        assert_eq!(tool.body_fields.get("age").map(String::as_str), Some("int"));
        assert_eq!(tool.body_fields.get("vaccinated").map(String::as_str), Some("bool"));
        assert_eq!(tool.body_fields.len(), 3);
        assert_eq!(
            tool.input_schema["properties"]["age"]["description"],
            "The data for age, it should be in format of int"
        );
        let required = tool.input_schema["required"].as_array().expect("required array");
        assert_eq!(required.len(), 3);
    }

    #[test]
    fn test_missing_definition_yields_no_body_fields() {
        let tools = compile(&petstore(), &ApiConfig::default());
        let tool = find(&tools, "post_/orders");
        assert!(tool.body_fields.is_empty());
    }

    #[test]
    fn test_filters_applied() {
        let config = ApiConfig {
            include_paths: vec!["^/pets".to_string()],
            exclude_methods: vec!["DELETE".to_string()],
            ..Default::default()
        };
        let tools = compile(&petstore(), &config);
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["post_/pets", "get_/pets/petId"]);
    }

    #[test]
    fn test_base_url_override_used_verbatim() {
        let config = ApiConfig {
            base_url: Some("http://localhost:8080/".to_string()),
            ..Default::default()
        };
        let tools = compile(&petstore(), &config);
        assert_eq!(find(&tools, "post_/pets").url_template, "http://localhost:8080/pets");
    }

    #[test]
    fn test_compile_is_idempotent() {
        let doc = petstore();
        let config = ApiConfig::default();
        assert_eq!(compile(&doc, &config), compile(&doc, &config));
    }

    #[test]
    fn test_inline_request_body_schema() {
        let doc: ApiDocument = serde_json::from_value(json!({
            "openapi": "3.0.0",
            "servers": [{"url": "https://api.example.com"}],
            "paths": {
                "/notes": {
                    "post": {
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {"text": {"type": "string"}, "tags": {"type": "array"}}
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }))
        .expect("valid document");

        let tools = compile(&doc, &ApiConfig::default());
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].body_fields.get("tags").map(String::as_str), Some("array"));
        assert_eq!(tools[0].url_template, "https://api.example.com/notes");
    }

    #[test]
    fn test_to_tool() {
        let tools = compile(&petstore(), &ApiConfig::default());
        let tool = find(&tools, "get_/pets/petId").to_tool();
        assert_eq!(tool.name, "get_/pets/petId");
        assert_eq!(tool.title.as_deref(), Some("Find pet by ID"));
        assert!(tool.description.is_some());
    }

    #[test]
    fn test_undeclared_placeholders() {
        let tools = compile(&petstore(), &ApiConfig::default());
        assert_eq!(find(&tools, "delete_/pets/petId").undeclared_placeholders(), vec!["petId"]);
        assert!(find(&tools, "get_/pets/petId").undeclared_placeholders().is_empty());
    }
}
