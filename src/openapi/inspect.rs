//! Human-readable endpoint report for `swagger-mcp inspect`.

use std::fmt::Write as _;

use super::document::{extract_schema_name, ApiDocument, ResponseSpec};
use crate::config::ApiConfig;
use crate::mcp::gateway::generator::ToolCompiler;
use crate::mcp::tool_registry::ToolRegistry;

const SEPARATOR_WIDTH: usize = 72;

fn response_schema(response: &ResponseSpec) -> String {
    match &response.schema {
        Some(schema) if !schema.reference.is_empty() || !schema.schema_type.is_empty() => {
            extract_schema_name(&schema.reference, &schema.schema_type)
        }
        _ if !response.response_type.is_empty() => response.response_type.clone(),
        _ => "-".to_string(),
    }
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

/// Render every eligible operation of `document` under the filters of `config`,
/// followed by the tool names `serve` would register.
pub fn render_report(document: &ApiDocument, config: &ApiConfig) -> String {
    let compiler = ToolCompiler::new(config);
    let tools = compiler.compile(document);
    let mut out = String::new();

    let _ = writeln!(out, "API: {} ({})", document.title().unwrap_or("untitled"), document.api_version());
    let _ = writeln!(out, "Base URL: {}", compiler.base_url(document));
    let _ = writeln!(out, "Operations: {}", tools.len());

    for tool in &tools {
        let operation = document
            .paths
            .get(&tool.path_template)
            .and_then(|item| item.operations.get(&tool.method));

        let _ = writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH));
        let _ = writeln!(out, "{} {}", tool.http_method(), tool.url_template);
        let _ = writeln!(out, "  Summary:      {}", or_dash(&tool.summary));
        let _ = writeln!(
            out,
            "  Description:  {}",
            or_dash(operation.map(|o| o.description.as_str()).unwrap_or_default())
        );
        let _ = writeln!(out, "  Headers:      {}", join_or_dash(&tool.header_params));
        let _ = writeln!(out, "  Path params:  {}", join_or_dash(&tool.path_params));
        let _ = writeln!(out, "  Query params: {}", join_or_dash(&tool.query_params));

        if tool.body_fields.is_empty() {
            let _ = writeln!(out, "  Body:         -");
        } else {
            let _ = writeln!(out, "  Body:");
            for (field, type_tag) in &tool.body_fields {
                let _ = writeln!(out, "    {field}: {type_tag}");
            }
        }

        match operation.filter(|o| !o.responses.is_empty()) {
            Some(operation) => {
                let _ = writeln!(out, "  Responses:");
                for (status, response) in &operation.responses {
                    let _ = writeln!(
                        out,
                        "    {status}: {} {}",
                        response_schema(response),
                        response.description
                    );
                }
            }
            None => {
                let _ = writeln!(out, "  Responses:    -");
            }
        }
    }

    let mut registry = ToolRegistry::new();
    let report = registry.register_all(tools);

    let _ = writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH));
    let _ = writeln!(out, "Tools ({}):", registry.len());
    for name in registry.names() {
        let _ = writeln!(out, "  {name}");
    }
    for collision in &report.collisions {
        let _ = writeln!(
            out,
            "  ! {} registered by {} replaced {}",
            collision.name, collision.replacement, collision.displaced
        );
    }

    out
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi::loader::parse_document;

    const PETSTORE: &str = r##"{
        "swagger": "2.0",
        "info": {"title": "Petstore", "version": "2.1.0"},
        "host": "petstore.example.com",
        "basePath": "/v1",
        "paths": {
            "/pets/{petId}": {
                "get": {
                    "summary": "Find pet",
                    "description": "Returns a single pet",
                    "parameters": [
                        {"name": "petId", "in": "path", "required": true, "type": "string"},
                        {"name": "X-Trace", "in": "header", "type": "string"}
                    ],
                    "responses": {
                        "200": {"description": "ok", "schema": {"$ref": "#/definitions/Pet"}},
                        "404": {"description": "missing"}
                    }
                }
            },
            "/pets": {
                "post": {
                    "parameters": [
                        {"name": "body", "in": "body", "schema": {"$ref": "#/definitions/Pet"}}
                    ]
                },
                "delete": {}
            }
        },
        "definitions": {
            "Pet": {"type": "object", "properties": {"name": {"type": "string"}, "age": {"type": "int"}}}
        }
    }"##;

    #[test]
    fn test_report_lists_operation_details() {
        let document = parse_document(PETSTORE.as_bytes()).expect("valid document");
        let report = render_report(&document, &ApiConfig::default());

        assert!(report.contains("API: Petstore (2.1.0)"));
        assert!(report.contains("GET https://petstore.example.com/v1/pets/{petId}"));
        assert!(report.contains("Summary:      Find pet"));
        assert!(report.contains("Description:  Returns a single pet"));
        assert!(report.contains("Headers:      X-Trace"));
        assert!(report.contains("Path params:  petId"));
        assert!(report.contains("200: Pet ok"));
        assert!(report.contains("404: - missing"));
        assert!(report.contains("    age: int"));
        assert!(report.contains("    name: string"));
    }

    #[test]
    fn test_report_lists_tool_names_under_filters() {
        let document = parse_document(PETSTORE.as_bytes()).expect("valid document");
        let config = ApiConfig { exclude_methods: vec!["delete".to_string()], ..ApiConfig::default() };
        let report = render_report(&document, &config);

        assert!(report.contains("Tools (2):"));
        assert!(report.contains("  get_/pets/petId"));
        assert!(report.contains("  post_/pets"));
        assert!(!report.contains("delete_/pets"));
    }
}
