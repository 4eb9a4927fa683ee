//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use swagger_mcp::config::ApiConfig;
use swagger_mcp::mcp::{McpHandler, ServerIdentity, ToolDispatcher, ToolRegistry};
use swagger_mcp::openapi::{parse_document, ApiDocument};

/// OpenAPI 3 document for a small order service served from `base_url`
pub fn orders_document(base_url: &str) -> ApiDocument {
    let spec = json!({
        "openapi": "3.0.1",
        "info": {"title": "Orders", "version": "4.2.0", "description": "Order management"},
        "servers": [{"url": format!("{base_url}/")}],
        "paths": {
            "/users/{id}/orders": {
                "parameters": [
                    {"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}
                ],
                "get": {
                    "summary": "List orders",
                    "parameters": [
                        {"name": "status", "in": "query", "required": true, "schema": {"type": "string"}}
                    ]
                },
                "post": {
                    "summary": "Create order",
                    "parameters": [
                        {"name": "X-Request-Id", "in": "header", "required": true, "schema": {"type": "string"}}
                    ],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {"schema": {"$ref": "#/components/schemas/Order"}}
                        }
                    }
                }
            },
            "/health": {
                "get": {"summary": "Health"}
            }
        },
        "components": {
            "schemas": {
                "Order": {
                    "type": "object",
                    "properties": {
                        "sku": {"type": "string"},
                        "quantity": {"type": "integer"},
                        "gift": {"type": "boolean"},
                        "tags": {"type": "array"}
                    }
                }
            }
        }
    });
    parse_document(spec.to_string().as_bytes()).expect("valid document")
}

pub fn handler_for(document: &ApiDocument, config: &ApiConfig) -> McpHandler {
    let (registry, _) = ToolRegistry::from_document(document, config);
    McpHandler::new(
        Arc::new(registry),
        Arc::new(ToolDispatcher::from_config(config)),
        ServerIdentity::from_document(document),
    )
}

pub fn arguments(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("arguments must be an object, got {other}"),
    }
}
