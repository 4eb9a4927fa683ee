//! Gateway Executor
//!
//! The single generic dispatcher behind every compiled tool. A call binds the
//! caller's arguments into the tool's URL template, query string, headers and a
//! typed JSON body, applies authentication, performs one HTTP request and
//! returns the raw response body. Failures never escape as errors: they become
//! `[Error] ...` tool results.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Method;
use serde_json::{Map, Number, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Instrument};
use url::Url;

use super::generator::CompiledTool;
use super::security::{append_header, apply_security, set_header, set_query_param, SecurityConfig};
use crate::config::ApiConfig;
use crate::mcp::cancellation::CancellationManager;
use crate::mcp::protocol::ToolCallResult;

/// Caller-supplied arguments: name to JSON value (string, number, boolean, array or object)
pub type ToolArguments = Map<String, Value>;

/// Per-call failure. `Display` is the stable message shown to the caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("missing or invalid Path Parameter: {0}")]
    MissingPathParam(String),

    #[error("missing or invalid Query Parameter: {0}")]
    MissingQueryParam(String),

    #[error("missing Body Parameter: {0}")]
    MissingBodyParam(String),

    #[error("invalid type for parameter {name}, expected {expected}")]
    InvalidParamType { name: String, expected: &'static str },

    #[error("unsupported parameter type: {type_tag} for {name}")]
    UnsupportedParamType { name: String, type_tag: String },

    #[error("missing or invalid Header: {0}")]
    MissingHeader(String),

    #[error("failed to parse URL: {0}")]
    InvalidUrl(String),

    #[error("failed to create HTTP request: {0}")]
    RequestBuild(String),

    #[error("failed to marshal request body: {0}")]
    BodyMarshal(String),

    #[error("failed to make HTTP request: {0}")]
    RequestFailed(String),

    #[error("failed to read HTTP Response: {0}")]
    ResponseUnreadable(String),

    #[error("request cancelled")]
    Cancelled,
}

impl DispatchError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingPathParam(_) => "missing_or_invalid_path_param",
            Self::MissingQueryParam(_) => "missing_or_invalid_query_param",
            Self::MissingBodyParam(_) => "missing_body_param",
            Self::InvalidParamType { .. } => "invalid_param_type",
            Self::UnsupportedParamType { .. } => "unsupported_param_type",
            Self::MissingHeader(_) => "missing_or_invalid_header",
            Self::InvalidUrl(_) => "invalid_url",
            Self::RequestBuild(_) => "request_build_failed",
            Self::BodyMarshal(_) => "body_marshal_failed",
            Self::RequestFailed(_) => "request_failed",
            Self::ResponseUnreadable(_) => "response_unreadable",
            Self::Cancelled => "cancelled",
        }
    }

    /// Text of the failed tool result
    pub fn to_result_text(&self) -> String {
        format!("[Error] {self}")
    }
}

/// Per-call context supplied by the hosting transport
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Inbound header values to set on the outbound request
    pub forwarded_headers: Vec<(String, String)>,
    /// Cancels the outbound call when triggered
    pub cancellation: Option<CancellationToken>,
    /// Scope for registering calls and resolving `notifications/cancelled`;
    /// the handler's own scope when unset
    pub cancellations: Option<Arc<CancellationManager>>,
    /// Transport label for request spans
    pub transport: Option<&'static str>,
}

impl CallContext {
    pub fn for_transport(transport: &'static str) -> Self {
        Self { transport: Some(transport), ..Self::default() }
    }

    pub fn transport_label(&self) -> &'static str {
        self.transport.unwrap_or("direct")
    }

    pub fn with_cancellations(mut self, scope: Arc<CancellationManager>) -> Self {
        self.cancellations = Some(scope);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// A fully bound request, ready to send
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Go-style boolean text parsing
fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Coerce one body argument to its declared type
fn coerce_body_value(name: &str, type_tag: &str, value: &Value) -> Result<Value, DispatchError> {
    let invalid = |expected: &'static str| DispatchError::InvalidParamType {
        name: name.to_string(),
        expected,
    };

    match type_tag {
        "string" => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(invalid("string")),
        },
        "int" | "integer" => match value {
            Value::String(s) => s.trim().parse::<i64>().map(Value::from).map_err(|_| invalid("int")),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            _ => Err(invalid("int")),
        },
        "float" => {
            let parsed = match value {
                Value::String(s) => s.trim().parse::<f64>().ok(),
                Value::Number(n) => n.as_f64(),
                _ => None,
            };
            parsed.and_then(Number::from_f64).map(Value::Number).ok_or_else(|| invalid("float"))
        }
        "bool" | "boolean" => match value {
            Value::String(s) => parse_bool(s.trim()).map(Value::Bool).ok_or_else(|| invalid("bool")),
            Value::Bool(_) => Ok(value.clone()),
            _ => Err(invalid("bool")),
        },
        "array" => match value {
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(parsed @ Value::Array(_)) => Ok(parsed),
                _ => Err(invalid("array")),
            },
            Value::Array(_) => Ok(value.clone()),
            _ => Err(invalid("array")),
        },
        "object" => match value {
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(parsed @ Value::Object(_)) => Ok(parsed),
                _ => Err(invalid("object")),
            },
            Value::Object(_) => Ok(value.clone()),
            _ => Err(invalid("object")),
        },
        other => Err(DispatchError::UnsupportedParamType {
            name: name.to_string(),
            type_tag: other.to_string(),
        }),
    }
}

fn string_arg<'a>(arguments: &'a ToolArguments, name: &str) -> Option<&'a str> {
    arguments.get(name).and_then(Value::as_str)
}

/// Dispatches compiled tools against the upstream API
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    client: reqwest::Client,
    security: SecurityConfig,
    custom_headers: Vec<(String, String)>,
}

impl ToolDispatcher {
    pub fn new(
        security: SecurityConfig,
        custom_headers: Vec<(String, String)>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, security, custom_headers }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.security.clone(), config.custom_headers.clone(), config.request_timeout)
    }

    /// Bind arguments into a concrete request without sending it
    pub fn prepare(
        &self,
        tool: &CompiledTool,
        arguments: &ToolArguments,
        context: &CallContext,
    ) -> Result<PreparedRequest, DispatchError> {
        let mut raw_url = tool.url_template.clone();
        for name in &tool.path_params {
            let value = string_arg(arguments, name)
                .ok_or_else(|| DispatchError::MissingPathParam(name.clone()))?;
            raw_url = raw_url.replacen(&format!("{{{name}}}"), value, 1);
        }

        let mut url = Url::parse(&raw_url).map_err(|e| DispatchError::InvalidUrl(e.to_string()))?;

        for name in &tool.query_params {
            let value = string_arg(arguments, name)
                .ok_or_else(|| DispatchError::MissingQueryParam(name.clone()))?;
            set_query_param(&mut url, name, value);
        }

        let mut body = Map::new();
        for (name, type_tag) in &tool.body_fields {
            let value = arguments
                .get(name)
                .filter(|v| !v.is_null())
                .ok_or_else(|| DispatchError::MissingBodyParam(name.clone()))?;
            body.insert(name.clone(), coerce_body_value(name, type_tag, value)?);
        }

        let mut headers = HeaderMap::new();
        for name in &tool.header_params {
            let value = string_arg(arguments, name)
                .ok_or_else(|| DispatchError::MissingHeader(name.clone()))?;
            set_header(&mut headers, name, value);
        }

        set_header(&mut headers, CONTENT_TYPE.as_str(), "application/json");
        apply_security(&mut url, &mut headers, &self.security);

        for (name, value) in &self.custom_headers {
            append_header(&mut headers, name, value);
        }
        for (name, value) in &context.forwarded_headers {
            set_header(&mut headers, name, value);
        }

        let method = Method::from_bytes(tool.http_method().as_bytes())
            .map_err(|e| DispatchError::RequestBuild(e.to_string()))?;
        let body =
            serde_json::to_vec(&Value::Object(body)).map_err(|e| DispatchError::BodyMarshal(e.to_string()))?;

        Ok(PreparedRequest { method, url, headers, body })
    }

    /// Perform one call and return the raw response body, whatever the status
    pub async fn execute(
        &self,
        tool: &CompiledTool,
        arguments: &ToolArguments,
        context: &CallContext,
    ) -> Result<String, DispatchError> {
        let prepared = self.prepare(tool, arguments, context)?;

        debug!(method = %prepared.method, url = %prepared.url, "Dispatching API request");

        let request = self
            .client
            .request(prepared.method, prepared.url)
            .headers(prepared.headers)
            .body(prepared.body);

        let send_and_read = async {
            let response =
                request.send().await.map_err(|e| DispatchError::RequestFailed(e.to_string()))?;
            let status = response.status();
            let text =
                response.text().await.map_err(|e| DispatchError::ResponseUnreadable(e.to_string()))?;
            debug!(status = %status, body_length = text.len(), "API request completed");
            Ok::<String, DispatchError>(text)
        };

        match &context.cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(DispatchError::Cancelled),
                result = send_and_read => result,
            },
            None => send_and_read.await,
        }
    }

    /// Invoke `tool`, folding any failure into an error result
    pub async fn dispatch(
        &self,
        tool: &CompiledTool,
        arguments: &ToolArguments,
        context: &CallContext,
    ) -> ToolCallResult {
        let span = crate::tool_call_span!(tool.name);
        async {
            match self.execute(tool, arguments, context).await {
                Ok(body) => ToolCallResult::text(body),
                Err(e) => {
                    warn!(code = e.code(), error = %e, "Tool call failed");
                    ToolCallResult::error(e.to_result_text())
                }
            }
        }
        .instrument(span)
        .await
    }
}
