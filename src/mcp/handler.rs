//! MCP Request Handler
//!
//! Routes incoming JSON-RPC requests to the appropriate method handlers. The
//! handler is cheap to clone and shared by every transport task.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, Instrument};

use crate::mcp::cancellation::CancellationManager;
use crate::mcp::error::McpError;
use crate::mcp::gateway::executor::{CallContext, ToolArguments, ToolDispatcher};
use crate::mcp::protocol::*;
use crate::mcp::tool_registry::ToolRegistry;
use crate::openapi::document::ApiDocument;

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "swagger-mcp";

/// Negotiate the MCP protocol version: the highest supported version that is
/// not newer than the client's, or our newest when the client is older than
/// everything we support.
fn negotiate_version(client_version: &str) -> String {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .rev()
        .find(|&&v| v <= client_version)
        .copied()
        .unwrap_or(LATEST_PROTOCOL_VERSION)
        .to_string()
}

/// Identity reported during `initialize`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    pub version: String,
    pub api_title: Option<String>,
    pub api_description: Option<String>,
}

impl ServerIdentity {
    pub fn from_document(document: &ApiDocument) -> Self {
        let info = document.info.as_ref();
        Self {
            version: document.api_version().to_string(),
            api_title: document.title().map(str::to_string),
            api_description: info.map(|i| i.description.clone()).filter(|d| !d.is_empty()),
        }
    }

    fn instructions(&self) -> String {
        let mut text = match &self.api_title {
            Some(title) => format!("Tools for calling the {title} API."),
            None => "Tools for calling the configured HTTP API.".to_string(),
        };
        if let Some(description) = &self.api_description {
            text.push(' ');
            text.push_str(description);
        }
        text.push_str(
            " Each tool performs one HTTP request and returns the raw response body; \
             results starting with [Error] mean the request was not completed.",
        );
        text
    }
}

impl Default for ServerIdentity {
    fn default() -> Self {
        Self { version: "1.0.0".to_string(), api_title: None, api_description: None }
    }
}

#[derive(Clone)]
pub struct McpHandler {
    registry: Arc<ToolRegistry>,
    dispatcher: Arc<ToolDispatcher>,
    identity: Arc<ServerIdentity>,
    cancellations: Arc<CancellationManager>,
}

impl McpHandler {
    pub fn new(
        registry: Arc<ToolRegistry>,
        dispatcher: Arc<ToolDispatcher>,
        identity: ServerIdentity,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            identity: Arc::new(identity),
            cancellations: Arc::new(CancellationManager::new()),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn cancellations(&self) -> &Arc<CancellationManager> {
        &self.cancellations
    }

    /// Handle one JSON-RPC message. Notifications yield `None`.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        context: CallContext,
    ) -> Option<JsonRpcResponse> {
        let span = crate::mcp_request_span!(request.method, context.transport_label());
        self.route(request, context).instrument(span).await
    }

    async fn route(&self, request: JsonRpcRequest, context: CallContext) -> Option<JsonRpcResponse> {
        let id = request.id.clone();
        debug!(method = %request.method, id = ?id, "Handling MCP request");

        if request.jsonrpc != "2.0" {
            return id.map(|id| {
                self.error_response(
                    Some(id),
                    McpError::InvalidRequest(format!("unsupported jsonrpc version '{}'", request.jsonrpc)),
                )
            });
        }

        if request.is_notification() {
            let scope = self.scope(&context);
            Self::handle_notification(scope, &request.method, request.params);
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params),
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params, context).await,
            other => self.error_response(id, McpError::MethodNotFound(other.to_string())),
        };

        debug!(
            method = %request.method,
            has_error = response.error.is_some(),
            "Completed MCP request"
        );

        Some(response)
    }

    /// Cancellation scope for a request: the transport's, else the handler's own
    fn scope<'a>(&'a self, context: &'a CallContext) -> &'a Arc<CancellationManager> {
        context.cancellations.as_ref().unwrap_or(&self.cancellations)
    }

    fn handle_notification(scope: &CancellationManager, method: &str, params: Value) {
        match method {
            "notifications/initialized" => debug!("Client initialized"),
            "notifications/cancelled" => match serde_json::from_value::<CancelledParams>(params) {
                Ok(params) => {
                    scope.cancel(&params.request_id);
                }
                Err(e) => debug!(error = %e, "Ignoring malformed cancellation"),
            },
            other => debug!(method = %other, "Ignoring notification"),
        }
    }

    fn handle_initialize(&self, id: Option<JsonRpcId>, params: Value) -> JsonRpcResponse {
        let params: InitializeParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "Failed to parse initialize params");
                return self.error_response(
                    id,
                    McpError::InvalidParams(format!("Failed to parse initialize params: {e}")),
                );
            }
        };

        let negotiated = negotiate_version(&params.protocol_version);
        debug!(
            client_version = %params.protocol_version,
            negotiated_version = %negotiated,
            client = ?params.client_info.as_ref().map(|c| c.name.as_str()),
            "Protocol version negotiated"
        );

        let result = InitializeResult {
            protocol_version: negotiated,
            capabilities: ServerCapabilities {
                tools: Some(ToolCapabilities { list_changed: false }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: self.identity.version.clone(),
            },
            instructions: Some(self.identity.instructions()),
        };

        self.to_response(id, &result)
    }

    fn handle_tools_list(&self, id: Option<JsonRpcId>) -> JsonRpcResponse {
        let result = ToolsListResult { tools: self.registry.list(), next_cursor: None };
        self.to_response(id, &result)
    }

    async fn handle_tools_call(
        &self,
        id: Option<JsonRpcId>,
        params: Value,
        mut context: CallContext,
    ) -> JsonRpcResponse {
        let params: ToolCallParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return self.error_response(
                    id,
                    McpError::InvalidParams(format!("Failed to parse tool call params: {e}")),
                )
            }
        };

        let Some(tool) = self.registry.get(&params.name) else {
            return self.error_response(id, McpError::ToolNotFound(params.name));
        };

        let arguments: ToolArguments = match params.arguments {
            None | Some(Value::Null) => ToolArguments::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return self.error_response(
                    id,
                    McpError::InvalidParams("tool arguments must be an object".to_string()),
                )
            }
        };

        let _guard = match (&id, context.cancellation.is_some()) {
            (Some(request_id), false) => {
                let guard = self.scope(&context).register(request_id.clone());
                context.cancellation = Some(guard.token());
                Some(guard)
            }
            _ => None,
        };

        let result = self.dispatcher.dispatch(tool, &arguments, &context).await;
        self.to_response(id, &result)
    }

    fn to_response<T: serde::Serialize>(&self, id: Option<JsonRpcId>, result: &T) -> JsonRpcResponse {
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => self.error_response(id, McpError::SerializationError(e)),
        }
    }

    fn error_response(&self, id: Option<JsonRpcId>, error: McpError) -> JsonRpcResponse {
        JsonRpcResponse::failure(id, error.into())
    }
}
