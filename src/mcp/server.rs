//! MCP Stdio Server
//!
//! Implements the stdio transport for MCP: reads line-delimited JSON-RPC
//! messages from stdin and writes responses to stdout. Each request runs in its
//! own task so slow tool calls do not block `ping` or cancellations; a single
//! writer serialises responses.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{Error, Result};
use crate::mcp::error::McpError;
use crate::mcp::gateway::executor::CallContext;
use crate::mcp::handler::McpHandler;
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};

pub struct McpStdioServer {
    handler: McpHandler,
}

impl McpStdioServer {
    pub fn new(handler: McpHandler) -> Self {
        Self { handler }
    }

    /// Serve stdin/stdout until EOF
    pub async fn run(&self) -> Result<()> {
        info!(tools = self.handler.registry().len(), "Starting MCP stdio server");
        let mut stdout = tokio::io::stdout();
        self.serve(tokio::io::stdin(), &mut stdout).await?;
        info!("MCP stdio server shutting down (EOF received)");
        Ok(())
    }

    /// Serve one input stream. Returns once the input is exhausted and every
    /// in-flight request has written its response.
    pub async fn serve<R, W>(&self, input: R, output: &mut W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

        let read_loop = async move {
            let mut lines = BufReader::new(input).lines();
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                debug!(bytes = line.len(), "Received input line");

                let request: JsonRpcRequest = match serde_json::from_str(&line) {
                    Ok(req) => req,
                    Err(e) => {
                        warn!(error = %e, "Failed to parse JSON-RPC request");
                        let error = McpError::ParseError(e.to_string());
                        let _ = tx.send(JsonRpcResponse::failure(None, error.into()));
                        continue;
                    }
                };

                let handler = self.handler.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Some(response) =
                        handler.handle_request(request, CallContext::for_transport("stdio")).await
                    {
                        let _ = tx.send(response);
                    }
                });
            }
            Ok::<(), std::io::Error>(())
        };

        let write_loop = async {
            while let Some(response) = rx.recv().await {
                write_response(output, &response).await?;
            }
            Ok::<(), Error>(())
        };

        let (read_result, write_result) = tokio::join!(read_loop, write_loop);
        read_result?;
        write_result
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    output: &mut W,
    response: &JsonRpcResponse,
) -> Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| Error::transport(format!("Failed to encode response: {e}")))?;
    debug!(id = ?response.id, is_error = response.error.is_some(), "Writing response");

    output.write_all(json.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;

    Ok(())
}
