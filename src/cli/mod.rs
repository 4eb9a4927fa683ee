//! # Command Line Interface
//!
//! `serve` compiles an API description and exposes its operations as MCP tools
//! over stdio or HTTP; `inspect` prints what would be exposed. Every flag has a
//! `SWAGGER_MCP_*` environment twin.

use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use crate::config::{ApiConfig, ConfigError, LogFormat, LoggingConfig, SpecSizeLimit, TransportConfig};
use crate::mcp::gateway::executor::ToolDispatcher;
use crate::mcp::gateway::security::{SecurityConfig, SecurityScheme};
use crate::mcp::handler::{McpHandler, ServerIdentity};
use crate::mcp::http::{serve_http, HttpState};
use crate::mcp::server::McpStdioServer;
use crate::mcp::tool_registry::ToolRegistry;
use crate::observability::{init_logging, log_startup_info};
use crate::openapi::{inspect::render_report, loader::load_spec, ApiDocument};

#[derive(Parser)]
#[command(name = "swagger-mcp")]
#[command(about = "Serve the operations of a Swagger / OpenAPI document as MCP tools")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true, env = "SWAGGER_MCP_VERBOSE")]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text", env = "SWAGGER_MCP_LOG_FORMAT")]
    pub log_format: LogFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Expose every eligible operation as an MCP tool
    Serve {
        #[command(flatten)]
        api: ApiArgs,

        /// Transport the MCP server listens on
        #[arg(long, value_enum, default_value = "stdio", env = "SWAGGER_MCP_TRANSPORT")]
        transport: TransportKind,

        /// Listen address for the HTTP transport
        #[arg(long, default_value = "127.0.0.1:8080", env = "SWAGGER_MCP_BIND")]
        bind: String,
    },

    /// Print the operations and tool names `serve` would expose
    Inspect {
        #[command(flatten)]
        api: ApiArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    Stdio,
    Http,
}

/// Options shared by `serve` and `inspect`
#[derive(Debug, Clone, Args)]
pub struct ApiArgs {
    /// Spec location: local path, file:// URI or http(s):// URL
    #[arg(long, env = "SWAGGER_MCP_SPEC_URL")]
    pub spec_url: String,

    /// Base URL for API calls, overriding the document's servers/host
    #[arg(long, env = "SWAGGER_MCP_BASE_URL")]
    pub base_url: Option<String>,

    /// Comma-separated path regexes to include
    #[arg(long, env = "SWAGGER_MCP_INCLUDE_PATHS")]
    pub include_paths: Option<String>,

    /// Comma-separated path regexes to exclude
    #[arg(long, env = "SWAGGER_MCP_EXCLUDE_PATHS")]
    pub exclude_paths: Option<String>,

    /// Comma-separated HTTP methods to include
    #[arg(long, env = "SWAGGER_MCP_INCLUDE_METHODS")]
    pub include_methods: Option<String>,

    /// Comma-separated HTTP methods to exclude
    #[arg(long, env = "SWAGGER_MCP_EXCLUDE_METHODS")]
    pub exclude_methods: Option<String>,

    /// Authentication scheme: basic, bearer or apiKey
    #[arg(long, env = "SWAGGER_MCP_SECURITY")]
    pub security: Option<String>,

    /// Basic auth credentials as user:password
    #[arg(long, env = "SWAGGER_MCP_BASIC_AUTH")]
    pub basic_auth: Option<String>,

    /// API keys as passAs:name=value,... (passAs is header, query or cookie)
    #[arg(long, env = "SWAGGER_MCP_API_KEY_AUTH")]
    pub api_key_auth: Option<String>,

    /// Bearer token
    #[arg(long, env = "SWAGGER_MCP_BEARER_AUTH")]
    pub bearer_auth: Option<String>,

    /// Extra headers as name=value,...
    #[arg(long, env = "SWAGGER_MCP_HEADERS")]
    pub headers: Option<String>,

    /// Comma-separated inbound HTTP headers to forward to the API
    #[arg(long, env = "SWAGGER_MCP_FORWARD_HEADERS")]
    pub forward_headers: Option<String>,

    /// Maximum spec size, e.g. 10485760 or 10MB (falls back to SWAGGER_MCP_MAX_SPEC_SIZE)
    #[arg(long)]
    pub max_spec_size: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long, default_value_t = crate::config::DEFAULT_REQUEST_TIMEOUT_SECS, env = "SWAGGER_MCP_REQUEST_TIMEOUT")]
    pub request_timeout: u64,
}

impl ApiArgs {
    pub fn security_config(&self) -> SecurityConfig {
        SecurityConfig {
            scheme: SecurityScheme::parse(self.security.as_deref().unwrap_or_default()),
            basic_auth: self.basic_auth.clone().unwrap_or_default(),
            api_key_auth: self.api_key_auth.clone().unwrap_or_default(),
            bearer_auth: self.bearer_auth.clone().unwrap_or_default(),
        }
    }

    pub fn api_config(&self) -> Result<ApiConfig, ConfigError> {
        ApiConfig::from_raw(
            self.base_url.clone(),
            self.include_paths.as_deref(),
            self.exclude_paths.as_deref(),
            self.include_methods.as_deref(),
            self.exclude_methods.as_deref(),
            self.security_config(),
            self.headers.as_deref(),
            self.forward_headers.as_deref(),
            self.request_timeout,
        )
    }

    async fn load(&self) -> crate::Result<(ApiDocument, ApiConfig)> {
        let config = self.api_config()?;
        let limit = SpecSizeLimit::resolve(self.max_spec_size.as_deref())?;
        let document = load_spec(&self.spec_url, limit).await?;
        Ok((document, config))
    }
}

impl TransportKind {
    fn into_config(self, bind: String) -> TransportConfig {
        match self {
            TransportKind::Stdio => TransportConfig::Stdio,
            TransportKind::Http => TransportConfig::Http { bind_address: bind },
        }
    }
}

/// Parse the command line and run the selected command
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&LoggingConfig { verbose: cli.verbose, format: cli.log_format });

    match cli.command {
        Commands::Serve { api, transport, bind } => {
            handle_serve(&api, transport.into_config(bind)).await
        }
        Commands::Inspect { api } => handle_inspect(&api).await,
    }
}

async fn handle_serve(args: &ApiArgs, transport: TransportConfig) -> anyhow::Result<()> {
    let (document, config) =
        args.load().await.with_context(|| format!("Failed to prepare {}", args.spec_url))?;

    let (registry, _report) = ToolRegistry::from_document(&document, &config);
    let base_url = config.base_url.clone().unwrap_or_else(|| document.base_url());
    log_startup_info(&args.spec_url, &base_url, registry.len(), &transport);

    let handler = McpHandler::new(
        Arc::new(registry),
        Arc::new(ToolDispatcher::from_config(&config)),
        ServerIdentity::from_document(&document),
    );

    match transport {
        TransportConfig::Stdio => {
            McpStdioServer::new(handler).run().await?;
            Ok(())
        }
        TransportConfig::Http { bind_address } => {
            let state = HttpState::new(handler, config.forward_headers.clone());
            serve_http(state, &bind_address).await?;
            Ok(())
        }
    }
}

async fn handle_inspect(args: &ApiArgs) -> anyhow::Result<()> {
    let (document, config) =
        args.load().await.with_context(|| format!("Failed to prepare {}", args.spec_url))?;
    info!(operations = document.operation_count(), "Inspecting API description");
    print!("{}", render_report(&document, &config));
    Ok(())
}
