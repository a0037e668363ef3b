//! ACC MCP server entry point.
//!
//! Loads `.env`, reads configuration from the environment, obtains the
//! access token and serves MCP over stdio.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `APS_TOKEN` | *(none)* | Pre-exchanged bearer token. |
//! | `APS_CLIENT_ID` | *(none)* | APS application client ID. |
//! | `APS_CLIENT_SECRET` | *(none)* | APS application client secret. |
//! | `APS_SCOPES` | `data:read account:read` | Scopes for the client-credentials exchange. |
//! | `APS_BASE_URL` | `https://developer.api.autodesk.com` | API root. |
//! | `APS_TIMEOUT_SECS` | `30` | Per-request timeout. |
//! | `APS_MAX_RETRIES` | `0` | Retries for transient failures. |
//! | `RUST_LOG` | `acc_mcp=info` | Log filter (logs go to stderr). |

use acc_mcp::{
    acquire_token, all_tools, transport, ApsClient, AppConfig, DataManagementAdapter, McpServer,
};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    // Stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("acc_mcp=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let config = AppConfig::from_env().context("invalid APS configuration")?;
    info!(
        base_url = %config.endpoint.base_url,
        credentials = ?config.credentials,
        timeout_secs = config.default_timeout_secs,
        max_retries = config.max_retries,
        "Starting ACC MCP server"
    );

    let token = acquire_token(&config)
        .await
        .context("failed to obtain an APS access token")?;
    let client = ApsClient::from_config(&config, token).context("failed to build HTTP client")?;
    let adapter = DataManagementAdapter::new(Arc::new(client));

    let mut server = McpServer::acc();
    server
        .register_tools(all_tools(adapter))
        .context("failed to build tool registry")?;
    info!(tools = server.list_tools().len(), "Tool registry ready");

    transport::serve_stdio(&server)
        .await
        .context("stdio transport failed")?;

    Ok(())
}
