//! Stdio transport.
//!
//! Newline-delimited JSON-RPC: one request per line in, one response per
//! line out. Requests are handled strictly one at a time. Stdout carries
//! only protocol messages; logs go to stderr.

use crate::server::McpServer;
use crate::types::{McpError, McpRequest, McpResponse, RequestId};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// Decode and handle one protocol line.
///
/// Undecodable input gets a JSON-RPC error with the request ID when one can
/// be recovered, `null` otherwise.
pub async fn handle_line(server: &McpServer, line: &str) -> Option<McpResponse> {
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return Some(McpResponse::error(RequestId::Null, McpError::parse_error(e))),
    };

    let id = value
        .get("id")
        .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok())
        .unwrap_or(RequestId::Null);

    match serde_json::from_value::<McpRequest>(value) {
        Ok(request) => server.handle_request(request).await,
        Err(e) => Some(McpResponse::error(id, McpError::invalid_request(e))),
    }
}

/// Serve requests from `reader` until EOF, writing responses to `writer`.
pub async fn serve<R, W>(server: &McpServer, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(response) = handle_line(server, line).await else {
            continue;
        };

        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        writer.write_all(out.as_bytes()).await?;
        writer.flush().await?;
        debug!(id = ?response.id, "Sent response");
    }

    info!("Input closed, shutting down");
    Ok(())
}

/// Serve on the process's stdin and stdout.
pub async fn serve_stdio(server: &McpServer) -> std::io::Result<()> {
    serve(server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}
