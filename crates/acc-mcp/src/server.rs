//! MCP server implementation
//!
//! This module provides the tool registry and dispatcher. Tools are
//! registered once at startup; afterwards the server is shared read-only.
//! Every failure during a tool call is converted into a structured error
//! result for the assistant, so a misbehaving tool never takes the process
//! down.

use crate::clients::PlatformError;
use crate::types::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// MCP server error types.
#[derive(Debug, Error)]
pub enum McpServerError {
    /// Tool not found
    #[error("Tool not found: {0}")]
    UnknownTool(String),

    /// A tool with this name is already registered
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    /// Missing or malformed argument
    #[error("Invalid argument '{field}': {message}")]
    InvalidArgument {
        /// Offending argument name.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Hub, project, folder or item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credential invalid or expired
    #[error("Authorization failed: {0}")]
    Auth(String),

    /// Network failure or timeout
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Tool execution failed
    #[error("Tool execution failed: {0}")]
    Execution(String),
}

/// Result type for MCP server operations.
pub type McpServerResult<T> = Result<T, McpServerError>;

/// Error kind reported to the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownTool,
    DuplicateTool,
    InvalidArgument,
    NotFound,
    Auth,
    Transient,
    ToolExecution,
}

impl ErrorKind {
    /// Stable name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownTool => "UnknownToolError",
            ErrorKind::DuplicateTool => "DuplicateToolError",
            ErrorKind::InvalidArgument => "InvalidArgumentError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Auth => "AuthError",
            ErrorKind::Transient => "TransientError",
            ErrorKind::ToolExecution => "ToolExecutionError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl McpServerError {
    /// Build an invalid-argument error.
    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        McpServerError::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            McpServerError::UnknownTool(_) => ErrorKind::UnknownTool,
            McpServerError::DuplicateTool(_) => ErrorKind::DuplicateTool,
            McpServerError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            McpServerError::NotFound(_) => ErrorKind::NotFound,
            McpServerError::Auth(_) => ErrorKind::Auth,
            McpServerError::Transient(_) => ErrorKind::Transient,
            McpServerError::Execution(_) => ErrorKind::ToolExecution,
        }
    }

    /// Error result shown to the assistant: `"<Kind>: <message>"`.
    pub fn to_tool_result(&self) -> ToolResult {
        ToolResult::error(format!("{}: {}", self.kind(), self))
    }

    /// Normalize an error raised by a tool implementation.
    ///
    /// Registry errors make no sense coming out of a tool and are wrapped
    /// as execution failures.
    fn from_tool_failure(err: McpServerError) -> Self {
        match err {
            McpServerError::UnknownTool(_) | McpServerError::DuplicateTool(_) => {
                McpServerError::Execution(err.to_string())
            }
            other => other,
        }
    }
}

impl From<PlatformError> for McpServerError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::NotFound(what) => McpServerError::NotFound(what),
            PlatformError::Unauthorized(message) => McpServerError::Auth(message),
            PlatformError::Transient(message) => McpServerError::Transient(message),
            other => McpServerError::Execution(other.to_string()),
        }
    }
}

/// Trait for tool implementations.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with validated arguments.
    async fn execute(
        &self,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult>;
}

/// Context for tool execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Per-call correlation ID
    pub correlation_id: Uuid,
}

impl ToolContext {
    /// Create a context with a fresh correlation ID.
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::now_v7(),
        }
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Join handle that aborts its task when dropped.
///
/// A cancelled `call_tool` future drops the guard, which stops the tool and
/// any request it has in flight.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Tool registry and dispatcher.
pub struct McpServer {
    /// Server info
    info: ServerInfo,

    /// Server capabilities
    capabilities: ServerCapabilities,

    /// Registered tools, in registration order
    tools: Vec<Arc<dyn Tool>>,

    /// Definitions captured at registration, parallel to `tools`
    definitions: Vec<ToolDefinition>,

    /// Tool name -> position in `tools`
    index: HashMap<String, usize>,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolCapabilities {
                    list_changed: false,
                }),
            },
            tools: Vec::new(),
            definitions: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Create with this crate's name and version.
    pub fn acc() -> Self {
        Self::new("acc-mcp", env!("CARGO_PKG_VERSION"))
    }

    /// Register a tool.
    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) -> McpServerResult<()> {
        let definition = tool.definition();
        if self.index.contains_key(&definition.name) {
            return Err(McpServerError::DuplicateTool(definition.name));
        }

        debug!(tool = %definition.name, "Registered tool");
        self.index.insert(definition.name.clone(), self.tools.len());
        self.definitions.push(definition);
        self.tools.push(tool);
        Ok(())
    }

    /// Register multiple tools, stopping at the first duplicate.
    pub fn register_tools(&mut self, tools: Vec<Arc<dyn Tool>>) -> McpServerResult<()> {
        for tool in tools {
            self.register_tool(tool)?;
        }
        Ok(())
    }

    /// All tool definitions, in registration order.
    pub fn list_tools(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Execute a tool.
    ///
    /// Unknown names and invalid arguments are rejected before the tool
    /// runs. The tool executes on its own task so that a panic is reported
    /// as an execution error. Dropping the returned future aborts that task.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> McpServerResult<ToolResult> {
        let position = *self
            .index
            .get(name)
            .ok_or_else(|| McpServerError::UnknownTool(name.to_string()))?;

        let arguments = validate_arguments(&self.definitions[position], arguments)?;

        let tool = Arc::clone(&self.tools[position]);
        let context = ToolContext::new();
        let span = info_span!("tool_call", tool = %name, correlation_id = %context.correlation_id);

        let mut handle = AbortOnDrop(tokio::spawn(
            async move { tool.execute(arguments, &context).await }.instrument(span),
        ));

        match (&mut handle.0).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(McpServerError::from_tool_failure(e)),
            Err(join) if join.is_panic() => {
                warn!(tool = %name, "Tool panicked");
                Err(McpServerError::Execution(format!("tool '{}' panicked", name)))
            }
            Err(join) => Err(McpServerError::Execution(join.to_string())),
        }
    }

    /// Handle an MCP request. Notifications produce no response.
    pub async fn handle_request(&self, request: McpRequest) -> Option<McpResponse> {
        let id = match request.id {
            Some(id) => id,
            None => {
                debug!(method = %request.method, "Received notification");
                return None;
            }
        };

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => McpResponse::success(id, serde_json::json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            _ => McpResponse::error(id, McpError::method_not_found(&request.method)),
        };

        Some(response)
    }

    fn handle_initialize(&self, id: RequestId) -> McpResponse {
        McpResponse::success(
            id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": self.capabilities,
                "serverInfo": self.info
            }),
        )
    }

    fn handle_tools_list(&self, id: RequestId) -> McpResponse {
        McpResponse::success(id, serde_json::json!({ "tools": self.list_tools() }))
    }

    async fn handle_tools_call(
        &self,
        id: RequestId,
        params: Option<serde_json::Value>,
    ) -> McpResponse {
        let params = match params {
            Some(p) => p,
            None => return McpResponse::error(id, McpError::invalid_params("Missing params")),
        };

        let call: ToolCall = match serde_json::from_value(params) {
            Ok(c) => c,
            Err(e) => return McpResponse::error(id, McpError::invalid_params(e.to_string())),
        };

        let result = match self.call_tool(&call.name, call.arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %call.name, kind = %e.kind(), error = %e, "Tool call failed");
                e.to_tool_result()
            }
        };

        match serde_json::to_value(result) {
            Ok(value) => McpResponse::success(id, value),
            Err(e) => McpResponse::error(id, McpError::internal_error(e.to_string())),
        }
    }

    /// Get server info.
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }
}

/// Check arguments against a tool's declared schema.
///
/// `null` counts as an empty argument object. Required arguments must be
/// present, non-null and of the declared type; required strings must not be
/// blank. Optional arguments are only type-checked when present and
/// non-null. Undeclared arguments are passed through untouched.
fn validate_arguments(
    definition: &ToolDefinition,
    arguments: serde_json::Value,
) -> McpServerResult<serde_json::Value> {
    let map = match arguments {
        serde_json::Value::Null => serde_json::Map::new(),
        serde_json::Value::Object(map) => map,
        _ => {
            return Err(McpServerError::invalid_argument(
                "arguments",
                "expected an object",
            ))
        }
    };

    for spec in &definition.arguments {
        match map.get(&spec.name) {
            None | Some(serde_json::Value::Null) => {
                if spec.required {
                    return Err(McpServerError::invalid_argument(&spec.name, "is required"));
                }
            }
            Some(value) if !spec.kind.accepts(value) => {
                return Err(McpServerError::invalid_argument(
                    &spec.name,
                    format!("expected {}", spec.kind.as_str()),
                ));
            }
            Some(serde_json::Value::String(s)) if spec.required && s.trim().is_empty() => {
                return Err(McpServerError::invalid_argument(&spec.name, "must not be empty"));
            }
            Some(_) => {}
        }
    }

    Ok(serde_json::Value::Object(map))
}

/// Simple tool wrapper for function-based tools.
pub struct FunctionTool<F>
where
    F: Fn(serde_json::Value, &ToolContext) -> McpServerResult<ToolResult> + Send + Sync,
{
    definition: ToolDefinition,
    handler: F,
}

impl<F> FunctionTool<F>
where
    F: Fn(serde_json::Value, &ToolContext) -> McpServerResult<ToolResult> + Send + Sync,
{
    /// Create a new function-based tool.
    pub fn new(definition: ToolDefinition, handler: F) -> Self {
        Self {
            definition,
            handler,
        }
    }
}

#[async_trait]
impl<F> Tool for FunctionTool<F>
where
    F: Fn(serde_json::Value, &ToolContext) -> McpServerResult<ToolResult> + Send + Sync,
{
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        (self.handler)(args, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_tool(name: &str) -> Arc<dyn Tool> {
        let definition = ToolDefinition::new(name, "Echo arguments")
            .with_argument(ArgumentSpec::required("hub_id", ArgumentType::String, "Hub"))
            .with_argument(ArgumentSpec::optional("limit", ArgumentType::Integer, "Limit"));
        Arc::new(FunctionTool::new(
            definition,
            |args: serde_json::Value, _ctx: &ToolContext| Ok(ToolResult::json(args)),
        ))
    }

    fn failing_tool(name: &str, err: fn() -> McpServerError) -> Arc<dyn Tool> {
        Arc::new(FunctionTool::new(
            ToolDefinition::new(name, "Always fails"),
            move |_args: serde_json::Value, _ctx: &ToolContext| Err(err()),
        ))
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("explode", "Panics")
        }

        async fn execute(
            &self,
            _args: serde_json::Value,
            _context: &ToolContext,
        ) -> McpServerResult<ToolResult> {
            panic!("boom");
        }
    }

    /// Sleeps, then records that it finished.
    struct SlowTool {
        finished: Arc<std::sync::atomic::AtomicBool>,
    }

    #[async_trait]
    impl Tool for SlowTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("slow", "Sleeps before answering")
        }

        async fn execute(
            &self,
            _args: serde_json::Value,
            _context: &ToolContext,
        ) -> McpServerResult<ToolResult> {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            self.finished.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(ToolResult::text("done"))
        }
    }

    fn server() -> McpServer {
        let mut server = McpServer::acc();
        server.register_tool(echo_tool("echo")).unwrap();
        server
    }

    #[test]
    fn test_server_creation() {
        let server = McpServer::acc();
        assert_eq!(server.info().name, "acc-mcp");
        assert!(server.list_tools().is_empty());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut server = server();
        let err = server.register_tool(echo_tool("echo")).unwrap_err();
        assert!(matches!(err, McpServerError::DuplicateTool(ref n) if n == "echo"));
        assert_eq!(server.list_tools().len(), 1);
    }

    #[test]
    fn test_list_preserves_registration_order() {
        let mut server = McpServer::acc();
        server
            .register_tools(vec![echo_tool("b"), echo_tool("a"), echo_tool("c")])
            .unwrap();
        let names: Vec<_> = server.list_tools().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let server = server();
        for args in [json!({}), json!({"hub_id": "x"}), serde_json::Value::Null] {
            let err = server.call_tool("nonexistent_tool", args).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnknownTool);
        }
    }

    #[tokio::test]
    async fn test_argument_validation() {
        let server = server();

        let cases = [
            json!({}),
            json!({"hub_id": null}),
            json!({"hub_id": 7}),
            json!({"hub_id": "  "}),
            json!({"hub_id": "b.1", "limit": "ten"}),
        ];
        for args in cases {
            let err = server.call_tool("echo", args.clone()).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "args: {}", args);
        }

        let err = server.call_tool("echo", json!(["b.1"])).await.unwrap_err();
        assert!(matches!(err, McpServerError::InvalidArgument { ref field, .. } if field == "arguments"));
    }

    #[tokio::test]
    async fn test_valid_arguments_reach_tool() {
        let server = server();
        let result = server
            .call_tool("echo", json!({"hub_id": "b.1", "limit": null, "extra": true}))
            .await
            .unwrap();
        assert!(!result.is_error);

        let echoed: serde_json::Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
        assert_eq!(echoed["hub_id"], "b.1");
        assert_eq!(echoed["extra"], true);
    }

    #[tokio::test]
    async fn test_tool_errors_keep_kind() {
        let mut server = McpServer::acc();
        server
            .register_tools(vec![
                failing_tool("missing", || McpServerError::NotFound("hub bad-hub".to_string())),
                failing_tool("expired", || McpServerError::Auth("expired".to_string())),
                failing_tool("confused", || McpServerError::UnknownTool("other".to_string())),
            ])
            .unwrap();

        let err = server.call_tool("missing", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = server.call_tool("expired", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);

        let err = server.call_tool("confused", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolExecution);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let mut server = McpServer::acc();
        server.register_tool(Arc::new(PanickingTool)).unwrap();

        let err = server.call_tool("explode", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolExecution);
    }

    #[tokio::test]
    async fn test_cancelled_call_stops_tool() {
        let finished = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let mut server = McpServer::acc();
        server
            .register_tool(Arc::new(SlowTool {
                finished: finished.clone(),
            }))
            .unwrap();

        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            server.call_tool("slow", json!({})),
        )
        .await;
        assert!(outcome.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert!(!finished.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_platform_error_mapping() {
        let cases = [
            (PlatformError::NotFound("x".into()), ErrorKind::NotFound),
            (PlatformError::Unauthorized("x".into()), ErrorKind::Auth),
            (PlatformError::Transient("x".into()), ErrorKind::Transient),
            (PlatformError::InvalidResponse("x".into()), ErrorKind::ToolExecution),
            (
                PlatformError::Api {
                    status: 400,
                    message: "x".into(),
                },
                ErrorKind::ToolExecution,
            ),
        ];
        for (platform, kind) in cases {
            assert_eq!(McpServerError::from(platform).kind(), kind);
        }
    }

    #[test]
    fn test_error_result_names_kind() {
        let result = McpServerError::NotFound("hub bad-hub".to_string()).to_tool_result();
        assert!(result.is_error);
        assert_eq!(result.first_text(), Some("NotFoundError: Not found: hub bad-hub"));
    }

    #[tokio::test]
    async fn test_handle_initialize() {
        let server = server();
        let resp = server
            .handle_request(McpRequest::new("1", "initialize"))
            .await
            .unwrap();

        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "acc-mcp");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_handle_tools_call_error_is_result() {
        let server = server();
        let resp = server
            .handle_request(
                McpRequest::new(2, "tools/call")
                    .with_params(json!({"name": "echo", "arguments": {}})),
            )
            .await
            .unwrap();

        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("InvalidArgumentError:"));
    }

    #[tokio::test]
    async fn test_handle_tools_call_missing_params() {
        let server = server();
        let resp = server
            .handle_request(McpRequest::new(3, "tools/call"))
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, McpError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_notifications_and_unknown_methods() {
        let server = server();
        assert!(server
            .handle_request(McpRequest::notification("notifications/initialized"))
            .await
            .is_none());

        let resp = server
            .handle_request(McpRequest::new(4, "resources/list"))
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, McpError::METHOD_NOT_FOUND);

        let resp = server.handle_request(McpRequest::new(5, "ping")).await.unwrap();
        assert_eq!(resp.result.unwrap(), json!({}));
    }
}
