//! # ACC MCP
//!
//! This crate provides an MCP (Model Context Protocol) server that exposes
//! Autodesk Construction Cloud data management as read-only tools for AI
//! assistants.
//!
//! ## Overview
//!
//! - **Server**: tool registry and dispatcher with argument validation and
//!   structured error results
//! - **Transport**: newline-delimited JSON-RPC over stdio
//! - **Adapter**: scoped queries (hubs, projects, folder contents, versions)
//! - **Clients**: the `PlatformAccess` capability trait and its Autodesk
//!   Platform Services HTTP implementation
//!
//! ## Available Tools
//!
//! - `get_hubs`: list the hubs the credential can see
//! - `get_projects`: list the projects of a hub (`hub_id`)
//! - `get_project_files`: list a folder's immediate children (`project_id`,
//!   optional `folder_id`; the project's root folder when omitted)
//! - `get_versions`: list an item's versions, newest first (`project_id`,
//!   `item_id`)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use acc_mcp::{
//!     acquire_token, all_tools, transport, ApsClient, AppConfig, DataManagementAdapter,
//!     McpServer,
//! };
//! use std::sync::Arc;
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let token = acquire_token(&config).await?;
//!     let client = ApsClient::from_config(&config, token)?;
//!
//!     let mut server = McpServer::acc();
//!     server.register_tools(all_tools(DataManagementAdapter::new(Arc::new(client))))?;
//!
//!     transport::serve_stdio(&server).await?;
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod clients;
pub mod models;
pub mod retry;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;

pub use adapter::DataManagementAdapter;
pub use clients::{
    acquire_token, AccessToken, ApsClient, AppConfig, ConfigError, Credentials, PlatformAccess,
    PlatformError, PlatformResult, TokenError,
};
pub use models::{FolderEntry, Hub, Project, VersionEntry};
pub use retry::{with_retry_if, RetryConfig};
pub use server::{
    ErrorKind, FunctionTool, McpServer, McpServerError, McpServerResult, Tool, ToolContext,
};
pub use tools::all_tools;
pub use types::{
    ArgumentSpec, ArgumentType, ContentBlock, McpError, McpRequest, McpResponse, RequestId,
    ServerCapabilities, ServerInfo, ToolCall, ToolCapabilities, ToolDefinition, ToolResult,
};
