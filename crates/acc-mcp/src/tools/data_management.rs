//! Data Management tools
//!
//! Read-only tools over hubs, projects, folder contents and item versions.
//! Each tool maps one invocation onto one adapter call and returns the
//! normalized records as a JSON array, in the order the platform gave them.

use crate::adapter::DataManagementAdapter;
use crate::server::{McpServerError, McpServerResult, Tool, ToolContext};
use crate::types::{ArgumentSpec, ArgumentType, ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};

fn parse_params<T>(args: serde_json::Value) -> McpServerResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(args).map_err(|e| McpServerError::invalid_argument("arguments", e.to_string()))
}

fn records_result<T: Serialize>(records: &[T]) -> McpServerResult<ToolResult> {
    let value = serde_json::to_value(records)
        .map_err(|e| McpServerError::Execution(format!("failed to serialize records: {}", e)))?;
    Ok(ToolResult::json(value))
}

/// Tool listing every hub the credential can see.
pub struct GetHubsTool {
    adapter: DataManagementAdapter,
}

impl GetHubsTool {
    /// Create the tool over an adapter.
    pub fn new(adapter: DataManagementAdapter) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl Tool for GetHubsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("get_hubs", "Get all available hubs the user has access to")
    }

    #[instrument(skip_all, fields(tool = "get_hubs"))]
    async fn execute(&self, _args: serde_json::Value, context: &ToolContext) -> McpServerResult<ToolResult> {
        let hubs = self.adapter.get_hubs().await.map_err(|e| {
            error!(correlation_id = %context.correlation_id, "Failed to list hubs: {}", e);
            McpServerError::from(e)
        })?;

        debug!(count = hubs.len(), "Listed hubs");
        records_result(&hubs)
    }
}

/// Tool listing the projects of a hub.
pub struct GetProjectsTool {
    adapter: DataManagementAdapter,
}

impl GetProjectsTool {
    /// Create the tool over an adapter.
    pub fn new(adapter: DataManagementAdapter) -> Self {
        Self { adapter }
    }
}

#[derive(Debug, Deserialize)]
struct GetProjectsParams {
    hub_id: String,
}

#[async_trait]
impl Tool for GetProjectsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("get_projects", "Get all projects within a specified hub").with_argument(
            ArgumentSpec::required("hub_id", ArgumentType::String, "The ID of the hub to get projects from"),
        )
    }

    #[instrument(skip_all, fields(tool = "get_projects"))]
    async fn execute(&self, args: serde_json::Value, context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: GetProjectsParams = parse_params(args)?;

        let projects = self.adapter.get_projects(&params.hub_id).await.map_err(|e| {
            error!(correlation_id = %context.correlation_id, hub_id = %params.hub_id, "Failed to list projects: {}", e);
            McpServerError::from(e)
        })?;

        debug!(count = projects.len(), "Listed projects");
        records_result(&projects)
    }
}

/// Tool listing the immediate children of a project folder.
pub struct GetProjectFilesTool {
    adapter: DataManagementAdapter,
}

impl GetProjectFilesTool {
    /// Create the tool over an adapter.
    pub fn new(adapter: DataManagementAdapter) -> Self {
        Self { adapter }
    }
}

#[derive(Debug, Deserialize)]
struct GetProjectFilesParams {
    project_id: String,
    #[serde(default)]
    folder_id: Option<String>,
}

#[async_trait]
impl Tool for GetProjectFilesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_project_files",
            "List the files and subfolders directly inside a project folder",
        )
        .with_argument(ArgumentSpec::required(
            "project_id",
            ArgumentType::String,
            "The ID of the project",
        ))
        .with_argument(ArgumentSpec::optional(
            "folder_id",
            ArgumentType::String,
            "Folder to list; the project's root folder when omitted",
        ))
    }

    #[instrument(skip_all, fields(tool = "get_project_files"))]
    async fn execute(&self, args: serde_json::Value, context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: GetProjectFilesParams = parse_params(args)?;
        let folder_id = params
            .folder_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        let entries = self
            .adapter
            .get_project_files(&params.project_id, folder_id)
            .await
            .map_err(|e| {
                error!(correlation_id = %context.correlation_id, project_id = %params.project_id, "Failed to list folder: {}", e);
                McpServerError::from(e)
            })?;

        debug!(count = entries.len(), "Listed folder entries");
        records_result(&entries)
    }
}

/// Tool listing the versions of an item.
pub struct GetVersionsTool {
    adapter: DataManagementAdapter,
}

impl GetVersionsTool {
    /// Create the tool over an adapter.
    pub fn new(adapter: DataManagementAdapter) -> Self {
        Self { adapter }
    }
}

#[derive(Debug, Deserialize)]
struct GetVersionsParams {
    project_id: String,
    item_id: String,
}

#[async_trait]
impl Tool for GetVersionsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("get_versions", "Get version information for a specific item, newest first")
            .with_argument(ArgumentSpec::required(
                "project_id",
                ArgumentType::String,
                "The ID of the project",
            ))
            .with_argument(ArgumentSpec::required(
                "item_id",
                ArgumentType::String,
                "The ID of the item to get versions for",
            ))
    }

    #[instrument(skip_all, fields(tool = "get_versions"))]
    async fn execute(&self, args: serde_json::Value, context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: GetVersionsParams = parse_params(args)?;

        let versions = self
            .adapter
            .get_versions(&params.project_id, &params.item_id)
            .await
            .map_err(|e| {
                error!(correlation_id = %context.correlation_id, item_id = %params.item_id, "Failed to list versions: {}", e);
                McpServerError::from(e)
            })?;

        debug!(count = versions.len(), "Listed versions");
        records_result(&versions)
    }
}

/// Get all Data Management tools over an adapter.
pub fn data_management_tools(adapter: DataManagementAdapter) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(GetHubsTool::new(adapter.clone())),
        Arc::new(GetProjectsTool::new(adapter.clone())),
        Arc::new(GetProjectFilesTool::new(adapter.clone())),
        Arc::new(GetVersionsTool::new(adapter)),
    ]
}
