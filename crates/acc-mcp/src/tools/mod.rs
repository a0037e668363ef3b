//! MCP tools
//!
//! Tools exposed to the assistant. All of them are read-only queries
//! against Autodesk Construction Cloud data management.

pub mod data_management;

pub use data_management::*;

use crate::adapter::DataManagementAdapter;
use crate::server::Tool;
use std::sync::Arc;

/// Get all available MCP tools, in the order `tools/list` reports them.
pub fn all_tools(adapter: DataManagementAdapter) -> Vec<Arc<dyn Tool>> {
    data_management_tools(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::McpServer;

    struct NoPlatform;

    #[async_trait::async_trait]
    impl crate::clients::PlatformAccess for NoPlatform {
        async fn list_hubs(&self) -> crate::clients::PlatformResult<Vec<crate::models::Hub>> {
            unreachable!("registry tests never call the platform")
        }

        async fn list_projects(
            &self,
            _hub_id: &str,
        ) -> crate::clients::PlatformResult<Vec<crate::models::Project>> {
            unreachable!("registry tests never call the platform")
        }

        async fn list_folder_contents(
            &self,
            _project_id: &str,
            _folder_id: &str,
        ) -> crate::clients::PlatformResult<Vec<crate::models::FolderEntry>> {
            unreachable!("registry tests never call the platform")
        }

        async fn root_folder(&self, _project_id: &str) -> crate::clients::PlatformResult<Option<String>> {
            unreachable!("registry tests never call the platform")
        }

        async fn list_versions(
            &self,
            _project_id: &str,
            _item_id: &str,
        ) -> crate::clients::PlatformResult<Vec<crate::models::VersionEntry>> {
            unreachable!("registry tests never call the platform")
        }
    }

    #[test]
    fn test_all_tools_register_without_duplicates() {
        let adapter = DataManagementAdapter::new(Arc::new(NoPlatform));
        let mut server = McpServer::acc();
        server.register_tools(all_tools(adapter)).unwrap();
        assert_eq!(server.list_tools().len(), 4);
    }
}
