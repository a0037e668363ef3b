//! Data Management adapter.
//!
//! Scoped queries over a `PlatformAccess` implementation. Each method is a
//! passthrough: records come back in the platform's order, with no joining,
//! filtering or sorting. The only added step is resolving a project's root
//! folder when a folder listing is requested without a folder ID.

use crate::clients::{PlatformAccess, PlatformError, PlatformResult};
use crate::models::{FolderEntry, Hub, Project, VersionEntry};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Facade over the platform used by the tools.
#[derive(Clone)]
pub struct DataManagementAdapter {
    platform: Arc<dyn PlatformAccess>,
}

impl DataManagementAdapter {
    /// Create an adapter over a platform implementation.
    pub fn new(platform: Arc<dyn PlatformAccess>) -> Self {
        Self { platform }
    }

    /// Every hub visible to the credential. An account without hubs yields
    /// an empty list.
    pub async fn get_hubs(&self) -> PlatformResult<Vec<Hub>> {
        self.platform.list_hubs().await
    }

    /// Projects of a hub.
    pub async fn get_projects(&self, hub_id: &str) -> PlatformResult<Vec<Project>> {
        self.platform.list_projects(hub_id).await
    }

    /// Immediate children of a folder, or of the project's root folder when
    /// `folder_id` is `None`.
    #[instrument(skip(self))]
    pub async fn get_project_files(
        &self,
        project_id: &str,
        folder_id: Option<&str>,
    ) -> PlatformResult<Vec<FolderEntry>> {
        let folder_id = match folder_id {
            Some(id) => id.to_string(),
            None => {
                let root = self
                    .platform
                    .root_folder(project_id)
                    .await?
                    .ok_or_else(|| {
                        PlatformError::NotFound(format!("root folder of project {}", project_id))
                    })?;
                debug!(root_folder = %root, "Resolved project root folder");
                root
            }
        };

        self.platform.list_folder_contents(project_id, &folder_id).await
    }

    /// Versions of an item, newest first as the platform returns them.
    pub async fn get_versions(
        &self,
        project_id: &str,
        item_id: &str,
    ) -> PlatformResult<Vec<VersionEntry>> {
        self.platform.list_versions(project_id, item_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records the order of platform calls.
    #[derive(Default)]
    struct RecordingPlatform {
        calls: Mutex<Vec<String>>,
        root: Option<String>,
    }

    impl RecordingPlatform {
        fn with_root(root: Option<&str>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                root: root.map(String::from),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl PlatformAccess for RecordingPlatform {
        async fn list_hubs(&self) -> PlatformResult<Vec<Hub>> {
            self.record("list_hubs".to_string());
            Ok(Vec::new())
        }

        async fn list_projects(&self, hub_id: &str) -> PlatformResult<Vec<Project>> {
            self.record(format!("list_projects:{}", hub_id));
            Ok(Vec::new())
        }

        async fn list_folder_contents(
            &self,
            project_id: &str,
            folder_id: &str,
        ) -> PlatformResult<Vec<FolderEntry>> {
            self.record(format!("list_folder_contents:{}:{}", project_id, folder_id));
            Ok(vec![FolderEntry {
                id: "urn:item".to_string(),
                entry_type: "items".to_string(),
                name: "Site plan.pdf".to_string(),
                file_type: Some("pdf".to_string()),
                last_modified: None,
                parent_id: Some(folder_id.to_string()),
                project_id: project_id.to_string(),
            }])
        }

        async fn root_folder(&self, project_id: &str) -> PlatformResult<Option<String>> {
            self.record(format!("root_folder:{}", project_id));
            Ok(self.root.clone())
        }

        async fn list_versions(
            &self,
            project_id: &str,
            item_id: &str,
        ) -> PlatformResult<Vec<VersionEntry>> {
            self.record(format!("list_versions:{}:{}", project_id, item_id));
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_missing_folder_resolves_root_first() {
        let platform = Arc::new(RecordingPlatform::with_root(Some("urn:root")));
        let adapter = DataManagementAdapter::new(platform.clone());

        let entries = adapter.get_project_files("b.p1", None).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].parent_id.as_deref(), Some("urn:root"));
        assert_eq!(
            platform.calls(),
            vec![
                "root_folder:b.p1".to_string(),
                "list_folder_contents:b.p1:urn:root".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_explicit_folder_skips_root_lookup() {
        let platform = Arc::new(RecordingPlatform::with_root(Some("urn:root")));
        let adapter = DataManagementAdapter::new(platform.clone());

        adapter
            .get_project_files("b.p1", Some("urn:plans"))
            .await
            .unwrap();

        assert_eq!(
            platform.calls(),
            vec!["list_folder_contents:b.p1:urn:plans".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_root_folder_is_not_found() {
        let platform = Arc::new(RecordingPlatform::with_root(None));
        let adapter = DataManagementAdapter::new(platform.clone());

        let err = adapter.get_project_files("b.p1", None).await.unwrap_err();

        assert!(matches!(err, PlatformError::NotFound(_)));
        assert_eq!(platform.calls(), vec!["root_folder:b.p1".to_string()]);
    }

    #[tokio::test]
    async fn test_passthrough_scoping() {
        let platform = Arc::new(RecordingPlatform::default());
        let adapter = DataManagementAdapter::new(platform.clone());

        adapter.get_hubs().await.unwrap();
        adapter.get_projects("b.hub").await.unwrap();
        adapter.get_versions("b.p1", "urn:item").await.unwrap();

        assert_eq!(
            platform.calls(),
            vec![
                "list_hubs".to_string(),
                "list_projects:b.hub".to_string(),
                "list_versions:b.p1:urn:item".to_string(),
            ]
        );
    }
}
