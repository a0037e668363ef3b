//! Normalized platform records.
//!
//! The Data Management API answers with JSON:API documents
//! (`{"data": [{"type", "id", "attributes", "relationships"}], "links"}`).
//! Records here flatten the fields an assistant needs; everything else is
//! dropped. Parent references are only those the platform supplies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON:API resource object.
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    /// Resource type (`hubs`, `projects`, `folders`, `items`, `versions`).
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Platform identifier.
    pub id: String,

    /// Attribute object.
    #[serde(default)]
    pub attributes: Value,

    /// Relationship object.
    #[serde(default)]
    pub relationships: Value,
}

impl Resource {
    fn attr(&self, pointer: &str) -> Option<String> {
        scalar(self.attributes.pointer(pointer)?)
    }

    fn attr_u64(&self, pointer: &str) -> Option<u64> {
        self.attributes.pointer(pointer)?.as_u64()
    }

    /// ID of a to-one relationship (e.g. `hub`, `parent`).
    pub fn related_id(&self, relationship: &str) -> Option<String> {
        let pointer = format!("/{}/data/id", relationship);
        scalar(self.relationships.pointer(&pointer)?)
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A JSON:API collection page.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionPage {
    /// Resources on this page.
    #[serde(default)]
    pub data: Vec<Resource>,

    /// Pagination links.
    #[serde(default)]
    pub links: Option<Value>,
}

impl CollectionPage {
    /// URL of the next page, if the platform advertises one.
    pub fn next_url(&self) -> Option<String> {
        let next = self.links.as_ref()?.get("next")?;
        match next {
            Value::String(href) => Some(href.clone()),
            Value::Object(_) => next.get("href")?.as_str().map(String::from),
            _ => None,
        }
    }
}

/// A hub (account) visible to the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hub {
    /// Hub ID (e.g. `b.<account id>`).
    pub id: String,

    /// Hub name.
    pub name: String,

    /// Data region (`US`, `EMEA`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Hub flavor (e.g. `hubs:autodesk.bim360:Account`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub_type: Option<String>,
}

impl From<Resource> for Hub {
    fn from(resource: Resource) -> Self {
        Self {
            name: resource.attr("/name").unwrap_or_default(),
            region: resource.attr("/region"),
            hub_type: resource.attr("/extension/type"),
            id: resource.id,
        }
    }
}

/// A project within a hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project ID.
    pub id: String,

    /// Project name.
    pub name: String,

    /// Project status, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Owning hub.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub_id: Option<String>,
}

impl From<Resource> for Project {
    fn from(resource: Resource) -> Self {
        Self {
            name: resource.attr("/name").unwrap_or_default(),
            status: resource.attr("/status"),
            hub_id: resource.related_id("hub"),
            id: resource.id,
        }
    }
}

/// An immediate child of a folder: a subfolder or an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    /// Folder or item ID.
    pub id: String,

    /// `folders` or `items`.
    #[serde(rename = "type")]
    pub entry_type: String,

    /// Display name.
    pub name: String,

    /// File extension for items, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    /// Last modification time (ISO 8601, as reported).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,

    /// Parent folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Project the entry belongs to.
    pub project_id: String,
}

impl FolderEntry {
    /// Normalize a folder-contents resource listed under `project_id`.
    pub fn from_resource(resource: Resource, project_id: &str) -> Self {
        Self {
            name: resource
                .attr("/displayName")
                .or_else(|| resource.attr("/name"))
                .unwrap_or_default(),
            file_type: resource.attr("/fileType"),
            last_modified: resource.attr("/lastModifiedTime"),
            parent_id: resource.related_id("parent"),
            project_id: project_id.to_string(),
            entry_type: resource.kind,
            id: resource.id,
        }
    }

    /// Whether this entry is a subfolder.
    pub fn is_folder(&self) -> bool {
        self.entry_type == "folders"
    }
}

/// One recorded version of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Version ID (URN).
    pub id: String,

    /// Sequential version number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_number: Option<u64>,

    /// Display name of the file at this version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// File extension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    /// Stored size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_size: Option<u64>,

    /// Creation time (ISO 8601, as reported).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Last modification time (ISO 8601, as reported).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<String>,

    /// Revit project version, for published Revit models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revit_version: Option<String>,

    /// Model version of a published cloud model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,

    /// Publish type, for published cloud models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_type: Option<String>,

    /// Processing state reported by the platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_state: Option<String>,
}

impl From<Resource> for VersionEntry {
    fn from(resource: Resource) -> Self {
        Self {
            version_number: resource.attr_u64("/versionNumber"),
            name: resource.attr("/displayName"),
            file_type: resource.attr("/fileType"),
            storage_size: resource.attr_u64("/storageSize"),
            created_at: resource.attr("/createTime"),
            last_modified_at: resource.attr("/lastModifiedTime"),
            revit_version: resource.attr("/extension/data/revitProjectVersion"),
            model_version: resource.attr("/extension/data/modelVersion"),
            publish_type: resource.attr("/extension/data/publishType"),
            process_state: resource.attr("/extension/data/processState"),
            id: resource.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(value: Value) -> Resource {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_hub_from_resource() {
        let hub = Hub::from(resource(json!({
            "type": "hubs",
            "id": "b.0001",
            "attributes": {
                "name": "Acme Construction",
                "region": "US",
                "extension": {"type": "hubs:autodesk.bim360:Account"}
            }
        })));

        assert_eq!(hub.id, "b.0001");
        assert_eq!(hub.name, "Acme Construction");
        assert_eq!(hub.region.as_deref(), Some("US"));
        assert_eq!(hub.hub_type.as_deref(), Some("hubs:autodesk.bim360:Account"));
    }

    #[test]
    fn test_project_references_hub() {
        let project = Project::from(resource(json!({
            "type": "projects",
            "id": "b.p1",
            "attributes": {"name": "Tower A"},
            "relationships": {"hub": {"data": {"type": "hubs", "id": "b.0001"}}}
        })));

        assert_eq!(project.hub_id.as_deref(), Some("b.0001"));
        assert!(project.status.is_none());

        let serialized = serde_json::to_value(&project).unwrap();
        assert!(serialized.get("status").is_none());
    }

    #[test]
    fn test_folder_entry_kinds() {
        let folder = FolderEntry::from_resource(
            resource(json!({
                "type": "folders",
                "id": "urn:folder",
                "attributes": {"name": "Plans", "displayName": "Plans"},
                "relationships": {"parent": {"data": {"type": "folders", "id": "urn:root"}}}
            })),
            "b.p1",
        );
        assert!(folder.is_folder());
        assert_eq!(folder.parent_id.as_deref(), Some("urn:root"));
        assert_eq!(folder.project_id, "b.p1");

        let item = FolderEntry::from_resource(
            resource(json!({
                "type": "items",
                "id": "urn:item",
                "attributes": {"displayName": "Level 1.rvt", "lastModifiedTime": "2024-03-01T10:00:00.000Z"}
            })),
            "b.p1",
        );
        assert!(!item.is_folder());
        assert_eq!(item.name, "Level 1.rvt");

        let serialized = serde_json::to_value(&item).unwrap();
        assert_eq!(serialized["type"], "items");
    }

    #[test]
    fn test_version_entry_extension_data() {
        let version = VersionEntry::from(resource(json!({
            "type": "versions",
            "id": "urn:adsk.wipprod:fs.file:vf.abc?version=3",
            "attributes": {
                "versionNumber": 3,
                "displayName": "Level 1.rvt",
                "fileType": "rvt",
                "storageSize": 1048576,
                "createTime": "2024-03-01T10:00:00.000Z",
                "extension": {"data": {
                    "revitProjectVersion": 2024,
                    "modelVersion": 7,
                    "processState": "PROCESSING_COMPLETE"
                }}
            }
        })));

        assert_eq!(version.version_number, Some(3));
        assert_eq!(version.storage_size, Some(1_048_576));
        assert_eq!(version.revit_version.as_deref(), Some("2024"));
        assert_eq!(version.model_version.as_deref(), Some("7"));
        assert_eq!(version.process_state.as_deref(), Some("PROCESSING_COMPLETE"));
        assert!(version.publish_type.is_none());
    }

    #[test]
    fn test_next_url() {
        let page: CollectionPage = serde_json::from_value(json!({
            "data": [],
            "links": {"next": {"href": "https://example.com/page2"}}
        }))
        .unwrap();
        assert_eq!(page.next_url().as_deref(), Some("https://example.com/page2"));

        let last: CollectionPage = serde_json::from_value(json!({"data": []})).unwrap();
        assert!(last.next_url().is_none());
    }
}
