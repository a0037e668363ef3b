//! APS Data Management client.
//!
//! HTTP client for the Autodesk Platform Services project and data APIs.
//! Implements `PlatformAccess`: every call carries the startup bearer token,
//! collections follow JSON:API `links.next` pagination, and HTTP statuses are
//! classified into `PlatformError` kinds.

use super::auth::AccessToken;
use super::config::{AppConfig, ApsEndpoint};
use super::{PlatformAccess, PlatformError, PlatformResult};
use crate::models::{CollectionPage, FolderEntry, Hub, Project, Resource, VersionEntry};
use crate::retry::{with_retry_if, RetryConfig};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Upper bound on pages followed for a single collection. A longer chain
/// is reported as an invalid response.
const MAX_PAGES: usize = 200;

/// Top folder holding a project's documents.
const PROJECT_FILES: &str = "Project Files";

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// APS Data Management client.
#[derive(Clone)]
pub struct ApsClient {
    /// HTTP client instance.
    client: Client,

    /// API endpoint.
    endpoint: ApsEndpoint,

    /// Bearer token.
    token: AccessToken,

    /// Retry policy for transient failures.
    retry: RetryConfig,
}

impl ApsClient {
    /// Create a new client.
    pub fn new(
        endpoint: ApsEndpoint,
        token: AccessToken,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            token,
            retry,
        })
    }

    /// Create a client from process configuration.
    pub fn from_config(config: &AppConfig, token: AccessToken) -> Result<Self, reqwest::Error> {
        Self::new(
            config.endpoint.clone(),
            token,
            config.timeout(),
            config.retry_config(),
        )
    }

    /// Build an API URL from path segments, percent-encoding each one.
    fn resource_url(&self, segments: &[&str]) -> PlatformResult<Url> {
        let mut url = Url::parse(&self.endpoint.base_url).map_err(|e| {
            PlatformError::InvalidResponse(format!("invalid base URL {}: {}", self.endpoint.base_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                PlatformError::InvalidResponse(format!(
                    "base URL cannot carry a path: {}",
                    self.endpoint.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    /// GET a JSON document, retrying transient failures per policy.
    async fn get_json<T>(&self, url: &Url) -> PlatformResult<T>
    where
        T: DeserializeOwned,
    {
        with_retry_if(&self.retry, || self.send_get(url), PlatformError::is_transient).await
    }

    async fn send_get<T>(&self, url: &Url) -> PlatformResult<T>
    where
        T: DeserializeOwned,
    {
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(self.token.secret())
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// GET every page of a collection.
    async fn get_collection(&self, first: Url) -> PlatformResult<Vec<Resource>> {
        let mut resources = Vec::new();
        let mut next = Some(first);
        let mut pages = 0;

        while let Some(url) = next.take() {
            pages += 1;
            if pages > MAX_PAGES {
                error!(pages = MAX_PAGES, url = %url, "Collection exceeds page limit");
                return Err(PlatformError::InvalidResponse(format!(
                    "collection did not end after {} pages",
                    MAX_PAGES
                )));
            }

            let page: CollectionPage = self.get_json(&url).await?;
            next = match page.next_url() {
                Some(href) => Some(Url::parse(&href).map_err(|e| {
                    PlatformError::InvalidResponse(format!("invalid next link {}: {}", href, e))
                })?),
                None => None,
            };
            resources.extend(page.data);
        }

        Ok(resources)
    }

    /// Handle API response and parse JSON.
    async fn handle_response<T>(&self, response: reqwest::Response) -> PlatformResult<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| PlatformError::InvalidResponse(e.to_string()));
        }

        let mut message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        if message.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| message.is_char_boundary(*i))
                .unwrap_or(0);
            message.truncate(cut);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!(status = status.as_u16(), "APS rejected the access token");
                if self.token.is_expired() {
                    message = format!("access token expired; {}", message);
                }
                Err(PlatformError::Unauthorized(message))
            }
            StatusCode::NOT_FOUND => Err(PlatformError::NotFound(message)),
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
                Err(PlatformError::Transient(format!("HTTP {}: {}", status.as_u16(), message)))
            }
            s if s.is_server_error() => {
                Err(PlatformError::Transient(format!("HTTP {}: {}", s.as_u16(), message)))
            }
            s => {
                warn!("APS API error ({}): {}", s.as_u16(), message);
                Err(PlatformError::Api {
                    status: s.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl PlatformAccess for ApsClient {
    #[instrument(skip(self))]
    async fn list_hubs(&self) -> PlatformResult<Vec<Hub>> {
        let url = self.resource_url(&["project", "v1", "hubs"])?;
        let resources = self.get_collection(url).await?;
        debug!(count = resources.len(), "Fetched hubs");
        Ok(resources.into_iter().map(Hub::from).collect())
    }

    #[instrument(skip(self))]
    async fn list_projects(&self, hub_id: &str) -> PlatformResult<Vec<Project>> {
        let url = self.resource_url(&["project", "v1", "hubs", hub_id, "projects"])?;
        let resources = self.get_collection(url).await.map_err(|e| match e {
            PlatformError::NotFound(_) => PlatformError::NotFound(format!("hub {}", hub_id)),
            other => other,
        })?;
        Ok(resources.into_iter().map(Project::from).collect())
    }

    #[instrument(skip(self))]
    async fn list_folder_contents(
        &self,
        project_id: &str,
        folder_id: &str,
    ) -> PlatformResult<Vec<FolderEntry>> {
        let url = self.resource_url(&["data", "v1", "projects", project_id, "folders", folder_id, "contents"])?;
        let resources = self.get_collection(url).await.map_err(|e| match e {
            PlatformError::NotFound(_) => {
                PlatformError::NotFound(format!("folder {} in project {}", folder_id, project_id))
            }
            other => other,
        })?;
        Ok(resources
            .into_iter()
            .map(|r| FolderEntry::from_resource(r, project_id))
            .collect())
    }

    /// Projects are addressed through their hub, so the owning hub is found
    /// by asking each visible hub for the project's top folders. Hubs that
    /// refuse the request are skipped; the refusal is reported only when no
    /// hub knows the project.
    #[instrument(skip(self))]
    async fn root_folder(&self, project_id: &str) -> PlatformResult<Option<String>> {
        let mut denied = None;

        for hub in self.list_hubs().await? {
            let url = self.resource_url(&[
                "project",
                "v1",
                "hubs",
                hub.id.as_str(),
                "projects",
                project_id,
                "topFolders",
            ])?;
            match self.get_collection(url).await {
                Ok(folders) => {
                    debug!(hub_id = %hub.id, count = folders.len(), "Resolved owning hub");
                    return Ok(start_folder(folders, project_id));
                }
                Err(PlatformError::NotFound(_)) | Err(PlatformError::Api { status: 400, .. }) => {}
                Err(PlatformError::Unauthorized(message)) => {
                    debug!(hub_id = %hub.id, "Hub refused project lookup");
                    if denied.is_none() {
                        denied = Some(message);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        match denied {
            Some(message) => Err(PlatformError::Unauthorized(message)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn list_versions(
        &self,
        project_id: &str,
        item_id: &str,
    ) -> PlatformResult<Vec<VersionEntry>> {
        let url = self.resource_url(&["data", "v1", "projects", project_id, "items", item_id, "versions"])?;
        let resources = self.get_collection(url).await.map_err(|e| match e {
            PlatformError::NotFound(_) => {
                PlatformError::NotFound(format!("item {} in project {}", item_id, project_id))
            }
            other => other,
        })?;
        Ok(resources.into_iter().map(VersionEntry::from).collect())
    }
}

/// Pick the top folder a listing starts from: "Project Files" when the
/// project has one, the first top folder otherwise.
fn start_folder(folders: Vec<Resource>, project_id: &str) -> Option<String> {
    let folders: Vec<FolderEntry> = folders
        .into_iter()
        .map(|r| FolderEntry::from_resource(r, project_id))
        .collect();

    folders
        .iter()
        .find(|f| f.name == PROJECT_FILES)
        .or_else(|| folders.first())
        .map(|f| f.id.clone())
}
