//! Platform access for Autodesk Platform Services (APS).
//!
//! This module defines the capability interface the rest of the crate uses
//! to reach the construction-data platform, and its HTTP implementation:
//! - `PlatformAccess`: the capability trait (hubs, projects, folder contents,
//!   root folder lookup, item versions)
//! - `ApsClient`: the Data Management REST implementation
//! - `auth`: one-shot credential acquisition at startup
//! - `config`: environment-driven configuration

pub mod aps;
pub mod auth;
pub mod config;

pub use aps::ApsClient;
pub use auth::{acquire_token, AccessToken, TokenError};
pub use config::{AppConfig, ConfigError, Credentials};

use crate::models::{FolderEntry, Hub, Project, VersionEntry};
use async_trait::async_trait;
use thiserror::Error;

/// Platform call errors.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The hub, project, folder or item does not exist or is not visible.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The credential was rejected (invalid or expired).
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Network failure, timeout, throttling or server-side error.
    #[error("Transient platform failure: {0}")]
    Transient(String),

    /// API returned an unexpected error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Response body could not be decoded.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    /// Whether a retry could succeed without operator action.
    pub fn is_transient(&self) -> bool {
        matches!(self, PlatformError::Transient(_))
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PlatformError::InvalidResponse(err.to_string())
        } else {
            PlatformError::Transient(err.to_string())
        }
    }
}

/// Result type for platform calls.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Capability interface of the construction-data platform.
///
/// Implementations hold their own credential; callers only pass the
/// identifiers that scope each query. Records come back in the platform's
/// order.
#[async_trait]
pub trait PlatformAccess: Send + Sync {
    /// List every hub the credential can see.
    async fn list_hubs(&self) -> PlatformResult<Vec<Hub>>;

    /// List the projects of a hub.
    async fn list_projects(&self, hub_id: &str) -> PlatformResult<Vec<Project>>;

    /// List the immediate children of a folder.
    async fn list_folder_contents(
        &self,
        project_id: &str,
        folder_id: &str,
    ) -> PlatformResult<Vec<FolderEntry>>;

    /// Resolve the root folder of a project, `None` if it has none.
    async fn root_folder(&self, project_id: &str) -> PlatformResult<Option<String>>;

    /// List the versions of an item, newest first.
    async fn list_versions(
        &self,
        project_id: &str,
        item_id: &str,
    ) -> PlatformResult<Vec<VersionEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(PlatformError::Transient("HTTP 503".to_string()).is_transient());
        assert!(!PlatformError::Unauthorized("expired".to_string()).is_transient());
        assert!(!PlatformError::NotFound("hub".to_string()).is_transient());
        assert!(!PlatformError::Api {
            status: 400,
            message: "bad".to_string()
        }
        .is_transient());
    }
}
