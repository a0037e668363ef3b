//! Platform client configuration.
//!
//! Provides the credential context, API endpoint, timeout and retry settings
//! for the Autodesk Platform Services client. Configuration is loaded once at
//! startup from environment variables; missing credentials are reported
//! immediately rather than on the first tool call.

use crate::retry::RetryConfig;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default APS API root.
pub const DEFAULT_BASE_URL: &str = "https://developer.api.autodesk.com";

/// Default scopes requested by the client-credentials exchange.
pub const DEFAULT_SCOPES: &str = "data:read account:read";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Authorization material for the platform.
///
/// `Debug` never prints secret values.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Pre-exchanged bearer token (`APS_TOKEN`).
    Token(String),

    /// Application credentials exchanged once at startup.
    ClientCredentials {
        /// APS application client ID.
        client_id: String,
        /// APS application client secret.
        client_secret: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
            Credentials::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
        }
    }
}

/// Full process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Credential context.
    pub credentials: Credentials,

    /// API endpoint.
    pub endpoint: ApsEndpoint,

    /// OAuth scopes for the client-credentials exchange.
    pub scopes: Vec<String>,

    /// Request timeout in seconds.
    pub default_timeout_secs: u64,

    /// Extra attempts for transient failures (0 disables retry).
    pub max_retries: u32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `APS_TOKEN`: pre-exchanged bearer token (takes precedence)
    /// - `APS_CLIENT_ID`: APS application client ID
    /// - `APS_CLIENT_SECRET`: APS application client secret
    /// - `APS_SCOPES`: space-separated scopes (default: `data:read account:read`)
    /// - `APS_BASE_URL`: API root (default: https://developer.api.autodesk.com)
    /// - `APS_TIMEOUT_SECS`: request timeout in seconds (default: 30)
    /// - `APS_MAX_RETRIES`: retries for transient failures (default: 0)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let credentials = match (var("APS_TOKEN"), var("APS_CLIENT_ID"), var("APS_CLIENT_SECRET")) {
            (Some(token), _, _) => Credentials::Token(token),
            (None, Some(client_id), Some(client_secret)) => Credentials::ClientCredentials {
                client_id,
                client_secret,
            },
            (None, Some(_), None) => {
                return Err(ConfigError::MissingEnvVar("APS_CLIENT_SECRET".to_string()))
            }
            (None, None, Some(_)) => {
                return Err(ConfigError::MissingEnvVar("APS_CLIENT_ID".to_string()))
            }
            (None, None, None) => {
                return Err(ConfigError::MissingEnvVar(
                    "APS_TOKEN (or APS_CLIENT_ID and APS_CLIENT_SECRET)".to_string(),
                ))
            }
        };

        let scopes = var("APS_SCOPES")
            .unwrap_or_else(|| DEFAULT_SCOPES.to_string())
            .split_whitespace()
            .map(String::from)
            .collect();

        let default_timeout_secs = parse_var(var("APS_TIMEOUT_SECS"), "APS_TIMEOUT_SECS", 30u64)?;
        if default_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "APS_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            credentials,
            endpoint: ApsEndpoint::new(var("APS_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string())),
            scopes,
            default_timeout_secs,
            max_retries: parse_var(var("APS_MAX_RETRIES"), "APS_MAX_RETRIES", 0u32)?,
        })
    }

    /// Configuration with a bearer token and defaults for everything else.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::Token(token.into()),
            endpoint: ApsEndpoint::new(DEFAULT_BASE_URL),
            scopes: DEFAULT_SCOPES.split_whitespace().map(String::from).collect(),
            default_timeout_secs: 30,
            max_retries: 0,
        }
    }

    /// Get the request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    /// Retry policy for transient platform failures.
    pub fn retry_config(&self) -> RetryConfig {
        if self.max_retries == 0 {
            return RetryConfig::no_retry();
        }
        RetryConfig {
            max_attempts: self.max_retries.saturating_add(1),
            ..RetryConfig::default()
        }
    }
}

fn parse_var<T>(value: Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

/// APS API endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApsEndpoint {
    /// Base URL (e.g., "https://developer.api.autodesk.com").
    pub base_url: String,
}

impl ApsEndpoint {
    /// Create an endpoint for a base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Build a full URL by appending a path to the base URL.
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }
}
