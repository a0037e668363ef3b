//! Credential acquisition.
//!
//! Turns the configured credentials into the bearer token used for every
//! platform call. A pre-exchanged `APS_TOKEN` is used verbatim; otherwise a
//! single two-legged client-credentials exchange runs at startup. The token
//! is never refreshed: once it expires, calls fail with an authorization
//! error until the process is restarted with fresh credentials.

use super::config::{AppConfig, Credentials};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::{info, instrument};

/// Token endpoint path, relative to the API root.
pub const TOKEN_PATH: &str = "/authentication/v2/token";

/// Token acquisition errors.
#[derive(Debug, Error)]
pub enum TokenError {
    /// HTTP request failed.
    #[error("Token request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The authorization server refused the credentials.
    #[error("Token exchange rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error message from the server.
        message: String,
    },

    /// The token response could not be decoded.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

/// Bearer token for platform calls.
///
/// `Debug` never prints the token.
#[derive(Clone)]
pub struct AccessToken {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Wrap a bearer token with an optional expiry.
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// The raw bearer token.
    pub fn secret(&self) -> &str {
        &self.token
    }

    /// Expiry reported by the authorization server, if known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token is known to have expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |at| at <= Utc::now())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Obtain the bearer token for the configured credentials.
#[instrument(skip(config), fields(base_url = %config.endpoint.base_url))]
pub async fn acquire_token(config: &AppConfig) -> Result<AccessToken, TokenError> {
    let (client_id, client_secret) = match &config.credentials {
        Credentials::Token(token) => {
            info!("Using pre-exchanged access token");
            return Ok(AccessToken::new(token.clone(), None));
        }
        Credentials::ClientCredentials {
            client_id,
            client_secret,
        } => (client_id, client_secret),
    };

    let client = Client::builder().timeout(config.timeout()).build()?;
    let scope = config.scopes.join(" ");

    let response = client
        .post(config.endpoint.url(TOKEN_PATH))
        .basic_auth(client_id, Some(client_secret))
        .form(&[("grant_type", "client_credentials"), ("scope", scope.as_str())])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(TokenError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| TokenError::InvalidResponse(e.to_string()))?;

    let expires_at = body
        .expires_in
        .and_then(ChronoDuration::try_seconds)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));

    info!(
        client_id = %client_id,
        expires_at = ?expires_at,
        "Obtained access token via client credentials"
    );

    Ok(AccessToken::new(body.access_token, expires_at))
}
