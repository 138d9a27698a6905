/// Google credential file formats
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use super::AuthError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Parsed contents of an application default credentials file
#[derive(Debug, Clone)]
pub enum CredentialsFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUserCredentials),
}

/// Service account JSON key
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// User credentials written by `gcloud auth application-default login`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUserCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct CredentialsType {
    #[serde(rename = "type")]
    kind: String,
}

impl CredentialsFile {
    /// Load a credentials file from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid credentials file {}", path.display()))
    }

    /// Parse credentials JSON, dispatching on its `type` field
    pub fn from_json(content: &str) -> Result<Self> {
        let CredentialsType { kind } = serde_json::from_str(content)?;

        match kind.as_str() {
            "service_account" => Ok(Self::ServiceAccount(serde_json::from_str(content)?)),
            "authorized_user" => Ok(Self::AuthorizedUser(serde_json::from_str(content)?)),
            other => Err(AuthError::UnsupportedCredentialType(other.to_string()).into()),
        }
    }
}
