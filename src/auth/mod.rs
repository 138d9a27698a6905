/// Application default credentials for Google APIs
pub mod credentials;
pub mod token;

use anyhow::{Context, Result};
use reqwest::Client;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::AuthSettings;
pub use credentials::CredentialsFile;
use token::AccessToken;

/// OAuth2 scope granting access to Cloud Platform APIs
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Credential discovery and token exchange failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("could not find default credentials: {0}")]
    NoCredentials(String),
    #[error("unsupported credential type: {0}")]
    UnsupportedCredentialType(String),
    #[error("token endpoint rejected the request with status {status}: {body}")]
    TokenRejected { status: u16, body: String },
}

/// Where the access token comes from
#[derive(Debug, Clone)]
pub enum CredentialSource {
    File {
        path: PathBuf,
        credentials: CredentialsFile,
    },
    Metadata {
        host: String,
    },
}

/// Resolves ambient credentials and exchanges them for access tokens
pub struct Authenticator {
    http: Client,
    source: CredentialSource,
}

impl Authenticator {
    /// Discover credentials: explicit key file, then gcloud's well-known file, then GCE metadata
    pub fn discover(settings: &AuthSettings) -> Result<Self> {
        let source = if let Some(path) = &settings.credentials_file {
            CredentialSource::File {
                path: path.clone(),
                credentials: CredentialsFile::from_file(path)
                    .context("GOOGLE_APPLICATION_CREDENTIALS is set but unusable")?,
            }
        } else if let Some(path) = settings.well_known_file.as_ref().filter(|p| p.is_file()) {
            CredentialSource::File {
                path: path.clone(),
                credentials: CredentialsFile::from_file(path)?,
            }
        } else {
            debug!("No credentials file found, falling back to the metadata server");
            CredentialSource::Metadata {
                host: settings.metadata_host.clone(),
            }
        };

        Self::with_source(source)
    }

    pub fn with_source(source: CredentialSource) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http, source })
    }

    /// Fetch an access token with the cloud-platform scope
    pub async fn access_token(&self) -> Result<AccessToken> {
        match &self.source {
            CredentialSource::File {
                path,
                credentials: CredentialsFile::ServiceAccount(key),
            } => {
                info!("Authenticating as service account {}", key.client_email);
                debug!("Using credentials from {}", path.display());
                token::service_account_token(&self.http, key, CLOUD_PLATFORM_SCOPE).await
            }
            CredentialSource::File {
                path,
                credentials: CredentialsFile::AuthorizedUser(user),
            } => {
                info!("Authenticating with user credentials from {}", path.display());
                token::authorized_user_token(&self.http, user).await
            }
            CredentialSource::Metadata { host } => {
                info!("Authenticating with the compute metadata server");
                token::metadata_token(&self.http, host).await
            }
        }
    }
}
