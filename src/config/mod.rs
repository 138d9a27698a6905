/// Runtime configuration for gkeops
use anyhow::Context;
use std::path::PathBuf;
use url::Url;

use crate::gke::client::GKE_API_BASE;

/// Environment variable overriding the GKE API endpoint
pub const ENDPOINT_ENV: &str = "GKEOPS_ENDPOINT";

const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

/// Settings resolved from flags and the process environment
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the GKE v1 API, always ending in `/`
    pub endpoint: Url,

    /// Where to look for application default credentials
    pub auth: AuthSettings,
}

/// Credential discovery inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    /// Explicit key file from `GOOGLE_APPLICATION_CREDENTIALS`
    pub credentials_file: Option<PathBuf>,

    /// gcloud's `application_default_credentials.json`
    pub well_known_file: Option<PathBuf>,

    /// GCE metadata server host (`GCE_METADATA_HOST` or the internal default)
    pub metadata_host: String,
}

impl Settings {
    /// Resolve settings; an explicit endpoint flag wins over the environment
    pub fn from_env(endpoint: Option<&str>) -> anyhow::Result<Self> {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        Self::resolve(endpoint, env)
    }

    fn resolve<F>(endpoint: Option<&str>, env: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = endpoint
            .map(str::to_string)
            .or_else(|| env(ENDPOINT_ENV))
            .unwrap_or_else(|| GKE_API_BASE.to_string());

        Ok(Self {
            endpoint: parse_endpoint(&endpoint)?,
            auth: AuthSettings {
                credentials_file: env("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from),
                well_known_file: well_known_file(&env),
                metadata_host: env("GCE_METADATA_HOST")
                    .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string()),
            },
        })
    }
}

/// Parse an API base URL, adding the trailing slash relative joins need
fn parse_endpoint(endpoint: &str) -> anyhow::Result<Url> {
    let normalized = if endpoint.ends_with('/') {
        endpoint.to_string()
    } else {
        format!("{}/", endpoint)
    };

    Url::parse(&normalized).with_context(|| format!("Invalid API endpoint: {}", endpoint))
}

fn well_known_file<F>(env: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let config_dir = env("CLOUDSDK_CONFIG")
        .map(PathBuf::from)
        .or_else(|| env("HOME").map(|home| PathBuf::from(home).join(".config").join("gcloud")))?;

    Some(config_dir.join("application_default_credentials.json"))
}
