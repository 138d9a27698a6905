/// GKE control-plane API client
use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::models::*;

pub const GKE_API_BASE: &str = "https://container.googleapis.com/v1/";

/// Non-success response from the GKE API
#[derive(Debug, thiserror::Error)]
#[error("API error: {code} {status} - {message}")]
pub struct ApiError {
    pub code: u16,
    pub status: String,
    pub message: String,
}

/// Main GKE API client
#[derive(Clone)]
pub struct GkeClient {
    client: Client,
    base_url: Url,
}

impl GkeClient {
    /// Create a new client authenticated with an OAuth2 access token
    pub fn new(access_token: &str, base_url: Url) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", access_token))
                .context("Invalid access token format")?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, resource: &str) -> Result<Url> {
        self.base_url
            .join(resource)
            .with_context(|| format!("Invalid resource path: {}", resource))
    }

    /// Make a GET request to the API
    pub(crate) async fn get<T: DeserializeOwned>(&self, resource: &str) -> Result<T> {
        let url = self.url(resource)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send GET request")?;

        self.handle_response(response).await
    }

    /// Make a PUT request to the API
    pub(crate) async fn put<T: Serialize, R: DeserializeOwned>(
        &self,
        resource: &str,
        body: &T,
    ) -> Result<R> {
        let url = self.url(resource)?;
        debug!("PUT {}", url);

        let response = self
            .client
            .put(url)
            .json(body)
            .send()
            .await
            .context("Failed to send PUT request")?;

        self.handle_response(response).await
    }

    /// Handle API response, checking for errors
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json::<T>()
                .await
                .context("Failed to parse API response")
        } else {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_text) {
                return Err(ApiError {
                    code: error_response.error.code,
                    status: error_response.error.status,
                    message: error_response.error.message,
                }
                .into());
            }

            anyhow::bail!("API request failed with status {}: {}", status, error_text)
        }
    }

    /// List clusters under `projects/{project}/locations/{location}`
    pub async fn list_clusters(&self, parent: &str) -> Result<ListClustersResponse> {
        self.get(&format!("{}/clusters", parent)).await
    }

    /// List node pools of a cluster given its full resource name
    pub async fn list_node_pools(&self, cluster: &str) -> Result<Vec<NodePool>> {
        let response: ListNodePoolsResponse = self.get(&format!("{}/nodePools", cluster)).await?;
        Ok(response.node_pools)
    }

    /// Update a cluster given its full resource name
    pub async fn update_cluster(
        &self,
        cluster: &str,
        request: &UpdateClusterRequest,
    ) -> Result<Operation> {
        self.put(cluster, request).await
    }

    /// Get an operation given its full resource name
    pub async fn get_operation(&self, operation: &str) -> Result<Operation> {
        self.get(operation).await
    }
}
