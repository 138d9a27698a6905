/// Re-asserting a cluster's master authorized network
use anyhow::{Context, Result};
use std::io::Write;
use tracing::info;

use super::client::GkeClient;
use super::lister::cluster_summary;
use super::location::LocationPath;
use super::models::{
    CidrBlock, Cluster, ClusterUpdate, MasterAuthorizedNetworksConfig, Operation,
    UpdateClusterRequest,
};

/// Failure specific to the authorized network patch
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("no authorized network CIDR block found for cluster {cluster:?}")]
    NoCidrBlock { cluster: String },
}

/// First non-empty CIDR block of an enabled authorized networks config
pub fn first_cidr_block(cluster: &Cluster) -> Option<&str> {
    cluster
        .master_authorized_networks_config
        .as_ref()
        .filter(|config| config.enabled)?
        .cidr_blocks
        .iter()
        .map(|block| block.cidr_block.as_str())
        .find(|cidr| !cidr.is_empty())
}

/// Update declaring `cidr` as the only authorized network, enabled
pub fn reassert_request(cluster_name: &str, cidr: &str) -> UpdateClusterRequest {
    UpdateClusterRequest {
        name: cluster_name.to_string(),
        update: ClusterUpdate {
            desired_master_authorized_networks_config: Some(MasterAuthorizedNetworksConfig {
                enabled: true,
                cidr_blocks: vec![CidrBlock {
                    display_name: None,
                    cidr_block: cidr.to_string(),
                }],
            }),
        },
    }
}

/// Collapses the first cluster's authorized networks to its first CIDR block
pub struct AuthorizedNetworksPatcher {
    client: GkeClient,
}

impl AuthorizedNetworksPatcher {
    pub fn new(client: GkeClient) -> Self {
        Self { client }
    }

    /// Patch the first cluster in the location and print the update response.
    ///
    /// Only the first cluster returned by the API is touched. A cluster without
    /// any CIDR block aborts with [`PatchError::NoCidrBlock`]. Returns `None`
    /// when the location has no clusters.
    pub async fn run<W: Write>(
        &self,
        location: &LocationPath,
        out: &mut W,
    ) -> Result<Option<Operation>> {
        let parent = location.parent();
        let response = self
            .client
            .list_clusters(&parent)
            .await
            .with_context(|| format!("Failed to list clusters in {}", location.location()))?;

        let Some(cluster) = response.clusters.first() else {
            info!("No clusters found in {}", parent);
            return Ok(None);
        };

        writeln!(out, "{}", cluster_summary(cluster))?;

        let cidr = first_cidr_block(cluster).ok_or_else(|| PatchError::NoCidrBlock {
            cluster: cluster.name.clone(),
        })?;
        writeln!(out, "cidr: {}", cidr)?;

        let cluster_path = location.cluster(&cluster.name);
        info!("Setting {} as the only authorized network of {}", cidr, cluster_path);

        let operation = self
            .client
            .update_cluster(&cluster_path, &reassert_request(&cluster_path, cidr))
            .await
            .with_context(|| format!("Failed to update cluster {:?}", cluster.name))?;

        writeln!(out, "resp: {}", serde_json::to_string_pretty(&operation)?)?;

        Ok(Some(operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gke::location::Location;
    use url::Url;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PARENT: &str = "/v1/projects/acme/locations/europe-west4";

    fn patcher_for(server: &MockServer) -> AuthorizedNetworksPatcher {
        let base = Url::parse(&format!("{}/v1/", server.uri())).unwrap();
        AuthorizedNetworksPatcher::new(GkeClient::new("test-token", base).unwrap())
    }

    fn region_path() -> LocationPath {
        LocationPath::new("acme", Location::Region("europe-west4".to_string())).unwrap()
    }

    fn cluster(value: serde_json::Value) -> Cluster {
        serde_json::from_value(value).unwrap()
    }

    async fn mount_clusters(server: &MockServer, clusters: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("{}/clusters", PARENT)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "clusters": clusters })),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_first_cidr_block_skips_empty_entries() {
        let c = cluster(serde_json::json!({
            "name": "c",
            "masterAuthorizedNetworksConfig": {
                "enabled": true,
                "cidrBlocks": [
                    {"displayName": "blank"},
                    {"cidrBlock": "198.51.100.0/24"},
                    {"cidrBlock": "192.0.2.0/24"}
                ]
            }
        }));
        assert_eq!(first_cidr_block(&c), Some("198.51.100.0/24"));
    }

    #[test]
    fn test_first_cidr_block_requires_enabled_config() {
        let disabled = cluster(serde_json::json!({
            "name": "c",
            "masterAuthorizedNetworksConfig": {
                "enabled": false,
                "cidrBlocks": [{"cidrBlock": "198.51.100.0/24"}]
            }
        }));
        assert_eq!(first_cidr_block(&disabled), None);

        let missing = cluster(serde_json::json!({"name": "c"}));
        assert_eq!(first_cidr_block(&missing), None);
    }

    #[tokio::test]
    async fn test_patches_first_cluster_only() {
        let server = MockServer::start().await;
        mount_clusters(
            &server,
            serde_json::json!([
                {
                    "name": "one",
                    "status": "RUNNING",
                    "currentMasterVersion": "1.30.1",
                    "masterAuthorizedNetworksConfig": {
                        "enabled": true,
                        "cidrBlocks": [
                            {"displayName": "vpn", "cidrBlock": "203.0.113.7/32"},
                            {"displayName": "office", "cidrBlock": "198.51.100.0/24"}
                        ]
                    }
                },
                {
                    "name": "two",
                    "status": "RUNNING",
                    "currentMasterVersion": "1.30.1",
                    "masterAuthorizedNetworksConfig": {
                        "enabled": true,
                        "cidrBlocks": [{"cidrBlock": "192.0.2.0/24"}]
                    }
                }
            ]),
        )
        .await;

        let cluster_name = "projects/acme/locations/europe-west4/clusters/one";
        Mock::given(method("PUT"))
            .and(path(format!("{}/clusters/one", PARENT)))
            .and(body_json(reassert_request(cluster_name, "203.0.113.7/32")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "operation-42",
                "operationType": "UPDATE_CLUSTER",
                "status": "RUNNING"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path(format!("{}/clusters/two", PARENT)))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut out = Vec::new();
        let operation = patcher_for(&server)
            .run(&region_path(), &mut out)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(operation.name, "operation-42");

        let output = String::from_utf8(out).unwrap();
        let mut lines = output.lines();
        assert_eq!(
            lines.next(),
            Some("Cluster \"one\" (RUNNING) master_version: v1.30.1")
        );
        assert_eq!(lines.next(), Some("cidr: 203.0.113.7/32"));
        assert_eq!(lines.next(), Some("resp: {"));
        assert!(output.contains("\"name\": \"operation-42\""));
        assert!(!output.contains("two"));
    }

    #[tokio::test]
    async fn test_fails_without_cidr_block() {
        let server = MockServer::start().await;
        mount_clusters(
            &server,
            serde_json::json!([
                {"name": "open", "status": "RUNNING", "currentMasterVersion": "1.30.1"},
                {
                    "name": "locked",
                    "masterAuthorizedNetworksConfig": {
                        "enabled": true,
                        "cidrBlocks": [{"cidrBlock": "192.0.2.0/24"}]
                    }
                }
            ]),
        )
        .await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut out = Vec::new();
        let err = patcher_for(&server)
            .run(&region_path(), &mut out)
            .await
            .unwrap_err();

        assert_eq!(
            err.downcast_ref::<PatchError>(),
            Some(&PatchError::NoCidrBlock {
                cluster: "open".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_no_clusters_is_noop() {
        let server = MockServer::start().await;
        mount_clusters(&server, serde_json::json!([])).await;

        let mut out = Vec::new();
        let result = patcher_for(&server)
            .run(&region_path(), &mut out)
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_update_failure_propagates() {
        let server = MockServer::start().await;
        mount_clusters(
            &server,
            serde_json::json!([{
                "name": "one",
                "masterAuthorizedNetworksConfig": {
                    "enabled": true,
                    "cidrBlocks": [{"cidrBlock": "192.0.2.0/24"}]
                }
            }]),
        )
        .await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "bad request", "status": "INVALID_ARGUMENT"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut out = Vec::new();
        let err = patcher_for(&server)
            .run(&region_path(), &mut out)
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("INVALID_ARGUMENT"));
    }
}
