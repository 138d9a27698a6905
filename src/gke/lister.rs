/// Cluster and node pool listing
use anyhow::{Context, Result};
use std::io::Write;
use tracing::{info, warn};

use super::client::GkeClient;
use super::location::LocationPath;
use super::models::{Cluster, NodePool};

/// One-line cluster summary
pub fn cluster_summary(cluster: &Cluster) -> String {
    format!(
        "Cluster {:?} ({}) master_version: v{}",
        cluster.name, cluster.status, cluster.current_master_version
    )
}

/// One-line node pool summary, indented under its cluster
pub fn node_pool_summary(pool: &NodePool) -> String {
    format!(
        "  -> Pool {:?} ({}) machineType={} node_version=v{} autoscaling={}",
        pool.name,
        pool.status,
        pool.machine_type(),
        pool.version,
        pool.autoscaling_enabled()
    )
}

/// Lists clusters in a location together with their node pools
pub struct ClusterLister {
    client: GkeClient,
}

impl ClusterLister {
    pub fn new(client: GkeClient) -> Self {
        Self { client }
    }

    /// Print every cluster and its node pools in API order
    pub async fn run<W: Write>(&self, location: &LocationPath, out: &mut W) -> Result<()> {
        let parent = location.parent();
        info!("Listing clusters in {}", parent);

        let response = self
            .client
            .list_clusters(&parent)
            .await
            .with_context(|| format!("Failed to list clusters in {}", location.location()))?;

        for zone in &response.missing_zones {
            warn!("Zone {} could not be reached, results may be incomplete", zone);
        }

        for cluster in &response.clusters {
            writeln!(out, "{}", cluster_summary(cluster))?;

            let pools = self
                .client
                .list_node_pools(&location.cluster(&cluster.name))
                .await
                .with_context(|| {
                    format!("Failed to list node pools for cluster {:?}", cluster.name)
                })?;

            for pool in &pools {
                writeln!(out, "{}", node_pool_summary(pool))?;
            }
        }

        Ok(())
    }
}
