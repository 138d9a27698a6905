/// Waiting on long-running GKE operations
use anyhow::Result;
use tracing::debug;

use super::client::GkeClient;
use super::location::LocationPath;
use super::models::Operation;
use crate::utils::polling::PollingConfig;

/// Polls an operation until the API reports it `DONE`
pub struct OperationWaiter {
    client: GkeClient,
    polling: PollingConfig,
}

impl OperationWaiter {
    pub fn new(client: GkeClient, timeout_secs: u64, interval_secs: u64) -> Self {
        Self {
            client,
            polling: PollingConfig::new(timeout_secs, interval_secs, "Waiting for operation"),
        }
    }

    /// Wait for completion, failing if the finished operation carries an error
    pub async fn wait(&self, location: &LocationPath, operation: &Operation) -> Result<Operation> {
        let name = location.operation(&operation.name);

        let done = self
            .polling
            .poll(|| {
                let client = self.client.clone();
                let name = name.clone();
                async move {
                    let current = client.get_operation(&name).await?;
                    debug!("Operation {} status: {}", current.name, current.status);
                    Ok::<_, anyhow::Error>(current.is_done().then_some(current))
                }
            })
            .await?;

        if let Some(error) = &done.error {
            anyhow::bail!(
                "Operation {} failed: {} (code {})",
                done.name,
                error.message,
                error.code
            );
        }

        Ok(done)
    }
}
