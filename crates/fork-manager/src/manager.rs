// Copyright (C) 2026 EVM Debug Service Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Fork manager (C3): composes the port registry and process supervisor
//! into create/delete/forward operations, and owns lease expiry.

use std::{sync::Arc, time::Duration};

use debug_common::{error::Result, DebugError};

use crate::{registry::PortRegistry, supervisor::ProcessSupervisor};

/// Result of forwarding a raw JSON-RPC request to a fork's local node.
pub struct ForwardedResponse {
    /// HTTP status code the fork's node responded with.
    pub status: u16,
    /// Raw response body bytes.
    pub body: Vec<u8>,
}

/// Orchestrates fork lifecycle: reserving a port, spawning the node
/// process bound to it, and forwarding RPC traffic while the lease is
/// alive.
pub struct ForkManager {
    registry: Arc<PortRegistry>,
    supervisor: Arc<ProcessSupervisor>,
    upstream_rpc_url: String,
    http_client: reqwest::Client,
}

impl ForkManager {
    /// Builds a fork manager over the given upstream RPC endpoint. The
    /// registry and supervisor are shared so lease-expiry tasks spawned
    /// by `create_fork` can outlive the call that created them.
    pub fn new(upstream_rpc_url: impl Into<String>) -> Self {
        Self {
            registry: Arc::new(PortRegistry::new()),
            supervisor: Arc::new(ProcessSupervisor::new()),
            upstream_rpc_url: upstream_rpc_url.into(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Seeds the underlying port registry (spec §4.1, exposed here so
    /// `server` can call it once at startup from `PORTS`).
    pub async fn allocate_ports(&self, ports: &[u16]) -> Vec<DebugError> {
        self.registry.allocate_ports(ports).await
    }

    /// Reserves a port, spawns a fork process on it, schedules its lease
    /// expiry, and returns the new fork id. Releases the port again if
    /// the spawn fails.
    pub async fn create_fork(&self, lease: Duration, block_number: Option<u64>) -> Result<String> {
        let (port, fork_id) = self.registry.reserve().await?;

        if let Err(e) = self.supervisor.start(port, &self.upstream_rpc_url, block_number).await {
            let _ = self.registry.release(&fork_id).await;
            return Err(e);
        }

        tracing::info!(fork_id, port, lease_secs = lease.as_secs(), "fork created");

        let registry = self.registry.clone();
        let supervisor = self.supervisor.clone();
        let expiring_fork_id = fork_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(lease).await;
            if let Err(e) = delete_fork_inner(&registry, &supervisor, &expiring_fork_id).await {
                // Best-effort: a delete racing with lease expiry is benign,
                // per spec §4.3's propagation policy — log and move on.
                tracing::warn!(
                    fork_id = expiring_fork_id,
                    error = %e,
                    "lease-expiry delete failed (fork was likely already deleted)"
                );
            } else {
                tracing::info!(fork_id = expiring_fork_id, "fork lease expired, deleted");
            }
        });

        Ok(fork_id)
    }

    /// Verifies the fork is active, stops its process, and releases its
    /// port. Errors if the fork is not active.
    pub async fn delete_fork(&self, fork_id: &str) -> Result<()> {
        delete_fork_inner(&self.registry, &self.supervisor, fork_id).await
    }

    /// Forwards `raw_body` as a `Content-Type: application/json` POST to
    /// the fork's local node, passing through its status and body.
    pub async fn forward_rpc(&self, fork_id: &str, raw_body: Vec<u8>) -> Result<ForwardedResponse> {
        if !self.registry.is_active(fork_id).await {
            return Err(DebugError::ForkInactive(fork_id.to_string()));
        }
        let port = self.registry.port_of(fork_id).await?;

        let response = self
            .http_client
            .post(format!("http://0.0.0.0:{port}"))
            .header("content-type", "application/json")
            .body(raw_body)
            .send()
            .await
            .map_err(|e| DebugError::UpstreamRpcFailure(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| DebugError::UpstreamRpcFailure(e.to_string()))?
            .to_vec();

        Ok(ForwardedResponse { status, body })
    }

    /// Whether `fork_id` currently owns an active port/process.
    pub async fn is_active(&self, fork_id: &str) -> bool {
        self.registry.is_active(fork_id).await
    }

    /// The local RPC URL a fork can be reached at, for callers that want
    /// to talk to it directly instead of through `forward_rpc`.
    pub async fn rpc_url(&self, fork_id: &str) -> Result<String> {
        let port = self.registry.port_of(fork_id).await?;
        Ok(format!("http://0.0.0.0:{port}"))
    }
}

async fn delete_fork_inner(
    registry: &PortRegistry,
    supervisor: &ProcessSupervisor,
    fork_id: &str,
) -> Result<()> {
    if !registry.is_active(fork_id).await {
        return Err(DebugError::ForkInactive(fork_id.to_string()));
    }
    let port = registry.port_of(fork_id).await?;
    supervisor.stop(port).await?;
    registry.release(fork_id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forward_rpc_on_unknown_fork_is_inactive_error() {
        let manager = ForkManager::new("http://localhost:8545");
        manager.allocate_ports(&[18545]).await;

        let err = manager.forward_rpc("nonexistent", b"{}".to_vec()).await.unwrap_err();
        assert!(matches!(err, DebugError::ForkInactive(_)));
    }

    #[tokio::test]
    async fn delete_fork_on_never_created_id_is_an_error() {
        let manager = ForkManager::new("http://localhost:8545");
        let err = manager.delete_fork("nonexistent").await.unwrap_err();
        assert!(matches!(err, DebugError::ForkInactive(_)));
    }
}
