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

//! Local EVM-fork process supervisor (C2).
//!
//! Spawns and kills the `anvil` binary bound to a given port, keeping
//! its process handle in a process-wide table keyed by port. The
//! supervisor does not probe readiness itself — callers wait a
//! conservative delay (see `fork-manager::manager`) before the first RPC.

use std::{
    collections::HashMap,
    process::{Child, Stdio},
};

use debug_common::{error::Result, DebugError};
use tokio::sync::Mutex;

/// Binary name of the local EVM fork node, expected to be on `PATH`.
pub const FORK_BINARY: &str = "anvil";

/// Supervises `anvil` child processes, one per port.
pub struct ProcessSupervisor {
    processes: Mutex<HashMap<u16, Child>>,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSupervisor {
    /// Creates an empty supervisor.
    pub fn new() -> Self {
        Self { processes: Mutex::new(HashMap::new()) }
    }

    /// Spawns `anvil --steps-tracing --port <port> --host 0.0.0.0
    /// --fork-url <upstream_rpc_url>`, optionally pinned to
    /// `block_number` via `--fork-block-number`.
    pub async fn start(
        &self,
        port: u16,
        upstream_rpc_url: &str,
        block_number: Option<u64>,
    ) -> Result<()> {
        let mut command = std::process::Command::new(FORK_BINARY);
        command
            .arg("--steps-tracing")
            .arg("--port")
            .arg(port.to_string())
            .arg("--host")
            .arg("0.0.0.0")
            .arg("--fork-url")
            .arg(upstream_rpc_url);

        if let Some(block_number) = block_number {
            command.arg("--fork-block-number").arg(block_number.to_string());
        }

        command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

        tracing::debug!(port, upstream_rpc_url, block_number, "spawning local fork process");

        let child = command
            .spawn()
            .map_err(|e| DebugError::UpstreamRpcFailure(format!("failed to spawn {FORK_BINARY}: {e}")))?;

        self.processes.lock().await.insert(port, child);
        Ok(())
    }

    /// Kills the process bound to `port` and forgets its handle. Errors
    /// if no process is tracked for that port.
    pub async fn stop(&self, port: u16) -> Result<()> {
        let mut processes = self.processes.lock().await;
        let mut child = processes
            .remove(&port)
            .ok_or_else(|| DebugError::InvalidInput(format!("no process tracked for port {port}")))?;

        child.kill().map_err(|e| DebugError::UpstreamRpcFailure(format!("failed to kill process on port {port}: {e}")))?;
        let _ = child.wait();
        Ok(())
    }

    /// Whether a process handle is currently tracked for `port`. This is
    /// a liveness *belief*, not a re-verified OS-level check.
    pub async fn is_running(&self, port: u16) -> bool {
        self.processes.lock().await.contains_key(&port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_unknown_port_is_an_error() {
        let supervisor = ProcessSupervisor::new();
        let err = supervisor.stop(9999).await.unwrap_err();
        assert!(matches!(err, DebugError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn is_running_is_false_for_untracked_port() {
        let supervisor = ProcessSupervisor::new();
        assert!(!supervisor.is_running(9999).await);
    }
}
