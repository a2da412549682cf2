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

//! In-memory port registry (C1): a bounded pool of `(port, active,
//! fork_id)` rows, mutated under a single mutex so that `reserve`,
//! `release`, `port_of` and `is_active` never interleave.

use std::collections::BTreeMap;

use debug_common::{error::Result, types::PortRow, DebugError};
use tokio::sync::Mutex;

/// Port registry for the fork manager.
///
/// All mutating operations are serialized by one `tokio::sync::Mutex`
/// guarding a `BTreeMap<u16, PortRow>`, which also gives `reserve` a
/// deterministic ascending-port selection order for free.
pub struct PortRegistry {
    rows: Mutex<BTreeMap<u16, PortRow>>,
}

impl Default for PortRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PortRegistry {
    /// Creates an empty registry. Call [`Self::allocate_ports`] to seed it.
    pub fn new() -> Self {
        Self { rows: Mutex::new(BTreeMap::new()) }
    }

    /// Seeds the registry with each of `ports` as an inactive row with a
    /// fresh tombstone fork id. Duplicate ports are reported in the
    /// returned error list but do not prevent the remaining ports from
    /// being seeded (idempotent-on-duplicate, per spec §4.1).
    pub async fn allocate_ports(&self, ports: &[u16]) -> Vec<DebugError> {
        let mut rows = self.rows.lock().await;
        let mut errors = Vec::new();

        for &port in ports {
            if rows.contains_key(&port) {
                errors.push(DebugError::InvalidInput(format!("port {port} already allocated")));
                continue;
            }
            rows.insert(
                port,
                PortRow { port_number: port, active: false, fork_id: new_fork_id() },
            );
        }

        errors
    }

    /// Reserves any inactive row (lowest port first), marks it active
    /// with a freshly generated fork id, and returns both.
    pub async fn reserve(&self) -> Result<(u16, String)> {
        let mut rows = self.rows.lock().await;

        let port = rows
            .iter()
            .find(|(_, row)| !row.active)
            .map(|(port, _)| *port)
            .ok_or(DebugError::NoPortAvailable)?;

        let fork_id = new_fork_id();
        let row = rows.get_mut(&port).expect("port located above");
        row.active = true;
        row.fork_id = fork_id.clone();

        Ok((port, fork_id))
    }

    /// Marks the row owning `fork_id` inactive. The fork id is left in
    /// place as a tombstone; a later `reserve` on that port overwrites it.
    pub async fn release(&self, fork_id: &str) -> Result<()> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .values_mut()
            .find(|row| row.fork_id == fork_id)
            .ok_or_else(|| DebugError::ForkNotFound(fork_id.to_string()))?;
        row.active = false;
        Ok(())
    }

    /// Returns the port currently (or most recently) leased to `fork_id`.
    pub async fn port_of(&self, fork_id: &str) -> Result<u16> {
        let rows = self.rows.lock().await;
        rows.values()
            .find(|row| row.fork_id == fork_id)
            .map(|row| row.port_number)
            .ok_or_else(|| DebugError::ForkNotFound(fork_id.to_string()))
    }

    /// Whether `fork_id` currently owns an active row. Unknown fork ids
    /// are reported as inactive rather than an error.
    pub async fn is_active(&self, fork_id: &str) -> bool {
        let rows = self.rows.lock().await;
        rows.values().any(|row| row.fork_id == fork_id && row.active)
    }

    /// Snapshot of all rows, for diagnostics and tests.
    pub async fn rows(&self) -> Vec<PortRow> {
        self.rows.lock().await.values().cloned().collect()
    }
}

fn new_fork_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reserve_picks_lowest_free_port_first() {
        let registry = PortRegistry::new();
        registry.allocate_ports(&[8547, 8545, 8546]).await;

        let (port, _fork_id) = registry.reserve().await.unwrap();
        assert_eq!(port, 8545);
    }

    #[tokio::test]
    async fn reserve_fails_when_exhausted() {
        let registry = PortRegistry::new();
        registry.allocate_ports(&[8545]).await;

        registry.reserve().await.unwrap();
        let err = registry.reserve().await.unwrap_err();
        assert!(matches!(err, DebugError::NoPortAvailable));
    }

    #[tokio::test]
    async fn release_frees_the_port_for_reuse() {
        let registry = PortRegistry::new();
        registry.allocate_ports(&[8545]).await;

        let (_port, fork_id) = registry.reserve().await.unwrap();
        assert!(registry.is_active(&fork_id).await);

        registry.release(&fork_id).await.unwrap();
        assert!(!registry.is_active(&fork_id).await);

        let (port2, fork_id2) = registry.reserve().await.unwrap();
        assert_eq!(port2, 8545);
        assert_ne!(fork_id2, fork_id);
    }

    #[tokio::test]
    async fn duplicate_seed_is_reported_but_does_not_abort() {
        let registry = PortRegistry::new();
        let errors = registry.allocate_ports(&[8545, 8545, 8546]).await;
        assert_eq!(errors.len(), 1);
        assert_eq!(registry.rows().await.len(), 2);
    }

    #[tokio::test]
    async fn port_of_and_is_active_report_unknown_fork_gracefully() {
        let registry = PortRegistry::new();
        assert!(!registry.is_active("nonexistent").await);
        assert!(registry.port_of("nonexistent").await.is_err());
    }
}
