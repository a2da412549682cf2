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

//! Layered configuration: built-in defaults, then `.env`, then real
//! environment variables, then CLI flags (later wins).

use std::path::PathBuf;

use clap::Parser;
use debug_common::env as env_names;

#[derive(Parser, Debug)]
#[command(name = "evm-debug-service", about = "EVM transaction debugger and simulation service")]
struct CliArgs {
    /// Address the HTTP server binds to.
    #[arg(long)]
    host: Option<String>,

    /// Port the HTTP server listens on.
    #[arg(long)]
    port: Option<u16>,

    /// Comma-separated list of local ports the fork manager may bind to.
    #[arg(long)]
    ports: Option<String>,

    /// Upstream JSON-RPC endpoint new forks replicate from.
    #[arg(long = "rpc-url")]
    rpc_url: Option<String>,

    /// Root directory for fetched source and compiled-contract caches.
    #[arg(long = "cache-dir")]
    cache_dir: Option<PathBuf>,

    /// Chain id passed to the block-explorer API.
    #[arg(long = "chain-id")]
    chain_id: Option<u64>,

    /// Disable the daily-rotating file log layer.
    #[arg(long = "no-file-log")]
    no_file_log: bool,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    pub host: String,
    /// Port the HTTP server listens on.
    pub port: u16,
    /// Ports seeded into the fork manager's port registry.
    pub fork_ports: Vec<u16>,
    /// Upstream JSON-RPC endpoint new forks replicate from.
    pub rpc_url: String,
    /// API key for the block-explorer client (may be empty for public-only access).
    pub etherscan_api_key: String,
    /// Root directory for the `sourceCodeInfos/` and `compiledContracts/` caches.
    pub cache_dir: PathBuf,
    /// Chain id passed to the block-explorer API.
    pub chain_id: u64,
    /// Whether to enable the daily-rotating file log layer.
    pub enable_file_log: bool,
}

impl ServerConfig {
    /// Loads configuration from `.env`, the environment, and CLI flags.
    /// `RPC_URL` and a non-empty `PORTS` list are mandatory; there is no
    /// sensible degraded mode for a fork orchestrator with neither.
    pub fn load() -> eyre::Result<Self> {
        if dotenvy::dotenv().is_err() {
            tracing::debug!("no .env file found, continuing with process environment");
        }

        let cli = CliArgs::parse();

        let ports_raw = cli
            .ports
            .or_else(|| std::env::var(env_names::PORTS).ok())
            .ok_or_else(|| eyre::eyre!("{} must be set (no fork ports configured)", env_names::PORTS))?;
        let fork_ports = parse_ports(&ports_raw)?;
        if fork_ports.is_empty() {
            eyre::bail!("{} resolved to an empty port list", env_names::PORTS);
        }

        let rpc_url = cli
            .rpc_url
            .or_else(|| std::env::var(env_names::RPC_URL).ok())
            .ok_or_else(|| eyre::eyre!("{} must be set", env_names::RPC_URL))?;

        let etherscan_api_key = std::env::var(env_names::ETHERSCAN_API_KEY).unwrap_or_default();

        let cache_dir = cli
            .cache_dir
            .or_else(|| std::env::var(env_names::DEBUG_CACHE_DIR).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("output"));

        Ok(Self {
            host: cli.host.unwrap_or_else(|| "0.0.0.0".to_string()),
            port: cli.port.unwrap_or(3000),
            fork_ports,
            rpc_url,
            etherscan_api_key,
            cache_dir,
            chain_id: cli.chain_id.unwrap_or(1),
            enable_file_log: !cli.no_file_log,
        })
    }
}

fn parse_ports(raw: &str) -> eyre::Result<Vec<u16>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u16>().map_err(|e| eyre::eyre!("invalid port {s:?}: {e}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ports_trims_and_skips_blanks() {
        assert_eq!(parse_ports("8545, 8546,,8547").unwrap(), vec![8545, 8546, 8547]);
    }

    #[test]
    fn parse_ports_rejects_garbage() {
        assert!(parse_ports("8545,notaport").is_err());
    }
}
