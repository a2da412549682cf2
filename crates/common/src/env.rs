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

//! Environment variable name constants.
//!
//! Centralizing the names here keeps `server`'s config loader and any
//! documentation in sync with what the rest of the workspace actually reads.

/// Comma-separated list of local ports the fork manager is allowed to
/// bind anvil-like fork processes to, e.g. `"8545,8546,8547"`.
pub const PORTS: &str = "PORTS";

/// Upstream JSON-RPC endpoint that new forks replicate state from.
pub const RPC_URL: &str = "RPC_URL";

/// API key used by the block-explorer client.
pub const ETHERSCAN_API_KEY: &str = "ETHERSCAN_API_KEY";

/// Overrides the on-disk cache root (fetched source, compiled-contract
/// records). Defaults to `output/` under the working directory.
pub const DEBUG_CACHE_DIR: &str = "DEBUG_CACHE_DIR";

/// Overrides the directory daily-rotating log files are written to.
pub const DEBUG_LOG_DIR: &str = "DEBUG_LOG_DIR";

/// Standard `tracing-subscriber` env filter, e.g. `"debug"` or
/// `"evm_debug_service=trace,tower_http=warn"`.
pub const RUST_LOG: &str = "RUST_LOG";
