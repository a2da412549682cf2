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

//! Fork lifecycle orchestration: port registry, process supervisor,
//! fork manager, JSON-RPC client, ERC-20 balance probe, and the Axum
//! routes that expose them.

pub mod erc20;
pub mod manager;
pub mod registry;
pub mod routes;
pub mod rpc;
pub mod supervisor;

pub use manager::{ForkManager, ForwardedResponse};
pub use registry::PortRegistry;
pub use rpc::RpcClient;
pub use supervisor::ProcessSupervisor;
