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

//! Contract source/ABI fetching, compilation, and PC-to-source
//! correlation, layered over `fork_manager`.

pub mod abi;
pub mod correlator;
pub mod explorer;
pub mod sourcemap;

pub use abi::{decode_call, AbiDecodeError, DecodedCall};
pub use correlator::{DebugCorrelator, DebugTraceResult};
pub use explorer::{ExplorerClient, SourceCodeInfo};
