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

//! Error taxonomy shared across the fork manager, debug engine and server.
//!
//! Variants map one-to-one onto the error taxonomy in the design: most
//! propagate straight to the HTTP layer, but `PcNotFound`,
//! `SourceMapOutOfBounds` and `InvalidFileId` are caught inside the debug
//! correlator and turned into a degraded trace entry instead of an error
//! response.

use thiserror::Error;

/// Errors produced anywhere in the fork orchestration or trace
/// correlation pipeline.
#[derive(Debug, Error)]
pub enum DebugError {
    /// Malformed address/hex, bad duration, or a missing query parameter.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No free port in the registry.
    #[error("no port available")]
    NoPortAvailable,

    /// The fork id is known but is not currently backed by a running
    /// process (already deleted, or never active).
    #[error("fork {0} is not active")]
    ForkInactive(String),

    /// The fork id has no corresponding row in the registry at all.
    #[error("fork {0} not found")]
    ForkNotFound(String),

    /// Transport or decode error talking to a local fork's JSON-RPC.
    #[error("upstream RPC failure: {0}")]
    UpstreamRpcFailure(String),

    /// The block explorer returned a non-OK status (other than the
    /// transparently-retried rate limit).
    #[error("explorer failure: {0}")]
    ExplorerFailure(String),

    /// The compiler binary was missing or exited non-zero.
    #[error("compiler failure: {0}")]
    CompilerFailure(String),

    /// A target PC could not be mapped to an opcode index (degraded,
    /// non-fatal: caught by the correlator).
    #[error("pc {pc} not found in bytecode of length {len}")]
    PcNotFound {
        /// The program counter that could not be resolved.
        pc: usize,
        /// Length in bytes of the bytecode that was scanned.
        len: usize,
    },

    /// An opcode index fell outside the decompressed source-map
    /// (degraded, non-fatal: caught by the correlator).
    #[error("opcode index {index} is out of bounds for source map of length {len}")]
    SourceMapOutOfBounds {
        /// The opcode-sequence index that was looked up.
        index: usize,
        /// Number of entries in the decompressed source map.
        len: usize,
    },

    /// A source-map entry's `file_id` was not a valid index into the
    /// source bundle (degraded, non-fatal: caught by the correlator).
    #[error("invalid file id {0:?}")]
    InvalidFileId(String),

    /// No opcode was ever emitted while walking the struct-log stream;
    /// request-fatal.
    #[error("no debug trace could be produced for this transaction")]
    NoDebugTrace,

    /// The ERC-20 balance probe exhausted slots `0..100` without finding
    /// one that accepted the forced balance.
    #[error("no balance mapping slot found for token {0}")]
    MappingSlotNotFound(String),
}

impl DebugError {
    /// Short machine-readable name of the variant, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "InvalidInput",
            Self::NoPortAvailable => "NoPortAvailable",
            Self::ForkInactive(_) => "ForkInactive",
            Self::ForkNotFound(_) => "ForkNotFound",
            Self::UpstreamRpcFailure(_) => "UpstreamRPCFailure",
            Self::ExplorerFailure(_) => "ExplorerFailure",
            Self::CompilerFailure(_) => "CompilerFailure",
            Self::PcNotFound { .. } => "PCNotFound",
            Self::SourceMapOutOfBounds { .. } => "SourceMapOutOfBounds",
            Self::InvalidFileId(_) => "InvalidFileId",
            Self::NoDebugTrace => "NoDebugTrace",
            Self::MappingSlotNotFound(_) => "MappingSlotNotFound",
        }
    }
}

/// Convenience alias used throughout the fork manager and debug engine.
pub type Result<T> = std::result::Result<T, DebugError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_stable_for_http_mapping() {
        assert_eq!(DebugError::NoPortAvailable.kind(), "NoPortAvailable");
        assert_eq!(
            DebugError::PcNotFound { pc: 4, len: 2 }.kind(),
            "PCNotFound"
        );
    }
}
