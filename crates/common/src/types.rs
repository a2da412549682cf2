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

//! Data model shared by the fork manager and debug engine (spec §3).

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// One row of the port registry (C1).
///
/// `active == true` iff a child process is believed to be running on
/// `port`, in which case `fork_id` is its current lease id. When
/// `active == false`, `fork_id` is a tombstone placeholder left behind
/// by the most recent lease and carries no live process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortRow {
    /// The local TCP port this row tracks.
    pub port_number: u16,
    /// Whether a fork process currently holds this port.
    pub active: bool,
    /// Current (or tombstoned) fork id for this port.
    pub fork_id: String,
}

/// An opcode-level source-map entry (C6), fields always fully resolved
/// (inheritance already applied).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMapEntry {
    /// Byte offset into the source file.
    pub offset: i64,
    /// Byte length of the mapped source range.
    pub length: i64,
    /// Index into the compiled contract's `sources` map.
    pub file_id: i64,
    /// Jump type: `"i"`, `"o"`, or `"-"` for a non-jump instruction.
    pub jump_type: String,
    /// Modifier invocation depth.
    pub modifier_depth: i64,
}

/// Post-processed compiled-contract record, persisted once per address
/// under `output/compiledContracts/<address>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledContractRecord {
    /// Compressed runtime source map exactly as emitted by the compiler.
    pub srcmap: String,
    /// File-id (as a string) to source-file-path map.
    pub sources: BTreeMap<String, String>,
}

/// Placeholder record used for unverified contracts (spec §4.6).
pub fn unverified_compiled_record() -> CompiledContractRecord {
    CompiledContractRecord {
        srcmap: String::new(),
        sources: BTreeMap::from([("0".to_string(), "unverified.sol".to_string())]),
    }
}

/// Placeholder source bundle used for unverified contracts (spec §4.6).
pub fn unverified_source_bundle() -> BTreeMap<String, String> {
    BTreeMap::from([(
        "unverified.sol".to_string(),
        "// No source code available - contract is not verified".to_string(),
    )])
}

/// Per-depth contract context built while walking a flattened call trace
/// (spec §3 "Contract entry").
#[derive(Debug, Clone)]
pub struct ContractEntry {
    /// Address of the contract at this call depth.
    pub address: String,
    /// Deployed bytecode, hex-encoded with a `0x` prefix.
    pub deployed_bytecode: String,
    /// Source bundle: file path to file contents.
    pub source_bundle: BTreeMap<String, String>,
    /// File-id to file-path map, taken from the compiled record.
    pub file_names: BTreeMap<String, String>,
    /// Decompressed source map (one entry per opcode in emission order).
    pub decompressed_source_map: Vec<SourceMapEntry>,
}

impl ContractEntry {
    /// Whether this entry is the unverified-contract placeholder.
    pub fn is_unverified(&self) -> bool {
        self.file_names.get("0").map(|s| s == "unverified.sol").unwrap_or(false)
    }
}

/// One retained, line-annotated opcode step in the filtered trace (spec
/// §3 "CallTrace").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTraceStep {
    /// Opcode mnemonic, e.g. `"SSTORE"`.
    pub opcode: String,
    /// 1-indexed source line number, or `-1` for a degraded entry.
    pub line_number: i64,
    /// Source file the step maps to (`"unverified.sol"` /
    /// `"unknown"` for placeholders and degraded entries).
    pub file: String,
    /// Address of the contract executing this step.
    pub contract_address: String,
    /// Call depth (matches the struct-log `depth`, which starts at 1).
    pub depth: u64,
}

/// One node of the flattened call-tracer tree, decorated with decoded
/// function signature and arguments (spec §3 "ContractCalled").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractCalled {
    /// Address the call targeted.
    pub contract_address: String,
    /// Call type: `"CALL"`, `"DELEGATECALL"`, `"STATICCALL"`, `"CREATE"`, ...
    pub call_type: String,
    /// Resolved function signature, or `"Unknown"` if it could not be
    /// decoded (unverified contract, short calldata, ABI fetch failure).
    pub function_signature: String,
    /// Decoded `(name, type, value)` triples, `None` when `Unknown`.
    pub arguments: Option<Vec<ArgumentTriple>>,
}

/// A single decoded function argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgumentTriple {
    /// Argument name, or a positional name (`"arg0"`, ...) when the ABI
    /// declares no name.
    pub name: String,
    /// Solidity type string, e.g. `"uint256"`.
    pub r#type: String,
    /// Decoded value, rendered as a string.
    pub value: String,
}

/// One flattened node of the call-tracer tree (pre-order, depth starting
/// at 0 for the root), as produced by [`crate`]-independent RPC clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatCallTraceNode {
    /// Call type (`"CALL"`, `"STATICCALL"`, `"CREATE"`, ...).
    pub r#type: String,
    /// Caller address.
    pub from: String,
    /// Callee address (empty for contract creation until deployed).
    pub to: String,
    /// Hex-encoded wei value transferred.
    pub value: Option<String>,
    /// Hex-encoded gas limit.
    pub gas: String,
    /// Hex-encoded gas used.
    pub gas_used: String,
    /// Hex-encoded calldata.
    pub input: String,
    /// Hex-encoded return data, if any.
    pub output: Option<String>,
    /// Revert/error message reported by the tracer, if any.
    pub error: Option<String>,
    /// Pre-order depth, 0 for the root call.
    pub depth: u64,
}

/// One entry of a `debug_traceTransaction` struct-log stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructLogEntry {
    /// Program counter at this step.
    pub pc: usize,
    /// Opcode mnemonic.
    pub op: String,
    /// Call depth, starting at 1 for the top-level call.
    pub depth: u64,
    /// Remaining gas.
    pub gas: u64,
    /// Gas cost of this step.
    pub gas_cost: u64,
    /// EVM stack contents at this step, top last.
    pub stack: Vec<String>,
}

/// Decoded `debug_traceTransaction` response with the default
/// struct-logger config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpcodeTrace {
    /// Whether the transaction reverted.
    pub failed: bool,
    /// Gas used.
    pub gas: u64,
    /// Hex-encoded return value.
    pub return_value: String,
    /// Ordered struct-log entries.
    pub struct_logs: Vec<StructLogEntry>,
}

/// The set of opcodes the debug correlator retains in its filtered
/// output (spec §4.7 step 6).
pub const TARGET_OPCODES: &[&str] = &[
    "CALL",
    "DELEGATECALL",
    "STATICCALL",
    "CREATE",
    "CREATE2",
    "SLOAD",
    "SSTORE",
    "LOG0",
    "LOG1",
    "LOG2",
    "LOG3",
    "LOG4",
    "REVERT",
    "JUMP",
];

/// `TARGET_OPCODES` as a lazily-built hash set, so the correlator's
/// per-struct-log membership check is O(1) instead of a linear scan.
pub static TARGET_OPCODE_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| TARGET_OPCODES.iter().copied().collect());
