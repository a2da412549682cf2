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

//! Source-map pipeline (C6): fetch-and-persist source, shell out to a
//! version-pinned `solc`, decompress the resulting runtime source map,
//! and translate program counters to opcode-sequence indices.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    process::Command,
};

use debug_common::{
    cache::{Cache, DebugCache},
    error::Result,
    types::{unverified_compiled_record, unverified_source_bundle, CompiledContractRecord, SourceMapEntry},
    DebugError,
};
use serde_json::Value;

use crate::explorer::{ExplorerClient, SourceCodeInfo};

/// Decompresses a `;`/`:`-delimited compiler source map into one entry
/// per opcode, applying left-to-right field inheritance (spec §4.6).
pub fn decompress_source_map(compressed: &str) -> Vec<SourceMapEntry> {
    let mut entries = Vec::new();
    let mut prev = SourceMapEntry { offset: 0, length: 0, file_id: 0, jump_type: "-".to_string(), modifier_depth: 0 };

    for raw_entry in compressed.split(';') {
        let fields: Vec<&str> = raw_entry.split(':').collect();

        let entry = SourceMapEntry {
            offset: inherited_i64(fields.first().copied(), prev.offset),
            length: inherited_i64(fields.get(1).copied(), prev.length),
            file_id: inherited_i64(fields.get(2).copied(), prev.file_id),
            jump_type: inherited_str(fields.get(3).copied(), &prev.jump_type),
            modifier_depth: inherited_i64(fields.get(4).copied(), prev.modifier_depth),
        };

        entries.push(entry.clone());
        prev = entry;
    }

    entries
}

fn inherited_i64(field: Option<&str>, previous: i64) -> i64 {
    match field {
        None | Some("") => previous,
        Some(s) => s.parse().unwrap_or(previous),
    }
}

fn inherited_str(field: Option<&str>, previous: &str) -> String {
    match field {
        None | Some("") => previous.to_string(),
        Some(s) => s.to_string(),
    }
}

/// Maps a target program counter to its opcode-sequence index by
/// scanning deployed bytecode byte-by-byte, skipping `PUSHn` immediates
/// (spec §4.6).
pub fn pc_to_opcode_index(deployed_bytecode_hex: &str, target_pc: usize) -> Result<usize> {
    let hex_body = deployed_bytecode_hex.trim_start_matches("0x");
    let bytes =
        hex::decode(hex_body).map_err(|e| DebugError::InvalidInput(format!("malformed bytecode: {e}")))?;

    let len = bytes.len();
    let mut pc = 0usize;
    let mut opcode_counter = 0usize;

    while pc < len {
        if pc == target_pc {
            return Ok(opcode_counter);
        }

        let opcode = bytes[pc];
        if (0x60..=0x7f).contains(&opcode) {
            let n = (opcode - 0x5f) as usize;
            if target_pc > pc && target_pc < pc + n + 1 {
                return Ok(opcode_counter);
            }
            pc += n + 1;
        } else {
            pc += 1;
        }
        opcode_counter += 1;
    }

    Err(DebugError::PcNotFound { pc: target_pc, len })
}

/// Resolves a 1-indexed source line number from a byte offset: the
/// count of `\n`-split segments in the prefix up to `offset`.
pub fn resolve_line_number(source: &str, offset: i64) -> i64 {
    if offset < 0 {
        return -1;
    }
    let offset = offset as usize;
    let prefix_end = offset.min(source.len());
    source.as_bytes()[..prefix_end].iter().filter(|&&b| b == b'\n').count() as i64 + 1
}

/// Fetches (or loads from disk) the source bundle and compiled record
/// for `address`. Falls back to the unverified placeholder on any
/// explorer, filesystem or compiler failure rather than propagating it
/// (spec §4.6 "Unverified fallback").
pub async fn fetch_source_and_compiled(
    explorer: &ExplorerClient,
    address: &str,
    output_dir: &Path,
) -> (BTreeMap<String, String>, CompiledContractRecord) {
    match try_fetch_and_compile(explorer, address, output_dir).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(address, error = %e, "contract treated as unverified");
            (unverified_source_bundle(), unverified_compiled_record())
        }
    }
}

async fn try_fetch_and_compile(
    explorer: &ExplorerClient,
    address: &str,
    output_dir: &Path,
) -> Result<(BTreeMap<String, String>, CompiledContractRecord)> {
    let sol_path = source_info_path(output_dir, address, false);
    let json_path = source_info_path(output_dir, address, true);
    // Compiled records are immutable once a verified contract has been
    // compiled once, so they never expire (spec §3's "cached on disk
    // indefinitely" lifecycle).
    let compiled_cache: DebugCache<CompiledContractRecord> =
        DebugCache::new(output_dir.join("compiledContracts"), None).map_err(io_err)?;

    if sol_path.exists() || json_path.exists() {
        if let Some(record) = compiled_cache.load_cache(address) {
            let bundle = load_bundle_from_disk(&sol_path, &json_path, &record)?;
            return Ok((bundle, record));
        }
    }

    let info = explorer.get_source_code_info(address).await?;
    let saved_path = save_source(&sol_path, &json_path, &info)?;
    let record = compile(address, &info, &saved_path, output_dir)?;
    compiled_cache.save_cache(address, &record).map_err(io_err)?;
    let bundle = load_bundle_from_disk(&sol_path, &json_path, &record)?;
    Ok((bundle, record))
}

fn source_info_path(output_dir: &Path, address: &str, standard_json: bool) -> PathBuf {
    let ext = if standard_json { "json" } else { "sol" };
    output_dir.join("sourceCodeInfos").join(format!("{address}.{ext}"))
}

fn save_source(sol_path: &Path, json_path: &Path, info: &SourceCodeInfo) -> Result<PathBuf> {
    let path = if info.is_standard_json { json_path } else { sol_path };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, &info.source_code).map_err(io_err)?;
    Ok(path.to_path_buf())
}

fn load_bundle_from_disk(
    sol_path: &Path,
    json_path: &Path,
    record: &CompiledContractRecord,
) -> Result<BTreeMap<String, String>> {
    if sol_path.exists() {
        let content = std::fs::read_to_string(sol_path).map_err(io_err)?;
        let only_file = record.sources.values().next().cloned().unwrap_or_else(|| "unverified.sol".to_string());
        return Ok(BTreeMap::from([(only_file, content)]));
    }

    let content = std::fs::read_to_string(json_path).map_err(io_err)?;
    let parsed: Value = serde_json::from_str(&content)
        .map_err(|e| DebugError::CompilerFailure(format!("malformed standard-json input: {e}")))?;

    let mut bundle = BTreeMap::new();
    if let Some(sources) = parsed.get("sources").and_then(Value::as_object) {
        for (path, meta) in sources {
            if let Some(file_content) = meta.get("content").and_then(Value::as_str) {
                bundle.insert(path.clone(), file_content.to_string());
            }
        }
    }
    Ok(bundle)
}

fn io_err(e: std::io::Error) -> DebugError {
    DebugError::CompilerFailure(format!("filesystem error: {e}"))
}

/// Shells out to `solc/<compiler_version>` and post-processes its
/// output into `{srcmap, sources}` (spec §4.6 "Compile").
fn compile(
    address: &str,
    info: &SourceCodeInfo,
    source_path: &Path,
    output_dir: &Path,
) -> Result<CompiledContractRecord> {
    let compiler_path = PathBuf::from("solc").join(&info.compiler_version);
    if !compiler_path.exists() {
        return Err(DebugError::CompilerFailure(format!(
            "compiler binary not found at {}",
            compiler_path.display()
        )));
    }

    if info.is_standard_json {
        compile_standard_json(address, &compiler_path, source_path, output_dir, info)
    } else {
        compile_single_file(address, &compiler_path, source_path, output_dir, info)
    }
}

fn compile_single_file(
    address: &str,
    compiler_path: &Path,
    source_path: &Path,
    output_dir: &Path,
    info: &SourceCodeInfo,
) -> Result<CompiledContractRecord> {
    let mut command = Command::new(compiler_path);
    command.arg(source_path).arg("-o").arg(output_dir).arg("--combined-json").arg("srcmap-runtime");

    if !info.evm_version.is_empty() && info.evm_version != "default" {
        command.arg("--evm-version").arg(&info.evm_version);
    }
    if info.optimization_used {
        command.arg("--optimize");
        if info.runs > 0 {
            command.arg("--optimize-runs").arg(info.runs.to_string());
        }
    }

    let output = command.output().map_err(|e| DebugError::CompilerFailure(format!("failed to spawn solc: {e}")))?;
    if !output.status.success() {
        return Err(DebugError::CompilerFailure(format!(
            "solc exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let combined_path = output_dir.join("combined.json");
    let combined: Value = serde_json::from_str(&std::fs::read_to_string(&combined_path).map_err(io_err)?)
        .map_err(|e| DebugError::CompilerFailure(format!("malformed combined.json: {e}")))?;

    let contracts = combined
        .get("contracts")
        .and_then(Value::as_object)
        .ok_or_else(|| DebugError::CompilerFailure("combined.json has no contracts section".to_string()))?;

    let srcmap = contracts
        .iter()
        .find(|(key, _)| key.ends_with(&format!(":{}", info.contract_name)) || key.contains(&info.contract_name))
        .and_then(|(_, value)| value.get("srcmap-runtime"))
        .and_then(Value::as_str)
        .ok_or_else(|| DebugError::CompilerFailure(format!("contract {} not found in compiler output", info.contract_name)))?
        .to_string();

    Ok(CompiledContractRecord { srcmap, sources: BTreeMap::from([("0".to_string(), format!("{address}.sol"))]) })
}

fn compile_standard_json(
    address: &str,
    compiler_path: &Path,
    source_path: &Path,
    output_dir: &Path,
    info: &SourceCodeInfo,
) -> Result<CompiledContractRecord> {
    let mut command = Command::new(compiler_path);
    command.arg("--standard-json").arg(source_path).arg("-o").arg(output_dir);

    let output = command.output().map_err(|e| DebugError::CompilerFailure(format!("failed to spawn solc: {e}")))?;
    if !output.status.success() {
        return Err(DebugError::CompilerFailure(format!(
            "solc exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let captured_path = output_dir.join(format!("{address}.json"));
    std::fs::write(&captured_path, &output.stdout).map_err(io_err)?;

    let parsed: Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| DebugError::CompilerFailure(format!("malformed standard-json output: {e}")))?;

    let target_filename = format!("{}.sol", info.contract_name);
    let contracts = parsed
        .get("contracts")
        .and_then(Value::as_object)
        .ok_or_else(|| DebugError::CompilerFailure("standard-json output has no contracts section".to_string()))?;

    let contract_entry = contracts
        .iter()
        .find(|(file, _)| file.as_str() == target_filename || file.ends_with(&target_filename))
        .map(|(_, value)| value)
        .ok_or_else(|| DebugError::CompilerFailure(format!("file {target_filename} not found in compiler output")))?;

    let srcmap = contract_entry
        .get(&info.contract_name)
        .and_then(|c| c.get("evm"))
        .and_then(|e| e.get("deployedBytecode"))
        .and_then(|b| b.get("sourceMap"))
        .and_then(Value::as_str)
        .ok_or_else(|| DebugError::CompilerFailure(format!("no deployed source map for {}", info.contract_name)))?
        .to_string();

    let mut sources = BTreeMap::new();
    if let Some(source_entries) = parsed.get("sources").and_then(Value::as_object) {
        for (path, meta) in source_entries {
            if let Some(id) = meta.get("id").and_then(Value::as_u64) {
                sources.insert(id.to_string(), path.clone());
            }
        }
    }

    Ok(CompiledContractRecord { srcmap, sources })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decompress_inherits_omitted_and_empty_fields() {
        let entries = decompress_source_map("1:2:0:-:0;:::i;3");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], SourceMapEntry { offset: 1, length: 2, file_id: 0, jump_type: "-".into(), modifier_depth: 0 });
        // second entry has all-empty fields, inherits everything from the first
        assert_eq!(entries[1], SourceMapEntry { offset: 1, length: 2, file_id: 0, jump_type: "i".into(), modifier_depth: 0 });
        // third entry only sets offset, inherits the rest from the second
        assert_eq!(entries[2], SourceMapEntry { offset: 3, length: 2, file_id: 0, jump_type: "i".into(), modifier_depth: 0 });
    }

    #[test]
    fn decompress_is_idempotent_under_recompression() {
        let entries = decompress_source_map("1:2:0:-:0;5:2:0:-:0");
        let recompressed: Vec<String> = entries
            .iter()
            .map(|e| format!("{}:{}:{}:{}:{}", e.offset, e.length, e.file_id, e.jump_type, e.modifier_depth))
            .collect();
        let roundtripped = decompress_source_map(&recompressed.join(";"));
        assert_eq!(entries, roundtripped);
    }

    #[test]
    fn pc_to_opcode_index_matches_spec_example() {
        let bytecode = "0x6080604052";
        assert_eq!(pc_to_opcode_index(bytecode, 0).unwrap(), 0);
        assert_eq!(pc_to_opcode_index(bytecode, 1).unwrap(), 0);
        assert_eq!(pc_to_opcode_index(bytecode, 2).unwrap(), 1);
        assert_eq!(pc_to_opcode_index(bytecode, 3).unwrap(), 1);
        assert_eq!(pc_to_opcode_index(bytecode, 4).unwrap(), 2);
    }

    #[test]
    fn pc_to_opcode_index_reports_out_of_range_pc() {
        let err = pc_to_opcode_index("0x6080", 99).unwrap_err();
        assert!(matches!(err, DebugError::PcNotFound { .. }));
    }

    #[test]
    fn resolve_line_number_counts_newlines_in_prefix() {
        let source = "line1\nline2\nline3";
        assert_eq!(resolve_line_number(source, 0), 1);
        assert_eq!(resolve_line_number(source, 6), 2);
        assert_eq!(resolve_line_number(source, 12), 3);
    }
}
