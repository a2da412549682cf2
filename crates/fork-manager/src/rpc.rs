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

//! Typed JSON-RPC client (C4), layered over [`crate::manager::ForkManager`].
//!
//! Every call builds a JSON-RPC 2.0 envelope, forwards it through
//! `forward_rpc`, and decodes the typed result. Trace calls use a
//! timestamp-derived id so the upstream node never treats two traces
//! of the same transaction as cacheable duplicates.

use std::time::{SystemTime, UNIX_EPOCH};

use debug_common::{
    error::Result,
    types::{FlatCallTraceNode, OpcodeTrace, StructLogEntry},
    DebugError,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::manager::ForkManager;

/// Prefix of the `Error(string)` selector, used to recognize a revert
/// reason surfaced through a transaction receipt's logs.
const ERROR_STRING_SELECTOR_PREFIX: &str = "0x08c379a0";

/// Typed wrapper over the JSON-RPC surface a fork's local node exposes.
pub struct RpcClient<'a> {
    manager: &'a ForkManager,
}

impl<'a> RpcClient<'a> {
    /// Builds a client over an existing fork manager.
    pub fn new(manager: &'a ForkManager) -> Self {
        Self { manager }
    }

    /// `debug_traceTransaction` with the default struct-logger (no
    /// tracer config), decoded into an [`OpcodeTrace`].
    pub async fn get_opcode_trace(&self, fork_id: &str, tx_hash: &str) -> Result<OpcodeTrace> {
        let result = self
            .call(fork_id, "debug_traceTransaction", json!([tx_hash, {}]), true)
            .await?;

        #[derive(Deserialize)]
        struct RawStructLog {
            pc: usize,
            op: String,
            depth: u64,
            gas: u64,
            #[serde(rename = "gasCost")]
            gas_cost: u64,
            stack: Vec<String>,
        }

        #[derive(Deserialize)]
        struct RawOpcodeTrace {
            failed: bool,
            gas: u64,
            #[serde(rename = "returnValue", default)]
            return_value: String,
            #[serde(rename = "structLogs", default)]
            struct_logs: Vec<RawStructLog>,
        }

        let raw: RawOpcodeTrace = serde_json::from_value(result)
            .map_err(|e| DebugError::UpstreamRpcFailure(format!("malformed opcode trace: {e}")))?;

        Ok(OpcodeTrace {
            failed: raw.failed,
            gas: raw.gas,
            return_value: raw.return_value,
            struct_logs: raw
                .struct_logs
                .into_iter()
                .map(|s| StructLogEntry {
                    pc: s.pc,
                    op: s.op,
                    depth: s.depth,
                    gas: s.gas,
                    gas_cost: s.gas_cost,
                    stack: s.stack,
                })
                .collect(),
        })
    }

    /// `debug_traceTransaction` with `{tracer:"callTracer"}`, flattened
    /// into pre-order with `depth` starting at 0 for the root call.
    pub async fn get_call_trace(&self, fork_id: &str, tx_hash: &str) -> Result<Vec<FlatCallTraceNode>> {
        let result = self
            .call(
                fork_id,
                "debug_traceTransaction",
                json!([tx_hash, {"tracer": "callTracer"}]),
                true,
            )
            .await?;

        let root: RawCallNode = serde_json::from_value(result)
            .map_err(|e| DebugError::UpstreamRpcFailure(format!("malformed call trace: {e}")))?;

        let mut flattened = Vec::new();
        flatten_call_tree(&root, 0, &mut flattened);
        Ok(flattened)
    }

    /// Fetches the receipt for `tx_hash` and extracts a revert reason:
    /// empty string on success, otherwise the raw data of the first log
    /// whose first topic matches the `Error(string)` selector prefix.
    pub async fn get_error_message(&self, fork_id: &str, tx_hash: &str) -> Result<String> {
        let receipt = self.call(fork_id, "eth_getTransactionReceipt", json!([tx_hash]), false).await?;

        let status = receipt.get("status").and_then(Value::as_str).unwrap_or("0x0");
        if status == "0x1" {
            return Ok(String::new());
        }

        Ok(extract_error_from_logs(receipt.get("logs")).unwrap_or_default())
    }

    /// `eth_call` against `to` with `data` and the default block tag.
    pub async fn send_call(&self, fork_id: &str, to: &str, data: &str) -> Result<String> {
        let result = self
            .call(fork_id, "eth_call", json!([{"to": to, "data": data}, "latest"]), false)
            .await?;
        as_hex_string(result)
    }

    /// `eth_getBalance` against `address` at the latest block.
    pub async fn get_balance(&self, fork_id: &str, address: &str) -> Result<String> {
        let result = self.call(fork_id, "eth_getBalance", json!([address, "latest"]), false).await?;
        as_hex_string(result)
    }

    /// `eth_getCode`: the deployed bytecode at `address`.
    pub async fn get_code(&self, fork_id: &str, address: &str) -> Result<String> {
        let result = self.call(fork_id, "eth_getCode", json!([address, "latest"]), false).await?;
        as_hex_string(result)
    }

    /// `anvil_setBalance`.
    pub async fn set_balance(&self, fork_id: &str, address: &str, balance: &str) -> Result<()> {
        self.call(fork_id, "anvil_setBalance", json!([address, balance]), false).await?;
        Ok(())
    }

    /// `anvil_setStorageAt`.
    pub async fn set_storage_at(&self, fork_id: &str, address: &str, slot: &str, value: &str) -> Result<()> {
        self.call(fork_id, "anvil_setStorageAt", json!([address, slot, value]), false).await?;
        Ok(())
    }

    /// `evm_snapshot`: returns the opaque snapshot id.
    pub async fn snapshot(&self, fork_id: &str) -> Result<String> {
        let result = self.call(fork_id, "evm_snapshot", json!([]), false).await?;
        as_hex_string(result)
    }

    /// `evm_revert` to a previously taken snapshot id.
    pub async fn revert_state(&self, fork_id: &str, snapshot_id: &str) -> Result<bool> {
        let result = self.call(fork_id, "evm_revert", json!([snapshot_id]), false).await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    /// `evm_mine`: mines one block.
    pub async fn mine(&self, fork_id: &str) -> Result<()> {
        self.call(fork_id, "evm_mine", json!([]), false).await?;
        Ok(())
    }

    async fn call(&self, fork_id: &str, method: &str, params: Value, use_timestamp_id: bool) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": request_id(use_timestamp_id),
            "method": method,
            "params": params,
        });

        let raw = serde_json::to_vec(&body).map_err(|e| DebugError::InvalidInput(e.to_string()))?;
        let response = self.manager.forward_rpc(fork_id, raw).await?;

        let parsed: Value = serde_json::from_slice(&response.body)
            .map_err(|e| DebugError::UpstreamRpcFailure(format!("invalid JSON-RPC response: {e}")))?;

        if let Some(error) = parsed.get("error") {
            return Err(DebugError::UpstreamRpcFailure(error.to_string()));
        }

        parsed
            .get("result")
            .cloned()
            .ok_or_else(|| DebugError::UpstreamRpcFailure("JSON-RPC response had no result field".to_string()))
    }
}

fn as_hex_string(value: Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DebugError::UpstreamRpcFailure(format!("expected a hex string result, got {value}")))
}

fn request_id(use_timestamp: bool) -> Value {
    if use_timestamp {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        Value::from(nanos as u64)
    } else {
        Value::from(1)
    }
}

#[derive(Debug, Deserialize)]
struct RawCallNode {
    #[serde(rename = "type")]
    kind: String,
    from: String,
    #[serde(default)]
    to: String,
    value: Option<String>,
    #[serde(default)]
    gas: String,
    #[serde(rename = "gasUsed", default)]
    gas_used: String,
    #[serde(default)]
    input: String,
    output: Option<String>,
    error: Option<String>,
    #[serde(default)]
    calls: Vec<RawCallNode>,
}

fn flatten_call_tree(node: &RawCallNode, depth: u64, out: &mut Vec<FlatCallTraceNode>) {
    out.push(FlatCallTraceNode {
        r#type: node.kind.clone(),
        from: node.from.clone(),
        to: node.to.clone(),
        value: node.value.clone(),
        gas: node.gas.clone(),
        gas_used: node.gas_used.clone(),
        input: node.input.clone(),
        output: node.output.clone(),
        error: node.error.clone(),
        depth,
    });
    for child in &node.calls {
        flatten_call_tree(child, depth + 1, out);
    }
}

fn extract_error_from_logs(logs: Option<&Value>) -> Option<String> {
    let logs = logs?.as_array()?;
    for log in logs {
        let topics = log.get("topics")?.as_array()?;
        let first_topic = topics.first()?.as_str()?;
        if first_topic.starts_with(ERROR_STRING_SELECTOR_PREFIX) {
            return log.get("data").and_then(Value::as_str).map(str::to_string);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_call_tree_is_preorder_with_incrementing_depth() {
        let root = RawCallNode {
            kind: "CALL".into(),
            from: "0xa".into(),
            to: "0xb".into(),
            value: None,
            gas: "0x1".into(),
            gas_used: "0x1".into(),
            input: "0x".into(),
            output: None,
            error: None,
            calls: vec![
                RawCallNode {
                    kind: "STATICCALL".into(),
                    from: "0xb".into(),
                    to: "0xc".into(),
                    value: None,
                    gas: "0x1".into(),
                    gas_used: "0x1".into(),
                    input: "0x".into(),
                    output: None,
                    error: None,
                    calls: vec![],
                },
                RawCallNode {
                    kind: "DELEGATECALL".into(),
                    from: "0xb".into(),
                    to: "0xd".into(),
                    value: None,
                    gas: "0x1".into(),
                    gas_used: "0x1".into(),
                    input: "0x".into(),
                    output: None,
                    error: None,
                    calls: vec![],
                },
            ],
        };

        let mut out = Vec::new();
        flatten_call_tree(&root, 0, &mut out);

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].depth, 0);
        assert_eq!(out[1].depth, 1);
        assert_eq!(out[1].r#type, "STATICCALL");
        assert_eq!(out[2].depth, 1);
        assert_eq!(out[2].r#type, "DELEGATECALL");
    }

    #[test]
    fn extract_error_from_logs_finds_matching_topic() {
        let logs = json!([
            {"topics": ["0xdeadbeef"], "data": "0xirrelevant"},
            {"topics": ["0x08c379a0aaaa"], "data": "0xsomereason"}
        ]);
        assert_eq!(extract_error_from_logs(Some(&logs)), Some("0xsomereason".to_string()));
    }

    #[test]
    fn extract_error_from_logs_returns_none_without_match() {
        let logs = json!([{"topics": ["0xdeadbeef"], "data": "0xirrelevant"}]);
        assert_eq!(extract_error_from_logs(Some(&logs)), None);
    }

    #[test]
    fn request_id_varies_when_timestamped() {
        let a = request_id(true);
        let b = request_id(true);
        assert_ne!(a, b);
        assert_eq!(request_id(false), Value::from(1));
    }
}
