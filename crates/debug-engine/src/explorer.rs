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

//! Block-explorer client (C5): verified source and ABI lookup over the
//! Etherscan-style `/v2/api` surface, with transparent rate-limit retry.

use debug_common::{error::Result, DebugError};
use serde::Deserialize;
use serde_json::Value;

/// Magic string the explorer API returns (as a bare response body, not
/// wrapped in the usual JSON envelope) when the caller is rate limited.
const RATE_LIMIT_BODY: &str = "Max rate limit reached";

/// Delay between rate-limit retries.
const RATE_LIMIT_BACKOFF_MS: u64 = 500;

/// Verified-source lookup result (spec §4.5, `getsourcecode` shape).
#[derive(Debug, Clone)]
pub struct SourceCodeInfo {
    /// Raw source blob. For standard-JSON contracts this has already had
    /// its outer braces stripped.
    pub source_code: String,
    /// Whether `source_code` is a standard-JSON (multi-file) bundle.
    pub is_standard_json: bool,
    /// Declared contract name.
    pub contract_name: String,
    /// Compiler version string, e.g. `"v0.8.19+commit.7dd6d404"`.
    pub compiler_version: String,
    /// Whether optimization was enabled during the original compile.
    pub optimization_used: bool,
    /// Optimizer run count.
    pub runs: u64,
    /// Target EVM version, or empty/`"default"` to omit the flag.
    pub evm_version: String,
}

/// Talks to a single block-explorer deployment (one chain id, one API
/// key, one base URL).
pub struct ExplorerClient {
    http: reqwest::Client,
    base_url: String,
    chain_id: u64,
    api_key: String,
}

impl ExplorerClient {
    /// Builds a client against `base_url` (e.g. `https://api.etherscan.io`).
    pub fn new(base_url: impl Into<String>, chain_id: u64, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            chain_id,
            api_key: api_key.into(),
        }
    }

    /// `getsourcecode`: fetches and validates the verified source bundle
    /// for `address`.
    pub async fn get_source_code_info(&self, address: &str) -> Result<SourceCodeInfo> {
        let envelope = self.fetch_with_retry("getsourcecode", address).await?;

        let item = envelope
            .result
            .as_array()
            .and_then(|items| items.first())
            .ok_or_else(|| DebugError::ExplorerFailure("empty result set".to_string()))?;

        let raw_source = item
            .get("SourceCode")
            .and_then(Value::as_str)
            .ok_or_else(|| DebugError::ExplorerFailure("missing SourceCode field".to_string()))?;

        if raw_source.is_empty() {
            return Err(DebugError::ExplorerFailure("contract is not verified".to_string()));
        }

        let (source_code, is_standard_json) = if let Some(stripped) = strip_outer_braces(raw_source) {
            (stripped, true)
        } else {
            (raw_source.to_string(), false)
        };

        Ok(SourceCodeInfo {
            source_code,
            is_standard_json,
            contract_name: field_str(item, "ContractName"),
            compiler_version: field_str(item, "CompilerVersion"),
            optimization_used: field_str(item, "OptimizationUsed") == "1",
            runs: field_str(item, "Runs").parse().unwrap_or(0),
            evm_version: field_str(item, "EVMVersion"),
        })
    }

    /// `getabi`: fetches the raw ABI JSON string for `address`.
    pub async fn get_abi(&self, address: &str) -> Result<String> {
        let envelope = self.fetch_with_retry("getabi", address).await?;
        match envelope.result {
            Value::String(abi) => Ok(abi),
            other => Ok(other.to_string()),
        }
    }

    async fn fetch_with_retry(&self, action: &str, address: &str) -> Result<ExplorerEnvelope> {
        loop {
            let url = format!(
                "{}/v2/api?chainid={}&module=contract&action={}&address={}&apikey={}",
                self.base_url, self.chain_id, action, address, self.api_key
            );

            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|e| DebugError::ExplorerFailure(e.to_string()))?;

            let body = response.text().await.map_err(|e| DebugError::ExplorerFailure(e.to_string()))?;

            if body.trim() == RATE_LIMIT_BODY {
                tracing::debug!(action, address, "explorer rate limit hit, backing off");
                tokio::time::sleep(std::time::Duration::from_millis(RATE_LIMIT_BACKOFF_MS)).await;
                continue;
            }

            let envelope: ExplorerEnvelope =
                serde_json::from_str(&body).map_err(|e| DebugError::ExplorerFailure(format!("malformed response: {e}")))?;

            if envelope.status != "1" || envelope.message != "OK" {
                return Err(DebugError::ExplorerFailure(envelope.message));
            }

            return Ok(envelope);
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExplorerEnvelope {
    status: String,
    message: String,
    result: Value,
}

fn field_str(item: &Value, key: &str) -> String {
    item.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// If `source` begins with `{`, strips one layer of outer braces (the
/// explorer's standard-JSON encoding convention). Returns `None` when
/// `source` is a plain single-file blob.
fn strip_outer_braces(source: &str) -> Option<String> {
    let trimmed = source.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    let inner = trimmed.strip_prefix('{')?.strip_suffix('}').unwrap_or(trimmed.strip_prefix('{')?);
    Some(inner.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_outer_braces_unwraps_standard_json_marker() {
        let wrapped = "{\"language\":\"Solidity\"}";
        assert_eq!(strip_outer_braces(wrapped), Some("\"language\":\"Solidity\"".to_string()));
    }

    #[test]
    fn strip_outer_braces_is_none_for_plain_source() {
        assert_eq!(strip_outer_braces("pragma solidity ^0.8.0;"), None);
    }
}
