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

//! `/simulate/simulateRawTx`: create an ephemeral fork, forward a raw
//! JSON-RPC transaction submission onto it, mine it into a block, then
//! reuse the debug-transaction and contracts-called pipelines against
//! the freshly-mined hash (spec §4.8).

use std::{sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::State,
    response::Json,
};
use debug_common::DebugError;
use debug_engine::DebugCorrelator;
use fork_manager::RpcClient;
use serde_json::{json, Value};

use crate::{http_error::ApiError, state::AppState};

/// Lease given to the fork a simulated transaction runs on. Long enough
/// to cover the correlator's own helper-fork round trips, which happen
/// sequentially after this fork is already up.
const SIMULATION_FORK_LEASE: Duration = Duration::from_secs(5 * 60);

pub async fn simulate_raw_tx(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let fork_id = state.fork_manager.create_fork(SIMULATION_FORK_LEASE, None).await?;
    tracing::debug!(fork_id, "simulation fork created");

    match run_simulation(&state, &fork_id, body.to_vec()).await {
        Ok(response) => {
            cleanup(&state, &fork_id).await;
            Ok(Json(response))
        }
        Err(e) => {
            cleanup(&state, &fork_id).await;
            Err(e.into())
        }
    }
}

async fn run_simulation(state: &AppState, fork_id: &str, raw_body: Vec<u8>) -> Result<Value, DebugError> {
    let forwarded = state.fork_manager.forward_rpc(fork_id, raw_body).await?;
    let tx_hash = extract_rpc_result_as_hash(&forwarded.body)?;

    let rpc = RpcClient::new(&state.fork_manager);
    rpc.mine(fork_id).await?;

    let correlator = DebugCorrelator::new(&state.fork_manager, &state.explorer, &state.cache_dir);
    let contracts_called = correlator.contracts_called(fork_id, &tx_hash).await?;
    let debug_result = correlator.debug_transaction(fork_id, &tx_hash).await?;

    Ok(json!({
        "ContractsCalled": contracts_called,
        "RevertReason": debug_result.revert_reason,
        "LineNumber": debug_result.line_number,
        "DebugTrace": debug_result.debug_trace,
    }))
}

async fn cleanup(state: &AppState, fork_id: &str) {
    if let Err(e) = state.fork_manager.delete_fork(fork_id).await {
        tracing::warn!(fork_id, error = %e, "simulation fork cleanup failed, ignoring");
    }
}

fn extract_rpc_result_as_hash(body: &[u8]) -> Result<String, DebugError> {
    let parsed: Value =
        serde_json::from_slice(body).map_err(|e| DebugError::UpstreamRpcFailure(format!("invalid JSON-RPC response: {e}")))?;

    if let Some(error) = parsed.get("error") {
        return Err(DebugError::UpstreamRpcFailure(error.to_string()));
    }

    parsed
        .get("result")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DebugError::UpstreamRpcFailure("expected a transaction hash result".to_string()))
}
