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

//! Axum routes for the fork lifecycle and RPC-forwarding surface
//! (spec §6's `/fork*` endpoints). Mounted by the server binary
//! alongside the debug and simulate routes.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, post},
    Router,
};
use debug_common::DebugError;
use serde_json::{json, Value};

use crate::{erc20::set_erc20_balance, manager::ForkManager, rpc::RpcClient};

/// Builds the `/fork*` route tree over a shared [`ForkManager`].
pub fn fork_routes(manager: Arc<ForkManager>) -> Router {
    Router::new()
        .route("/fork", post(create_fork))
        .route("/fork/{forkId}", delete(delete_fork))
        .route("/fork/rpc/{forkId}", post(forward_rpc))
        .route("/fork/getBalance/{forkId}", post(get_balance))
        .route("/fork/setBalance/{forkId}", post(set_balance))
        .route("/fork/getERC20Balance/{forkId}", post(get_erc20_balance))
        .route("/fork/setERC20Balance/{forkId}", post(set_erc20_balance_route))
        .with_state(manager)
}

async fn create_fork(
    State(manager): State<Arc<ForkManager>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let minutes: f64 = params
        .get("forkDuration")
        .ok_or(StatusCode::BAD_REQUEST)?
        .parse()
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let lease = Duration::from_secs_f64(minutes * 60.0);
    let fork_id = manager.create_fork(lease, None).await.map_err(status_of)?;
    let rpc_url = manager.rpc_url(&fork_id).await.map_err(status_of)?;

    Ok((StatusCode::CREATED, Json(json!({ "forkId": fork_id, "rpcUrl": rpc_url }))))
}

async fn delete_fork(
    State(manager): State<Arc<ForkManager>>,
    Path(fork_id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    manager.delete_fork(&fork_id).await.map_err(status_of)?;
    Ok(Json(json!(format!("Fork {fork_id} deleted"))))
}

async fn forward_rpc(
    State(manager): State<Arc<ForkManager>>,
    Path(fork_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Vec<u8>), StatusCode> {
    let response = manager.forward_rpc(&fork_id, body.to_vec()).await.map_err(status_of)?;
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
    Ok((status, response.body))
}

async fn get_balance(
    State(manager): State<Arc<ForkManager>>,
    Path(fork_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    let address = params.get("address").ok_or(StatusCode::BAD_REQUEST)?;
    let rpc = RpcClient::new(&manager);
    let hex_balance = rpc.get_balance(&fork_id, address).await.map_err(status_of)?;
    let decimal = decode_hex_u256_decimal(&hex_balance).map_err(status_of)?;
    Ok(Json(json!(decimal)))
}

async fn set_balance(
    State(manager): State<Arc<ForkManager>>,
    Path(fork_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    let address = params.get("address").ok_or(StatusCode::BAD_REQUEST)?;
    let balance = params.get("balance").ok_or(StatusCode::BAD_REQUEST)?;
    let rpc = RpcClient::new(&manager);
    rpc.set_balance(&fork_id, address, balance).await.map_err(status_of)?;
    Ok(Json(json!(format!("Balance of {address} set to {balance}"))))
}

async fn get_erc20_balance(
    State(manager): State<Arc<ForkManager>>,
    Path(fork_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    let address = params.get("address").ok_or(StatusCode::BAD_REQUEST)?;
    let token_address = params.get("tokenAddress").ok_or(StatusCode::BAD_REQUEST)?;
    let rpc = RpcClient::new(&manager);
    let calldata = format!("0x70a08231{:0>64}", address.trim_start_matches("0x"));
    let hex_balance = rpc.send_call(&fork_id, token_address, &calldata).await.map_err(status_of)?;
    Ok(Json(json!(hex_balance)))
}

async fn set_erc20_balance_route(
    State(manager): State<Arc<ForkManager>>,
    Path(fork_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    let address = params.get("address").ok_or(StatusCode::BAD_REQUEST)?;
    let token_address = params.get("tokenAddress").ok_or(StatusCode::BAD_REQUEST)?;
    let balance = params.get("balance").ok_or(StatusCode::BAD_REQUEST)?;

    let rpc = RpcClient::new(&manager);
    let slot = set_erc20_balance(&rpc, &fork_id, address, token_address, balance).await.map_err(status_of)?;
    Ok(Json(json!(format!("ERC20 balance of {address} on {token_address} set to {balance} (slot {slot})"))))
}

fn decode_hex_u256_decimal(hex: &str) -> debug_common::error::Result<String> {
    let trimmed = hex.trim_start_matches("0x");
    let value = alloy_primitives::U256::from_str_radix(trimmed, 16)
        .map_err(|e| DebugError::UpstreamRpcFailure(format!("malformed balance hex {hex}: {e}")))?;
    Ok(value.to_string())
}

fn status_of(err: DebugError) -> StatusCode {
    match err {
        DebugError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DebugError::NoPortAvailable
        | DebugError::ForkInactive(_)
        | DebugError::ForkNotFound(_)
        | DebugError::UpstreamRpcFailure(_)
        | DebugError::MappingSlotNotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_hex_u256_decimal_handles_prefix() {
        assert_eq!(decode_hex_u256_decimal("0xff").unwrap(), "255");
        assert_eq!(decode_hex_u256_decimal("0x0").unwrap(), "0");
    }

    #[test]
    fn decode_hex_u256_decimal_rejects_garbage() {
        assert!(decode_hex_u256_decimal("0xzz").is_err());
    }
}
