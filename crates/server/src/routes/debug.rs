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

//! `/debug*` handlers: source lookup and the two correlated-trace views.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use debug_common::DebugError;
use debug_engine::{sourcemap::fetch_source_and_compiled, DebugCorrelator};
use serde_json::{json, Value};

use crate::{http_error::ApiError, state::AppState};

pub async fn get_source_code(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let address = params
        .get("contractAddress")
        .ok_or_else(|| ApiError::from(DebugError::InvalidInput("missing contractAddress query parameter".to_string())))?;

    tracing::debug!(address, "fetching source code");
    let (bundle, _record) = fetch_source_and_compiled(&state.explorer, address, &state.cache_dir).await;
    Ok(Json(json!(bundle)))
}

pub async fn contracts_called(
    State(state): State<Arc<AppState>>,
    Path(fork_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let tx_hash = params
        .get("txHash")
        .ok_or_else(|| ApiError::from(DebugError::InvalidInput("missing txHash query parameter".to_string())))?;

    tracing::debug!(fork_id, tx_hash, "resolving contracts called");
    let correlator = DebugCorrelator::new(&state.fork_manager, &state.explorer, &state.cache_dir);
    let results = correlator.contracts_called(&fork_id, tx_hash).await?;
    Ok(Json(json!(results)))
}

pub async fn debug_transaction(
    State(state): State<Arc<AppState>>,
    Path(fork_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let tx_hash = params
        .get("txHash")
        .ok_or_else(|| ApiError::from(DebugError::InvalidInput("missing txHash query parameter".to_string())))?;

    tracing::debug!(fork_id, tx_hash, "correlating debug transaction");
    let correlator = DebugCorrelator::new(&state.fork_manager, &state.explorer, &state.cache_dir);
    let result = correlator.debug_transaction(&fork_id, tx_hash).await?;

    Ok(Json(json!({
        "RevertReason": result.revert_reason,
        "LineNumber": result.line_number,
        "DebugTrace": result.debug_trace,
    })))
}
