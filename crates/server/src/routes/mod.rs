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

//! The `/debug*` and `/simulate*` route groups (spec §6), mounted by
//! `main` alongside `fork_manager::routes::fork_routes`.

pub mod debug;
pub mod simulate;

use std::sync::Arc;

use axum::{routing::{get, post}, Router};

use crate::state::AppState;

/// Builds the combined `/debug*` + `/simulate*` route tree.
pub fn app_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/debug/getSourceCode", get(debug::get_source_code))
        .route("/debug/contractsCalled/{forkId}", get(debug::contracts_called))
        .route("/debug/debugTransaction/{forkId}", get(debug::debug_transaction))
        .route("/simulate/simulateRawTx", post(simulate::simulate_raw_tx))
        .with_state(state)
}
