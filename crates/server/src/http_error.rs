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

//! Maps [`DebugError`] onto HTTP responses (spec §7's propagation
//! policy). `PcNotFound`, `SourceMapOutOfBounds` and `InvalidFileId`
//! never reach this layer in practice — the correlator catches them
//! and degrades instead — but they still need a status in case that
//! invariant is ever violated.

use axum::{http::StatusCode, response::IntoResponse, Json};
use debug_common::DebugError;
use serde_json::json;

/// Newtype around [`DebugError`] so this crate can implement the
/// foreign `IntoResponse` trait for it (the orphan rule blocks a
/// direct impl since neither the trait nor `DebugError` live here).
pub struct ApiError(pub DebugError);

impl From<DebugError> for ApiError {
    fn from(err: DebugError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = status_of(&self.0);
        let body = Json(json!({ "error": self.0.kind(), "message": self.0.to_string() }));
        (status, body).into_response()
    }
}

fn status_of(err: &DebugError) -> StatusCode {
    match err {
        DebugError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DebugError::NoPortAvailable
        | DebugError::ForkInactive(_)
        | DebugError::ForkNotFound(_)
        | DebugError::UpstreamRpcFailure(_)
        | DebugError::ExplorerFailure(_)
        | DebugError::CompilerFailure(_)
        | DebugError::PcNotFound { .. }
        | DebugError::SourceMapOutOfBounds { .. }
        | DebugError::InvalidFileId(_)
        | DebugError::NoDebugTrace
        | DebugError::MappingSlotNotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_maps_to_bad_request() {
        assert_eq!(status_of(&DebugError::InvalidInput("x".to_string())), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_failure_maps_to_internal_server_error() {
        assert_eq!(status_of(&DebugError::NoDebugTrace), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
