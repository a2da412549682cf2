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

//! Shared handler state for the `debug` and `simulate` route groups.

use std::{path::PathBuf, sync::Arc};

use debug_engine::ExplorerClient;
use fork_manager::ForkManager;

/// State injected into every `debug`/`simulate` handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Shared fork lifecycle manager (also handed to `fork_routes`).
    pub fork_manager: Arc<ForkManager>,
    /// Block-explorer client, one per process.
    pub explorer: ExplorerClient,
    /// Root of the `sourceCodeInfos/` and `compiledContracts/` caches.
    pub cache_dir: PathBuf,
}
