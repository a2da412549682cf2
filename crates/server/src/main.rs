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

use std::sync::Arc;

use debug_engine::ExplorerClient;
use fork_manager::{routes::fork_routes, ForkManager};
use server::{routes::app_routes, AppState, ServerConfig};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

const ETHERSCAN_BASE_URL: &str = "https://api.etherscan.io";

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let config = ServerConfig::load()?;
    debug_common::logging::init_logging("evm-debug-service", config.enable_file_log)?;

    tracing::info!(
        host = config.host,
        port = config.port,
        fork_ports = config.fork_ports.len(),
        chain_id = config.chain_id,
        "starting evm-debug-service"
    );

    let fork_manager = Arc::new(ForkManager::new(config.rpc_url.clone()));
    let allocation_errors = fork_manager.allocate_ports(&config.fork_ports).await;
    for error in &allocation_errors {
        tracing::warn!(error = %error, "failed to seed a fork port, continuing with the rest");
    }
    if allocation_errors.len() == config.fork_ports.len() {
        eyre::bail!("none of the configured PORTS could be allocated");
    }

    let explorer = ExplorerClient::new(ETHERSCAN_BASE_URL, config.chain_id, config.etherscan_api_key.clone());
    let app_state = Arc::new(AppState {
        fork_manager: fork_manager.clone(),
        explorer,
        cache_dir: config.cache_dir.clone(),
    });

    // Permissive CORS: the operator UI (out of scope here, see spec §1)
    // is a separately-hosted React app calling this API cross-origin.
    let app = fork_routes(fork_manager)
        .merge(app_routes(app_state))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()));

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
