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

//! Centralized logging setup: console output plus optional daily-rotating
//! file output, with `RUST_LOG` controlling verbosity (default `info`).

use std::{env, fs, path::PathBuf, sync::Once};

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes logging for `component_name`, with console output and,
/// when `enable_file_logging` is set, a daily-rotating file under the
/// directory returned by [`log_directory`].
pub fn init_logging(component_name: &str, enable_file_logging: bool) -> eyre::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let console_layer = fmt::layer().with_target(true).with_line_number(true);

    if enable_file_logging {
        let log_dir = log_directory(component_name)?;
        let file_appender = tracing_appender::rolling::daily(&log_dir, format!("{component_name}.log"));
        let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);
        // Keep the guard alive for the lifetime of the process.
        std::mem::forget(guard);

        let file_layer =
            fmt::layer().with_target(true).with_line_number(true).with_ansi(false).with_writer(non_blocking_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| eyre::eyre!("failed to initialize tracing subscriber: {e}"))?;

        tracing::info!(component = component_name, log_dir = %log_dir.display(), "logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .try_init()
            .map_err(|e| eyre::eyre!("failed to initialize tracing subscriber: {e}"))?;

        tracing::info!(component = component_name, "logging initialized (console only)");
    }

    Ok(())
}

/// Initializes console-only logging, falling back to `default_level` if
/// `RUST_LOG` is unset. Intended for tests and short-lived tools.
pub fn init_simple_logging(default_level: Level) -> eyre::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level.as_str()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| eyre::eyre!("failed to initialize simple logging: {e}"))?;

    Ok(())
}

/// Directory used for `component_name`'s daily-rotating log files:
/// `$DEBUG_LOG_DIR/<component_name>` if set, else
/// `<tmp>/evm-debug-service-logs/<component_name>`.
pub fn log_directory(component_name: &str) -> eyre::Result<PathBuf> {
    let root = env::var(crate::env::DEBUG_LOG_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("evm-debug-service-logs"));
    let dir = root.join(component_name);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

static TEST_LOGGING_INIT: Once = Once::new();

/// Idempotent test-only logging init; safe to call from any test since
/// repeated calls after the first are no-ops.
pub fn ensure_test_logging() {
    TEST_LOGGING_INIT.call_once(|| {
        let _ = init_simple_logging(Level::INFO);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_directory_is_created() {
        let dir = log_directory("test-component").unwrap();
        assert!(dir.exists());
        assert!(dir.to_string_lossy().contains("test-component"));
    }
}
