// Copyright 2024 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use erasurefs_config::{DEFAULT_LOG_FILENAME, DEFAULT_LOG_LEVEL, ENV_LOG_DIR, ENV_LOG_LEVEL};
use erasurefs_utils::get_env_opt_str;
use std::io::{self, IsTerminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keeps the file writer flushing. Drop it only on exit.
#[derive(Default)]
pub(crate) struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// `ERASUREFS_LOG_LEVEL`, then `RUST_LOG`, then `info`.
fn filter_directive() -> String {
    get_env_opt_str(ENV_LOG_LEVEL)
        .or_else(|| get_env_opt_str(EnvFilter::DEFAULT_ENV))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

fn build_env_filter() -> EnvFilter {
    let directive = filter_directive();
    EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("invalid log filter {directive:?}: {e}, falling back to {DEFAULT_LOG_LEVEL}");
        EnvFilter::new(DEFAULT_LOG_LEVEL)
    })
}

/// Installs the global subscriber: stdout always, plus daily rolling files
/// under `ERASUREFS_LOG_DIR` when it is set.
pub(crate) fn init_logging() -> io::Result<LogGuard> {
    let stdout_layer = fmt::layer().with_target(true).with_ansi(io::stdout().is_terminal());

    let (file_layer, guard) = match get_env_opt_str(ENV_LOG_DIR) {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_suffix(DEFAULT_LOG_FILENAME)
                .build(&dir)
                .map_err(io::Error::other)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_target(true).with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    let file_enabled = file_layer.is_some();

    tracing_subscriber::registry()
        .with(build_env_filter())
        .with(ErrorLayer::default())
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(io::Error::other)?;

    info!(target: "erasurefs::logging", "logging initialized (filter: {}, files: {})", filter_directive(), file_enabled);

    Ok(LogGuard { _file: guard })
}
