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


mod bootstrap;
mod config;
mod logging;
mod server;

use crate::bootstrap::Bootstrap;
use crate::config::{Cli, Commands, ServerOpts, print_server_usage};
use crate::server::{CertsDir, wait_for_shutdown};
use clap::Parser;
use erasurefs_ecstore::error::{Error, Result};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let Commands::Server(opts) = cli.command;

    if opts.wants_usage() {
        print_server_usage();
        return ExitCode::FAILURE;
    }

    let _guard = match logging::init_logging() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(opts) {
        Ok(()) | Err(Error::ShutdownRequested) => {
            info!(target: "erasurefs::main", "server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(target: "erasurefs::main", "server failed to start: {e}");
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn run(opts: ServerOpts) -> Result<()> {
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let signal = wait_for_shutdown().await;
            info!(target: "erasurefs::main", "shutdown requested by {:?}", signal);
            shutdown.cancel();
        });
    }

    let bootstrap = Bootstrap::new(CertsDir::from_opts(opts.certs_dir.clone()));
    bootstrap.run(&opts, shutdown).await
}
