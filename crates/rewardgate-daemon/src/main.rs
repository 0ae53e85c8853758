// Copyright [2026] [RewardGate Contributors]
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rewardgate_daemon::config::DaemonConfig;
use rewardgate_daemon::http_claim::{bind_listener, serve, ClaimHttpState};
use rewardgate_daemon::key_management::load_voucher_signer;
use rewardgate_daemon::orchestrator::ClaimOrchestrator;
use rewardgate_daemon::store;

#[derive(Debug, Parser)]
#[command(name = "rewardgate-daemon")]
#[command(about = "Reward claim authorization and voucher signing service")]
struct Args {
    #[arg(long, default_value = "./rewardgate.json")]
    config: PathBuf,

    /// Overrides the configured listen address.
    #[arg(long)]
    listen: Option<String>,

    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(args.log))
        .init();

    let mut cfg = DaemonConfig::load(&args.config)?;
    if let Some(listen) = args.listen {
        cfg.listen = listen;
    }

    let signer = Arc::new(load_voucher_signer()?);
    let store = store::connect(&cfg.store).await?;
    let orchestrator = ClaimOrchestrator::from_config(&cfg, store, Arc::clone(&signer))?;

    let listener = bind_listener(&cfg.listen).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        signer = %signer.address(),
        tracks = orchestrator.tracks.iter().count(),
        "starting rewardgate HTTP server"
    );

    let state = ClaimHttpState {
        max_body_bytes: cfg.max_body_bytes,
        orchestrator: Arc::new(orchestrator),
    };
    serve(listener, state, shutdown_signal()).await?;
    tracing::info!("rewardgate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "ctrl-c handler failed; shutting down");
    }
}
