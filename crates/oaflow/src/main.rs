// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use oaflow::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    cli::init_tracing(&cli);

    if let Err(e) = cli::run(cli).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
