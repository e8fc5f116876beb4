// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! dl-watch: prints connectivity transitions as the driftless runtime sees
//! them.
//!
//! Useful for checking a probe endpoint and timeout before shipping a
//! config.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use driftless::{logging, Config, Runtime, RuntimeDeps};

/// dl-watch: connectivity monitor diagnostics
#[derive(Parser, Debug)]
#[command(name = "dl-watch")]
#[command(about = "Watch connectivity transitions with the driftless monitor")]
struct Args {
    /// Config file (TOML); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Probe endpoint (host:port), overriding the config
    #[arg(long)]
    probe: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(args.log_file.as_deref(), args.verbose);

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(probe) = args.probe {
        config.connectivity.probe_addr = probe;
    }

    info!("Starting dl-watch");
    info!("  Probe: {}", config.connectivity.probe_addr);
    info!("  Interval: {}s", config.connectivity.interval_secs);

    let deps = RuntimeDeps::from_config(&config)?;
    let runtime = Runtime::init(config, deps)?;
    let mut transitions = runtime.monitor().subscribe();
    println!("{}", runtime.monitor().current_state());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = transitions.recv() => match event {
                Ok(t) => println!("{} -> {} at {}", t.from, t.to, t.at_ms),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("missed {} transitions", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    let snapshot = runtime.monitor().snapshot();
    runtime.shutdown();
    info!("Stopped; last state {} (checked at {:?})", snapshot.state, snapshot.last_checked_at);
    Ok(())
}
