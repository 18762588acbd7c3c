mod config;
mod host;

use std::process::ExitCode;

use clap::Parser;
use tokio::time::MissedTickBehavior;
use universe_canvas::error::ErrorCode;

use config::HostConfig;
use host::{Host, HostError};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let config = HostConfig::parse();

    match run(&config).await {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, code = e.error_code(), "universe host failed");
            ExitCode::FAILURE
        }
    }
}

/// Load, replay, tick, and return the pretty-printed report.
async fn run(config: &HostConfig) -> Result<String, HostError> {
    let mut host = Host::new(config);
    match &config.graph {
        Some(path) => host.load_path(path)?,
        None => host.load_demo(),
    }
    if let Some(path) = &config.script {
        host.replay(host::read_script(path)?);
    }

    tracing::info!(ticks = config.ticks, tick_ms = config.tick_ms, realtime = config.realtime, "universe running");
    let mut interval = tokio::time::interval(config.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    for _ in 0..config.ticks {
        if config.realtime {
            interval.tick().await;
        } else {
            tokio::task::yield_now().await;
        }
        host.step(config.tick_ms);
    }

    let report = host.report();
    host.teardown();
    if !report.in_sync {
        tracing::warn!("persisted graph diverged from the canvas");
    }
    Ok(serde_json::to_string_pretty(&report)?)
}
