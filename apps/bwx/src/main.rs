//! bwx - HTTP bandwidth exerciser
//!
//! Drives sustained concurrent HTTP transfer (download and upload) against
//! one or more endpoints to saturate and measure link throughput, and
//! offers a minimal receiving endpoint to sink uploaded traffic.

mod cli;
mod display;
mod error;
mod report;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::report::Report;
use bwx_config::{parse_duration, Config};
use bwx_engine::{ByteCounter, Meter, RunBudget};
use bwx_errors::ConfigError;
use chrono::Utc;
use clap::Parser;
use std::process;
use tracing::{error, info, warn};

/// Safe default demo target when no URL is given
const DEFAULT_DOWNLOAD_URL: &str = "https://speed.hetzner.de/10GB.bin";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;

    match cli.command {
        Commands::Download {
            urls,
            conns,
            time,
            loop_downloads,
            i_understand,
        } => run_download(&config, urls, conns, &time, loop_downloads, i_understand).await,
        Commands::Upload { url, conns, time } => run_upload(&config, url, conns, &time).await,
        Commands::Sink { port } => run_sink(port).await,
    }
}

async fn run_download(
    config: &Config,
    mut urls: Vec<String>,
    conns: usize,
    time: &str,
    loop_downloads: bool,
    i_understand: bool,
) -> Result<(), CliError> {
    if urls.is_empty() {
        urls.push(DEFAULT_DOWNLOAD_URL.to_string());
    }
    if !i_understand {
        return Err(ConfigError::NotConfirmed.into());
    }
    let conns = conns.max(1);
    let duration = parse_duration(time)?;

    let budget = RunBudget::with_deadline(duration);
    wire_signals(&budget);

    let counter = ByteCounter::new();
    let (meter, snapshots) = Meter::from_config(config).start(counter.clone());
    let printer = tokio::spawn(display::live_progress(snapshots));

    let started_at = Utc::now();
    let result = bwx_engine::download(config, &urls, conns, &budget, loop_downloads, &counter)
        .await?;
    let finished_at = Utc::now();

    meter.stop().await;
    let _ = printer.await;

    if let Some(err) = &result.last_error {
        warn!("download ended with error: {}", err);
    }

    let report = Report::new("download", urls, conns, &result, started_at, finished_at);
    report.write(&config.report.path).await?;
    display::final_summary(&report);
    Ok(())
}

async fn run_upload(
    config: &Config,
    url: String,
    conns: usize,
    time: &str,
) -> Result<(), CliError> {
    let conns = conns.max(1);
    let duration = parse_duration(time)?;

    let budget = RunBudget::with_deadline(duration);
    wire_signals(&budget);

    let counter = ByteCounter::new();
    let (meter, snapshots) = Meter::from_config(config).start(counter.clone());
    let printer = tokio::spawn(display::live_progress(snapshots));

    let started_at = Utc::now();
    let result = bwx_engine::upload(config, &url, conns, &budget, &counter).await?;
    let finished_at = Utc::now();

    meter.stop().await;
    let _ = printer.await;

    if let Some(err) = &result.last_error {
        warn!("upload ended with error: {}", err);
    }

    let report = Report::new("upload", vec![url], conns, &result, started_at, finished_at);
    report.write(&config.report.path).await?;
    display::final_summary(&report);
    Ok(())
}

async fn run_sink(port: u16) -> Result<(), CliError> {
    let addr = format!("0.0.0.0:{port}")
        .parse()
        .map_err(|e| CliError::Run(bwx_errors::Error::internal(format!("bad address: {e}"))))?;
    let sink = bwx_sink::Sink::bind(addr).await?;
    info!("sink listening on {}", sink.local_addr());
    sink.run_until(shutdown_signal()).await?;
    Ok(())
}

/// Route SIGINT/SIGTERM into the run budget; an interrupt ends the run the
/// same way deadline expiry does.
fn wire_signals(budget: &RunBudget) {
    let budget = budget.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("interrupt received, stopping run");
        budget.cancel();
    });
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            Ok(term) => term,
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
