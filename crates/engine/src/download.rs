//! Download engine: a pool of workers streaming GET responses to nowhere

use crate::budget::RunBudget;
use crate::client::build_download_client;
use crate::counter::ByteCounter;
use crate::RunResult;
use bwx_config::Config;
use bwx_errors::{ConfigError, Error, NetworkError};
use futures::StreamExt;
use reqwest::Client;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Run a download exercise against `targets`.
///
/// Spawns exactly `workers` workers (clamped to at least one); worker `i`
/// is bound to `targets[i % targets.len()]` for the whole run. With
/// `loop_passes` unset each worker performs a single full pass and exits;
/// otherwise workers repeat until the budget fires. Budget expiry is the
/// normal terminal condition, not a failure.
///
/// # Errors
///
/// Returns `ConfigError::NoTargets` for an empty target list, or an error
/// if the HTTP client cannot be built. Transport errors never fail the run;
/// the most recent one is surfaced in [`RunResult::last_error`] unless the
/// run ended by cancellation.
pub async fn download(
    config: &Config,
    targets: &[String],
    workers: usize,
    budget: &RunBudget,
    loop_passes: bool,
    counter: &ByteCounter,
) -> Result<RunResult, Error> {
    if targets.is_empty() {
        return Err(ConfigError::NoTargets.into());
    }
    let workers = workers.max(1);
    let client = build_download_client(config)?;
    let backoff = config.error_backoff();
    let last_error = Arc::new(Mutex::new(None));

    tracing::info!(workers, targets = targets.len(), loop_passes, "starting download run");
    let start = Instant::now();

    let mut set = JoinSet::new();
    for i in 0..workers {
        // round-robin binding, fixed for the run's lifetime
        let url = targets[i % targets.len()].clone();
        set.spawn(download_worker(
            client.clone(),
            url,
            counter.clone(),
            budget.token(),
            backoff,
            loop_passes,
            Arc::clone(&last_error),
        ));
    }
    while set.join_next().await.is_some() {}

    let elapsed = start.elapsed();
    let last_error = if budget.is_cancelled() {
        // a deadline- or interrupt-triggered end is success; trailing
        // transient errors are not worth reporting
        None
    } else {
        last_error.lock().unwrap_or_else(std::sync::PoisonError::into_inner).take()
    };

    Ok(RunResult {
        bytes: counter.load(),
        elapsed,
        last_error,
    })
}

async fn download_worker(
    client: Client,
    url: String,
    counter: ByteCounter,
    token: CancellationToken,
    backoff: Duration,
    loop_passes: bool,
    last_error: Arc<Mutex<Option<Error>>>,
) {
    loop {
        if token.is_cancelled() {
            return;
        }

        let outcome = tokio::select! {
            () = token.cancelled() => return,
            outcome = single_pass(&client, &url, &counter) => outcome,
        };

        match outcome {
            Ok(()) => {
                if token.is_cancelled() || !loop_passes {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "download attempt failed, backing off");
                *last_error.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(e);
                // bounded sleep keeps a down endpoint from being hot-looped;
                // cancellation wakes the worker mid-backoff
                tokio::select! {
                    () = token.cancelled() => return,
                    () = tokio::time::sleep(backoff) => {}
                }
            }
        }
    }
}

/// One full transfer: GET the bound URL and discard the body chunk by
/// chunk, accounting each chunk so a cancelled pass still contributes its
/// partial byte count. The status code is deliberately ignored; an error
/// page is bandwidth too.
async fn single_pass(client: &Client, url: &str, counter: &ByteCounter) -> Result<(), Error> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify(&e, url))?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| classify(&e, url))?;
        counter.add(chunk.len() as u64);
    }
    Ok(())
}

pub(crate) fn classify(e: &reqwest::Error, url: &str) -> Error {
    if e.is_timeout() {
        NetworkError::Timeout {
            url: url.to_string(),
        }
        .into()
    } else if e.is_connect() {
        NetworkError::ConnectionRefused(e.to_string()).into()
    } else {
        NetworkError::RequestFailed(e.to_string()).into()
    }
}
