//! Upload engine: workers streaming unbounded filler bytes at a target

use crate::budget::RunBudget;
use crate::client::build_upload_client;
use crate::counter::ByteCounter;
use crate::download::classify;
use crate::RunResult;
use bwx_config::Config;
use bwx_errors::{Error, NetworkError};
use bytes::Bytes;
use futures::StreamExt;
use rand::RngCore;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Body, Client};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::{Host, Url};

const FILLER_CHUNK: usize = 64 * 1024;

/// Run an upload exercise against `target`.
///
/// Each worker POSTs an effectively unbounded stream of filler bytes and
/// repeats until the budget fires; there is no single-pass mode, upload is
/// a sustained-pressure test.
///
/// Byte accounting counts the bytes of the *response* consumed after a POST
/// completes, not bytes sent. This asymmetry with download accounting is a
/// known quirk kept for report compatibility; for loopback runs the sink's
/// received-bytes counter is the measurement surface.
///
/// # Errors
///
/// Returns an error for an unparseable target URL or if the HTTP client
/// cannot be built. Transport errors never fail the run.
pub async fn upload(
    config: &Config,
    target: &str,
    workers: usize,
    budget: &RunBudget,
    counter: &ByteCounter,
) -> Result<RunResult, Error> {
    let url = Url::parse(target).map_err(|e| NetworkError::InvalidUrl(e.to_string()))?;
    let local = is_local_target(&url);
    let workers = workers.max(1);
    let client = build_upload_client(config)?;
    let backoff = if local {
        // local failures are transient and cheap to retry
        Duration::ZERO
    } else {
        config.error_backoff()
    };
    let pass_delay = if local {
        Duration::ZERO
    } else {
        config.upload_pass_delay()
    };
    let last_error = Arc::new(Mutex::new(None));

    tracing::info!(workers, url = target, local, "starting upload run");
    let start = Instant::now();

    let mut set = JoinSet::new();
    for _ in 0..workers {
        set.spawn(upload_worker(
            client.clone(),
            target.to_string(),
            counter.clone(),
            budget.token(),
            backoff,
            pass_delay,
            Arc::clone(&last_error),
        ));
    }
    while set.join_next().await.is_some() {}

    let elapsed = start.elapsed();
    let last_error = if budget.is_cancelled() {
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

async fn upload_worker(
    client: Client,
    url: String,
    counter: ByteCounter,
    token: CancellationToken,
    backoff: Duration,
    pass_delay: Duration,
    last_error: Arc<Mutex<Option<Error>>>,
) {
    loop {
        if token.is_cancelled() {
            return;
        }

        let outcome = tokio::select! {
            () = token.cancelled() => return,
            outcome = single_post(&client, &url, &counter, &token) => outcome,
        };

        match outcome {
            Ok(()) => {
                if token.is_cancelled() {
                    return;
                }
                if !pass_delay.is_zero() {
                    tokio::select! {
                        () = token.cancelled() => return,
                        () = tokio::time::sleep(pass_delay) => {}
                    }
                }
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "upload attempt failed");
                *last_error.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(e);
                if !backoff.is_zero() {
                    tokio::select! {
                        () = token.cancelled() => return,
                        () = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }
    }
}

/// One POST: stream filler bytes until cancellation ends the body, then
/// drain the response while accounting its bytes.
async fn single_post(
    client: &Client,
    url: &str,
    counter: &ByteCounter,
    token: &CancellationToken,
) -> Result<(), Error> {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, "application/octet-stream")
        .body(filler_body(token.clone()))
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

/// An effectively unbounded body of filler bytes. The content is irrelevant
/// to the measurement, only the volume matters, so one random chunk is
/// generated up front and repeated; the stream ends when the run is
/// cancelled, which is what lets an in-flight POST complete.
fn filler_body(token: CancellationToken) -> Body {
    let mut chunk = vec![0u8; FILLER_CHUNK];
    rand::rng().fill_bytes(&mut chunk);
    let chunk = Bytes::from(chunk);

    let stream = futures::stream::unfold((chunk, token), |(chunk, token)| async move {
        if token.is_cancelled() {
            None
        } else {
            Some((Ok::<Bytes, Infallible>(chunk.clone()), (chunk, token)))
        }
    });
    Body::wrap_stream(stream)
}

/// Loopback targets skip the retry backoff and pass pacing.
fn is_local_target(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_target_detection() {
        for local in [
            "http://127.0.0.1:8080/upload",
            "http://localhost/upload",
            "http://[::1]:9000/x",
        ] {
            assert!(is_local_target(&Url::parse(local).unwrap()), "{local}");
        }
        for remote in ["http://example.com/upload", "http://10.0.0.1/x"] {
            assert!(!is_local_target(&Url::parse(remote).unwrap()), "{remote}");
        }
    }

    #[tokio::test]
    async fn filler_body_ends_on_cancellation() {
        let token = CancellationToken::new();
        let mut chunk = vec![0u8; FILLER_CHUNK];
        rand::rng().fill_bytes(&mut chunk);
        let chunk = Bytes::from(chunk);
        let mut stream = Box::pin(futures::stream::unfold(
            (chunk, token.clone()),
            |(chunk, token)| async move {
                if token.is_cancelled() {
                    None
                } else {
                    Some((Ok::<Bytes, Infallible>(chunk.clone()), (chunk, token)))
                }
            },
        ));

        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_some());
        token.cancel();
        assert!(stream.next().await.is_none());
    }
}
