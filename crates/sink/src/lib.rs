#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Body-discarding HTTP endpoint used as a loopback upload target
//!
//! The sink accepts `PUT`/`POST` at any path, fully drains the request body
//! while counting the bytes, and answers `200 OK`. Every other method gets
//! `200 OK` immediately without the body being read. Intentionally the
//! simplest possible target: no auth, no size limit, no rate limiting.

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::Router;
use bwx_errors::Error;
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared observability state: total bytes drained since the sink started.
#[derive(Debug, Clone, Default)]
pub struct SinkState {
    received: Arc<AtomicU64>,
}

impl SinkState {
    /// Total request-body bytes received so far.
    #[must_use]
    pub fn bytes_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    fn add(&self, n: u64) {
        self.received.fetch_add(n, Ordering::Relaxed);
    }
}

/// A bound, not-yet-serving sink.
pub struct Sink {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: SinkState,
}

impl Sink {
    /// Bind to `addr` (port 0 picks an ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(addr: SocketAddr) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            state: SinkState::default(),
        })
    }

    /// The bound address, useful when an ephemeral port was requested.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle to the received-bytes counter.
    #[must_use]
    pub fn state(&self) -> SinkState {
        self.state.clone()
    }

    /// Serve until `shutdown` resolves, then shut down gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails while accepting connections.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tracing::info!("sink listening on {}", self.local_addr);
        let router = Router::new()
            .fallback(drain)
            .with_state(self.state.clone());

        axum::serve(
            self.listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::internal(format!("sink server error: {e}")))
    }

    /// Serve forever.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails while accepting connections.
    pub async fn run(self) -> Result<(), Error> {
        self.run_until(std::future::pending()).await
    }
}

/// Catch-all handler. `PUT`/`POST` drain and count the body; anything else
/// is answered immediately.
async fn drain(
    State(state): State<SinkState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> impl IntoResponse {
    let method = request.method().clone();
    if method != Method::PUT && method != Method::POST {
        return (StatusCode::OK, "ok\n");
    }

    let mut received = 0u64;
    let mut stream = request.into_body().into_data_stream();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => received += chunk.len() as u64,
            Err(e) => {
                // client went away mid-body; whatever arrived still counts
                tracing::debug!(peer = %peer, error = %e, "body ended early");
                break;
            }
        }
    }
    state.add(received);
    tracing::info!(peer = %peer, method = %method, bytes = received, "sink received body");

    (StatusCode::OK, "ok\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    async fn start_sink() -> (SocketAddr, SinkState, oneshot::Sender<()>) {
        let sink = Sink::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = sink.local_addr();
        let state = sink.state();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            sink.run_until(async {
                let _ = rx.await;
            })
            .await
            .unwrap();
        });
        (addr, state, tx)
    }

    #[tokio::test]
    async fn post_body_is_drained_and_counted() {
        let (addr, state, _stop) = start_sink().await;
        let body = vec![0xabu8; 128 * 1024];

        let client = reqwest::Client::new();
        let response = client
            .post(format!("http://{addr}/upload"))
            .body(body.clone())
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(state.bytes_received(), body.len() as u64);
    }

    #[tokio::test]
    async fn any_path_and_put_are_accepted() {
        let (addr, state, _stop) = start_sink().await;
        let client = reqwest::Client::new();

        let response = client
            .put(format!("http://{addr}/some/deep/path"))
            .body(vec![1u8; 512])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(state.bytes_received(), 512);
    }

    #[tokio::test]
    async fn other_methods_return_ok_without_reading() {
        let (addr, state, _stop) = start_sink().await;
        let client = reqwest::Client::new();

        let response = client.get(format!("http://{addr}/")).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "ok\n");
        assert_eq!(state.bytes_received(), 0);
    }

    #[tokio::test]
    async fn graceful_shutdown_stops_the_server() {
        let (addr, _state, stop) = start_sink().await;
        stop.send(()).unwrap();
        // give the server a moment to wind down, then requests must fail
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let result = reqwest::Client::new()
            .get(format!("http://{addr}/"))
            .send()
            .await;
        assert!(result.is_err());
    }
}
