//! Throughput sampling on a fixed tick
//!
//! The meter reads the shared [`ByteCounter`] once per tick and emits a
//! [`Snapshot`] computed from the delta since the previous reading. Delivery
//! is lossy by design: a full channel drops the snapshot rather than ever
//! stalling the sampling loop (and, transitively, transfer progress).

use crate::counter::ByteCounter;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Point-in-time throughput measurement.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    /// Time since the meter started
    pub elapsed: Duration,
    /// Counter total at this tick
    pub bytes: u64,
    /// Instantaneous rate over the last tick, in bytes per second
    pub rate: f64,
}

/// Best-effort stream of snapshots; ends when the meter is stopped.
pub type SnapshotReceiver = mpsc::Receiver<Snapshot>;

/// Throughput meter; call [`start`](Self::start) to begin sampling.
#[derive(Debug, Clone)]
pub struct Meter {
    tick: Duration,
    capacity: usize,
}

impl Meter {
    /// # Panics
    ///
    /// Panics if `tick` is zero or `capacity` is zero.
    #[must_use]
    pub fn new(tick: Duration, capacity: usize) -> Self {
        assert!(tick > Duration::ZERO, "meter tick must be non-zero");
        assert!(capacity > 0, "snapshot capacity must be non-zero");
        Self { tick, capacity }
    }

    #[must_use]
    pub fn from_config(config: &bwx_config::Config) -> Self {
        Self::new(config.meter_tick(), config.meter.snapshot_capacity)
    }

    /// Start sampling `counter`. Returns a handle used to stop the meter
    /// and the snapshot stream for the consumer.
    #[must_use]
    pub fn start(self, counter: ByteCounter) -> (MeterHandle, SnapshotReceiver) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let stop = CancellationToken::new();
        let token = stop.clone();
        let tick = self.tick;

        let task = tokio::spawn(async move {
            let start = Instant::now();
            let mut last = 0u64;
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // the first tick of a tokio interval fires immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let current = counter.load();
                        let delta = current.saturating_sub(last);
                        last = current;
                        #[allow(clippy::cast_precision_loss)]
                        let rate = delta as f64 / tick.as_secs_f64();
                        let snapshot = Snapshot {
                            elapsed: start.elapsed(),
                            bytes: current,
                            rate,
                        };
                        // lossy: never block the sampling loop on a slow consumer
                        let _ = tx.try_send(snapshot);
                    }
                    () = token.cancelled() => break,
                }
            }
        });

        (MeterHandle { stop, task }, rx)
    }
}

/// Stops the sampling loop. Consuming `stop` makes stopping exactly-once
/// by construction; dropping the handle without stopping leaves the meter
/// running until the process exits.
#[derive(Debug)]
pub struct MeterHandle {
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl MeterHandle {
    /// Terminate the sampling loop and close the snapshot stream.
    pub async fn stop(self) {
        self.stop.cancel();
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emits_snapshots_and_closes_on_stop() {
        let counter = ByteCounter::new();
        let meter = Meter::new(Duration::from_millis(10), 8);
        let (handle, mut rx) = meter.start(counter.clone());

        counter.add(1000);
        let first = rx.recv().await.expect("snapshot");
        assert!(first.bytes >= 1000);
        assert!(first.rate >= 0.0);

        counter.add(500);
        let second = rx.recv().await.expect("snapshot");
        // counter never decreases across ticks
        assert!(second.bytes >= first.bytes);

        handle.stop().await;
        // draining after stop eventually yields None: the stream is closed
        while rx.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn slow_consumer_drops_snapshots_without_stalling() {
        let counter = ByteCounter::new();
        let meter = Meter::new(Duration::from_millis(5), 2);
        let (handle, mut rx) = meter.start(counter.clone());

        // never drain while the meter outpaces the channel capacity
        tokio::time::sleep(Duration::from_millis(100)).await;
        counter.add(1);

        handle.stop().await;

        let mut received = 0usize;
        while rx.recv().await.is_some() {
            received += 1;
        }
        // far fewer than the ~20 ticks that elapsed
        assert!(received <= 2, "received {received} snapshots");
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn rate_is_delta_over_tick() {
        // 100 MiB over a 2s tick is 50 MiB/s
        let delta = 100u64 * 1024 * 1024;
        let rate = delta as f64 / 2.0f64;
        let mib_per_sec = rate / (1024.0 * 1024.0);
        assert!((mib_per_sec - 50.0).abs() < f64::EPSILON);
    }
}
