#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Concurrent HTTP transfer engine for bwx
//!
//! This crate drives sustained concurrent transfer against one or more
//! targets: a pool of independent workers repeatedly downloads from or
//! uploads to its bound URL under a shared time/cancellation budget, while
//! a meter samples the shared byte counter on a fixed tick.

mod budget;
mod client;
mod counter;
mod download;
mod meter;
mod upload;

pub use budget::RunBudget;
pub use client::{build_download_client, build_upload_client};
pub use counter::ByteCounter;
pub use download::download;
pub use meter::{Meter, MeterHandle, Snapshot, SnapshotReceiver};
pub use upload::upload;

use bwx_errors::Error;
use std::time::Duration;

/// Outcome of one engine invocation, assembled after all workers stop.
#[derive(Debug)]
pub struct RunResult {
    /// Total bytes accounted across all workers
    pub bytes: u64,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
    /// Most recent transport error, only when the run did not end by
    /// cancellation. A deadline-triggered end is success, not failure.
    pub last_error: Option<Error>,
}

impl RunResult {
    /// Average throughput over the whole run, in bytes per second.
    #[must_use]
    pub fn average_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.bytes as f64 / secs
        }
    }
}
