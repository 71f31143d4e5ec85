//! Live progress line and final summary

use crate::report::Report;
use bwx_engine::SnapshotReceiver;
use std::io::Write;

/// Consume the meter's snapshot stream, redrawing one status line per tick.
/// Ends when the meter is stopped and the stream closes.
pub async fn live_progress(mut snapshots: SnapshotReceiver) {
    while let Some(snapshot) = snapshots.recv().await {
        #[allow(clippy::cast_precision_loss)]
        let total_gb = snapshot.bytes as f64 / 1e9;
        print!(
            "\rtime {}s  {:.2} MB/s  total {:.2} GB   ",
            snapshot.elapsed.as_secs(),
            snapshot.rate / (1024.0 * 1024.0),
            total_gb,
        );
        let _ = std::io::stdout().flush();
    }
    println!();
}

pub fn final_summary(report: &Report) {
    println!(
        "Done. avg {:.2} MB/s  total {:.2} GB",
        report.mbps, report.gbytes
    );
}
